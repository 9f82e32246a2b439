//! Launch-carrier encodings read by the worker entry point.
//!
//! The delivery mechanism places the bundled descriptors into a
//! platform-specific carrier; before its accept loop starts, the worker entry
//! point re-exports them to its IPC runtime as environment entries:
//!
//! ```text
//! SOCKET_TAKEOVER=x:<control fd>
//! FD_PASSING_SOCKET=<descriptor-passing fd>
//! ```
//!
//! This module owns that textual contract: encoding on the host side,
//! decoding on the worker side. It never dups, closes, or otherwise touches
//! the descriptors themselves.

use std::os::fd::{AsRawFd, RawFd};

use thiserror::Error;

use crate::handoff::HandoffBundle;

/// Environment variable naming the control socket the worker takes over.
pub const SOCKET_TAKEOVER_VAR: &str = "SOCKET_TAKEOVER";

/// Environment variable naming the descriptor-passing socket.
pub const FD_PASSING_VAR: &str = "FD_PASSING_SOCKET";

/// Endpoint label inside the takeover value. The handoff carries a single
/// control socket, so the label is fixed.
const TAKEOVER_LABEL: &str = "x";

/// Takeover-value decode errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TakeoverError {
    /// Value did not match the `<label>:<fd>` shape.
    #[error("malformed takeover value {value:?}, expected \"x:<fd>\"")]
    MalformedTakeover {
        /// The offending value.
        value: String,
    },

    /// Descriptor field was not a non-negative integer.
    #[error("invalid descriptor number {value:?}")]
    InvalidFd {
        /// The offending value.
        value: String,
    },
}

/// Environment entries for `bundle`, in the order the worker reads them.
///
/// Borrows the bundle: the encoded descriptor numbers are only meaningful
/// while the bundle (or its eventual consumer) keeps the endpoints open.
#[must_use]
pub fn takeover_env(bundle: &HandoffBundle) -> [(&'static str, String); 2] {
    let [(_, control), (_, descriptor)] = bundle.entries();
    [
        (
            SOCKET_TAKEOVER_VAR,
            format!("{TAKEOVER_LABEL}:{}", control.as_raw_fd()),
        ),
        (FD_PASSING_VAR, descriptor.as_raw_fd().to_string()),
    ]
}

/// Decodes a `SOCKET_TAKEOVER` value back to its raw descriptor.
///
/// # Errors
///
/// Returns [`TakeoverError::MalformedTakeover`] if the value is not
/// `x:<fd>`, or [`TakeoverError::InvalidFd`] if the descriptor field does
/// not parse.
pub fn parse_takeover_value(value: &str) -> Result<RawFd, TakeoverError> {
    let Some((label, fd)) = value.split_once(':') else {
        return Err(TakeoverError::MalformedTakeover {
            value: value.to_string(),
        });
    };
    if label != TAKEOVER_LABEL {
        return Err(TakeoverError::MalformedTakeover {
            value: value.to_string(),
        });
    }
    parse_fd_value(fd)
}

/// Decodes a bare descriptor number (the `FD_PASSING_SOCKET` value).
///
/// # Errors
///
/// Returns [`TakeoverError::InvalidFd`] if the value is not a non-negative
/// integer.
pub fn parse_fd_value(value: &str) -> Result<RawFd, TakeoverError> {
    match value.parse::<RawFd>() {
        Ok(fd) if fd >= 0 => Ok(fd),
        _ => Err(TakeoverError::InvalidFd {
            value: value.to_string(),
        }),
    }
}
