//! One-shot, lifecycle-gated assembly of the channel handoff bundle.
//!
//! [`bundle`] validates a pair of endpoints against the lifecycle gate and,
//! only if every check passes, moves both into a [`HandoffBundle`] addressed
//! by [`ChannelRole`]. Validation and ownership transfer are atomic from the
//! caller's perspective: a rejected call hands both endpoints back unconsumed
//! inside [`HandoffRejected`], so the caller remains responsible for closing
//! them and no descriptor is ever half-transferred.
//!
//! # Invariants
//!
//! - A bundle is constructible only while the gate reports
//!   [`LifecycleState::Running`].
//! - The role mapping is fixed at the call site and never swapped: the first
//!   argument is always the control endpoint.
//! - Failure consumes nothing and mutates nothing; success consumes exactly
//!   the two inputs.

use std::fmt;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::endpoint::EndpointHandle;
use crate::lifecycle::{LifecycleState, ServiceLifecycle};

/// Purpose tag for one renderer channel.
///
/// Exactly two roles exist. They are fixed identifiers known a priori to host
/// and worker, never negotiated at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelRole {
    /// Message-oriented two-way control channel.
    Control,
    /// Channel used to transmit further descriptors to the worker.
    DescriptorPassing,
}

impl ChannelRole {
    /// Key under which this channel's descriptor travels in the launch
    /// carrier read by the worker entry point.
    #[must_use]
    pub const fn carrier_key(self) -> &'static str {
        match self {
            Self::Control => "IPC_SOCKET",
            Self::DescriptorPassing => "FD_PASSING_SOCKET",
        }
    }

    /// Canonical lowercase token, as logged and serialized.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Control => "control",
            Self::DescriptorPassing => "descriptor_passing",
        }
    }
}

impl fmt::Display for ChannelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a handoff was refused.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum HandoffError {
    /// The service lifecycle is outside the window in which the worker
    /// process is guaranteed to exist.
    #[error("service lifecycle is {state}, handoff requires an attached service")]
    NotReady {
        /// Gate state observed at call time.
        state: LifecycleState,
    },

    /// An endpoint was already closed (or never open) at call time.
    #[error("{role} endpoint (fd {fd}) is closed or invalid")]
    InvalidHandle {
        /// Role whose endpoint failed the validity probe.
        role: ChannelRole,
        /// Raw descriptor value that failed the probe.
        fd: RawFd,
    },

    /// Both roles were given the same underlying descriptor.
    #[error("control and descriptor-passing roles share fd {fd}")]
    DuplicateHandle {
        /// The shared raw descriptor value.
        fd: RawFd,
    },
}

/// A rejected handoff, carrying both endpoints back to the caller.
///
/// Failure never consumes the inputs: the caller gets both endpoints back via
/// [`into_handles`](Self::into_handles) and is the sole owner of each,
/// exactly as before the call.
#[derive(Debug, Error)]
#[error("{reason}")]
pub struct HandoffRejected {
    /// Why the handoff was refused.
    pub reason: HandoffError,
    control: EndpointHandle,
    descriptor: EndpointHandle,
}

impl HandoffRejected {
    /// Returns both endpoints, control first.
    #[must_use]
    pub fn into_handles(self) -> (EndpointHandle, EndpointHandle) {
        (self.control, self.descriptor)
    }
}

/// The assembled, ownership-transferring channel bundle.
///
/// Sole owner of both endpoints from construction until the delivery
/// mechanism consumes it. Dropping an undelivered bundle closes both
/// descriptors.
#[derive(Debug)]
pub struct HandoffBundle {
    control: EndpointHandle,
    descriptor: EndpointHandle,
}

impl HandoffBundle {
    /// Borrows the endpoint bound to `role`.
    #[must_use]
    pub fn endpoint(&self, role: ChannelRole) -> BorrowedFd<'_> {
        match role {
            ChannelRole::Control => self.control.as_fd(),
            ChannelRole::DescriptorPassing => self.descriptor.as_fd(),
        }
    }

    /// Entries in fixed role order, control first.
    #[must_use]
    pub fn entries(&self) -> [(ChannelRole, BorrowedFd<'_>); 2] {
        [
            (ChannelRole::Control, self.control.as_fd()),
            (ChannelRole::DescriptorPassing, self.descriptor.as_fd()),
        ]
    }

    /// Consumes the bundle, returning `(control, descriptor)`.
    #[must_use]
    pub fn into_parts(self) -> (EndpointHandle, EndpointHandle) {
        (self.control, self.descriptor)
    }

    /// Consumes the bundle into carrier form: each endpoint paired with the
    /// fixed key the worker reads it under.
    #[must_use]
    pub fn into_carrier_entries(self) -> [(&'static str, EndpointHandle); 2] {
        [
            (ChannelRole::Control.carrier_key(), self.control),
            (ChannelRole::DescriptorPassing.carrier_key(), self.descriptor),
        ]
    }
}

/// Assembles the handoff bundle for one worker launch.
///
/// Checks, in order:
///
/// 1. the two endpoints are distinct descriptors
///    ([`HandoffError::DuplicateHandle`], reported regardless of gate state);
/// 2. the gate reports ready ([`HandoffError::NotReady`]);
/// 3. each endpoint is still open ([`HandoffError::InvalidHandle`], control
///    probed first).
///
/// On success both endpoints move into the returned bundle and the original
/// bindings are consumed. No I/O is performed and the gate is never mutated.
///
/// # Errors
///
/// Returns [`HandoffRejected`] carrying the reason and both endpoints; the
/// caller keeps full ownership of each.
pub fn bundle(
    control: EndpointHandle,
    descriptor: EndpointHandle,
    lifecycle: &ServiceLifecycle,
) -> Result<HandoffBundle, HandoffRejected> {
    if control.as_raw_fd() == descriptor.as_raw_fd() {
        return Err(HandoffRejected {
            reason: HandoffError::DuplicateHandle {
                fd: control.as_raw_fd(),
            },
            control,
            descriptor,
        });
    }

    if !lifecycle.is_ready() {
        return Err(HandoffRejected {
            reason: HandoffError::NotReady {
                state: lifecycle.state(),
            },
            control,
            descriptor,
        });
    }

    if !control.is_open() {
        return Err(HandoffRejected {
            reason: HandoffError::InvalidHandle {
                role: ChannelRole::Control,
                fd: control.as_raw_fd(),
            },
            control,
            descriptor,
        });
    }

    if !descriptor.is_open() {
        return Err(HandoffRejected {
            reason: HandoffError::InvalidHandle {
                role: ChannelRole::DescriptorPassing,
                fd: descriptor.as_raw_fd(),
            },
            control,
            descriptor,
        });
    }

    Ok(HandoffBundle {
        control,
        descriptor,
    })
}

#[cfg(test)]
mod tests {
    use std::mem;
    use std::os::fd::{FromRawFd, OwnedFd};
    use std::os::unix::net::UnixStream;

    use super::*;

    fn endpoint_pair() -> (EndpointHandle, EndpointHandle) {
        let (a, b) = UnixStream::pair().unwrap();
        (a.into(), b.into())
    }

    fn running_gate() -> ServiceLifecycle {
        let mut gate = ServiceLifecycle::new();
        gate.on_attach();
        gate
    }

    #[test]
    fn success_preserves_role_mapping() {
        let gate = running_gate();
        let (control, descriptor) = endpoint_pair();
        let (control_fd, descriptor_fd) = (control.as_raw_fd(), descriptor.as_raw_fd());

        let bundle = bundle(control, descriptor, &gate).unwrap();
        assert_eq!(
            bundle.endpoint(ChannelRole::Control).as_raw_fd(),
            control_fd
        );
        assert_eq!(
            bundle.endpoint(ChannelRole::DescriptorPassing).as_raw_fd(),
            descriptor_fd
        );

        let entries = bundle.entries();
        assert_eq!(entries[0].0, ChannelRole::Control);
        assert_eq!(entries[1].0, ChannelRole::DescriptorPassing);
    }

    #[test]
    fn not_ready_before_attach_returns_both_handles() {
        let gate = ServiceLifecycle::new();
        let (control, descriptor) = endpoint_pair();

        let rejected = bundle(control, descriptor, &gate).unwrap_err();
        assert_eq!(
            rejected.reason,
            HandoffError::NotReady {
                state: LifecycleState::Created
            }
        );

        // Both endpoints come back open and independently closable.
        let (control, descriptor) = rejected.into_handles();
        assert!(control.is_open());
        assert!(descriptor.is_open());
        drop(control);
        drop(descriptor);
    }

    #[test]
    fn not_ready_after_detach() {
        let mut gate = running_gate();
        gate.on_detach();
        let (control, descriptor) = endpoint_pair();

        let rejected = bundle(control, descriptor, &gate).unwrap_err();
        assert_eq!(
            rejected.reason,
            HandoffError::NotReady {
                state: LifecycleState::Destroyed
            }
        );
    }

    #[test]
    #[allow(unsafe_code)]
    fn duplicate_descriptor_rejected_in_any_state() {
        let (a, _b) = UnixStream::pair().unwrap();
        let raw = a.as_raw_fd();
        let control = EndpointHandle::from(a);
        // SAFETY: deliberately aliases `control`'s descriptor to model the
        // caller error; the alias is forgotten below, never dropped.
        let alias = EndpointHandle::new(unsafe { OwnedFd::from_raw_fd(raw) });

        let gate = ServiceLifecycle::new();
        let rejected = bundle(control, alias, &gate).unwrap_err();
        assert_eq!(rejected.reason, HandoffError::DuplicateHandle { fd: raw });

        let (control, alias) = rejected.into_handles();
        mem::forget(alias);
        drop(control);
    }

    /// A descriptor number this process never opened. Parallel tests cannot
    /// race it into existence, and closing it on drop is a no-op.
    const DEAD_FD: RawFd = i32::MAX - 1;

    #[allow(unsafe_code)]
    fn dead_endpoint() -> EndpointHandle {
        // SAFETY: `DEAD_FD` refers to no open file description.
        EndpointHandle::new(unsafe { OwnedFd::from_raw_fd(DEAD_FD) })
    }

    #[test]
    fn closed_control_endpoint_rejected_without_consuming_peer() {
        let (_a, b) = UnixStream::pair().unwrap();
        let descriptor = EndpointHandle::from(b);

        let gate = running_gate();
        let rejected = bundle(dead_endpoint(), descriptor, &gate).unwrap_err();
        assert_eq!(
            rejected.reason,
            HandoffError::InvalidHandle {
                role: ChannelRole::Control,
                fd: DEAD_FD,
            }
        );

        let (_dead, descriptor) = rejected.into_handles();
        assert!(descriptor.is_open());
        drop(descriptor);
    }

    #[test]
    fn closed_descriptor_endpoint_rejected() {
        let (a, _b) = UnixStream::pair().unwrap();
        let control = EndpointHandle::from(a);

        let gate = running_gate();
        let rejected = bundle(control, dead_endpoint(), &gate).unwrap_err();
        assert_eq!(
            rejected.reason,
            HandoffError::InvalidHandle {
                role: ChannelRole::DescriptorPassing,
                fd: DEAD_FD,
            }
        );

        let (control, _dead) = rejected.into_handles();
        assert!(control.is_open());
    }

    #[test]
    fn carrier_entries_use_fixed_keys() {
        let gate = running_gate();
        let (control, descriptor) = endpoint_pair();
        let bundle = bundle(control, descriptor, &gate).unwrap();

        let [(control_key, _), (descriptor_key, _)] = bundle.into_carrier_entries();
        assert_eq!(control_key, "IPC_SOCKET");
        assert_eq!(descriptor_key, "FD_PASSING_SOCKET");
    }

    #[test]
    fn role_tokens_are_snake_case() {
        assert_eq!(ChannelRole::Control.as_str(), "control");
        assert_eq!(ChannelRole::DescriptorPassing.as_str(), "descriptor_passing");

        let json = serde_json::to_string(&ChannelRole::DescriptorPassing).unwrap();
        assert_eq!(json, "\"descriptor_passing\"");
    }
}
