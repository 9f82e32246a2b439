//! Owned process-local endpoints for renderer channels.
//!
//! An [`EndpointHandle`] wraps one end of an open bidirectional channel (in
//! practice a connected Unix-domain socket) with single-owner semantics:
//! exactly one party owns a given endpoint at any instant — the host that
//! opened it, then the handoff bundle, then the delivery mechanism. The
//! handle closes the descriptor on drop, so every transfer between parties is
//! a move, never a copy.

use std::os::fd::{AsFd, AsRawFd, BorrowedFd, IntoRawFd, OwnedFd, RawFd};
use std::os::unix::net::UnixStream;

use nix::fcntl::{fcntl, FcntlArg};

/// An exclusively owned endpoint of one renderer communication channel.
#[derive(Debug)]
pub struct EndpointHandle {
    fd: OwnedFd,
}

impl EndpointHandle {
    /// Wraps an already-open descriptor, taking ownership of it.
    #[must_use]
    pub fn new(fd: OwnedFd) -> Self {
        Self { fd }
    }

    /// Returns `true` if the descriptor still refers to an open file
    /// description.
    ///
    /// Probes with `fcntl(F_GETFD)`; a descriptor closed behind the handle's
    /// back reports `false`.
    #[must_use]
    pub fn is_open(&self) -> bool {
        fcntl(self.fd.as_raw_fd(), FcntlArg::F_GETFD).is_ok()
    }

    /// Consumes the handle, returning the owned descriptor.
    #[must_use]
    pub fn into_owned(self) -> OwnedFd {
        self.fd
    }
}

impl From<OwnedFd> for EndpointHandle {
    fn from(fd: OwnedFd) -> Self {
        Self::new(fd)
    }
}

impl From<UnixStream> for EndpointHandle {
    fn from(stream: UnixStream) -> Self {
        Self::new(stream.into())
    }
}

impl AsFd for EndpointHandle {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl AsRawFd for EndpointHandle {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

impl IntoRawFd for EndpointHandle {
    fn into_raw_fd(self) -> RawFd {
        self.fd.into_raw_fd()
    }
}
