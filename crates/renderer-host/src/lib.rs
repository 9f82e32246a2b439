//! Lifecycle-gated descriptor handoff for launching a sandboxed renderer
//! worker.
//!
//! A host process that launches an out-of-process content renderer must hand
//! the worker a pair of pre-opened channel endpoints (a control socket and a
//! descriptor-passing socket) without ever exposing them through the worker's
//! plaintext startup arguments. Descriptor ownership transfer across a
//! process boundary is unforgiving: double-close, leak, use-after-close, and
//! handoff-before-ready races are all one misstep away. This crate implements
//! the host side of that handoff:
//!
//! - [`ServiceLifecycle`] tracks the hosting service's attachment state and
//!   bounds when handoff is legal.
//! - [`bundle`] performs the one-shot, all-or-nothing move of both endpoints
//!   into a [`HandoffBundle`] keyed by [`ChannelRole`].
//! - [`takeover`] owns the textual carrier contract the worker entry point
//!   reads at startup.
//! - [`RendererHost`] ties the pieces together per client connection.
//!
//! The crate performs no I/O and never blocks: delivery of the assembled
//! bundle to the worker, and the worker's own accept loop, belong to the
//! surrounding launcher glue.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod endpoint;
pub mod handoff;
pub mod host;
pub mod lifecycle;
pub mod takeover;

pub use endpoint::EndpointHandle;
pub use handoff::{bundle, ChannelRole, HandoffBundle, HandoffError, HandoffRejected};
pub use host::{ClientId, RendererHost};
pub use lifecycle::{LifecycleState, ServiceLifecycle};
