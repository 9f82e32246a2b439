//! Renderer service host: per-client bundle assembly and bookkeeping.
//!
//! [`RendererHost`] is the piece the surrounding launcher glue talks to. It
//! owns the lifecycle gate, assembles one [`HandoffBundle`] per client
//! launch, and parks the bundle on the client's connection record until the
//! delivery mechanism claims it. Detach invalidates the gate and closes any
//! bundle that was never claimed, so no descriptor outlives the service.

use std::fmt;

use tracing::{debug, warn};

use crate::endpoint::EndpointHandle;
use crate::handoff::{bundle, HandoffBundle, HandoffRejected};
use crate::lifecycle::{LifecycleState, ServiceLifecycle};

/// Identifier for one client connection, unique per host instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One tracked client launch and its pending bundle.
#[derive(Debug)]
struct ClientConnection {
    id: ClientId,
    bundle: Option<HandoffBundle>,
}

/// Host-side registry of renderer clients, gated by the service lifecycle.
///
/// Every state-changing method takes `&mut self`; the host environment's
/// dispatch thread must serialize calls (see [`ServiceLifecycle`]). Sharing a
/// host across threads requires the caller's own mutex.
#[derive(Debug, Default)]
pub struct RendererHost {
    lifecycle: ServiceLifecycle,
    connections: Vec<ClientConnection>,
    next_client: u64,
}

impl RendererHost {
    /// Creates a host whose gate starts in [`LifecycleState::Created`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forwards the service attach notification to the gate.
    pub fn on_attach(&mut self) {
        self.lifecycle.on_attach();
    }

    /// Forwards the service destroy notification to the gate and closes any
    /// bundle no delivery ever claimed.
    pub fn on_detach(&mut self) {
        self.lifecycle.on_detach();
        let unclaimed = self
            .connections
            .iter()
            .filter(|conn| conn.bundle.is_some())
            .count();
        if unclaimed > 0 {
            warn!(unclaimed, "closing unclaimed handoff bundles on detach");
        }
        self.connections.clear();
    }

    /// Current gate state.
    #[must_use]
    pub const fn lifecycle_state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Registers a client launch: assembles the handoff bundle for the pair
    /// and parks it until [`claim_bundle`](Self::claim_bundle).
    ///
    /// # Errors
    ///
    /// Propagates [`HandoffRejected`] from [`bundle`]: both endpoints come
    /// back to the caller and no connection is recorded.
    pub fn add_client(
        &mut self,
        control: EndpointHandle,
        descriptor: EndpointHandle,
    ) -> Result<ClientId, HandoffRejected> {
        let assembled = bundle(control, descriptor, &self.lifecycle)?;
        let id = ClientId(self.next_client);
        self.next_client += 1;
        debug!(client = %id, "handoff bundle assembled for renderer client");
        self.connections.push(ClientConnection {
            id,
            bundle: Some(assembled),
        });
        Ok(id)
    }

    /// Hands the client's bundle to the delivery mechanism.
    ///
    /// Consume-once: the first claim returns the bundle, every later claim
    /// (or a claim for an unknown client) returns `None`.
    pub fn claim_bundle(&mut self, id: ClientId) -> Option<HandoffBundle> {
        self.connections
            .iter_mut()
            .find(|conn| conn.id == id)?
            .bundle
            .take()
    }

    /// Drops a client's connection record, closing its bundle if unclaimed.
    pub fn remove_client(&mut self, id: ClientId) {
        self.connections.retain(|conn| conn.id != id);
    }

    /// Number of tracked client connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}
