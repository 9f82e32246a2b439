//! Service attachment lifecycle for the renderer host.
//!
//! The hosting environment's service layer notifies the gate on create/attach
//! and on destroy/detach. The gate is a plain three-state machine bounding
//! when channel handoff is legal:
//!
//! ```text
//! Created --on_attach()--> Running --on_detach()--> Destroyed
//! ```
//!
//! `Destroyed` is terminal. The gate holds no lock: the host environment must
//! serialize `on_attach`, `on_detach`, and any
//! [`bundle`](crate::handoff::bundle) call against each other (its service
//! callbacks normally arrive on a single dispatch thread). Taking `&mut self`
//! on the transition methods lets the borrow checker enforce that for a
//! single-owner gate.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Attachment state of the hosting service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Service object exists but the host has not attached yet.
    Created,
    /// Host is attached; handoff is legal.
    Running,
    /// Host has detached; terminal.
    Destroyed,
}

impl LifecycleState {
    /// Canonical lowercase token, as logged and serialized.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Destroyed => "destroyed",
        }
    }

    /// Returns `true` if no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Destroyed)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks whether the hosting service is attached and bounds when channel
/// handoff is legal.
#[derive(Debug)]
pub struct ServiceLifecycle {
    state: LifecycleState,
}

impl ServiceLifecycle {
    /// Creates a gate in the [`LifecycleState::Created`] state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: LifecycleState::Created,
        }
    }

    /// Host attach notification: `Created -> Running`.
    ///
    /// Duplicate notifications while already `Running` are no-ops; hosts may
    /// deliver the attach callback defensively more than once. An attach
    /// after [`on_detach`](Self::on_detach) is ignored — `Destroyed` is
    /// terminal.
    pub fn on_attach(&mut self) {
        match self.state {
            LifecycleState::Created => {
                debug!("renderer service attached");
                self.state = LifecycleState::Running;
            }
            LifecycleState::Running => {
                debug!("duplicate attach notification ignored");
            }
            LifecycleState::Destroyed => {
                warn!("attach notification after destroy ignored");
            }
        }
    }

    /// Host detach notification: any state -> `Destroyed`. Idempotent.
    ///
    /// Every handoff attempted after this point fails.
    pub fn on_detach(&mut self) {
        if self.state != LifecycleState::Destroyed {
            debug!(from = %self.state, "renderer service destroyed");
            self.state = LifecycleState::Destroyed;
        }
    }

    /// Returns `true` iff the state is [`LifecycleState::Running`].
    ///
    /// Pure query, no side effects.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self.state, LifecycleState::Running)
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        self.state
    }
}

impl Default for ServiceLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_created_and_not_ready() {
        let gate = ServiceLifecycle::new();
        assert_eq!(gate.state(), LifecycleState::Created);
        assert!(!gate.is_ready());
    }

    #[test]
    fn attach_then_detach() {
        let mut gate = ServiceLifecycle::new();
        gate.on_attach();
        assert_eq!(gate.state(), LifecycleState::Running);
        assert!(gate.is_ready());

        gate.on_detach();
        assert_eq!(gate.state(), LifecycleState::Destroyed);
        assert!(!gate.is_ready());
    }

    #[test]
    fn attach_is_idempotent() {
        let mut gate = ServiceLifecycle::new();
        gate.on_attach();
        gate.on_attach();
        assert_eq!(gate.state(), LifecycleState::Running);
    }

    #[test]
    fn detach_is_idempotent() {
        let mut gate = ServiceLifecycle::new();
        gate.on_attach();
        gate.on_detach();
        gate.on_detach();
        assert_eq!(gate.state(), LifecycleState::Destroyed);
    }

    #[test]
    fn detach_before_attach_is_terminal() {
        let mut gate = ServiceLifecycle::new();
        gate.on_detach();
        assert_eq!(gate.state(), LifecycleState::Destroyed);

        // Late attach must not resurrect the gate.
        gate.on_attach();
        assert_eq!(gate.state(), LifecycleState::Destroyed);
        assert!(!gate.is_ready());
    }

    #[test]
    fn state_tokens_are_snake_case() {
        assert_eq!(LifecycleState::Created.as_str(), "created");
        assert_eq!(LifecycleState::Running.as_str(), "running");
        assert_eq!(LifecycleState::Destroyed.as_str(), "destroyed");
        assert!(LifecycleState::Destroyed.is_terminal());
        assert!(!LifecycleState::Running.is_terminal());

        let json = serde_json::to_string(&LifecycleState::Running).unwrap();
        assert_eq!(json, "\"running\"");
    }
}
