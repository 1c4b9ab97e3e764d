//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from phase coordination, the network boundary and the
//! combat rules so callers can bubble them up with consistent context.
use std::time::Duration;

use battle_core::{ActorId, CombatError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("session requires a {0} before building")]
    MissingCollaborator(&'static str),

    #[error("only the authority may {0}")]
    NotAuthority(&'static str),

    #[error("non-player phase already active")]
    ReentrantTurn,

    #[error("actor {actor} did not finish within {timeout:?}")]
    Timeout { actor: ActorId, timeout: Duration },

    #[error("phase cancelled")]
    Cancelled,

    #[error("no heartbeat from authority for {0:?}")]
    HeartbeatLoss(Duration),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("failed to encode network message")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Combat(#[from] CombatError),
}

impl RuntimeError {
    /// Timeouts, cancellation and host loss are expected control flow.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            RuntimeError::Timeout { .. } | RuntimeError::Cancelled | RuntimeError::HeartbeatLoss(_)
        )
    }
}
