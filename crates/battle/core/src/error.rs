//! Combat error types.
//!
//! Every failure the pipeline can report is classified by [`ErrorSeverity`] so
//! callers can decide between skipping the operation and surfacing a bug.

use crate::state::ActorId;

/// Severity level of an error, used for categorization and recovery strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// The operation can be skipped; the battle continues normally.
    ///
    /// Examples: target died before the stage landed, not enough action points
    Recoverable,

    /// Invalid input that should be rejected without retry.
    ///
    /// Examples: unknown action id, location with nobody standing on it
    Validation,

    /// Unexpected inconsistency between static data and board state.
    ///
    /// Examples: spawn template missing from the catalogue
    Internal,
}

impl ErrorSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
        }
    }

    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }
}

/// Errors raised while resolving actions against the board.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CombatError {
    /// No actor stands at the referenced location.
    #[error("no actor at {0}")]
    InvalidTarget(ActorId),

    /// Acting actor is not on the board.
    #[error("acting actor {0} not found")]
    ActorNotFound(ActorId),

    /// Acting actor is dead.
    #[error("actor {0} is dead")]
    ActorDead(ActorId),

    /// Action id is not part of the catalogue.
    #[error("unknown action {0}")]
    UnknownAction(String),

    /// Cost exceeds the remaining action points.
    #[error("{actor} needs {cost} action points but has {available}")]
    InsufficientActionPoints {
        actor: ActorId,
        cost: u32,
        available: u32,
    },

    /// Spawn requested with no free slot on the side.
    #[error("no free slot for spawn")]
    NoFreeSlot,

    /// Spawn template missing from the static data.
    #[error("unknown actor template {0}")]
    UnknownTemplate(String),
}

impl CombatError {
    pub fn severity(&self) -> ErrorSeverity {
        use CombatError::*;
        match self {
            ActorDead(_) | InsufficientActionPoints { .. } | NoFreeSlot => {
                ErrorSeverity::Recoverable
            }
            InvalidTarget(_) | ActorNotFound(_) | UnknownAction(_) => ErrorSeverity::Validation,
            UnknownTemplate(_) => ErrorSeverity::Internal,
        }
    }

    pub fn error_code(&self) -> &'static str {
        use CombatError::*;
        match self {
            InvalidTarget(_) => "COMBAT_INVALID_TARGET",
            ActorNotFound(_) => "COMBAT_ACTOR_NOT_FOUND",
            ActorDead(_) => "COMBAT_ACTOR_DEAD",
            UnknownAction(_) => "COMBAT_UNKNOWN_ACTION",
            InsufficientActionPoints { .. } => "COMBAT_INSUFFICIENT_AP",
            NoFreeSlot => "COMBAT_NO_FREE_SLOT",
            UnknownTemplate(_) => "COMBAT_UNKNOWN_TEMPLATE",
        }
    }
}

pub type Result<T> = core::result::Result<T, CombatError>;
