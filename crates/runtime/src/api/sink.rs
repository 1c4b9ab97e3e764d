//! Presentation callback.
use battle_core::CombatEvent;

use crate::events::TurnEvent;

/// Receives everything worth showing. Calls are synchronous and their outcome
/// is ignored; implementations should hand work off instead of blocking.
pub trait PresentationSink: Send + Sync {
    fn combat(&self, event: &CombatEvent);

    fn turn(&self, _event: &TurnEvent) {}

    /// Drops any pending selection or drag before a non-player phase runs.
    fn clear_interaction(&self) {}
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl PresentationSink for NullSink {
    fn combat(&self, _event: &CombatEvent) {}
}
