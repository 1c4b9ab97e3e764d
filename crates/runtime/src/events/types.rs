//! Event types for different topics.
use std::time::Duration;

use battle_core::ActorId;
use serde::{Deserialize, Serialize};

use crate::api::{Gate, ParticipantId};

/// Autonomous group run by the scheduler, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Group {
    Allies,
    Hostiles,
}

/// How a non-player phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseOutcome {
    /// Both groups ran; players act next.
    ControlReturned,
    Victory,
    Defeat,
    Cancelled,
}

/// Events related to turn management
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TurnEvent {
    /// Board interaction locked for the non-player phase.
    PhaseStarted { wave: u32, turn_in_wave: u32 },
    GroupStarted { group: Group, members: usize },
    ActorStarted { actor: ActorId, timeout: Duration },
    ActorFinished { actor: ActorId, forced: bool },
    PhaseEnded { outcome: PhaseOutcome },
    /// Dead actor taken off the board after the grace delay.
    ActorRemoved { actor: ActorId },
}

/// Readiness barrier notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseEvent {
    /// Every known participant is ready.
    Advance { gate: Gate },
    CountdownStarted { gate: Gate },
}

/// Participant membership and liveness
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkEvent {
    Joined { participant: ParticipantId },
    Left { participant: ParticipantId },
    /// The authority stopped sending heartbeats.
    HostLost { silent_for: Duration },
}
