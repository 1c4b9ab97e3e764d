//! Wire messages exchanged between participants.
use core::fmt;

use battle_core::{ActorId, EffectIntent};
use serde::{Deserialize, Serialize};

use super::errors::Result;

/// Identifier of a networked participant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub u32);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Readiness gate. Each gate keeps its own ready-map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    CombatStart,
    TurnEnd,
}

impl Gate {
    pub const ALL: [Gate; 2] = [Gate::CombatStart, Gate::TurnEnd];
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Gate::CombatStart => "combat_start",
            Gate::TurnEnd => "turn_end",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NetMessage {
    /// Participant finished the current gate.
    Ready { gate: Gate },
    /// Participant removed by the authority.
    Kick { participant: ParticipantId },
    /// A resolved stage intent to apply verbatim.
    AbilityUsed { intent: EffectIntent },
    /// Authority liveness ping.
    Heartbeat { sequence: u64 },
    /// Autonomous actor's turn closed on the authority.
    TurnFinished { actor: ActorId },
    BeginCountdown { gate: Gate },
    PhaseAdvance { gate: Gate },
}

impl NetMessage {
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            NetMessage::Ready { .. } => "ready",
            NetMessage::Kick { .. } => "kick",
            NetMessage::AbilityUsed { .. } => "ability_used",
            NetMessage::Heartbeat { .. } => "heartbeat",
            NetMessage::TurnFinished { .. } => "turn_finished",
            NetMessage::BeginCountdown { .. } => "begin_countdown",
            NetMessage::PhaseAdvance { .. } => "phase_advance",
        }
    }
}
