use super::{EffectKind, StageId, TargetPattern};
use crate::state::ActorId;

/// Damage bounds of a stage after scaling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DamageRoll {
    /// Uniform roll in `[min, max]`.
    Range { min: i32, max: i32 },
    /// Roll suppressed (lifesteal pierce); the fixed amount is used unscaled.
    Suppressed { fixed: i32 },
}

impl DamageRoll {
    pub const fn fixed(amount: i32) -> Self {
        Self::Range {
            min: amount,
            max: amount,
        }
    }
}

/// Where an action came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Origin {
    pub player_action: bool,
    pub ally_ai_action: bool,
}

impl Origin {
    pub const PLAYER: Origin = Origin {
        player_action: true,
        ally_ai_action: false,
    };
    pub const ALLY_AI: Origin = Origin {
        player_action: false,
        ally_ai_action: true,
    };
    pub const HOSTILE_AI: Origin = Origin {
        player_action: false,
        ally_ai_action: false,
    };

    /// Hostile AI actions are the ones scaled by quest difficulty.
    pub const fn is_hostile(self) -> bool {
        !self.player_action && !self.ally_ai_action
    }
}

/// One in-flight effect application.
///
/// This is the unit replicated between the authority and participants: the
/// deciding side fills in `resolved`, everyone else applies it verbatim.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectIntent {
    /// `None` for environmental effects; reactions only fire when present.
    pub attacker: Option<ActorId>,
    /// `None` while target selection is pending.
    pub target: Option<ActorId>,
    pub stage: Option<StageId>,
    pub effect: EffectKind,
    pub pattern: TargetPattern,
    pub roll: DamageRoll,
    /// Pre-mitigation amount after rolling. Never negative.
    pub resolved: i32,
    pub crit_chance: f32,
    pub crit_multiplier: f32,
    /// Action point cost; non-zero on primary-stage intents only.
    pub cost: u32,
    pub origin: Origin,
    pub action_id: String,
    pub display_name: String,
}

impl EffectIntent {
    /// Synthesized reaction of a fixed magnitude (counters, poison-on-hit).
    pub fn reaction(
        attacker: ActorId,
        target: ActorId,
        effect: EffectKind,
        amount: i32,
        action_id: &str,
    ) -> Self {
        let amount = amount.max(0);
        Self {
            attacker: Some(attacker),
            target: Some(target),
            stage: None,
            effect,
            pattern: TargetPattern::Single,
            roll: DamageRoll::fixed(amount),
            resolved: amount,
            crit_chance: 0.0,
            crit_multiplier: 1.0,
            cost: 0,
            origin: Origin::default(),
            action_id: action_id.to_owned(),
            display_name: action_id.to_owned(),
        }
    }

    /// Same effect rerouted to `protector`.
    pub fn redirected(&self, protector: ActorId) -> Self {
        Self {
            target: Some(protector),
            pattern: TargetPattern::Chosen,
            ..self.clone()
        }
    }

    pub fn with_target(mut self, target: ActorId) -> Self {
        self.target = Some(target);
        self
    }
}
