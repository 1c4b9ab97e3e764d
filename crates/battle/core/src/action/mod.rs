//! Static action definitions.
//!
//! An [`ActionDefinition`] is immutable data loaded before combat. It holds up
//! to three [`Stage`]s; each stage pairs a [`TargetPattern`] with an
//! [`EffectKind`] and a base damage range.

mod intent;

use std::collections::HashMap;

pub use intent::{DamageRoll, EffectIntent, Origin};

use crate::state::Row;

/// Which stage of an action produced an effect.
///
/// Reactions and redirects carry the stage of the effect they react to only
/// when it matters for further triggers; synthesized reactions carry `None`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StageId {
    Primary = 1,
    Secondary = 2,
    Tertiary = 3,
}

/// Who a stage lands on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TargetPattern {
    /// The acting actor.
    Caster,
    /// One opposing actor, chosen by the caller or at random.
    Single,
    /// Exactly the id carried by the intent (redirects use this).
    Chosen,
    /// A random living opposing actor.
    Random,
    FrontRow,
    MidRow,
    BackRow,
    FrontAndMid,
    /// Every living opposing actor.
    AllFoes,
    /// One actor on the caster's side.
    SingleAlly,
    /// Every living actor on the caster's side.
    AllAllies,
}

impl TargetPattern {
    /// Patterns that hit one target and therefore erode temporary defence.
    pub const fn is_narrow(self) -> bool {
        matches!(
            self,
            Self::Single | Self::Chosen | Self::Random | Self::SingleAlly
        )
    }

    /// Opposing rows covered by a row-wide pattern.
    pub fn rows(self) -> Option<&'static [Row]> {
        match self {
            Self::FrontRow => Some(&[Row::Front]),
            Self::MidRow => Some(&[Row::Mid]),
            Self::BackRow => Some(&[Row::Back]),
            Self::FrontAndMid => Some(&[Row::Front, Row::Mid]),
            Self::AllFoes => Some(&[Row::Front, Row::Mid, Row::Back]),
            _ => None,
        }
    }
}

/// Stat touched by buffs and debuffs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Stat {
    Defence,
    Damage,
}

/// Closed set of effect kinds with their per-variant payload.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EffectKind {
    None,
    Damage,
    /// Damage that ignores defence.
    Pierce,
    Heal,
    /// Healing stored as temporary regen.
    Regen,
    Buff {
        stat: Stat,
    },
    Debuff {
        stat: Stat,
        /// Over-time debuffs are ignored by `Steadfast` targets.
        over_time: bool,
    },
    /// Negative temporary regen realized at turn start.
    Poison,
    /// Makes the caster the target's protector.
    Protect,
    /// Lowers temporary defence, drains action points and webs the target.
    Stun,
    /// Places new actors on the caster's side.
    Spawn {
        template: String,
        count: u8,
        row_hint: Row,
    },
    /// Handed to the external summon collaborator.
    SpecialSummon {
        count: u8,
    },
    /// Board position change handled by a collaborator.
    Relocate,
}

impl EffectKind {
    pub const fn is_offensive(&self) -> bool {
        matches!(
            self,
            Self::Damage | Self::Pierce | Self::Poison | Self::Debuff { .. } | Self::Stun
        )
    }

    /// Effects that are redirected to the target's protector.
    pub const fn is_redirectable(&self) -> bool {
        matches!(self, Self::Damage | Self::Poison | Self::Stun)
    }
}

/// One stage of an action.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stage {
    pub target: TargetPattern,
    pub effect: EffectKind,
    pub min: i32,
    pub max: i32,
    /// Cosmetic tag for presentation; ignored by the core.
    pub visual: Option<String>,
}

impl Stage {
    pub fn new(target: TargetPattern, effect: EffectKind, min: i32, max: i32) -> Self {
        Self {
            target,
            effect,
            min,
            max,
            visual: None,
        }
    }

    pub fn with_visual(mut self, visual: impl Into<String>) -> Self {
        self.visual = Some(visual.into());
        self
    }
}

/// Immutable, data-described action.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionDefinition {
    pub id: String,
    pub name: String,
    /// Action point cost, charged once for the primary stage.
    pub cost: u32,
    /// Probability in `[0, 1]` of multiplying a roll by `crit_multiplier`.
    pub crit_chance: f32,
    pub crit_multiplier: f32,
    pub primary: Option<Stage>,
    pub secondary: Option<Stage>,
    pub tertiary: Option<Stage>,
}

impl ActionDefinition {
    pub fn new(id: impl Into<String>, cost: u32, primary: Stage) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            cost,
            crit_chance: 0.0,
            crit_multiplier: 1.0,
            primary: Some(primary),
            secondary: None,
            tertiary: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_secondary(mut self, stage: Stage) -> Self {
        self.secondary = Some(stage);
        self
    }

    pub fn with_tertiary(mut self, stage: Stage) -> Self {
        self.tertiary = Some(stage);
        self
    }

    pub fn with_crit(mut self, chance: f32, multiplier: f32) -> Self {
        self.crit_chance = chance.clamp(0.0, 1.0);
        self.crit_multiplier = multiplier.max(1.0);
        self
    }

    /// Non-empty stages in resolution order: secondary, primary, tertiary.
    ///
    /// Secondary resolving before primary is long-standing observed behavior
    /// that clients depend on; keep it until product confirms otherwise.
    pub fn stages(&self) -> impl Iterator<Item = (StageId, &Stage)> {
        [
            (StageId::Secondary, self.secondary.as_ref()),
            (StageId::Primary, self.primary.as_ref()),
            (StageId::Tertiary, self.tertiary.as_ref()),
        ]
        .into_iter()
        .filter_map(|(id, stage)| stage.map(|s| (id, s)))
    }

    /// Pattern used by the AI filter: the primary stage's, else the first stage's.
    pub fn headline(&self) -> Option<&Stage> {
        self.primary
            .as_ref()
            .or(self.secondary.as_ref())
            .or(self.tertiary.as_ref())
    }
}

/// Read-only lookup of every action definition, keyed by id.
#[derive(Clone, Debug, Default)]
pub struct ActionCatalogue {
    actions: HashMap<String, ActionDefinition>,
}

impl ActionCatalogue {
    pub fn new<I>(actions: I) -> Self
    where
        I: IntoIterator<Item = ActionDefinition>,
    {
        Self {
            actions: actions.into_iter().map(|a| (a.id.clone(), a)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&ActionDefinition> {
        self.actions.get(id)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_resolve_secondary_first() {
        let action = ActionDefinition::new(
            "cleave",
            1,
            Stage::new(TargetPattern::Single, EffectKind::Damage, 1, 2),
        )
        .with_secondary(Stage::new(
            TargetPattern::Caster,
            EffectKind::Buff { stat: Stat::Damage },
            1,
            1,
        ))
        .with_tertiary(Stage::new(TargetPattern::Single, EffectKind::Poison, 1, 1));

        let order: Vec<StageId> = action.stages().map(|(id, _)| id).collect();
        assert_eq!(
            order,
            vec![StageId::Secondary, StageId::Primary, StageId::Tertiary]
        );
    }

    #[test]
    fn offensive_kinds_exclude_support() {
        assert!(EffectKind::Stun.is_offensive());
        assert!(
            EffectKind::Debuff {
                stat: Stat::Defence,
                over_time: true
            }
            .is_offensive()
        );
        assert!(!EffectKind::Heal.is_offensive());
        assert!(!EffectKind::Protect.is_offensive());
        assert!(!EffectKind::Relocate.is_offensive());
    }
}
