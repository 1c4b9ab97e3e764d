//! Per-kind stat mutation.

use rand::Rng;
use tracing::{debug, warn};

use super::{CombatEvent, IgnoreReason, Pipeline};
use crate::action::{EffectIntent, EffectKind, Stat};
use crate::config::BattleConfig;
use crate::state::{ActorId, ClassSpecial, Controller, Row, StatusFlags};
use crate::world::World;

impl<W: World + ?Sized, R: Rng + ?Sized> Pipeline<'_, W, R> {
    /// Mutates the target for one intent.
    ///
    /// Returns the amount that landed (post-mitigation for damage), or `None`
    /// when the intent was ignored.
    pub(super) fn apply_effect(&mut self, intent: &EffectIntent, target: &ActorId) -> Option<i32> {
        let amount = intent.resolved.max(0);

        match &intent.effect {
            EffectKind::None => Some(0),
            EffectKind::Damage => {
                let actor = self.world.actor_mut(target)?;
                let dealt = (amount - actor.total_defence()).max(0);
                actor.take_damage(dealt);
                if intent.pattern.is_narrow() {
                    let mut erosion = ceil_div(amount, BattleConfig::EROSION_DIVISOR);
                    if actor.special == ClassSpecial::DefenceBoost {
                        erosion *= 2;
                    }
                    actor.erode_temp_defence(erosion);
                }
                Some(dealt)
            }
            EffectKind::Pierce => {
                self.world.actor_mut(target)?.take_damage(amount);
                Some(amount)
            }
            EffectKind::Heal => {
                let actor = self.world.actor_mut(target)?;
                if actor.flags.contains(StatusFlags::ZOMBIFIED) {
                    return self.ignore(intent, IgnoreReason::Zombified);
                }
                actor.heal(amount);
                Some(amount)
            }
            EffectKind::Regen => {
                let actor = self.world.actor_mut(target)?;
                if actor.flags.contains(StatusFlags::ZOMBIFIED) {
                    return self.ignore(intent, IgnoreReason::Zombified);
                }
                actor.temp_regen += amount;
                actor.health = actor.health.min(actor.max_health);
                Some(amount)
            }
            EffectKind::Buff { stat } => {
                let actor = self.world.actor_mut(target)?;
                match stat {
                    Stat::Defence => actor.temp_defence += amount,
                    Stat::Damage => actor.temp_damage += amount,
                }
                Some(amount)
            }
            EffectKind::Debuff { stat, over_time } => {
                let actor = self.world.actor_mut(target)?;
                if *over_time && actor.special == ClassSpecial::Steadfast {
                    return self.ignore(intent, IgnoreReason::Steadfast);
                }
                match stat {
                    Stat::Defence => actor.temp_defence -= amount,
                    Stat::Damage => actor.temp_damage -= amount,
                }
                Some(amount)
            }
            EffectKind::Poison => {
                self.world.actor_mut(target)?.temp_regen -= amount;
                Some(amount)
            }
            EffectKind::Protect => {
                let Some(protector) = intent.attacker.clone() else {
                    return Some(0);
                };
                if &protector == target {
                    return self.ignore(intent, IgnoreReason::SelfProtect);
                }
                self.world.actor_mut(target)?.protector = Some(protector);
                Some(0)
            }
            EffectKind::Stun => {
                let actor = self.world.actor_mut(target)?;
                actor.temp_defence -= amount;
                actor.action_points = actor
                    .action_points
                    .saturating_sub(BattleConfig::STUN_ACTION_POINTS);
                actor.flags.insert(StatusFlags::WEBBED);
                Some(amount)
            }
            EffectKind::Spawn {
                template,
                count,
                row_hint,
            } => {
                let summoner = intent.attacker.clone().unwrap_or_else(|| target.clone());
                Some(self.spawn(&summoner, template, *count, *row_hint))
            }
            EffectKind::SpecialSummon { count } => {
                self.events.push(CombatEvent::SummonRequested {
                    summoner: target.clone(),
                    count: *count,
                });
                Some(i32::from(*count))
            }
            EffectKind::Relocate => {
                self.events.push(CombatEvent::RelocateRequested {
                    actor: intent.attacker.clone().unwrap_or_else(|| target.clone()),
                    target: target.clone(),
                });
                Some(0)
            }
        }
    }

    /// Places up to `count` actors on the summoner's side. Returns how many
    /// were placed.
    fn spawn(&mut self, summoner: &ActorId, template: &str, count: u8, row_hint: Row) -> i32 {
        let Some(owner) = self.world.actor(summoner) else {
            return 0;
        };
        let side = owner.slot.side;
        let controller = match owner.controller {
            Controller::Player => Controller::AllyAi,
            other => other,
        };

        let mut placed = 0;
        for _ in 0..count {
            let free = self.world.empty_slots(side);
            let Some(slot) = self.world.choose_spawn_slot(&free, row_hint) else {
                debug!(
                    target: "battle::resolve",
                    summoner = %summoner,
                    template,
                    "board full, spawn stopped"
                );
                break;
            };
            match self.world.spawn(slot, template, controller) {
                Ok(actor) => {
                    self.events.push(CombatEvent::Spawned {
                        actor,
                        summoner: summoner.clone(),
                    });
                    placed += 1;
                }
                Err(error) => {
                    warn!(
                        target: "battle::resolve",
                        %error,
                        code = error.error_code(),
                        severity = error.severity().as_str(),
                        "spawn failed"
                    );
                    break;
                }
            }
        }
        placed
    }

    fn ignore(&mut self, intent: &EffectIntent, reason: IgnoreReason) -> Option<i32> {
        debug!(
            target: "battle::resolve",
            action = %intent.action_id,
            ?reason,
            "effect ignored"
        );
        self.events.push(CombatEvent::EffectIgnored {
            intent: intent.clone(),
            reason,
        });
        None
    }
}

pub(super) fn ceil_div(value: i32, divisor: i32) -> i32 {
    if value <= 0 {
        0
    } else {
        (value + divisor - 1) / divisor
    }
}

/// `ceil(value * ratio)` for non-negative values.
pub(super) fn ceil_ratio(value: i32, ratio: f32) -> i32 {
    ((value.max(0) as f32) * ratio).ceil() as i32
}
