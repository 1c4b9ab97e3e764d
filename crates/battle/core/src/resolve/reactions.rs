//! Reactive triggers: death handling, counter-attacks, poison-on-hit and
//! class-special procs.

use rand::Rng;
use tracing::{debug, info};

use super::effects::ceil_ratio;
use super::{CombatEvent, Pipeline};
use crate::action::{EffectIntent, EffectKind, StageId, Stat};
use crate::config::BattleConfig;
use crate::state::{ActorId, ClassSpecial, StatusFlags};
use crate::world::World;

impl<W: World + ?Sized, R: Rng + ?Sized> Pipeline<'_, W, R> {
    /// Runs the triggers that follow an applied intent.
    ///
    /// The death check always runs. Everything else requires an attacker, and
    /// counter/poison reactions are skipped when the target just died.
    pub(super) fn react(&mut self, intent: &EffectIntent, target: &ActorId, dealt: i32, depth: u8) {
        let target_died = self.check_death(target);

        let Some(attacker) = intent.attacker.as_ref() else {
            return;
        };

        if !target_died && attacker != target {
            self.counter_attack(intent, attacker, target, depth);
            self.poison_on_hit(intent, attacker, target, depth);
        }

        self.attacker_procs(intent, attacker, target, dealt);
    }

    /// Handles `health <= 0` for `id`. Returns true if the actor died now.
    pub(super) fn check_death(&mut self, id: &ActorId) -> bool {
        let Some(actor) = self.world.actor_mut(id) else {
            return false;
        };
        if actor.is_alive() {
            return false;
        }

        if actor.flags.contains(StatusFlags::UNDEAD_RESISTANCE) {
            actor.health = 1;
            actor.flags.remove(StatusFlags::UNDEAD_RESISTANCE);
            info!(target: "battle::resolve", actor = %id, "undead resistance consumed");
            self.events
                .push(CombatEvent::UndeadResisted { actor: id.clone() });
            return false;
        }

        let allegiance = actor.allegiance();
        info!(target: "battle::resolve", actor = %id, %allegiance, "actor died");
        self.events.push(CombatEvent::ActorDied {
            actor: id.clone(),
            allegiance,
        });

        for other in self.world.actor_ids() {
            let Some(survivor) = self.world.actor_mut(&other) else {
                continue;
            };
            if survivor.protector.as_ref() == Some(id) {
                survivor.protector = None;
            }
            if survivor.special == ClassSpecial::Cult
                && survivor.is_alive()
                && survivor.allegiance() == allegiance
            {
                survivor.temp_damage += BattleConfig::CULT_DAMAGE_PER_DEATH;
                self.events.push(CombatEvent::Proc {
                    actor: other.clone(),
                    special: ClassSpecial::Cult,
                    amount: BattleConfig::CULT_DAMAGE_PER_DEATH,
                });
            }
        }

        true
    }

    fn counter_attack(
        &mut self,
        intent: &EffectIntent,
        attacker: &ActorId,
        target: &ActorId,
        depth: u8,
    ) {
        if intent.stage != Some(StageId::Primary) || !intent.effect.is_offensive() {
            return;
        }
        let Some(defender) = self
            .world
            .actor(target)
            .filter(|a| a.special == ClassSpecial::CounterAttack)
        else {
            return;
        };
        if !self.world.is_alive(attacker) {
            return;
        }

        let amount = BattleConfig::COUNTER_MULTIPLIER * (defender.damage_bonus + 1);
        debug!(
            target: "battle::resolve",
            defender = %target,
            attacker = %attacker,
            amount,
            "counter-attack"
        );
        let counter = EffectIntent::reaction(
            target.clone(),
            attacker.clone(),
            EffectKind::Damage,
            amount,
            "counter_attack",
        );
        self.apply_at(counter, depth + 1);
    }

    fn poison_on_hit(
        &mut self,
        intent: &EffectIntent,
        attacker: &ActorId,
        target: &ActorId,
        depth: u8,
    ) {
        if intent.effect == EffectKind::Poison || !intent.effect.is_offensive() {
            return;
        }
        let Some(source) = self
            .world
            .actor(attacker)
            .filter(|a| a.special == ClassSpecial::PoisonAffinity)
        else {
            return;
        };

        let amount = BattleConfig::POISON_ON_HIT_MULTIPLIER * (source.damage_bonus + 1);
        let poison = EffectIntent::reaction(
            attacker.clone(),
            target.clone(),
            EffectKind::Poison,
            amount,
            "poison_on_hit",
        );
        self.apply_at(poison, depth + 1);
    }

    fn attacker_procs(
        &mut self,
        intent: &EffectIntent,
        attacker: &ActorId,
        target: &ActorId,
        dealt: i32,
    ) {
        let Some(actor) = self.world.actor_mut(attacker).filter(|a| a.is_alive()) else {
            return;
        };
        let special = actor.special;

        let amount = match (special, &intent.effect) {
            (ClassSpecial::Lifesteal, EffectKind::Damage | EffectKind::Pierce) if dealt > 0 => {
                actor.heal(ceil_ratio(dealt, BattleConfig::LIFESTEAL_RATIO))
            }
            (ClassSpecial::DefenceSteal, EffectKind::Damage | EffectKind::Heal) => {
                let gain = ceil_ratio(dealt, BattleConfig::DEFENCE_STEAL_RATIO);
                actor.temp_defence += gain;
                gain
            }
            (ClassSpecial::AutoHeal, EffectKind::Heal) if attacker != target => {
                actor.heal(ceil_ratio(dealt, BattleConfig::AUTO_HEAL_RATIO))
            }
            (
                ClassSpecial::AutoHeal,
                EffectKind::Buff {
                    stat: Stat::Defence,
                },
            ) if attacker != target => {
                let gain = ceil_ratio(dealt, BattleConfig::AUTO_HEAL_RATIO);
                actor.temp_defence += gain;
                gain
            }
            _ => return,
        };

        if amount > 0 {
            self.events.push(CombatEvent::Proc {
                actor: attacker.clone(),
                special,
                amount,
            });
        }
    }
}
