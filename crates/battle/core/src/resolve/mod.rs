//! Action resolution pipeline.
//!
//! [`Pipeline`] turns an [`ActionDefinition`] into [`EffectIntent`]s, applies
//! them to the world, and runs the reactions they trigger:
//!
//! 1. Check and deduct the action point cost
//! 2. For each stage (secondary, primary, tertiary): scale the base range,
//!    resolve targets, roll per target and apply
//! 3. After each application: death check, counter-attack, poison-on-hit,
//!    class-special procs on the attacker
//!
//! The pipeline knows nothing about turns or networking. Everything it does is
//! recorded as [`CombatEvent`]s for the caller to forward.

mod effects;
mod reactions;
mod roll;
pub(crate) mod targeting;

use rand::Rng;
use tracing::{debug, warn};

use crate::action::{ActionDefinition, EffectIntent, Origin, StageId};
use crate::config::BattleConfig;
use crate::error::{CombatError, Result};
use crate::state::{ActorId, Allegiance, ClassSpecial, Upkeep};
use crate::world::World;

/// Why an applied intent had no effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IgnoreReason {
    /// Over-time debuff against a `Steadfast` target.
    Steadfast,
    /// Healing against a zombified target.
    Zombified,
    /// Actor tried to protect itself.
    SelfProtect,
}

/// Everything observable that happened during resolution, in order.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CombatEvent {
    /// An intent landed. `dealt` is the post-mitigation amount for damage
    /// kinds and the rolled amount otherwise.
    EffectApplied { intent: EffectIntent, dealt: i32 },
    EffectIgnored {
        intent: EffectIntent,
        reason: IgnoreReason,
    },
    /// A harmful intent moved from a protected actor to its protector.
    Redirected { from: ActorId, to: ActorId },
    /// The referenced location was empty.
    TargetMissing { target: ActorId },
    /// Class-special bonus granted to `actor`.
    Proc {
        actor: ActorId,
        special: ClassSpecial,
        amount: i32,
    },
    /// Start-of-turn regen or poison.
    Upkeep { actor: ActorId, health_delta: i32 },
    UndeadResisted { actor: ActorId },
    ActorDied {
        actor: ActorId,
        allegiance: Allegiance,
    },
    Spawned { actor: ActorId, summoner: ActorId },
    SummonRequested { summoner: ActorId, count: u8 },
    RelocateRequested { actor: ActorId, target: ActorId },
}

/// Result of one pipeline run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Resolution {
    pub events: Vec<CombatEvent>,
}

impl Resolution {
    /// Actors that died during this resolution.
    pub fn deaths(&self) -> impl Iterator<Item = (&ActorId, Allegiance)> {
        self.events.iter().filter_map(|e| match e {
            CombatEvent::ActorDied { actor, allegiance } => Some((actor, *allegiance)),
            _ => None,
        })
    }

    /// Intents that landed, in application order.
    pub fn applied(&self) -> impl Iterator<Item = &EffectIntent> {
        self.events.iter().filter_map(|e| match e {
            CombatEvent::EffectApplied { intent, .. } => Some(intent),
            _ => None,
        })
    }

    /// Applied intents that came from an action stage.
    ///
    /// These are the ones replicated to other participants. Reactions are
    /// deterministic given the stage intent and are re-derived on arrival.
    pub fn stage_intents(&self) -> impl Iterator<Item = &EffectIntent> {
        self.applied().filter(|intent| intent.stage.is_some())
    }
}

/// Resolution context over a mutable world and a random source.
///
/// Randomness is local to the deciding side; participants that receive the
/// resulting intents apply them through [`Pipeline::apply`] without rolling.
pub struct Pipeline<'a, W: World + ?Sized, R: Rng + ?Sized> {
    world: &'a mut W,
    rng: &'a mut R,
    difficulty: f32,
    events: Vec<CombatEvent>,
}

impl<'a, W: World + ?Sized, R: Rng + ?Sized> Pipeline<'a, W, R> {
    pub fn new(world: &'a mut W, rng: &'a mut R) -> Self {
        Self {
            world,
            rng,
            difficulty: 1.0,
            events: Vec::new(),
        }
    }

    /// Multiplier for hostile AI offensive rolls.
    pub fn with_difficulty(mut self, difficulty: f32) -> Self {
        self.difficulty = difficulty.max(0.0);
        self
    }

    /// Resolves every stage of `action` for `actor`.
    ///
    /// `chosen` is the explicit target for `Single`/`Chosen`/`SingleAlly`
    /// patterns; AI callers pass `None` and let the pattern pick.
    pub fn resolve(
        &mut self,
        action: &ActionDefinition,
        actor: &ActorId,
        origin: Origin,
        chosen: Option<&ActorId>,
    ) -> Result<()> {
        let caster = self
            .world
            .actor_mut(actor)
            .ok_or_else(|| CombatError::ActorNotFound(actor.clone()))?;
        if !caster.is_alive() {
            return Err(CombatError::ActorDead(actor.clone()));
        }
        caster.spend_action_points(action.cost)?;

        debug!(
            target: "battle::resolve",
            actor = %actor,
            action = %action.id,
            cost = action.cost,
            "resolving action"
        );

        for (stage_id, stage) in action.stages() {
            // Snapshot per stage: earlier stages may have buffed the caster.
            let Some(caster) = self.world.actor(actor).filter(|a| a.is_alive()).cloned() else {
                debug!(
                    target: "battle::resolve",
                    actor = %actor,
                    stage = %stage_id,
                    "caster fell mid-action, remaining stages skipped"
                );
                break;
            };

            let roll = roll::scale_stage(stage, &caster);
            let scale = if origin.is_hostile() && stage.effect.is_offensive() {
                self.difficulty
            } else {
                1.0
            };
            let targets = targeting::select_targets(
                &*self.world,
                &caster,
                stage.target,
                chosen,
                &mut *self.rng,
            );
            if targets.is_empty() {
                debug!(
                    target: "battle::resolve",
                    actor = %actor,
                    stage = %stage_id,
                    pattern = %stage.target,
                    "no targets for stage"
                );
                continue;
            }

            for target in targets {
                let resolved = roll::roll_amount(
                    roll,
                    action.crit_chance,
                    action.crit_multiplier,
                    scale,
                    &mut *self.rng,
                );
                let intent = EffectIntent {
                    attacker: Some(actor.clone()),
                    target: Some(target),
                    stage: Some(stage_id),
                    effect: stage.effect.clone(),
                    pattern: stage.target,
                    roll,
                    resolved,
                    crit_chance: action.crit_chance,
                    crit_multiplier: action.crit_multiplier,
                    cost: if stage_id == StageId::Primary {
                        action.cost
                    } else {
                        0
                    },
                    origin,
                    action_id: action.id.clone(),
                    display_name: action.name.clone(),
                };
                self.apply_at(intent, 0);
            }
        }

        Ok(())
    }

    /// Applies an already-resolved intent (replication path, redirects and
    /// reactions). `intent.resolved` is used as-is.
    pub fn apply(&mut self, intent: EffectIntent) {
        self.apply_at(intent, 0);
    }

    /// Start-of-turn upkeep for `actor`, including a death check for poison.
    pub fn begin_turn(&mut self, actor: &ActorId) -> Result<Upkeep> {
        let upkeep = self
            .world
            .actor_mut(actor)
            .ok_or_else(|| CombatError::ActorNotFound(actor.clone()))?
            .begin_turn();
        if upkeep.health_delta != 0 {
            self.events.push(CombatEvent::Upkeep {
                actor: actor.clone(),
                health_delta: upkeep.health_delta,
            });
            self.check_death(actor);
        }
        Ok(upkeep)
    }

    pub fn events(&self) -> &[CombatEvent] {
        &self.events
    }

    pub fn finish(self) -> Resolution {
        Resolution {
            events: self.events,
        }
    }

    fn apply_at(&mut self, intent: EffectIntent, depth: u8) {
        if depth > BattleConfig::MAX_REACTION_DEPTH {
            warn!(
                target: "battle::resolve",
                action = %intent.action_id,
                depth,
                "reaction depth exceeded, intent dropped"
            );
            return;
        }

        let Some(target) = intent.target.clone() else {
            warn!(
                target: "battle::resolve",
                action = %intent.action_id,
                "intent without target dropped"
            );
            return;
        };

        let Some(target_actor) = self.world.actor(&target) else {
            warn!(
                target: "battle::resolve",
                error = %CombatError::InvalidTarget(target.clone()),
                "skipping effect"
            );
            self.events.push(CombatEvent::TargetMissing { target });
            return;
        };
        if !target_actor.is_alive() {
            debug!(target: "battle::resolve", target = %target, "target already dead");
            return;
        }

        if intent.effect.is_redirectable()
            && let Some(protector) = self.redirect_target(&target)
        {
            debug!(
                target: "battle::resolve",
                from = %target,
                to = %protector,
                "redirecting to protector"
            );
            self.events.push(CombatEvent::Redirected {
                from: target,
                to: protector.clone(),
            });
            self.apply_at(intent.redirected(protector), depth + 1);
            return;
        }

        let Some(dealt) = self.apply_effect(&intent, &target) else {
            return;
        };
        self.events.push(CombatEvent::EffectApplied {
            intent: intent.clone(),
            dealt,
        });
        self.react(&intent, &target, dealt, depth);
    }

    /// Protector that should absorb harm aimed at `target`, if any.
    ///
    /// Mutual protection never redirects, which is what keeps two actors
    /// guarding each other from bouncing an effect forever.
    fn redirect_target(&self, target: &ActorId) -> Option<ActorId> {
        let protector_id = self.world.actor(target)?.protector.clone()?;
        if &protector_id == target {
            return None;
        }
        let protector = self.world.actor(&protector_id).filter(|p| p.is_alive())?;
        if protector.protector.as_ref() == Some(target) {
            return None;
        }
        Some(protector_id)
    }
}
