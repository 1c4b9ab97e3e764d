//! AI decision filter.
//!
//! Removes actions that would be pointless right now (healing a healthy actor,
//! an area attack on a lone target, spawning into a full board) and picks
//! uniformly from what is left. If every affordable action is filtered out,
//! the pick falls back to the unfiltered list so the actor still acts.

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{trace, warn};

use crate::action::{ActionCatalogue, ActionDefinition, EffectKind, Stat, TargetPattern};
use crate::config::BattleConfig;
use crate::resolve::targeting::most_injured;
use crate::state::Actor;
use crate::world::World;

/// Wave-level facts the filter needs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecisionContext {
    pub turn_in_wave: u32,
    pub boss_wave: bool,
}

/// Actions an actor could take this step.
#[derive(Debug, Default)]
pub struct Candidates<'c> {
    /// Known actions the actor can pay for.
    pub affordable: Vec<&'c ActionDefinition>,
    /// Affordable actions that passed every heuristic.
    pub filtered: Vec<&'c ActionDefinition>,
}

impl<'c> Candidates<'c> {
    /// Uniform pick from `filtered`, else from `affordable`.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&'c ActionDefinition> {
        let pool = if self.filtered.is_empty() {
            &self.affordable
        } else {
            &self.filtered
        };
        pool.choose(rng).copied()
    }
}

/// Builds the candidate set for `actor`.
pub fn candidates<'c, W: World + ?Sized>(
    actor: &Actor,
    catalogue: &'c ActionCatalogue,
    world: &W,
    ctx: DecisionContext,
) -> Candidates<'c> {
    let affordable: Vec<&ActionDefinition> = actor
        .actions
        .iter()
        .filter_map(|id| {
            let action = catalogue.get(id);
            if action.is_none() {
                warn!(target: "battle::ai", actor = %actor.id, action = %id, "unknown action id");
            }
            action
        })
        .filter(|action| action.cost <= actor.action_points)
        // Autonomous actors never have an explicit pick to aim with.
        .filter(|action| !needs_explicit_pick(action))
        .collect();

    let filtered = affordable
        .iter()
        .copied()
        .filter(|action| {
            let keep = is_worthwhile(action, actor, world, ctx);
            if !keep {
                trace!(target: "battle::ai", actor = %actor.id, action = %action.id, "filtered out");
            }
            keep
        })
        .collect();

    Candidates {
        affordable,
        filtered,
    }
}

/// Chooses the next action for `actor`, or `None` when nothing is affordable.
pub fn choose<'c, W, R>(
    actor: &Actor,
    catalogue: &'c ActionCatalogue,
    world: &W,
    ctx: DecisionContext,
    rng: &mut R,
) -> Option<&'c ActionDefinition>
where
    W: World + ?Sized,
    R: Rng + ?Sized,
{
    candidates(actor, catalogue, world, ctx).pick(rng)
}

/// Heuristic validity of one action, judged on its headline stage.
pub fn is_worthwhile<W: World + ?Sized>(
    action: &ActionDefinition,
    actor: &Actor,
    world: &W,
    ctx: DecisionContext,
) -> bool {
    let Some(stage) = action.headline() else {
        return false;
    };
    let own_side = actor.slot.side;

    match (stage.target, &stage.effect) {
        (TargetPattern::Chosen, _) => false,
        (TargetPattern::Caster, EffectKind::Heal) => actor.is_injured(),
        (
            TargetPattern::Caster,
            EffectKind::Buff {
                stat: Stat::Defence,
            },
        ) => actor
            .slot
            .row
            .ahead()
            .iter()
            .all(|row| world.living_in_row(own_side, *row) == 0),
        (TargetPattern::Caster, EffectKind::Spawn { count, .. }) => {
            ctx.turn_in_wave <= BattleConfig::spawn_turn_ceiling(ctx.boss_wave)
                && world.empty_slots(own_side).len() >= usize::from(*count)
        }
        (pattern, _) if pattern.rows().is_some() => {
            let rows = pattern.rows().unwrap_or_default();
            let occupants: usize = rows
                .iter()
                .map(|row| world.living_in_row(own_side.opposing(), *row))
                .sum();
            occupants > 1
        }
        (TargetPattern::SingleAlly, EffectKind::Heal) => injured_allies(actor, world) > 0,
        // The automatic pick must not be the caster, or the protect is a no-op.
        (TargetPattern::SingleAlly, EffectKind::Protect) => {
            most_injured(world, world.living(own_side)).is_some_and(|id| id != actor.id)
        }
        (TargetPattern::AllAllies, EffectKind::Heal) => injured_allies(actor, world) >= 2,
        _ => true,
    }
}

fn needs_explicit_pick(action: &ActionDefinition) -> bool {
    action
        .headline()
        .is_some_and(|stage| stage.target == TargetPattern::Chosen)
}

fn injured_allies<W: World + ?Sized>(actor: &Actor, world: &W) -> usize {
    world
        .living(actor.slot.side)
        .iter()
        .filter(|id| world.actor(id).is_some_and(Actor::is_injured))
        .count()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::action::Stage;
    use crate::state::{ActorId, ActorTemplate, Board, Controller, Row, Side, Slot};

    fn catalogue() -> ActionCatalogue {
        ActionCatalogue::new([
            ActionDefinition::new(
                "mend",
                1,
                Stage::new(TargetPattern::Caster, EffectKind::Heal, 2, 3),
            ),
            ActionDefinition::new(
                "bite",
                1,
                Stage::new(TargetPattern::Single, EffectKind::Damage, 1, 2),
            ),
            ActionDefinition::new(
                "sweep",
                2,
                Stage::new(TargetPattern::FrontRow, EffectKind::Damage, 1, 1),
            ),
            ActionDefinition::new(
                "brood",
                1,
                Stage::new(
                    TargetPattern::Caster,
                    EffectKind::Spawn {
                        template: "Whelp".into(),
                        count: 2,
                        row_hint: Row::Back,
                    },
                    0,
                    0,
                ),
            ),
            ActionDefinition::new(
                "patch",
                1,
                Stage::new(TargetPattern::SingleAlly, EffectKind::Heal, 2, 2),
            ),
            ActionDefinition::new(
                "guard",
                1,
                Stage::new(TargetPattern::SingleAlly, EffectKind::Protect, 0, 0),
            ),
            ActionDefinition::new(
                "chorus",
                2,
                Stage::new(TargetPattern::AllAllies, EffectKind::Heal, 2, 2),
            ),
            ActionDefinition::new(
                "mark",
                1,
                Stage::new(TargetPattern::Chosen, EffectKind::Damage, 3, 3),
            ),
            ActionDefinition::new(
                "harden",
                1,
                Stage::new(
                    TargetPattern::Caster,
                    EffectKind::Buff {
                        stat: Stat::Defence,
                    },
                    1,
                    1,
                ),
            ),
        ])
    }

    fn board() -> Board {
        let mut board = Board::new(BattleConfig::default()).with_templates([
            ActorTemplate::new("Hero", 20, 3),
            ActorTemplate::new("Wolf", 10, 3).with_actions(["mend", "bite"]),
            ActorTemplate::new("Whelp", 3, 1),
        ]);
        board
            .place("Hero", Slot::new(Side::Party, Row::Front, 0), Controller::Player)
            .unwrap();
        board
            .place("Wolf", Slot::new(Side::Horde, Row::Mid, 0), Controller::HostileAi)
            .unwrap();
        board
    }

    fn wolf(board: &Board) -> Actor {
        board.actor(&ActorId::from("horde-mid-0")).cloned().unwrap()
    }

    #[test]
    fn healthy_actor_never_picks_self_heal() {
        let board = board();
        let catalogue = catalogue();
        let wolf = wolf(&board);
        let mut rng = SmallRng::seed_from_u64(5);

        for _ in 0..64 {
            let action = choose(&wolf, &catalogue, &board, DecisionContext::default(), &mut rng);
            assert_eq!(action.map(|a| a.id.as_str()), Some("bite"));
        }
    }

    #[test]
    fn lone_self_heal_is_still_used_as_fallback() {
        let board = board();
        let catalogue = catalogue();
        let mut wolf = wolf(&board);
        wolf.actions = vec!["mend".into()];
        let mut rng = SmallRng::seed_from_u64(5);

        let action = choose(&wolf, &catalogue, &board, DecisionContext::default(), &mut rng);
        assert_eq!(action.map(|a| a.id.as_str()), Some("mend"));
    }

    #[test]
    fn nothing_affordable_means_no_action() {
        let board = board();
        let catalogue = catalogue();
        let mut wolf = wolf(&board);
        wolf.action_points = 0;
        let mut rng = SmallRng::seed_from_u64(5);

        assert!(choose(&wolf, &catalogue, &board, DecisionContext::default(), &mut rng).is_none());
    }

    #[test]
    fn area_attack_needs_more_than_one_occupant() {
        let mut board = board();
        let catalogue = catalogue();
        let wolf = wolf(&board);
        let sweep = catalogue.get("sweep").unwrap();
        let ctx = DecisionContext::default();

        assert!(!is_worthwhile(sweep, &wolf, &board, ctx));

        board
            .place("Hero", Slot::new(Side::Party, Row::Front, 1), Controller::Player)
            .unwrap();
        assert!(is_worthwhile(sweep, &wolf, &board, ctx));
    }

    #[test]
    fn spawn_respects_wave_ceiling() {
        let board = board();
        let catalogue = catalogue();
        let wolf = wolf(&board);
        let brood = catalogue.get("brood").unwrap();

        let early = DecisionContext {
            turn_in_wave: 10,
            boss_wave: false,
        };
        let late = DecisionContext {
            turn_in_wave: 11,
            boss_wave: false,
        };
        let late_boss = DecisionContext {
            turn_in_wave: 11,
            boss_wave: true,
        };
        assert!(is_worthwhile(brood, &wolf, &board, early));
        assert!(!is_worthwhile(brood, &wolf, &board, late));
        assert!(is_worthwhile(brood, &wolf, &board, late_boss));
    }

    #[test]
    fn defence_buff_skipped_behind_a_front_liner() {
        let mut board = board();
        let catalogue = catalogue();
        let harden = catalogue.get("harden").unwrap();
        let ctx = DecisionContext::default();

        assert!(is_worthwhile(harden, &wolf(&board), &board, ctx));

        board
            .place("Wolf", Slot::new(Side::Horde, Row::Front, 2), Controller::HostileAi)
            .unwrap();
        assert!(!is_worthwhile(harden, &wolf(&board), &board, ctx));
    }

    #[test]
    fn ally_heal_needs_someone_injured() {
        let mut board = board();
        let catalogue = catalogue();
        let patch = catalogue.get("patch").unwrap();
        let ctx = DecisionContext::default();

        assert!(!is_worthwhile(patch, &wolf(&board), &board, ctx));

        board
            .actor_mut(&ActorId::from("horde-mid-0"))
            .unwrap()
            .health = 4;
        assert!(is_worthwhile(patch, &wolf(&board), &board, ctx));
    }

    #[test]
    fn group_heal_needs_two_injured_allies() {
        let mut board = board();
        let catalogue = catalogue();
        let chorus = catalogue.get("chorus").unwrap();
        let ctx = DecisionContext::default();
        let packmate = board
            .place("Wolf", Slot::new(Side::Horde, Row::Back, 1), Controller::HostileAi)
            .unwrap();

        board
            .actor_mut(&ActorId::from("horde-mid-0"))
            .unwrap()
            .health = 4;
        assert!(!is_worthwhile(chorus, &wolf(&board), &board, ctx));

        board.actor_mut(&packmate).unwrap().health = 6;
        assert!(is_worthwhile(chorus, &wolf(&board), &board, ctx));
    }

    #[test]
    fn protect_needs_a_teammate_other_than_the_caster() {
        let mut board = board();
        let catalogue = catalogue();
        let guard = catalogue.get("guard").unwrap();
        let ctx = DecisionContext::default();

        assert!(!is_worthwhile(guard, &wolf(&board), &board, ctx));

        board
            .place("Wolf", Slot::new(Side::Horde, Row::Front, 0), Controller::HostileAi)
            .unwrap();
        assert!(is_worthwhile(guard, &wolf(&board), &board, ctx));

        // An injured caster would be picked as its own protege.
        board
            .actor_mut(&ActorId::from("horde-mid-0"))
            .unwrap()
            .health = 4;
        assert!(!is_worthwhile(guard, &wolf(&board), &board, ctx));
    }

    #[test]
    fn explicitly_aimed_actions_are_never_candidates() {
        let board = board();
        let catalogue = catalogue();
        let mut wolf = wolf(&board);
        wolf.actions = vec!["mark".into()];
        let mut rng = SmallRng::seed_from_u64(5);

        let mark = catalogue.get("mark").unwrap();
        assert!(!is_worthwhile(mark, &wolf, &board, DecisionContext::default()));
        assert!(choose(&wolf, &catalogue, &board, DecisionContext::default(), &mut rng).is_none());
    }
}
