//! Target pattern resolution.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::action::TargetPattern;
use crate::state::{Actor, ActorId, Side};
use crate::world::World;

/// Resolves `pattern` into concrete target ids for `caster`.
///
/// `chosen` is the caller's explicit pick (player input or a redirect). One
/// pick is shared by every stage of an action, so `Single` and `SingleAlly`
/// only honor it when it stands on their side; otherwise they select as if
/// nothing was chosen. A pick nobody stands on is passed through and reported
/// by the pipeline as an invalid target.
pub(crate) fn select_targets<W, R>(
    world: &W,
    caster: &Actor,
    pattern: TargetPattern,
    chosen: Option<&ActorId>,
    rng: &mut R,
) -> Vec<ActorId>
where
    W: World + ?Sized,
    R: Rng + ?Sized,
{
    let own_side = caster.slot.side;
    let foe_side = own_side.opposing();
    let chosen_on = |side: Side| {
        chosen
            .filter(|id| world.actor(id).is_none_or(|a| a.slot.side == side))
            .cloned()
    };

    match pattern {
        TargetPattern::Caster => vec![caster.id.clone()],
        TargetPattern::Chosen => chosen.cloned().into_iter().collect(),
        TargetPattern::Single => match chosen_on(foe_side) {
            Some(id) => vec![id],
            None => random_one(world.living(foe_side), rng),
        },
        TargetPattern::Random => random_one(world.living(foe_side), rng),
        TargetPattern::FrontRow
        | TargetPattern::MidRow
        | TargetPattern::BackRow
        | TargetPattern::FrontAndMid
        | TargetPattern::AllFoes => {
            let rows = pattern.rows().unwrap_or_default();
            world
                .living(foe_side)
                .into_iter()
                .filter(|id| world.actor(id).is_some_and(|a| rows.contains(&a.slot.row)))
                .collect()
        }
        TargetPattern::SingleAlly => match chosen_on(own_side) {
            Some(id) => vec![id],
            None => most_injured(world, world.living(own_side))
                .into_iter()
                .collect(),
        },
        TargetPattern::AllAllies => world.living(own_side),
    }
}

fn random_one<R: Rng + ?Sized>(candidates: Vec<ActorId>, rng: &mut R) -> Vec<ActorId> {
    candidates.choose(rng).cloned().into_iter().collect()
}

/// Ally with the largest health deficit; front-most on ties.
pub(crate) fn most_injured<W: World + ?Sized>(world: &W, allies: Vec<ActorId>) -> Option<ActorId> {
    allies
        .into_iter()
        .filter_map(|id| world.actor(&id).map(|a| (a.max_health - a.health, id)))
        .min_by_key(|(deficit, _)| -deficit)
        .map(|(_, id)| id)
}
