//! Stage scaling and damage rolls.

use rand::Rng;

use crate::action::{DamageRoll, EffectKind, Stage, Stat};
use crate::state::{Actor, ClassSpecial};

/// Scales a stage's base range by the actor's damage factor.
///
/// ```text
/// min = (base_min + min_flat + trait_bonus) * factor
/// max = (base_max + trait_bonus) * factor
/// factor = max(0, damage_bonus + temp_damage + 1)
/// ```
pub(crate) fn scale_stage(stage: &Stage, actor: &Actor) -> DamageRoll {
    if actor.special == ClassSpecial::Lifesteal && stage.effect == EffectKind::Pierce {
        return DamageRoll::Suppressed {
            fixed: stage.max.max(0),
        };
    }

    let (min_flat, trait_bonus) = trait_adjustment(actor.special, &stage.effect);
    let factor = actor.damage_factor();
    let max = ((stage.max + trait_bonus) * factor).max(0);
    let min = ((stage.min + min_flat + trait_bonus) * factor).clamp(0, max);
    DamageRoll::Range { min, max }
}

/// `(min_flat_bonus, base_bonus)` granted by a class special to an effect kind.
fn trait_adjustment(special: ClassSpecial, effect: &EffectKind) -> (i32, i32) {
    match (special, effect) {
        (ClassSpecial::PoisonAffinity, EffectKind::Poison) => (0, 1),
        (ClassSpecial::AutoHeal, EffectKind::Heal) => (0, 1),
        (
            ClassSpecial::DefenceBoost,
            EffectKind::Buff {
                stat: Stat::Defence,
            },
        ) => (0, 1),
        (ClassSpecial::Lifesteal, EffectKind::Damage) => (1, 0),
        _ => (0, 0),
    }
}

/// Rolls a concrete amount. `scale` is the difficulty multiplier (1.0 when it
/// does not apply). Suppressed rolls ignore crit and scale.
pub(crate) fn roll_amount<R: Rng + ?Sized>(
    roll: DamageRoll,
    crit_chance: f32,
    crit_multiplier: f32,
    scale: f32,
    rng: &mut R,
) -> i32 {
    let base = match roll {
        DamageRoll::Suppressed { fixed } => return fixed.max(0),
        DamageRoll::Range { min, max } if min >= max => max,
        DamageRoll::Range { min, max } => rng.gen_range(min..=max),
    };

    let mut amount = base as f32;
    if crit_chance > 0.0 && rng.gen_bool(f64::from(crit_chance.min(1.0))) {
        amount *= crit_multiplier.max(1.0);
    }
    amount *= scale.max(0.0);
    (amount.ceil() as i32).max(0)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::action::TargetPattern;
    use crate::state::{ActorTemplate, Controller, Row, Side, Slot};

    fn actor(special: ClassSpecial, damage_bonus: i32) -> Actor {
        let template = ActorTemplate::new("Rogue", 10, 3)
            .with_damage_bonus(damage_bonus)
            .with_special(special);
        Actor::from_template(&template, Slot::new(Side::Party, Row::Mid, 1), Controller::Player)
    }

    #[test]
    fn scaling_multiplies_by_damage_factor() {
        let mut rogue = actor(ClassSpecial::None, 1);
        rogue.temp_damage = 1;
        let stage = Stage::new(TargetPattern::Single, EffectKind::Damage, 2, 4);
        assert_eq!(
            scale_stage(&stage, &rogue),
            DamageRoll::Range { min: 6, max: 12 }
        );
    }

    #[test]
    fn poison_affinity_only_boosts_poison() {
        let rogue = actor(ClassSpecial::PoisonAffinity, 0);
        let poison = Stage::new(TargetPattern::Single, EffectKind::Poison, 1, 2);
        let damage = Stage::new(TargetPattern::Single, EffectKind::Damage, 1, 2);
        assert_eq!(
            scale_stage(&poison, &rogue),
            DamageRoll::Range { min: 2, max: 3 }
        );
        assert_eq!(
            scale_stage(&damage, &rogue),
            DamageRoll::Range { min: 1, max: 2 }
        );
    }

    #[test]
    fn lifesteal_pierce_suppresses_roll() {
        let rogue = actor(ClassSpecial::Lifesteal, 3);
        let stage = Stage::new(TargetPattern::Single, EffectKind::Pierce, 2, 5);
        let roll = scale_stage(&stage, &rogue);
        assert_eq!(roll, DamageRoll::Suppressed { fixed: 5 });

        let mut rng = SmallRng::seed_from_u64(7);
        assert_eq!(roll_amount(roll, 1.0, 3.0, 2.0, &mut rng), 5);
    }

    #[test]
    fn negative_factor_never_yields_negative_rolls() {
        let mut rogue = actor(ClassSpecial::None, 0);
        rogue.temp_damage = -5;
        let stage = Stage::new(TargetPattern::Single, EffectKind::Damage, 3, 6);
        let roll = scale_stage(&stage, &rogue);
        assert_eq!(roll, DamageRoll::Range { min: 0, max: 0 });

        let mut rng = SmallRng::seed_from_u64(1);
        for _ in 0..32 {
            assert!(roll_amount(roll, 0.5, 2.0, 1.5, &mut rng) >= 0);
        }
    }

    #[test]
    fn certain_crit_multiplies_and_rounds_up() {
        let mut rng = SmallRng::seed_from_u64(3);
        let amount = roll_amount(DamageRoll::fixed(5), 1.0, 1.5, 1.0, &mut rng);
        assert_eq!(amount, 8);
    }
}
