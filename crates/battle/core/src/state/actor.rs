use bitflags::bitflags;

use super::{ActorId, Allegiance, Controller, Slot};
use crate::config::BattleConfig;
use crate::error::{CombatError, Result};

bitflags! {
    /// Boolean status flags carried by an actor.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct StatusFlags: u8 {
        /// Stunned: the next action point refill is reduced.
        const WEBBED = 0b0000_0001;
        /// Healing and regeneration have no effect.
        const ZOMBIFIED = 0b0000_0010;
        /// Survives one lethal hit at 1 health.
        const UNDEAD_RESISTANCE = 0b0000_0100;
    }
}

/// Class-special trait. Each actor holds exactly one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ClassSpecial {
    #[default]
    None,
    /// Heals for half the damage dealt.
    Lifesteal,
    /// Gains temporary defence from damage and healing dealt.
    DefenceSteal,
    /// Gains a share of heals and defence buffs given to others.
    AutoHeal,
    /// Stronger poison; every non-poison hit also poisons.
    PoisonAffinity,
    /// Strikes back when hit by a primary offensive stage.
    CounterAttack,
    /// Stronger defence buffs; temporary defence erodes twice as fast.
    DefenceBoost,
    /// Gains temporary damage whenever a same-allegiance actor dies.
    Cult,
    /// Immune to over-time debuffs.
    Steadfast,
}

/// Immutable base stats used to spawn actors.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActorTemplate {
    pub name: String,
    pub max_health: i32,
    pub defence: i32,
    pub damage_bonus: i32,
    pub action_points: u32,
    pub special: ClassSpecial,
    pub flags: StatusFlags,
    /// Action ids from the action catalogue.
    pub actions: Vec<String>,
}

impl ActorTemplate {
    pub fn new(name: impl Into<String>, max_health: i32, action_points: u32) -> Self {
        Self {
            name: name.into(),
            max_health,
            defence: 0,
            damage_bonus: 0,
            action_points,
            special: ClassSpecial::None,
            flags: StatusFlags::empty(),
            actions: Vec::new(),
        }
    }

    pub fn with_defence(mut self, defence: i32) -> Self {
        self.defence = defence;
        self
    }

    pub fn with_damage_bonus(mut self, damage_bonus: i32) -> Self {
        self.damage_bonus = damage_bonus;
        self
    }

    pub fn with_special(mut self, special: ClassSpecial) -> Self {
        self.special = special;
        self
    }

    pub fn with_flags(mut self, flags: StatusFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions = actions.into_iter().map(Into::into).collect();
        self
    }
}

/// Mutable combat state of one actor.
///
/// # Invariants
///
/// - `health <= max_health`
/// - dead ⇔ `health <= 0`
/// - `action_points <= starting_action_points`; costs are checked before
///   they are deducted
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Actor {
    pub id: ActorId,
    pub slot: Slot,
    pub name: String,
    pub controller: Controller,

    pub health: i32,
    pub max_health: i32,
    pub defence: i32,
    pub damage_bonus: i32,

    // Signed temporary modifiers; decay toward zero at turn start.
    pub temp_defence: i32,
    pub temp_damage: i32,
    pub temp_regen: i32,

    pub action_points: u32,
    pub starting_action_points: u32,

    pub protector: Option<ActorId>,
    pub flags: StatusFlags,
    pub special: ClassSpecial,
    pub actions: Vec<String>,
}

/// Outcome of [`Actor::begin_turn`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Upkeep {
    /// Health change realized from temporary regen (negative for poison).
    pub health_delta: i32,
    /// Action points withheld because the actor was webbed.
    pub withheld_action_points: u32,
}

impl Actor {
    pub fn from_template(template: &ActorTemplate, slot: Slot, controller: Controller) -> Self {
        Self {
            id: ActorId::from(slot),
            slot,
            name: template.name.clone(),
            controller,
            health: template.max_health,
            max_health: template.max_health,
            defence: template.defence,
            damage_bonus: template.damage_bonus,
            temp_defence: 0,
            temp_damage: 0,
            temp_regen: 0,
            action_points: template.action_points,
            starting_action_points: template.action_points,
            protector: None,
            flags: template.flags,
            special: template.special,
            actions: template.actions.clone(),
        }
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    #[inline]
    pub fn is_injured(&self) -> bool {
        self.health < self.max_health
    }

    pub fn allegiance(&self) -> Allegiance {
        self.slot.side.allegiance()
    }

    /// Defence including the temporary modifier.
    pub fn total_defence(&self) -> i32 {
        self.defence + self.temp_defence
    }

    /// Roll multiplier: `damage_bonus + temp_damage + 1`, never negative.
    pub fn damage_factor(&self) -> i32 {
        (self.damage_bonus + self.temp_damage + 1).max(0)
    }

    /// Adds health up to the maximum. Returns the amount actually gained.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.health;
        self.health = (self.health + amount.max(0)).min(self.max_health);
        self.health - before
    }

    pub fn take_damage(&mut self, amount: i32) {
        self.health -= amount.max(0);
    }

    /// Deducts `cost` after checking it is affordable.
    pub fn spend_action_points(&mut self, cost: u32) -> Result<()> {
        if cost > self.action_points {
            return Err(CombatError::InsufficientActionPoints {
                actor: self.id.clone(),
                cost,
                available: self.action_points,
            });
        }
        self.action_points -= cost;
        Ok(())
    }

    /// Moves temporary defence toward zero by `erosion` without crossing it.
    pub fn erode_temp_defence(&mut self, erosion: i32) {
        let erosion = erosion.max(0);
        self.temp_defence = if self.temp_defence > 0 {
            (self.temp_defence - erosion).max(0)
        } else {
            (self.temp_defence + erosion).min(0)
        };
    }

    /// Start-of-turn upkeep: realize regen/poison, decay temporary modifiers
    /// and refill action points.
    pub fn begin_turn(&mut self) -> Upkeep {
        let mut upkeep = Upkeep::default();

        if self.temp_regen > 0 && !self.flags.contains(StatusFlags::ZOMBIFIED) {
            upkeep.health_delta = self.heal(self.temp_regen);
        } else if self.temp_regen < 0 {
            self.take_damage(-self.temp_regen);
            upkeep.health_delta = self.temp_regen;
        }

        self.temp_defence = decay(self.temp_defence);
        self.temp_damage = decay(self.temp_damage);
        self.temp_regen = decay(self.temp_regen);

        let mut refill = self.starting_action_points;
        if self.flags.contains(StatusFlags::WEBBED) {
            upkeep.withheld_action_points = BattleConfig::STUN_ACTION_POINTS.min(refill);
            refill -= upkeep.withheld_action_points;
            self.flags.remove(StatusFlags::WEBBED);
        }
        self.action_points = refill;

        upkeep
    }
}

fn decay(value: i32) -> i32 {
    value - value.signum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Row, Side};

    fn actor() -> Actor {
        let template = ActorTemplate::new("Knight", 20, 3).with_defence(5);
        Actor::from_template(&template, Slot::new(Side::Party, Row::Front, 0), Controller::Player)
    }

    #[test]
    fn heal_caps_at_max_health() {
        let mut knight = actor();
        knight.health = 15;
        assert_eq!(knight.heal(10), 5);
        assert_eq!(knight.health, 20);
    }

    #[test]
    fn spending_checks_before_deducting() {
        let mut knight = actor();
        assert!(knight.spend_action_points(4).is_err());
        assert_eq!(knight.action_points, 3);
        knight.spend_action_points(3).unwrap();
        assert_eq!(knight.action_points, 0);
    }

    #[test]
    fn erosion_never_crosses_zero() {
        let mut knight = actor();
        knight.temp_defence = -3;
        knight.erode_temp_defence(1);
        assert_eq!(knight.temp_defence, -2);

        knight.temp_defence = 2;
        knight.erode_temp_defence(5);
        assert_eq!(knight.temp_defence, 0);
    }

    #[test]
    fn upkeep_realizes_poison_and_withholds_stunned_points() {
        let mut knight = actor();
        knight.temp_regen = -4;
        knight.temp_damage = 2;
        knight.action_points = 0;
        knight.flags.insert(StatusFlags::WEBBED);

        let upkeep = knight.begin_turn();

        assert_eq!(upkeep.health_delta, -4);
        assert_eq!(knight.health, 16);
        assert_eq!(knight.temp_regen, -3);
        assert_eq!(knight.temp_damage, 1);
        assert_eq!(knight.action_points, 2);
        assert!(!knight.flags.contains(StatusFlags::WEBBED));
    }
}
