//! Board and actor state.
//!
//! Actors are addressed by a stable location key ([`ActorId`]) derived from the
//! board [`Slot`] they were spawned into.

mod actor;
mod board;

use core::fmt;

pub use actor::{Actor, ActorTemplate, ClassSpecial, StatusFlags, Upkeep};
pub use board::Board;

/// Stable location key of an actor (e.g. `"horde-front-1"`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ActorId(String);

impl ActorId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActorId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for ActorId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<Slot> for ActorId {
    fn from(slot: Slot) -> Self {
        Self(slot.to_string())
    }
}

/// Half of the board an actor stands on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "lowercase")]
pub enum Side {
    /// Player characters and their AI allies.
    Party,
    /// Hostile units.
    Horde,
}

impl Side {
    pub const fn opposing(self) -> Side {
        match self {
            Side::Party => Side::Horde,
            Side::Horde => Side::Party,
        }
    }

    pub const fn allegiance(self) -> Allegiance {
        match self {
            Side::Party => Allegiance::Ally,
            Side::Horde => Allegiance::Hostile,
        }
    }
}

/// Row within a side, front to back.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display, strum::EnumIter,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "lowercase")]
pub enum Row {
    Front,
    Mid,
    Back,
}

impl Row {
    /// Rows strictly in front of this one.
    pub fn ahead(self) -> &'static [Row] {
        match self {
            Row::Front => &[],
            Row::Mid => &[Row::Front],
            Row::Back => &[Row::Front, Row::Mid],
        }
    }
}

/// Allegiance tag attached to death notifications.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Allegiance {
    Ally,
    Hostile,
}

/// Who decides an actor's actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Controller {
    Player,
    AllyAi,
    HostileAi,
}

impl Controller {
    pub const fn is_autonomous(self) -> bool {
        !matches!(self, Controller::Player)
    }
}

/// Board position. Its string form is the [`ActorId`] of whoever occupies it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Slot {
    pub side: Side,
    pub row: Row,
    pub column: u8,
}

impl Slot {
    pub const fn new(side: Side, row: Row, column: u8) -> Self {
        Self { side, row, column }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.side, self.row, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_key_is_stable() {
        let slot = Slot::new(Side::Horde, Row::Mid, 2);
        assert_eq!(ActorId::from(slot).as_str(), "horde-mid-2");
    }

    #[test]
    fn rows_ahead_are_more_forward() {
        assert!(Row::Front.ahead().is_empty());
        assert_eq!(Row::Back.ahead(), &[Row::Front, Row::Mid]);
    }
}
