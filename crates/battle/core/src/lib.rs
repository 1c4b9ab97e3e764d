//! Combat rules for the turn-based battle client.
//!
//! `battle-core` is synchronous and runtime-free. It defines the board and
//! actor state, the static action data, the resolution pipeline that applies
//! actions, and the AI filter that picks them. Turn sequencing, readiness
//! barriers and networking live in the `battle-runtime` crate, which drives
//! this one.
pub mod action;
pub mod ai;
pub mod config;
pub mod error;
pub mod resolve;
pub mod state;
pub mod world;

pub use action::{
    ActionCatalogue, ActionDefinition, DamageRoll, EffectIntent, EffectKind, Origin, Stage,
    StageId, Stat, TargetPattern,
};
pub use ai::{Candidates, DecisionContext};
pub use config::BattleConfig;
pub use error::{CombatError, ErrorSeverity};
pub use resolve::{CombatEvent, IgnoreReason, Pipeline, Resolution};
pub use state::{
    Actor, ActorId, ActorTemplate, Allegiance, Board, ClassSpecial, Controller, Row, Side, Slot,
    StatusFlags, Upkeep,
};
pub use world::World;
