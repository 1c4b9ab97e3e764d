//! World query seam.
//!
//! Board occupancy is owned by the embedding application. The pipeline and
//! the AI filter only see it through [`World`]; [`crate::Board`] is the
//! in-crate implementation used by the runtime and tests.

use crate::error::Result;
use crate::state::{Actor, ActorId, Controller, Row, Side, Slot};

pub trait World {
    fn actor(&self, id: &ActorId) -> Option<&Actor>;

    fn actor_mut(&mut self, id: &ActorId) -> Option<&mut Actor>;

    /// Every actor id currently on the board, living or awaiting removal.
    fn actor_ids(&self) -> Vec<ActorId>;

    /// Unoccupied slots on `side`.
    fn empty_slots(&self, side: Side) -> Vec<Slot>;

    /// Number of living actors in `row` of `side`.
    fn living_in_row(&self, side: Side, row: Row) -> usize;

    /// Ids of the living actors on `side`, front row first.
    fn living(&self, side: Side) -> Vec<ActorId>;

    /// Picks where a spawn lands among `free`, preferring `row_hint`.
    fn choose_spawn_slot(&self, free: &[Slot], row_hint: Row) -> Option<Slot>;

    /// Places a new actor built from the named template.
    fn spawn(&mut self, slot: Slot, template: &str, controller: Controller) -> Result<ActorId>;

    fn remove(&mut self, id: &ActorId) -> Option<Actor>;

    fn is_alive(&self, id: &ActorId) -> bool {
        self.actor(id).is_some_and(Actor::is_alive)
    }
}
