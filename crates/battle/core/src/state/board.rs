use std::collections::{BTreeMap, HashMap};

use strum::IntoEnumIterator;

use super::{Actor, ActorId, ActorTemplate, Controller, Row, Side, Slot};
use crate::config::BattleConfig;
use crate::error::{CombatError, Result};
use crate::world::World;

/// In-memory board: two sides of three rows, `row_width` columns each.
///
/// Actors are kept in a `BTreeMap` so iteration order (and therefore target
/// order) is stable across runs.
#[derive(Clone, Debug, Default)]
pub struct Board {
    config: BattleConfig,
    actors: BTreeMap<ActorId, Actor>,
    templates: HashMap<String, ActorTemplate>,
}

impl Board {
    pub fn new(config: BattleConfig) -> Self {
        Self {
            config,
            actors: BTreeMap::new(),
            templates: HashMap::new(),
        }
    }

    pub fn with_templates<I>(mut self, templates: I) -> Self
    where
        I: IntoIterator<Item = ActorTemplate>,
    {
        for template in templates {
            self.templates.insert(template.name.clone(), template);
        }
        self
    }

    pub fn config(&self) -> &BattleConfig {
        &self.config
    }

    pub fn template(&self, name: &str) -> Option<&ActorTemplate> {
        self.templates.get(name)
    }

    /// Places an actor from a registered template at `slot`.
    pub fn place(&mut self, template: &str, slot: Slot, controller: Controller) -> Result<ActorId> {
        let template = self
            .templates
            .get(template)
            .ok_or_else(|| CombatError::UnknownTemplate(template.to_owned()))?;
        Ok(self.insert(Actor::from_template(template, slot, controller)))
    }

    /// Inserts a prepared actor, replacing whoever held its slot.
    pub fn insert(&mut self, actor: Actor) -> ActorId {
        let id = actor.id.clone();
        self.actors.insert(id.clone(), actor);
        id
    }

    pub fn actors(&self) -> impl Iterator<Item = &Actor> {
        self.actors.values()
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    fn slots(&self, side: Side) -> impl Iterator<Item = Slot> + '_ {
        Row::iter().flat_map(move |row| {
            (0..self.config.row_width).map(move |column| Slot::new(side, row, column))
        })
    }
}

impl World for Board {
    fn actor(&self, id: &ActorId) -> Option<&Actor> {
        self.actors.get(id)
    }

    fn actor_mut(&mut self, id: &ActorId) -> Option<&mut Actor> {
        self.actors.get_mut(id)
    }

    fn actor_ids(&self) -> Vec<ActorId> {
        self.actors.keys().cloned().collect()
    }

    fn empty_slots(&self, side: Side) -> Vec<Slot> {
        self.slots(side)
            .filter(|slot| !self.actors.contains_key(&ActorId::from(*slot)))
            .collect()
    }

    fn living_in_row(&self, side: Side, row: Row) -> usize {
        self.actors
            .values()
            .filter(|a| a.slot.side == side && a.slot.row == row && a.is_alive())
            .count()
    }

    fn living(&self, side: Side) -> Vec<ActorId> {
        let mut living: Vec<&Actor> = self
            .actors
            .values()
            .filter(|a| a.slot.side == side && a.is_alive())
            .collect();
        living.sort_by_key(|a| a.slot);
        living.into_iter().map(|a| a.id.clone()).collect()
    }

    fn choose_spawn_slot(&self, free: &[Slot], row_hint: Row) -> Option<Slot> {
        free.iter()
            .copied()
            .min_by_key(|slot| ((slot.row as i32 - row_hint as i32).abs(), *slot))
    }

    fn spawn(&mut self, slot: Slot, template: &str, controller: Controller) -> Result<ActorId> {
        if self.actors.contains_key(&ActorId::from(slot)) {
            return Err(CombatError::NoFreeSlot);
        }
        self.place(template, slot, controller)
    }

    fn remove(&mut self, id: &ActorId) -> Option<Actor> {
        self.actors.remove(id)
    }
}
