//! Shared state behind a session: the world, the rules data and the outbound
//! seams. Scheduler, decision loops and the session all hold it through an
//! `Arc`.
use std::sync::Arc;

use battle_core::{ActionCatalogue, ActorId, CombatEvent, Resolution, World};
use rand::rngs::StdRng;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::api::{NetMessage, PresentationSink, Transport};
use crate::config::RuntimeConfig;
use crate::events::{Event, EventBus, TurnEvent};

/// World plus the random source used to roll on this participant.
pub(crate) struct Arena<W> {
    pub(crate) world: W,
    pub(crate) rng: StdRng,
}

pub(crate) struct BattleContext<W> {
    pub(crate) arena: Mutex<Arena<W>>,
    pub(crate) catalogue: Arc<ActionCatalogue>,
    pub(crate) bus: EventBus,
    pub(crate) sink: Arc<dyn PresentationSink>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) config: RuntimeConfig,
}

impl<W> BattleContext<W>
where
    W: World + Send + 'static,
{
    /// Offers resolution events to presentation and the combat topic.
    pub(crate) fn emit_combat(&self, events: &[CombatEvent]) {
        for event in events {
            self.sink.combat(event);
            self.bus.publish(Event::Combat(event.clone()));
        }
    }

    pub(crate) fn emit_turn(&self, event: TurnEvent) {
        self.sink.turn(&event);
        self.bus.publish(Event::Turn(event));
    }

    /// Sends to everyone; failures are logged and swallowed.
    pub(crate) async fn broadcast(&self, message: NetMessage) {
        if let Err(error) = self.transport.send_to_all(&message).await {
            warn!(target: "runtime::net", kind = message.kind(), %error, "broadcast failed");
        }
    }

    /// Removes each actor that died in `resolution` after the death grace.
    ///
    /// The actor is only removed if it is still dead when the timer fires.
    pub(crate) fn schedule_removals(self: &Arc<Self>, resolution: &Resolution) {
        for (actor, allegiance) in resolution.deaths() {
            let ctx = Arc::clone(self);
            let actor = actor.clone();
            debug!(target: "runtime::session", %actor, %allegiance, "removal scheduled");
            tokio::spawn(async move {
                tokio::time::sleep(ctx.config.death_grace).await;
                ctx.remove_if_dead(&actor).await;
            });
        }
    }

    async fn remove_if_dead(&self, actor: &ActorId) {
        let removed = {
            let mut arena = self.arena.lock().await;
            let dead = arena.world.actor(actor).is_some_and(|a| !a.is_alive());
            dead && arena.world.remove(actor).is_some()
        };
        if removed {
            debug!(target: "runtime::session", %actor, "dead actor removed");
            self.emit_turn(TurnEvent::ActorRemoved {
                actor: actor.clone(),
            });
        }
    }
}
