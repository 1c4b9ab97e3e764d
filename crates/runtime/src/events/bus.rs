//! Topic-based event bus implementation.

use battle_core::CombatEvent;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use super::types::{NetworkEvent, PhaseEvent, TurnEvent};

/// Topics for event routing
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Topic {
    /// Effect applications, procs, deaths
    Combat,
    /// Scheduler progress
    Turn,
    /// Readiness gates
    Phase,
    /// Membership and heartbeat
    Network,
}

impl Topic {
    pub const ALL: [Topic; 4] = [Topic::Combat, Topic::Turn, Topic::Phase, Topic::Network];
}

/// Event wrapper that carries the topic and typed event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Combat(CombatEvent),
    Turn(TurnEvent),
    Phase(PhaseEvent),
    Network(NetworkEvent),
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::Combat(_) => Topic::Combat,
            Event::Turn(_) => Topic::Turn,
            Event::Phase(_) => Topic::Phase,
            Event::Network(_) => Topic::Network,
        }
    }
}

struct Channels {
    combat: broadcast::Sender<Event>,
    turn: broadcast::Sender<Event>,
    phase: broadcast::Sender<Event>,
    network: broadcast::Sender<Event>,
}

/// Topic-based event bus
///
/// Allows consumers to subscribe to specific topics and only receive
/// events they care about. Dropping a receiver unsubscribes it.
#[derive(Clone)]
pub struct EventBus {
    channels: Arc<Channels>,
}

impl EventBus {
    /// Creates a new event bus with default capacity for each topic
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Creates a new event bus with specified capacity per topic
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            channels: Arc::new(Channels {
                combat: broadcast::channel(capacity).0,
                turn: broadcast::channel(capacity).0,
                phase: broadcast::channel(capacity).0,
                network: broadcast::channel(capacity).0,
            }),
        }
    }

    /// Publish an event to its corresponding topic
    pub fn publish(&self, event: Event) {
        let topic = event.topic();
        if self.sender(topic).send(event).is_err() {
            // No subscribers for this topic - this is normal, not an error
            tracing::trace!(target: "runtime::events", ?topic, "no subscribers");
        }
    }

    /// Subscribe to a specific topic
    ///
    /// Returns a receiver that will only receive events for that topic.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.sender(topic).subscribe()
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.sender(topic).receiver_count()
    }

    fn sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Combat => &self.channels.combat,
            Topic::Turn => &self.channels.turn,
            Topic::Phase => &self.channels.phase,
            Topic::Network => &self.channels.network,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Gate;

    #[tokio::test]
    async fn subscribers_only_see_their_topic() {
        let bus = EventBus::with_capacity(8);
        let mut phase = bus.subscribe(Topic::Phase);
        let mut turn = bus.subscribe(Topic::Turn);

        bus.publish(Event::Phase(PhaseEvent::Advance {
            gate: Gate::CombatStart,
        }));

        assert_eq!(
            phase.recv().await.unwrap(),
            Event::Phase(PhaseEvent::Advance {
                gate: Gate::CombatStart
            })
        );
        assert!(turn.try_recv().is_err());
    }

    #[test]
    fn dropping_a_receiver_unsubscribes() {
        let bus = EventBus::new();
        let rx = bus.subscribe(Topic::Network);
        assert_eq!(bus.subscriber_count(Topic::Network), 1);
        drop(rx);
        assert_eq!(bus.subscriber_count(Topic::Network), 0);
    }
}
