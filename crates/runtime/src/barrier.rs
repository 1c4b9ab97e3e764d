//! Readiness barrier.
//!
//! Two independent ready-maps ([`Gate::CombatStart`], [`Gate::TurnEnd`]) keyed
//! by participant. A gate advances once every known participant is ready.
//! Each mutation and its quorum check happen under one lock; notifications are
//! sent after the lock is released.
use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api::{Gate, NetMessage, ParticipantId, Transport};
use crate::events::{Event, EventBus, NetworkEvent, PhaseEvent};

#[derive(Debug, Default)]
struct GateState {
    ready: BTreeMap<ParticipantId, bool>,
    /// Advance already fired for the current satisfaction.
    fired: bool,
    countdown_started: bool,
}

impl GateState {
    fn satisfied(&self) -> bool {
        !self.ready.is_empty() && self.ready.values().all(|ready| *ready)
    }

    /// Returns true exactly once per transition into quorum.
    fn evaluate(&mut self) -> bool {
        if !self.satisfied() {
            self.fired = false;
            return false;
        }
        if self.fired {
            return false;
        }
        self.fired = true;
        true
    }
}

#[derive(Debug, Default)]
struct BarrierState {
    combat_start: GateState,
    turn_end: GateState,
}

impl BarrierState {
    fn gate(&self, gate: Gate) -> &GateState {
        match gate {
            Gate::CombatStart => &self.combat_start,
            Gate::TurnEnd => &self.turn_end,
        }
    }

    fn gate_mut(&mut self, gate: Gate) -> &mut GateState {
        match gate {
            Gate::CombatStart => &mut self.combat_start,
            Gate::TurnEnd => &mut self.turn_end,
        }
    }
}

pub struct ReadinessBarrier {
    state: Mutex<BarrierState>,
    bus: EventBus,
    transport: Arc<dyn Transport>,
}

impl ReadinessBarrier {
    pub fn new(bus: EventBus, transport: Arc<dyn Transport>) -> Self {
        Self {
            state: Mutex::new(BarrierState::default()),
            bus,
            transport,
        }
    }

    /// Adds `participant` as not ready to both gates.
    pub async fn join(&self, participant: ParticipantId) {
        {
            let mut state = self.state.lock().await;
            for gate in Gate::ALL {
                let gate = state.gate_mut(gate);
                gate.ready.insert(participant, false);
                gate.evaluate();
            }
        }
        info!(target: "runtime::barrier", %participant, "participant joined");
        self.bus.publish(Event::Network(NetworkEvent::Joined { participant }));
    }

    /// Drops `participant` from both gates. A departure can complete a gate;
    /// the gates that advanced are returned.
    pub async fn leave(&self, participant: ParticipantId) -> Vec<Gate> {
        let advanced: Vec<Gate> = {
            let mut state = self.state.lock().await;
            Gate::ALL
                .into_iter()
                .filter(|gate| {
                    let gate = state.gate_mut(*gate);
                    gate.ready.remove(&participant);
                    gate.evaluate()
                })
                .collect()
        };

        info!(target: "runtime::barrier", %participant, "participant left");
        self.bus.publish(Event::Network(NetworkEvent::Left { participant }));
        for gate in &advanced {
            self.advance(*gate).await;
        }
        advanced
    }

    /// Marks `participant` ready at `gate`. Returns true if this completed it.
    ///
    /// Unknown participants are ignored and duplicate signals are no-ops.
    pub async fn ready(&self, participant: ParticipantId, gate: Gate) -> bool {
        let advanced = {
            let mut state = self.state.lock().await;
            let entry = state.gate_mut(gate);
            match entry.ready.get_mut(&participant) {
                None => {
                    warn!(
                        target: "runtime::barrier",
                        %participant,
                        %gate,
                        "ready from unknown participant ignored"
                    );
                    return false;
                }
                Some(true) => return false,
                Some(flag) => *flag = true,
            }
            entry.evaluate()
        };

        debug!(target: "runtime::barrier", %participant, %gate, "participant ready");
        if advanced {
            self.advance(gate).await;
        }
        advanced
    }

    /// Starts the shared countdown for `gate` once until the next
    /// [`reset`](Self::reset). Returns false for repeated requests.
    pub async fn request_countdown(&self, gate: Gate) -> bool {
        {
            let mut state = self.state.lock().await;
            let entry = state.gate_mut(gate);
            if entry.countdown_started {
                debug!(target: "runtime::barrier", %gate, "countdown already started");
                return false;
            }
            entry.countdown_started = true;
        }

        info!(target: "runtime::barrier", %gate, "countdown started");
        self.bus
            .publish(Event::Phase(PhaseEvent::CountdownStarted { gate }));
        self.send(NetMessage::BeginCountdown { gate }).await;
        true
    }

    /// Sets every known participant back to not ready in both gates and
    /// re-arms the countdown.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        for gate in Gate::ALL {
            let entry = state.gate_mut(gate);
            entry.ready.values_mut().for_each(|ready| *ready = false);
            entry.fired = false;
            entry.countdown_started = false;
        }
        debug!(target: "runtime::barrier", "readiness reset");
    }

    pub async fn is_ready(&self, participant: ParticipantId, gate: Gate) -> Option<bool> {
        self.state
            .lock()
            .await
            .gate(gate)
            .ready
            .get(&participant)
            .copied()
    }

    pub async fn participants(&self) -> Vec<ParticipantId> {
        self.state
            .lock()
            .await
            .gate(Gate::CombatStart)
            .ready
            .keys()
            .copied()
            .collect()
    }

    async fn advance(&self, gate: Gate) {
        info!(target: "runtime::barrier", %gate, "all participants ready");
        self.bus.publish(Event::Phase(PhaseEvent::Advance { gate }));
        self.send(NetMessage::PhaseAdvance { gate }).await;
    }

    async fn send(&self, message: NetMessage) {
        if let Err(error) = self.transport.send_to_all(&message).await {
            warn!(target: "runtime::barrier", kind = message.kind(), %error, "broadcast failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::OfflineTransport;

    fn barrier() -> ReadinessBarrier {
        ReadinessBarrier::new(EventBus::new(), Arc::new(OfflineTransport))
    }

    #[tokio::test]
    async fn empty_gate_never_advances() {
        let barrier = barrier();
        assert!(!barrier.ready(ParticipantId(1), Gate::TurnEnd).await);
        assert!(barrier.leave(ParticipantId(1)).await.is_empty());
    }

    #[tokio::test]
    async fn gates_are_independent() {
        let barrier = barrier();
        barrier.join(ParticipantId(1)).await;

        assert!(barrier.ready(ParticipantId(1), Gate::CombatStart).await);
        assert_eq!(
            barrier.is_ready(ParticipantId(1), Gate::TurnEnd).await,
            Some(false)
        );
    }

    #[tokio::test]
    async fn late_joiner_rearms_the_gate() {
        let barrier = barrier();
        barrier.join(ParticipantId(1)).await;
        assert!(barrier.ready(ParticipantId(1), Gate::TurnEnd).await);

        barrier.join(ParticipantId(2)).await;
        assert!(!barrier.ready(ParticipantId(1), Gate::TurnEnd).await);
        assert!(barrier.ready(ParticipantId(2), Gate::TurnEnd).await);
    }
}
