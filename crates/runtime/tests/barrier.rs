mod common;

use battle_runtime::{
    Event, EventBus, Gate, NetMessage, ParticipantId, PhaseEvent, ReadinessBarrier, Topic,
};
use common::RecordingTransport;

fn advances(transport: &RecordingTransport, gate: Gate) -> usize {
    transport.count(|m| *m == NetMessage::PhaseAdvance { gate })
}

async fn barrier_with(
    participants: &[u32],
) -> (ReadinessBarrier, std::sync::Arc<RecordingTransport>, EventBus) {
    let transport = RecordingTransport::new();
    let bus = EventBus::new();
    let barrier = ReadinessBarrier::new(bus.clone(), transport.clone());
    for id in participants {
        barrier.join(ParticipantId(*id)).await;
    }
    (barrier, transport, bus)
}

#[tokio::test]
async fn gate_advances_only_when_the_last_participant_is_ready() {
    let (barrier, transport, bus) = barrier_with(&[1, 2, 3]).await;
    let mut phase = bus.subscribe(Topic::Phase);

    assert!(!barrier.ready(ParticipantId(1), Gate::TurnEnd).await);
    assert!(!barrier.ready(ParticipantId(2), Gate::TurnEnd).await);
    assert_eq!(advances(&transport, Gate::TurnEnd), 0);

    assert!(barrier.ready(ParticipantId(3), Gate::TurnEnd).await);
    assert_eq!(advances(&transport, Gate::TurnEnd), 1);
    assert!(matches!(
        phase.try_recv(),
        Ok(Event::Phase(PhaseEvent::Advance {
            gate: Gate::TurnEnd
        }))
    ));
    // The other gate is independent.
    assert_eq!(advances(&transport, Gate::CombatStart), 0);
}

#[tokio::test]
async fn departure_of_the_last_unready_participant_advances() {
    let (barrier, transport, _bus) = barrier_with(&[1, 2, 3]).await;
    barrier.ready(ParticipantId(1), Gate::TurnEnd).await;
    barrier.ready(ParticipantId(2), Gate::TurnEnd).await;

    let advanced = barrier.leave(ParticipantId(3)).await;

    assert_eq!(advanced, vec![Gate::TurnEnd]);
    assert_eq!(advances(&transport, Gate::TurnEnd), 1);
    assert_eq!(
        barrier.participants().await,
        vec![ParticipantId(1), ParticipantId(2)]
    );
}

#[tokio::test]
async fn advance_fires_once_per_quorum() {
    let (barrier, transport, _bus) = barrier_with(&[1, 2]).await;
    barrier.ready(ParticipantId(1), Gate::CombatStart).await;
    barrier.ready(ParticipantId(2), Gate::CombatStart).await;

    // Repeats and late departures do not re-fire.
    assert!(!barrier.ready(ParticipantId(2), Gate::CombatStart).await);
    assert!(barrier.leave(ParticipantId(2)).await.is_empty());
    assert_eq!(advances(&transport, Gate::CombatStart), 1);

    barrier.reset().await;
    assert!(barrier.ready(ParticipantId(1), Gate::CombatStart).await);
    assert_eq!(advances(&transport, Gate::CombatStart), 2);
}

#[tokio::test]
async fn countdown_starts_once_until_reset() {
    let (barrier, transport, _bus) = barrier_with(&[1, 2]).await;
    let begin = |t: &RecordingTransport| {
        t.count(|m| *m == NetMessage::BeginCountdown { gate: Gate::TurnEnd })
    };

    assert!(barrier.request_countdown(Gate::TurnEnd).await);
    assert!(!barrier.request_countdown(Gate::TurnEnd).await);
    assert_eq!(begin(&transport), 1);

    barrier.reset().await;
    assert!(barrier.request_countdown(Gate::TurnEnd).await);
    assert_eq!(begin(&transport), 2);
}

#[tokio::test]
async fn unknown_participant_is_ignored() {
    let (barrier, transport, _bus) = barrier_with(&[1]).await;

    assert!(!barrier.ready(ParticipantId(9), Gate::TurnEnd).await);
    assert_eq!(barrier.is_ready(ParticipantId(9), Gate::TurnEnd).await, None);
    assert_eq!(barrier.is_ready(ParticipantId(1), Gate::TurnEnd).await, Some(false));
    assert!(transport.sent().is_empty());
}
