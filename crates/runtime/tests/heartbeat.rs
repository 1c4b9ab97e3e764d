mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use battle_core::{Board, Row, Side};
use battle_runtime::{BattleSession, Event, NetMessage, NetworkEvent, ParticipantId, Role, Topic};
use common::{RecordingTransport, board, catalogue, fast_config, init_tracing};

fn follower(transport: Arc<RecordingTransport>, fallbacks: Arc<AtomicUsize>) -> BattleSession<Board> {
    init_tracing();
    BattleSession::builder()
        .world(board(&[("Squire", Side::Party, Row::Front, 0)]))
        .catalogue(catalogue())
        .transport(transport)
        .config(fast_config())
        .role(Role::Follower)
        .local(ParticipantId(2))
        .on_host_lost(move |_| {
            fallbacks.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn silent_authority_triggers_the_fallback_once() {
    let fallbacks = Arc::new(AtomicUsize::new(0));
    let session = follower(RecordingTransport::new(), Arc::clone(&fallbacks));
    let mut network = session.subscribe(Topic::Network);

    let monitor = session.start_heartbeat();
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert!(monitor.is_finished());
    assert_eq!(fallbacks.load(Ordering::SeqCst), 1);
    assert!(session.heartbeat().is_host_lost());
    match network.try_recv() {
        Ok(Event::Network(NetworkEvent::HostLost { silent_for })) => {
            assert!(silent_for > fast_config().heartbeat_timeout);
        }
        other => panic!("expected host loss, got {other:?}"),
    }
    assert!(network.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn pings_keep_the_follower_attached() {
    let fallbacks = Arc::new(AtomicUsize::new(0));
    let session = follower(RecordingTransport::new(), Arc::clone(&fallbacks));
    let _monitor = session.start_heartbeat();

    for sequence in 0..10 {
        tokio::time::sleep(Duration::from_millis(200)).await;
        session
            .handle_inbound(ParticipantId(0), NetMessage::Heartbeat { sequence })
            .await
            .unwrap();
    }
    assert_eq!(fallbacks.load(Ordering::SeqCst), 0);
    assert!(!session.heartbeat().is_host_lost());

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(fallbacks.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn authority_pings_every_interval_until_shutdown() {
    let transport = RecordingTransport::new();
    let session = common::session(
        Role::Authority,
        board(&[("Squire", Side::Party, Row::Front, 0)]),
        transport.clone(),
    );
    let pings = |t: &RecordingTransport| t.count(|m| matches!(m, NetMessage::Heartbeat { .. }));

    let monitor = session.start_heartbeat();
    tokio::time::sleep(Duration::from_millis(350)).await;
    assert_eq!(pings(&transport), 3);

    session.shutdown();
    monitor.await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(pings(&transport), 3);
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_a_follower_without_fallback() {
    let fallbacks = Arc::new(AtomicUsize::new(0));
    let session = follower(RecordingTransport::new(), Arc::clone(&fallbacks));

    let monitor = session.start_heartbeat();
    tokio::time::sleep(Duration::from_millis(150)).await;
    session.shutdown();
    monitor.await.unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(fallbacks.load(Ordering::SeqCst), 0);
}
