#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use battle_core::{
    ActionCatalogue, ActionDefinition, ActorTemplate, BattleConfig, Board, Controller,
    EffectKind, Row, Side, Slot, Stage, TargetPattern,
};
use battle_runtime::{
    BattleSession, NetMessage, ParticipantId, Result, Role, RuntimeConfig, Transport,
};

pub const AUTHORITY: ParticipantId = ParticipantId(0);

/// Outbound message captured by [`RecordingTransport`].
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    All(NetMessage),
    One(ParticipantId, NetMessage),
}

/// In-memory transport that records every send.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn broadcasts(&self) -> Vec<NetMessage> {
        self.sent()
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::All(message) => Some(message),
                Sent::One(..) => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&NetMessage) -> bool) -> usize {
        self.sent()
            .iter()
            .filter(|sent| match sent {
                Sent::All(message) | Sent::One(_, message) => predicate(message),
            })
            .count()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_to_all(&self, message: &NetMessage) -> Result<()> {
        self.sent.lock().unwrap().push(Sent::All(message.clone()));
        Ok(())
    }

    async fn send_to_one(&self, participant: ParticipantId, message: &NetMessage) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push(Sent::One(participant, message.clone()));
        Ok(())
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Short durations so paused-clock tests stay readable.
pub fn fast_config() -> RuntimeConfig {
    RuntimeConfig {
        per_action: Duration::from_secs(1),
        min_turn: Duration::from_secs(1),
        max_turn: Duration::from_secs(3),
        finish_grace: Duration::from_millis(200),
        settle: Duration::from_millis(10),
        stage_pacing: Duration::from_millis(10),
        decision_pacing: Duration::from_secs(5),
        heartbeat_interval: Duration::from_millis(100),
        heartbeat_timeout: Duration::from_millis(500),
        death_grace: Duration::from_millis(50),
        event_buffer: 64,
    }
}

pub fn catalogue() -> ActionCatalogue {
    ActionCatalogue::new([
        ActionDefinition::new(
            "strike",
            1,
            Stage::new(TargetPattern::Single, EffectKind::Damage, 3, 3),
        ),
        ActionDefinition::new(
            "bite",
            1,
            Stage::new(TargetPattern::Single, EffectKind::Damage, 1, 1),
        ),
    ])
}

/// Squire: player. Hound: ally AI. Grunt, Brute, Imp: hostiles.
pub fn templates() -> Vec<ActorTemplate> {
    vec![
        ActorTemplate::new("Squire", 20, 2).with_actions(["strike"]),
        ActorTemplate::new("Hound", 12, 1).with_actions(["bite"]),
        ActorTemplate::new("Grunt", 10, 1).with_actions(["bite"]),
        ActorTemplate::new("Brute", 30, 3).with_actions(["bite"]),
        ActorTemplate::new("Imp", 2, 1).with_actions(["bite"]),
    ]
}

pub fn board(placements: &[(&str, Side, Row, u8)]) -> Board {
    let mut board = Board::new(BattleConfig::default()).with_templates(templates());
    for (template, side, row, column) in placements {
        let controller = match (*template, side) {
            ("Squire", _) => Controller::Player,
            (_, Side::Party) => Controller::AllyAi,
            (_, Side::Horde) => Controller::HostileAi,
        };
        board
            .place(template, Slot::new(*side, *row, *column), controller)
            .unwrap();
    }
    board
}

/// Authority sessions are `p0`; follower sessions are `p1` following `p0`.
pub fn session(role: Role, board: Board, transport: Arc<RecordingTransport>) -> BattleSession<Board> {
    init_tracing();
    let local = match role {
        Role::Authority => AUTHORITY,
        Role::Follower => ParticipantId(1),
    };
    BattleSession::builder()
        .world(board)
        .catalogue(catalogue())
        .transport(transport)
        .config(fast_config())
        .role(role)
        .local(local)
        .authority(AUTHORITY)
        .seed(7)
        .build()
        .unwrap()
}
