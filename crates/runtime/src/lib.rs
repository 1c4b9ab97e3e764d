//! Async orchestration for the turn-based battle client.
//!
//! This crate drives the synchronous rules in `battle-core` on tokio. Consumers
//! build a [`BattleSession`], feed it inbound network messages, and subscribe
//! to the topics they care about.
//!
//! Modules are organized by responsibility:
//! - [`session`] hosts the orchestrator and builder
//! - [`api`] exposes errors, wire messages and the transport/presentation seams
//! - [`events`] provides the topic-based event bus
//! - [`barrier`] and [`heartbeat`] keep participants in step
//! - [`scheduler`] runs the non-player phase; decision loops stay internal
pub mod api;
pub mod barrier;
pub mod config;
pub mod events;
pub mod heartbeat;
pub mod scheduler;
pub mod session;

mod context;
mod decision;

pub use api::{
    Gate, NetMessage, NullSink, OfflineTransport, ParticipantId, PresentationSink, Result,
    RuntimeError, Transport,
};
pub use barrier::ReadinessBarrier;
pub use config::RuntimeConfig;
pub use events::{
    Event, EventBus, Group, NetworkEvent, PhaseEvent, PhaseOutcome, Topic, TurnEvent,
};
pub use heartbeat::HeartbeatMonitor;
pub use scheduler::{GameStatus, PhaseReport, Role, TurnContext, TurnScheduler};
pub use session::{BattleSession, BattleSessionBuilder};
