//! Asynchronous abstraction over the network layer.
//!
//! The session only needs fan-out and point-to-point sends. Inbound traffic is
//! pushed into [`crate::BattleSession::handle_inbound`] by whoever owns the
//! socket.
use async_trait::async_trait;

use super::errors::Result;
use super::message::{NetMessage, ParticipantId};

#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends to every other participant.
    async fn send_to_all(&self, message: &NetMessage) -> Result<()>;

    async fn send_to_one(&self, participant: ParticipantId, message: &NetMessage) -> Result<()>;
}

/// Transport for single-participant sessions. Every send succeeds and goes
/// nowhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineTransport;

#[async_trait]
impl Transport for OfflineTransport {
    async fn send_to_all(&self, message: &NetMessage) -> Result<()> {
        tracing::trace!(target: "runtime::net", kind = message.kind(), "offline send dropped");
        Ok(())
    }

    async fn send_to_one(&self, participant: ParticipantId, message: &NetMessage) -> Result<()> {
        tracing::trace!(
            target: "runtime::net",
            %participant,
            kind = message.kind(),
            "offline send dropped"
        );
        Ok(())
    }
}
