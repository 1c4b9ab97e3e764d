//! Authority liveness.
//!
//! The authority pings every participant on a fixed interval. Followers record
//! each ping and, once the silence exceeds the timeout, run the host-loss
//! fallback a single time.
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::api::{NetMessage, Result, RuntimeError, Transport};
use crate::config::RuntimeConfig;
use crate::events::{Event, EventBus, NetworkEvent};

pub struct HeartbeatMonitor {
    interval: Duration,
    timeout: Duration,
    epoch: Instant,
    /// Milliseconds since `epoch` of the last ping.
    last_ping: AtomicU64,
    host_lost: AtomicBool,
}

impl HeartbeatMonitor {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            timeout,
            epoch: Instant::now(),
            last_ping: AtomicU64::new(0),
            host_lost: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(config.heartbeat_interval, config.heartbeat_timeout)
    }

    pub fn record_ping(&self) {
        let now = self.epoch.elapsed().as_millis() as u64;
        self.last_ping.store(now, Ordering::Release);
        trace!(target: "runtime::heartbeat", "ping recorded");
    }

    /// Time since the last ping (or since creation if none arrived yet).
    pub fn silence(&self) -> Duration {
        let last = Duration::from_millis(self.last_ping.load(Ordering::Acquire));
        self.epoch.elapsed().saturating_sub(last)
    }

    pub fn is_host_lost(&self) -> bool {
        self.host_lost.load(Ordering::Acquire)
    }

    /// Authority side: pings every interval until `token` is cancelled.
    pub async fn run_authority(&self, transport: &dyn Transport, token: CancellationToken) {
        let mut sequence = 0u64;
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
            sequence += 1;
            if let Err(error) = transport
                .send_to_all(&NetMessage::Heartbeat { sequence })
                .await
            {
                warn!(target: "runtime::heartbeat", sequence, %error, "ping failed");
            }
        }
        debug!(target: "runtime::heartbeat", "authority pings stopped");
    }

    /// Follower side: checks the silence every interval.
    ///
    /// On host loss the fallback runs once, `HostLost` is published and the
    /// loss is returned. Cancellation returns `Ok`.
    pub async fn run_follower<F>(
        &self,
        bus: &EventBus,
        token: CancellationToken,
        on_host_lost: F,
    ) -> Result<()>
    where
        F: FnOnce(Duration),
    {
        self.record_ping();
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(()),
                _ = tokio::time::sleep(self.interval) => {}
            }

            let silent_for = self.silence();
            if silent_for <= self.timeout {
                continue;
            }
            if self.host_lost.swap(true, Ordering::AcqRel) {
                return Ok(());
            }

            let error = RuntimeError::HeartbeatLoss(silent_for);
            warn!(target: "runtime::heartbeat", %error, "authority unresponsive, falling back");
            bus.publish(Event::Network(NetworkEvent::HostLost { silent_for }));
            on_host_lost(silent_for);
            return Err(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn silence_tracks_the_last_ping() {
        let monitor = HeartbeatMonitor::new(Duration::from_secs(1), Duration::from_secs(3));
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(monitor.silence(), Duration::from_secs(2));

        monitor.record_ping();
        tokio::time::advance(Duration::from_millis(500)).await;
        assert_eq!(monitor.silence(), Duration::from_millis(500));
    }
}
