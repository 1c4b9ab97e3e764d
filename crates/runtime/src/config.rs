//! Runtime tuning: turn timeouts, pacing, heartbeat and buffer sizes.
use std::env;
use std::time::Duration;

/// Durations and capacities shared by the scheduler, barrier and heartbeat.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Turn window granted per action point.
    pub per_action: Duration,
    pub min_turn: Duration,
    pub max_turn: Duration,
    /// How long a forced actor gets to report finished.
    pub finish_grace: Duration,
    /// Pause between phase steps so presentation can catch up.
    pub settle: Duration,
    /// Pause after each replicated stage intent.
    pub stage_pacing: Duration,
    /// Pause between two actions of the same actor.
    pub decision_pacing: Duration,
    pub heartbeat_interval: Duration,
    /// Silence after which a follower declares the authority lost.
    pub heartbeat_timeout: Duration,
    /// Delay between a death and removal from the board.
    pub death_grace: Duration,
    pub event_buffer: usize,
}

impl RuntimeConfig {
    pub const DEFAULT_PER_ACTION: Duration = Duration::from_secs(4);
    pub const DEFAULT_MIN_TURN: Duration = Duration::from_secs(3);
    pub const DEFAULT_MAX_TURN: Duration = Duration::from_secs(20);
    pub const DEFAULT_FINISH_GRACE: Duration = Duration::from_millis(500);
    pub const DEFAULT_SETTLE: Duration = Duration::from_millis(300);
    pub const DEFAULT_STAGE_PACING: Duration = Duration::from_millis(150);
    pub const DEFAULT_DECISION_PACING: Duration = Duration::from_millis(400);
    pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);
    pub const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(5);
    pub const DEFAULT_DEATH_GRACE: Duration = Duration::from_millis(750);
    pub const DEFAULT_EVENT_BUFFER: usize = 100;

    /// Construct configuration from process environment variables.
    ///
    /// Environment variables (unset or unparsable values keep the default):
    /// - `BATTLE_PER_ACTION_SECS`, `BATTLE_MIN_TURN_SECS`, `BATTLE_MAX_TURN_SECS`
    /// - `BATTLE_FINISH_GRACE_MS`, `BATTLE_SETTLE_MS`
    /// - `BATTLE_STAGE_PACING_MS`, `BATTLE_DECISION_PACING_MS`
    /// - `BATTLE_HEARTBEAT_INTERVAL_MS`, `BATTLE_HEARTBEAT_TIMEOUT_MS`
    /// - `BATTLE_DEATH_GRACE_MS`
    /// - `BATTLE_EVENT_BUFFER` - broadcast capacity per event topic
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(secs) = read_env::<f64>("BATTLE_PER_ACTION_SECS") {
            config.per_action = secs_f64(secs);
        }
        if let Some(secs) = read_env::<f64>("BATTLE_MIN_TURN_SECS") {
            config.min_turn = secs_f64(secs);
        }
        if let Some(secs) = read_env::<f64>("BATTLE_MAX_TURN_SECS") {
            config.max_turn = secs_f64(secs);
        }
        if let Some(ms) = read_env::<u64>("BATTLE_FINISH_GRACE_MS") {
            config.finish_grace = Duration::from_millis(ms);
        }
        if let Some(ms) = read_env::<u64>("BATTLE_SETTLE_MS") {
            config.settle = Duration::from_millis(ms);
        }
        if let Some(ms) = read_env::<u64>("BATTLE_STAGE_PACING_MS") {
            config.stage_pacing = Duration::from_millis(ms);
        }
        if let Some(ms) = read_env::<u64>("BATTLE_DECISION_PACING_MS") {
            config.decision_pacing = Duration::from_millis(ms);
        }
        if let Some(ms) = read_env::<u64>("BATTLE_HEARTBEAT_INTERVAL_MS") {
            config.heartbeat_interval = Duration::from_millis(ms.max(1));
        }
        if let Some(ms) = read_env::<u64>("BATTLE_HEARTBEAT_TIMEOUT_MS") {
            config.heartbeat_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = read_env::<u64>("BATTLE_DEATH_GRACE_MS") {
            config.death_grace = Duration::from_millis(ms);
        }
        if let Some(capacity) = read_env::<usize>("BATTLE_EVENT_BUFFER") {
            config.event_buffer = capacity.max(1);
        }

        config
    }

    /// `clamp(action_points * per_action, min_turn, max_turn)`.
    pub fn turn_timeout(&self, action_points: u32) -> Duration {
        let max = self.max_turn.max(self.min_turn);
        self.per_action
            .checked_mul(action_points)
            .unwrap_or(max)
            .clamp(self.min_turn, max)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            per_action: Self::DEFAULT_PER_ACTION,
            min_turn: Self::DEFAULT_MIN_TURN,
            max_turn: Self::DEFAULT_MAX_TURN,
            finish_grace: Self::DEFAULT_FINISH_GRACE,
            settle: Self::DEFAULT_SETTLE,
            stage_pacing: Self::DEFAULT_STAGE_PACING,
            decision_pacing: Self::DEFAULT_DECISION_PACING,
            heartbeat_interval: Self::DEFAULT_HEARTBEAT_INTERVAL,
            heartbeat_timeout: Self::DEFAULT_HEARTBEAT_TIMEOUT,
            death_grace: Self::DEFAULT_DEATH_GRACE,
            event_buffer: Self::DEFAULT_EVENT_BUFFER,
        }
    }
}

fn secs_f64(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or_default()
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}
