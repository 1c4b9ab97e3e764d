/// Combat tuning constants shared by the pipeline, the board and the AI filter.
///
/// These are static balance values; runtime-tunable durations live in the
/// runtime crate's `RuntimeConfig`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BattleConfig {
    /// Columns per row on each side of the board.
    pub row_width: u8,
}

impl BattleConfig {
    // ===== effect constants =====
    /// Action points removed by a stun and withheld from the next refill.
    pub const STUN_ACTION_POINTS: u32 = 1;
    /// Pre-mitigation damage per point of temporary defence erosion.
    pub const EROSION_DIVISOR: i32 = 10;
    /// Recursion bound for redirects and reactions.
    pub const MAX_REACTION_DEPTH: u8 = 8;

    // ===== class-special procs =====
    pub const LIFESTEAL_RATIO: f32 = 0.5;
    pub const DEFENCE_STEAL_RATIO: f32 = 0.2;
    pub const AUTO_HEAL_RATIO: f32 = 0.25;
    /// Counter-attack magnitude per point of `damage_bonus + 1`.
    pub const COUNTER_MULTIPLIER: i32 = 2;
    /// Poison-on-hit magnitude per point of `damage_bonus + 1`.
    pub const POISON_ON_HIT_MULTIPLIER: i32 = 1;
    /// Temporary damage granted to cult members per allied death.
    pub const CULT_DAMAGE_PER_DEATH: i32 = 1;

    // ===== AI heuristics =====
    /// Turn-within-wave after which self spawns stop on boss waves.
    pub const BOSS_SPAWN_TURN_CEILING: u32 = 20;
    /// Turn-within-wave after which self spawns stop on regular waves.
    pub const SPAWN_TURN_CEILING: u32 = 10;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_ROW_WIDTH: u8 = 3;

    pub fn new() -> Self {
        Self {
            row_width: Self::DEFAULT_ROW_WIDTH,
        }
    }

    pub fn with_row_width(row_width: u8) -> Self {
        Self {
            row_width: row_width.max(1),
        }
    }

    /// Spawn ceiling for the current wave kind.
    pub const fn spawn_turn_ceiling(boss_wave: bool) -> u32 {
        if boss_wave {
            Self::BOSS_SPAWN_TURN_CEILING
        } else {
            Self::SPAWN_TURN_CEILING
        }
    }
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self::new()
    }
}
