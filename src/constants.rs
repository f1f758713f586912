pub const TICK_RATE: u32 = 20;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;

pub const GHOST_COUNT: usize = 4;

pub const PELLET_SCORE: u32 = 10;
pub const CHERRY_SCORE: u32 = 100;
pub const POWER_PELLET_SCORE: u32 = 50;
pub const GHOST_SCORE: u32 = 300;

pub const SCARED_DURATION_MS: u64 = 10_000;
pub const RECOVERING_THRESHOLD_MS: u64 = 3_000;
pub const GHOST_RESPAWN_MS: u64 = 3_000;

pub const STARTING_LIVES: u32 = 3;
pub const MAX_LIVES: u32 = 99;
pub const DEATH_ANIM_MS: u64 = 1_200;
pub const GAME_OVER_HOLD_MS: u64 = 3_000;

pub const COUNTDOWN_STEPS: [&str; 4] = ["3", "2", "1", "GO!"];
pub const COUNTDOWN_STEP_MS: u64 = 1_000;

pub const PLAYER_TILES_PER_SEC: f32 = 3.0;
pub const GHOST_TILES_PER_SEC: f32 = 2.5;
pub const MIN_SPEED: f32 = 0.0001;
pub const MIN_DURATION_SEC: f32 = 0.0001;
pub const MIN_DURATION_MS: u64 = 1;
/// Upper bound for any configured timer.
pub const MAX_DURATION_MS: u64 = 3_600_000;

/// Squared world-unit distance at which a transition counts as arrived.
pub const ARRIVAL_TOLERANCE_SQ: f32 = 0.000_001;
pub const COLLISION_RADIUS: f32 = 0.5;

pub const TELEPORT_COOLDOWN_MS: u64 = 200;

pub const CHERRY_FIRST_DELAY_MS: u64 = 5_000;
pub const CHERRY_RESPAWN_DELAY_MS: u64 = 5_000;
pub const CHERRY_TILES_PER_SEC: f32 = 3.0;
pub const CHERRY_EDGE_MARGIN: f32 = 0.5;

/// Where every dead ghost heads, regardless of its own spawn point.
pub const DEAD_GHOST_HOME: (f32, f32) = (13.0, 11.0);

pub const DEFAULT_LEVEL_ID: u32 = 1;
pub const DEFAULT_BEST_TIME_SEC: f32 = 99_999.0;
