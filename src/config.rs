//! Tunable round parameters, loaded from JSON. Missing fields fall back to
//! the built-in defaults in [`crate::constants`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{
    CHERRY_FIRST_DELAY_MS, CHERRY_RESPAWN_DELAY_MS, CHERRY_SCORE, CHERRY_TILES_PER_SEC,
    COLLISION_RADIUS, COUNTDOWN_STEP_MS, DEAD_GHOST_HOME, DEATH_ANIM_MS, DEFAULT_LEVEL_ID,
    GAME_OVER_HOLD_MS, GHOST_RESPAWN_MS, GHOST_SCORE, GHOST_TILES_PER_SEC, MAX_DURATION_MS,
    MAX_LIVES, MIN_DURATION_MS, MIN_SPEED, PELLET_SCORE, PLAYER_TILES_PER_SEC, POWER_PELLET_SCORE,
    RECOVERING_THRESHOLD_MS, SCARED_DURATION_MS, STARTING_LIVES, TELEPORT_COOLDOWN_MS,
};
use crate::error::ConfigError;
use crate::types::GhostPersonality;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameConfig {
    pub level_id: u32,
    pub pellet_score: u32,
    pub cherry_score: u32,
    pub power_pellet_score: u32,
    pub ghost_score: u32,
    pub scared_duration_ms: u64,
    pub recovering_threshold_ms: u64,
    pub ghost_respawn_ms: u64,
    pub starting_lives: u32,
    pub death_anim_ms: u64,
    pub game_over_hold_ms: u64,
    pub countdown_step_ms: u64,
    pub player_tiles_per_sec: f32,
    pub ghost_tiles_per_sec: f32,
    pub cherry_tiles_per_sec: f32,
    pub collision_radius: f32,
    pub teleport_cooldown_ms: u64,
    pub cherry_first_delay_ms: u64,
    pub cherry_respawn_delay_ms: u64,
    pub dead_ghost_home: (f32, f32),
    pub personalities: [GhostPersonality; 4],
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            level_id: DEFAULT_LEVEL_ID,
            pellet_score: PELLET_SCORE,
            cherry_score: CHERRY_SCORE,
            power_pellet_score: POWER_PELLET_SCORE,
            ghost_score: GHOST_SCORE,
            scared_duration_ms: SCARED_DURATION_MS,
            recovering_threshold_ms: RECOVERING_THRESHOLD_MS,
            ghost_respawn_ms: GHOST_RESPAWN_MS,
            starting_lives: STARTING_LIVES,
            death_anim_ms: DEATH_ANIM_MS,
            game_over_hold_ms: GAME_OVER_HOLD_MS,
            countdown_step_ms: COUNTDOWN_STEP_MS,
            player_tiles_per_sec: PLAYER_TILES_PER_SEC,
            ghost_tiles_per_sec: GHOST_TILES_PER_SEC,
            cherry_tiles_per_sec: CHERRY_TILES_PER_SEC,
            collision_radius: COLLISION_RADIUS,
            teleport_cooldown_ms: TELEPORT_COOLDOWN_MS,
            cherry_first_delay_ms: CHERRY_FIRST_DELAY_MS,
            cherry_respawn_delay_ms: CHERRY_RESPAWN_DELAY_MS,
            dead_ghost_home: DEAD_GHOST_HOME,
            personalities: [
                GhostPersonality::Flee,
                GhostPersonality::Chase,
                GhostPersonality::Random,
                GhostPersonality::Patrol,
            ],
        }
    }
}

impl GameConfig {
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read, or
    /// [`ConfigError::Parse`] if it is not valid JSON for this shape.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        Self::parse(&contents).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })
    }

    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.sanitized())
    }

    /// Clamps values that would stall or break a round.
    pub fn sanitized(mut self) -> Self {
        self.player_tiles_per_sec =
            finite_or(self.player_tiles_per_sec, PLAYER_TILES_PER_SEC).max(MIN_SPEED);
        self.ghost_tiles_per_sec =
            finite_or(self.ghost_tiles_per_sec, GHOST_TILES_PER_SEC).max(MIN_SPEED);
        self.cherry_tiles_per_sec =
            finite_or(self.cherry_tiles_per_sec, CHERRY_TILES_PER_SEC).max(MIN_SPEED);
        self.collision_radius = finite_or(self.collision_radius, COLLISION_RADIUS).max(0.0);
        self.scared_duration_ms = clamp_duration(self.scared_duration_ms);
        self.recovering_threshold_ms = self.recovering_threshold_ms.min(self.scared_duration_ms);
        self.ghost_respawn_ms = clamp_duration(self.ghost_respawn_ms);
        self.death_anim_ms = clamp_duration(self.death_anim_ms);
        self.countdown_step_ms = clamp_duration(self.countdown_step_ms);
        self.game_over_hold_ms = self.game_over_hold_ms.min(MAX_DURATION_MS);
        self.teleport_cooldown_ms = self.teleport_cooldown_ms.min(MAX_DURATION_MS);
        self.cherry_first_delay_ms = self.cherry_first_delay_ms.min(MAX_DURATION_MS);
        self.cherry_respawn_delay_ms = self.cherry_respawn_delay_ms.min(MAX_DURATION_MS);
        self.starting_lives = self.starting_lives.clamp(1, MAX_LIVES);
        self.dead_ghost_home = (
            finite_or(self.dead_ghost_home.0, DEAD_GHOST_HOME.0),
            finite_or(self.dead_ghost_home.1, DEAD_GHOST_HOME.1),
        );
        self
    }
}

fn clamp_duration(ms: u64) -> u64 {
    ms.clamp(MIN_DURATION_MS, MAX_DURATION_MS)
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = GameConfig::parse("{}").expect("parse");
        assert_eq!(config, GameConfig::default());
    }

    #[test]
    fn partial_overrides_keep_other_defaults() {
        let raw = r#"{"ghostScore": 500, "personalities": ["chase", "chase", "chase", "chase"]}"#;
        let config = GameConfig::parse(raw).expect("parse");
        assert_eq!(config.ghost_score, 500);
        assert_eq!(config.pellet_score, PELLET_SCORE);
        assert!(config
            .personalities
            .iter()
            .all(|p| *p == GhostPersonality::Chase));
    }

    #[test]
    fn sanitized_clamps_degenerate_values() {
        let config = GameConfig {
            player_tiles_per_sec: 0.0,
            scared_duration_ms: 0,
            recovering_threshold_ms: 50_000,
            starting_lives: 500,
            ..GameConfig::default()
        }
        .sanitized();
        assert_eq!(config.player_tiles_per_sec, MIN_SPEED);
        assert_eq!(config.scared_duration_ms, MIN_DURATION_MS);
        assert_eq!(config.recovering_threshold_ms, MIN_DURATION_MS);
        assert_eq!(config.starting_lives, MAX_LIVES);
    }

    #[test]
    fn huge_durations_are_capped() {
        let raw = format!(
            r#"{{"countdownStepMs": {max}, "gameOverHoldMs": {max}, "teleportCooldownMs": {max}, "cherryFirstDelayMs": {max}, "cherryRespawnDelayMs": {max}, "ghostRespawnMs": {max}, "scaredDurationMs": {max}, "deathAnimMs": {max}}}"#,
            max = u64::MAX
        );
        let config = GameConfig::parse(&raw).expect("parse");
        assert_eq!(config.countdown_step_ms, MAX_DURATION_MS);
        assert_eq!(config.game_over_hold_ms, MAX_DURATION_MS);
        assert_eq!(config.teleport_cooldown_ms, MAX_DURATION_MS);
        assert_eq!(config.cherry_first_delay_ms, MAX_DURATION_MS);
        assert_eq!(config.cherry_respawn_delay_ms, MAX_DURATION_MS);
        assert_eq!(config.ghost_respawn_ms, MAX_DURATION_MS);
        assert_eq!(config.scared_duration_ms, MAX_DURATION_MS);
        assert_eq!(config.death_anim_ms, MAX_DURATION_MS);
    }

    #[test]
    fn from_file_reports_missing_and_malformed_files() {
        let dir = std::env::temp_dir().join(format!(
            "maze-config-test-{}-{}",
            std::process::id(),
            rand::random::<u32>()
        ));
        fs::create_dir_all(&dir).expect("create temp dir");

        let missing = dir.join("missing.json");
        assert!(matches!(
            GameConfig::from_file(&missing),
            Err(ConfigError::Read { .. })
        ));

        let broken = dir.join("broken.json");
        fs::write(&broken, "{ not json").expect("write");
        assert!(matches!(
            GameConfig::from_file(&broken),
            Err(ConfigError::Parse { .. })
        ));

        let good = dir.join("good.json");
        fs::write(&good, r#"{"startingLives": 5}"#).expect("write");
        assert_eq!(GameConfig::from_file(&good).expect("load").starting_lives, 5);

        let _ = fs::remove_dir_all(&dir);
    }
}
