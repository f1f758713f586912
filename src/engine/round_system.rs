use tracing::{debug, info, warn};

use crate::constants::COUNTDOWN_STEPS;
use crate::high_score_store::{submit_result, BestRecord};

use super::*;

impl GameEngine {
    pub(super) fn enter_countdown(&mut self) {
        self.phase = RoundPhase::Countdown;
        self.phase_elapsed_ms = 0;
        self.countdown_shown = None;
        self.player.input_enabled = false;
        self.ghosts_enabled = false;
        self.set_ghost_animation_frozen(true);
        self.show_countdown_through(0);
    }

    pub(super) fn update_round(&mut self, dt_ms: u64, input: &FrameInput) {
        match self.phase {
            RoundPhase::Countdown => self.update_countdown(dt_ms),
            RoundPhase::Playing => self.update_playing(dt_ms),
            RoundPhase::PlayerDying => self.update_dying(dt_ms, input),
            RoundPhase::GameOver => self.update_game_over(dt_ms),
        }
    }

    /// Reports a player death. Ignored while already dying or after game over.
    pub fn player_died(&mut self) -> bool {
        if matches!(self.phase, RoundPhase::PlayerDying | RoundPhase::GameOver) {
            return false;
        }
        self.phase = RoundPhase::PlayerDying;
        self.phase_elapsed_ms = 0;
        self.death_stage = DeathStage::Animating;
        self.player.dying = true;
        self.player.input_enabled = false;
        self.ghosts_enabled = false;
        self.set_ghost_animation_frozen(true);
        self.events.push(RuntimeEvent::PlayerDeath);
        info!(lives = self.lives, score = self.score, "player died");
        true
    }

    fn show_countdown_through(&mut self, index: usize) {
        let next = self.countdown_shown.map(|shown| shown + 1).unwrap_or(0);
        let last = index.min(COUNTDOWN_STEPS.len() - 1);
        for step in next..=last {
            self.events.push(RuntimeEvent::CountdownStep {
                text: COUNTDOWN_STEPS[step].to_string(),
            });
            self.countdown_shown = Some(step);
        }
    }

    fn update_countdown(&mut self, dt_ms: u64) {
        self.phase_elapsed_ms = self.phase_elapsed_ms.saturating_add(dt_ms);
        let step_ms = self.config.countdown_step_ms;
        // one extra step after the last text before play starts
        let total_ms = step_ms.saturating_mul(COUNTDOWN_STEPS.len() as u64 + 1);
        if self.phase_elapsed_ms >= total_ms {
            self.show_countdown_through(COUNTDOWN_STEPS.len() - 1);
            self.finish_countdown();
            return;
        }
        let index = (self.phase_elapsed_ms / step_ms.max(1)) as usize;
        self.show_countdown_through(index);
    }

    fn finish_countdown(&mut self) {
        self.round_started = true;
        self.events.push(RuntimeEvent::CountdownHidden);
        self.phase = RoundPhase::Playing;
        self.phase_elapsed_ms = 0;
        self.game_time_ms = 0;
        self.player.input_enabled = true;
        self.ghosts_enabled = true;
        self.set_ghost_animation_frozen(false);
        self.events.push(RuntimeEvent::RoundStarted);
        info!(level_id = self.config.level_id, lives = self.lives, "round started");
    }

    fn update_playing(&mut self, dt_ms: u64) {
        self.game_time_ms = self.game_time_ms.saturating_add(dt_ms);
        self.tick_scared_timer(dt_ms);
        self.tick_ghost_respawns(dt_ms);
        self.tick_cherry_spawner(dt_ms);
    }

    pub(super) fn start_scared_timer(&mut self) {
        let duration_ms = self.config.scared_duration_ms;
        self.scared_left_ms = duration_ms;
        self.recovering_sent = false;
        self.events
            .push(RuntimeEvent::ScaredTimerShown { duration_ms });
        if self.dead_count == 0 {
            self.play_ambient(AmbientLoop::Scared);
        }
        self.broadcast_ghost_state(GhostState::Scared);
    }

    fn tick_scared_timer(&mut self, dt_ms: u64) {
        if self.scared_left_ms == 0 {
            return;
        }
        self.scared_left_ms = self.scared_left_ms.saturating_sub(dt_ms);
        if self.scared_left_ms > 0 {
            if !self.recovering_sent && self.scared_left_ms <= self.config.recovering_threshold_ms
            {
                self.recovering_sent = true;
                self.broadcast_ghost_state(GhostState::Recovering);
            }
            return;
        }

        self.recovering_sent = false;
        self.events.push(RuntimeEvent::ScaredTimerHidden);
        if self.dead_count == 0 {
            self.play_ambient(AmbientLoop::Normal);
        }
        self.broadcast_ghost_state(GhostState::Normal);
        debug!("scared timer expired");
    }

    fn update_dying(&mut self, dt_ms: u64, input: &FrameInput) {
        match self.death_stage {
            DeathStage::Animating => {
                self.phase_elapsed_ms = self.phase_elapsed_ms.saturating_add(dt_ms);
                if self.phase_elapsed_ms < self.config.death_anim_ms {
                    return;
                }
                self.set_lives(self.lives.saturating_sub(1));
                if self.lives == 0 {
                    self.enter_game_over();
                    return;
                }
                self.reset_after_death();
                self.death_stage = DeathStage::AwaitingKey;
                self.events.push(RuntimeEvent::AwaitingInput);
            }
            DeathStage::AwaitingKey => {
                if !input.any_key_edge || input.intent == Direction::None {
                    return;
                }
                self.player.dying = false;
                if !self.round_started {
                    // died before the countdown finished; run it again
                    self.enter_countdown();
                    info!(lives = self.lives, "countdown restarted");
                    return;
                }
                self.phase = RoundPhase::Playing;
                self.phase_elapsed_ms = 0;
                self.player.input_enabled = true;
                self.player.motion.queue(input.intent);
                self.ghosts_enabled = true;
                self.set_ghost_animation_frozen(false);
                self.events.push(RuntimeEvent::RoundResumed);
                info!(lives = self.lives, "round resumed");
            }
        }
    }

    /// Puts every actor back on its spawn and clears scared/dead bookkeeping.
    fn reset_after_death(&mut self) {
        self.motion.cancel(ActorId::Player);
        let spawn = self.player.spawn;
        self.player.motion.place_at(spawn, Direction::Right);
        self.events.push(RuntimeEvent::PlayerRespawned);

        for index in 0..self.ghosts.len() {
            self.motion.cancel(ActorId::Ghost(index));
            let ghost = &mut self.ghosts[index];
            ghost.motion.place_at(ghost.spawn, Direction::None);
            ghost.respawn_left_ms = 0;
            if ghost.state == GhostState::Dead {
                ghost.state = GhostState::Normal;
                self.events.push(RuntimeEvent::GhostVisual {
                    index,
                    state: GhostState::Normal,
                });
            }
        }
        self.dead_count = 0;

        if self.scared_left_ms > 0 {
            self.events.push(RuntimeEvent::ScaredTimerHidden);
        }
        self.scared_left_ms = 0;
        self.recovering_sent = false;
        self.play_ambient(AmbientLoop::Normal);
        self.broadcast_ghost_state(GhostState::Normal);
    }

    fn enter_game_over(&mut self) {
        self.phase = RoundPhase::GameOver;
        self.phase_elapsed_ms = 0;
        self.player.input_enabled = false;
        self.ghosts_enabled = false;
        self.set_ghost_animation_frozen(true);
        self.events.push(RuntimeEvent::GameOver);
        info!(
            score = self.score,
            game_time_ms = self.game_time_ms,
            "game over"
        );
        self.save_high_score();
    }

    fn save_high_score(&mut self) {
        let Some(store) = self.high_scores.as_mut() else {
            return;
        };
        let level_id = self.config.level_id;
        let record = BestRecord {
            score: self.score,
            time_sec: ms_to_sec(self.game_time_ms),
        };
        match submit_result(&mut **store, level_id, record) {
            Ok(true) => {
                info!(level_id, score = record.score, time_sec = record.time_sec, "new best saved");
                self.events.push(RuntimeEvent::HighScoreSaved {
                    level_id,
                    score: record.score,
                    time_sec: record.time_sec,
                });
            }
            Ok(false) => debug!(level_id, score = record.score, "result below stored best"),
            Err(error) => warn!(level_id, %error, "failed to save high score"),
        }
    }

    fn update_game_over(&mut self, dt_ms: u64) {
        self.phase_elapsed_ms = self.phase_elapsed_ms.saturating_add(dt_ms);
        if self.scene_reset_sent || self.phase_elapsed_ms < self.config.game_over_hold_ms {
            return;
        }
        self.scene_reset_sent = true;
        self.events.push(RuntimeEvent::SceneReset);
        info!("scene reset requested");
    }
}
