use tracing::debug;

use super::policy::{self, DecisionInput};
use super::*;

impl GameEngine {
    pub(super) fn update_ghosts(&mut self) {
        if !self.ghosts_enabled {
            return;
        }
        let target = self.player.motion.cell;
        let home = WorldPos::new(self.config.dead_ghost_home.0, self.config.dead_ghost_home.1);
        let world = &self.world;

        for index in 0..self.ghosts.len() {
            let ghost = &mut self.ghosts[index];
            if self.motion.is_moving(ghost.motion.id) {
                continue;
            }
            let dead = ghost.state == GhostState::Dead;
            let blocked = |cell: Vec2| !dead && world.blocks_ghost(cell);
            let input = DecisionInput {
                cell: ghost.motion.cell,
                position: ghost.motion.position,
                last_dir: ghost.motion.committed,
                state: ghost.state,
                target,
                home,
            };
            let dir = policy::decide(ghost.personality, &input, &blocked, &mut self.rng);
            if dir == Direction::None {
                ghost.motion.moving = false;
                continue;
            }
            ghost.motion.queued = dir;
            ghost
                .motion
                .step(&mut self.motion, &blocked, |cell| MoveCompletion::Ghost {
                    index,
                    cell,
                });
        }
    }

    /// Sends a ghost-state broadcast. Dead ghosts do not listen.
    pub(super) fn broadcast_ghost_state(&mut self, state: GhostState) {
        let broadcast = match state {
            GhostState::Scared => RuntimeEvent::GhostScaredStart {
                duration_ms: self.config.scared_duration_ms,
            },
            GhostState::Recovering => RuntimeEvent::GhostRecovering,
            GhostState::Normal => RuntimeEvent::GhostNormal,
            GhostState::Dead => return,
        };
        self.events.push(broadcast);

        for (index, ghost) in self.ghosts.iter_mut().enumerate() {
            if ghost.state == GhostState::Dead || ghost.state == state {
                continue;
            }
            ghost.state = state;
            self.events.push(RuntimeEvent::GhostVisual { index, state });
        }
    }

    /// Reports that ghost `index` was eaten. Only scared or recovering ghosts
    /// can be eaten; anything else is ignored.
    pub fn ghost_eaten(&mut self, index: usize) -> bool {
        let respawn_ms = self.config.ghost_respawn_ms;
        let Some(ghost) = self.ghosts.get_mut(index) else {
            return false;
        };
        if !ghost.state.is_edible() {
            return false;
        }
        ghost.state = GhostState::Dead;
        ghost.respawn_left_ms = respawn_ms;
        self.dead_count += 1;
        self.events.push(RuntimeEvent::GhostVisual {
            index,
            state: GhostState::Dead,
        });
        self.events.push(RuntimeEvent::GhostEaten { index });
        self.add_score(self.config.ghost_score);
        self.play_ambient(AmbientLoop::Dead);
        debug!(index, dead_count = self.dead_count, "ghost eaten");
        true
    }

    pub(super) fn tick_ghost_respawns(&mut self, dt_ms: u64) {
        for index in 0..self.ghosts.len() {
            let ghost = &mut self.ghosts[index];
            if ghost.state != GhostState::Dead {
                continue;
            }
            ghost.respawn_left_ms = ghost.respawn_left_ms.saturating_sub(dt_ms);
            if ghost.respawn_left_ms == 0 {
                self.respawn_ghost(index);
            }
        }
    }

    fn respawn_ghost(&mut self, index: usize) {
        let next_state = if self.scared_left_ms > self.config.recovering_threshold_ms {
            GhostState::Scared
        } else if self.scared_left_ms > 0 {
            GhostState::Recovering
        } else {
            GhostState::Normal
        };

        self.motion.cancel(ActorId::Ghost(index));
        let Some(ghost) = self.ghosts.get_mut(index) else {
            return;
        };
        if ghost.state != GhostState::Dead {
            return;
        }
        ghost.motion.place_at(ghost.spawn, Direction::None);
        ghost.state = next_state;
        ghost.respawn_left_ms = 0;
        self.dead_count = self.dead_count.saturating_sub(1);
        self.events.push(RuntimeEvent::GhostVisual {
            index,
            state: next_state,
        });
        self.events.push(RuntimeEvent::GhostRespawned {
            index,
            state: next_state,
        });
        debug!(index, state = ?next_state, "ghost respawned");

        if self.dead_count == 0 {
            let kind = if self.scared_left_ms > 0 {
                AmbientLoop::Scared
            } else {
                AmbientLoop::Normal
            };
            self.play_ambient(kind);
        }
    }

    /// Contact with a scared or recovering ghost eats it; contact with a
    /// normal ghost kills the player. Dead ghosts pass through.
    pub(super) fn resolve_ghost_collisions(&mut self) {
        if self.player.dying {
            return;
        }
        let radius_sq = self.config.collision_radius * self.config.collision_radius;
        let player_pos = self.player.motion.position;

        for index in 0..self.ghosts.len() {
            let ghost = &self.ghosts[index];
            if ghost.state == GhostState::Dead {
                continue;
            }
            if ghost.motion.position.distance_sq(player_pos) >= radius_sq {
                continue;
            }
            if ghost.state.is_edible() {
                self.ghost_eaten(index);
            } else {
                self.player_died();
                return;
            }
        }
    }
}
