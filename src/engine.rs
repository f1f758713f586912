use tracing::{debug, info};

use crate::actor::{ActorMotion, CellCommit};
use crate::config::GameConfig;
use crate::constants::{GHOST_COUNT, MAX_LIVES};
use crate::high_score_store::HighScoreStore;
use crate::motion::{ActorId, MotionScheduler};
use crate::rng::Rng;
use crate::types::{
    AmbientLoop, CherryView, Direction, FrameInput, GhostPersonality, GhostState, GhostView,
    PickupKind, PlayerView, RoundPhase, RuntimeEvent, Snapshot, Vec2, WorldPos,
};
use crate::world::MazeWorld;

mod cherry_system;
mod ghost_system;
pub mod policy;
mod round_system;
mod utils;

use self::cherry_system::CherryState;
use self::utils::{ms_to_sec, now_ms};

/// Payload carried by each scheduler transition, resolved when it completes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MoveCompletion {
    Player,
    Ghost { index: usize, cell: Vec2 },
    Cherry,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DeathStage {
    Animating,
    AwaitingKey,
}

#[derive(Clone, Debug)]
struct PlayerInternal {
    motion: ActorMotion,
    spawn: Vec2,
    input_enabled: bool,
    dying: bool,
    teleport_ready_at_ms: u64,
}

#[derive(Clone, Debug)]
struct GhostInternal {
    motion: ActorMotion,
    spawn: Vec2,
    personality: GhostPersonality,
    state: GhostState,
    respawn_left_ms: u64,
}

pub struct GameEngine {
    pub started_at_ms: u64,
    pub config: GameConfig,
    pub world: MazeWorld,

    rng: Rng,
    motion: MotionScheduler<MoveCompletion>,
    player: PlayerInternal,
    ghosts: Vec<GhostInternal>,
    cherry: CherryState,
    events: Vec<RuntimeEvent>,
    high_scores: Option<Box<dyn HighScoreStore + Send>>,

    phase: RoundPhase,
    phase_elapsed_ms: u64,
    countdown_shown: Option<usize>,
    round_started: bool,
    death_stage: DeathStage,
    elapsed_ms: u64,
    game_time_ms: u64,
    tick_counter: u64,
    score: u32,
    lives: u32,
    scared_left_ms: u64,
    recovering_sent: bool,
    dead_count: usize,
    ghosts_enabled: bool,
    ghost_animation_frozen: bool,
    scene_reset_sent: bool,
}

impl GameEngine {
    pub fn new(
        config: GameConfig,
        world: MazeWorld,
        seed: u32,
        high_scores: Option<Box<dyn HighScoreStore + Send>>,
    ) -> Self {
        let config = config.sanitized();
        let player = PlayerInternal {
            motion: ActorMotion::new(
                ActorId::Player,
                world.player_spawn,
                CellCommit::OnRequest,
                config.player_tiles_per_sec,
            ),
            spawn: world.player_spawn,
            input_enabled: false,
            dying: false,
            teleport_ready_at_ms: 0,
        };
        let ghosts = (0..GHOST_COUNT)
            .map(|index| {
                let spawn = world.ghost_spawns[index];
                GhostInternal {
                    motion: ActorMotion::new(
                        ActorId::Ghost(index),
                        spawn,
                        CellCommit::OnComplete,
                        config.ghost_tiles_per_sec,
                    ),
                    spawn,
                    personality: config.personalities[index],
                    state: GhostState::Normal,
                    respawn_left_ms: 0,
                }
            })
            .collect();

        let mut engine = Self {
            started_at_ms: now_ms(),
            cherry: CherryState::new(config.cherry_first_delay_ms),
            lives: config.starting_lives.min(MAX_LIVES),
            config,
            world,
            rng: Rng::new(seed),
            motion: MotionScheduler::new(),
            player,
            ghosts,
            events: Vec::new(),
            high_scores,
            phase: RoundPhase::Countdown,
            phase_elapsed_ms: 0,
            countdown_shown: None,
            round_started: false,
            death_stage: DeathStage::Animating,
            elapsed_ms: 0,
            game_time_ms: 0,
            tick_counter: 0,
            score: 0,
            scared_left_ms: 0,
            recovering_sent: false,
            dead_count: 0,
            ghosts_enabled: false,
            ghost_animation_frozen: false,
            scene_reset_sent: false,
        };
        engine.events.push(RuntimeEvent::ScoreChanged { score: 0 });
        engine.events.push(RuntimeEvent::LivesChanged {
            lives: engine.lives,
        });
        engine.enter_countdown();
        engine
    }

    /// True once the game-over hold has elapsed and the scene reset went out.
    pub fn is_ended(&self) -> bool {
        self.scene_reset_sent
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn scared_left_ms(&self) -> u64 {
        self.scared_left_ms
    }

    pub fn dead_count(&self) -> usize {
        self.dead_count
    }

    pub fn game_time_ms(&self) -> u64 {
        self.game_time_ms
    }

    pub fn ghost_state(&self, index: usize) -> Option<GhostState> {
        self.ghosts.get(index).map(|ghost| ghost.state)
    }

    /// One frame: scheduler, movement controllers, ghost decisions,
    /// collisions, then the round timers.
    pub fn step(&mut self, dt_ms: u64, input: &FrameInput) {
        if self.is_ended() {
            return;
        }
        self.tick_counter = self.tick_counter.saturating_add(1);
        self.elapsed_ms = self.elapsed_ms.saturating_add(dt_ms);

        self.advance_motion();
        self.update_player(input);
        self.update_ghosts();
        if self.phase == RoundPhase::Playing {
            self.resolve_ghost_collisions();
            self.resolve_cherry_collision();
        }
        self.update_round(dt_ms, input);
    }

    pub fn build_snapshot(&mut self, include_events: bool) -> Snapshot {
        let player = &self.player.motion;
        let snapshot = Snapshot {
            tick: self.tick_counter,
            now_ms: self.started_at_ms.saturating_add(self.elapsed_ms),
            phase: self.phase,
            score: self.score,
            lives: self.lives,
            game_time_ms: self.game_time_ms,
            scared_left_ms: self.scared_left_ms,
            dead_count: self.dead_count,
            ghosts_enabled: self.ghosts_enabled,
            ghost_animation_frozen: self.ghost_animation_frozen,
            pellets_left: self.world.pickups_remaining(),
            player: PlayerView {
                x: player.cell.x,
                y: player.cell.y,
                px: player.position.x,
                py: player.position.y,
                dir: player.committed,
                facing: player.facing,
                moving: player.moving,
                input_enabled: self.player.input_enabled,
                dying: self.player.dying,
            },
            ghosts: self
                .ghosts
                .iter()
                .enumerate()
                .map(|(index, ghost)| GhostView {
                    index,
                    x: ghost.motion.cell.x,
                    y: ghost.motion.cell.y,
                    px: ghost.motion.position.x,
                    py: ghost.motion.position.y,
                    dir: ghost.motion.committed,
                    state: ghost.state,
                    personality: ghost.personality,
                    respawn_left_ms: ghost.respawn_left_ms,
                })
                .collect(),
            cherry: self.cherry.position().map(|pos| CherryView {
                px: pos.x,
                py: pos.y,
            }),
            events: if include_events {
                self.events.clone()
            } else {
                Vec::new()
            },
        };
        if include_events {
            self.events.clear();
        }
        snapshot
    }

    pub fn add_pellet(&mut self) {
        self.add_score(self.config.pellet_score);
    }

    pub fn add_cherry(&mut self) {
        self.add_score(self.config.cherry_score);
    }

    /// Scores the power pellet and (re)starts the scared timer at full length.
    pub fn add_power_pellet(&mut self) {
        self.add_score(self.config.power_pellet_score);
        self.start_scared_timer();
    }

    pub fn set_lives(&mut self, lives: u32) {
        self.lives = lives.min(MAX_LIVES);
        self.events.push(RuntimeEvent::LivesChanged { lives: self.lives });
    }

    fn add_score(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
        self.events
            .push(RuntimeEvent::ScoreChanged { score: self.score });
    }

    fn play_ambient(&mut self, kind: AmbientLoop) {
        self.events.push(RuntimeEvent::AmbientLoop { kind });
    }

    fn set_ghost_animation_frozen(&mut self, frozen: bool) {
        if self.ghost_animation_frozen == frozen {
            return;
        }
        self.ghost_animation_frozen = frozen;
        self.events
            .push(RuntimeEvent::GhostAnimationFrozen { frozen });
    }

    fn advance_motion(&mut self) {
        let now_sec = ms_to_sec(self.elapsed_ms);
        let player = &mut self.player;
        let ghosts = &mut self.ghosts;
        let cherry = &mut self.cherry;
        let completed = self.motion.tick(now_sec, |actor, pos| match actor {
            ActorId::Player => player.motion.position = pos,
            ActorId::Ghost(index) => {
                if let Some(ghost) = ghosts.get_mut(index) {
                    ghost.motion.position = pos;
                }
            }
            ActorId::Cherry => cherry.set_position(pos),
        });

        for done in completed {
            match done.on_complete {
                MoveCompletion::Player => self.on_player_arrived(),
                MoveCompletion::Ghost { index, cell } => {
                    if let Some(ghost) = self.ghosts.get_mut(index) {
                        ghost.motion.cell = cell;
                    }
                }
                MoveCompletion::Cherry => self.on_cherry_leg_done(),
            }
        }
    }

    fn update_player(&mut self, input: &FrameInput) {
        if !self.player.input_enabled {
            return;
        }
        if input.any_key_edge && input.intent != Direction::None {
            self.player.motion.queue(input.intent);
        }

        let world = &self.world;
        let report = self.player.motion.step(
            &mut self.motion,
            |cell| world.blocks_player(cell),
            |_| MoveCompletion::Player,
        );
        if report.bumped {
            let cell = self.player.motion.cell;
            self.events.push(RuntimeEvent::WallBump {
                x: cell.x,
                y: cell.y,
            });
        }
    }

    fn on_player_arrived(&mut self) {
        if self.phase != RoundPhase::Playing {
            return;
        }
        let cell = self.player.motion.cell;

        if self.elapsed_ms >= self.player.teleport_ready_at_ms {
            if let Some(exit) = self.world.teleport_exit(cell) {
                self.player.motion.cell = exit;
                self.player.motion.position = WorldPos::from_cell(exit);
                self.player.teleport_ready_at_ms =
                    self.elapsed_ms.saturating_add(self.config.teleport_cooldown_ms);
                debug!(from_x = cell.x, from_y = cell.y, to_x = exit.x, to_y = exit.y, "teleported");
                self.events.push(RuntimeEvent::Teleported {
                    x: exit.x,
                    y: exit.y,
                });
                return;
            }
        }

        let Some(kind) = self.world.consume_pickup(cell) else {
            return;
        };
        self.events.push(RuntimeEvent::PelletEaten {
            x: cell.x,
            y: cell.y,
            kind,
        });
        match kind {
            PickupKind::Pellet => self.add_pellet(),
            PickupKind::PowerPellet => {
                info!(x = cell.x, y = cell.y, "power pellet eaten");
                self.add_power_pellet();
            }
        }
    }
}
