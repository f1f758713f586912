use tracing::debug;

use crate::constants::{CHERRY_EDGE_MARGIN, MIN_SPEED};

use super::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CherryLeg {
    Inbound,
    Outbound,
}

#[derive(Clone, Debug)]
struct ActiveCherry {
    position: WorldPos,
    center: WorldPos,
    exit: WorldPos,
    leg: CherryLeg,
}

/// Bonus cherry that drifts from a random edge through the maze centre and
/// out the opposite side.
#[derive(Clone, Debug)]
pub(super) struct CherryState {
    active: Option<ActiveCherry>,
    wait_left_ms: u64,
}

impl CherryState {
    pub(super) fn new(first_delay_ms: u64) -> Self {
        Self {
            active: None,
            wait_left_ms: first_delay_ms,
        }
    }

    pub(super) fn position(&self) -> Option<WorldPos> {
        self.active.as_ref().map(|cherry| cherry.position)
    }

    pub(super) fn set_position(&mut self, pos: WorldPos) {
        if let Some(cherry) = self.active.as_mut() {
            cherry.position = pos;
        }
    }
}

impl GameEngine {
    pub(super) fn tick_cherry_spawner(&mut self, dt_ms: u64) {
        if self.cherry.active.is_some() {
            return;
        }
        self.cherry.wait_left_ms = self.cherry.wait_left_ms.saturating_sub(dt_ms);
        if self.cherry.wait_left_ms == 0 {
            self.spawn_cherry();
        }
    }

    fn cherry_leg_duration(&self, from: WorldPos, to: WorldPos) -> f32 {
        from.distance(to) / self.config.cherry_tiles_per_sec.max(MIN_SPEED)
    }

    fn spawn_cherry(&mut self) {
        let (min, max) = self.world.bounds();
        let start = match self.rng.int(0, 3) {
            0 => WorldPos::new(min.x - CHERRY_EDGE_MARGIN, self.rng.range_f32(min.y, max.y)),
            1 => WorldPos::new(max.x + CHERRY_EDGE_MARGIN, self.rng.range_f32(min.y, max.y)),
            2 => WorldPos::new(self.rng.range_f32(min.x, max.x), min.y - CHERRY_EDGE_MARGIN),
            _ => WorldPos::new(self.rng.range_f32(min.x, max.x), max.y + CHERRY_EDGE_MARGIN),
        };
        let center = self.world.bounds_center();
        // mirror of the start through the centre
        let exit = WorldPos::new(2.0 * center.x - start.x, 2.0 * center.y - start.y);

        self.motion.cancel(ActorId::Cherry);
        let duration = self.cherry_leg_duration(start, center);
        if !self
            .motion
            .request_move(ActorId::Cherry, start, center, duration, MoveCompletion::Cherry)
        {
            return;
        }
        self.cherry.active = Some(ActiveCherry {
            position: start,
            center,
            exit,
            leg: CherryLeg::Inbound,
        });
        self.events.push(RuntimeEvent::CherrySpawned);
        debug!(x = start.x, y = start.y, "cherry spawned");
    }

    pub(super) fn on_cherry_leg_done(&mut self) {
        let Some(cherry) = self.cherry.active.as_ref() else {
            return;
        };
        match cherry.leg {
            CherryLeg::Inbound => {
                let (from, to) = (cherry.center, cherry.exit);
                let duration = self.cherry_leg_duration(from, to);
                if self
                    .motion
                    .request_move(ActorId::Cherry, from, to, duration, MoveCompletion::Cherry)
                {
                    if let Some(cherry) = self.cherry.active.as_mut() {
                        cherry.leg = CherryLeg::Outbound;
                    }
                }
            }
            CherryLeg::Outbound => {
                self.clear_cherry();
                self.events.push(RuntimeEvent::CherryLeft);
            }
        }
    }

    pub(super) fn resolve_cherry_collision(&mut self) {
        if self.player.dying {
            return;
        }
        let Some(pos) = self.cherry.position() else {
            return;
        };
        let cherry_cell = self.world.cell_for_position(pos);
        let player_cell = self.world.cell_for_position(self.player.motion.position);
        if cherry_cell != player_cell {
            return;
        }
        self.motion.cancel(ActorId::Cherry);
        self.clear_cherry();
        self.events.push(RuntimeEvent::CherryTaken);
        self.add_cherry();
        debug!(x = cherry_cell.x, y = cherry_cell.y, "cherry collected");
    }

    fn clear_cherry(&mut self) {
        self.cherry.active = None;
        self.cherry.wait_left_ms = self.config.cherry_respawn_delay_ms;
    }
}

#[cfg(test)]
mod tests {
    use crate::config::GameConfig;
    use crate::constants::TICK_MS;
    use crate::engine::GameEngine;
    use crate::motion::ActorId;
    use crate::types::{FrameInput, RoundPhase, RuntimeEvent, WorldPos};
    use crate::world::default_world;

    fn playing_engine(seed: u32) -> GameEngine {
        let mut engine = GameEngine::new(
            GameConfig::default(),
            default_world().expect("default layout"),
            seed,
            None,
        );
        for _ in 0..(5_000 / TICK_MS) {
            engine.step(TICK_MS, &FrameInput::default());
        }
        assert_eq!(engine.phase, RoundPhase::Playing);
        engine.ghosts_enabled = false;
        engine.player.input_enabled = false;
        engine.build_snapshot(true);
        engine
    }

    fn step_ms(engine: &mut GameEngine, ms: u64) -> Vec<RuntimeEvent> {
        let mut events = Vec::new();
        for _ in 0..(ms / TICK_MS) {
            engine.step(TICK_MS, &FrameInput::default());
            events.extend(engine.build_snapshot(true).events);
        }
        events
    }

    #[test]
    fn cherry_spawns_after_delay_and_crosses_the_maze() {
        let mut engine = playing_engine(31);
        // player out of the cherry's way
        engine.player.motion.position = WorldPos::new(-50.0, -50.0);

        step_ms(&mut engine, 4_950);
        assert!(engine.cherry.position().is_none());
        let events = step_ms(&mut engine, 50);
        assert!(events.iter().any(|e| matches!(e, RuntimeEvent::CherrySpawned)));
        let start = engine.cherry.position().expect("cherry active");
        let center = engine.world.bounds_center();
        let (min, max) = engine.world.bounds();
        assert!(start.x < min.x || start.x > max.x || start.y < min.y || start.y > max.y);

        let mut left = false;
        for _ in 0..400 {
            let events = step_ms(&mut engine, TICK_MS);
            if events.iter().any(|e| matches!(e, RuntimeEvent::CherryLeft)) {
                left = true;
                break;
            }
        }
        assert!(left);
        assert!(engine.cherry.position().is_none());
        assert!(!engine.motion.is_moving(ActorId::Cherry));
        // the spawner already counted down the tick the cherry left on
        assert_eq!(
            engine.cherry.wait_left_ms,
            engine.config.cherry_respawn_delay_ms - TICK_MS
        );
        assert!((center.x - 13.5).abs() < 1e-6);
    }

    #[test]
    fn touching_the_cherry_scores_and_removes_it() {
        let mut engine = playing_engine(32);
        engine.spawn_cherry();
        let pos = engine.cherry.position().expect("cherry active");
        engine.player.motion.position = pos;
        engine.resolve_cherry_collision();

        assert_eq!(engine.score, 100);
        assert!(engine.cherry.position().is_none());
        assert!(!engine.motion.is_moving(ActorId::Cherry));
        let events = engine.build_snapshot(true).events;
        assert!(events.iter().any(|e| matches!(e, RuntimeEvent::CherryTaken)));
    }

    #[test]
    fn cherry_waits_outside_play() {
        let mut engine = playing_engine(33);
        engine.player_died();
        step_ms(&mut engine, 6_000);
        assert!(engine.cherry.position().is_none());
    }
}
