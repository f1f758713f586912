use crate::constants::MIN_SPEED;
use crate::motion::{ActorId, MotionScheduler};
use crate::types::{Direction, Vec2, WorldPos};

/// When the logical cell follows a move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellCommit {
    /// The cell jumps to the destination as soon as the move is accepted.
    OnRequest,
    /// The cell is updated by the owner when the move completes.
    OnComplete,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepReport {
    pub started: Option<Direction>,
    /// The queued intent pointed into an obstacle and was discarded.
    pub bumped: bool,
}

/// Cell-to-cell movement for one actor on top of a [`MotionScheduler`].
#[derive(Clone, Debug)]
pub struct ActorMotion {
    pub id: ActorId,
    pub cell: Vec2,
    pub position: WorldPos,
    pub committed: Direction,
    pub queued: Direction,
    pub facing: Direction,
    pub moving: bool,
    pub commit: CellCommit,
    pub tiles_per_sec: f32,
}

impl ActorMotion {
    pub fn new(id: ActorId, cell: Vec2, commit: CellCommit, tiles_per_sec: f32) -> Self {
        Self {
            id,
            cell,
            position: WorldPos::from_cell(cell),
            committed: Direction::None,
            queued: Direction::None,
            facing: Direction::Right,
            moving: false,
            commit,
            tiles_per_sec,
        }
    }

    pub fn queue(&mut self, dir: Direction) {
        if dir != Direction::None {
            self.queued = dir;
        }
    }

    /// Snaps the actor onto `cell`, dropping any intent. Callers cancel the
    /// scheduler transition themselves.
    pub fn place_at(&mut self, cell: Vec2, facing: Direction) {
        self.cell = cell;
        self.position = WorldPos::from_cell(cell);
        self.committed = Direction::None;
        self.queued = Direction::None;
        self.facing = facing;
        self.moving = false;
    }

    pub fn move_duration_sec(&self, from: WorldPos, to: WorldPos) -> f32 {
        from.distance(to) / self.tiles_per_sec.max(MIN_SPEED)
    }

    /// One controller tick. Tries the queued intent first, then keeps going
    /// in the committed direction. Does nothing while a transition is live.
    pub fn step<C>(
        &mut self,
        scheduler: &mut MotionScheduler<C>,
        blocked: impl Fn(Vec2) -> bool,
        on_complete: impl Fn(Vec2) -> C,
    ) -> StepReport {
        let mut report = StepReport::default();
        if scheduler.is_moving(self.id) {
            return report;
        }

        let queued = self.queued;
        if queued != Direction::None {
            if self.try_start(queued, scheduler, &blocked, &on_complete) {
                report.started = Some(queued);
                return report;
            }
            self.queued = Direction::None;
            report.bumped = true;
        }

        let committed = self.committed;
        if committed != Direction::None
            && committed != queued
            && self.try_start(committed, scheduler, &blocked, &on_complete)
        {
            report.started = Some(committed);
            return report;
        }

        self.moving = false;
        report
    }

    fn try_start<C>(
        &mut self,
        dir: Direction,
        scheduler: &mut MotionScheduler<C>,
        blocked: &impl Fn(Vec2) -> bool,
        on_complete: &impl Fn(Vec2) -> C,
    ) -> bool {
        let next = self.cell.offset(dir);
        if blocked(next) {
            return false;
        }
        let from = WorldPos::from_cell(self.cell);
        let to = WorldPos::from_cell(next);
        let duration = self.move_duration_sec(from, to);
        if !scheduler.request_move(self.id, from, to, duration, on_complete(next)) {
            return false;
        }
        self.committed = dir;
        self.facing = dir;
        self.moving = true;
        if self.commit == CellCommit::OnRequest {
            self.cell = next;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_except(walls: &'static [(i32, i32)]) -> impl Fn(Vec2) -> bool {
        move |cell: Vec2| walls.iter().any(|(x, y)| cell.x == *x && cell.y == *y)
    }

    #[test]
    fn player_commits_cell_at_request_and_keeps_committed_direction() {
        let mut scheduler: MotionScheduler<Vec2> = MotionScheduler::new();
        let mut player = ActorMotion::new(ActorId::Player, Vec2::new(1, 1), CellCommit::OnRequest, 2.0);
        player.queue(Direction::Right);

        let report = player.step(&mut scheduler, open_except(&[]), |cell| cell);
        assert_eq!(report.started, Some(Direction::Right));
        assert_eq!(player.cell, Vec2::new(2, 1));
        assert!(player.moving);

        let again = player.step(&mut scheduler, open_except(&[]), |cell| cell);
        assert_eq!(again, StepReport::default());

        let done = scheduler.tick(0.5, |_, pos| player.position = pos);
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].on_complete, Vec2::new(2, 1));
        assert_eq!(player.position, WorldPos::new(2.0, 1.0));
    }

    #[test]
    fn ghost_cell_waits_for_completion() {
        let mut scheduler: MotionScheduler<Vec2> = MotionScheduler::new();
        let mut ghost = ActorMotion::new(ActorId::Ghost(0), Vec2::new(3, 3), CellCommit::OnComplete, 1.0);
        ghost.queue(Direction::Up);
        let report = ghost.step(&mut scheduler, open_except(&[]), |cell| cell);
        assert_eq!(report.started, Some(Direction::Up));
        assert_eq!(ghost.cell, Vec2::new(3, 3));
    }

    #[test]
    fn blocked_intent_is_cleared_and_committed_direction_continues() {
        let mut scheduler: MotionScheduler<()> = MotionScheduler::new();
        let mut player = ActorMotion::new(ActorId::Player, Vec2::new(1, 1), CellCommit::OnRequest, 3.0);
        player.committed = Direction::Right;
        player.queue(Direction::Up);

        let report = player.step(&mut scheduler, open_except(&[(1, 0)]), |_| ());
        assert!(report.bumped);
        assert_eq!(report.started, Some(Direction::Right));
        assert_eq!(player.queued, Direction::None);
        assert_eq!(player.cell, Vec2::new(2, 1));
    }

    #[test]
    fn fully_blocked_actor_stays_put_and_remembers_direction() {
        let mut scheduler: MotionScheduler<()> = MotionScheduler::new();
        let mut player = ActorMotion::new(ActorId::Player, Vec2::new(1, 1), CellCommit::OnRequest, 3.0);
        player.committed = Direction::Right;
        player.moving = true;

        let report = player.step(&mut scheduler, open_except(&[(2, 1)]), |_| ());
        assert_eq!(report, StepReport::default());
        assert!(!player.moving);
        assert_eq!(player.committed, Direction::Right);
        assert_eq!(player.cell, Vec2::new(1, 1));
        assert_eq!(scheduler.live_count(), 0);
    }

    #[test]
    fn move_duration_uses_distance_over_speed() {
        let player = ActorMotion::new(ActorId::Player, Vec2::new(0, 0), CellCommit::OnRequest, 4.0);
        let duration = player.move_duration_sec(WorldPos::new(0.0, 0.0), WorldPos::new(1.0, 0.0));
        assert!((duration - 0.25).abs() < 1e-6);

        let stalled = ActorMotion::new(ActorId::Player, Vec2::new(0, 0), CellCommit::OnRequest, 0.0);
        assert!(stalled.move_duration_sec(WorldPos::new(0.0, 0.0), WorldPos::new(1.0, 0.0)) > 1.0);
    }

    #[test]
    fn place_at_resets_intent_and_faces_given_direction() {
        let mut ghost = ActorMotion::new(ActorId::Ghost(2), Vec2::new(5, 5), CellCommit::OnComplete, 1.0);
        ghost.committed = Direction::Left;
        ghost.queued = Direction::Up;
        ghost.place_at(Vec2::new(9, 9), Direction::Right);
        assert_eq!(ghost.cell, Vec2::new(9, 9));
        assert_eq!(ghost.position, WorldPos::new(9.0, 9.0));
        assert_eq!(ghost.committed, Direction::None);
        assert_eq!(ghost.queued, Direction::None);
        assert_eq!(ghost.facing, Direction::Right);
    }
}
