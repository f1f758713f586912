use crate::constants::{ARRIVAL_TOLERANCE_SQ, MIN_DURATION_SEC};
use crate::types::WorldPos;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActorId {
    Player,
    Ghost(usize),
    Cherry,
}

#[derive(Clone, Debug)]
struct Transition<C> {
    actor: ActorId,
    start_pos: WorldPos,
    end_pos: WorldPos,
    start_sec: f32,
    duration_sec: f32,
    on_complete: C,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompletedMove<C> {
    pub actor: ActorId,
    pub end_pos: WorldPos,
    pub on_complete: C,
}

/// Drives timed linear moves. At most one live transition per actor; a
/// finished transition is snapped to its end, reported once and dropped.
#[derive(Clone, Debug)]
pub struct MotionScheduler<C> {
    transitions: Vec<Transition<C>>,
    clock_sec: f32,
}

impl<C> Default for MotionScheduler<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> MotionScheduler<C> {
    pub fn new() -> Self {
        Self {
            transitions: Vec::new(),
            clock_sec: 0.0,
        }
    }

    pub fn is_moving(&self, actor: ActorId) -> bool {
        self.transitions.iter().any(|t| t.actor == actor)
    }

    pub fn live_count(&self) -> usize {
        self.transitions.len()
    }

    /// Starts a transition at the scheduler's current clock. Returns false and
    /// leaves everything untouched when the actor already has one in flight.
    pub fn request_move(
        &mut self,
        actor: ActorId,
        from: WorldPos,
        to: WorldPos,
        duration_sec: f32,
        on_complete: C,
    ) -> bool {
        if self.is_moving(actor) {
            return false;
        }
        self.transitions.push(Transition {
            actor,
            start_pos: from,
            end_pos: to,
            start_sec: self.clock_sec,
            duration_sec: duration_sec.max(MIN_DURATION_SEC),
            on_complete,
        });
        true
    }

    pub fn cancel(&mut self, actor: ActorId) -> bool {
        let before = self.transitions.len();
        self.transitions.retain(|t| t.actor != actor);
        before != self.transitions.len()
    }

    /// Advances every live transition to `now_sec`, handing each interpolated
    /// position to `apply`. Transitions that reached their end are removed and
    /// returned in the order they were requested.
    pub fn tick(
        &mut self,
        now_sec: f32,
        mut apply: impl FnMut(ActorId, WorldPos),
    ) -> Vec<CompletedMove<C>> {
        self.clock_sec = now_sec;
        let mut completed = Vec::new();
        let mut idx = 0;
        while idx < self.transitions.len() {
            let (actor, pos, end_pos) = {
                let t = &self.transitions[idx];
                let u = ((now_sec - t.start_sec) / t.duration_sec).clamp(0.0, 1.0);
                (t.actor, t.start_pos.lerp(t.end_pos, u), t.end_pos)
            };

            if pos.distance_sq(end_pos) <= ARRIVAL_TOLERANCE_SQ {
                let done = self.transitions.remove(idx);
                apply(actor, done.end_pos);
                completed.push(CompletedMove {
                    actor,
                    end_pos: done.end_pos,
                    on_complete: done.on_complete,
                });
                continue;
            }

            apply(actor, pos);
            idx += 1;
        }
        completed
    }
}
