use crate::rng::Rng;
use crate::types::{Direction, GhostPersonality, GhostState, Vec2, WorldPos};

const PATROL_ORDER: [Direction; 4] = [
    Direction::Right,
    Direction::Down,
    Direction::Left,
    Direction::Up,
];

/// Everything a ghost looks at when it picks its next cell.
#[derive(Clone, Copy, Debug)]
pub struct DecisionInput {
    pub cell: Vec2,
    pub position: WorldPos,
    pub last_dir: Direction,
    pub state: GhostState,
    pub target: Vec2,
    pub home: WorldPos,
}

/// Walkable directions that do not reverse `last_dir`. A dead end yields the
/// reverse alone when that one is walkable.
pub fn valid_directions(
    cell: Vec2,
    last_dir: Direction,
    blocked: impl Fn(Vec2) -> bool,
) -> Vec<Direction> {
    let reverse = last_dir.reverse();
    let valid: Vec<Direction> = Direction::CARDINALS
        .into_iter()
        .filter(|dir| *dir != reverse || reverse == Direction::None)
        .filter(|dir| !blocked(cell.offset(*dir)))
        .collect();
    if !valid.is_empty() || reverse == Direction::None {
        return valid;
    }
    if blocked(cell.offset(reverse)) {
        Vec::new()
    } else {
        vec![reverse]
    }
}

/// Dead ghosts ignore walls and step along the axis with the larger offset to
/// home, horizontal on ties.
pub fn direction_home(position: WorldPos, home: WorldPos) -> Direction {
    let dx = home.x - position.x;
    let dy = home.y - position.y;
    if dx.abs() < 0.5 && dy.abs() < 0.5 {
        return Direction::None;
    }
    if dx.abs() >= dy.abs() {
        if dx > 0.0 {
            Direction::Right
        } else {
            Direction::Left
        }
    } else if dy > 0.0 {
        Direction::Down
    } else {
        Direction::Up
    }
}

fn farthest_not_closer(cell: Vec2, target: Vec2, valid: &[Direction]) -> Option<Direction> {
    let current = cell.distance_sq(target);
    let mut best: Option<(Direction, i64)> = None;
    for dir in valid {
        let dist = cell.offset(*dir).distance_sq(target);
        if dist < current {
            continue;
        }
        if best.map(|(_, d)| dist > d).unwrap_or(true) {
            best = Some((*dir, dist));
        }
    }
    best.map(|(dir, _)| dir)
}

fn closest_not_farther(cell: Vec2, target: Vec2, valid: &[Direction]) -> Option<Direction> {
    let current = cell.distance_sq(target);
    let mut best: Option<(Direction, i64)> = None;
    for dir in valid {
        let dist = cell.offset(*dir).distance_sq(target);
        if dist > current {
            continue;
        }
        if best.map(|(_, d)| dist < d).unwrap_or(true) {
            best = Some((*dir, dist));
        }
    }
    best.map(|(dir, _)| dir)
}

/// Next direction for a ghost standing on `input.cell`. `None` means the
/// ghost stays put this tick.
pub fn decide(
    personality: GhostPersonality,
    input: &DecisionInput,
    blocked: impl Fn(Vec2) -> bool,
    rng: &mut Rng,
) -> Direction {
    if input.state == GhostState::Dead {
        return direction_home(input.position, input.home);
    }

    let valid = valid_directions(input.cell, input.last_dir, blocked);
    if valid.is_empty() {
        return Direction::None;
    }

    let flee = input.state.is_edible() || personality == GhostPersonality::Flee;
    let picked = if flee {
        farthest_not_closer(input.cell, input.target, &valid)
    } else {
        match personality {
            GhostPersonality::Chase => closest_not_farther(input.cell, input.target, &valid),
            GhostPersonality::Patrol => PATROL_ORDER.into_iter().find(|dir| valid.contains(dir)),
            GhostPersonality::Random | GhostPersonality::Flee => None,
        }
    };

    picked
        .or_else(|| rng.pick(&valid))
        .unwrap_or(Direction::None)
}
