use std::collections::BTreeMap;

use crate::constants::GHOST_COUNT;
use crate::error::MazeError;
use crate::types::{PickupKind, Vec2, WorldPos};

/// Tile legend:
/// `#` wall, `=` pursuer-only wall (blocks the player, not ghosts),
/// `.` pellet, `o` power pellet, ` ` empty floor, `P` player spawn,
/// `0`-`3` ghost spawns, `T` teleporter (paired in reading order).
pub const DEFAULT_LAYOUT: [&str; 24] = [
    "############################",
    "#............##............#",
    "#.####.#####.##.#####.####.#",
    "#o####.#####.##.#####.####o#",
    "#..........................#",
    "#.####.##.########.##.####.#",
    "#......##....##....##......#",
    "######.##### ## #####.######",
    "######.##          ##.######",
    "######.## ###==### ##.######",
    "######.## #      # ##.######",
    "T     .   # 0123 #   .     T",
    "######.## #      # ##.######",
    "######.## ######## ##.######",
    "######.##          ##.######",
    "######.## ######## ##.######",
    "#............##............#",
    "#.####.#####.##.#####.####.#",
    "#o..##.......P........##..o#",
    "###.##.##.########.##.##.###",
    "#......##....##....##......#",
    "#.##########.##.##########.#",
    "#..........................#",
    "############################",
];

#[derive(Clone, Debug)]
pub struct MazeWorld {
    pub width: i32,
    pub height: i32,
    /// Structural tiles only: `#`, `=` or `.` for open floor.
    pub tiles: Vec<String>,
    pub player_spawn: Vec2,
    pub ghost_spawns: [Vec2; GHOST_COUNT],
    pub teleporters: Vec<(Vec2, Vec2)>,
    pickups: BTreeMap<(i32, i32), PickupKind>,
}

pub fn default_world() -> Result<MazeWorld, MazeError> {
    parse_maze(&DEFAULT_LAYOUT)
}

pub fn parse_maze(rows: &[&str]) -> Result<MazeWorld, MazeError> {
    let first = rows.first().ok_or(MazeError::Empty)?;
    let width = first.chars().count();
    if width == 0 {
        return Err(MazeError::Empty);
    }

    let mut tiles = Vec::with_capacity(rows.len());
    let mut pickups = BTreeMap::new();
    let mut player_spawn = None;
    let mut ghost_spawns: [Option<Vec2>; GHOST_COUNT] = [None; GHOST_COUNT];
    let mut pending_teleporter: Option<Vec2> = None;
    let mut teleporters = Vec::new();

    for (row, line) in rows.iter().enumerate() {
        let found = line.chars().count();
        if found != width {
            return Err(MazeError::RaggedRow {
                row,
                expected: width,
                found,
            });
        }

        let y = row as i32;
        let mut structural = String::with_capacity(width);
        for (col, tile) in line.chars().enumerate() {
            let x = col as i32;
            let cell = Vec2::new(x, y);
            let base = match tile {
                '#' => '#',
                '=' => '=',
                '.' => {
                    pickups.insert((x, y), PickupKind::Pellet);
                    '.'
                }
                'o' => {
                    pickups.insert((x, y), PickupKind::PowerPellet);
                    '.'
                }
                ' ' => '.',
                'P' => {
                    player_spawn = Some(cell);
                    '.'
                }
                'T' => {
                    match pending_teleporter.take() {
                        Some(entry) => teleporters.push((entry, cell)),
                        None => pending_teleporter = Some(cell),
                    }
                    '.'
                }
                digit @ '0'..='9' => {
                    let index = digit as usize - '0' as usize;
                    match ghost_spawns.get_mut(index) {
                        Some(slot) => *slot = Some(cell),
                        None => return Err(MazeError::UnknownTile { tile, x, y }),
                    }
                    '.'
                }
                _ => return Err(MazeError::UnknownTile { tile, x, y }),
            };
            structural.push(base);
        }
        tiles.push(structural);
    }

    if let Some(cell) = pending_teleporter {
        return Err(MazeError::UnpairedTeleporter {
            x: cell.x,
            y: cell.y,
        });
    }
    let player_spawn = player_spawn.ok_or(MazeError::MissingPlayerSpawn)?;
    let mut spawns = [Vec2::default(); GHOST_COUNT];
    for (index, slot) in ghost_spawns.iter().enumerate() {
        spawns[index] = slot.ok_or(MazeError::MissingGhostSpawn(index))?;
    }

    Ok(MazeWorld {
        width: width as i32,
        height: rows.len() as i32,
        tiles,
        player_spawn,
        ghost_spawns: spawns,
        teleporters,
        pickups,
    })
}

impl MazeWorld {
    fn tile_at(&self, cell: Vec2) -> Option<u8> {
        if cell.x < 0 || cell.y < 0 || cell.x >= self.width || cell.y >= self.height {
            return None;
        }
        self.tiles
            .get(cell.y as usize)
            .and_then(|row| row.as_bytes().get(cell.x as usize))
            .copied()
    }

    pub fn cell_for_position(&self, pos: WorldPos) -> Vec2 {
        Vec2::new(pos.x.round() as i32, pos.y.round() as i32)
    }

    pub fn center_of_cell(&self, cell: Vec2) -> WorldPos {
        WorldPos::from_cell(cell)
    }

    /// Off-grid cells count as walls.
    pub fn is_wall(&self, cell: Vec2) -> bool {
        self.tile_at(cell).map(|c| c == b'#').unwrap_or(true)
    }

    pub fn is_pursuer_only_wall(&self, cell: Vec2) -> bool {
        self.tile_at(cell).map(|c| c == b'=').unwrap_or(false)
    }

    pub fn blocks_player(&self, cell: Vec2) -> bool {
        self.is_wall(cell) || self.is_pursuer_only_wall(cell)
    }

    pub fn blocks_ghost(&self, cell: Vec2) -> bool {
        self.is_wall(cell)
    }

    pub fn pickup_at(&self, cell: Vec2) -> Option<PickupKind> {
        self.pickups.get(&(cell.x, cell.y)).copied()
    }

    pub fn consume_pickup(&mut self, cell: Vec2) -> Option<PickupKind> {
        self.pickups.remove(&(cell.x, cell.y))
    }

    pub fn pickups_remaining(&self) -> usize {
        self.pickups.len()
    }

    pub fn teleport_exit(&self, cell: Vec2) -> Option<Vec2> {
        self.teleporters.iter().find_map(|(a, b)| {
            if *a == cell {
                Some(*b)
            } else if *b == cell {
                Some(*a)
            } else {
                None
            }
        })
    }

    /// World-space rectangle covering every cell, as (min, max) corners.
    pub fn bounds(&self) -> (WorldPos, WorldPos) {
        (
            WorldPos::new(-0.5, -0.5),
            WorldPos::new(self.width as f32 - 0.5, self.height as f32 - 0.5),
        )
    }

    pub fn bounds_center(&self) -> WorldPos {
        let (min, max) = self.bounds();
        WorldPos::new((min.x + max.x) * 0.5, (min.y + max.y) * 0.5)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashSet, VecDeque};

    use crate::constants::DEAD_GHOST_HOME;

    use super::*;

    fn reachable_by_player(world: &MazeWorld) -> HashSet<Vec2> {
        let mut out = HashSet::new();
        let mut queue = VecDeque::new();
        out.insert(world.player_spawn);
        queue.push_back(world.player_spawn);

        while let Some(cell) = queue.pop_front() {
            let mut next: Vec<Vec2> = [
                Vec2::new(cell.x - 1, cell.y),
                Vec2::new(cell.x + 1, cell.y),
                Vec2::new(cell.x, cell.y - 1),
                Vec2::new(cell.x, cell.y + 1),
            ]
            .to_vec();
            if let Some(exit) = world.teleport_exit(cell) {
                next.push(exit);
            }
            for neighbor in next {
                if world.blocks_player(neighbor) {
                    continue;
                }
                if out.insert(neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
        out
    }

    #[test]
    fn default_layout_parses_with_spawns_and_teleporters() {
        let world = default_world().expect("default layout");
        assert_eq!(world.width, 28);
        assert_eq!(world.height, 24);
        assert_eq!(world.player_spawn, Vec2::new(13, 18));
        assert_eq!(world.ghost_spawns[0], Vec2::new(12, 11));
        assert_eq!(world.ghost_spawns[3], Vec2::new(15, 11));
        assert_eq!(
            world.teleporters,
            vec![(Vec2::new(0, 11), Vec2::new(27, 11))]
        );
    }

    #[test]
    fn dead_ghost_home_sits_inside_the_ghost_house() {
        let world = default_world().expect("default layout");
        let home = Vec2::new(DEAD_GHOST_HOME.0 as i32, DEAD_GHOST_HOME.1 as i32);
        assert!(!world.is_wall(home));
        assert!(!reachable_by_player(&world).contains(&home));
    }

    #[test]
    fn every_pickup_is_reachable_by_the_player() {
        let world = default_world().expect("default layout");
        let reachable = reachable_by_player(&world);
        for (x, y) in world.pickups.keys() {
            assert!(reachable.contains(&Vec2::new(*x, *y)), "pickup at {x},{y}");
        }
        assert_eq!(
            world
                .pickups
                .values()
                .filter(|kind| **kind == PickupKind::PowerPellet)
                .count(),
            4
        );
    }

    #[test]
    fn pursuer_only_wall_blocks_player_but_not_ghosts() {
        let world = default_world().expect("default layout");
        let door = Vec2::new(13, 9);
        assert!(world.blocks_player(door));
        assert!(!world.blocks_ghost(door));
        assert!(world.blocks_ghost(Vec2::new(-1, 11)));
    }

    #[test]
    fn consuming_a_pickup_removes_it_once() {
        let mut world = default_world().expect("default layout");
        let cell = Vec2::new(1, 1);
        let before = world.pickups_remaining();
        assert_eq!(world.consume_pickup(cell), Some(PickupKind::Pellet));
        assert_eq!(world.consume_pickup(cell), None);
        assert_eq!(world.pickups_remaining(), before - 1);
    }

    #[test]
    fn position_rounds_to_nearest_cell() {
        let world = default_world().expect("default layout");
        assert_eq!(
            world.cell_for_position(WorldPos::new(3.4, 4.6)),
            Vec2::new(3, 5)
        );
        assert_eq!(
            world.center_of_cell(Vec2::new(3, 5)),
            WorldPos::new(3.0, 5.0)
        );
        assert_eq!(world.bounds_center(), WorldPos::new(13.5, 11.5));
    }

    #[test]
    fn malformed_layouts_are_rejected() {
        assert_eq!(parse_maze(&[]).unwrap_err(), MazeError::Empty);
        assert_eq!(
            parse_maze(&["#P0123", "#"]).unwrap_err(),
            MazeError::RaggedRow {
                row: 1,
                expected: 6,
                found: 1
            }
        );
        assert_eq!(
            parse_maze(&["#0123#"]).unwrap_err(),
            MazeError::MissingPlayerSpawn
        );
        assert_eq!(
            parse_maze(&["#P012#"]).unwrap_err(),
            MazeError::MissingGhostSpawn(3)
        );
        assert_eq!(
            parse_maze(&["TP0123"]).unwrap_err(),
            MazeError::UnpairedTeleporter { x: 0, y: 0 }
        );
        assert_eq!(
            parse_maze(&["P0123x"]).unwrap_err(),
            MazeError::UnknownTile {
                tile: 'x',
                x: 5,
                y: 0
            }
        );
    }
}
