use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    #[default]
    None,
}

impl Direction {
    pub const CARDINALS: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn parse_move(value: &str) -> Option<Self> {
        match value {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    pub fn reverse(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::None => Self::None,
        }
    }
}

/// Integer grid coordinate. `y` grows downward.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: i32,
    pub y: i32,
}

impl Vec2 {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dir: Direction) -> Self {
        match dir {
            Direction::Up => Self::new(self.x, self.y - 1),
            Direction::Down => Self::new(self.x, self.y + 1),
            Direction::Left => Self::new(self.x - 1, self.y),
            Direction::Right => Self::new(self.x + 1, self.y),
            Direction::None => self,
        }
    }

    pub fn distance_sq(self, other: Vec2) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        dx * dx + dy * dy
    }
}

/// Continuous world position. One world unit equals one cell and cell
/// centres sit on integer coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldPos {
    pub x: f32,
    pub y: f32,
}

impl WorldPos {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn from_cell(cell: Vec2) -> Self {
        Self::new(cell.x as f32, cell.y as f32)
    }

    pub fn lerp(self, to: WorldPos, u: f32) -> Self {
        Self::new(self.x + (to.x - self.x) * u, self.y + (to.y - self.y) * u)
    }

    pub fn distance_sq(self, other: WorldPos) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn distance(self, other: WorldPos) -> f32 {
        self.distance_sq(other).sqrt()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostState {
    Normal,
    Scared,
    Recovering,
    Dead,
}

impl GhostState {
    pub fn is_edible(self) -> bool {
        matches!(self, Self::Scared | Self::Recovering)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostPersonality {
    Flee,
    Chase,
    Random,
    Patrol,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    Countdown,
    Playing,
    PlayerDying,
    GameOver,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbientLoop {
    Normal,
    Scared,
    Dead,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PickupKind {
    Pellet,
    PowerPellet,
}

/// Per-tick input: the held directional intent plus whether a directional
/// key went down this tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameInput {
    pub intent: Direction,
    pub any_key_edge: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerView {
    pub x: i32,
    pub y: i32,
    pub px: f32,
    pub py: f32,
    pub dir: Direction,
    pub facing: Direction,
    pub moving: bool,
    #[serde(rename = "inputEnabled")]
    pub input_enabled: bool,
    pub dying: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct GhostView {
    pub index: usize,
    pub x: i32,
    pub y: i32,
    pub px: f32,
    pub py: f32,
    pub dir: Direction,
    pub state: GhostState,
    pub personality: GhostPersonality,
    #[serde(rename = "respawnLeftMs")]
    pub respawn_left_ms: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct CherryView {
    pub px: f32,
    pub py: f32,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    CountdownStep {
        text: String,
    },
    CountdownHidden,
    RoundStarted,
    ScoreChanged {
        score: u32,
    },
    LivesChanged {
        lives: u32,
    },
    PelletEaten {
        x: i32,
        y: i32,
        kind: PickupKind,
    },
    WallBump {
        x: i32,
        y: i32,
    },
    Teleported {
        x: i32,
        y: i32,
    },
    GhostScaredStart {
        #[serde(rename = "durationMs")]
        duration_ms: u64,
    },
    GhostRecovering,
    GhostNormal,
    GhostVisual {
        index: usize,
        state: GhostState,
    },
    GhostEaten {
        index: usize,
    },
    GhostRespawned {
        index: usize,
        state: GhostState,
    },
    AmbientLoop {
        #[serde(rename = "loop")]
        kind: AmbientLoop,
    },
    ScaredTimerShown {
        #[serde(rename = "durationMs")]
        duration_ms: u64,
    },
    ScaredTimerHidden,
    GhostAnimationFrozen {
        frozen: bool,
    },
    PlayerDeath,
    PlayerRespawned,
    AwaitingInput,
    RoundResumed,
    CherrySpawned,
    CherryTaken,
    CherryLeft,
    GameOver,
    HighScoreSaved {
        #[serde(rename = "levelId")]
        level_id: u32,
        score: u32,
        #[serde(rename = "timeSec")]
        time_sec: f32,
    },
    SceneReset,
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    #[serde(rename = "nowMs")]
    pub now_ms: u64,
    pub phase: RoundPhase,
    pub score: u32,
    pub lives: u32,
    #[serde(rename = "gameTimeMs")]
    pub game_time_ms: u64,
    #[serde(rename = "scaredLeftMs")]
    pub scared_left_ms: u64,
    #[serde(rename = "deadCount")]
    pub dead_count: usize,
    #[serde(rename = "ghostsEnabled")]
    pub ghosts_enabled: bool,
    #[serde(rename = "ghostAnimationFrozen")]
    pub ghost_animation_frozen: bool,
    #[serde(rename = "pelletsLeft")]
    pub pellets_left: usize,
    pub player: PlayerView,
    pub ghosts: Vec<GhostView>,
    pub cherry: Option<CherryView>,
    pub events: Vec<RuntimeEvent>,
}
