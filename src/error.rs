use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("high score store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("high score store encoding error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("high score store lock poisoned")]
    Poisoned,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MazeError {
    #[error("maze layout has no rows")]
    Empty,
    #[error("maze row {row} has width {found}, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown maze tile {tile:?} at ({x}, {y})")]
    UnknownTile { tile: char, x: i32, y: i32 },
    #[error("maze layout has no player spawn")]
    MissingPlayerSpawn,
    #[error("maze layout is missing ghost spawn {0}")]
    MissingGhostSpawn(usize),
    #[error("maze layout has an unpaired teleporter at ({x}, {y})")]
    UnpairedTeleporter { x: i32, y: i32 },
}
