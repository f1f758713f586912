use clap::Parser;
use maze_chase_server::config::GameConfig;
use maze_chase_server::constants::{MAX_LIVES, TICK_MS};
use maze_chase_server::engine::GameEngine;
use maze_chase_server::rng::Rng;
use maze_chase_server::types::{
    Direction, FrameInput, GhostState, PickupKind, RoundPhase, RuntimeEvent, Snapshot, Vec2,
};
use maze_chase_server::world::{default_world, MazeWorld};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const INPUT_DIRECTIONS: [Direction; 4] = [
    Direction::Up,
    Direction::Down,
    Direction::Left,
    Direction::Right,
];

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long)]
    seed: Option<u64>,
    /// Number of rounds to play, each with its own seed.
    #[arg(long, default_value_t = 3)]
    rounds: u32,
    /// Simulated seconds before a round is cut off.
    #[arg(long, default_value_t = 600)]
    max_seconds: u64,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    match_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct Scenario {
    name: String,
    seed: u32,
    #[serde(rename = "maxSeconds")]
    max_seconds: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum RoundEnd {
    GameOver,
    TimeCap,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    seed: u32,
    end: RoundEnd,
    #[serde(rename = "gameTimeMs")]
    game_time_ms: u64,
    score: u32,
    #[serde(rename = "livesLeft")]
    lives_left: u32,
    #[serde(rename = "pelletsEaten")]
    pellets_eaten: u32,
    #[serde(rename = "powerPellets")]
    power_pellets: u32,
    #[serde(rename = "ghostsEaten")]
    ghosts_eaten: u32,
    deaths: u32,
    cherries: u32,
    teleports: u32,
    #[serde(rename = "wallBumps")]
    wall_bumps: u32,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug)]
struct ScenarioRunResult {
    result: ScenarioResultLine,
    anomaly_records: Vec<AnomalyRecord>,
    finished_tick: u64,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "matchId")]
    match_id: String,
    #[serde(rename = "startedAtMs")]
    started_at_ms: u64,
    #[serde(rename = "finishedAtMs")]
    finished_at_ms: u64,
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageScore")]
    average_score: u32,
    #[serde(rename = "endCounts")]
    end_counts: BTreeMap<String, usize>,
    scenarios: Vec<ScenarioResultLine>,
}

/// Tracks per-round counters and the anomaly log while a round runs.
struct RoundTracker {
    pellets_eaten: u32,
    power_pellets: u32,
    ghosts_eaten: u32,
    deaths: u32,
    cherries: u32,
    teleports: u32,
    wall_bumps: u32,
    anomalies: Vec<String>,
    anomaly_records: Vec<AnomalyRecord>,
    anomaly_seen: HashSet<String>,
    last_pellets_left: Option<usize>,
}

impl RoundTracker {
    fn new() -> Self {
        Self {
            pellets_eaten: 0,
            power_pellets: 0,
            ghosts_eaten: 0,
            deaths: 0,
            cherries: 0,
            teleports: 0,
            wall_bumps: 0,
            anomalies: Vec::new(),
            anomaly_records: Vec::new(),
            anomaly_seen: HashSet::new(),
            last_pellets_left: None,
        }
    }

    fn count_events(&mut self, events: &[RuntimeEvent]) {
        for event in events {
            match event {
                RuntimeEvent::PelletEaten { kind, .. } => {
                    self.pellets_eaten += 1;
                    if *kind == PickupKind::PowerPellet {
                        self.power_pellets += 1;
                    }
                }
                RuntimeEvent::GhostEaten { .. } => self.ghosts_eaten += 1,
                RuntimeEvent::PlayerDeath => self.deaths += 1,
                RuntimeEvent::CherryTaken => self.cherries += 1,
                RuntimeEvent::Teleported { .. } => self.teleports += 1,
                RuntimeEvent::WallBump { .. } => self.wall_bumps += 1,
                _ => {}
            }
        }
    }

    fn push_anomaly(&mut self, tick: u64, message: String) {
        push_anomaly(
            &mut self.anomalies,
            &mut self.anomaly_records,
            &mut self.anomaly_seen,
            tick,
            message,
        );
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match cli.config.as_deref() {
        Some(path) => match GameConfig::from_file(path) {
            Ok(config) => config,
            Err(error) => {
                error!(%error, "failed to load game config");
                std::process::exit(2);
            }
        },
        None => GameConfig::default(),
    };
    let world = match default_world() {
        Ok(world) => world,
        Err(error) => {
            error!(%error, "built-in maze is invalid");
            std::process::exit(2);
        }
    };

    let scenarios = resolve_scenarios(&cli);
    let run_started_at_ms = now_ms();
    let seed_hint = scenarios.first().map(|scenario| scenario.seed).unwrap_or(0);
    let match_id = cli
        .match_id
        .clone()
        .unwrap_or_else(|| default_match_id(seed_hint, run_started_at_ms));
    let mut has_anomaly = false;
    let mut scenario_results = Vec::new();
    let mut end_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_anomalies = 0usize;

    for scenario in scenarios {
        info!(
            match_id = %match_id,
            scenario = %scenario.name,
            seed = scenario.seed,
            max_seconds = scenario.max_seconds,
            "scenario started"
        );
        let scenario_run = run_scenario(&scenario, &config, &world);

        for anomaly in &scenario_run.anomaly_records {
            warn!(
                match_id = %match_id,
                scenario = %scenario.name,
                tick = anomaly.tick,
                detail = %anomaly.message,
                "anomaly detected"
            );
        }

        if !scenario_run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += scenario_run.anomaly_records.len();
        *end_counts
            .entry(round_end_key(scenario_run.result.end))
            .or_insert(0) += 1;

        info!(
            match_id = %match_id,
            scenario = %scenario.name,
            tick = scenario_run.finished_tick,
            end = ?scenario_run.result.end,
            score = scenario_run.result.score,
            anomaly_count = scenario_run.anomaly_records.len(),
            "scenario finished"
        );

        match serde_json::to_string(&scenario_run.result) {
            Ok(line) => println!("{line}"),
            Err(error) => error!(%error, "failed to encode scenario result"),
        }
        scenario_results.push(scenario_run.result);
    }

    let summary = build_run_summary(
        match_id.clone(),
        run_started_at_ms,
        now_ms(),
        scenario_results,
        end_counts,
        total_anomalies,
    );

    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            error!(
                match_id = %match_id,
                path = %path.display(),
                %error,
                "summary write failed"
            );
            std::process::exit(2);
        }
    }

    info!(
        match_id = %match_id,
        scenario_count = summary.scenario_count,
        anomaly_count = summary.anomaly_count,
        average_score = summary.average_score,
        "run finished"
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn run_scenario(scenario: &Scenario, config: &GameConfig, world: &MazeWorld) -> ScenarioRunResult {
    let mut engine = GameEngine::new(config.clone(), world.clone(), scenario.seed, None);
    let mut driver = Rng::new(scenario.seed ^ 0x9e37_79b9);
    let mut tracker = RoundTracker::new();
    let max_ticks = scenario.max_seconds.saturating_mul(1000) / TICK_MS;
    let mut last_tick = 0u64;
    let mut held = Direction::None;

    while !engine.is_ended() {
        let input = scripted_input(&mut driver, &mut held);
        engine.step(TICK_MS, &input);
        let snapshot = engine.build_snapshot(true);
        last_tick = snapshot.tick;

        tracker.count_events(&snapshot.events);
        for message in collect_snapshot_anomalies(&snapshot, &engine.config, &engine.world) {
            tracker.push_anomaly(snapshot.tick, message);
        }
        if let Some(previous) = tracker.last_pellets_left {
            if snapshot.pellets_left > previous {
                tracker.push_anomaly(
                    snapshot.tick,
                    format!("pellet count grew: {previous} -> {}", snapshot.pellets_left),
                );
            }
        }
        tracker.last_pellets_left = Some(snapshot.pellets_left);

        if snapshot.tick >= max_ticks {
            break;
        }
    }

    let end = if engine.phase() == RoundPhase::GameOver {
        RoundEnd::GameOver
    } else {
        RoundEnd::TimeCap
    };

    ScenarioRunResult {
        result: ScenarioResultLine {
            scenario: scenario.name.clone(),
            seed: scenario.seed,
            end,
            game_time_ms: engine.game_time_ms(),
            score: engine.score(),
            lives_left: engine.lives(),
            pellets_eaten: tracker.pellets_eaten,
            power_pellets: tracker.power_pellets,
            ghosts_eaten: tracker.ghosts_eaten,
            deaths: tracker.deaths,
            cherries: tracker.cherries,
            teleports: tracker.teleports,
            wall_bumps: tracker.wall_bumps,
            anomalies: tracker.anomalies,
        },
        anomaly_records: tracker.anomaly_records,
        finished_tick: last_tick,
    }
}

/// Presses a new direction now and then, like a player steering.
fn scripted_input(driver: &mut Rng, held: &mut Direction) -> FrameInput {
    if driver.next_f32() >= 0.12 {
        return FrameInput {
            intent: *held,
            any_key_edge: false,
        };
    }
    let dir = driver.pick(&INPUT_DIRECTIONS).unwrap_or(Direction::Left);
    *held = dir;
    FrameInput {
        intent: dir,
        any_key_edge: true,
    }
}

fn collect_snapshot_anomalies(
    snapshot: &Snapshot,
    config: &GameConfig,
    world: &MazeWorld,
) -> Vec<String> {
    let mut anomalies = Vec::new();

    let dead_ghosts = snapshot
        .ghosts
        .iter()
        .filter(|ghost| ghost.state == GhostState::Dead)
        .count();
    if dead_ghosts != snapshot.dead_count {
        anomalies.push(format!(
            "dead count mismatch: counter {} vs {} dead ghosts",
            snapshot.dead_count, dead_ghosts
        ));
    }

    if snapshot.scared_left_ms > config.scared_duration_ms {
        anomalies.push(format!(
            "scared timer above duration: {}",
            snapshot.scared_left_ms
        ));
    }

    if snapshot.lives > MAX_LIVES {
        anomalies.push(format!("lives out of range: {}", snapshot.lives));
    }
    if snapshot.phase == RoundPhase::GameOver && snapshot.lives != 0 {
        anomalies.push(format!("game over with {} lives left", snapshot.lives));
    }

    for ghost in &snapshot.ghosts {
        match ghost.state {
            GhostState::Dead => continue,
            GhostState::Normal if snapshot.scared_left_ms > 0 => {
                anomalies.push(format!("ghost {} normal while scared timer runs", ghost.index));
            }
            GhostState::Scared | GhostState::Recovering if snapshot.scared_left_ms == 0 => {
                anomalies.push(format!(
                    "ghost {} still {:?} after scared timer",
                    ghost.index, ghost.state
                ));
            }
            _ => {}
        }
        if world.blocks_ghost(Vec2::new(ghost.x, ghost.y)) {
            anomalies.push(format!("ghost {} inside a wall", ghost.index));
        }
    }

    if world.blocks_player(Vec2::new(snapshot.player.x, snapshot.player.y)) {
        anomalies.push("player inside a wall".to_string());
    }
    anomalies
}

fn resolve_scenarios(cli: &Cli) -> Vec<Scenario> {
    let seed = normalize_seed(cli.seed.unwrap_or_else(now_ms));
    let max_seconds = cli.max_seconds.max(1);
    (0..cli.rounds.max(1))
        .map(|round| Scenario {
            name: format!("round-{}", round + 1),
            seed: normalize_seed(seed as u64 + round as u64),
            max_seconds,
        })
        .collect()
}

fn normalize_seed(seed: u64) -> u32 {
    seed as u32
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    tick: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        tick,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn default_match_id(seed: u32, timestamp_ms: u64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn build_run_summary(
    match_id: String,
    started_at_ms: u64,
    finished_at_ms: u64,
    scenarios: Vec<ScenarioResultLine>,
    end_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
) -> RunSummary {
    let scenario_count = scenarios.len();
    let total_score: u64 = scenarios.iter().map(|line| line.score as u64).sum();
    let average_score = if scenario_count == 0 {
        0
    } else {
        (total_score / scenario_count as u64) as u32
    };
    RunSummary {
        match_id,
        started_at_ms,
        finished_at_ms,
        scenario_count,
        anomaly_count,
        average_score,
        end_counts,
        scenarios,
    }
}

fn round_end_key(end: RoundEnd) -> String {
    match end {
        RoundEnd::GameOver => "game_over",
        RoundEnd::TimeCap => "time_cap",
    }
    .to_string()
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
    std::fs::write(path, summary_text)
}
