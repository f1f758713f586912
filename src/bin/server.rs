use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use maze_chase_server::config::GameConfig;
use maze_chase_server::constants::TICK_MS;
use maze_chase_server::engine::GameEngine;
use maze_chase_server::error::ConfigError;
use maze_chase_server::high_score_store::{
    FileHighScoreStore, HighScoreStore, SharedHighScoreStore,
};
use maze_chase_server::server_protocol::{
    normalize_level_id, parse_client_message, parse_level_query, ParsedClientMessage,
};
use maze_chase_server::types::{Direction, FrameInput};
use maze_chase_server::world::{default_world, MazeWorld};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);
const PERSIST_INTERVAL: Duration = Duration::from_millis(500);

type SharedState = Arc<Mutex<ServerState>>;

#[derive(Clone, Debug)]
enum OutboundMessage {
    Text(String),
    Close { code: u16, reason: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum QueuePolicy {
    DropOnFull,
    DisconnectOnFull,
}

/// One connection plays one private round.
struct Session {
    tx: mpsc::Sender<OutboundMessage>,
    level_id: u32,
    game: Option<GameEngine>,
    pending: FrameInput,
}

struct ServerState {
    sessions: HashMap<String, Session>,
    config: GameConfig,
    world: MazeWorld,
    high_scores: SharedHighScoreStore,
}

impl ServerState {
    fn new(config: GameConfig, world: MazeWorld, high_scores: SharedHighScoreStore) -> Self {
        Self {
            sessions: HashMap::new(),
            config,
            world,
            high_scores,
        }
    }
}

#[derive(Debug, Deserialize)]
struct HighScoreQuery {
    level: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let port = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let high_score_path = std::env::var("HIGH_SCORE_DB_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(".data/high-scores.json"));

    let config = match load_config() {
        Ok(config) => config,
        Err(error) => {
            error!(%error, "failed to load game config");
            std::process::exit(1);
        }
    };
    let world = match default_world() {
        Ok(world) => world,
        Err(error) => {
            error!(%error, "built-in maze is invalid");
            std::process::exit(1);
        }
    };

    let high_scores = SharedHighScoreStore::deferred(FileHighScoreStore::new(high_score_path));
    start_persist_loop(high_scores.clone());
    let state = Arc::new(Mutex::new(ServerState::new(config, world, high_scores)));
    start_tick_loop(state.clone());

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/high-scores", get(high_scores_handler))
        .route("/ws", get(ws_handler))
        .with_state(state);

    let bind_addr = format!("0.0.0.0:{port}");
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(addr = %bind_addr, error = %err, "failed to bind server socket");
            std::process::exit(1);
        }
    };

    info!(port, "listening");
    if let Err(err) = axum::serve(listener, app).await {
        error!(error = %err, "server runtime failed");
        std::process::exit(1);
    }
}

fn load_config() -> Result<GameConfig, ConfigError> {
    match std::env::var("GAME_CONFIG_PATH") {
        Ok(path) => {
            let config = GameConfig::from_file(Path::new(&path))?;
            info!(path = %path, level_id = config.level_id, "loaded game config");
            Ok(config)
        }
        Err(_) => Ok(GameConfig::default()),
    }
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn high_scores_handler(
    State(state): State<SharedState>,
    Query(query): Query<HighScoreQuery>,
) -> Response {
    let store = state.lock().await.high_scores.clone();
    match store.build_response(parse_level_query(query.level.as_deref())) {
        Ok(response) => Json(response).into_response(),
        Err(error) => {
            warn!(%error, "failed to read high scores");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "high score store unavailable" })),
            )
                .into_response()
        }
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: SharedState, socket: WebSocket) {
    let session_id = make_id("session");
    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(256);

    {
        let mut guard = state.lock().await;
        let level_id = guard.config.level_id;
        guard.sessions.insert(
            session_id.clone(),
            Session {
                tx: tx.clone(),
                level_id,
                game: None,
                pending: FrameInput::default(),
            },
        );
    }
    debug!(%session_id, "session opened");

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            let should_close = matches!(outbound, OutboundMessage::Close { .. });
            let result = match outbound {
                OutboundMessage::Text(payload) => {
                    ws_sender.send(Message::Text(payload.into())).await
                }
                OutboundMessage::Close { code, reason } => {
                    let frame = CloseFrame {
                        code,
                        reason: reason.into(),
                    };
                    ws_sender.send(Message::Close(Some(frame))).await
                }
            };
            if result.is_err() || should_close {
                break;
            }
        }
    });

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };

        match message {
            Message::Text(raw) => {
                handle_client_message(&state, &session_id, raw.as_str()).await;
            }
            Message::Binary(raw) => {
                if let Ok(text) = String::from_utf8(raw.to_vec()) {
                    handle_client_message(&state, &session_id, &text).await;
                } else {
                    send_error(&state, &session_id, "invalid utf8 message").await;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    {
        let mut guard = state.lock().await;
        guard.sessions.remove(&session_id);
    }
    debug!(%session_id, "session closed");
    drop(tx);
    let _ = writer.await;
}

async fn handle_client_message(state: &SharedState, session_id: &str, raw: &str) {
    let Some(message) = parse_client_message(raw) else {
        send_error(state, session_id, "invalid message").await;
        return;
    };

    let mut guard = state.lock().await;
    match message {
        ParsedClientMessage::Hello { level_id } => {
            let level_id = normalize_level_id(level_id, guard.config.level_id);
            if let Some(session) = guard.sessions.get_mut(session_id) {
                session.level_id = level_id;
            }
            start_round(&mut guard, session_id);
        }
        ParsedClientMessage::Input { dir } => {
            let Some(session) = guard.sessions.get_mut(session_id) else {
                return;
            };
            if session.game.is_none() {
                send_to_session(
                    &mut guard,
                    session_id,
                    &json!({
                        "type": "error",
                        "message": "send hello first",
                    }),
                    QueuePolicy::DisconnectOnFull,
                );
                return;
            }
            merge_input(&mut session.pending, dir);
        }
        ParsedClientMessage::Ping { t } => {
            send_to_session(
                &mut guard,
                session_id,
                &json!({
                    "type": "pong",
                    "t": t,
                }),
                QueuePolicy::DisconnectOnFull,
            );
        }
    }
}

/// Folds one key press into the input for the next tick. Only directional
/// keys count as an edge.
fn merge_input(pending: &mut FrameInput, dir: Option<Direction>) {
    let Some(dir) = dir.filter(|dir| *dir != Direction::None) else {
        return;
    };
    pending.intent = dir;
    pending.any_key_edge = true;
}

fn build_engine(state: &ServerState, level_id: u32) -> GameEngine {
    let mut config = state.config.clone();
    config.level_id = level_id;
    GameEngine::new(
        config,
        state.world.clone(),
        rand::random::<u32>(),
        Some(Box::new(state.high_scores.clone())),
    )
}

fn game_init_message(state: &ServerState, session_id: &str, game: &GameEngine) -> Value {
    let level_id = game.config.level_id;
    let best = state.high_scores.get_best(level_id).map(|record| {
        json!({
            "score": record.score,
            "timeSec": record.time_sec,
        })
    });
    json!({
        "type": "game_init",
        "sessionId": session_id,
        "levelId": level_id,
        "startedAtMs": game.started_at_ms,
        "maze": {
            "width": game.world.width,
            "height": game.world.height,
            "tiles": game.world.tiles,
        },
        "config": game.config,
        "best": best,
    })
}

/// Replaces the session's round with a fresh one and sends its opening
/// state, including the queued start-of-round events.
fn start_round(state: &mut ServerState, session_id: &str) {
    let Some(level_id) = state.sessions.get(session_id).map(|session| session.level_id) else {
        return;
    };
    let mut game = build_engine(state, level_id);
    let init = game_init_message(state, session_id, &game);
    let snapshot = game.build_snapshot(true);
    if let Some(session) = state.sessions.get_mut(session_id) {
        session.game = Some(game);
        session.pending = FrameInput::default();
    }
    info!(session_id, level_id, "round started");

    send_to_session(state, session_id, &init, QueuePolicy::DisconnectOnFull);
    send_to_session(
        state,
        session_id,
        &json!({
            "type": "state",
            "snapshot": snapshot,
        }),
        QueuePolicy::DisconnectOnFull,
    );
}

fn start_tick_loop(state: SharedState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(TICK_MS));
        loop {
            interval.tick().await;
            let mut guard = state.lock().await;
            tick_sessions(&mut guard);
        }
    });
}

/// Writes new bests to disk on a blocking thread so the tick loop never
/// waits on file I/O.
fn start_persist_loop(store: SharedHighScoreStore) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PERSIST_INTERVAL);
        loop {
            interval.tick().await;
            let pending = store.clone();
            match tokio::task::spawn_blocking(move || pending.flush_pending()).await {
                Ok(Ok(true)) => debug!("high scores written"),
                Ok(Ok(false)) => {}
                Ok(Err(error)) => warn!(%error, "failed to write high scores"),
                Err(error) => warn!(%error, "high score writer task failed"),
            }
        }
    });
}

fn tick_sessions(state: &mut ServerState) {
    let session_ids: Vec<String> = state.sessions.keys().cloned().collect();
    for session_id in session_ids {
        let (snapshot, ended) = {
            let Some(session) = state.sessions.get_mut(&session_id) else {
                continue;
            };
            let Some(game) = session.game.as_mut() else {
                continue;
            };
            let input = std::mem::take(&mut session.pending);
            game.step(TICK_MS, &input);
            (game.build_snapshot(true), game.is_ended())
        };

        send_to_session(
            state,
            &session_id,
            &json!({
                "type": "state",
                "snapshot": snapshot,
            }),
            QueuePolicy::DropOnFull,
        );

        if ended {
            start_round(state, &session_id);
        }
    }
}

fn send_to_session(state: &mut ServerState, session_id: &str, message: &Value, policy: QueuePolicy) {
    let send_failed = if let Some(session) = state.sessions.get(session_id) {
        session
            .tx
            .try_send(OutboundMessage::Text(message.to_string()))
            .is_err()
    } else {
        false
    };
    if send_failed && policy == QueuePolicy::DisconnectOnFull {
        disconnect_session(state, session_id);
    }
}

fn disconnect_session(state: &mut ServerState, session_id: &str) {
    let Some(session) = state.sessions.remove(session_id) else {
        return;
    };
    warn!(session_id, "outbound queue full; closing session");
    let _ = session.tx.try_send(OutboundMessage::Close {
        code: 1013,
        reason: "outbound queue full".to_string(),
    });
}

async fn send_error(state: &SharedState, session_id: &str, message: &str) {
    let mut guard = state.lock().await;
    send_to_session(
        &mut guard,
        session_id,
        &json!({
            "type": "error",
            "message": message,
        }),
        QueuePolicy::DisconnectOnFull,
    );
}

fn make_id(prefix: &str) -> String {
    let seq = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{seq}")
}
