use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use lost_found_desk::catalog::Catalog;
use lost_found_desk::config::{SessionConfig, SessionOptions};
use lost_found_desk::constants::{TICK_DT, TICK_MS};
use lost_found_desk::engine::DeskEngine;
use lost_found_desk::server_protocol::{parse_client_message, ParsedClientMessage};
use lost_found_desk::server_utils::{
    normalize_seed, normalize_shift_secs, normalize_starting_balance, parse_port,
};
use lost_found_desk::types::Difficulty;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use tower_http::services::{ServeDir, ServeFile};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

const DEFAULT_PORT: u16 = 8080;

type SharedState = Arc<Mutex<ServerState>>;

#[derive(Clone)]
struct ClientContext {
    tx: mpsc::Sender<OutboundMessage>,
}

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

/// Balance and day number handed from one shift to the next.
#[derive(Clone, Copy, Debug)]
struct CarryOver {
    balance: i64,
    day: u32,
}

/// One desk, driven by a single controlling client. Later connections only
/// watch the snapshots until control is handed to them.
struct ServerState {
    clients: HashMap<String, ClientContext>,
    controller: Option<String>,
    base_config: SessionConfig,
    catalog: Arc<Catalog>,
    desk: Option<DeskEngine>,
    carry: CarryOver,
}

impl ServerState {
    fn new(base_config: SessionConfig, catalog: Arc<Catalog>) -> Self {
        Self {
            clients: HashMap::new(),
            controller: None,
            base_config,
            catalog,
            desk: None,
            carry: CarryOver { balance: 0, day: 1 },
        }
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = parse_port(std::env::var("PORT").ok().as_deref(), DEFAULT_PORT);
    let base_config = match std::env::var("DESK_CONFIG") {
        Ok(path) => SessionConfig::load(&PathBuf::from(&path)).map_err(|error| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("config {path}: {error}"),
            )
        })?,
        Err(_) => SessionConfig::default(),
    };

    let state = Arc::new(Mutex::new(ServerState::new(
        base_config,
        Arc::new(Catalog::builtin()),
    )));
    start_tick_loop(state.clone());

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/ws", get(ws_handler))
        .with_state(state);

    let app = if let Some(static_dir) = resolve_static_dir() {
        let index_file = static_dir.join("index.html");
        info!(root = %static_dir.to_string_lossy(), "serving static client");
        app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)),
        )
    } else {
        warn!("static client directory not found; set STATIC_DIR to serve one");
        app
    };

    let bind_addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(port, "listening");
    axum::serve(listener, app).await
}

fn resolve_static_dir() -> Option<PathBuf> {
    if let Ok(raw) = std::env::var("STATIC_DIR") {
        let path = PathBuf::from(raw);
        if path.join("index.html").is_file() {
            return Some(path);
        }
    }
    let candidates = [PathBuf::from("dist/client"), PathBuf::from("public")];
    candidates
        .into_iter()
        .find(|path| path.join("index.html").is_file())
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: SharedState, socket: WebSocket) {
    let client_id = make_id("client");
    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(256);

    {
        let mut guard = state.lock().await;
        let controls = register_client(&mut guard, &client_id, tx.clone());
        let welcome = json!({
            "type": "welcome",
            "clientId": client_id,
            "role": if controls { "controller" } else { "spectator" },
            "running": guard.desk.is_some(),
            "day": guard.carry.day,
            "balance": guard.carry.balance,
        });
        send_to_client(&mut guard, &client_id, &welcome, QueuePolicy::DisconnectOnFull);
        info!(client_id = %client_id, controls, clients = guard.clients.len(), "client connected");
    }

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
                handle_client_message(state.clone(), &client_id, raw.to_string()).await;
            }
            Message::Binary(raw) => {
                if let Ok(text) = String::from_utf8(raw.to_vec()) {
                    handle_client_message(state.clone(), &client_id, text).await;
                } else {
                    send_error_to_client(&state, &client_id, "invalid utf8 message").await;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    {
        let mut guard = state.lock().await;
        unregister_client(&mut guard, &client_id);
        info!(client_id = %client_id, clients = guard.clients.len(), "client disconnected");
    }
    drop(tx);
    let _ = writer.await;
}

async fn handle_client_message(state: SharedState, client_id: &str, raw: String) {
    let Some(message) = parse_client_message(&raw) else {
        send_error_to_client(&state, client_id, "invalid message").await;
        return;
    };

    let mut guard = state.lock().await;
    let reply = handle_parsed_message(&mut guard, client_id, message);
    send_to_client(&mut guard, client_id, &reply, QueuePolicy::DisconnectOnFull);
}

/// The first client to connect controls the desk.
fn register_client(
    state: &mut ServerState,
    client_id: &str,
    tx: mpsc::Sender<OutboundMessage>,
) -> bool {
    state
        .clients
        .insert(client_id.to_string(), ClientContext { tx });
    if state.controller.is_none() {
        state.controller = Some(client_id.to_string());
    }
    state.controller.as_deref() == Some(client_id)
}

/// Hands control to the longest-connected spectator when the controller leaves.
fn unregister_client(state: &mut ServerState, client_id: &str) {
    state.clients.remove(client_id);
    if state.controller.as_deref() != Some(client_id) {
        return;
    }
    state.controller = state
        .clients
        .keys()
        .min_by_key(|id| client_order_key(id))
        .cloned();
    if let Some(next) = state.controller.clone() {
        info!(client_id = %next, "control handed over");
        send_to_client(
            state,
            &next,
            &json!({ "type": "role", "role": "controller" }),
            QueuePolicy::DisconnectOnFull,
        );
    }
}

fn client_order_key(client_id: &str) -> u64 {
    client_id
        .rsplit('_')
        .next()
        .and_then(|suffix| suffix.parse::<u64>().ok())
        .unwrap_or(u64::MAX)
}

fn handle_parsed_message(
    state: &mut ServerState,
    client_id: &str,
    message: ParsedClientMessage,
) -> Value {
    if let ParsedClientMessage::Ping { t } = message {
        return json!({
            "type": "pong",
            "t": t,
            "serverTimeMs": Utc::now().timestamp_millis(),
        });
    }
    if state.controller.as_deref() != Some(client_id) {
        return error_message("spectators cannot act on the desk");
    }
    match message {
        ParsedClientMessage::Start {
            difficulty,
            seed,
            shift_minutes,
            starting_balance,
        } => match start_shift(state, difficulty, seed, shift_minutes, starting_balance) {
            Ok(reply) => reply,
            Err(reason) => error_message(reason),
        },
        intent => match state.desk.as_mut() {
            Some(desk) => apply_intent(desk, intent),
            None => error_message("no shift running"),
        },
    }
}

fn start_shift(
    state: &mut ServerState,
    difficulty: Option<Difficulty>,
    seed: Option<i64>,
    shift_minutes: Option<i64>,
    starting_balance: Option<i64>,
) -> Result<Value, &'static str> {
    if state.desk.is_some() {
        return Err("shift already running");
    }
    let mut config = state.base_config.clone();
    if let Some(difficulty) = difficulty {
        config.difficulty = difficulty;
    }
    let options = SessionOptions {
        seed: normalize_seed(seed).unwrap_or_else(rand::random::<u32>),
        starting_balance: normalize_starting_balance(starting_balance, state.carry.balance),
        day: state.carry.day,
        shift_duration_override: Some(normalize_shift_secs(shift_minutes)),
    };
    info!(
        seed = options.seed,
        day = options.day,
        starting_balance = options.starting_balance,
        difficulty = ?config.difficulty,
        "starting shift"
    );
    let desk = DeskEngine::new(config, Arc::clone(&state.catalog), options);
    let reply = json!({
        "type": "shift_started",
        "day": state.carry.day,
        "difficulty": desk.config.difficulty,
        "timeLeftSecs": desk.time_left_secs(),
    });
    state.desk = Some(desk);
    Ok(reply)
}

fn apply_intent(desk: &mut DeskEngine, intent: ParsedClientMessage) -> Value {
    match intent {
        ParsedClientMessage::PickUp { point } => outcome_message("pick_up", &desk.pick_up(point)),
        ParsedClientMessage::Drag { point } => {
            outcome_message("drag", &json!({ "moved": desk.drag_held(point) }))
        }
        ParsedClientMessage::Release { point } => outcome_message("release", &desk.release(point)),
        ParsedClientMessage::Deliver { point } => outcome_message("deliver", &desk.deliver(point)),
        ParsedClientMessage::Reject { slot } => outcome_message("reject", &desk.reject(slot)),
        ParsedClientMessage::Rotate { delta } => {
            outcome_message("rotate", &json!({ "rotated": desk.rotate_held(delta) }))
        }
        ParsedClientMessage::Spray => outcome_message("spray", &desk.fire_spray()),
        ParsedClientMessage::CallPolice => outcome_message("call_police", &desk.call_police()),
        ParsedClientMessage::Search { keywords } => json!({
            "type": "search_result",
            "keywords": keywords,
            "hits": desk.search_surface(&keywords),
        }),
        ParsedClientMessage::Start { .. } | ParsedClientMessage::Ping { .. } => {
            error_message("unexpected message")
        }
    }
}

fn outcome_message<T: Serialize>(action: &str, outcome: &T) -> Value {
    json!({
        "type": "result",
        "action": action,
        "result": outcome,
    })
}

fn error_message(message: &str) -> Value {
    json!({
        "type": "error",
        "message": message,
    })
}

fn start_tick_loop(state: SharedState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(TICK_MS));
        loop {
            interval.tick().await;
            let mut guard = state.lock().await;
            tick_desk(&mut guard);
        }
    });
}

fn tick_desk(state: &mut ServerState) {
    let (snapshot, summary) = {
        let Some(desk) = state.desk.as_mut() else {
            return;
        };
        desk.step(TICK_DT);
        let snapshot = desk.build_snapshot(true);
        let summary = desk.is_ended().then(|| desk.build_summary());
        (snapshot, summary)
    };

    broadcast(
        state,
        &json!({
            "type": "state",
            "snapshot": snapshot,
        }),
        QueuePolicy::DropOnFull,
    );

    if let Some(summary) = summary {
        info!(
            day = summary.day,
            balance = summary.balance,
            earned = summary.earned,
            "shift over"
        );
        state.carry = CarryOver {
            balance: summary.balance,
            day: summary.day + 1,
        };
        state.desk = None;
        broadcast(
            state,
            &json!({
                "type": "shift_over",
                "summary": summary,
            }),
            QueuePolicy::DisconnectOnFull,
        );
    }
}

fn send_to_client(state: &mut ServerState, client_id: &str, message: &Value, policy: QueuePolicy) {
    let send_failed = if let Some(client) = state.clients.get(client_id) {
        client
            .tx
            .try_send(OutboundMessage::Text(message.to_string()))
            .is_err()
    } else {
        false
    };
    if send_failed && policy == QueuePolicy::DisconnectOnFull {
        disconnect_client(state, client_id);
    }
}

fn broadcast(state: &mut ServerState, message: &Value, policy: QueuePolicy) {
    let payload = message.to_string();
    let mut failed_clients = Vec::new();
    for (client_id, client) in &state.clients {
        if client
            .tx
            .try_send(OutboundMessage::Text(payload.clone()))
            .is_err()
            && policy == QueuePolicy::DisconnectOnFull
        {
            failed_clients.push(client_id.clone());
        }
    }
    for client_id in failed_clients {
        disconnect_client(state, &client_id);
    }
}

fn disconnect_client(state: &mut ServerState, client_id: &str) {
    let Some(client) = state.clients.get(client_id).cloned() else {
        return;
    };
    warn!(client_id, "dropping slow client");
    let _ = client.tx.try_send(OutboundMessage::Close {
        code: 1008,
        reason: "send queue overflow".to_string(),
    });
    unregister_client(state, client_id);
}

async fn send_error_to_client(state: &SharedState, client_id: &str, message: &str) {
    let mut guard = state.lock().await;
    send_to_client(
        &mut guard,
        client_id,
        &error_message(message),
        QueuePolicy::DisconnectOnFull,
    );
}

fn make_id(prefix: &str) -> String {
    let seq = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{seq}")
}
