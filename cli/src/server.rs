//! The alert feed the dashboard consumes: pull endpoints with severity and
//! acknowledgement filters, acknowledge/clear actions, the baseline
//! control surface, and a WebSocket push channel.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use toolwatch_core::alerts::{AlertBroadcaster, AlertStore};
use toolwatch_core::baseline::{BaselineConfigPatch, BaselineLearner, WhitelistKind};
use toolwatch_core::scorer::RiskLevel;

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<RwLock<AlertStore>>,
    pub learner: Arc<RwLock<BaselineLearner>>,
    pub broadcaster: AlertBroadcaster,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/alerts", get(list_alerts))
        .route("/api/alerts/:id/ack", post(ack_alert))
        .route("/api/alerts/ack-all", post(ack_all))
        .route("/api/alerts/clear", post(clear_alerts))
        .route("/api/risk", get(current_risk))
        .route("/api/baseline", get(baseline_status))
        .route("/api/baseline/patterns", get(baseline_patterns))
        .route("/api/baseline/whitelist", post(baseline_whitelist))
        .route("/api/baseline/config", post(baseline_config))
        .route("/api/baseline/reset", post(baseline_reset))
        .route("/ws/alerts", get(ws_alerts))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn parse_level(s: &str) -> Option<RiskLevel> {
    match s {
        "none" => Some(RiskLevel::None),
        "low" => Some(RiskLevel::Low),
        "medium" => Some(RiskLevel::Medium),
        "high" => Some(RiskLevel::High),
        "critical" => Some(RiskLevel::Critical),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct AlertsQuery {
    limit: Option<usize>,
    min_severity: Option<String>,
    include_acked: Option<bool>,
}

async fn list_alerts(
    State(state): State<ApiState>,
    Query(query): Query<AlertsQuery>,
) -> Response {
    let min_severity = match query.min_severity.as_deref() {
        Some(s) => match parse_level(s) {
            Some(level) => Some(level),
            None => {
                return (StatusCode::BAD_REQUEST, Json(json!({ "error": "unknown severity" })))
                    .into_response()
            }
        },
        None => None,
    };

    let store = state.store.read().await;
    let alerts = store.filtered(
        min_severity,
        query.include_acked.unwrap_or(true),
        query.limit.unwrap_or(50),
    );
    Json(alerts).into_response()
}

async fn ack_alert(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    let mut store = state.store.write().await;
    match store.acknowledge(&id) {
        Some(alert) => Json(alert).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "error": "unknown alert id" }))).into_response(),
    }
}

async fn ack_all(State(state): State<ApiState>) -> Json<serde_json::Value> {
    let acknowledged = state.store.write().await.acknowledge_all();
    Json(json!({ "acknowledged": acknowledged }))
}

async fn clear_alerts(State(state): State<ApiState>) -> Json<serde_json::Value> {
    let cleared = state.store.write().await.clear();
    Json(json!({ "cleared": cleared }))
}

async fn current_risk(State(state): State<ApiState>) -> Json<serde_json::Value> {
    let store = state.store.read().await;
    Json(json!({
        "level": store.current_level(),
        "alerts": store.len(),
    }))
}

async fn baseline_status(State(state): State<ApiState>) -> Response {
    let learner = state.learner.read().await;
    Json(learner.status()).into_response()
}

#[derive(Debug, Deserialize)]
struct PatternsQuery {
    limit: Option<usize>,
}

async fn baseline_patterns(
    State(state): State<ApiState>,
    Query(query): Query<PatternsQuery>,
) -> Response {
    let learner = state.learner.read().await;
    Json(learner.top_patterns(query.limit.unwrap_or(10))).into_response()
}

#[derive(Debug, Deserialize)]
struct WhitelistBody {
    kind: WhitelistKind,
    value: String,
}

async fn baseline_whitelist(
    State(state): State<ApiState>,
    Json(body): Json<WhitelistBody>,
) -> Json<serde_json::Value> {
    let mut learner = state.learner.write().await;
    learner.whitelist(body.kind, body.value);
    Json(json!({ "ok": true }))
}

async fn baseline_config(
    State(state): State<ApiState>,
    Json(patch): Json<BaselineConfigPatch>,
) -> Response {
    let mut learner = state.learner.write().await;
    learner.update_config(&patch);
    Json(learner.status()).into_response()
}

async fn baseline_reset(State(state): State<ApiState>) -> Json<serde_json::Value> {
    state.learner.write().await.reset();
    Json(json!({ "ok": true }))
}

async fn ws_alerts(ws: WebSocketUpgrade, State(state): State<ApiState>) -> Response {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Push channel. On connect the subscriber gets a snapshot of the current
/// aggregate risk level; after that, each new alert as it is stored. A
/// lagging subscriber is resynced with a fresh snapshot rather than
/// replayed history.
async fn handle_ws(mut socket: WebSocket, state: ApiState) {
    let mut rx = state.broadcaster.subscribe();

    if send_snapshot(&mut socket, &state).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Ok(alert) => {
                    let msg = json!({ "type": "alert", "alert": alert });
                    if socket.send(Message::Text(msg.to_string())).await.is_err() {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {
                    if send_snapshot(&mut socket, &state).await.is_err() {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                // Client messages are ignored; closing ends the session.
                Some(Ok(_)) => {}
                _ => break,
            },
        }
    }
}

async fn send_snapshot(socket: &mut WebSocket, state: &ApiState) -> Result<(), axum::Error> {
    let snapshot = {
        let store = state.store.read().await;
        json!({
            "type": "snapshot",
            "risk_level": store.current_level(),
            "alerts": store.recent(20),
        })
    };
    socket.send(Message::Text(snapshot.to_string())).await
}
