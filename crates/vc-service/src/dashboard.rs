//! Read-only dashboard API.
//!
//! - `GET /api/status` - controller counters
//! - `GET /api/sessions` - active sessions with live presence totals
//! - `GET /api/sessions/:room_id` - one session, by anchor or team room
//! - `GET /api/guilds/:guild_id/history?limit=N` - archived sessions, newest first
//!
//! Nothing here mutates state; every read goes through the lifecycle actor
//! so responses are consistent with event processing.

use crate::actors::{ControllerStatus, LifecycleControllerHandle};
use crate::errors::LifecycleError;
use crate::history::{HistoryError, SqliteHistoryArchive, StoredSession, DEFAULT_HISTORY_LIMIT};
use crate::session::SessionSnapshot;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use common::types::{GuildId, RoomId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;

/// Shared state for dashboard handlers.
#[derive(Clone)]
pub struct DashboardState {
    pub controller: LifecycleControllerHandle,
    pub history: SqliteHistoryArchive,
}

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    History(#[from] HistoryError),
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            DashboardError::Lifecycle(err) => {
                let status = StatusCode::from_u16(err.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                if status.is_server_error() {
                    tracing::error!(
                        target: "vc.dashboard",
                        error = %err,
                        "Controller request failed"
                    );
                }
                let code = match status {
                    StatusCode::NOT_FOUND => "NOT_FOUND",
                    StatusCode::FORBIDDEN => "FORBIDDEN",
                    StatusCode::BAD_REQUEST => "BAD_REQUEST",
                    _ => "INTERNAL_ERROR",
                };
                (status, code, err.client_message())
            }
            DashboardError::History(err) => {
                tracing::error!(target: "vc.dashboard", error = %err, "History query failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "An internal database error occurred".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
}

/// Build the dashboard router.
pub fn dashboard_router(state: Arc<DashboardState>) -> Router {
    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/sessions", get(list_sessions))
        .route("/api/sessions/:room_id", get(get_session))
        .route("/api/guilds/:guild_id/history", get(get_history))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn get_status(
    State(state): State<Arc<DashboardState>>,
) -> Result<Json<ControllerStatus>, DashboardError> {
    Ok(Json(state.controller.get_status().await?))
}

async fn list_sessions(
    State(state): State<Arc<DashboardState>>,
) -> Result<Json<Vec<SessionSnapshot>>, DashboardError> {
    Ok(Json(state.controller.list_sessions(Utc::now()).await?))
}

async fn get_session(
    State(state): State<Arc<DashboardState>>,
    Path(room_id): Path<u64>,
) -> Result<Json<SessionSnapshot>, DashboardError> {
    let snapshot = state
        .controller
        .get_session(RoomId(room_id), Utc::now())
        .await?;
    Ok(Json(snapshot))
}

async fn get_history(
    State(state): State<Arc<DashboardState>>,
    Path(guild_id): Path<u64>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<StoredSession>>, DashboardError> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let sessions = state
        .history
        .recent_sessions(GuildId(guild_id), limit)
        .await?;
    Ok(Json(sessions))
}
