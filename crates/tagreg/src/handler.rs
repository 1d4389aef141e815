//! HTTP routes: the Coordinator's JSON surface.
//!
//! Each request is handled on its own Tokio task by axum. Handlers never
//! hold the registry lock across anything but the single Coordinator call,
//! so a slow client can't stall other sessions.
//!
//! | Route | Handler |
//! |---|---|
//! | `POST /api/registration/sessions` | [`start_session`] |
//! | `GET /api/registration/sessions/:id` | [`session_status`] |
//! | `POST /api/registration/sessions/:id/cancel` | [`cancel_session`] |
//! | `POST /api/registration/sessions/:id/scan` | [`report_scan`] |
//! | `GET /api/health` | [`health`] |

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use tagreg_protocol::{
    Codec, HealthResponse, JsonCodec, ScanAck, ScanReport, SessionId, StartResponse,
    StatusResponse,
};
use tagreg_session::Coordinator;

use crate::TagregError;

/// Shared server state handed to every handler.
pub(crate) struct ServerState {
    pub(crate) coordinator: Arc<Coordinator>,
    pub(crate) codec: JsonCodec,
}

type SharedState = Arc<ServerState>;

/// Builds the router with all routes bound to `state`.
pub(crate) fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/registration/sessions", post(start_session))
        .route("/api/registration/sessions/:id", get(session_status))
        .route("/api/registration/sessions/:id/cancel", post(cancel_session))
        .route("/api/registration/sessions/:id/scan", post(report_scan))
        .with_state(state)
}

/// `POST /api/registration/sessions`
async fn start_session(State(state): State<SharedState>) -> Json<StartResponse> {
    let session_id = state.coordinator.start().await;
    let timeout_secs = state.coordinator.config().timeout_secs;
    Json(StartResponse::new(session_id, timeout_secs))
}

/// `GET /api/registration/sessions/:id`
async fn session_status(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, TagregError> {
    let session_id: SessionId = id.parse()?;
    let status = state.coordinator.get_status(&session_id).await?;
    Ok(Json(StatusResponse::from(&status)))
}

/// `POST /api/registration/sessions/:id/cancel`
///
/// Answers with the post-cancel status, which is the existing terminal
/// status if the session had already ended.
async fn cancel_session(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, TagregError> {
    let session_id: SessionId = id.parse()?;
    let status = state.coordinator.cancel(&session_id).await?;
    Ok(Json(StatusResponse::from(&status)))
}

/// `POST /api/registration/sessions/:id/scan`
///
/// The device side. A scan for a session that isn't pending (or doesn't
/// exist) is a benign race, so it still gets `202` with
/// `accepted: false` rather than an error status.
async fn report_scan(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<ScanAck>), TagregError> {
    let session_id: SessionId = id.parse()?;
    let report: ScanReport = state.codec.decode_checked(&body)?;

    let outcome = state.coordinator.report_scan(&session_id, report.tag).await;

    Ok((
        StatusCode::ACCEPTED,
        Json(ScanAck {
            accepted: outcome.is_accepted(),
        }),
    ))
}

/// `GET /api/health`
async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        sessions: state.coordinator.len().await,
    })
}
