//! Liveness endpoints
//!
//! GET /health    - unauthenticated liveness probe
//! GET /heartbeat - authenticated liveness call; token covers `{"status_code":200}`

use axum::{Json, extract::State, http::HeaderMap, response::IntoResponse};
use courier_kernel::LivenessPayload;
use serde_json::json;
use std::sync::Arc;
use tracing::info_span;
use uuid::Uuid;

use crate::error::{GatewayError, GatewayResult};
use crate::filter::{AuthOutcome, RequestPayload};
use crate::state::AppState;

/// GET /health - liveness probe
///
/// Always returns 200 OK while the process is alive.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": state.service_name }))
}

/// GET /heartbeat - authenticated liveness call
pub async fn heartbeat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> GatewayResult<Json<LivenessPayload>> {
    let request_id = Uuid::new_v4();
    let _span = info_span!("heartbeat", request_id = %request_id).entered();
    match state
        .authenticator
        .authenticate(&headers, &RequestPayload::Liveness)
    {
        AuthOutcome::Authenticated => Ok(Json(LivenessPayload::default())),
        AuthOutcome::Rejected(reason) => Err(GatewayError::Authentication(reason)),
    }
}

/// Build the health router sub-tree
pub fn health_router() -> axum::Router<Arc<AppState>> {
    use axum::routing::get;
    axum::Router::new()
        .route("/health", get(health))
        .route("/heartbeat", get(heartbeat))
}
