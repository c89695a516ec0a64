//! Inbound message endpoint
//!
//! POST /msg - authenticate, validate, then decline or forward

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use courier_kernel::InboundMessage;
use serde_json::json;
use std::sync::Arc;
use tracing::{Instrument, info_span, warn};
use uuid::Uuid;

use crate::error::{GatewayError, GatewayResult};
use crate::router::RouteOutcome;
use crate::state::AppState;

/// POST /msg
///
/// Answers the decline reply for bots and non-private chats, and
/// `{"message":"OK"}` once a message has been handed to the dialog service.
pub async fn receive_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> GatewayResult<Response> {
    let request_id = Uuid::new_v4();
    let span = info_span!("msg", request_id = %request_id);
    handle(state, headers, body).instrument(span).await
}

async fn handle(state: Arc<AppState>, headers: HeaderMap, body: Bytes) -> GatewayResult<Response> {
    let value = state
        .authenticator
        .authenticate_json(&headers, &body)
        .map_err(GatewayError::Authentication)?;

    let message = InboundMessage::validate(&value).inspect_err(|errors| {
        warn!(fields = errors.len(), "message failed validation");
    })?;

    let failure = match state.router.route(&message).await? {
        RouteOutcome::Declined(reply) => return Ok(Json(reply).into_response()),
        outcome if outcome.is_delivered() => None,
        RouteOutcome::Forwarded { endpoint, status } => {
            Some(format!("{endpoint} answered with status {status}"))
        }
        RouteOutcome::ForwardFailed { error, .. } => Some(error.to_string()),
    };

    if let Some(detail) = failure.filter(|_| state.strict_forwarding) {
        return Err(GatewayError::DependencyUnavailable(detail));
    }

    Ok(Json(json!({ "message": "OK" })).into_response())
}

/// Build the message router sub-tree
pub fn msg_router() -> axum::Router<Arc<AppState>> {
    use axum::routing::post;
    axum::Router::new().route("/msg", post(receive_message))
}
