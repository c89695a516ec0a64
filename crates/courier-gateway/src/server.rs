//! Axum-based HTTP gateway server.
//!
//! [`GatewayServer`] wires the authenticator, the message router and the
//! handlers into a running axum service.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/msg` | Authenticated inbound message; declined or forwarded. |
//! | `GET`  | `/heartbeat` | Authenticated liveness call. |
//! | `GET`  | `/health` | Liveness check, always `200 OK`. |

use crate::handlers::{health_router, msg_router};
use crate::state::AppState;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the axum [`Router`] over `state`.
pub fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health_router())
        .merge(msg_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct GatewayServer {
    state: Arc<AppState>,
}

impl GatewayServer {
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    pub fn build_app(&self) -> Router {
        build_app(self.state.clone())
    }

    /// Bind `addr` and serve until `shutdown` fires.
    pub async fn start(self, addr: &str, shutdown: CancellationToken) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already-bound listener until `shutdown` fires. In-flight
    /// requests are allowed to finish.
    pub async fn serve(self, listener: TcpListener, shutdown: CancellationToken) -> std::io::Result<()> {
        let app = self.build_app();
        info!(
            addr = %listener.local_addr()?,
            service = %self.state.service_name,
            "courier gateway listening"
        );
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;
        info!("courier gateway stopped");
        Ok(())
    }
}
