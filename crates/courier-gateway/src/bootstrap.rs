//! Startup wiring.
//!
//! Order: register → discover → start heartbeats → serve `/msg`. The HTTP
//! server only binds once the dialog service is known, so no message is ever
//! accepted without a forwarding target.

use crate::backend::HttpDialogForwarder;
use crate::discovery::{
    HeartbeatLoop, HttpRegistryTransport, RegistryClient, RegistryEndpoints, RegistryError,
    RetryPolicy,
};
use crate::filter::RequestAuthenticator;
use crate::router::{ActivationMatcher, MessageRouter};
use crate::server::GatewayServer;
use crate::state::AppState;
use anyhow::Context;
use courier_kernel::config::GatewayConfig;
use courier_kernel::{Clock, TokenCodec, TokioClock};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Run the gateway until `shutdown` fires.
///
/// Returns `Ok(())` when shut down cleanly, including a shutdown that arrives
/// before startup completes.
pub async fn run(config: GatewayConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    let matcher = ActivationMatcher::new(&config.matcher.re)
        .with_context(|| format!("invalid activation pattern '{}'", config.matcher.re))?;

    let sd = &config.service_discovery;
    let transport = Arc::new(
        HttpRegistryTransport::new(
            config.registry_base_url(),
            RegistryEndpoints::from_config(sd),
            sd.request_timeout(),
        )
        .context("failed to build registry HTTP client")?,
    );
    let clock: Arc<dyn Clock> = Arc::new(TokioClock);
    let registry_codec = TokenCodec::new(config.registry_secret());

    let mut client = RegistryClient::new(
        transport.clone(),
        registry_codec.clone(),
        config.self_record(),
        config.dialog.service_name.clone(),
        RetryPolicy::from_config(sd),
        clock.clone(),
    );

    info!(
        service = %config.general.name,
        registry = %transport.base_url(),
        dependency = %config.dialog.service_name,
        "starting registration"
    );
    let dependent = match client.start(&shutdown).await {
        Ok(dependent) => dependent,
        Err(RegistryError::Cancelled(state)) => {
            info!(state = %state, "shutdown requested during startup");
            return Ok(());
        }
        Err(e) => return Err(e).context("registry startup failed"),
    };

    let heartbeat = HeartbeatLoop::new(
        transport,
        registry_codec,
        config.general.name.clone(),
        sd.heartbeat_interval(),
        clock,
    )
    .spawn(shutdown.child_token());

    let forwarder = HttpDialogForwarder::new(sd.request_timeout())
        .context("failed to build dialog HTTP client")?;
    let router = MessageRouter::new(dependent, matcher, Arc::new(forwarder));
    let state = AppState::new(
        RequestAuthenticator::new(TokenCodec::new(config.gateway_secret())),
        Arc::new(router),
        config.general.name.clone(),
    )
    .with_strict_forwarding(config.gateway.strict_forwarding);

    let served = GatewayServer::new(state)
        .start(&config.listen_addr(), shutdown.clone())
        .await
        .with_context(|| format!("failed to serve on {}", config.listen_addr()));

    heartbeat.stop().await;
    served
}
