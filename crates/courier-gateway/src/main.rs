//! Courier gateway — entry point.
//!
//! Loads configuration, registers with service discovery, resolves the dialog
//! service and then serves `/msg` until Ctrl-C.
//!
//! # Environment variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `COURIER_CONFIG` | `config.ini` | Configuration file path (the first CLI argument wins). |
//! | `COURIER__<SECTION>__<KEY>` | *(none)* | Override a single configuration value. |
//! | `COURIER_LOG_FORMAT` | `text` | `json` for structured log lines. |
//! | `RUST_LOG` | `courier_gateway=info` | Log filter directives. |

use anyhow::Context;
use courier_gateway::bootstrap;
use courier_kernel::config::GatewayConfig;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "config.ini";

fn init_tracing() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("courier_gateway=info,courier_kernel=info"))
        .context("invalid log filter")?;

    let json = std::env::var("COURIER_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

fn config_path() -> String {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("COURIER_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let path = config_path();
    let config = GatewayConfig::load(&path)
        .with_context(|| format!("failed to load configuration from {path}"))?;
    info!(
        path = %path,
        service = %config.general.name,
        listen = %config.listen_addr(),
        strict_forwarding = config.gateway.strict_forwarding,
        "configuration loaded"
    );

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, shutting down");
                signal.cancel();
            }
            Err(e) => warn!(error = %e, "could not listen for Ctrl-C"),
        }
    });

    bootstrap::run(config, shutdown).await
}
