//! Clock abstraction (injectable for testing).
//!
//! The registration, discovery and heartbeat loops never call
//! `tokio::time::sleep` directly; they wait through a [`Clock`] so tests can
//! record the requested intervals and return immediately.

use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait Clock: Send + Sync {
    /// Wait for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// The default [`Clock`] backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
