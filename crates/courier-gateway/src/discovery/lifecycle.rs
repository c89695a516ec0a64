//! Registration and discovery startup sequence.
//!
//! ```text
//! Unregistered → Registering ──(retry every register_interval)──► Registered
//!      → Discovering ──(sleep discover_interval before each attempt)──►
//!      settle_delay → Ready
//! ```
//!
//! Transport failures never abort startup; only cancellation does.

use super::RegistryError;
use courier_kernel::config::DiscoverySection;
use courier_kernel::{
    Clock, DependentService, RegistrationState, RegistryTransport, ServiceRecord, ServicesQuery,
    TokenCodec,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Fixed waits of the startup sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wait after each failed registration attempt.
    pub register_interval: Duration,
    /// Wait before every discovery attempt, the first one included.
    pub discover_interval: Duration,
    /// Wait between a successful discovery and `Ready`.
    pub settle_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(section: &DiscoverySection) -> Self {
        Self {
            register_interval: section.register_interval(),
            discover_interval: section.discover_interval(),
            settle_delay: section.settle_delay(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            register_interval: Duration::from_secs(10),
            discover_interval: Duration::from_secs(3),
            settle_delay: Duration::from_secs(5),
        }
    }
}

/// Drives this gateway from `Unregistered` to `Ready`.
pub struct RegistryClient {
    transport: Arc<dyn RegistryTransport>,
    codec: TokenCodec,
    record: ServiceRecord,
    dependency: String,
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
    state: RegistrationState,
    state_tx: watch::Sender<RegistrationState>,
}

impl RegistryClient {
    /// `codec` must carry the registry's secret; `dependency` is the registry
    /// name of the service to resolve.
    pub fn new(
        transport: Arc<dyn RegistryTransport>,
        codec: TokenCodec,
        record: ServiceRecord,
        dependency: impl Into<String>,
        policy: RetryPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (state_tx, _) = watch::channel(RegistrationState::Unregistered);
        Self {
            transport,
            codec,
            record,
            dependency: dependency.into(),
            policy,
            clock,
            state: RegistrationState::Unregistered,
            state_tx,
        }
    }

    pub fn state(&self) -> RegistrationState {
        self.state
    }

    /// Observe state transitions as they happen.
    pub fn subscribe(&self) -> watch::Receiver<RegistrationState> {
        self.state_tx.subscribe()
    }

    fn transition(&mut self, next: RegistrationState) -> Result<(), RegistryError> {
        let from = self.state;
        self.state.advance(next)?;
        self.state_tx.send_replace(next);
        info!(from = %from, to = %next, "registration state changed");
        Ok(())
    }

    async fn cancellable<F: Future>(
        &self,
        cancel: &CancellationToken,
        fut: F,
    ) -> Result<F::Output, RegistryError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RegistryError::Cancelled(self.state)),
            out = fut => Ok(out),
        }
    }

    async fn pause(&self, cancel: &CancellationToken, duration: Duration) -> Result<(), RegistryError> {
        self.cancellable(cancel, self.clock.sleep(duration)).await
    }

    /// Run the startup sequence to completion.
    ///
    /// Returns the resolved dependent service once `Ready` is reached, or
    /// [`RegistryError::Cancelled`] if `cancel` fires first. Can only
    /// succeed once per client.
    pub async fn start(&mut self, cancel: &CancellationToken) -> Result<DependentService, RegistryError> {
        self.register(cancel).await?;
        let dependent = self.discover(cancel).await?;

        self.pause(cancel, self.policy.settle_delay).await?;
        self.transition(RegistrationState::Ready)?;
        info!(
            service = %dependent.name,
            host = %dependent.host,
            port = dependent.port,
            "dependent service resolved, gateway ready"
        );
        Ok(dependent)
    }

    async fn register(&mut self, cancel: &CancellationToken) -> Result<(), RegistryError> {
        self.transition(RegistrationState::Registering)?;
        let token = self.codec.encode(&self.record)?;

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let result = self
                .cancellable(cancel, self.transport.register(&self.record, &token))
                .await?;
            match result {
                Ok(()) => {
                    info!(attempt, service = %self.record.name, "registered with service discovery");
                    break;
                }
                Err(e) => {
                    warn!(
                        attempt,
                        error = %e,
                        retry_in_secs = self.policy.register_interval.as_secs(),
                        "registration failed"
                    );
                    self.pause(cancel, self.policy.register_interval).await?;
                }
            }
        }

        self.transition(RegistrationState::Registered)
    }

    async fn discover(&mut self, cancel: &CancellationToken) -> Result<DependentService, RegistryError> {
        self.transition(RegistrationState::Discovering)?;
        let query = ServicesQuery::single(self.dependency.clone());
        let token = self.codec.encode(&query)?;

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            self.pause(cancel, self.policy.discover_interval).await?;
            let result = self
                .cancellable(cancel, self.transport.get_services(&query, &token))
                .await?;
            match result.map(|directory| directory.resolve(&self.dependency)) {
                Ok(Ok(dependent)) => return Ok(dependent),
                Ok(Err(e)) => {
                    warn!(attempt, error = %e, "dependent service not yet available");
                }
                Err(e) => {
                    warn!(attempt, error = %e, "service lookup failed");
                }
            }
        }
    }
}
