//! Periodic liveness reassertion toward the registry.

use courier_kernel::token::liveness_payload;
use courier_kernel::{Clock, RegistryTransport, TokenCodec};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// One heartbeat every `cadence`, forever, until cancelled.
///
/// A failed heartbeat is logged and the loop keeps going.
pub struct HeartbeatLoop {
    transport: Arc<dyn RegistryTransport>,
    codec: TokenCodec,
    service_name: String,
    cadence: Duration,
    clock: Arc<dyn Clock>,
}

#[derive(Debug, Default)]
struct Counters {
    sent: AtomicU64,
    failed: AtomicU64,
}

/// Owner of a running heartbeat task.
pub struct HeartbeatHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    counters: Arc<Counters>,
}

impl HeartbeatLoop {
    /// `codec` must carry the registry's secret.
    pub fn new(
        transport: Arc<dyn RegistryTransport>,
        codec: TokenCodec,
        service_name: impl Into<String>,
        cadence: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            transport,
            codec,
            service_name: service_name.into(),
            cadence,
            clock,
        }
    }

    /// Start the background task. It stops when `cancel` fires or the
    /// returned handle is stopped.
    pub fn spawn(self, cancel: CancellationToken) -> HeartbeatHandle {
        let counters = Arc::new(Counters::default());
        let task = tokio::spawn(self.run(cancel.clone(), counters.clone()));
        HeartbeatHandle {
            cancel,
            task,
            counters,
        }
    }

    async fn run(self, cancel: CancellationToken, counters: Arc<Counters>) {
        info!(
            service = %self.service_name,
            cadence_secs = self.cadence.as_secs(),
            "heartbeat loop started"
        );
        let payload = liveness_payload();
        let mut consecutive_failures: u64 = 0;

        loop {
            let token = match self.codec.encode(&payload) {
                Ok(token) => token,
                Err(e) => {
                    error!(error = %e, "could not sign heartbeat; stopping loop");
                    return;
                }
            };

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                outcome = self.transport.heartbeat(&self.service_name, &payload, &token) => outcome,
            };

            match outcome {
                Ok(()) => {
                    counters.sent.fetch_add(1, Ordering::Relaxed);
                    consecutive_failures = 0;
                    debug!(service = %self.service_name, "heartbeat sent");
                }
                Err(e) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    consecutive_failures += 1;
                    warn!(
                        service = %self.service_name,
                        consecutive_failures,
                        error = %e,
                        "heartbeat failed"
                    );
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = self.clock.sleep(self.cadence) => {}
            }
        }

        info!(service = %self.service_name, "heartbeat loop stopped");
    }
}

impl HeartbeatHandle {
    /// Successful heartbeats so far.
    pub fn beats_sent(&self) -> u64 {
        self.counters.sent.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.counters.failed.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the loop and wait for it to exit.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            if e.is_panic() {
                error!(error = %e, "heartbeat task panicked");
            }
        }
    }
}
