use async_trait::async_trait;
use courier_kernel::Clock;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// A [`Clock`] that records every requested wait and returns at once.
///
/// Each sleep yields to the scheduler so loops driven by this clock stay
/// cooperative.
#[derive(Clone, Default)]
pub struct RecordingClock {
    sleeps: Arc<RwLock<Vec<Duration>>>,
}

impl RecordingClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requested waits, in call order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.read().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn total(&self) -> Duration {
        self.sleeps().iter().sum()
    }
}

#[async_trait]
impl Clock for RecordingClock {
    async fn sleep(&self, duration: Duration) {
        if let Ok(mut sleeps) = self.sleeps.write() {
            sleeps.push(duration);
        }
        tokio::task::yield_now().await;
    }
}
