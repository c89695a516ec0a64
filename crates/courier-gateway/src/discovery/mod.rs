//! Service-discovery integration.
//!
//! - [`HttpRegistryTransport`]: reqwest implementation of the registry calls.
//! - [`RegistryClient`]: startup sequence that registers this gateway and
//!   resolves the dialog service.
//! - [`HeartbeatLoop`]: periodic liveness reassertion after startup.

mod heartbeat;
mod http;
mod lifecycle;

pub use heartbeat::{HeartbeatHandle, HeartbeatLoop};
pub use http::{HttpRegistryTransport, RegistryEndpoints};
pub use lifecycle::{RegistryClient, RetryPolicy};

use courier_kernel::{EncodingError, RegistrationState, StateError};
use thiserror::Error;

/// Reasons the startup sequence can end without a [`DependentService`](courier_kernel::DependentService).
///
/// Transport failures are never fatal; they are retried indefinitely.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry startup cancelled while {0}")]
    Cancelled(RegistrationState),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("failed to sign registry request: {0}")]
    Encoding(#[from] EncodingError),
}
