//! Outbound contracts: the registry and the dialog service.
//!
//! The gateway crate provides reqwest-backed implementations; tests plug in
//! scripted doubles. Both traits are object safe and used as
//! `Arc<dyn RegistryTransport>` / `Arc<dyn DialogForwarder>`.

use crate::message::{ForwardEndpoint, ForwardPayload};
use crate::service::{DependentService, ServiceRecord, ServicesDirectory, ServicesQuery};
use crate::token::{LivenessPayload, Token};
use async_trait::async_trait;
use thiserror::Error;

/// Failure of a single outbound call.
///
/// During startup every variant means "not yet available" and is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// Connection refused, DNS failure, timeout, …
    #[error("network error calling {endpoint}: {message}")]
    Network { endpoint: String, message: String },

    /// The peer answered with a non-2xx status.
    #[error("{endpoint} answered with status {status}")]
    Status { endpoint: String, status: u16 },

    /// 2xx, but the body is not what the contract promises.
    #[error("unexpected response body from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
}

impl TransportError {
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Calls the service-discovery registry makes available.
#[async_trait]
pub trait RegistryTransport: Send + Sync {
    /// Announce this gateway. `Ok` only on a 2xx answer.
    async fn register(&self, record: &ServiceRecord, token: &Token) -> Result<(), TransportError>;

    /// Look up connection credentials for the services named in `query`.
    async fn get_services(
        &self,
        query: &ServicesQuery,
        token: &Token,
    ) -> Result<ServicesDirectory, TransportError>;

    /// Reassert liveness of `service_name`.
    async fn heartbeat(
        &self,
        service_name: &str,
        payload: &LivenessPayload,
        token: &Token,
    ) -> Result<(), TransportError>;
}

/// Delivery of accepted messages to the dialog service.
#[async_trait]
pub trait DialogForwarder: Send + Sync {
    /// Post `payload` to `endpoint` on `target`. Returns the HTTP status the
    /// dialog service answered with; only network-level failures are errors.
    async fn forward(
        &self,
        target: &DependentService,
        endpoint: ForwardEndpoint,
        payload: &ForwardPayload,
        token: &Token,
    ) -> Result<u16, TransportError>;
}
