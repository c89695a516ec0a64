use async_trait::async_trait;
use courier_kernel::{
    DependentService, DialogForwarder, ForwardEndpoint, ForwardPayload, Token, TransportError,
};
use std::sync::{Arc, RwLock};

/// One recorded [`DialogForwarder::forward`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardCall {
    pub target: DependentService,
    pub endpoint: ForwardEndpoint,
    pub payload: ForwardPayload,
    pub token: Token,
}

/// A [`DialogForwarder`] that records calls and answers with a fixed status,
/// or fails every call with a network error.
#[derive(Clone)]
pub struct RecordingForwarder {
    status: Option<u16>,
    calls: Arc<RwLock<Vec<ForwardCall>>>,
}

impl RecordingForwarder {
    /// Answers every forward with 200.
    pub fn new() -> Self {
        Self::with_status(200)
    }

    pub fn with_status(status: u16) -> Self {
        Self {
            status: Some(status),
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Every forward fails as if the dialog service were unreachable.
    pub fn failing() -> Self {
        Self {
            status: None,
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Vec<ForwardCall> {
        self.calls.read().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().map(|c| c.len()).unwrap_or_default()
    }
}

impl Default for RecordingForwarder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DialogForwarder for RecordingForwarder {
    async fn forward(
        &self,
        target: &DependentService,
        endpoint: ForwardEndpoint,
        payload: &ForwardPayload,
        token: &Token,
    ) -> Result<u16, TransportError> {
        if let Ok(mut calls) = self.calls.write() {
            calls.push(ForwardCall {
                target: target.clone(),
                endpoint,
                payload: payload.clone(),
                token: *token,
            });
        }
        self.status.ok_or_else(|| TransportError::Network {
            endpoint: format!("{}{}", target.base_url(), endpoint.path()),
            message: "connection refused".to_string(),
        })
    }
}
