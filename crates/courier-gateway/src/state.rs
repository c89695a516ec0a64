//! Shared application state for the gateway server

use crate::filter::RequestAuthenticator;
use crate::router::MessageRouter;
use std::sync::Arc;

/// State shared across all request handlers
pub struct AppState {
    /// Verifies inbound tokens against the gateway's own secret
    pub authenticator: RequestAuthenticator,
    /// Built once the dialog service has been resolved
    pub router: Arc<MessageRouter>,
    /// Registry name of this gateway
    pub service_name: String,
    /// Surface forward failures as 502 instead of acknowledging
    pub strict_forwarding: bool,
}

impl AppState {
    pub fn new(
        authenticator: RequestAuthenticator,
        router: Arc<MessageRouter>,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            authenticator,
            router,
            service_name: service_name.into(),
            strict_forwarding: false,
        }
    }

    pub fn with_strict_forwarding(mut self, strict: bool) -> Self {
        self.strict_forwarding = strict;
        self
    }
}
