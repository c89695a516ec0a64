//! Dialog-service forwarder.
//!
//! [`HttpDialogForwarder`] posts accepted messages to
//! `http://{host}:{port}/user` or `/message` on the resolved dialog service,
//! signed with that service's secret. The answer body is not inspected.

use async_trait::async_trait;
use courier_kernel::token::TOKEN_HEADER;
use courier_kernel::{
    DependentService, DialogForwarder, ForwardEndpoint, ForwardPayload, Token, TransportError,
};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

pub struct HttpDialogForwarder {
    client: Client,
}

impl HttpDialogForwarder {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DialogForwarder for HttpDialogForwarder {
    #[instrument(skip_all, fields(target = %target.name, endpoint = %endpoint))]
    async fn forward(
        &self,
        target: &DependentService,
        endpoint: ForwardEndpoint,
        payload: &ForwardPayload,
        token: &Token,
    ) -> Result<u16, TransportError> {
        let url = format!("{}{}", target.base_url(), endpoint.path());
        let start = std::time::Instant::now();

        let response = self
            .client
            .post(&url)
            .header(TOKEN_HEADER, token.to_hex())
            .json(payload)
            .send()
            .await
            .map_err(|e| TransportError::Network {
                endpoint: url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        debug!(
            url = %url,
            status,
            latency_ms = start.elapsed().as_millis() as u64,
            "dialog service answered"
        );
        Ok(status)
    }
}
