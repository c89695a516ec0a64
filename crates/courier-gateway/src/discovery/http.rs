//! reqwest-backed [`RegistryTransport`].

use async_trait::async_trait;
use courier_kernel::config::DiscoverySection;
use courier_kernel::token::TOKEN_HEADER;
use courier_kernel::{
    LivenessPayload, RegistryTransport, ServiceRecord, ServicesDirectory, ServicesQuery, Token,
    TransportError,
};
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;
use tracing::{debug, instrument};

/// Relative paths of the three registry endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEndpoints {
    pub register: String,
    pub get_services: String,
    pub heartbeat: String,
}

impl RegistryEndpoints {
    pub fn from_config(section: &DiscoverySection) -> Self {
        Self {
            register: section.register_endpoint.clone(),
            get_services: section.get_services_endpoint.clone(),
            heartbeat: section.heartbeat_endpoint.clone(),
        }
    }
}

impl Default for RegistryEndpoints {
    fn default() -> Self {
        Self {
            register: "register".to_string(),
            get_services: "get_services".to_string(),
            heartbeat: "heartbeat".to_string(),
        }
    }
}

/// Talks to the registry at `base_url` over plain HTTP.
pub struct HttpRegistryTransport {
    base_url: String,
    endpoints: RegistryEndpoints,
    client: Client,
}

impl HttpRegistryTransport {
    /// `timeout` bounds every individual request, connect included.
    pub fn new(
        base_url: impl Into<String>,
        endpoints: RegistryEndpoints,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            endpoints,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send(&self, builder: RequestBuilder, url: &str) -> Result<Response, TransportError> {
        let response = builder.send().await.map_err(|e| TransportError::Network {
            endpoint: url.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        debug!(url = %url, status = status.as_u16(), "registry answered");
        if !status.is_success() {
            return Err(TransportError::Status {
                endpoint: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl RegistryTransport for HttpRegistryTransport {
    #[instrument(skip_all, fields(service = %record.name))]
    async fn register(&self, record: &ServiceRecord, token: &Token) -> Result<(), TransportError> {
        let url = self.url(&self.endpoints.register);
        let builder = self
            .client
            .post(&url)
            .header(TOKEN_HEADER, token.to_hex())
            .json(record);
        self.send(builder, &url).await.map(|_| ())
    }

    #[instrument(skip_all, fields(services = ?query.service_names))]
    async fn get_services(
        &self,
        query: &ServicesQuery,
        token: &Token,
    ) -> Result<ServicesDirectory, TransportError> {
        let url = self.url(&self.endpoints.get_services);
        // The registry reads the query from a GET body.
        let builder = self
            .client
            .get(&url)
            .header(TOKEN_HEADER, token.to_hex())
            .json(query);
        let response = self.send(builder, &url).await?;
        response
            .json::<ServicesDirectory>()
            .await
            .map_err(|e| TransportError::Decode {
                endpoint: url.clone(),
                message: e.to_string(),
            })
    }

    #[instrument(skip_all, fields(service = %service_name))]
    async fn heartbeat(
        &self,
        service_name: &str,
        payload: &LivenessPayload,
        token: &Token,
    ) -> Result<(), TransportError> {
        let url = self.url(&format!(
            "{}/{}",
            self.endpoints.heartbeat.trim_end_matches('/'),
            service_name
        ));
        let builder = self
            .client
            .post(&url)
            .header(TOKEN_HEADER, token.to_hex())
            .json(payload);
        self.send(builder, &url).await.map(|_| ())
    }
}
