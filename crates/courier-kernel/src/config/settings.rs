//! Typed gateway configuration.

use super::{ConfigError, ConfigResult, ENV_PREFIX, load_with_env};
use crate::service::ServiceRecord;
use crate::token::Secret;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Complete gateway configuration, one struct per file section.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub general: GeneralSection,
    pub security: SecuritySection,
    pub service_discovery: DiscoverySection,
    #[serde(default)]
    pub dialog: DialogSection,
    pub matcher: MatcherSection,
    #[serde(default)]
    pub gateway: GatewaySection,
    /// Free-form pairs declared to the registry with the self-record.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// This service's identity and listen address.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralSection {
    pub name: String,
    pub host: String,
    pub port: u16,
}

/// Secret callers of `/msg` sign their requests with.
#[derive(Debug, Clone, Deserialize)]
pub struct SecuritySection {
    pub secret_key: String,
}

/// Where the registry lives and how to talk to it.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverySection {
    pub host: String,
    pub port: u16,
    pub secret_key: String,
    pub register_endpoint: String,
    #[serde(default = "default_get_services_endpoint")]
    pub get_services_endpoint: String,
    #[serde(default = "default_heartbeat_endpoint")]
    pub heartbeat_endpoint: String,
    #[serde(default = "default_register_interval")]
    pub register_interval_secs: u64,
    #[serde(default = "default_discover_interval")]
    pub discover_interval_secs: u64,
    #[serde(default = "default_settle_delay")]
    pub settle_delay_secs: u64,
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DialogSection {
    /// Registry name of the service messages are forwarded to.
    #[serde(default = "default_dialog_service")]
    pub service_name: String,
}

impl Default for DialogSection {
    fn default() -> Self {
        Self {
            service_name: default_dialog_service(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatcherSection {
    /// Activation-code pattern; a match routes the message to `/user`.
    pub re: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewaySection {
    /// Answer 502 instead of a success acknowledgment when forwarding fails.
    #[serde(default)]
    pub strict_forwarding: bool,
}

fn default_get_services_endpoint() -> String {
    "get_services".to_string()
}

fn default_heartbeat_endpoint() -> String {
    "heartbeat".to_string()
}

fn default_register_interval() -> u64 {
    10
}

fn default_discover_interval() -> u64 {
    3
}

fn default_settle_delay() -> u64 {
    5
}

fn default_heartbeat_interval() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    10
}

fn default_dialog_service() -> String {
    "dialog-manager".to_string()
}

fn require(value: &str, field: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} cannot be empty")));
    }
    Ok(())
}

fn require_positive(value: u64, field: &str) -> ConfigResult<()> {
    if value == 0 {
        return Err(ConfigError::Invalid(format!("{field} must be greater than 0")));
    }
    Ok(())
}

impl GatewayConfig {
    /// Load from `path` with `COURIER__*` overrides, then validate.
    pub fn load(path: &str) -> ConfigResult<Self> {
        let config: Self = load_with_env(path, ENV_PREFIX)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that could only fail later at runtime.
    pub fn validate(&self) -> ConfigResult<()> {
        require(&self.general.name, "general.name")?;
        require(&self.general.host, "general.host")?;
        require(&self.security.secret_key, "security.secret_key")?;

        let sd = &self.service_discovery;
        require(&sd.host, "service_discovery.host")?;
        require(&sd.secret_key, "service_discovery.secret_key")?;
        require(&sd.register_endpoint, "service_discovery.register_endpoint")?;
        require(&sd.get_services_endpoint, "service_discovery.get_services_endpoint")?;
        require(&sd.heartbeat_endpoint, "service_discovery.heartbeat_endpoint")?;
        require_positive(sd.register_interval_secs, "service_discovery.register_interval_secs")?;
        require_positive(sd.discover_interval_secs, "service_discovery.discover_interval_secs")?;
        require_positive(sd.heartbeat_interval_secs, "service_discovery.heartbeat_interval_secs")?;
        require_positive(sd.request_timeout_secs, "service_discovery.request_timeout_secs")?;

        require(&self.dialog.service_name, "dialog.service_name")?;

        require(&self.matcher.re, "matcher.re")?;
        regex::Regex::new(&self.matcher.re)
            .map_err(|e| ConfigError::Invalid(format!("matcher.re does not compile: {e}")))?;

        Ok(())
    }

    pub fn gateway_secret(&self) -> Secret {
        Secret::from(self.security.secret_key.as_str())
    }

    pub fn registry_secret(&self) -> Secret {
        Secret::from(self.service_discovery.secret_key.as_str())
    }

    /// Self-record announced to the registry.
    pub fn self_record(&self) -> ServiceRecord {
        let mut record = ServiceRecord::new(
            self.general.name.clone(),
            self.general.host.clone(),
            self.general.port,
            self.gateway_secret(),
        );
        record.metadata = self.metadata.clone();
        record
    }

    /// `http://host:port` of the registry.
    pub fn registry_base_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.service_discovery.host, self.service_discovery.port
        )
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.general.host, self.general.port)
    }
}

impl DiscoverySection {
    pub fn register_interval(&self) -> Duration {
        Duration::from_secs(self.register_interval_secs)
    }

    pub fn discover_interval(&self) -> Duration {
        Duration::from_secs(self.discover_interval_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
