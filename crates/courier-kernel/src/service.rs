//! Service records exchanged with the registry.
//!
//! - [`ServiceRecord`]: how this gateway describes itself when registering.
//! - [`ServicesQuery`] / [`ServicesDirectory`]: the credential lookup for the
//!   dependent service.
//! - [`DependentService`]: the resolved, immutable connection credentials.
//! - [`RegistrationState`]: the monotonic startup lifecycle.

use crate::token::Secret;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Self-record
// ─────────────────────────────────────────────────────────────────────────────

/// Description of this gateway sent to the registry's register endpoint.
///
/// Serialises as
/// `{"general":{"name","host","port"},"security":{"secret_key"},"metadata":{..}}`.
/// The declared secret is the gateway's inbound secret, which the registry
/// hands out to services that call `/msg`.
#[derive(Debug, Clone)]
pub struct ServiceRecord {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub secret: Secret,
    pub metadata: BTreeMap<String, String>,
}

impl ServiceRecord {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16, secret: Secret) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            secret,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[derive(Serialize)]
struct SelfRecordWire<'a> {
    general: GeneralWire<'a>,
    security: SecurityWire<'a>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    metadata: &'a BTreeMap<String, String>,
}

#[derive(Serialize)]
struct GeneralWire<'a> {
    name: &'a str,
    host: &'a str,
    port: u16,
}

#[derive(Serialize)]
struct SecurityWire<'a> {
    secret_key: &'a str,
}

impl Serialize for ServiceRecord {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let secret_key = self
            .secret
            .expose()
            .map_err(|e| serde::ser::Error::custom(format!("secret is not UTF-8: {e}")))?;
        SelfRecordWire {
            general: GeneralWire {
                name: &self.name,
                host: &self.host,
                port: self.port,
            },
            security: SecurityWire {
                secret_key,
            },
            metadata: &self.metadata,
        }
        .serialize(serializer)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Discovery
// ─────────────────────────────────────────────────────────────────────────────

/// Body of the `get_services` request: `{"service_names": [..]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicesQuery {
    pub service_names: Vec<String>,
}

impl ServicesQuery {
    pub fn single(name: impl Into<String>) -> Self {
        Self {
            service_names: vec![name.into()],
        }
    }
}

/// Registry answer to a [`ServicesQuery`]: one entry per requested name.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct ServicesDirectory {
    entries: BTreeMap<String, ServiceEntry>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceEntry {
    pub general: EntryGeneral,
    pub security: EntrySecurity,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EntryGeneral {
    pub host: String,
    pub port: PortValue,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EntrySecurity {
    pub secret_key: String,
}

/// Registries in the wild send the port either as a number or a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PortValue {
    Number(u64),
    Text(String),
}

impl PortValue {
    fn to_port(&self) -> Option<u16> {
        match self {
            PortValue::Number(n) => u16::try_from(*n).ok(),
            PortValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for PortValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortValue::Number(n) => write!(f, "{n}"),
            PortValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error("service '{0}' is not present in the registry response")]
    Missing(String),

    #[error("service '{0}' has an invalid port '{1}'")]
    InvalidPort(String, String),

    #[error("service '{0}' has an empty host")]
    EmptyHost(String),
}

impl ServicesDirectory {
    pub fn insert(&mut self, name: impl Into<String>, entry: ServiceEntry) {
        self.entries.insert(name.into(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Extract the credentials of `name`.
    pub fn resolve(&self, name: &str) -> Result<DependentService, DirectoryError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| DirectoryError::Missing(name.to_string()))?;
        if entry.general.host.trim().is_empty() {
            return Err(DirectoryError::EmptyHost(name.to_string()));
        }
        let port = entry.general.port.to_port().ok_or_else(|| {
            DirectoryError::InvalidPort(name.to_string(), entry.general.port.to_string())
        })?;
        Ok(DependentService {
            name: name.to_string(),
            host: entry.general.host.clone(),
            port,
            secret: Secret::from(entry.security.secret_key.as_str()),
        })
    }
}

/// Connection credentials of the dependent service.
///
/// Produced once by the startup sequence and then only read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependentService {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub secret: Secret,
}

impl DependentService {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Lifecycle
// ─────────────────────────────────────────────────────────────────────────────

/// Startup lifecycle of the gateway with respect to the registry.
///
/// Only ever moves forward, one step at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationState {
    Unregistered,
    Registering,
    Registered,
    Discovering,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal registration state transition {from:?} -> {to:?}")]
pub struct StateError {
    pub from: RegistrationState,
    pub to: RegistrationState,
}

impl RegistrationState {
    pub fn successor(self) -> Option<Self> {
        match self {
            Self::Unregistered => Some(Self::Registering),
            Self::Registering => Some(Self::Registered),
            Self::Registered => Some(Self::Discovering),
            Self::Discovering => Some(Self::Ready),
            Self::Ready => None,
        }
    }

    /// Move to `next`, which must be the immediate successor.
    pub fn advance(&mut self, next: Self) -> Result<(), StateError> {
        if self.successor() != Some(next) {
            return Err(StateError { from: *self, to: next });
        }
        *self = next;
        Ok(())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unregistered => "unregistered",
            Self::Registering => "registering",
            Self::Registered => "registered",
            Self::Discovering => "discovering",
            Self::Ready => "ready",
        }
    }
}

impl fmt::Display for RegistrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
