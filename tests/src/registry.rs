use async_trait::async_trait;
use courier_kernel::service::{EntryGeneral, EntrySecurity, PortValue, ServiceEntry};
use courier_kernel::{
    LivenessPayload, RegistryTransport, ServiceRecord, ServicesDirectory, ServicesQuery, Token,
    TransportError,
};
use std::sync::{Arc, RwLock};

#[derive(Default)]
struct Script {
    fail_registrations: u32,
    fail_discoveries: u32,
    fail_heartbeats: u32,
    services: Vec<(String, ServiceEntry)>,
    /// Services that appear only after the given number of discovery calls.
    late_services: Vec<(usize, String, ServiceEntry)>,
}

#[derive(Default)]
struct Calls {
    registrations: Vec<(ServiceRecord, Token)>,
    queries: Vec<(ServicesQuery, Token)>,
    heartbeats: Vec<(String, Token)>,
}

/// A [`RegistryTransport`] with scripted outcomes.
///
/// The first `n` calls of each kind fail as configured; later calls succeed.
/// Every call is recorded, failed ones included.
#[derive(Clone, Default)]
pub struct ScriptedRegistry {
    script: Arc<RwLock<Script>>,
    calls: Arc<RwLock<Calls>>,
}

fn entry(host: &str, port: u16, secret: &str) -> ServiceEntry {
    ServiceEntry {
        general: EntryGeneral {
            host: host.to_string(),
            port: PortValue::Number(port.into()),
        },
        security: EntrySecurity {
            secret_key: secret.to_string(),
        },
    }
}

impl ScriptedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `name` resolvable from the first discovery call on.
    pub fn with_service(self, name: &str, host: &str, port: u16, secret: &str) -> Self {
        if let Ok(mut script) = self.script.write() {
            script.services.push((name.to_string(), entry(host, port, secret)));
        }
        self
    }

    /// Answer 2xx without `name` for the first `calls` discovery calls.
    pub fn publish_service_after(&self, calls: usize, name: &str, host: &str, port: u16, secret: &str) {
        if let Ok(mut script) = self.script.write() {
            script
                .late_services
                .push((calls, name.to_string(), entry(host, port, secret)));
        }
    }

    pub fn fail_registrations(self, n: u32) -> Self {
        if let Ok(mut script) = self.script.write() {
            script.fail_registrations = n;
        }
        self
    }

    pub fn fail_discoveries(self, n: u32) -> Self {
        if let Ok(mut script) = self.script.write() {
            script.fail_discoveries = n;
        }
        self
    }

    pub fn fail_heartbeats(self, n: u32) -> Self {
        if let Ok(mut script) = self.script.write() {
            script.fail_heartbeats = n;
        }
        self
    }

    pub fn register_calls(&self) -> usize {
        self.calls.read().map(|c| c.registrations.len()).unwrap_or_default()
    }

    pub fn discovery_calls(&self) -> usize {
        self.calls.read().map(|c| c.queries.len()).unwrap_or_default()
    }

    pub fn heartbeat_calls(&self) -> usize {
        self.calls.read().map(|c| c.heartbeats.len()).unwrap_or_default()
    }

    pub fn registrations(&self) -> Vec<(ServiceRecord, Token)> {
        self.calls.read().map(|c| c.registrations.clone()).unwrap_or_default()
    }

    pub fn queries(&self) -> Vec<(ServicesQuery, Token)> {
        self.calls.read().map(|c| c.queries.clone()).unwrap_or_default()
    }

    pub fn heartbeats(&self) -> Vec<(String, Token)> {
        self.calls.read().map(|c| c.heartbeats.clone()).unwrap_or_default()
    }

    /// Consume one scripted failure of the selected kind, if any are left.
    fn take_failure(&self, select: fn(&mut Script) -> &mut u32) -> bool {
        let Ok(mut script) = self.script.write() else {
            return false;
        };
        let remaining = select(&mut *script);
        if *remaining == 0 {
            return false;
        }
        *remaining -= 1;
        true
    }
}

#[async_trait]
impl RegistryTransport for ScriptedRegistry {
    async fn register(&self, record: &ServiceRecord, token: &Token) -> Result<(), TransportError> {
        if let Ok(mut calls) = self.calls.write() {
            calls.registrations.push((record.clone(), *token));
        }
        if self.take_failure(|s| &mut s.fail_registrations) {
            return Err(TransportError::Status {
                endpoint: "/register".to_string(),
                status: 503,
            });
        }
        Ok(())
    }

    async fn get_services(
        &self,
        query: &ServicesQuery,
        token: &Token,
    ) -> Result<ServicesDirectory, TransportError> {
        let call = match self.calls.write() {
            Ok(mut calls) => {
                calls.queries.push((query.clone(), *token));
                calls.queries.len()
            }
            Err(_) => 0,
        };
        if self.take_failure(|s| &mut s.fail_discoveries) {
            return Err(TransportError::Network {
                endpoint: "/get_services".to_string(),
                message: "connection refused".to_string(),
            });
        }

        let mut directory = ServicesDirectory::default();
        if let Ok(script) = self.script.read() {
            for (name, entry) in &script.services {
                directory.insert(name.clone(), entry.clone());
            }
            for (after, name, entry) in &script.late_services {
                if call > *after {
                    directory.insert(name.clone(), entry.clone());
                }
            }
        }
        Ok(directory)
    }

    async fn heartbeat(
        &self,
        service_name: &str,
        _payload: &LivenessPayload,
        token: &Token,
    ) -> Result<(), TransportError> {
        if let Ok(mut calls) = self.calls.write() {
            calls.heartbeats.push((service_name.to_string(), *token));
        }
        if self.take_failure(|s| &mut s.fail_heartbeats) {
            return Err(TransportError::Status {
                endpoint: format!("/heartbeat/{service_name}"),
                status: 500,
            });
        }
        Ok(())
    }
}
