//! Tenant configuration, registry, and current-tenant selection
//!
//! Tenants arrive from a JSON configuration file. The registry maps tenant
//! names to their provider factory and lazily-built [`Service`]; it is one
//! of the two unavoidable process-wide tables (the other being the job
//! registry) and stays a module-lifecycle singleton behind a single mutex.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};

use safescale_common::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::objectstorage::MemoryStorage;
use super::providers;
use super::service::{build_metadata_bucket_name, Service};

/// One tenant as described in the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    pub name: String,
    /// Backend name; `client` is accepted for compatibility
    #[serde(alias = "client")]
    pub provider: String,
    #[serde(default)]
    pub identity: Value,
    #[serde(default)]
    pub compute: Value,
    #[serde(default)]
    pub network: Value,
}

impl TenantConfig {
    /// The raw parameter document handed to the provider factory.
    pub fn params(&self) -> Value {
        json!({
            "identity": self.identity,
            "compute": self.compute,
            "network": self.network,
        })
    }

    fn section_str(&self, section: &Value, key: &str) -> Option<String> {
        section.get(key)?.as_str().map(str::to_string)
    }

    fn domain(&self) -> String {
        self.section_str(&self.identity, "DomainName")
            .unwrap_or_else(|| "Default".to_string())
    }

    fn project(&self) -> String {
        self.section_str(&self.compute, "TenantName")
            .or_else(|| self.section_str(&self.compute, "TenantID"))
            .unwrap_or_else(|| self.name.clone())
    }

    fn region(&self) -> String {
        self.section_str(&self.compute, "Region")
            .unwrap_or_else(|| "local".to_string())
    }
}

struct TenantEntry {
    config: TenantConfig,
    service: Option<Arc<Service>>,
}

fn registry() -> &'static Mutex<HashMap<String, TenantEntry>> {
    static REGISTRY: OnceLock<Mutex<HashMap<String, TenantEntry>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Load tenant configurations from a JSON file.
pub fn load_tenant_file(path: &Path) -> Result<Vec<TenantConfig>> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        Error::invalid_parameter("path", format!("cannot read '{}': {e}", path.display()))
    })?;
    let configs: Vec<TenantConfig> =
        serde_json::from_str(&raw).map_err(|e| Error::Syntax(format!("bad tenant file: {e}")))?;
    Ok(configs)
}

/// Register one tenant. Fails with `duplicate` when the name is taken and
/// with `not-found` when the backend is unknown.
pub fn register_tenant(config: TenantConfig) -> Result<()> {
    if config.name.is_empty() {
        return Err(Error::invalid_parameter("config.name", "cannot be empty"));
    }
    if providers::lookup(&config.provider).is_none() {
        return Err(Error::not_found(format!(
            "no provider registered under '{}'",
            config.provider
        )));
    }
    let mut reg = registry().lock().unwrap();
    if reg.contains_key(&config.name) {
        return Err(Error::duplicate(format!(
            "a tenant named '{}' is already registered",
            config.name
        )));
    }
    info!(tenant = %config.name, provider = %config.provider, "tenant registered");
    reg.insert(
        config.name.clone(),
        TenantEntry {
            config,
            service: None,
        },
    );
    Ok(())
}

/// Snapshot of registered tenant names mapped to their provider name.
pub fn tenant_names() -> HashMap<String, String> {
    registry()
        .lock()
        .unwrap()
        .iter()
        .map(|(name, entry)| (name.clone(), entry.config.provider.clone()))
        .collect()
}

/// Obtain the (cached) Service bound to a registered tenant.
pub fn use_service(name: &str) -> Result<Arc<Service>> {
    let mut reg = registry().lock().unwrap();
    let entry = reg
        .get_mut(name)
        .ok_or_else(|| Error::not_found(format!("no tenant named '{name}'")))?;

    if let Some(service) = &entry.service {
        return Ok(service.clone());
    }

    let template = providers::lookup(&entry.config.provider).ok_or_else(|| {
        Error::not_found(format!(
            "no provider registered under '{}'",
            entry.config.provider
        ))
    })?;
    let provider = template.build(&entry.config.params())?;
    let bucket_name = build_metadata_bucket_name(
        provider.name(),
        &entry.config.region(),
        &entry.config.domain(),
        &entry.config.project(),
    );
    let service = Arc::new(Service::new(
        name,
        provider,
        Arc::new(MemoryStorage::new()),
        bucket_name,
    ));
    entry.service = Some(service.clone());
    Ok(service)
}

/// A named credential set bound to one IaaS.
#[derive(Clone)]
pub struct Tenant {
    pub name: String,
    pub service: Arc<Service>,
}

static CURRENT_TENANT: Mutex<Option<Tenant>> = Mutex::new(None);

/// The tenant used for commands.
///
/// When unset and exactly one tenant is registered, that tenant is selected
/// and logged; the selection happens under the singleton mutex so
/// concurrent first callers converge on one winner and one log line.
pub fn current_tenant() -> Option<Tenant> {
    let mut current = CURRENT_TENANT.lock().unwrap();
    if current.is_none() {
        let names = tenant_names();
        if names.len() == 1 {
            let name = names.into_keys().next().unwrap();
            match use_service(&name) {
                Ok(service) => {
                    info!(tenant = %name, "unique registered tenant selected as current");
                    *current = Some(Tenant { name, service });
                }
                Err(err) => {
                    tracing::warn!(tenant = %name, error = %err, "cannot bind unique tenant");
                }
            }
        }
    }
    current.clone()
}

/// Select the tenant used for subsequent commands. Selecting the already
/// current tenant is a no-op.
pub fn set_current_tenant(name: &str) -> Result<()> {
    let mut current = CURRENT_TENANT.lock().unwrap();
    if let Some(tenant) = current.as_ref() {
        if tenant.name == name {
            return Ok(());
        }
    }
    let service = use_service(name)?;
    info!(tenant = %name, "tenant selected");
    *current = Some(Tenant {
        name: name.to_string(),
        service,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_config_sections() {
        let config: TenantConfig = serde_json::from_value(json!({
            "name": "ovh-lab",
            "client": "openstack",
            "identity": {"DomainName": "Default", "Username": "u", "Password": "p",
                          "IdentityEndpoint": "https://auth/v3"},
            "compute": {"Region": "GRA5", "TenantName": "lab"},
        }))
        .unwrap();

        assert_eq!(config.provider, "openstack");
        assert_eq!(config.region(), "GRA5");
        assert_eq!(config.domain(), "Default");
        assert_eq!(config.project(), "lab");
    }

    #[test]
    fn test_register_rejects_unknown_backend() {
        let config = TenantConfig {
            name: "bad".to_string(),
            provider: "aws".to_string(),
            identity: Value::Null,
            compute: Value::Null,
            network: Value::Null,
        };
        assert!(matches!(
            register_tenant(config),
            Err(Error::NotFound(_))
        ));
    }
}
