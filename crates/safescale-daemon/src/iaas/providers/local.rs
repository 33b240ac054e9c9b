//! Local testing provider
//!
//! Materializes nothing: hosts, networks and volumes live in in-memory
//! tables. An injectable provisioning latency makes cancellation and
//! timeout paths exercisable in tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use safescale_common::{Error, HostEffectiveSizing, Result};
use serde_json::Value;

use crate::iaas::provider::{
    AuthenticationOptions, Capabilities, ConfigurationOptions, Provider,
};
use crate::iaas::resources::{
    HostCore, HostRequest, HostState, HostTemplate, Image, Network, NetworkRequest, Volume,
    VolumeRequest,
};

const PROVIDER_NAME: &str = "local";

#[derive(Default)]
struct Inventory {
    hosts: HashMap<String, HostCore>,
    networks: HashMap<String, Network>,
    volumes: HashMap<String, Volume>,
}

/// In-memory provider used by the test suites and local development.
pub struct LocalProvider {
    inventory: Arc<Mutex<Inventory>>,
    next_id: AtomicU64,
    /// Artificial delay applied to host creation
    latency: Duration,
    params: Value,
}

impl Default for LocalProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalProvider {
    pub fn new() -> Self {
        Self::with_latency(Duration::ZERO)
    }

    /// Create a provider whose host creation takes `latency` to complete.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            inventory: Arc::new(Mutex::new(Inventory::default())),
            next_id: AtomicU64::new(1),
            latency,
            params: Value::Null,
        }
    }

    fn mint_id(&self, kind: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        format!("{kind}-{n:04}")
    }

    fn fake_ip(&self, n: u64) -> String {
        format!("10.0.{}.{}", (n >> 8) & 0xff, n & 0xff)
    }
}

#[async_trait]
impl Provider for LocalProvider {
    fn build(&self, params: &Value) -> Result<Arc<dyn Provider>> {
        let latency = params
            .get("latency_ms")
            .and_then(Value::as_u64)
            .map(Duration::from_millis)
            .unwrap_or(Duration::ZERO);
        let mut bound = Self::with_latency(latency);
        bound.params = params.clone();
        Ok(Arc::new(bound))
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn authentication_options(&self) -> Result<AuthenticationOptions> {
        Ok(AuthenticationOptions::default())
    }

    fn configuration_options(&self) -> Result<ConfigurationOptions> {
        Ok(ConfigurationOptions {
            region: "local".to_string(),
            availability_zone: "local".to_string(),
            default_image: "Ubuntu 18.04".to_string(),
            operator_username: safescale_common::defaults::default_operator_username(),
            dns_servers: safescale_common::defaults::default_dns_servers(),
            ..Default::default()
        })
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            layer3_networking: true,
            ..Default::default()
        }
    }

    fn tenant_parameters(&self) -> Value {
        self.params.clone()
    }

    async fn list_templates(&self, all: bool) -> Result<Vec<HostTemplate>> {
        let mut templates = vec![
            HostTemplate {
                id: "t-small".to_string(),
                name: "local.small".to_string(),
                cores: 2,
                ram_size: 7.0,
                disk_size: 50,
                gpu_count: 0,
            },
            HostTemplate {
                id: "t-medium".to_string(),
                name: "local.medium".to_string(),
                cores: 4,
                ram_size: 15.0,
                disk_size: 100,
                gpu_count: 0,
            },
            HostTemplate {
                id: "t-large".to_string(),
                name: "local.large".to_string(),
                cores: 8,
                ram_size: 30.0,
                disk_size: 200,
                gpu_count: 0,
            },
        ];
        if all {
            templates.push(HostTemplate {
                id: "t-gpu".to_string(),
                name: "local.gpu".to_string(),
                cores: 8,
                ram_size: 30.0,
                disk_size: 200,
                gpu_count: 1,
            });
        }
        Ok(templates)
    }

    async fn list_images(&self, _all: bool) -> Result<Vec<Image>> {
        Ok(vec![
            Image {
                id: "img-ubuntu-1804".to_string(),
                name: "Ubuntu 18.04".to_string(),
            },
            Image {
                id: "img-centos-7".to_string(),
                name: "CentOS 7".to_string(),
            },
        ])
    }

    async fn create_host(&self, req: HostRequest) -> Result<HostCore> {
        if req.resource_name.is_empty() {
            return Err(Error::invalid_parameter(
                "req.resource_name",
                "cannot be empty",
            ));
        }
        {
            let inventory = self.inventory.lock().unwrap();
            if inventory.hosts.values().any(|h| h.name == req.resource_name) {
                return Err(Error::duplicate(format!(
                    "a host named '{}' already exists",
                    req.resource_name
                )));
            }
            if !req.network_id.is_empty() && !inventory.networks.contains_key(&req.network_id) {
                return Err(Error::not_found(format!(
                    "no network with id '{}'",
                    req.network_id
                )));
            }
        }

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let n = self.next_id.load(Ordering::SeqCst);
        let host = HostCore {
            id: self.mint_id("host"),
            name: req.resource_name.clone(),
            private_ip: self.fake_ip(n),
            public_ip: req.public_ip.then(|| format!("192.0.2.{}", n & 0xff)),
            sizing: HostEffectiveSizing::from(&req.sizing),
            state: HostState::Started,
            network_id: req.network_id.clone(),
            image: req.image.clone(),
        };
        self.inventory
            .lock()
            .unwrap()
            .hosts
            .insert(host.id.clone(), host.clone());
        Ok(host)
    }

    async fn inspect_host(&self, id: &str) -> Result<HostCore> {
        self.inventory
            .lock()
            .unwrap()
            .hosts
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("no host with id '{id}'")))
    }

    async fn list_hosts(&self) -> Result<Vec<HostCore>> {
        Ok(self.inventory.lock().unwrap().hosts.values().cloned().collect())
    }

    async fn delete_host(&self, id: &str) -> Result<()> {
        self.inventory
            .lock()
            .unwrap()
            .hosts
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::not_found(format!("no host with id '{id}'")))
    }

    async fn start_host(&self, id: &str) -> Result<()> {
        let mut inventory = self.inventory.lock().unwrap();
        let host = inventory
            .hosts
            .get_mut(id)
            .ok_or_else(|| Error::not_found(format!("no host with id '{id}'")))?;
        host.state = HostState::Started;
        Ok(())
    }

    async fn stop_host(&self, id: &str) -> Result<()> {
        let mut inventory = self.inventory.lock().unwrap();
        let host = inventory
            .hosts
            .get_mut(id)
            .ok_or_else(|| Error::not_found(format!("no host with id '{id}'")))?;
        host.state = HostState::Stopped;
        Ok(())
    }

    async fn create_network(&self, req: NetworkRequest) -> Result<Network> {
        if req.name.is_empty() {
            return Err(Error::invalid_parameter("req.name", "cannot be empty"));
        }
        let mut inventory = self.inventory.lock().unwrap();
        if inventory.networks.values().any(|n| n.name == req.name) {
            return Err(Error::duplicate(format!(
                "a network named '{}' already exists",
                req.name
            )));
        }
        let network = Network {
            id: self.mint_id("net"),
            name: req.name.clone(),
            cidr: req.cidr.clone(),
        };
        inventory.networks.insert(network.id.clone(), network.clone());
        Ok(network)
    }

    async fn inspect_network(&self, id: &str) -> Result<Network> {
        self.inventory
            .lock()
            .unwrap()
            .networks
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("no network with id '{id}'")))
    }

    async fn list_networks(&self) -> Result<Vec<Network>> {
        Ok(self
            .inventory
            .lock()
            .unwrap()
            .networks
            .values()
            .cloned()
            .collect())
    }

    async fn delete_network(&self, id: &str) -> Result<()> {
        let mut inventory = self.inventory.lock().unwrap();
        if inventory.hosts.values().any(|h| h.network_id == id) {
            return Err(Error::InconsistentState(format!(
                "network '{id}' still has attached hosts"
            )));
        }
        inventory
            .networks
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::not_found(format!("no network with id '{id}'")))
    }

    async fn create_volume(&self, req: VolumeRequest) -> Result<Volume> {
        if req.size == 0 {
            return Err(Error::invalid_parameter("req.size", "cannot be zero"));
        }
        let volume = Volume {
            id: self.mint_id("vol"),
            name: req.name.clone(),
            size: req.size,
        };
        self.inventory
            .lock()
            .unwrap()
            .volumes
            .insert(volume.id.clone(), volume.clone());
        Ok(volume)
    }

    async fn inspect_volume(&self, id: &str) -> Result<Volume> {
        self.inventory
            .lock()
            .unwrap()
            .volumes
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("no volume with id '{id}'")))
    }

    async fn list_volumes(&self) -> Result<Vec<Volume>> {
        Ok(self
            .inventory
            .lock()
            .unwrap()
            .volumes
            .values()
            .cloned()
            .collect())
    }

    async fn delete_volume(&self, id: &str) -> Result<()> {
        self.inventory
            .lock()
            .unwrap()
            .volumes
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::not_found(format!("no volume with id '{id}'")))
    }

    async fn exec_script(&self, host_id: &str, _name: &str, content: &str) -> Result<i32> {
        // Scripts are not actually executed; success is reported as long as
        // the host exists and the script rendered to something non-empty.
        self.inspect_host(host_id).await?;
        if content.is_empty() {
            return Err(Error::invalid_parameter("content", "cannot be empty"));
        }
        Ok(0)
    }
}
