//! CloudFerro provider configuration binding
//!
//! CloudFerro clouds (Creodias, ...) are OpenStack-derived; this provider
//! reuses the OpenStack parameter mapping and pins the endpoints and
//! regional defaults the platform documents.

use std::sync::Arc;

use async_trait::async_trait;
use safescale_common::{Error, Result};
use serde_json::Value;

use crate::iaas::provider::{
    AuthenticationOptions, Capabilities, ConfigurationOptions, Provider,
};
use crate::iaas::resources::{
    HostCore, HostRequest, HostTemplate, Image, Network, NetworkRequest, Volume, VolumeRequest,
};

use super::openstack::OpenStackProvider;

const PROVIDER_NAME: &str = "cloudferro";

const IDENTITY_ENDPOINT: &str = "https://cf2.cloudferro.com:5000/v3";
const DEFAULT_REGION: &str = "RegionOne";
const DEFAULT_FLOATING_IP_POOL: &str = "external";

const SDK_UNAVAILABLE: &str = "cloudferro compute binding is not linked in this build";

/// CloudFerro provider bound to one tenant.
pub struct CloudFerroProvider {
    auth: AuthenticationOptions,
    config: ConfigurationOptions,
    params: Value,
}

impl CloudFerroProvider {
    /// Unbound template used by the factory table.
    pub fn template() -> Self {
        Self {
            auth: AuthenticationOptions::default(),
            config: ConfigurationOptions::default(),
            params: Value::Null,
        }
    }
}

#[async_trait]
impl Provider for CloudFerroProvider {
    fn build(&self, params: &Value) -> Result<Arc<dyn Provider>> {
        // The platform fixes the identity endpoint; tenants only carry
        // credentials and project selection.
        let mut merged = params.clone();
        let identity = merged
            .get_mut("identity")
            .and_then(Value::as_object_mut)
            .ok_or_else(|| Error::invalid_parameter("params", "identity section is required"))?;
        identity
            .entry("IdentityEndpoint")
            .or_insert_with(|| Value::String(IDENTITY_ENDPOINT.to_string()));
        if let Some(compute) = merged.get_mut("compute").and_then(Value::as_object_mut) {
            compute
                .entry("Region")
                .or_insert_with(|| Value::String(DEFAULT_REGION.to_string()));
        } else {
            merged["compute"] = serde_json::json!({ "Region": DEFAULT_REGION });
        }

        let (auth, mut config) = OpenStackProvider::bind(&merged)?;
        if config.floating_ip_pool.is_none() {
            config.floating_ip_pool = Some(DEFAULT_FLOATING_IP_POOL.to_string());
        }

        Ok(Arc::new(Self {
            auth,
            config,
            params: params.clone(),
        }))
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn authentication_options(&self) -> Result<AuthenticationOptions> {
        Ok(self.auth.clone())
    }

    fn configuration_options(&self) -> Result<ConfigurationOptions> {
        Ok(self.config.clone())
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            private_virtual_ip: true,
            layer3_networking: true,
            ..Default::default()
        }
    }

    fn tenant_parameters(&self) -> Value {
        self.params.clone()
    }

    async fn list_templates(&self, _all: bool) -> Result<Vec<HostTemplate>> {
        Err(Error::NotImplemented(SDK_UNAVAILABLE))
    }

    async fn list_images(&self, _all: bool) -> Result<Vec<Image>> {
        Err(Error::NotImplemented(SDK_UNAVAILABLE))
    }

    async fn create_host(&self, _req: HostRequest) -> Result<HostCore> {
        Err(Error::NotImplemented(SDK_UNAVAILABLE))
    }

    async fn inspect_host(&self, _id: &str) -> Result<HostCore> {
        Err(Error::NotImplemented(SDK_UNAVAILABLE))
    }

    async fn list_hosts(&self) -> Result<Vec<HostCore>> {
        Err(Error::NotImplemented(SDK_UNAVAILABLE))
    }

    async fn delete_host(&self, _id: &str) -> Result<()> {
        Err(Error::NotImplemented(SDK_UNAVAILABLE))
    }

    async fn start_host(&self, _id: &str) -> Result<()> {
        Err(Error::NotImplemented(SDK_UNAVAILABLE))
    }

    async fn stop_host(&self, _id: &str) -> Result<()> {
        Err(Error::NotImplemented(SDK_UNAVAILABLE))
    }

    async fn create_network(&self, _req: NetworkRequest) -> Result<Network> {
        Err(Error::NotImplemented(SDK_UNAVAILABLE))
    }

    async fn inspect_network(&self, _id: &str) -> Result<Network> {
        Err(Error::NotImplemented(SDK_UNAVAILABLE))
    }

    async fn list_networks(&self) -> Result<Vec<Network>> {
        Err(Error::NotImplemented(SDK_UNAVAILABLE))
    }

    async fn delete_network(&self, _id: &str) -> Result<()> {
        Err(Error::NotImplemented(SDK_UNAVAILABLE))
    }

    async fn create_volume(&self, _req: VolumeRequest) -> Result<Volume> {
        Err(Error::NotImplemented(SDK_UNAVAILABLE))
    }

    async fn inspect_volume(&self, _id: &str) -> Result<Volume> {
        Err(Error::NotImplemented(SDK_UNAVAILABLE))
    }

    async fn list_volumes(&self) -> Result<Vec<Volume>> {
        Err(Error::NotImplemented(SDK_UNAVAILABLE))
    }

    async fn delete_volume(&self, _id: &str) -> Result<()> {
        Err(Error::NotImplemented(SDK_UNAVAILABLE))
    }

    async fn exec_script(&self, _host_id: &str, _name: &str, _content: &str) -> Result<i32> {
        Err(Error::NotImplemented(SDK_UNAVAILABLE))
    }
}
