//! The provider contract
//!
//! A [`Provider`] binds one credential set to one IaaS backend and exposes
//! CRUD over hosts, networks and volumes. The trait is object-safe so
//! providers can live in the tenant registry behind `Arc<dyn Provider>`.
//!
//! A *null* provider is a distinct sentinel: `is_null()` answers true and
//! every operation fails with `invalid-instance` without touching any
//! backend state.

use std::sync::Arc;

use async_trait::async_trait;
use safescale_common::{Error, Result};
use serde_json::Value;

use super::resources::{
    HostCore, HostRequest, HostTemplate, Image, Network, NetworkRequest, Volume, VolumeRequest,
};

/// Credentials a provider authenticates with.
#[derive(Debug, Clone, Default)]
pub struct AuthenticationOptions {
    pub identity_endpoint: String,
    pub username: String,
    pub domain_name: String,
}

/// Operational settings a provider was built with.
#[derive(Debug, Clone, Default)]
pub struct ConfigurationOptions {
    pub region: String,
    pub availability_zone: String,
    pub default_image: String,
    pub operator_username: String,
    pub dns_servers: Vec<String>,
    pub provider_network: Option<String>,
    pub floating_ip_pool: Option<String>,
}

/// Feature set a backend supports.
#[derive(Debug, Clone, Copy, Default)]
pub struct Capabilities {
    pub public_virtual_ip: bool,
    pub private_virtual_ip: bool,
    pub layer3_networking: bool,
}

/// Abstraction over one tenant on one IaaS.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Bind a fresh provider instance to the given tenant parameters.
    fn build(&self, params: &Value) -> Result<Arc<dyn Provider>>;

    /// Check whether this is the null sentinel.
    fn is_null(&self) -> bool {
        false
    }

    fn name(&self) -> &str;

    fn authentication_options(&self) -> Result<AuthenticationOptions>;
    fn configuration_options(&self) -> Result<ConfigurationOptions>;
    fn capabilities(&self) -> Capabilities;

    /// The raw tenant parameters this provider was built from.
    fn tenant_parameters(&self) -> Value;

    async fn list_templates(&self, all: bool) -> Result<Vec<HostTemplate>>;
    async fn list_images(&self, all: bool) -> Result<Vec<Image>>;

    async fn create_host(&self, req: HostRequest) -> Result<HostCore>;
    async fn inspect_host(&self, id: &str) -> Result<HostCore>;
    async fn list_hosts(&self) -> Result<Vec<HostCore>>;
    async fn delete_host(&self, id: &str) -> Result<()>;
    async fn start_host(&self, id: &str) -> Result<()>;
    async fn stop_host(&self, id: &str) -> Result<()>;

    async fn create_network(&self, req: NetworkRequest) -> Result<Network>;
    async fn inspect_network(&self, id: &str) -> Result<Network>;
    async fn list_networks(&self) -> Result<Vec<Network>>;
    async fn delete_network(&self, id: &str) -> Result<()>;

    async fn create_volume(&self, req: VolumeRequest) -> Result<Volume>;
    async fn inspect_volume(&self, id: &str) -> Result<Volume>;
    async fn list_volumes(&self) -> Result<Vec<Volume>>;
    async fn delete_volume(&self, id: &str) -> Result<()>;

    /// Execute a rendered installation script on a host, returning the exit
    /// code. Stands in for the SSH collaborator on backends that support it.
    async fn exec_script(&self, host_id: &str, name: &str, content: &str) -> Result<i32>;
}

/// The null provider sentinel.
pub struct NullProvider;

const NULL: &str = "provider";

#[async_trait]
impl Provider for NullProvider {
    fn build(&self, _params: &Value) -> Result<Arc<dyn Provider>> {
        Err(Error::InvalidInstance(NULL))
    }

    fn is_null(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        ""
    }

    fn authentication_options(&self) -> Result<AuthenticationOptions> {
        Err(Error::InvalidInstance(NULL))
    }

    fn configuration_options(&self) -> Result<ConfigurationOptions> {
        Err(Error::InvalidInstance(NULL))
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    fn tenant_parameters(&self) -> Value {
        Value::Null
    }

    async fn list_templates(&self, _all: bool) -> Result<Vec<HostTemplate>> {
        Err(Error::InvalidInstance(NULL))
    }

    async fn list_images(&self, _all: bool) -> Result<Vec<Image>> {
        Err(Error::InvalidInstance(NULL))
    }

    async fn create_host(&self, _req: HostRequest) -> Result<HostCore> {
        Err(Error::InvalidInstance(NULL))
    }

    async fn inspect_host(&self, _id: &str) -> Result<HostCore> {
        Err(Error::InvalidInstance(NULL))
    }

    async fn list_hosts(&self) -> Result<Vec<HostCore>> {
        Err(Error::InvalidInstance(NULL))
    }

    async fn delete_host(&self, _id: &str) -> Result<()> {
        Err(Error::InvalidInstance(NULL))
    }

    async fn start_host(&self, _id: &str) -> Result<()> {
        Err(Error::InvalidInstance(NULL))
    }

    async fn stop_host(&self, _id: &str) -> Result<()> {
        Err(Error::InvalidInstance(NULL))
    }

    async fn create_network(&self, _req: NetworkRequest) -> Result<Network> {
        Err(Error::InvalidInstance(NULL))
    }

    async fn inspect_network(&self, _id: &str) -> Result<Network> {
        Err(Error::InvalidInstance(NULL))
    }

    async fn list_networks(&self) -> Result<Vec<Network>> {
        Err(Error::InvalidInstance(NULL))
    }

    async fn delete_network(&self, _id: &str) -> Result<()> {
        Err(Error::InvalidInstance(NULL))
    }

    async fn create_volume(&self, _req: VolumeRequest) -> Result<Volume> {
        Err(Error::InvalidInstance(NULL))
    }

    async fn inspect_volume(&self, _id: &str) -> Result<Volume> {
        Err(Error::InvalidInstance(NULL))
    }

    async fn list_volumes(&self) -> Result<Vec<Volume>> {
        Err(Error::InvalidInstance(NULL))
    }

    async fn delete_volume(&self, _id: &str) -> Result<()> {
        Err(Error::InvalidInstance(NULL))
    }

    async fn exec_script(&self, _host_id: &str, _name: &str, _content: &str) -> Result<i32> {
        Err(Error::InvalidInstance(NULL))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_provider_rejects_everything() {
        let null = NullProvider;
        assert!(null.is_null());
        assert!(matches!(
            null.list_hosts().await,
            Err(Error::InvalidInstance(_))
        ));
        assert!(matches!(
            null.authentication_options(),
            Err(Error::InvalidInstance(_))
        ));
    }
}
