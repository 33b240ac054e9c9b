//! OpenStack provider configuration binding
//!
//! Maps tenant parameters onto authentication and configuration options,
//! applying the documented defaults. The Gophercloud-equivalent SDK binding
//! is a separate concern; resource calls on a daemon built without it
//! report `not-implemented` instead of panicking.

use std::sync::Arc;

use async_trait::async_trait;
use safescale_common::{defaults, Error, Result};
use serde_json::Value;

use crate::iaas::provider::{
    AuthenticationOptions, Capabilities, ConfigurationOptions, Provider,
};
use crate::iaas::resources::{
    HostCore, HostRequest, HostTemplate, Image, Network, NetworkRequest, Volume, VolumeRequest,
};

const PROVIDER_NAME: &str = "openstack";

const SDK_UNAVAILABLE: &str = "openstack compute binding is not linked in this build";

/// Pull a string out of a `section.key` path in tenant parameters.
pub(super) fn param_str(params: &Value, section: &str, key: &str) -> Option<String> {
    params
        .get(section)?
        .get(key)?
        .as_str()
        .map(|s| s.to_string())
}

/// OpenStack-derived provider bound to one tenant.
pub struct OpenStackProvider {
    auth: AuthenticationOptions,
    config: ConfigurationOptions,
    params: Value,
}

impl OpenStackProvider {
    /// Unbound template used by the factory table.
    pub fn template() -> Self {
        Self {
            auth: AuthenticationOptions::default(),
            config: ConfigurationOptions::default(),
            params: Value::Null,
        }
    }

    /// Map tenant parameters to options, applying documented defaults.
    pub(super) fn bind(params: &Value) -> Result<(AuthenticationOptions, ConfigurationOptions)> {
        let identity_endpoint = param_str(params, "identity", "IdentityEndpoint")
            .ok_or_else(|| {
                Error::invalid_parameter("params", "identity.IdentityEndpoint is required")
            })?;
        let username = param_str(params, "identity", "Username")
            .ok_or_else(|| Error::invalid_parameter("params", "identity.Username is required"))?;
        if param_str(params, "identity", "Password").is_none() {
            return Err(Error::invalid_parameter(
                "params",
                "identity.Password is required",
            ));
        }

        let auth = AuthenticationOptions {
            identity_endpoint,
            username,
            domain_name: param_str(params, "identity", "DomainName")
                .unwrap_or_else(|| "Default".to_string()),
        };

        let dns_servers = params
            .get("network")
            .and_then(|n| n.get("DNSServers"))
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|list| !list.is_empty())
            .unwrap_or_else(defaults::default_dns_servers);

        let config = ConfigurationOptions {
            region: param_str(params, "compute", "Region")
                .ok_or_else(|| Error::invalid_parameter("params", "compute.Region is required"))?,
            availability_zone: param_str(params, "compute", "AvailabilityZone")
                .unwrap_or_else(defaults::default_availability_zone),
            default_image: param_str(params, "compute", "DefaultImage").unwrap_or_default(),
            operator_username: param_str(params, "compute", "OperatorUsername")
                .unwrap_or_else(defaults::default_operator_username),
            dns_servers,
            provider_network: param_str(params, "network", "ProviderNetwork")
                .or_else(|| param_str(params, "network", "ExternalNetwork")),
            floating_ip_pool: param_str(params, "network", "FloatingIPPool"),
        };

        Ok((auth, config))
    }
}

#[async_trait]
impl Provider for OpenStackProvider {
    fn build(&self, params: &Value) -> Result<Arc<dyn Provider>> {
        let (auth, config) = Self::bind(params)?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params() -> Value {
        json!({
            "identity": {
                "IdentityEndpoint": "https://auth.example.com/v3",
                "Username": "operator",
                "Password": "secret",
            },
            "compute": {
                "Region": "RegionOne",
            },
        })
    }

    #[test]
    fn test_bind_applies_defaults() {
        let (auth, config) = OpenStackProvider::bind(&params()).unwrap();
        assert_eq!(auth.domain_name, "Default");
        assert_eq!(config.availability_zone, "nova");
        assert_eq!(config.dns_servers, vec!["8.8.8.8", "1.1.1.1"]);
        assert_eq!(config.operator_username, "safescale");
    }

    #[test]
    fn test_bind_requires_credentials() {
        let mut p = params();
        p["identity"].as_object_mut().unwrap().remove("Password");
        assert!(matches!(
            OpenStackProvider::bind(&p),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_bind_honors_overrides() {
        let mut p = params();
        p["compute"]["AvailabilityZone"] = json!("az-2");
        p["network"] = json!({"DNSServers": ["9.9.9.9"]});
        let (_, config) = OpenStackProvider::bind(&p).unwrap();
        assert_eq!(config.availability_zone, "az-2");
        assert_eq!(config.dns_servers, vec!["9.9.9.9"]);
    }
}
