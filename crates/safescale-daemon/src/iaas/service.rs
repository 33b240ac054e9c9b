//! Service: a bound provider plus its metadata bucket
//!
//! The [`Service`] is what handlers and the cluster control plane talk to.
//! It owns the metadata bucket for the tenant and adds the lifecycle
//! policies the raw provider does not carry: bounded retries on transient
//! errors and operation timeouts.

use std::sync::Arc;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use safescale_common::{timeouts, Error, Result};
use tracing::warn;
use uuid::Uuid;

use super::objectstorage::ObjectStorage;
use super::provider::Provider;
use super::resources::{HostCore, HostRequest, Network, NetworkRequest};

/// A provider bound to one tenant, plus the tenant's metadata bucket.
pub struct Service {
    tenant_name: String,
    provider: Arc<dyn Provider>,
    storage: Arc<dyn ObjectStorage>,
    bucket_name: String,
}

/// Derive the stable metadata bucket name for a tenant.
///
/// The name must survive process restarts and never collide across tenants,
/// so it is a name-based (v5) UUID over the identifying tuple.
pub fn build_metadata_bucket_name(
    provider_name: &str,
    region: &str,
    domain: &str,
    project: &str,
) -> String {
    let tuple = format!("{provider_name}|{region}|{domain}|{project}");
    let id = Uuid::new_v5(&Uuid::NAMESPACE_URL, tuple.as_bytes());
    format!("0.safescale-{}", id.simple())
}

impl Service {
    pub fn new(
        tenant_name: impl Into<String>,
        provider: Arc<dyn Provider>,
        storage: Arc<dyn ObjectStorage>,
        bucket_name: impl Into<String>,
    ) -> Self {
        Self {
            tenant_name: tenant_name.into(),
            provider,
            storage,
            bucket_name: bucket_name.into(),
        }
    }

    pub fn tenant_name(&self) -> &str {
        &self.tenant_name
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn storage(&self) -> &Arc<dyn ObjectStorage> {
        &self.storage
    }

    pub fn bucket_name(&self) -> &str {
        &self.bucket_name
    }

    /// Backoff policy for transient provider errors, bounded by the
    /// long-operation timeout.
    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(timeouts::min_delay())
            .with_max_delay(timeouts::big_delay())
            .with_max_times(5)
    }

    async fn timed<T>(
        &self,
        what: &str,
        limit: Duration,
        fut: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| Error::Timeout(format!("{what} did not complete within {limit:?}")))?
    }

    /// Create a host, retrying transient failures, bounded by the host
    /// creation timeout.
    pub async fn create_host(&self, req: HostRequest) -> Result<HostCore> {
        let provider = self.provider.clone();
        self.timed("host creation", timeouts::host_timeout(), async {
            (|| {
                let provider = provider.clone();
                let req = req.clone();
                async move { provider.create_host(req).await }
            })
            .retry(self.backoff())
            .when(Error::is_transient)
            .notify(|err, dur| warn!(error = %err, retry_in = ?dur, "transient provider error"))
            .await
        })
        .await
    }

    /// Delete a host, bounded by the cleanup timeout.
    pub async fn delete_host(&self, id: &str) -> Result<()> {
        let provider = self.provider.clone();
        self.timed("host deletion", timeouts::host_cleanup_timeout(), async {
            (|| {
                let provider = provider.clone();
                let id = id.to_string();
                async move { provider.delete_host(&id).await }
            })
            .retry(self.backoff())
            .when(Error::is_transient)
            .await
        })
        .await
    }

    /// Create a network, retrying transient failures.
    pub async fn create_network(&self, req: NetworkRequest) -> Result<Network> {
        let provider = self.provider.clone();
        (|| {
            let provider = provider.clone();
            let req = req.clone();
            async move { provider.create_network(req).await }
        })
        .retry(self.backoff())
        .when(Error::is_transient)
        .await
    }

    /// Drop every object under this tenant's metadata bucket.
    ///
    /// Without `force`, cleanup refuses to run while clusters are still
    /// recorded, so a typo cannot orphan live infrastructure.
    pub async fn tenant_cleanup(&self, force: bool) -> Result<()> {
        if !force {
            let clusters = self.storage.list("clusters/").await?;
            if !clusters.is_empty() {
                return Err(Error::InconsistentState(format!(
                    "tenant '{}' still owns {} cluster record(s); use force to discard them",
                    self.tenant_name,
                    clusters.len()
                )));
            }
        }
        for key in self.storage.list("").await? {
            self.storage.delete(&key).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_name_is_stable() {
        let a = build_metadata_bucket_name("openstack", "GRA5", "Default", "p1");
        let b = build_metadata_bucket_name("openstack", "GRA5", "Default", "p1");
        assert_eq!(a, b);
        assert!(a.starts_with("0.safescale-"));
    }

    #[test]
    fn test_bucket_name_distinguishes_tenants() {
        let a = build_metadata_bucket_name("openstack", "GRA5", "Default", "p1");
        let b = build_metadata_bucket_name("openstack", "GRA5", "Default", "p2");
        let c = build_metadata_bucket_name("openstack", "SBG3", "Default", "p1");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }
}
