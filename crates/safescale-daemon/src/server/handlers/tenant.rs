//! Tenant handler

use std::sync::Arc;

use safescale_common::Result;
use tracing::error;

use crate::server::Job;

/// Tenant operations that need a bound service.
pub struct TenantHandler {
    job: Arc<Job>,
}

impl TenantHandler {
    pub fn new(job: Arc<Job>) -> Self {
        Self { job }
    }

    /// Describe the tenant the job is bound to.
    pub fn inspect(&self) -> (String, String, String) {
        let service = self.job.service();
        (
            service.tenant_name().to_string(),
            service.provider_name().to_string(),
            service.bucket_name().to_string(),
        )
    }

    /// Drop all daemon-managed metadata of the tenant.
    pub async fn cleanup(&self, force: bool) -> Result<()> {
        self.job
            .service()
            .tenant_cleanup(force)
            .await
            .map_err(|e| {
                let e = e.with_context("cannot clean up tenant");
                error!(job = %self.job.id(), error = %e, "tenant cleanup failed");
                e
            })
    }
}
