//! Template handler

use std::sync::Arc;

use safescale_common::Result;
use tracing::error;

use crate::iaas::resources::HostTemplate;
use crate::server::Job;

/// Lists the instance templates the tenant's provider offers.
pub struct TemplateHandler {
    job: Arc<Job>,
}

impl TemplateHandler {
    pub fn new(job: Arc<Job>) -> Self {
        Self { job }
    }

    pub async fn list(&self, all: bool) -> Result<Vec<HostTemplate>> {
        self.job
            .service()
            .provider()
            .list_templates(all)
            .await
            .map_err(|e| {
                let e = e.with_context("cannot list templates");
                error!(job = %self.job.id(), error = %e, "template listing failed");
                e
            })
    }
}
