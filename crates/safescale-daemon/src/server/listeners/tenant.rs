//! Tenant listener

use safescale_proto::{
    Empty, TenantCleanupRequest, TenantEntry, TenantInspectResponse, TenantList, TenantName,
};
use tonic::{Request, Response, Status};
use tracing::warn;

use safescale_common::timeouts;

use crate::iaas::tenancy;
use crate::server::handlers::TenantHandler;

use super::{open_job, resolve_service, to_status, uuid_of};

/// Implements the tenant gRPC service.
#[derive(Default)]
pub struct TenantListener;

#[tonic::async_trait]
impl safescale_proto::Tenant for TenantListener {
    async fn list(&self, _request: Request<Empty>) -> Result<Response<TenantList>, Status> {
        let tenants = tenancy::tenant_names()
            .into_iter()
            .map(|(name, provider)| TenantEntry { name, provider })
            .collect();
        Ok(Response::new(TenantList { tenants }))
    }

    async fn get(&self, _request: Request<Empty>) -> Result<Response<TenantName>, Status> {
        match tenancy::current_tenant() {
            Some(tenant) => Ok(Response::new(TenantName { name: tenant.name })),
            None => Err(Status::not_found("no tenant set")),
        }
    }

    async fn set(&self, request: Request<TenantName>) -> Result<Response<Empty>, Status> {
        let req = request.into_inner();
        if req.name.is_empty() {
            warn!(input = ?req, "structure validation failure");
        }
        tenancy::set_current_tenant(&req.name)
            .map_err(|e| to_status(e.with_context("cannot set tenant")))?;
        Ok(Response::new(Empty {}))
    }

    async fn inspect(
        &self,
        request: Request<TenantName>,
    ) -> Result<Response<TenantInspectResponse>, Status> {
        let uuid = uuid_of(&request);
        let req = request.into_inner();
        if req.name.is_empty() {
            warn!(input = ?req, "structure validation failure");
        }

        let service = resolve_service(Some(&req.name))?;
        let job = open_job(
            uuid,
            service,
            format!("tenant inspect '{}'", req.name),
            timeouts::context_timeout(),
        )?;
        let (name, provider, metadata_bucket) = TenantHandler::new(job.clone()).inspect();
        job.close();

        Ok(Response::new(TenantInspectResponse {
            name,
            provider,
            metadata_bucket,
        }))
    }

    async fn scan(&self, request: Request<TenantName>) -> Result<Response<Empty>, Status> {
        let req = request.into_inner();
        if req.name.is_empty() {
            warn!(input = ?req, "structure validation failure");
        }
        // Template scanning probes candidate hosts through the scanner
        // binding, which is not part of this build.
        Err(to_status(safescale_common::Error::NotImplemented(
            "tenant scan is not available in this build",
        )))
    }

    async fn cleanup(
        &self,
        request: Request<TenantCleanupRequest>,
    ) -> Result<Response<Empty>, Status> {
        let uuid = uuid_of(&request);
        let req = request.into_inner();
        if req.name.is_empty() {
            warn!(input = ?req, "structure validation failure");
        }

        let service = resolve_service(Some(&req.name))?;
        let job = open_job(
            uuid,
            service,
            format!("tenant cleanup '{}'", req.name),
            timeouts::host_cleanup_timeout(),
        )?;
        let res = TenantHandler::new(job.clone()).cleanup(req.force).await;
        job.close();

        res.map_err(to_status)?;
        Ok(Response::new(Empty {}))
    }
}
