//! Template listener

use safescale_proto::{HostTemplate, TemplateListRequest, TemplateListResponse};
use tonic::{Request, Response, Status};

use safescale_common::timeouts;

use crate::server::handlers::TemplateHandler;

use super::{open_job, resolve_service, to_status, uuid_of};

/// Implements the template gRPC service.
#[derive(Default)]
pub struct TemplateListener;

#[tonic::async_trait]
impl safescale_proto::Template for TemplateListener {
    async fn list(
        &self,
        request: Request<TemplateListRequest>,
    ) -> Result<Response<TemplateListResponse>, Status> {
        let uuid = uuid_of(&request);
        let req = request.into_inner();

        let service = resolve_service(None)?;
        let job = open_job(
            uuid,
            service,
            "template list".to_string(),
            timeouts::context_timeout(),
        )?;
        let res = TemplateHandler::new(job.clone()).list(req.all).await;
        job.close();

        let templates = res
            .map_err(to_status)?
            .into_iter()
            .map(|t| HostTemplate {
                id: t.id,
                name: t.name,
                cores: t.cores,
                ram_size: t.ram_size,
                disk_size: t.disk_size,
                gpu_count: t.gpu_count,
            })
            .collect();
        Ok(Response::new(TemplateListResponse { templates }))
    }
}
