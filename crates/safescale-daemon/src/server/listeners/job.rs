//! Job listener
//!
//! Operates on the process-wide job registry directly: listing and aborting
//! in-flight jobs must work even when no tenant is selected.

use safescale_proto::{Empty, JobEntry, JobListResponse, JobStopRequest};
use tonic::{Request, Response, Status};
use tracing::warn;

use crate::server::job;

use super::to_status;

/// Implements the job gRPC service.
#[derive(Default)]
pub struct JobListener;

#[tonic::async_trait]
impl safescale_proto::Job for JobListener {
    async fn list(
        &self,
        _request: Request<Empty>,
    ) -> Result<Response<JobListResponse>, Status> {
        let jobs = job::list_jobs()
            .into_iter()
            .map(|(uuid, description)| JobEntry { uuid, description })
            .collect();
        Ok(Response::new(JobListResponse { jobs }))
    }

    async fn stop(
        &self,
        request: Request<JobStopRequest>,
    ) -> Result<Response<Empty>, Status> {
        let req = request.into_inner();
        if req.uuid.is_empty() {
            warn!(input = ?req, "structure validation failure");
        }
        job::abort_job_by_id(&req.uuid)
            .map_err(|e| to_status(e.with_context("cannot stop job")))?;
        Ok(Response::new(Empty {}))
    }
}
