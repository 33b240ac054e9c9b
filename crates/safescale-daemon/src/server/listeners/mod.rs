//! gRPC entry points
//!
//! Each listener method follows the same shape: extract the correlation
//! uuid from the request metadata, resolve the service (tenant override or
//! current tenant), open a [`Job`], delegate to a handler, close the job,
//! and convert the error taxonomy to a gRPC status. Input structs with
//! anomalies are warned about but not rejected, to tolerate front-end
//! schema drift.

mod cluster;
mod job;
mod node;
mod template;
mod tenant;

pub use cluster::ClusterListener;
pub use job::JobListener;
pub use node::NodeListener;
pub use template::TemplateListener;
pub use tenant::TenantListener;

use std::sync::Arc;
use std::time::Duration;

use safescale_common::{Error, HostDefinition};
use tonic::{Request, Status};

use crate::iaas::{tenancy, Service};
use crate::server::Job;

/// Extract the correlation uuid carried by the gRPC metadata, if any.
pub(super) fn uuid_of<T>(request: &Request<T>) -> Option<String> {
    request
        .metadata()
        .get("uuid")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Convert the error taxonomy to a gRPC status at the boundary.
pub(super) fn to_status(err: Error) -> Status {
    match &err {
        Error::InvalidParameter { .. } => Status::invalid_argument(err.to_string()),
        Error::NotFound(_) => Status::not_found(err.to_string()),
        Error::Duplicate(_) => Status::already_exists(err.to_string()),
        Error::Aborted(_) => Status::cancelled(err.to_string()),
        Error::Timeout(_) => Status::deadline_exceeded(err.to_string()),
        Error::NotImplemented(_) => Status::unimplemented(err.to_string()),
        Error::InconsistentState(_) | Error::NotOwner { .. } => {
            Status::failed_precondition(err.to_string())
        }
        Error::InvalidInstance(_)
        | Error::Syntax(_)
        | Error::AlteredNothing
        | Error::Provider { .. } => Status::internal(err.to_string()),
    }
}

/// Resolve the service a request runs against: an explicit tenant override
/// when present, the current tenant otherwise.
pub(super) fn resolve_service(tenant: Option<&str>) -> Result<Arc<Service>, Status> {
    match tenant {
        Some(name) if !name.is_empty() => tenancy::use_service(name).map_err(to_status),
        _ => tenancy::current_tenant()
            .map(|t| t.service)
            .ok_or_else(|| Status::failed_precondition("no tenant set")),
    }
}

/// Open a job for a request, arming the named timeout for the operation
/// family on its root task.
pub(super) fn open_job(
    uuid: Option<String>,
    service: Arc<Service>,
    description: String,
    deadline: Duration,
) -> Result<Arc<Job>, Status> {
    let job = Job::new(uuid, service, description).map_err(to_status)?;
    job.task().set_deadline(deadline).map_err(to_status)?;
    Ok(job)
}

/// Convert a wire sizing to a host definition; `None` when absent.
pub(super) fn sizing_of(sizing: Option<safescale_proto::HostSizing>) -> Option<HostDefinition> {
    sizing.map(|s| HostDefinition {
        cores: s.cores,
        ram_size: s.ram_size,
        disk_size: s.disk_size,
        gpu_count: s.gpu_count,
        gpu_type: s.gpu_type,
        cpu_freq: s.cpu_freq,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            to_status(Error::not_found("x")).code(),
            tonic::Code::NotFound
        );
        assert_eq!(
            to_status(Error::duplicate("x")).code(),
            tonic::Code::AlreadyExists
        );
        assert_eq!(
            to_status(Error::Aborted("x".to_string())).code(),
            tonic::Code::Cancelled
        );
        assert_eq!(
            to_status(Error::invalid_parameter("p", "r")).code(),
            tonic::Code::InvalidArgument
        );
        assert_eq!(
            to_status(Error::Timeout("x".to_string())).code(),
            tonic::Code::DeadlineExceeded
        );
    }
}
