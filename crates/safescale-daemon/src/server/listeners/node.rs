//! Node listener

use safescale_proto::{
    non_empty, Empty, NodeAddRequest, NodeCountResponse, NodeDeleteRequest, NodeListRequest,
    NodeListResponse, NodeResponse,
};
use tonic::{Request, Response, Status};
use tracing::warn;

use safescale_common::timeouts;

use crate::server::handlers::ClusterHandler;

use super::{open_job, resolve_service, sizing_of, to_status, uuid_of};

/// Implements the node gRPC service.
#[derive(Default)]
pub struct NodeListener;

#[tonic::async_trait]
impl safescale_proto::Node for NodeListener {
    async fn add(
        &self,
        request: Request<NodeAddRequest>,
    ) -> Result<Response<NodeResponse>, Status> {
        let uuid = uuid_of(&request);
        let req = request.into_inner();
        if req.cluster.is_empty() {
            warn!(input = ?req, "structure validation failure");
        }

        let service = resolve_service(None)?;
        let job = open_job(
            uuid,
            service,
            format!("node add to '{}'", req.cluster),
            timeouts::long_operation_timeout(),
        )?;
        let res = ClusterHandler::new(job.clone())
            .add_node(&req.cluster, req.public, sizing_of(req.sizing))
            .await;
        job.close();

        let host_id = res.map_err(to_status)?;
        Ok(Response::new(NodeResponse {
            name: host_id.clone(),
            host_id,
        }))
    }

    async fn delete(
        &self,
        request: Request<NodeDeleteRequest>,
    ) -> Result<Response<Empty>, Status> {
        let uuid = uuid_of(&request);
        let req = request.into_inner();
        if req.cluster.is_empty() {
            warn!(input = ?req, "structure validation failure");
        }

        let service = resolve_service(None)?;
        let job = open_job(
            uuid,
            service,
            format!("node delete from '{}'", req.cluster),
            timeouts::host_cleanup_timeout(),
        )?;
        let res = ClusterHandler::new(job.clone())
            .delete_node(
                &req.cluster,
                non_empty(req.host_id).as_deref(),
                req.public,
            )
            .await;
        job.close();

        res.map_err(to_status)?;
        Ok(Response::new(Empty {}))
    }

    async fn list(
        &self,
        request: Request<NodeListRequest>,
    ) -> Result<Response<NodeListResponse>, Status> {
        let uuid = uuid_of(&request);
        let req = request.into_inner();
        if req.cluster.is_empty() {
            warn!(input = ?req, "structure validation failure");
        }

        let service = resolve_service(None)?;
        let job = open_job(
            uuid,
            service,
            format!("node list of '{}'", req.cluster),
            timeouts::context_timeout(),
        )?;
        let res = ClusterHandler::new(job.clone())
            .list_nodes(&req.cluster, req.public)
            .await;
        job.close();

        res.map(|host_ids| Response::new(NodeListResponse { host_ids }))
            .map_err(to_status)
    }

    async fn count(
        &self,
        request: Request<NodeListRequest>,
    ) -> Result<Response<NodeCountResponse>, Status> {
        let uuid = uuid_of(&request);
        let req = request.into_inner();
        if req.cluster.is_empty() {
            warn!(input = ?req, "structure validation failure");
        }

        let service = resolve_service(None)?;
        let job = open_job(
            uuid,
            service,
            format!("node count of '{}'", req.cluster),
            timeouts::context_timeout(),
        )?;
        let res = ClusterHandler::new(job.clone())
            .count_nodes(&req.cluster, req.public)
            .await;
        job.close();

        res.map(|count| Response::new(NodeCountResponse { count }))
            .map_err(to_status)
    }
}
