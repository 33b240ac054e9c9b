//! Cluster listener

use safescale_common::{timeouts, Complexity, Error, Flavor};
use safescale_proto::{
    non_empty, ClusterCreateRequest, ClusterListResponse, ClusterNameRequest, ClusterResponse,
    ClusterStateResponse, Empty,
};
use tonic::{Request, Response, Status};
use tracing::warn;

use crate::cluster::ClusterRequest;
use crate::server::handlers::{ClusterHandler, ClusterSnapshot};

use super::{open_job, resolve_service, sizing_of, to_status, uuid_of};

/// Implements the cluster gRPC service.
#[derive(Default)]
pub struct ClusterListener;

fn wire_response(snapshot: ClusterSnapshot) -> ClusterResponse {
    ClusterResponse {
        name: snapshot.name,
        cidr: snapshot.cidr,
        flavor: snapshot.flavor,
        complexity: snapshot.complexity,
        state: snapshot.state,
        network_id: snapshot.network_id,
        master_ids: snapshot.masters,
        private_node_ids: snapshot.private_nodes,
        public_node_ids: snapshot.public_nodes,
    }
}

/// Open a job for a named-cluster operation, run one handler method under
/// it, and close the job.
macro_rules! with_cluster_job {
    ($request:expr, $desc:expr, $timeout:expr, $method:ident) => {{
        let uuid = uuid_of(&$request);
        let req = $request.into_inner();
        if req.name.is_empty() {
            warn!(input = ?req, "structure validation failure");
        }
        let service = resolve_service(non_empty(req.tenant.clone()).as_deref())?;
        let job = open_job(uuid, service, format!("{} '{}'", $desc, req.name), $timeout)?;
        let res = ClusterHandler::new(job.clone()).$method(&req.name).await;
        job.close();
        res.map_err(to_status)
    }};
}

#[tonic::async_trait]
impl safescale_proto::Cluster for ClusterListener {
    async fn create(
        &self,
        request: Request<ClusterCreateRequest>,
    ) -> Result<Response<ClusterResponse>, Status> {
        let uuid = uuid_of(&request);
        let req = request.into_inner();
        if req.name.is_empty() || req.cidr.is_empty() {
            warn!(input = ?req, "structure validation failure");
        }

        let flavor: Flavor = req
            .flavor
            .parse()
            .map_err(|e: safescale_common::flavor::ParseFlavorError| {
                to_status(Error::invalid_parameter("flavor", e.to_string()))
            })?;
        let complexity: Complexity = req
            .complexity
            .parse()
            .map_err(|e: safescale_common::complexity::ParseComplexityError| {
                to_status(Error::invalid_parameter("complexity", e.to_string()))
            })?;

        let service = resolve_service(non_empty(req.tenant.clone()).as_deref())?;
        let job = open_job(
            uuid,
            service,
            format!("cluster create '{}'", req.name),
            timeouts::long_operation_timeout(),
        )?;
        let res = ClusterHandler::new(job.clone())
            .create(ClusterRequest {
                name: req.name,
                cidr: req.cidr,
                flavor,
                complexity,
                network_id: non_empty(req.network_id),
                node_sizing: sizing_of(req.node_sizing),
            })
            .await;
        job.close();

        res.map(wire_response).map(Response::new).map_err(to_status)
    }

    async fn list(
        &self,
        request: Request<Empty>,
    ) -> Result<Response<ClusterListResponse>, Status> {
        let uuid = uuid_of(&request);
        let service = resolve_service(None)?;
        let job = open_job(
            uuid,
            service,
            "cluster list".to_string(),
            timeouts::context_timeout(),
        )?;
        let handler = ClusterHandler::new(job.clone());

        let res = async {
            let mut clusters = Vec::new();
            for name in handler.list().await? {
                clusters.push(wire_response(handler.inspect(&name).await?));
            }
            Ok(clusters)
        }
        .await;
        job.close();

        res.map(|clusters| Response::new(ClusterListResponse { clusters }))
            .map_err(to_status)
    }

    async fn inspect(
        &self,
        request: Request<ClusterNameRequest>,
    ) -> Result<Response<ClusterResponse>, Status> {
        with_cluster_job!(request, "cluster inspect", timeouts::context_timeout(), inspect)
        .map(wire_response)
        .map(Response::new)
    }

    async fn delete(
        &self,
        request: Request<ClusterNameRequest>,
    ) -> Result<Response<Empty>, Status> {
        with_cluster_job!(request, "cluster delete", timeouts::host_cleanup_timeout(), delete)
        .map(|()| Response::new(Empty {}))
    }

    async fn start(
        &self,
        request: Request<ClusterNameRequest>,
    ) -> Result<Response<Empty>, Status> {
        with_cluster_job!(request, "cluster start", timeouts::long_operation_timeout(), start)
        .map(|()| Response::new(Empty {}))
    }

    async fn stop(
        &self,
        request: Request<ClusterNameRequest>,
    ) -> Result<Response<Empty>, Status> {
        with_cluster_job!(request, "cluster stop", timeouts::long_operation_timeout(), stop)
        .map(|()| Response::new(Empty {}))
    }

    async fn state(
        &self,
        request: Request<ClusterNameRequest>,
    ) -> Result<Response<ClusterStateResponse>, Status> {
        with_cluster_job!(request, "cluster state", timeouts::context_timeout(), state)
        .map(|state| {
            Response::new(ClusterStateResponse {
                state: state.to_string(),
            })
        })
    }
}
