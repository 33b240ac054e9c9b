//! Cluster handler

use std::sync::Arc;

use safescale_common::{ClusterState, HostDefinition, Result};
use tracing::error;

use crate::cluster::control::Foreman;
use crate::cluster::{self, ClusterRequest};
use crate::concurrency::Task;
use crate::server::Job;

/// Read view of a cluster returned to the listener layer.
#[derive(Debug, Clone)]
pub struct ClusterSnapshot {
    pub name: String,
    pub cidr: String,
    pub flavor: String,
    pub complexity: String,
    pub state: String,
    pub network_id: String,
    pub masters: Vec<String>,
    pub private_nodes: Vec<String>,
    pub public_nodes: Vec<String>,
}

/// Cluster operations bound to one job.
pub struct ClusterHandler {
    job: Arc<Job>,
}

impl ClusterHandler {
    pub fn new(job: Arc<Job>) -> Self {
        Self { job }
    }

    fn task(&self) -> &Task {
        self.job.task()
    }

    fn boundary(&self, context: &'static str) -> impl Fn(safescale_common::Error) -> safescale_common::Error + '_ {
        move |e| {
            let e = e.with_context(context);
            error!(job = %self.job.id(), error = %e, "cluster operation failed");
            e
        }
    }

    async fn foreman(&self, name: &str) -> Result<Foreman> {
        let controller =
            cluster::load(self.task(), self.job.service().clone(), name).await?;
        Ok(Foreman::new(controller))
    }

    async fn snapshot_of(
        &self,
        controller: &crate::cluster::control::Controller,
    ) -> Result<ClusterSnapshot> {
        let task = self.task();
        let nodes = controller.nodes_snapshot(task).await?;
        let network = controller.network_config(task).await?;
        let state = controller.state(task).await?;
        Ok(ClusterSnapshot {
            name: controller.name().to_string(),
            cidr: controller.cidr().to_string(),
            flavor: controller.flavor().to_string(),
            complexity: controller.complexity().to_string(),
            state: state.to_string(),
            network_id: network.network_id,
            masters: nodes.masters,
            private_nodes: nodes.private_nodes,
            public_nodes: nodes.public_nodes,
        })
    }

    pub async fn create(&self, req: ClusterRequest) -> Result<ClusterSnapshot> {
        let controller = cluster::create(self.task(), self.job.service().clone(), req)
            .await
            .map_err(self.boundary("cannot create cluster"))?;
        self.snapshot_of(&controller).await
    }

    pub async fn list(&self) -> Result<Vec<String>> {
        cluster::list(self.job.service())
            .await
            .map_err(self.boundary("cannot list clusters"))
    }

    pub async fn inspect(&self, name: &str) -> Result<ClusterSnapshot> {
        let controller = cluster::load(self.task(), self.job.service().clone(), name)
            .await
            .map_err(self.boundary("cannot inspect cluster"))?;
        self.snapshot_of(&controller).await
    }

    pub async fn state(&self, name: &str) -> Result<ClusterState> {
        let foreman = self.foreman(name).await?;
        foreman
            .cluster()
            .state(self.task())
            .await
            .map_err(self.boundary("cannot get cluster state"))
    }

    pub async fn start(&self, name: &str) -> Result<()> {
        let foreman = self.foreman(name).await?;
        foreman
            .start(self.task())
            .await
            .map_err(self.boundary("cannot start cluster"))
    }

    pub async fn stop(&self, name: &str) -> Result<()> {
        let foreman = self.foreman(name).await?;
        foreman
            .stop(self.task())
            .await
            .map_err(self.boundary("cannot stop cluster"))
    }

    pub async fn delete(&self, name: &str) -> Result<()> {
        let foreman = self.foreman(name).await?;
        foreman
            .delete(self.task())
            .await
            .map_err(self.boundary("cannot delete cluster"))
    }

    pub async fn add_node(
        &self,
        name: &str,
        public: bool,
        sizing: Option<HostDefinition>,
    ) -> Result<String> {
        let foreman = self.foreman(name).await?;
        foreman
            .add_node(self.task(), public, sizing)
            .await
            .map_err(self.boundary("cannot add node"))
    }

    pub async fn delete_node(
        &self,
        name: &str,
        host_id: Option<&str>,
        public: bool,
    ) -> Result<()> {
        let foreman = self.foreman(name).await?;
        match host_id {
            Some(id) => foreman.delete_specific_node(self.task(), id).await,
            None => foreman.delete_last_node(self.task(), public).await,
        }
        .map_err(self.boundary("cannot delete node"))
    }

    pub async fn list_nodes(&self, name: &str, public: bool) -> Result<Vec<String>> {
        let foreman = self.foreman(name).await?;
        let nodes = foreman
            .cluster()
            .nodes_snapshot(self.task())
            .await
            .map_err(self.boundary("cannot list nodes"))?;
        Ok(if public {
            nodes.public_nodes
        } else {
            nodes.private_nodes
        })
    }

    pub async fn count_nodes(&self, name: &str, public: bool) -> Result<u32> {
        let foreman = self.foreman(name).await?;
        foreman
            .count_nodes(self.task(), public)
            .await
            .map_err(self.boundary("cannot count nodes"))
    }
}
