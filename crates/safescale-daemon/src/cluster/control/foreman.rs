//! Cluster lifecycle driver
//!
//! The foreman composes provider CRUD and script execution into the cluster
//! lifecycle: provisioning, scaling, stop/start and teardown. Every step
//! runs under the caller's task: lock acquisitions and provider calls are
//! suspension points, so an aborted job issues no further provider writes.

use std::sync::Arc;

use safescale_common::{ClusterState, Error, HostDefinition, NodeType, Result};
use tracing::{info, warn};

use crate::cluster::properties::{ClusterDefaults, ClusterNetwork};
use crate::cluster::scripts::TemplateData;
use crate::cluster::{metadata, ClusterRequest};
use crate::concurrency::{Task, TaskPayload};
use crate::iaas::resources::{HostRequest, NetworkRequest};

use super::controller::Controller;

/// Drives the generic lifecycle of one cluster.
#[derive(Clone)]
pub struct Foreman {
    controller: Arc<Controller>,
}

impl Foreman {
    pub fn new(controller: Arc<Controller>) -> Self {
        Self { controller }
    }

    /// The cluster this foreman drives; makers read identity through it.
    pub fn cluster(&self) -> &Controller {
        &self.controller
    }

    // ── Makers resolution (generic defaults for unset hooks) ───────────

    pub fn minimum_required_servers(&self, task: &Task) -> (u32, u32, u32) {
        match self.controller.makers().minimum_required_servers {
            Some(hook) => hook(task, self),
            None => (1, 1, 0),
        }
    }

    fn gateway_sizing(&self, task: &Task) -> HostDefinition {
        match self.controller.makers().default_gateway_sizing {
            Some(hook) => hook(task, self),
            None => HostDefinition {
                cores: 2,
                ram_size: 7.0,
                disk_size: 50,
                ..Default::default()
            },
        }
    }

    fn master_sizing(&self, task: &Task) -> HostDefinition {
        match self.controller.makers().default_master_sizing {
            Some(hook) => hook(task, self),
            None => HostDefinition {
                cores: 4,
                ram_size: 15.0,
                disk_size: 100,
                ..Default::default()
            },
        }
    }

    fn node_sizing(&self, task: &Task) -> HostDefinition {
        match self.controller.makers().default_node_sizing {
            Some(hook) => hook(task, self),
            None => HostDefinition {
                cores: 4,
                ram_size: 15.0,
                disk_size: 100,
                ..Default::default()
            },
        }
    }

    fn image(&self, task: &Task) -> String {
        match self.controller.makers().default_image {
            Some(hook) => hook(task, self),
            None => "Ubuntu 18.04".to_string(),
        }
    }

    /// The standard substitution environment every script receives.
    pub fn script_env(&self) -> TemplateData {
        let c = &self.controller;
        TemplateData::from([
            ("CIDR".to_string(), c.cidr().to_string()),
            ("CladmPassword".to_string(), c.admin_password().to_string()),
            ("SSHPublicKey".to_string(), c.keypair().public_key.clone()),
            ("SSHPrivateKey".to_string(), c.keypair().private_key.clone()),
        ])
    }

    // ── Provisioning ────────────────────────────────────────────────────

    /// Drive the cluster from `Created` to `Nominal`.
    ///
    /// On failure the cluster is marked `Error` and its residue kept for
    /// inspection; deletion is the reconciliation path. The error state is
    /// recorded under a fresh task because the job task may already be
    /// cancelled.
    pub async fn construct(&self, task: &Task, req: &ClusterRequest) -> Result<()> {
        match self.provision(task, req).await {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(cluster = %self.controller.name(), error = %err,
                      "provisioning failed, marking cluster Error");
                let bookkeeper = Task::new();
                if let Err(record_err) = self
                    .controller
                    .set_state(&bookkeeper, ClusterState::Error)
                    .await
                {
                    warn!(cluster = %self.controller.name(), error = %record_err,
                          "could not record Error state");
                }
                Err(err)
            }
        }
    }

    async fn provision(&self, task: &Task, req: &ClusterRequest) -> Result<()> {
        let c = &self.controller;
        let service = c.service().clone();

        task.check_abort()?;
        c.set_state(task, ClusterState::Starting).await?;

        // Resolve sizing defaults before creating anything, so the defaults
        // witness records what the cluster was actually provisioned with.
        let gateway_sizing = self.gateway_sizing(task);
        let master_sizing = self.master_sizing(task);
        let node_sizing = match &req.node_sizing {
            Some(sizing) => sizing.clone().complete_with(&self.node_sizing(task)),
            None => self.node_sizing(task),
        };
        let image = self.image(task);
        c.set_defaults(
            task,
            ClusterDefaults {
                gateway_sizing: (&gateway_sizing).into(),
                master_sizing: (&master_sizing).into(),
                node_sizing: (&node_sizing).into(),
                image: image.clone(),
            },
        )
        .await?;

        // Network and gateway
        task.check_abort()?;
        let network_id = match &req.network_id {
            Some(id) => {
                task.run_cancellable(service.provider().inspect_network(id))
                    .await
                    .map_err(|e| e.with_context("cannot attach to requested network"))?;
                id.clone()
            }
            None => {
                let network = task
                    .run_cancellable(service.create_network(NetworkRequest {
                        name: format!("net-{}", c.name()),
                        cidr: c.cidr().to_string(),
                        dns_servers: safescale_common::defaults::default_dns_servers(),
                    }))
                    .await?;
                network.id
            }
        };

        task.check_abort()?;
        let gateway = task
            .run_cancellable(service.create_host(HostRequest {
                resource_name: format!("gw-{}", c.name()),
                image: image.clone(),
                sizing: gateway_sizing,
                network_id: network_id.clone(),
                public_ip: true,
            }))
            .await?;
        c.set_network(
            task,
            ClusterNetwork {
                network_id,
                gateway_id: gateway.id.clone(),
                cidr: c.cidr().to_string(),
            },
        )
        .await?;
        self.install_requirements(task, &gateway.id).await?;
        info!(cluster = %c.name(), gateway = %gateway.id, "gateway provisioned");

        // Members, in dependency order
        let (masters, privates, publics) = self.minimum_required_servers(task);
        self.create_members(task, NodeType::Master, masters, &master_sizing, &image)
            .await?;
        self.create_members(task, NodeType::PrivateNode, privates, &node_sizing, &image)
            .await?;
        self.create_members(task, NodeType::PublicNode, publics, &node_sizing, &image)
            .await?;

        c.set_state(task, ClusterState::Nominal).await?;
        info!(cluster = %c.name(), "cluster is Nominal");
        Ok(())
    }

    /// Create `count` members of one kind through child tasks.
    ///
    /// Members that were successfully created are recorded even when a
    /// sibling fails, so a later deletion can reap them.
    async fn create_members(
        &self,
        task: &Task,
        node_type: NodeType,
        count: u32,
        sizing: &HostDefinition,
        image: &str,
    ) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        task.check_abort()?;

        let first_index = self
            .controller
            .allocate_member_indices(task, node_type, count)
            .await?;

        let mut children = Vec::with_capacity(count as usize);
        for i in 0..count {
            let child = task.child()?;
            let foreman = self.clone();
            let sizing = sizing.clone();
            let image = image.to_string();
            let index = first_index + i;
            child.start(move |t| async move {
                let id = foreman.create_member(&t, node_type, index, sizing, image).await?;
                Ok(Box::new(id) as TaskPayload)
            })?;
            children.push(child);
        }

        let mut created = Vec::new();
        let mut first_err = None;
        for child in children {
            match child.wait().await {
                Ok(payload) => match payload.downcast::<String>() {
                    Ok(id) => created.push(*id),
                    Err(_) => {
                        first_err.get_or_insert(Error::InconsistentState(
                            "member creation returned an unexpected payload".to_string(),
                        ));
                    }
                },
                Err(err) => {
                    first_err.get_or_insert(err);
                }
            }
        }

        // Record what exists under a fresh task if ours was cancelled.
        let recorder = if task.aborted() { Task::new() } else { task.clone() };
        self.controller
            .add_member_ids(&recorder, node_type, created)
            .await?;

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Create one cluster member and run its installation script.
    async fn create_member(
        &self,
        task: &Task,
        node_type: NodeType,
        index: u32,
        sizing: HostDefinition,
        image: String,
    ) -> Result<String> {
        let c = &self.controller;
        task.check_abort()?;

        let network = c.network_config(task).await?;
        let name = format!("{}-{}-{}", c.name(), node_type, index);
        let host = task
            .run_cancellable(c.service().create_host(HostRequest {
                resource_name: name,
                image,
                sizing,
                network_id: network.network_id.clone(),
                public_ip: matches!(node_type, NodeType::PublicNode),
            }))
            .await?;

        self.run_installation_script(task, &host.id, node_type)
            .await?;
        Ok(host.id)
    }

    // ── Script execution ────────────────────────────────────────────────

    async fn install_requirements(&self, task: &Task, host_id: &str) -> Result<()> {
        let Some(hook) = self.controller.makers().get_global_system_requirements else {
            return Ok(());
        };
        let script = hook(task, self)?;
        self.exec_on_host(task, host_id, "install_requirements.sh", &script)
            .await
    }

    async fn run_installation_script(
        &self,
        task: &Task,
        host_id: &str,
        node_type: NodeType,
    ) -> Result<()> {
        let makers = self.controller.makers();
        let Some(hook) = makers.get_node_installation_script else {
            return Ok(());
        };
        let (script_name, mut data) = hook(task, self, node_type);
        if script_name.is_empty() {
            return Ok(());
        }
        let boxed = match makers.get_template_box {
            Some(get_box) => get_box()?,
            None => {
                return Err(Error::InconsistentState(format!(
                    "flavor {} names script '{script_name}' but carries no template box",
                    self.controller.flavor()
                )))
            }
        };
        let template = boxed.get(&script_name)?;
        data.extend(self.script_env());
        let rendered = crate::cluster::scripts::render(template, &data)?;
        self.exec_on_host(task, host_id, &script_name, &rendered).await
    }

    async fn exec_on_host(
        &self,
        task: &Task,
        host_id: &str,
        script_name: &str,
        content: &str,
    ) -> Result<()> {
        task.check_abort()?;
        let provider = self.controller.service().provider().clone();
        let rc = task
            .run_cancellable(provider.exec_script(host_id, script_name, content))
            .await?;
        if rc != 0 {
            return Err(Error::provider(format!(
                "script '{script_name}' exited with code {rc} on host '{host_id}'"
            )));
        }
        Ok(())
    }

    // ── Scaling ─────────────────────────────────────────────────────────

    /// Create one worker, install it, and record it.
    pub async fn add_node(
        &self,
        task: &Task,
        public: bool,
        sizing: Option<HostDefinition>,
    ) -> Result<String> {
        let c = &self.controller;
        task.check_abort()?;

        let node_type = if public {
            NodeType::PublicNode
        } else {
            NodeType::PrivateNode
        };
        let defaults = c.defaults(task).await?;
        let default_sizing = self.node_sizing(task);
        let sizing = match sizing {
            Some(s) => s.complete_with(&default_sizing),
            None => default_sizing,
        };
        let image = if defaults.image.is_empty() {
            self.image(task)
        } else {
            defaults.image.clone()
        };

        let index = c.allocate_member_indices(task, node_type, 1).await?;
        let id = self
            .create_member(task, node_type, index, sizing, image)
            .await?;
        c.add_member_ids(task, node_type, vec![id.clone()]).await?;
        self.refresh_degraded(task).await?;
        info!(cluster = %c.name(), node = %id, public, "node added");
        Ok(id)
    }

    /// Destroy the most recently added worker of the chosen kind.
    pub async fn delete_last_node(&self, task: &Task, public: bool) -> Result<()> {
        let c = &self.controller;
        task.check_abort()?;

        let id = c.pop_last_node(task, public).await?;
        if let Err(err) = c.service().delete_host(&id).await {
            c.restore_node_id(task, id, public).await?;
            return Err(err);
        }
        self.refresh_degraded(task).await?;
        info!(cluster = %c.name(), public, "last node deleted");
        Ok(())
    }

    /// Destroy the worker carrying `id`; `not-found` when it is not a
    /// member of this cluster.
    pub async fn delete_specific_node(&self, task: &Task, id: &str) -> Result<()> {
        let c = &self.controller;
        task.check_abort()?;

        let public = c.remove_node_id(task, id).await?;
        if let Err(err) = c.service().delete_host(id).await {
            c.restore_node_id(task, id.to_string(), public).await?;
            return Err(err);
        }
        self.refresh_degraded(task).await?;
        info!(cluster = %c.name(), node = %id, "node deleted");
        Ok(())
    }

    pub async fn count_nodes(&self, task: &Task, public: bool) -> Result<u32> {
        self.controller.count_nodes(task, public).await
    }

    /// Re-derive Nominal/Degraded from the minima after a scaling change.
    async fn refresh_degraded(&self, task: &Task) -> Result<()> {
        let c = &self.controller;
        let state = c.state(task).await?;
        if !state.is_running() {
            return Ok(());
        }
        let (_, min_private, min_public) = self.minimum_required_servers(task);
        let privates = c.count_nodes(task, false).await?;
        let publics = c.count_nodes(task, true).await?;
        let next = if privates < min_private || publics < min_public {
            ClusterState::Degraded
        } else {
            ClusterState::Nominal
        };
        c.set_state(task, next).await
    }

    // ── Stop / Start / Delete ───────────────────────────────────────────

    async fn member_host_ids(&self, task: &Task) -> Result<Vec<String>> {
        let c = &self.controller;
        let nodes = c.nodes_snapshot(task).await?;
        let network = c.network_config(task).await?;
        let mut ids = Vec::new();
        ids.extend(nodes.public_nodes);
        ids.extend(nodes.private_nodes);
        ids.extend(nodes.masters);
        if !network.gateway_id.is_empty() {
            ids.push(network.gateway_id);
        }
        Ok(ids)
    }

    /// Stop every member of the cluster.
    pub async fn stop(&self, task: &Task) -> Result<()> {
        let c = &self.controller;
        task.check_abort()?;

        let state = c.state(task).await?;
        if !state.is_running() {
            return Err(Error::InconsistentState(format!(
                "cannot stop cluster '{}' in state {state}",
                c.name()
            )));
        }
        c.set_state(task, ClusterState::Stopping).await?;

        let provider = c.service().provider().clone();
        for id in self.member_host_ids(task).await? {
            task.run_cancellable(provider.stop_host(&id)).await?;
        }
        c.set_state(task, ClusterState::Stopped).await?;
        info!(cluster = %c.name(), "cluster stopped");
        Ok(())
    }

    /// Start every member of a stopped cluster.
    pub async fn start(&self, task: &Task) -> Result<()> {
        let c = &self.controller;
        task.check_abort()?;

        let state = c.state(task).await?;
        if state != ClusterState::Stopped {
            return Err(Error::InconsistentState(format!(
                "cannot start cluster '{}' in state {state}",
                c.name()
            )));
        }
        c.set_state(task, ClusterState::Starting).await?;

        let provider = c.service().provider().clone();
        for id in self.member_host_ids(task).await? {
            task.run_cancellable(provider.start_host(&id)).await?;
        }

        c.set_state(task, ClusterState::Nominal).await?;
        self.refresh_degraded(task).await?;
        info!(cluster = %c.name(), "cluster started");
        Ok(())
    }

    /// Best-effort teardown in reverse provisioning order, then removal of
    /// the metadata records.
    pub async fn delete(&self, task: &Task) -> Result<()> {
        let c = &self.controller;
        task.check_abort()?;

        let service = c.service().clone();
        for id in self.member_host_ids(task).await? {
            if let Err(err) = service.delete_host(&id).await {
                warn!(cluster = %c.name(), host = %id, error = %err,
                      "could not delete member host");
            }
        }

        let network = c.network_config(task).await?;
        if !network.network_id.is_empty() {
            if let Err(err) = service.provider().delete_network(&network.network_id).await {
                warn!(cluster = %c.name(), network = %network.network_id, error = %err,
                      "could not delete cluster network");
            }
        }

        c.set_state(task, ClusterState::Removed).await?;
        metadata::remove(&service, c.name()).await?;
        info!(cluster = %c.name(), "cluster removed");
        Ok(())
    }
}
