//! The cluster object
//!
//! Owns the shielded properties of one cluster and commits every mutation
//! through `alter`, persisting the touched witness to the tenant metadata
//! bucket afterwards. Identity is immutable once created, so a plain copy
//! is kept beside its shielded form for lock-free reads by the makers.

use std::sync::{Arc, OnceLock};

use safescale_common::{ClusterState, Complexity, Error, Flavor, Result};
use tracing::debug;

use crate::cluster::flavors;
use crate::cluster::metadata;
use crate::cluster::properties::{
    ClusterDefaults, ClusterIdentity, ClusterNetwork, ClusterNodes, ClusterStateProp, Keypair,
};
use crate::concurrency::{Shielded, Task};
use crate::iaas::Service;

use super::makers::Makers;

pub struct Controller {
    service: Arc<Service>,
    makers: &'static Makers,
    /// Immutable snapshot for synchronous access
    identity: ClusterIdentity,
    identity_prop: Shielded<ClusterIdentity>,
    network: Shielded<ClusterNetwork>,
    nodes: Shielded<ClusterNodes>,
    defaults: Shielded<ClusterDefaults>,
    state: Shielded<ClusterStateProp>,
    /// Memoized render of the flavor's bootstrap script for this cluster
    requirements: OnceLock<Arc<String>>,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("name", &self.identity.name)
            .field("flavor", &self.identity.flavor)
            .field("complexity", &self.identity.complexity)
            .finish()
    }
}

impl Controller {
    pub fn new(service: Arc<Service>, makers: &'static Makers, identity: ClusterIdentity) -> Self {
        Self {
            service,
            makers,
            identity_prop: Shielded::new(identity.clone()),
            identity,
            network: Shielded::new(ClusterNetwork::default()),
            nodes: Shielded::new(ClusterNodes::default()),
            defaults: Shielded::new(ClusterDefaults::default()),
            state: Shielded::new(ClusterStateProp {
                state: ClusterState::Created,
            }),
            requirements: OnceLock::new(),
        }
    }

    // ── Identity (immutable) ────────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn flavor(&self) -> Flavor {
        self.identity.flavor
    }

    pub fn complexity(&self) -> Complexity {
        self.identity.complexity
    }

    pub fn cidr(&self) -> &str {
        &self.identity.cidr
    }

    pub fn admin_password(&self) -> &str {
        &self.identity.admin_password
    }

    pub fn keypair(&self) -> &Keypair {
        &self.identity.keypair
    }

    pub fn service(&self) -> &Arc<Service> {
        &self.service
    }

    pub fn makers(&self) -> &'static Makers {
        self.makers
    }

    // ── Shielded properties ─────────────────────────────────────────────

    pub async fn state(&self, task: &Task) -> Result<ClusterState> {
        self.state.inspect(task, |prop| Ok(prop.state)).await
    }

    /// Commit a state transition and persist it.
    pub async fn set_state(&self, task: &Task, next: ClusterState) -> Result<()> {
        self.state
            .alter(task, |prop| {
                if prop.state == next {
                    return Err(Error::AlteredNothing);
                }
                debug!(cluster = %self.identity.name, from = %prop.state, to = %next,
                       "cluster state transition");
                prop.state = next;
                Ok(())
            })
            .await?;
        self.persist(task, "state", &self.state).await
    }

    pub async fn network_config(&self, task: &Task) -> Result<ClusterNetwork> {
        self.network.inspect(task, |net| Ok(net.clone())).await
    }

    pub async fn set_network(&self, task: &Task, config: ClusterNetwork) -> Result<()> {
        self.network
            .alter(task, |net| {
                *net = config;
                Ok(())
            })
            .await?;
        self.persist(task, "network", &self.network).await
    }

    pub async fn defaults(&self, task: &Task) -> Result<ClusterDefaults> {
        self.defaults.inspect(task, |d| Ok(d.clone())).await
    }

    pub async fn set_defaults(&self, task: &Task, defaults: ClusterDefaults) -> Result<()> {
        self.defaults
            .alter(task, |d| {
                *d = defaults;
                Ok(())
            })
            .await?;
        self.persist(task, "defaults", &self.defaults).await
    }

    pub async fn nodes_snapshot(&self, task: &Task) -> Result<ClusterNodes> {
        self.nodes.inspect(task, |n| Ok(n.clone())).await
    }

    pub async fn count_nodes(&self, task: &Task, public: bool) -> Result<u32> {
        self.nodes
            .inspect(task, |n| {
                let list = if public { &n.public_nodes } else { &n.private_nodes };
                Ok(list.len() as u32)
            })
            .await
    }

    /// Reserve `count` consecutive member indices of one kind, returning
    /// the first. Counters only grow, keeping member names unique across
    /// deletions.
    pub async fn allocate_member_indices(
        &self,
        task: &Task,
        node_type: safescale_common::NodeType,
        count: u32,
    ) -> Result<u32> {
        let mut first = 0;
        self.nodes
            .alter(task, |n| {
                let seq = match node_type {
                    safescale_common::NodeType::Master => &mut n.master_seq,
                    safescale_common::NodeType::PrivateNode => &mut n.private_seq,
                    safescale_common::NodeType::PublicNode => &mut n.public_seq,
                    safescale_common::NodeType::Gateway => {
                        return Err(Error::invalid_parameter(
                            "node_type",
                            "gateways are not numbered",
                        ))
                    }
                };
                first = *seq + 1;
                *seq += count;
                Ok(())
            })
            .await?;
        self.persist(task, "nodes", &self.nodes).await?;
        Ok(first)
    }

    /// Record newly created members of one kind.
    pub async fn add_member_ids(
        &self,
        task: &Task,
        node_type: safescale_common::NodeType,
        ids: Vec<String>,
    ) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.nodes
            .alter(task, |n| {
                let list = match node_type {
                    safescale_common::NodeType::Master => &mut n.masters,
                    safescale_common::NodeType::PrivateNode => &mut n.private_nodes,
                    safescale_common::NodeType::PublicNode => &mut n.public_nodes,
                    safescale_common::NodeType::Gateway => {
                        return Err(Error::invalid_parameter(
                            "node_type",
                            "gateways are tracked in the network config",
                        ))
                    }
                };
                list.extend(ids);
                Ok(())
            })
            .await?;
        self.persist(task, "nodes", &self.nodes).await
    }

    /// Pop the tail of the chosen member list. "Last" is whatever the tail
    /// is at the moment the write lock is acquired.
    pub async fn pop_last_node(&self, task: &Task, public: bool) -> Result<String> {
        let mut popped = None;
        self.nodes
            .alter(task, |n| {
                let list = if public { &mut n.public_nodes } else { &mut n.private_nodes };
                popped = list.pop();
                match popped {
                    Some(_) => Ok(()),
                    None => Err(Error::not_found(format!(
                        "cluster '{}' has no {} node to remove",
                        self.identity.name,
                        if public { "public" } else { "private" },
                    ))),
                }
            })
            .await?;
        self.persist(task, "nodes", &self.nodes).await?;
        popped.ok_or_else(|| Error::InconsistentState("node list mutated underneath".to_string()))
    }

    /// Remove a specific member id; answers whether it was a public node.
    pub async fn remove_node_id(&self, task: &Task, id: &str) -> Result<bool> {
        let mut was_public = None;
        self.nodes
            .alter(task, |n| {
                if let Some(pos) = n.private_nodes.iter().position(|x| x == id) {
                    n.private_nodes.remove(pos);
                    was_public = Some(false);
                    return Ok(());
                }
                if let Some(pos) = n.public_nodes.iter().position(|x| x == id) {
                    n.public_nodes.remove(pos);
                    was_public = Some(true);
                    return Ok(());
                }
                Err(Error::not_found(format!(
                    "no node with id '{id}' in cluster '{}'",
                    self.identity.name
                )))
            })
            .await?;
        self.persist(task, "nodes", &self.nodes).await?;
        was_public.ok_or_else(|| Error::InconsistentState("node list mutated underneath".to_string()))
    }

    /// Re-insert a member id, used when destroying the backing host failed.
    pub async fn restore_node_id(&self, task: &Task, id: String, public: bool) -> Result<()> {
        self.nodes
            .alter(task, |n| {
                let list = if public { &mut n.public_nodes } else { &mut n.private_nodes };
                list.push(id);
                Ok(())
            })
            .await?;
        self.persist(task, "nodes", &self.nodes).await
    }

    // ── Bootstrap script memoization ────────────────────────────────────

    pub(crate) fn cached_requirements(&self) -> Option<Arc<String>> {
        self.requirements.get().cloned()
    }

    /// Publish the rendered bootstrap script; concurrent first callers
    /// converge on a single winner.
    pub(crate) fn cache_requirements(&self, rendered: String) -> Arc<String> {
        let _ = self.requirements.set(Arc::new(rendered));
        self.requirements
            .get()
            .cloned()
            .expect("requirements cache was just published")
    }

    // ── Persistence ─────────────────────────────────────────────────────

    async fn persist<T>(&self, task: &Task, part: &str, prop: &Shielded<T>) -> Result<()>
    where
        T: Clone + Send + serde::Serialize + serde::de::DeserializeOwned,
    {
        let buf = prop.serialize(task).await?;
        self.service
            .storage()
            .put(&metadata::key(&self.identity.name, part), buf)
            .await
    }

    /// Persist every witness of this cluster.
    pub async fn save_metadata(&self, task: &Task) -> Result<()> {
        self.persist(task, "identity", &self.identity_prop).await?;
        self.persist(task, "network", &self.network).await?;
        self.persist(task, "nodes", &self.nodes).await?;
        self.persist(task, "defaults", &self.defaults).await?;
        self.persist(task, "state", &self.state).await
    }

    /// Rebuild a controller from the tenant metadata bucket.
    pub async fn load(task: &Task, service: Arc<Service>, name: &str) -> Result<Arc<Self>> {
        let storage = service.storage();

        let identity_buf = storage.get(&metadata::key(name, "identity")).await.map_err(
            |_| Error::not_found(format!("no cluster named '{name}'")),
        )?;
        let identity: ClusterIdentity = serde_json::from_slice(&identity_buf)
            .map_err(|e| Error::Syntax(format!("corrupt identity record: {e}")))?;
        let makers = flavors::makers_for(identity.flavor)?;

        let controller = Self::new(service.clone(), makers, identity);
        if let Ok(buf) = storage.get(&metadata::key(name, "network")).await {
            controller.network.deserialize(task, &buf).await?;
        }
        if let Ok(buf) = storage.get(&metadata::key(name, "nodes")).await {
            controller.nodes.deserialize(task, &buf).await?;
        }
        if let Ok(buf) = storage.get(&metadata::key(name, "defaults")).await {
            controller.defaults.deserialize(task, &buf).await?;
        }
        if let Ok(buf) = storage.get(&metadata::key(name, "state")).await {
            controller.state.deserialize(task, &buf).await?;
        }
        Ok(Arc::new(controller))
    }
}
