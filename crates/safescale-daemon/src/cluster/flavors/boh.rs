//! BOH flavor: a Bunch Of Hosts
//!
//! Implements a cluster of hosts without any cluster management
//! environment: one gateway, one master, and workers scaled with the
//! complexity tier. Installation only covers the common system
//! requirements plus a minimal per-role marker.

use std::sync::{Arc, OnceLock};

use safescale_common::{Complexity, HostDefinition, NodeType, Result};

use crate::cluster::control::{Foreman, Makers};
use crate::cluster::scripts::{render, ScriptBox, TemplateData};
use crate::concurrency::Task;

/// Makers record to construct a BOH cluster.
pub static MAKERS: Makers = Makers {
    minimum_required_servers: Some(minimum_required_servers),
    default_gateway_sizing: Some(gateway_sizing),
    default_master_sizing: Some(node_sizing),
    default_node_sizing: Some(node_sizing),
    default_image: Some(default_image),
    get_global_system_requirements: Some(global_system_requirements),
    get_node_installation_script: Some(node_installation_script),
    get_template_box: Some(template_box),
};

fn minimum_required_servers(task: &Task, foreman: &Foreman) -> (u32, u32, u32) {
    let _ = task;
    let private_node_count = match foreman.cluster().complexity() {
        Complexity::Small => 1,
        Complexity::Normal => 3,
        Complexity::Large => 7,
    };
    (1, private_node_count, 0)
}

fn gateway_sizing(_task: &Task, _foreman: &Foreman) -> HostDefinition {
    HostDefinition {
        cores: 2,
        ram_size: 15.0,
        disk_size: 60,
        ..Default::default()
    }
}

fn node_sizing(_task: &Task, _foreman: &Foreman) -> HostDefinition {
    HostDefinition {
        cores: 4,
        ram_size: 15.0,
        disk_size: 100,
        ..Default::default()
    }
}

fn default_image(_task: &Task, _foreman: &Foreman) -> String {
    "Ubuntu 18.04".to_string()
}

/// The flavor's embedded script directory, published once per process.
fn template_box() -> Result<&'static ScriptBox> {
    static BOX: OnceLock<ScriptBox> = OnceLock::new();
    Ok(BOX.get_or_init(|| {
        ScriptBox::new(
            "boh",
            &[
                (
                    "boh_install_requirements.sh",
                    include_str!("scripts/boh/boh_install_requirements.sh"),
                ),
                (
                    "boh_install_master.sh",
                    include_str!("scripts/boh/boh_install_master.sh"),
                ),
                (
                    "boh_install_node.sh",
                    include_str!("scripts/boh/boh_install_node.sh"),
                ),
            ],
        )
    }))
}

/// Render the common bootstrap script, memoized per cluster.
fn global_system_requirements(_task: &Task, foreman: &Foreman) -> Result<Arc<String>> {
    let cluster = foreman.cluster();
    if let Some(cached) = cluster.cached_requirements() {
        return Ok(cached);
    }
    let template = template_box()?.get("boh_install_requirements.sh")?;
    let rendered = render(template, &foreman.script_env())?;
    Ok(cluster.cache_requirements(rendered))
}

fn node_installation_script(
    _task: &Task,
    _foreman: &Foreman,
    node_type: NodeType,
) -> (String, TemplateData) {
    let script = match node_type {
        NodeType::Master => "boh_install_master.sh",
        NodeType::PrivateNode | NodeType::PublicNode => "boh_install_node.sh",
        NodeType::Gateway => "",
    };
    (script.to_string(), TemplateData::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::control::Controller;
    use crate::cluster::properties::{ClusterIdentity, Keypair};
    use crate::iaas::objectstorage::MemoryStorage;
    use crate::iaas::providers::local::LocalProvider;
    use crate::iaas::Service;
    use safescale_common::Flavor;
    use std::sync::Arc;

    fn foreman(complexity: Complexity) -> Foreman {
        let service = Arc::new(Service::new(
            "test",
            Arc::new(LocalProvider::new()),
            Arc::new(MemoryStorage::new()),
            "0.safescale-test",
        ));
        let identity = ClusterIdentity {
            name: "demo".to_string(),
            cidr: "192.168.0.0/24".to_string(),
            flavor: Flavor::Boh,
            complexity,
            keypair: Keypair {
                name: "demo-key".to_string(),
                public_key: "pub".to_string(),
                private_key: "priv".to_string(),
            },
            admin_password: "secret".to_string(),
            tenant: "test".to_string(),
        };
        Foreman::new(Arc::new(Controller::new(service, &MAKERS, identity)))
    }

    #[test]
    fn test_minimum_servers_by_complexity() {
        let task = Task::new();
        assert_eq!(
            minimum_required_servers(&task, &foreman(Complexity::Small)),
            (1, 1, 0)
        );
        assert_eq!(
            minimum_required_servers(&task, &foreman(Complexity::Normal)),
            (1, 3, 0)
        );
        assert_eq!(
            minimum_required_servers(&task, &foreman(Complexity::Large)),
            (1, 7, 0)
        );
    }

    #[test]
    fn test_global_requirements_render_and_memoize() {
        let task = Task::new();
        let foreman = foreman(Complexity::Small);

        let first = global_system_requirements(&task, &foreman).unwrap();
        assert!(first.contains("192.168.0.0/24"));
        assert!(first.contains("cladm:secret"));
        assert!(!first.contains("{{"), "all placeholders must resolve");

        let second = global_system_requirements(&task, &foreman).unwrap();
        assert!(Arc::ptr_eq(&first, &second), "render must be memoized");
    }

    #[test]
    fn test_installation_script_selection() {
        let task = Task::new();
        let foreman = foreman(Complexity::Small);
        let (master, _) = node_installation_script(&task, &foreman, NodeType::Master);
        assert_eq!(master, "boh_install_master.sh");
        let (node, _) = node_installation_script(&task, &foreman, NodeType::PrivateNode);
        assert_eq!(node, "boh_install_node.sh");
        let (gw, _) = node_installation_script(&task, &foreman, NodeType::Gateway);
        assert!(gw.is_empty());
    }
}
