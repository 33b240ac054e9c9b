//! Cluster properties persisted as shielded witnesses
//!
//! Every type here supports deep clone and serde round-trips: that is what
//! lets [`crate::concurrency::Shielded`] present stable read views without
//! holding a lock across caller code.

use safescale_common::{ClusterState, Complexity, Flavor, HostEffectiveSizing};
use serde::{Deserialize, Serialize};

/// SSH keypair attached to a cluster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Keypair {
    pub name: String,
    pub public_key: String,
    pub private_key: String,
}

/// Identity of a cluster; immutable once the cluster is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterIdentity {
    pub name: String,
    pub cidr: String,
    pub flavor: Flavor,
    pub complexity: Complexity,
    pub keypair: Keypair,
    pub admin_password: String,
    pub tenant: String,
}

/// Network attachment of a cluster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterNetwork {
    pub network_id: String,
    pub gateway_id: String,
    pub cidr: String,
}

/// Member lists of a cluster. "Last" always means the slice tail.
///
/// The sequence counters only ever grow, so member names stay unique even
/// after deletions in the middle of a list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterNodes {
    pub masters: Vec<String>,
    pub private_nodes: Vec<String>,
    pub public_nodes: Vec<String>,
    #[serde(default)]
    pub master_seq: u32,
    #[serde(default)]
    pub private_seq: u32,
    #[serde(default)]
    pub public_seq: u32,
}

/// Sizing and image defaults the cluster was provisioned with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterDefaults {
    pub gateway_sizing: HostEffectiveSizing,
    pub master_sizing: HostEffectiveSizing,
    pub node_sizing: HostEffectiveSizing,
    pub image: String,
}

/// Wrapper keeping the persisted state serializable on its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterStateProp {
    pub state: ClusterState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_deep_clone() {
        let original = ClusterDefaults {
            image: "something".to_string(),
            gateway_sizing: HostEffectiveSizing {
                ram_size: 3.0,
                gpu_type: "NVidia".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };

        let mut cloned = original.clone();
        assert_eq!(original, cloned);

        cloned.gateway_sizing.gpu_count = 7;
        cloned.gateway_sizing.gpu_type = "Culture".to_string();
        assert_ne!(original, cloned, "clone must be deep");
        assert_eq!(original.gateway_sizing.gpu_type, "NVidia");
    }

    #[test]
    fn test_nodes_serde_round_trip() {
        let nodes = ClusterNodes {
            masters: vec!["m1".to_string()],
            private_nodes: vec!["n1".to_string(), "n2".to_string()],
            public_nodes: vec![],
            master_seq: 0,
            private_seq: 0,
            public_seq: 0,
        };
        let buf = serde_json::to_vec(&nodes).unwrap();
        let restored: ClusterNodes = serde_json::from_slice(&buf).unwrap();
        assert_eq!(nodes, restored);
    }
}
