//! Kinds of cluster members

use std::fmt;

use serde::{Deserialize, Serialize};

/// Role a host plays inside a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    /// Network entry point of the cluster
    Gateway,
    /// Control-plane member
    Master,
    /// Worker reachable only from inside the cluster network
    PrivateNode,
    /// Worker carrying a public address
    PublicNode,
}

impl NodeType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gateway => "gateway",
            Self::Master => "master",
            Self::PrivateNode => "node",
            Self::PublicNode => "pubnode",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
