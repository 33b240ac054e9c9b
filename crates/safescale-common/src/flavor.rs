//! Cluster flavors
//!
//! A flavor is a cluster recipe: what gets installed on the members and how
//! the control plane arranges them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Known cluster recipes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Flavor {
    /// Bunch Of Hosts: plain hosts without any cluster management layer
    Boh,
    /// Kubernetes
    K8s,
    /// Docker Swarm
    Swarm,
    /// DC/OS
    Dcos,
    /// OpenHPC
    Ohpc,
}

impl Flavor {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Boh => "BOH",
            Self::K8s => "K8S",
            Self::Swarm => "SWARM",
            Self::Dcos => "DCOS",
            Self::Ohpc => "OHPC",
        }
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error type for parsing a flavor name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFlavorError(pub String);

impl fmt::Display for ParseFlavorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown cluster flavor: '{}'", self.0)
    }
}

impl std::error::Error for ParseFlavorError {}

impl FromStr for Flavor {
    type Err = ParseFlavorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BOH" => Ok(Self::Boh),
            "K8S" => Ok(Self::K8s),
            "SWARM" => Ok(Self::Swarm),
            "DCOS" => Ok(Self::Dcos),
            "OHPC" => Ok(Self::Ohpc),
            _ => Err(ParseFlavorError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for flavor in [Flavor::Boh, Flavor::K8s, Flavor::Swarm, Flavor::Dcos, Flavor::Ohpc] {
            assert_eq!(flavor.as_str().parse::<Flavor>().unwrap(), flavor);
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("boh".parse::<Flavor>().unwrap(), Flavor::Boh);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!("MESOS".parse::<Flavor>().is_err());
    }
}
