//! Cluster lifecycle states

use std::fmt;

use serde::{Deserialize, Serialize};

/// High-level state of a cluster.
///
/// `Error` and `Removed` are terminal. Transitions are driven exclusively by
/// the cluster control plane; see the foreman for the allowed edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ClusterState {
    /// Metadata exists but provisioning has not started
    #[default]
    Created,
    /// Provisioning or restart in progress
    Starting,
    /// All members up, minima satisfied
    Nominal,
    /// Running below the minimum member count for its complexity
    Degraded,
    /// Shutdown in progress
    Stopping,
    /// All members stopped
    Stopped,
    /// Provisioning failed; residue left for inspection or deletion
    Error,
    /// Torn down
    Removed,
}

impl ClusterState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Starting => "Starting",
            Self::Nominal => "Nominal",
            Self::Degraded => "Degraded",
            Self::Stopping => "Stopping",
            Self::Stopped => "Stopped",
            Self::Error => "Error",
            Self::Removed => "Removed",
        }
    }

    /// Check if the state admits no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Error | Self::Removed)
    }

    /// Check if the cluster is serving (nominally or degraded).
    pub fn is_running(self) -> bool {
        matches!(self, Self::Nominal | Self::Degraded)
    }
}

impl fmt::Display for ClusterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(ClusterState::Error.is_terminal());
        assert!(ClusterState::Removed.is_terminal());
        assert!(!ClusterState::Stopped.is_terminal());
    }

    #[test]
    fn test_running_states() {
        assert!(ClusterState::Nominal.is_running());
        assert!(ClusterState::Degraded.is_running());
        assert!(!ClusterState::Starting.is_running());
    }
}
