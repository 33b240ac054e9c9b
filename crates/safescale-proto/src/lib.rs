//! Protocol buffer definitions for safescale.
//!
//! Contains gRPC service definitions and message types for communication
//! between clients and the safescale daemon.

/// Generated protobuf types and gRPC service definitions.
pub mod safescale {
    tonic::include_proto!("safescale");
}

// Re-export commonly used types at module root for convenience

// gRPC server types (implemented by the daemon listeners)
pub use safescale::cluster_server::{Cluster, ClusterServer};
pub use safescale::job_server::{Job, JobServer};
pub use safescale::node_server::{Node, NodeServer};
pub use safescale::template_server::{Template, TemplateServer};
pub use safescale::tenant_server::{Tenant, TenantServer};

// gRPC client types (used by front-ends and tests)
pub use safescale::cluster_client::ClusterClient;
pub use safescale::job_client::JobClient;
pub use safescale::node_client::NodeClient;
pub use safescale::template_client::TemplateClient;
pub use safescale::tenant_client::TenantClient;

// Message types
pub use safescale::{
    ClusterCreateRequest, ClusterListResponse, ClusterNameRequest, ClusterResponse,
    ClusterStateResponse, Empty, HostSizing, HostTemplate, JobEntry, JobListResponse,
    JobStopRequest, NodeAddRequest, NodeCountResponse, NodeDeleteRequest, NodeListRequest,
    NodeListResponse, NodeResponse, TemplateListRequest, TemplateListResponse,
    TenantCleanupRequest, TenantEntry, TenantInspectResponse, TenantList, TenantName,
};

/// Convert an empty string to None, keeping non-empty strings.
pub fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(String::new()), None);
        assert_eq!(non_empty("x".to_string()), Some("x".to_string()));
    }
}
