//! Listener-level integration tests
//!
//! Exercises the gRPC glue (uuid metadata, job lifecycle, status mapping)
//! by invoking the listener services directly. Runs in its own test binary
//! because the tenant registry is a process-wide singleton.

use safescale_daemon::iaas::tenancy::{register_tenant, TenantConfig};
use safescale_daemon::server::listeners::{
    ClusterListener, JobListener, NodeListener, TenantListener,
};
use safescale_proto::{
    Cluster as _, ClusterCreateRequest, ClusterNameRequest, Empty, Job as _, JobStopRequest,
    NodeListRequest, Node as _, Tenant as _,
};
use tonic::Request;

fn with_uuid<T>(msg: T, uuid: &str) -> Request<T> {
    let mut request = Request::new(msg);
    request
        .metadata_mut()
        .insert("uuid", uuid.parse().expect("valid metadata value"));
    request
}

fn setup_tenant() {
    // Every test shares the binary-wide registry; registration is done once.
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let config: TenantConfig = serde_json::from_value(serde_json::json!({
            "name": "local",
            "provider": "local",
        }))
        .unwrap();
        register_tenant(config).unwrap();
    });
}

#[tokio::test]
async fn test_tenant_list_and_get() {
    setup_tenant();
    let listener = TenantListener;

    let list = listener
        .list(Request::new(Empty {}))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(list.tenants.len(), 1);
    assert_eq!(list.tenants[0].provider, "local");

    let current = listener
        .get(Request::new(Empty {}))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(current.name, "local");
}

#[tokio::test]
async fn test_cluster_create_inspect_state_over_grpc() {
    setup_tenant();
    let clusters = ClusterListener;
    let nodes = NodeListener;

    let created = clusters
        .create(with_uuid(
            ClusterCreateRequest {
                name: "wire".to_string(),
                cidr: "192.168.10.0/24".to_string(),
                flavor: "BOH".to_string(),
                complexity: "Normal".to_string(),
                ..Default::default()
            },
            "11111111-1111-4111-8111-111111111111",
        ))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(created.flavor, "BOH");
    assert_eq!(created.state, "Nominal");
    assert_eq!(created.master_ids.len(), 1);
    assert_eq!(created.private_node_ids.len(), 3);

    let inspected = clusters
        .inspect(with_uuid(
            ClusterNameRequest {
                name: "wire".to_string(),
                ..Default::default()
            },
            "22222222-2222-4222-8222-222222222222",
        ))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(inspected.name, "wire");
    assert_eq!(inspected.cidr, "192.168.10.0/24");

    let count = nodes
        .count(with_uuid(
            NodeListRequest {
                cluster: "wire".to_string(),
                public: false,
            },
            "33333333-3333-4333-8333-333333333333",
        ))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(count.count, 3);

    // A second create with the same name maps to AlreadyExists.
    let err = clusters
        .create(with_uuid(
            ClusterCreateRequest {
                name: "wire".to_string(),
                cidr: "192.168.10.0/24".to_string(),
                flavor: "BOH".to_string(),
                complexity: "Normal".to_string(),
                ..Default::default()
            },
            "44444444-4444-4444-8444-444444444444",
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), tonic::Code::AlreadyExists);
}

#[tokio::test]
async fn test_cluster_create_rejects_bad_flavor() {
    setup_tenant();
    let clusters = ClusterListener;

    let err = clusters
        .create(Request::new(ClusterCreateRequest {
            name: "badflavor".to_string(),
            cidr: "192.168.20.0/24".to_string(),
            flavor: "MESOS".to_string(),
            complexity: "Small".to_string(),
            ..Default::default()
        }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), tonic::Code::InvalidArgument);
}

#[tokio::test]
async fn test_job_stop_unknown_uuid_is_not_found() {
    setup_tenant();
    let jobs = JobListener;

    let err = jobs
        .stop(Request::new(JobStopRequest {
            uuid: "00000000-0000-4000-8000-000000000000".to_string(),
        }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), tonic::Code::NotFound);

    // The unknown uuid is not in the registry snapshot either.
    let list = jobs
        .list(Request::new(Empty {}))
        .await
        .unwrap()
        .into_inner();
    assert!(list
        .jobs
        .iter()
        .all(|j| j.uuid != "00000000-0000-4000-8000-000000000000"));
}
