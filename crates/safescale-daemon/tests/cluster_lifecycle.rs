//! Cluster lifecycle integration tests on the local provider

use std::sync::Arc;
use std::time::Duration;

use safescale_common::{ClusterState, Complexity, Error, Flavor};
use safescale_daemon::cluster::{self, control::Foreman, ClusterRequest};
use safescale_daemon::concurrency::Task;
use safescale_daemon::iaas::objectstorage::MemoryStorage;
use safescale_daemon::iaas::providers::local::LocalProvider;
use safescale_daemon::iaas::Service;
use safescale_daemon::server::{self, Job};

fn local_service(latency: Duration) -> Arc<Service> {
    Arc::new(Service::new(
        "local",
        Arc::new(LocalProvider::with_latency(latency)),
        Arc::new(MemoryStorage::new()),
        "0.safescale-local-test",
    ))
}

fn boh_request(name: &str, complexity: Complexity) -> ClusterRequest {
    ClusterRequest {
        name: name.to_string(),
        cidr: "192.168.0.0/24".to_string(),
        flavor: Flavor::Boh,
        complexity,
        network_id: None,
        node_sizing: None,
    }
}

#[tokio::test]
async fn test_boh_normal_cluster_minima() {
    let service = local_service(Duration::ZERO);
    let task = Task::new();

    let controller = cluster::create(&task, service.clone(), boh_request("demo", Complexity::Normal))
        .await
        .unwrap();

    assert_eq!(controller.flavor(), Flavor::Boh);
    assert_eq!(controller.state(&task).await.unwrap(), ClusterState::Nominal);

    let nodes = controller.nodes_snapshot(&task).await.unwrap();
    assert_eq!(nodes.masters.len(), 1, "BOH Normal requires 1 master");
    assert_eq!(
        nodes.private_nodes.len(),
        3,
        "BOH Normal requires 3 private nodes"
    );
    assert_eq!(nodes.public_nodes.len(), 0);

    // One gateway + one master + three nodes actually exist on the provider.
    let hosts = service.provider().list_hosts().await.unwrap();
    assert_eq!(hosts.len(), 5);
}

#[tokio::test]
async fn test_create_rejects_name_collision() {
    let service = local_service(Duration::ZERO);
    let task = Task::new();

    cluster::create(&task, service.clone(), boh_request("dup", Complexity::Small))
        .await
        .unwrap();

    let err = cluster::create(&task, service.clone(), boh_request("dup", Complexity::Small))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Duplicate(_)));

    // The original cluster is unaffected.
    let controller = cluster::load(&task, service, "dup").await.unwrap();
    assert_eq!(controller.state(&task).await.unwrap(), ClusterState::Nominal);
    assert_eq!(
        controller.nodes_snapshot(&task).await.unwrap().private_nodes.len(),
        1
    );
}

#[tokio::test]
async fn test_unported_flavor_is_rejected_before_provisioning() {
    let service = local_service(Duration::ZERO);
    let task = Task::new();

    let mut req = boh_request("k8s-demo", Complexity::Small);
    req.flavor = Flavor::K8s;
    let err = cluster::create(&task, service.clone(), req).await.unwrap_err();
    assert!(matches!(err, Error::NotImplemented(_)));
    assert!(service.provider().list_hosts().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_scaling_and_degraded_marking() {
    let service = local_service(Duration::ZERO);
    let task = Task::new();

    let controller = cluster::create(&task, service.clone(), boh_request("scale", Complexity::Small))
        .await
        .unwrap();
    let foreman = Foreman::new(controller.clone());

    // Grow beyond the minimum, then shrink back.
    let added = foreman.add_node(&task, false, None).await.unwrap();
    assert_eq!(foreman.count_nodes(&task, false).await.unwrap(), 2);
    assert_eq!(controller.state(&task).await.unwrap(), ClusterState::Nominal);

    foreman.delete_specific_node(&task, &added).await.unwrap();
    assert_eq!(foreman.count_nodes(&task, false).await.unwrap(), 1);
    assert_eq!(controller.state(&task).await.unwrap(), ClusterState::Nominal);

    // Dropping below the minimum marks the cluster Degraded.
    foreman.delete_last_node(&task, false).await.unwrap();
    assert_eq!(foreman.count_nodes(&task, false).await.unwrap(), 0);
    assert_eq!(controller.state(&task).await.unwrap(), ClusterState::Degraded);

    // Restoring the minimum restores Nominal.
    foreman.add_node(&task, false, None).await.unwrap();
    assert_eq!(controller.state(&task).await.unwrap(), ClusterState::Nominal);
}

#[tokio::test]
async fn test_delete_unknown_node_is_not_found() {
    let service = local_service(Duration::ZERO);
    let task = Task::new();

    let controller = cluster::create(&task, service, boh_request("nodes", Complexity::Small))
        .await
        .unwrap();
    let foreman = Foreman::new(controller);

    assert!(matches!(
        foreman.delete_specific_node(&task, "host-9999").await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_stop_start_cycle() {
    let service = local_service(Duration::ZERO);
    let task = Task::new();

    let controller = cluster::create(&task, service, boh_request("cycle", Complexity::Small))
        .await
        .unwrap();
    let foreman = Foreman::new(controller.clone());

    foreman.stop(&task).await.unwrap();
    assert_eq!(controller.state(&task).await.unwrap(), ClusterState::Stopped);

    // Stopping a stopped cluster is a state machine violation.
    assert!(matches!(
        foreman.stop(&task).await,
        Err(Error::InconsistentState(_))
    ));

    foreman.start(&task).await.unwrap();
    assert_eq!(controller.state(&task).await.unwrap(), ClusterState::Nominal);
}

#[tokio::test]
async fn test_delete_reaps_hosts_and_metadata() {
    let service = local_service(Duration::ZERO);
    let task = Task::new();

    let controller = cluster::create(&task, service.clone(), boh_request("gone", Complexity::Small))
        .await
        .unwrap();
    let foreman = Foreman::new(controller);

    foreman.delete(&task).await.unwrap();
    assert!(service.provider().list_hosts().await.unwrap().is_empty());
    assert!(cluster::list(&service).await.unwrap().is_empty());
    assert!(matches!(
        cluster::load(&task, service, "gone").await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_cluster_survives_reload_from_metadata() {
    let service = local_service(Duration::ZERO);
    let task = Task::new();

    cluster::create(&task, service.clone(), boh_request("persist", Complexity::Normal))
        .await
        .unwrap();

    // A fresh controller rebuilt from the bucket sees the same cluster.
    let reloaded = cluster::load(&task, service, "persist").await.unwrap();
    assert_eq!(reloaded.flavor(), Flavor::Boh);
    assert_eq!(reloaded.complexity(), Complexity::Normal);
    assert_eq!(reloaded.state(&task).await.unwrap(), ClusterState::Nominal);
    assert_eq!(
        reloaded.nodes_snapshot(&task).await.unwrap().private_nodes.len(),
        3
    );
}

#[tokio::test]
async fn test_abort_mid_provisioning() {
    // Host creation takes long enough that the abort lands while the
    // gateway is still being provisioned.
    let service = local_service(Duration::from_secs(2));
    let uuid = uuid::Uuid::new_v4().to_string();
    let job = Job::new(Some(uuid.clone()), service.clone(), "cluster create 'slow'").unwrap();

    let create = {
        let task = job.task().clone();
        let service = service.clone();
        tokio::spawn(async move {
            cluster::create(&task, service, boh_request("slow", Complexity::Small)).await
        })
    };

    // Let the create reach the provider, then abort through the registry.
    tokio::time::sleep(Duration::from_millis(100)).await;
    server::abort_job_by_id(&uuid).unwrap();

    let err = create.await.unwrap().unwrap_err();
    assert!(matches!(err, Error::Aborted(_)), "got: {err}");
    assert!(job.aborted());

    // The aborted task issued no further provider writes: the gateway
    // creation was dropped mid-flight, so no host exists.
    assert!(service.provider().list_hosts().await.unwrap().is_empty());

    // The failure was recorded for later reconciliation.
    let task = Task::new();
    let controller = cluster::load(&task, service, "slow").await.unwrap();
    assert_eq!(controller.state(&task).await.unwrap(), ClusterState::Error);

    job.close();
}
