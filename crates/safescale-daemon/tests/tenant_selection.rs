//! Tenant registry and current-tenant selection
//!
//! Runs in its own test binary because the tenant registry and current
//! tenant are process-wide singletons.

use safescale_common::Error;
use safescale_daemon::iaas::tenancy::{
    self, current_tenant, register_tenant, set_current_tenant, TenantConfig,
};
use serde_json::json;

fn local_tenant(name: &str) -> TenantConfig {
    serde_json::from_value(json!({
        "name": name,
        "provider": "local",
    }))
    .unwrap()
}

#[tokio::test]
async fn test_single_tenant_auto_selection() {
    register_tenant(local_tenant("local")).unwrap();

    // Concurrent first accesses converge on the same selection.
    let handles: Vec<_> = (0..8)
        .map(|_| tokio::spawn(async { current_tenant().map(|t| t.name) }))
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().as_deref(), Some("local"));
    }

    let tenant = current_tenant().expect("unique tenant must be auto-selected");
    assert_eq!(tenant.name, "local");
    assert_eq!(tenant.service.provider_name(), "local");
    assert!(tenant.service.bucket_name().starts_with("0.safescale-"));

    // Re-selecting the current tenant is a no-op.
    set_current_tenant("local").unwrap();
    assert_eq!(current_tenant().unwrap().name, "local");

    // use_service returns the same cached instance across calls, so cluster
    // metadata written under one job is visible to the next.
    let a = tenancy::use_service("local").unwrap();
    let b = tenancy::use_service("local").unwrap();
    assert!(std::sync::Arc::ptr_eq(&a, &b));

    // Registering the same name twice is refused.
    assert!(matches!(
        register_tenant(local_tenant("local")),
        Err(Error::Duplicate(_))
    ));

    // Selecting an unknown tenant is refused and leaves the current one.
    assert!(matches!(
        set_current_tenant("missing"),
        Err(Error::NotFound(_))
    ));
    assert_eq!(current_tenant().unwrap().name, "local");

    assert_eq!(
        tenancy::tenant_names().get("local").map(String::as_str),
        Some("local")
    );
}
