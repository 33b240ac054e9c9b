//! Cluster control plane
//!
//! A cluster is a set of heterogeneous hosts (gateway, masters, private and
//! public workers) materialized on one provider. The generic lifecycle
//! lives in [`control`]; flavor-specific decisions are injected through a
//! [`control::Makers`] record registered in [`flavors`].

pub mod control;
pub mod flavors;
pub mod metadata;
pub mod properties;
pub mod scripts;

use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::Rng;
use safescale_common::{defaults, Complexity, Error, Flavor, HostDefinition, Result};
use tracing::info;

use crate::concurrency::Task;
use crate::iaas::Service;
use control::{Controller, Foreman};
use properties::{ClusterIdentity, Keypair};

/// What kind of cluster is wanted.
#[derive(Debug, Clone)]
pub struct ClusterRequest {
    pub name: String,
    pub cidr: String,
    pub flavor: Flavor,
    pub complexity: Complexity,
    /// Attach to a pre-existing network instead of creating one
    pub network_id: Option<String>,
    /// Overlay on the flavor's default node sizing
    pub node_sizing: Option<HostDefinition>,
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_parameter("req.name", "cannot be empty"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(Error::invalid_parameter(
            "req.name",
            "must contain only lowercase letters, digits and dashes",
        ));
    }
    Ok(())
}

fn validate_cidr(cidr: &str) -> Result<()> {
    let invalid = || Error::invalid_parameter("req.cidr", format!("'{cidr}' is not a valid CIDR"));
    let (addr, prefix) = cidr.split_once('/').ok_or_else(invalid)?;
    addr.parse::<std::net::Ipv4Addr>().map_err(|_| invalid())?;
    let prefix: u8 = prefix.parse().map_err(|_| invalid())?;
    if !(8..=30).contains(&prefix) {
        return Err(invalid());
    }
    Ok(())
}

fn generate_keypair(cluster_name: &str) -> Result<Keypair> {
    let kp = rcgen::KeyPair::generate()
        .map_err(|e| Error::provider(format!("failed to generate cluster keypair: {e}")))?;
    Ok(Keypair {
        name: format!("{cluster_name}-key"),
        public_key: kp.public_key_pem(),
        private_key: kp.serialize_pem(),
    })
}

fn generate_admin_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(defaults::ADMIN_PASSWORD_LENGTH)
        .map(char::from)
        .collect()
}

/// Create a cluster: validate the request, persist the `Created` placeholder
/// and drive provisioning to `Nominal`.
///
/// On a provisioning failure the cluster is left in `Error` with its
/// residue intact; deletion is the reconciliation path.
pub async fn create(
    task: &Task,
    service: Arc<Service>,
    req: ClusterRequest,
) -> Result<Arc<Controller>> {
    validate_name(&req.name)?;
    validate_cidr(&req.cidr)?;
    let makers = flavors::makers_for(req.flavor)?;

    if metadata::exists(&service, &req.name).await? {
        return Err(Error::duplicate(format!(
            "a cluster named '{}' already exists",
            req.name
        )));
    }

    let identity = ClusterIdentity {
        name: req.name.clone(),
        cidr: req.cidr.clone(),
        flavor: req.flavor,
        complexity: req.complexity,
        keypair: generate_keypair(&req.name)?,
        admin_password: generate_admin_password(),
        tenant: service.tenant_name().to_string(),
    };

    let controller = Arc::new(Controller::new(service, makers, identity));
    controller.save_metadata(task).await?;
    info!(
        cluster = %req.name,
        flavor = %req.flavor,
        complexity = %req.complexity,
        "cluster metadata created"
    );

    let foreman = Foreman::new(controller.clone());
    foreman.construct(task, &req).await?;
    Ok(controller)
}

/// Load an existing cluster from the tenant metadata bucket.
pub async fn load(
    task: &Task,
    service: Arc<Service>,
    name: &str,
) -> Result<Arc<Controller>> {
    validate_name(name)?;
    metadata::load(task, service, name).await
}

/// Names of the clusters recorded for this tenant.
pub async fn list(service: &Service) -> Result<Vec<String>> {
    metadata::list_names(service).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("demo-1").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("Demo").is_err());
        assert!(validate_name("demo_1").is_err());
    }

    #[test]
    fn test_validate_cidr() {
        assert!(validate_cidr("192.168.0.0/24").is_ok());
        assert!(validate_cidr("10.0.0.0/8").is_ok());
        assert!(validate_cidr("192.168.0.0").is_err());
        assert!(validate_cidr("192.168.0.0/33").is_err());
        assert!(validate_cidr("not-a-cidr/24").is_err());
    }

    #[test]
    fn test_generated_keypair_is_pem() {
        let kp = generate_keypair("demo").unwrap();
        assert!(kp.public_key.contains("BEGIN PUBLIC KEY"));
        assert!(kp.private_key.contains("BEGIN PRIVATE KEY"));
        assert_eq!(kp.name, "demo-key");
    }

    #[test]
    fn test_admin_password_length() {
        let pw = generate_admin_password();
        assert_eq!(pw.len(), defaults::ADMIN_PASSWORD_LENGTH);
        assert!(pw.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
