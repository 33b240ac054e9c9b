//! Cluster metadata persistence
//!
//! Each cluster persists its shielded witnesses as JSON under
//! `clusters/<name>/` in the tenant metadata bucket. The folder's existence
//! is what makes duplicate detection and enumeration work across daemon
//! restarts.

use std::collections::BTreeSet;
use std::sync::Arc;

use safescale_common::Result;

use super::control::Controller;
use crate::concurrency::Task;
use crate::iaas::Service;

pub(super) const FOLDER: &str = "clusters";

pub(super) fn key(cluster: &str, part: &str) -> String {
    format!("{FOLDER}/{cluster}/{part}")
}

/// Check whether a cluster of this name is recorded for the tenant.
pub async fn exists(service: &Service, name: &str) -> Result<bool> {
    let keys = service.storage().list(&format!("{FOLDER}/{name}/")).await?;
    Ok(!keys.is_empty())
}

/// Enumerate the cluster names recorded for the tenant.
pub async fn list_names(service: &Service) -> Result<Vec<String>> {
    let keys = service.storage().list(&format!("{FOLDER}/")).await?;
    let names: BTreeSet<String> = keys
        .iter()
        .filter_map(|k| k.strip_prefix(&format!("{FOLDER}/")))
        .filter_map(|k| k.split('/').next())
        .map(str::to_string)
        .collect();
    Ok(names.into_iter().collect())
}

/// Rebuild a controller from the tenant metadata bucket.
pub async fn load(task: &Task, service: Arc<Service>, name: &str) -> Result<Arc<Controller>> {
    Controller::load(task, service, name).await
}

/// Drop every record of a cluster.
pub async fn remove(service: &Service, name: &str) -> Result<()> {
    for key in service.storage().list(&format!("{FOLDER}/{name}/")).await? {
        service.storage().delete(&key).await?;
    }
    Ok(())
}
