//! Abstract resource model shared by all providers

use safescale_common::{HostDefinition, HostEffectiveSizing};
use serde::{Deserialize, Serialize};

/// Power state of a host as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HostState {
    #[default]
    Starting,
    Started,
    Stopping,
    Stopped,
    Failed,
}

/// A host as known to a provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostCore {
    pub id: String,
    pub name: String,
    pub private_ip: String,
    pub public_ip: Option<String>,
    pub sizing: HostEffectiveSizing,
    pub state: HostState,
    pub network_id: String,
    pub image: String,
}

/// What a caller asks a provider for when creating a host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostRequest {
    pub resource_name: String,
    pub image: String,
    pub sizing: HostDefinition,
    pub network_id: String,
    /// Allocate a public address for the host
    pub public_ip: bool,
}

/// A network as known to a provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Network {
    pub id: String,
    pub name: String,
    pub cidr: String,
}

/// What a caller asks a provider for when creating a network.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkRequest {
    pub name: String,
    pub cidr: String,
    pub dns_servers: Vec<String>,
}

/// A block volume as known to a provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Volume {
    pub id: String,
    pub name: String,
    /// Size in GiB
    pub size: u32,
}

/// What a caller asks a provider for when creating a volume.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolumeRequest {
    pub name: String,
    /// Size in GiB
    pub size: u32,
}

/// An instance template offered by a provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostTemplate {
    pub id: String,
    pub name: String,
    pub cores: u32,
    /// RAM in GiB
    pub ram_size: f32,
    /// Disk in GiB
    pub disk_size: u32,
    pub gpu_count: u32,
}

/// An OS image offered by a provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Image {
    pub id: String,
    pub name: String,
}
