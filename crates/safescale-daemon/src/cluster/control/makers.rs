//! Flavor hook record
//!
//! A flavor contributes one [`Makers`] record of plain function values; the
//! foreman resolves unset hooks to generic defaults. Adding a flavor means
//! adding a record, not a dispatch hierarchy.

use std::sync::Arc;

use safescale_common::{HostDefinition, NodeType, Result};

use super::foreman::Foreman;
use crate::cluster::scripts::{ScriptBox, TemplateData};
use crate::concurrency::Task;

/// Flavor-specific decisions consumed by the foreman.
///
/// Every field is optional; see the foreman for the generic defaults.
#[derive(Default)]
pub struct Makers {
    /// Minimum (masters, private nodes, public nodes) for the cluster's
    /// complexity.
    pub minimum_required_servers: Option<fn(&Task, &Foreman) -> (u32, u32, u32)>,
    pub default_gateway_sizing: Option<fn(&Task, &Foreman) -> HostDefinition>,
    pub default_master_sizing: Option<fn(&Task, &Foreman) -> HostDefinition>,
    pub default_node_sizing: Option<fn(&Task, &Foreman) -> HostDefinition>,
    /// Image name to provision members from, e.g. "Ubuntu 18.04".
    pub default_image: Option<fn(&Task, &Foreman) -> String>,
    /// Render (and memoize) the common bootstrap script.
    pub get_global_system_requirements: Option<fn(&Task, &Foreman) -> Result<Arc<String>>>,
    /// Installation script for a member of the given type, with the
    /// flavor-specific part of its substitution environment.
    pub get_node_installation_script:
        Option<fn(&Task, &Foreman, NodeType) -> (String, TemplateData)>,
    /// The flavor's embedded script directory.
    pub get_template_box: Option<fn() -> Result<&'static ScriptBox>>,
}
