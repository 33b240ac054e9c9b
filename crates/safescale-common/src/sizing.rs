//! Requested and effective host sizing
//!
//! A *requested* sizing ([`HostDefinition`]) expresses what the caller asked
//! for; an *effective* sizing ([`HostEffectiveSizing`]) records what the
//! provider actually allocated after template matching.

use serde::{Deserialize, Serialize};

/// Host sizing as requested by a caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostDefinition {
    pub cores: u32,
    /// RAM in GiB
    pub ram_size: f32,
    /// Disk in GiB
    pub disk_size: u32,
    pub gpu_count: u32,
    pub gpu_type: String,
    /// CPU frequency in GHz; 0 means "no preference"
    pub cpu_freq: f32,
}

impl HostDefinition {
    /// Merge unset fields (zero values) from `other` into this definition.
    ///
    /// Used to overlay a caller-supplied sizing on top of a flavor default.
    pub fn complete_with(mut self, other: &HostDefinition) -> Self {
        if self.cores == 0 {
            self.cores = other.cores;
        }
        if self.ram_size == 0.0 {
            self.ram_size = other.ram_size;
        }
        if self.disk_size == 0 {
            self.disk_size = other.disk_size;
        }
        if self.gpu_count == 0 {
            self.gpu_count = other.gpu_count;
        }
        if self.gpu_type.is_empty() {
            self.gpu_type = other.gpu_type.clone();
        }
        if self.cpu_freq == 0.0 {
            self.cpu_freq = other.cpu_freq;
        }
        self
    }
}

/// Host sizing as effectively allocated by a provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostEffectiveSizing {
    pub cores: u32,
    /// RAM in GiB
    pub ram_size: f32,
    /// Disk in GiB
    pub disk_size: u32,
    pub gpu_count: u32,
    pub gpu_type: String,
    pub cpu_freq: f32,
}

impl From<&HostDefinition> for HostEffectiveSizing {
    fn from(def: &HostDefinition) -> Self {
        Self {
            cores: def.cores,
            ram_size: def.ram_size,
            disk_size: def.disk_size,
            gpu_count: def.gpu_count,
            gpu_type: def.gpu_type.clone(),
            cpu_freq: def.cpu_freq,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_with_fills_only_unset_fields() {
        let defaults = HostDefinition {
            cores: 4,
            ram_size: 15.0,
            disk_size: 100,
            ..Default::default()
        };
        let requested = HostDefinition {
            cores: 8,
            ..Default::default()
        };

        let merged = requested.complete_with(&defaults);
        assert_eq!(merged.cores, 8);
        assert_eq!(merged.ram_size, 15.0);
        assert_eq!(merged.disk_size, 100);
    }
}
