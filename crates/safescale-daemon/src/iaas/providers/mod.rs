//! Provider implementations and the factory table

pub mod cloudferro;
pub mod local;
pub mod openstack;

use std::sync::Arc;

use super::provider::Provider;

/// Resolve a provider template by backend name.
///
/// The returned instance is unbound; call [`Provider::build`] with tenant
/// parameters to obtain a usable provider.
pub fn lookup(name: &str) -> Option<Arc<dyn Provider>> {
    match name {
        "local" => Some(Arc::new(local::LocalProvider::new())),
        "openstack" => Some(Arc::new(openstack::OpenStackProvider::template())),
        "cloudferro" => Some(Arc::new(cloudferro::CloudFerroProvider::template())),
        _ => None,
    }
}

/// Names of all registered backends.
pub fn names() -> &'static [&'static str] {
    &["local", "openstack", "cloudferro"]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_backends() {
        for name in names() {
            assert!(lookup(name).is_some(), "missing factory for {name}");
        }
    }

    #[test]
    fn test_lookup_unknown_backend() {
        assert!(lookup("aws").is_none());
    }
}
