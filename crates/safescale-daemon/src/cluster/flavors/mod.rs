//! Flavor registry
//!
//! Each flavor module contributes one [`Makers`] record. Flavors whose
//! tooling has not been ported yet are recognized names that resolve to
//! `not-implemented`, so requests for them fail at validation instead of
//! mid-provisioning.

pub mod boh;

use safescale_common::{Error, Flavor, Result};

use super::control::Makers;

/// Resolve the Makers record registered for a flavor.
pub fn makers_for(flavor: Flavor) -> Result<&'static Makers> {
    match flavor {
        Flavor::Boh => Ok(&boh::MAKERS),
        Flavor::K8s => Err(Error::NotImplemented("K8S flavor is not available yet")),
        Flavor::Swarm => Err(Error::NotImplemented("SWARM flavor is not available yet")),
        Flavor::Dcos => Err(Error::NotImplemented("DCOS flavor is not available yet")),
        Flavor::Ohpc => Err(Error::NotImplemented("OHPC flavor is not available yet")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boh_is_registered() {
        assert!(makers_for(Flavor::Boh).is_ok());
    }

    #[test]
    fn test_unported_flavors_are_stubs() {
        assert!(matches!(
            makers_for(Flavor::Dcos),
            Err(Error::NotImplemented(_))
        ));
    }
}
