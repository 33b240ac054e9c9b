//! Abstraction over heterogeneous IaaS providers
//!
//! One [`provider::Provider`] binds a credential set to a backend; a
//! [`service::Service`] wraps a bound provider together with its metadata
//! bucket. Tenancy (configuration, registry, current-tenant selection)
//! lives in [`tenancy`].

pub mod objectstorage;
pub mod provider;
pub mod providers;
pub mod resources;
pub mod service;
pub mod tenancy;

pub use provider::{Capabilities, Provider};
pub use service::Service;
pub use tenancy::Tenant;
