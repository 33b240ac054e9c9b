//! Generic cluster lifecycle engine
//!
//! The [`Controller`] owns a cluster's shielded properties; the [`Foreman`]
//! drives provisioning, scaling and teardown on top of the provider
//! abstraction, deferring every flavor-specific decision to the cluster's
//! [`Makers`] record.

mod controller;
mod foreman;
mod makers;

pub use controller::Controller;
pub use foreman::Foreman;
pub use makers::Makers;
