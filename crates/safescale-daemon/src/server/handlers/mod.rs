//! Per-resource business logic bound to one job
//!
//! Handlers implement what the gRPC listeners expose. Each handler borrows
//! the job it runs under, wraps failures with a one-line description at the
//! boundary, and logs them on exit.

mod cluster;
mod template;
mod tenant;

pub use cluster::{ClusterHandler, ClusterSnapshot};
pub use template::TemplateHandler;
pub use tenant::TenantHandler;
