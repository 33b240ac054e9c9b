//! Request-scoped execution: jobs, handlers, gRPC listeners

pub mod handlers;
pub mod job;
pub mod listeners;

pub use job::{abort_job_by_id, list_jobs, Job};
