//! Cooperative task runtime and task-keyed data protection
//!
//! Domain operations span many tokio tasks scheduled under a single logical
//! job, so serializing on OS-thread identity would be wrong. Everything in
//! this module keys ownership on [`Task`] identity instead: the whole job
//! lineage shares lock ownership, and cancellation flows down the task tree.

mod shielded;
mod task;
mod tasked_lock;

pub use shielded::Shielded;
pub use task::{Task, TaskPayload, TaskStatus};
pub use tasked_lock::TaskedLock;
