//! Daemon jobs and the process-wide job registry
//!
//! A [`Job`] bundles everything a request needs while it executes: the
//! correlation uuid, the root task, the service handle, and a one-shot
//! cancellation. Registered jobs can be enumerated and aborted through the
//! registry, which is the second of the two unavoidable process-wide tables.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use safescale_common::{Error, Result};
use tokio_util::sync::CancellationToken;
use tracing::warn;
use uuid::Uuid;

use crate::concurrency::Task;
use crate::iaas::Service;

/// The information needed by the daemon to execute one request.
pub struct Job {
    uuid: String,
    description: String,
    tenant: String,
    task: Task,
    cancel: Mutex<Option<CancellationToken>>,
    service: Arc<Service>,
    start_time: DateTime<Utc>,
    started: Instant,
}

impl Job {
    /// Create and register a job.
    ///
    /// `uuid_header` carries the correlation uuid from the gRPC metadata;
    /// when the request carries none a fresh v4 uuid is minted and a
    /// warning is emitted. An empty header is a caller error.
    pub fn new(
        uuid_header: Option<String>,
        service: Arc<Service>,
        description: impl Into<String>,
    ) -> Result<Arc<Self>> {
        if service.provider().is_null() {
            return Err(Error::invalid_parameter(
                "service",
                "cannot be backed by the null provider",
            ));
        }

        let uuid = match uuid_header {
            Some(raw) if raw.is_empty() => {
                return Err(Error::invalid_parameter(
                    "uuid_header",
                    "request does not carry a valid uuid",
                ));
            }
            Some(raw) => raw,
            None => {
                warn!("request does not carry a uuid, generating one");
                Uuid::new_v4().to_string()
            }
        };

        let cancel = CancellationToken::new();
        let task = Task::with_token(cancel.child_token());
        task.set_id(format!("job-task:{uuid}"))?;

        let job = Arc::new(Self {
            uuid,
            description: description.into(),
            tenant: service.tenant_name().to_string(),
            task,
            cancel: Mutex::new(Some(cancel)),
            service,
            start_time: Utc::now(),
            started: Instant::now(),
        });
        register(&job)?;
        Ok(job)
    }

    /// The correlation uuid of the request.
    pub fn id(&self) -> &str {
        &self.uuid
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    /// The root task every operation of this job runs under.
    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn service(&self) -> &Arc<Service> {
        &self.service
    }

    /// Time elapsed since the job was created.
    pub fn duration(&self) -> Duration {
        self.started.elapsed()
    }

    /// Fire the one-shot cancellation. A second call is a no-op for the
    /// cancel side.
    pub fn abort(&self) -> Result<()> {
        let mut cancel = self.cancel.lock().unwrap();
        if let Some(token) = cancel.take() {
            token.cancel();
        }
        self.task.abort()
    }

    /// Check whether the root task has been aborted.
    pub fn aborted(&self) -> bool {
        self.task.aborted()
    }

    /// Deregister the job and fire the cancellation if still armed.
    ///
    /// Called exactly once by the listener that opened the job.
    pub fn close(&self) {
        let _ = deregister(&self.uuid);
        let mut cancel = self.cancel.lock().unwrap();
        if let Some(token) = cancel.take() {
            token.cancel();
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Job: {} (started at {})",
            self.description, self.start_time
        )
    }
}

// ── Process-wide registry ───────────────────────────────────────────────

fn registry() -> &'static Mutex<HashMap<String, Arc<Job>>> {
    static JOBS: OnceLock<Mutex<HashMap<String, Arc<Job>>>> = OnceLock::new();
    JOBS.get_or_init(|| Mutex::new(HashMap::new()))
}

fn register(job: &Arc<Job>) -> Result<()> {
    let mut jobs = registry().lock().unwrap();
    if jobs.contains_key(job.id()) {
        return Err(Error::duplicate(format!(
            "a job with uuid '{}' is already registered",
            job.id()
        )));
    }
    jobs.insert(job.id().to_string(), job.clone());
    Ok(())
}

fn deregister(uuid: &str) -> Result<()> {
    if uuid.is_empty() {
        return Err(Error::invalid_parameter("uuid", "cannot be empty"));
    }
    registry()
        .lock()
        .unwrap()
        .remove(uuid)
        .map(|_| ())
        .ok_or_else(|| Error::not_found(format!("no job identified by '{uuid}' found")))
}

/// Ask the job identified by `id` to abort.
pub fn abort_job_by_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::invalid_parameter("id", "cannot be empty"));
    }
    let job = registry()
        .lock()
        .unwrap()
        .get(id)
        .cloned()
        .ok_or_else(|| Error::not_found(format!("no job identified by '{id}' found")))?;
    job.abort()
        .map_err(|e| e.with_context(&format!("failed to stop job '{id}'")))
}

/// Snapshot of registered jobs: uuid mapped to description.
pub fn list_jobs() -> HashMap<String, String> {
    registry()
        .lock()
        .unwrap()
        .iter()
        .map(|(uuid, job)| (uuid.clone(), job.description().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iaas::objectstorage::MemoryStorage;
    use crate::iaas::providers::local::LocalProvider;

    fn service() -> Arc<Service> {
        Arc::new(Service::new(
            "test",
            Arc::new(LocalProvider::new()),
            Arc::new(MemoryStorage::new()),
            "0.safescale-test",
        ))
    }

    #[tokio::test]
    async fn test_job_registers_and_closes() {
        let uuid = Uuid::new_v4().to_string();
        let job = Job::new(Some(uuid.clone()), service(), "test: lifecycle").unwrap();
        assert_eq!(job.task().id(), format!("job-task:{uuid}"));
        assert!(list_jobs().contains_key(&uuid));

        job.close();
        assert!(!list_jobs().contains_key(&uuid));
        assert!(matches!(
            abort_job_by_id(&uuid),
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_uuid_rejected() {
        let uuid = Uuid::new_v4().to_string();
        let job = Job::new(Some(uuid.clone()), service(), "test: first").unwrap();
        assert!(matches!(
            Job::new(Some(uuid.clone()), service(), "test: second"),
            Err(Error::Duplicate(_))
        ));
        job.close();
    }

    #[tokio::test]
    async fn test_empty_uuid_header_rejected() {
        assert!(matches!(
            Job::new(Some(String::new()), service(), "test: empty header"),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[tokio::test]
    async fn test_abort_marks_root_task() {
        let uuid = Uuid::new_v4().to_string();
        let job = Job::new(Some(uuid.clone()), service(), "test: abort").unwrap();
        assert!(!job.aborted());

        abort_job_by_id(&uuid).unwrap();
        assert!(job.aborted());

        // The cancel side is one-shot; a second abort still succeeds.
        job.abort().unwrap();
        job.close();
    }

    #[tokio::test]
    async fn test_missing_header_mints_uuid() {
        let job = Job::new(None, service(), "test: minted uuid").unwrap();
        assert!(!job.id().is_empty());
        job.close();
    }
}
