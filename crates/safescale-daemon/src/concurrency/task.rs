//! Unit of cooperative work
//!
//! A [`Task`] carries an identity, a parent link, a status, and a
//! cancellation signal. Cancellation is cooperative: [`Task::abort`] fires
//! the signal, and well-behaved workers observe it at their next suspension
//! point (a wait, a lock acquisition, a provider call) and bail out.

use std::any::Any;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use safescale_common::{Error, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Opaque per-task result.
pub type TaskPayload = Box<dyn Any + Send>;

/// Lifecycle states of a task. Terminal states are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    New,
    Running,
    Done,
    Aborted,
    Timeout,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Aborted | Self::Timeout)
    }
}

struct TaskCore {
    id: Mutex<String>,
    /// Set once `set_id` has been called; a second call is refused.
    id_overridden: AtomicBool,
    status: Mutex<TaskStatus>,
    token: CancellationToken,
    deadline: Mutex<Option<Duration>>,
    created_at: Instant,
    parent: Weak<TaskCore>,
    handle: Mutex<Option<JoinHandle<Result<TaskPayload>>>>,
}

/// A handle on a unit of cooperative work.
///
/// Cloning yields another handle on the same task. The null sentinel
/// (`Task::null()`) is distinct from any live task and is rejected by every
/// operation with `invalid-parameter` or `invalid-instance`.
#[derive(Clone)]
pub struct Task {
    core: Option<Arc<TaskCore>>,
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.core {
            None => f.write_str("Task(null)"),
            Some(_) => f.debug_struct("Task").field("id", &self.id()).finish(),
        }
    }
}

impl Task {
    fn from_core(core: TaskCore) -> Self {
        Self {
            core: Some(Arc::new(core)),
        }
    }

    /// Create a root task with a fresh identity and its own cancellation.
    pub fn new() -> Self {
        Self::from_core(TaskCore {
            id: Mutex::new(Uuid::new_v4().to_string()),
            id_overridden: AtomicBool::new(false),
            status: Mutex::new(TaskStatus::New),
            token: CancellationToken::new(),
            deadline: Mutex::new(None),
            created_at: Instant::now(),
            parent: Weak::new(),
            handle: Mutex::new(None),
        })
    }

    /// Create a root task whose cancellation derives from an external token
    /// (the gRPC request context in practice).
    pub fn with_token(token: CancellationToken) -> Self {
        Self::from_core(TaskCore {
            id: Mutex::new(Uuid::new_v4().to_string()),
            id_overridden: AtomicBool::new(false),
            status: Mutex::new(TaskStatus::New),
            token,
            deadline: Mutex::new(None),
            created_at: Instant::now(),
            parent: Weak::new(),
            handle: Mutex::new(None),
        })
    }

    /// Create a child task; cancelling the parent cancels the child.
    pub fn child(&self) -> Result<Self> {
        let core = self.live("child")?;
        Ok(Self::from_core(TaskCore {
            id: Mutex::new(Uuid::new_v4().to_string()),
            id_overridden: AtomicBool::new(false),
            status: Mutex::new(TaskStatus::New),
            token: core.token.child_token(),
            deadline: Mutex::new(None),
            created_at: Instant::now(),
            parent: Arc::downgrade(core),
            handle: Mutex::new(None),
        }))
    }

    /// The null sentinel, rejected by every consumer.
    pub fn null() -> Self {
        Self { core: None }
    }

    /// Check whether this handle is the null sentinel.
    pub fn is_null(&self) -> bool {
        self.core.is_none()
    }

    fn live(&self, op: &'static str) -> Result<&Arc<TaskCore>> {
        self.core
            .as_ref()
            .ok_or(Error::InvalidInstance(op))
    }

    /// The task identity.
    ///
    /// Returns an empty string on the null sentinel; callers that need to
    /// distinguish use [`Task::is_null`].
    pub fn id(&self) -> String {
        match &self.core {
            None => String::new(),
            Some(core) => core.id.lock().unwrap().clone(),
        }
    }

    /// The id of the parent task, when the parent is still alive.
    pub fn parent_id(&self) -> Option<String> {
        let core = self.core.as_ref()?;
        let parent = core.parent.upgrade()?;
        let id = parent.id.lock().unwrap().clone();
        Some(id)
    }

    /// Replace the generated identity. Allowed exactly once.
    pub fn set_id(&self, id: impl Into<String>) -> Result<()> {
        let core = self.live("set_id")?;
        let id = id.into();
        if id.is_empty() {
            return Err(Error::invalid_parameter("id", "cannot be empty"));
        }
        if core.id_overridden.swap(true, Ordering::SeqCst) {
            return Err(Error::InconsistentState(
                "task id has already been set".to_string(),
            ));
        }
        *core.id.lock().unwrap() = id;
        Ok(())
    }

    /// Current lifecycle status.
    pub fn status(&self) -> TaskStatus {
        match &self.core {
            None => TaskStatus::New,
            Some(core) => *core.status.lock().unwrap(),
        }
    }

    /// Move to `next` unless the current status is terminal.
    fn transition(&self, next: TaskStatus) {
        if let Some(core) = &self.core {
            let mut status = core.status.lock().unwrap();
            if !status.is_terminal() {
                *status = next;
            }
        }
    }

    /// Arm a deadline, measured from task creation. [`Task::wait`] and
    /// [`Task::run_cancellable`] fail with `timeout` once it elapses.
    pub fn set_deadline(&self, deadline: Duration) -> Result<()> {
        let core = self.live("set_deadline")?;
        *core.deadline.lock().unwrap() = Some(deadline);
        Ok(())
    }

    /// The cancellation token backing this task.
    pub(crate) fn token(&self) -> Option<&CancellationToken> {
        self.core.as_ref().map(|c| &c.token)
    }

    /// Launch the task body. The task transitions to `Running`.
    ///
    /// The body receives a clone of this handle so it can observe
    /// cancellation and spawn children of its own.
    pub fn start<F, Fut>(&self, body: F) -> Result<()>
    where
        F: FnOnce(Task) -> Fut + Send + 'static,
        Fut: Future<Output = Result<TaskPayload>> + Send + 'static,
    {
        let core = self.live("start")?;
        let mut handle = core.handle.lock().unwrap();
        if handle.is_some() {
            return Err(Error::InconsistentState(
                "task has already been started".to_string(),
            ));
        }
        self.transition(TaskStatus::Running);
        let this = self.clone();
        *handle = Some(tokio::spawn(async move { body(this).await }));
        Ok(())
    }

    /// Wait for the task body to finish and collect its payload.
    ///
    /// A wait is a suspension point: when the task deadline elapses first,
    /// the task is cancelled and moves to `Timeout`; when the body reports
    /// `aborted`, the task moves to `Aborted`. The payload can be collected
    /// exactly once.
    pub async fn wait(&self) -> Result<TaskPayload> {
        let core = self.live("wait")?;
        let handle = core
            .handle
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| {
                Error::InconsistentState("task was not started or already waited on".to_string())
            })?;

        let deadline = *core.deadline.lock().unwrap();
        let joined = match deadline {
            Some(limit) => match tokio::time::timeout(limit, handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    core.token.cancel();
                    self.transition(TaskStatus::Timeout);
                    return Err(Error::Timeout(format!(
                        "task '{}' exceeded its deadline of {limit:?}",
                        self.id()
                    )));
                }
            },
            None => handle.await,
        };

        match joined {
            Ok(Ok(payload)) => {
                self.transition(TaskStatus::Done);
                Ok(payload)
            }
            Ok(Err(err)) => {
                if matches!(err, Error::Aborted(_)) {
                    self.transition(TaskStatus::Aborted);
                } else {
                    self.transition(TaskStatus::Done);
                }
                Err(err)
            }
            Err(join_err) => {
                self.transition(TaskStatus::Done);
                Err(Error::InconsistentState(format!(
                    "task '{}' body failed: {join_err}",
                    self.id()
                )))
            }
        }
    }

    /// Signal cancellation. Does not forcibly terminate the body.
    pub fn abort(&self) -> Result<()> {
        let core = self.live("abort")?;
        core.token.cancel();
        self.transition(TaskStatus::Aborted);
        Ok(())
    }

    /// Check whether this task (or an ancestor) has been cancelled.
    pub fn aborted(&self) -> bool {
        match &self.core {
            None => false,
            Some(core) => {
                *core.status.lock().unwrap() == TaskStatus::Aborted || core.token.is_cancelled()
            }
        }
    }

    /// Fail fast when cancellation has been requested.
    ///
    /// Called at the top of every provisioning step so an aborted job issues
    /// no further provider writes.
    pub fn check_abort(&self) -> Result<()> {
        if self.aborted() {
            self.transition(TaskStatus::Aborted);
            return Err(Error::Aborted(format!(
                "task '{}' has been cancelled",
                self.id()
            )));
        }
        Ok(())
    }

    /// Run a future, returning `aborted` as soon as cancellation fires and
    /// `timeout` when the task deadline elapses first.
    ///
    /// This is how provider calls become suspension points: the call itself
    /// keeps running on the provider side, but the task stops waiting for it
    /// and reports the interruption.
    pub async fn run_cancellable<T>(
        &self,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let core = self.live("run_cancellable")?;

        let remaining = match *core.deadline.lock().unwrap() {
            Some(limit) => match limit.checked_sub(core.created_at.elapsed()) {
                Some(rest) => Some(rest),
                None => {
                    self.transition(TaskStatus::Timeout);
                    return Err(Error::Timeout(format!(
                        "task '{}' exceeded its deadline of {limit:?}",
                        self.id()
                    )));
                }
            },
            None => None,
        };

        let work = async {
            tokio::select! {
                _ = core.token.cancelled() => {
                    self.transition(TaskStatus::Aborted);
                    Err(Error::Aborted(format!(
                        "task '{}' has been cancelled",
                        self.id()
                    )))
                }
                res = fut => res,
            }
        };

        match remaining {
            Some(rest) => match tokio::time::timeout(rest, work).await {
                Ok(res) => res,
                Err(_) => {
                    self.transition(TaskStatus::Timeout);
                    Err(Error::Timeout(format!(
                        "task '{}' exceeded its deadline",
                        self.id()
                    )))
                }
            },
            None => work.await,
        }
    }
}

impl Default for Task {
    fn default() -> Self {
        Self::new()
    }
}
