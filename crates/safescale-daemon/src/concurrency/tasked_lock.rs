//! Read/write lock keyed by task identity
//!
//! Ownership is tied to the logical [`Task`] carried by the caller, not to
//! the OS thread or tokio worker the code happens to run on. Reads are
//! reentrant per task; writes are reentrant for the same task id only.
//! Upgrading a read hold to a write hold is refused instead of deadlocking.

use std::collections::HashMap;
use std::sync::Mutex;

use safescale_common::{Error, Result};
use tokio::sync::watch;

use super::task::Task;

#[derive(Default)]
struct LockState {
    /// Read hold counts per task id
    readers: HashMap<String, usize>,
    /// Write holder and its reentrancy count
    writer: Option<(String, usize)>,
}

/// A reader-writer lock whose ownership unit is a task identity.
pub struct TaskedLock {
    state: Mutex<LockState>,
    /// Version channel; bumped on every release so waiters re-check.
    /// Subscribing before the check means a release between check and await
    /// still wakes the waiter (watch tracks seen versions).
    changed_tx: watch::Sender<()>,
    changed_rx: watch::Receiver<()>,
}

impl Default for TaskedLock {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskedLock {
    pub fn new() -> Self {
        let (changed_tx, changed_rx) = watch::channel(());
        Self {
            state: Mutex::new(LockState::default()),
            changed_tx,
            changed_rx,
        }
    }

    fn check_task(task: &Task) -> Result<String> {
        if task.is_null() {
            return Err(Error::invalid_parameter(
                "task",
                "cannot be the null task",
            ));
        }
        Ok(task.id())
    }

    /// Acquire a read hold for `task`, waiting while a writer holds the lock.
    ///
    /// Reentrant: a task already holding a read (or write) hold may acquire
    /// another read hold without blocking. Acquisition is a suspension point
    /// and returns `aborted` when the task is cancelled while waiting.
    pub async fn r_lock(&self, task: &Task) -> Result<()> {
        let id = Self::check_task(task)?;
        let mut rx = self.changed_rx.clone();
        loop {
            task.check_abort()?;
            {
                let mut state = self.state.lock().unwrap();
                let blocked = match &state.writer {
                    Some((owner, _)) => *owner != id,
                    None => false,
                };
                if !blocked {
                    *state.readers.entry(id.clone()).or_insert(0) += 1;
                    return Ok(());
                }
            }
            self.wait_for_change(task, &mut rx).await?;
        }
    }

    /// Release one read hold for `task`.
    pub fn r_unlock(&self, task: &Task) -> Result<()> {
        let id = Self::check_task(task)?;
        let mut state = self.state.lock().unwrap();
        match state.readers.get_mut(&id) {
            Some(count) if *count > 1 => {
                *count -= 1;
            }
            Some(_) => {
                state.readers.remove(&id);
            }
            None => return Err(Error::NotOwner { task: id }),
        }
        drop(state);
        let _ = self.changed_tx.send(());
        Ok(())
    }

    /// Acquire the write hold for `task`, waiting while other tasks hold
    /// read or write locks.
    ///
    /// Reentrant for the same task id. A task holding only a read lock
    /// cannot upgrade: the attempt fails with `inconsistent-state` instead
    /// of deadlocking on its own read hold.
    pub async fn lock(&self, task: &Task) -> Result<()> {
        let id = Self::check_task(task)?;
        let mut rx = self.changed_rx.clone();
        loop {
            task.check_abort()?;
            {
                let mut state = self.state.lock().unwrap();
                match &mut state.writer {
                    Some((owner, count)) if *owner == id => {
                        *count += 1;
                        return Ok(());
                    }
                    Some(_) => {} // another writer; wait
                    None => {
                        if state.readers.contains_key(&id) {
                            return Err(Error::InconsistentState(format!(
                                "task '{id}' cannot upgrade a read lock to a write lock"
                            )));
                        }
                        if state.readers.is_empty() {
                            state.writer = Some((id.clone(), 1));
                            return Ok(());
                        }
                    }
                }
            }
            self.wait_for_change(task, &mut rx).await?;
        }
    }

    /// Release one write hold for `task`.
    pub fn unlock(&self, task: &Task) -> Result<()> {
        let id = Self::check_task(task)?;
        let mut state = self.state.lock().unwrap();
        match &mut state.writer {
            Some((owner, count)) if *owner == id => {
                if *count > 1 {
                    *count -= 1;
                } else {
                    state.writer = None;
                }
            }
            _ => return Err(Error::NotOwner { task: id }),
        }
        drop(state);
        let _ = self.changed_tx.send(());
        Ok(())
    }

    async fn wait_for_change(
        &self,
        task: &Task,
        rx: &mut watch::Receiver<()>,
    ) -> Result<()> {
        match task.token() {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => task.check_abort(),
                    res = rx.changed() => {
                        res.map_err(|_| {
                            Error::InconsistentState("lock dropped while waiting".to_string())
                        })
                    }
                }
            }
            None => Err(Error::invalid_parameter("task", "cannot be the null task")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_reentrant_read() {
        let lock = TaskedLock::new();
        let task = Task::new();
        lock.r_lock(&task).await.unwrap();
        lock.r_lock(&task).await.unwrap();
        lock.r_unlock(&task).unwrap();
        lock.r_unlock(&task).unwrap();
        assert!(matches!(
            lock.r_unlock(&task),
            Err(Error::NotOwner { .. })
        ));
    }

    #[tokio::test]
    async fn test_concurrent_readers() {
        let lock = Arc::new(TaskedLock::new());
        let t1 = Task::new();
        let t2 = Task::new();
        lock.r_lock(&t1).await.unwrap();
        lock.r_lock(&t2).await.unwrap();
        lock.r_unlock(&t1).unwrap();
        lock.r_unlock(&t2).unwrap();
    }

    #[tokio::test]
    async fn test_writer_excludes_readers() {
        let lock = Arc::new(TaskedLock::new());
        let writer = Task::new();
        let reader = Task::new();
        lock.lock(&writer).await.unwrap();

        let contender = {
            let lock = lock.clone();
            let reader = reader.clone();
            tokio::spawn(async move { lock.r_lock(&reader).await })
        };
        // Give the contender time to park on the lock.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        lock.unlock(&writer).unwrap();
        contender.await.unwrap().unwrap();
        lock.r_unlock(&reader).unwrap();
    }

    #[tokio::test]
    async fn test_write_reentrant_same_task() {
        let lock = TaskedLock::new();
        let task = Task::new();
        lock.lock(&task).await.unwrap();
        lock.lock(&task).await.unwrap();
        lock.unlock(&task).unwrap();
        lock.unlock(&task).unwrap();
        assert!(matches!(lock.unlock(&task), Err(Error::NotOwner { .. })));
    }

    #[tokio::test]
    async fn test_upgrade_is_refused() {
        let lock = TaskedLock::new();
        let task = Task::new();
        lock.r_lock(&task).await.unwrap();
        assert!(matches!(
            lock.lock(&task).await,
            Err(Error::InconsistentState(_))
        ));
        lock.r_unlock(&task).unwrap();
    }

    #[tokio::test]
    async fn test_null_task_rejected() {
        let lock = TaskedLock::new();
        let null = Task::null();
        assert!(matches!(
            lock.r_lock(&null).await,
            Err(Error::InvalidParameter { .. })
        ));
        assert!(matches!(
            lock.lock(&null).await,
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[tokio::test]
    async fn test_abort_while_waiting() {
        let lock = Arc::new(TaskedLock::new());
        let holder = Task::new();
        lock.lock(&holder).await.unwrap();

        let waiter = Task::new();
        let contender = {
            let lock = lock.clone();
            let waiter = waiter.clone();
            tokio::spawn(async move { lock.lock(&waiter).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        waiter.abort().unwrap();
        let res = contender.await.unwrap();
        assert!(matches!(res, Err(Error::Aborted(_))));

        lock.unlock(&holder).unwrap();
    }
}
