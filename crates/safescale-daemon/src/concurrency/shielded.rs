//! Clone-on-read, commit-on-write data protection
//!
//! A [`Shielded`] wraps one long-lived domain value (the *witness*) behind a
//! [`TaskedLock`]. Readers only ever see a private deep clone; writers
//! mutate a clone and replace the witness atomically under the write lock.
//! The witness is never aliased outside the lock.

use safescale_common::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Mutex;
use tracing::warn;

use super::task::Task;
use super::tasked_lock::TaskedLock;

/// Container serializing all access to one domain value through a
/// task-keyed lock.
pub struct Shielded<T> {
    witness: Mutex<T>,
    lock: TaskedLock,
}

impl<T> Shielded<T>
where
    T: Clone + Send,
{
    /// Wrap `witness` in a new protection domain with its own lock.
    pub fn new(witness: T) -> Self {
        Self {
            witness: Mutex::new(witness),
            lock: TaskedLock::new(),
        }
    }

    /// Create a new `Shielded` wrapping a deep clone of the witness.
    ///
    /// The clone does not inherit any lock state.
    pub fn clone_shielded(&self) -> Self {
        Self::new(self.witness.lock().unwrap().clone())
    }

    /// Read the witness through a private clone under the read lock.
    ///
    /// `inspector` receives a deep clone; mutations of the clone are
    /// discarded. Errors from `inspector` propagate; unlock errors are
    /// logged and promoted to the return only when `inspector` succeeded.
    pub async fn inspect<R>(
        &self,
        task: &Task,
        inspector: impl FnOnce(&T) -> Result<R>,
    ) -> Result<R> {
        if task.is_null() {
            return Err(Error::invalid_parameter("task", "cannot be the null task"));
        }

        self.lock.r_lock(task).await?;
        let clone = self.witness.lock().unwrap().clone();
        let res = inspector(&clone);

        if let Err(unlock_err) = self.lock.r_unlock(task) {
            warn!(error = %unlock_err, "failed to release read lock");
            if res.is_ok() {
                return Err(unlock_err);
            }
        }
        res
    }

    /// Mutate the witness through a clone under the write lock.
    ///
    /// `alterer` receives a deep clone. When it succeeds the clone replaces
    /// the witness; when it returns the `altered-nothing` sentinel the
    /// witness is left untouched and the call still succeeds; any other
    /// error aborts the commit.
    pub async fn alter(
        &self,
        task: &Task,
        alterer: impl FnOnce(&mut T) -> Result<()>,
    ) -> Result<()> {
        if task.is_null() {
            return Err(Error::invalid_parameter("task", "cannot be the null task"));
        }

        self.lock.lock(task).await?;
        let mut clone = self.witness.lock().unwrap().clone();
        let res = match alterer(&mut clone) {
            Ok(()) => {
                *self.witness.lock().unwrap() = clone;
                Ok(())
            }
            Err(err) if err.is_altered_nothing() => Ok(()),
            Err(err) => Err(err),
        };

        if let Err(unlock_err) = self.lock.unlock(task) {
            warn!(error = %unlock_err, "failed to release write lock");
            if res.is_ok() {
                return Err(unlock_err);
            }
        }
        res
    }
}

impl<T> Shielded<T>
where
    T: Clone + Send + Serialize + DeserializeOwned,
{
    /// Encode the witness as JSON under the read lock.
    pub async fn serialize(&self, task: &Task) -> Result<Vec<u8>> {
        self.inspect(task, |witness| {
            serde_json::to_vec(witness).map_err(|e| Error::Syntax(format!("failed to marshal: {e}")))
        })
        .await
    }

    /// Replace the witness from JSON under the write lock.
    pub async fn deserialize(&self, task: &Task, buf: &[u8]) -> Result<()> {
        if buf.is_empty() {
            return Err(Error::invalid_parameter("buf", "cannot be empty"));
        }
        let decoded: T = serde_json::from_slice(buf)
            .map_err(|e| Error::Syntax(format!("failed to unmarshal: {e}")))?;
        self.alter(task, |witness| {
            *witness = decoded;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Witness {
        name: String,
        members: Vec<String>,
    }

    fn witness() -> Witness {
        Witness {
            name: "alpha".to_string(),
            members: vec!["a".to_string(), "b".to_string()],
        }
    }

    #[tokio::test]
    async fn test_inspect_hands_out_a_clone() {
        let shielded = Shielded::new(witness());
        let task = Task::new();

        let seen = shielded
            .inspect(&task, |w| Ok(w.clone()))
            .await
            .unwrap();
        assert_eq!(seen, witness());
    }

    #[tokio::test]
    async fn test_alter_commits_on_success() {
        let shielded = Shielded::new(witness());
        let task = Task::new();

        shielded
            .alter(&task, |w| {
                w.members.push("c".to_string());
                Ok(())
            })
            .await
            .unwrap();

        let members = shielded
            .inspect(&task, |w| Ok(w.members.clone()))
            .await
            .unwrap();
        assert_eq!(members, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_alter_failure_leaves_witness_untouched() {
        let shielded = Shielded::new(witness());
        let task = Task::new();

        let err = shielded
            .alter(&task, |w| {
                w.members.clear();
                Err(Error::provider("boom"))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider { .. }));

        let seen = shielded.inspect(&task, |w| Ok(w.clone())).await.unwrap();
        assert_eq!(seen, witness());
    }

    #[tokio::test]
    async fn test_altered_nothing_is_a_silent_noop() {
        let shielded = Shielded::new(witness());
        let task = Task::new();

        shielded
            .alter(&task, |w| {
                w.members.clear();
                Err(Error::AlteredNothing)
            })
            .await
            .unwrap();

        let seen = shielded.inspect(&task, |w| Ok(w.clone())).await.unwrap();
        assert_eq!(seen, witness());
    }

    #[tokio::test]
    async fn test_null_task_rejected() {
        let shielded = Shielded::new(witness());
        let null = Task::null();
        assert!(matches!(
            shielded.inspect(&null, |_| Ok(())).await,
            Err(Error::InvalidParameter { .. })
        ));
        assert!(matches!(
            shielded.alter(&null, |_| Ok(())).await,
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[tokio::test]
    async fn test_serialize_round_trip() {
        let shielded = Shielded::new(witness());
        let task = Task::new();

        let buf = shielded.serialize(&task).await.unwrap();
        let restored: Shielded<Witness> = Shielded::new(Witness {
            name: String::new(),
            members: Vec::new(),
        });
        restored.deserialize(&task, &buf).await.unwrap();

        let seen = restored.inspect(&task, |w| Ok(w.clone())).await.unwrap();
        assert_eq!(seen, witness());
    }

    #[tokio::test]
    async fn test_clone_shielded_is_independent() {
        let shielded = Shielded::new(witness());
        let task = Task::new();
        let copy = shielded.clone_shielded();

        copy.alter(&task, |w| {
            w.name = "beta".to_string();
            Ok(())
        })
        .await
        .unwrap();

        let original = shielded.inspect(&task, |w| Ok(w.name.clone())).await.unwrap();
        assert_eq!(original, "alpha");
    }
}
