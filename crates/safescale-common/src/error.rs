//! Error taxonomy shared across the daemon
//!
//! Every subsystem reports failures through [`Error`]; the gRPC listener
//! layer converts these kinds to status codes at the boundary.

use thiserror::Error;

/// Convenience alias used throughout the workspace.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure kinds recognized across the daemon.
#[derive(Debug, Error)]
pub enum Error {
    /// The receiver is a null or zero instance
    #[error("invalid instance: {0}")]
    InvalidInstance(&'static str),

    /// An argument violates its documented preconditions
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Lookup miss in a registry or provider listing
    #[error("{0}")]
    NotFound(String),

    /// Creation of an entity whose name is already taken
    #[error("{0}")]
    Duplicate(String),

    /// Operation cancelled through task cancellation
    #[error("aborted: {0}")]
    Aborted(String),

    /// Deadline exceeded
    #[error("timeout: {0}")]
    Timeout(String),

    /// State machine violation
    #[error("inconsistent state: {0}")]
    InconsistentState(String),

    /// A lock operation was issued by a task that does not hold the lock
    #[error("task '{task}' does not own the lock")]
    NotOwner { task: String },

    /// Serialization or deserialization failure
    #[error("syntax error: {0}")]
    Syntax(String),

    /// Feature stub
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    /// Sentinel returned by an alter closure to signal a no-op commit.
    /// Never surfaced to callers of `Shielded::alter`.
    #[error("nothing was altered")]
    AlteredNothing,

    /// Opaque wrap of an underlying IaaS error
    #[error("provider error: {message}")]
    Provider { message: String, transient: bool },
}

impl Error {
    /// Build an `InvalidParameter` error from a parameter name and reason.
    pub fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// Build a `NotFound` error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Build a `Duplicate` error.
    pub fn duplicate(what: impl Into<String>) -> Self {
        Self::Duplicate(what.into())
    }

    /// Build a non-transient provider error.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
            transient: false,
        }
    }

    /// Build a transient provider error (connection reset, 5xx, ...).
    pub fn provider_transient(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
            transient: true,
        }
    }

    /// Check if retrying the failed operation may succeed.
    ///
    /// Only transient provider errors qualify; everything else is final.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Provider { transient: true, .. })
    }

    /// Check if this is the `AlteredNothing` sentinel.
    pub fn is_altered_nothing(&self) -> bool {
        matches!(self, Error::AlteredNothing)
    }

    /// Prefix the error with a one-line description, preserving the kind.
    ///
    /// Used by handlers at the service boundary ("cannot list tenants: ...").
    pub fn with_context(self, context: &str) -> Self {
        match self {
            Error::NotFound(m) => Error::NotFound(format!("{context}: {m}")),
            Error::Duplicate(m) => Error::Duplicate(format!("{context}: {m}")),
            Error::Aborted(m) => Error::Aborted(format!("{context}: {m}")),
            Error::Timeout(m) => Error::Timeout(format!("{context}: {m}")),
            Error::InconsistentState(m) => Error::InconsistentState(format!("{context}: {m}")),
            Error::Syntax(m) => Error::Syntax(format!("{context}: {m}")),
            Error::Provider { message, transient } => Error::Provider {
                message: format!("{context}: {message}"),
                transient,
            },
            other => other,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Syntax(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(Error::provider_transient("connection reset").is_transient());
        assert!(!Error::provider("quota exceeded").is_transient());
        assert!(!Error::not_found("host").is_transient());
    }

    #[test]
    fn test_context_preserves_kind() {
        let err = Error::not_found("no job identified by 'x'").with_context("cannot stop job");
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(err.to_string(), "cannot stop job: no job identified by 'x'");
    }

    #[test]
    fn test_altered_nothing_sentinel() {
        assert!(Error::AlteredNothing.is_altered_nothing());
        assert!(!Error::not_found("x").is_altered_nothing());
    }
}
