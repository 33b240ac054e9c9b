//! Named, environment-overridable operation timeouts
//!
//! Each getter resolves to its compiled default unless the corresponding
//! environment variable carries a parseable duration string (e.g. `2s`,
//! `5m`). Unparseable values silently fall back to the default so that a
//! bad override can never take the daemon down.

use std::time::Duration;

/// Default timeout for gRPC command invocation
pub const DEFAULT_CONTEXT_TIMEOUT: Duration = Duration::from_secs(60);
/// Default timeout for host creation
pub const DEFAULT_HOST_TIMEOUT: Duration = Duration::from_secs(5 * 60);
/// Default timeout for host cleanup
pub const DEFAULT_HOST_CLEANUP_TIMEOUT: Duration = Duration::from_secs(3 * 60);
/// Default timeout for establishing an SSH connection
pub const DEFAULT_SSH_CONNECT_TIMEOUT: Duration = Duration::from_secs(2 * 60);
/// Default timeout for long host operations (installation scripts, ...)
pub const DEFAULT_LONG_OPERATION_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Default minimum delay between retries
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_secs(1);
/// Default delay between retries
pub const DEFAULT_DELAY: Duration = Duration::from_secs(5);
/// Default delay for slow-converging resources
pub const DEFAULT_BIG_DELAY: Duration = Duration::from_secs(30);

/// Resolve a duration from the environment, falling back to `default` when
/// the variable is unset, empty, or unparseable.
fn variable_timeout(key: &str, default: Duration) -> Duration {
    match std::env::var(key) {
        Ok(raw) if !raw.is_empty() => humantime::parse_duration(&raw).unwrap_or(default),
        _ => default,
    }
}

/// Timeout applied to every gRPC command context.
pub fn context_timeout() -> Duration {
    variable_timeout("SAFESCALE_CONTEXT_TIMEOUT", DEFAULT_CONTEXT_TIMEOUT)
}

/// Timeout for host creation on the provider.
pub fn host_timeout() -> Duration {
    variable_timeout("SAFESCALE_HOST_TIMEOUT", DEFAULT_HOST_TIMEOUT)
}

/// Timeout for host deletion and teardown.
pub fn host_cleanup_timeout() -> Duration {
    variable_timeout("SAFESCALE_HOST_CLEANUP_TIMEOUT", DEFAULT_HOST_CLEANUP_TIMEOUT)
}

/// Timeout for establishing an SSH connection to a host.
pub fn ssh_connect_timeout() -> Duration {
    variable_timeout("SAFESCALE_SSH_CONNECT_TIMEOUT", DEFAULT_SSH_CONNECT_TIMEOUT)
}

/// Timeout for long host operations such as installation scripts.
pub fn long_operation_timeout() -> Duration {
    variable_timeout(
        "SAFESCALE_HOST_LONG_OPERATION_TIMEOUT",
        DEFAULT_LONG_OPERATION_TIMEOUT,
    )
}

/// Minimum delay between retries of a failed provider call.
pub fn min_delay() -> Duration {
    variable_timeout("SAFESCALE_MIN_DELAY", DEFAULT_MIN_DELAY)
}

/// Standard delay between retries of a failed provider call.
pub fn default_delay() -> Duration {
    variable_timeout("SAFESCALE_DEFAULT_DELAY", DEFAULT_DELAY)
}

/// Delay used when polling slow-converging resources.
pub fn big_delay() -> Duration {
    variable_timeout("SAFESCALE_BIG_DELAY", DEFAULT_BIG_DELAY)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test uses a distinct variable so they can run concurrently.

    #[test]
    fn test_default_when_unset() {
        std::env::remove_var("SAFESCALE_CONTEXT_TIMEOUT");
        assert_eq!(context_timeout(), DEFAULT_CONTEXT_TIMEOUT);
    }

    #[test]
    fn test_valid_override() {
        std::env::set_var("SAFESCALE_HOST_TIMEOUT", "2s");
        assert_eq!(host_timeout(), Duration::from_secs(2));
        std::env::remove_var("SAFESCALE_HOST_TIMEOUT");
    }

    #[test]
    fn test_garbage_falls_back_to_default() {
        std::env::set_var("SAFESCALE_HOST_CLEANUP_TIMEOUT", "garbage");
        assert_eq!(host_cleanup_timeout(), DEFAULT_HOST_CLEANUP_TIMEOUT);
        std::env::remove_var("SAFESCALE_HOST_CLEANUP_TIMEOUT");
    }

    #[test]
    fn test_empty_falls_back_to_default() {
        std::env::set_var("SAFESCALE_BIG_DELAY", "");
        assert_eq!(big_delay(), DEFAULT_BIG_DELAY);
        std::env::remove_var("SAFESCALE_BIG_DELAY");
    }

    #[test]
    fn test_compound_duration() {
        std::env::set_var("SAFESCALE_DEFAULT_DELAY", "1m 30s");
        assert_eq!(default_delay(), Duration::from_secs(90));
        std::env::remove_var("SAFESCALE_DEFAULT_DELAY");
    }
}
