//! Default configuration values shared across the daemon
//!
//! These constants keep tenant configuration defaults consistent between
//! the providers and the documentation.

/// Default gRPC bind address for the daemon
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:50051";

/// Default availability zone applied when a tenant omits one
pub const DEFAULT_AVAILABILITY_ZONE: &str = "nova";

/// Default DNS resolvers applied when a tenant omits them
pub const DEFAULT_DNS_SERVERS: &[&str] = &["8.8.8.8", "1.1.1.1"];

/// Default operating-system user created on every host
pub const DEFAULT_OPERATOR_USERNAME: &str = "safescale";

/// Length of generated cluster administrator passwords
pub const ADMIN_PASSWORD_LENGTH: usize = 16;

// Serde default functions for struct field defaults

/// Returns the default availability zone
pub fn default_availability_zone() -> String {
    DEFAULT_AVAILABILITY_ZONE.to_string()
}

/// Returns the default DNS resolvers
pub fn default_dns_servers() -> Vec<String> {
    DEFAULT_DNS_SERVERS.iter().map(|s| s.to_string()).collect()
}

/// Returns the default operator username
pub fn default_operator_username() -> String {
    DEFAULT_OPERATOR_USERNAME.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        assert_eq!(DEFAULT_AVAILABILITY_ZONE, "nova");
        assert_eq!(DEFAULT_DNS_SERVERS, &["8.8.8.8", "1.1.1.1"]);
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_availability_zone(), "nova");
        assert_eq!(default_dns_servers(), vec!["8.8.8.8", "1.1.1.1"]);
        assert_eq!(default_operator_username(), "safescale");
    }
}
