//! Configuration validation.
//!
//! Semantic checks on top of what serde already guarantees syntactically.
//! Returns all validation errors, not just the first.

use crate::config::schema::ServeConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The listen address is empty.
    EmptyAddress,
    /// The address is an IPv4 literal but the IPv6 flag is set, or the
    /// other way around.
    FamilyMismatch { address: String, ipv6: bool },
    /// The backlog must be positive.
    NonPositiveBacklog(i32),
    /// The log level is not one tracing understands.
    UnknownLogLevel(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmptyAddress => write!(f, "listener address is empty"),
            ValidationError::FamilyMismatch { address, ipv6 } => write!(
                f,
                "address {:?} does not match ipv6 = {}",
                address, ipv6
            ),
            ValidationError::NonPositiveBacklog(n) => {
                write!(f, "listen backlog must be positive, got {}", n)
            }
            ValidationError::UnknownLogLevel(level) => {
                write!(f, "unknown log level {:?}", level)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ServeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.address.is_empty() {
        errors.push(ValidationError::EmptyAddress);
    }

    // Hostnames can resolve to either family, so only IP literals are
    // checked against the ipv6 flag.
    if let Ok(ip) = config.listener.address.parse::<std::net::IpAddr>() {
        if ip.is_ipv4() == config.listener.ipv6 {
            errors.push(ValidationError::FamilyMismatch {
                address: config.listener.address.clone(),
                ipv6: config.listener.ipv6,
            });
        }
    }

    if config.listener.backlog <= 0 {
        errors.push(ValidationError::NonPositiveBacklog(config.listener.backlog));
    }

    match config.observability.log_level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        other => errors.push(ValidationError::UnknownLogLevel(other.to_string())),
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
