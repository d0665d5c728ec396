//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! Every field has a default so a minimal (or absent) config file works.

use serde::{Deserialize, Serialize};

/// Root configuration for the development server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServeConfig {
    /// Listener configuration (address, port, family, backlog).
    pub listener: ListenerConfig,

    /// Request-servicing configuration.
    pub serving: ServingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Address to serve on (IP literal or hostname).
    pub address: String,

    /// Port to serve on. Port 0 asks the OS for an ephemeral port.
    pub port: u16,

    /// Listen on an IPv6 socket instead of IPv4.
    pub ipv6: bool,

    /// Backlog passed to listen(2).
    pub backlog: i32,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 8000,
            ipv6: false,
            backlog: 128,
        }
    }
}

/// Request-servicing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServingConfig {
    /// Service each accepted connection on its own thread. When false the
    /// server accepts and services connections strictly one at a time.
    pub threaded: bool,

    /// Message printed when the server is stopped with an interrupt.
    pub shutdown_message: Option<String>,
}

impl Default for ServingConfig {
    fn default() -> Self {
        Self {
            threaded: true,
            shutdown_message: None,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl ServeConfig {
    /// Scheme for the startup banner. The dev server only speaks plain HTTP.
    pub fn protocol(&self) -> &'static str {
        "http"
    }

    /// Address as shown to the operator, IPv6 literals bracketed.
    pub fn display_address(&self) -> String {
        let addr = &self.listener.address;
        if addr.contains(':') && !addr.starts_with('[') {
            format!("[{}]", addr)
        } else {
            addr.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_loopback_8000() {
        let config = ServeConfig::default();
        assert_eq!(config.listener.address, "127.0.0.1");
        assert_eq!(config.listener.port, 8000);
        assert!(!config.listener.ipv6);
        assert!(config.serving.threaded);
        assert!(config.serving.shutdown_message.is_none());
    }

    #[test]
    fn display_address_brackets_ipv6() {
        let mut config = ServeConfig::default();
        config.listener.address = "::1".to_string();
        assert_eq!(config.display_address(), "[::1]");

        config.listener.address = "0.0.0.0".to_string();
        assert_eq!(config.display_address(), "0.0.0.0");
    }

    #[test]
    fn minimal_toml_round_trips() {
        let config: ServeConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.port, 8000);

        let config: ServeConfig = toml::from_str(
            r#"
            [listener]
            address = "::"
            port = 9000
            ipv6 = true

            [serving]
            threaded = false
            shutdown_message = "bye"
            "#,
        )
        .unwrap();
        assert_eq!(config.listener.address, "::");
        assert_eq!(config.listener.port, 9000);
        assert!(config.listener.ipv6);
        assert!(!config.serving.threaded);
        assert_eq!(config.serving.shutdown_message.as_deref(), Some("bye"));
    }
}
