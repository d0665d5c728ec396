//! Startup orchestration: system checks and the operator banner.
//!
//! # Design Decisions
//! - Checks run before the banner; warnings never block startup
//! - The only fatal check is a malformed descriptor advertisement, which
//!   would otherwise fail later inside the registry with less context

use std::env;
use std::os::unix::io::RawFd;

use crate::config::ServeConfig;
use crate::error::ServeError;
use crate::net::registry::SERVER_FD_ENV;

/// Run pre-serve checks. Warnings are logged; the advertisement check is
/// the only failure that stops startup.
pub fn run_system_checks(config: &ServeConfig) -> Result<(), ServeError> {
    if let Ok(value) = env::var(SERVER_FD_ENV) {
        if !value.is_empty() {
            value
                .trim()
                .parse::<RawFd>()
                .map_err(|source| ServeError::Advertisement {
                    value: value.clone(),
                    source,
                })?;
        }
    }

    if config.listener.port != 0 && config.listener.port < 1024 {
        tracing::warn!(
            port = config.listener.port,
            "privileged port, binding may require elevated rights"
        );
    }

    if matches!(config.listener.address.as_str(), "0.0.0.0" | "::") {
        tracing::warn!(
            address = %config.listener.address,
            "listening on all interfaces"
        );
    }

    Ok(())
}

/// Log the startup banner: version, config source, serving URL, quit hint.
pub fn announce(config: &ServeConfig, config_source: &str) {
    let quit_command = if cfg!(windows) { "CTRL-BREAK" } else { "CONTROL-C" };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = config_source,
        "pserve starting"
    );
    tracing::info!(
        "Starting development server at {}://{}:{}/",
        config.protocol(),
        config.display_address(),
        config.listener.port
    );
    tracing::info!("Quit the server with {}.", quit_command);
}
