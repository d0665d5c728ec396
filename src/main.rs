//! pserve binary: CLI parsing and startup wiring.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use pserve::config::loader::{load_config, ConfigError};
use pserve::config::validation::validate_config;
use pserve::config::ServeConfig;
use pserve::http::{HttpServer, StatusHandler};
use pserve::lifecycle;
use pserve::net::SocketRegistry;
use pserve::observability;

#[derive(Parser)]
#[command(name = "pserve")]
#[command(version)]
#[command(about = "Development HTTP server that keeps its listening socket across reloads")]
struct Cli {
    /// Address and port to serve on: ADDR:PORT, [V6ADDR]:PORT, or PORT.
    #[arg(value_name = "ADDR:PORT")]
    addrport: Option<String>,

    /// Listen on an IPv6 socket.
    #[arg(long)]
    ipv6: bool,

    /// Service each connection on its own thread (the default).
    #[arg(long, overrides_with = "nothreading")]
    threading: bool,

    /// Service connections strictly one at a time.
    #[arg(long)]
    nothreading: bool,

    /// Path to a TOML config file.
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Printed when the server stops on an interrupt.
    #[arg(long, hide = true, value_name = "MESSAGE")]
    shutdown_message: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let (mut config, config_source) = match &cli.config {
        Some(path) => (load_config(path)?, path.display().to_string()),
        None => (ServeConfig::default(), "defaults".to_string()),
    };
    apply_cli_overrides(&mut config, &cli)?;
    if let Err(errors) = validate_config(&config) {
        return Err(ConfigError::Validation(errors).into());
    }

    observability::logging::init(&config.observability);
    lifecycle::install_interrupt_handler(config.serving.shutdown_message.clone())?;

    tracing::info!("Performing system checks...");
    if let Err(err) = lifecycle::startup::run_system_checks(&config) {
        lifecycle::abort_with_socket_error(&err);
    }
    lifecycle::startup::announce(&config, &config_source);

    let mut registry = SocketRegistry::new();
    let server = HttpServer::new(config, Arc::new(StatusHandler::new()));
    if let Err(err) = server.run(&mut registry) {
        lifecycle::abort_with_socket_error(&err);
    }
    Ok(())
}

/// Fold CLI flags into the configuration. CLI wins over the config file.
fn apply_cli_overrides(config: &mut ServeConfig, cli: &Cli) -> Result<(), String> {
    if let Some(value) = &cli.addrport {
        let (address, port) = parse_addrport(value)?;
        if let Some(address) = address {
            config.listener.address = address;
        }
        config.listener.port = port;
    }

    if cli.ipv6 {
        config.listener.ipv6 = true;
        if config.listener.address == "127.0.0.1" {
            config.listener.address = "::1".to_string();
        }
    }

    if cli.nothreading {
        config.serving.threaded = false;
    } else if cli.threading {
        config.serving.threaded = true;
    }

    if cli.shutdown_message.is_some() {
        config.serving.shutdown_message = cli.shutdown_message.clone();
    }

    Ok(())
}

/// Parse `PORT`, `ADDR:PORT`, or `[V6ADDR]:PORT`.
fn parse_addrport(value: &str) -> Result<(Option<String>, u16), String> {
    let bad = || format!("{:?} is not a valid address:port", value);

    if value.chars().all(|c| c.is_ascii_digit()) && !value.is_empty() {
        return value.parse().map(|port| (None, port)).map_err(|_| bad());
    }

    if let Some(rest) = value.strip_prefix('[') {
        let (address, rest) = rest.split_once(']').ok_or_else(bad)?;
        let port = rest.strip_prefix(':').ok_or_else(bad)?;
        let port = port.parse().map_err(|_| bad())?;
        return Ok((Some(address.to_string()), port));
    }

    match value.rsplit_once(':') {
        Some((address, port)) if !address.is_empty() => {
            let port = port.parse().map_err(|_| bad())?;
            Ok((Some(address.to_string()), port))
        }
        _ => Err(bad()),
    }
}
