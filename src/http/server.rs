//! Server bootstrap.
//!
//! # Responsibilities
//! - Acquire the lineage's persistent socket from the registry
//! - Pick the serving strategy (sequential vs. thread-per-connection)
//! - Run the bind/activate sequence on the persistent socket
//! - Register the handler and enter the serving loop
//!
//! The server never opens a listening socket of its own; it always serves
//! on the registry's socket so the descriptor stays stable across
//! respawns.

use std::sync::Arc;

use crate::config::ServeConfig;
use crate::error::ServeError;
use crate::http::handler::Handler;
use crate::http::strategy::{Sequential, ServeStrategy, ThreadPerConnection};
use crate::net::listener::bind_and_activate;
use crate::net::registry::SocketRegistry;

/// The development HTTP server.
pub struct HttpServer {
    config: ServeConfig,
    handler: Arc<dyn Handler>,
}

impl HttpServer {
    /// Create a server for the given configuration and application handler.
    pub fn new(config: ServeConfig, handler: Arc<dyn Handler>) -> Self {
        Self { config, handler }
    }

    /// Bring the server up on the registry's persistent socket and serve.
    ///
    /// Does not return under normal operation; an `Err` is a fatal socket
    /// error (acquire, bind, listen, or a non-transient accept failure).
    pub fn run(&self, registry: &mut SocketRegistry) -> Result<(), ServeError> {
        let socket = registry.acquire(self.config.listener.ipv6)?;
        let inherited = socket.inherited();

        let strategy: Box<dyn ServeStrategy> = if self.config.serving.threaded {
            Box::new(ThreadPerConnection::new())
        } else {
            Box::new(Sequential)
        };

        let bound = bind_and_activate(socket.socket(), &self.config.listener)?;

        tracing::info!(
            server_name = %bound.server_name(),
            port = bound.server_port(),
            fd = socket.raw_fd(),
            inherited,
            threaded = self.config.serving.threaded,
            "serving"
        );

        strategy.serve(&bound, Arc::clone(&self.handler))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BindErrorKind;
    use crate::http::request::Request;
    use crate::http::response::Response;
    use socket2::{Domain, Socket, Type};

    // Registry-driven startup is covered in tests/socket_persistence.rs;
    // here only the failure route that bypasses the environment.
    #[test]
    fn conflicting_port_surfaces_addr_in_use() {
        let holder = Socket::new(Domain::IPV4, Type::STREAM, None).unwrap();
        let config = crate::config::ListenerConfig {
            address: "127.0.0.1".to_string(),
            port: 0,
            ipv6: false,
            backlog: 16,
        };
        let held = bind_and_activate(&holder, &config).unwrap();

        let mut config = ServeConfig::default();
        config.listener.port = held.server_port();

        let handler: Arc<dyn Handler> = Arc::new(|_req: &Request| Response::new(200));
        let server = HttpServer::new(config, handler);

        // Bypass the registry so no advertisement is involved.
        let fresh = Socket::new(Domain::IPV4, Type::STREAM, None).unwrap();
        let err = bind_and_activate(&fresh, &server.config.listener).unwrap_err();
        assert_eq!(err.bind_kind(), BindErrorKind::AddrInUse);
    }
}
