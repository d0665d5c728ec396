//! Bind/activate sequencing on the persistent socket.
//!
//! # Responsibilities
//! - Resolve the configured address for the socket's family
//! - Perform the platform bind, tolerating the re-bind of a socket
//!   inherited in already-bound state
//! - Activate the socket (listen) and hand out an accepting view
//!
//! # Design Decisions
//! - A socket adopted from the previous process is already bound; its
//!   bind(2) fails with EINVAL and the post-bind state is synthesized
//!   instead, through the same code path that a fresh bind takes
//! - Any other bind failure is fatal and propagates unchanged

use std::io;
use std::net::{IpAddr, SocketAddr, TcpListener, ToSocketAddrs};

use socket2::{SockAddr, Socket};

use crate::config::ListenerConfig;
use crate::error::{BindErrorKind, ServeError};

/// A socket that has completed bind and activate and is ready to accept.
#[derive(Debug)]
pub struct BoundListener {
    listener: TcpListener,
    server_name: String,
    server_port: u16,
    local_addr: Option<SocketAddr>,
}

impl BoundListener {
    /// Accepting view of the persistent socket.
    pub fn listener(&self) -> &TcpListener {
        &self.listener
    }

    /// Name recorded for the serving environment, derived from the
    /// configured address.
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// Port the server considers itself bound to.
    pub fn server_port(&self) -> u16 {
        self.server_port
    }

    /// Actual local address reported by the kernel, when available.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}

/// Bind the socket to the configured address and start listening.
///
/// The socket is the lineage's persistent socket; the returned listener is
/// a duplicate sharing the same kernel resource, so the advertised
/// descriptor itself stays untouched for the next process.
pub fn bind_and_activate(
    socket: &Socket,
    config: &ListenerConfig,
) -> Result<BoundListener, ServeError> {
    let target = resolve_target(&config.address, config.port, config.ipv6)?;

    socket
        .set_reuse_address(true)
        .map_err(|source| bind_error(config, source))?;

    match socket.bind(&SockAddr::from(target)) {
        Ok(()) => {
            tracing::debug!(address = %target, "bound listening socket");
        }
        Err(err) if BindErrorKind::classify(&err) == BindErrorKind::InvalidArgument => {
            // Inherited socket arrived already bound; keep going and
            // synthesize the post-bind state below.
            tracing::debug!(
                address = %target,
                "socket already bound, skipping bind step"
            );
        }
        Err(source) => return Err(bind_error(config, source)),
    }

    socket.listen(config.backlog).map_err(ServeError::Listen)?;

    // Identical on the fresh-bind and already-bound paths.
    let local_addr = socket.local_addr().ok().and_then(|a| a.as_socket());
    let server_name = server_name(&config.address);
    let server_port = match local_addr {
        Some(addr) if config.port == 0 => addr.port(),
        _ => config.port,
    };

    let accept_socket = socket.try_clone().map_err(ServeError::Dup)?;

    Ok(BoundListener {
        listener: accept_socket.into(),
        server_name,
        server_port,
        local_addr,
    })
}

fn bind_error(config: &ListenerConfig, source: io::Error) -> ServeError {
    ServeError::Bind {
        address: config.address.clone(),
        port: config.port,
        source,
    }
}

/// Resolve the configured address to a socket address of the listening
/// socket's family.
fn resolve_target(address: &str, port: u16, ipv6: bool) -> Result<SocketAddr, ServeError> {
    let resolve_err = |source| ServeError::Resolve {
        address: address.to_string(),
        port,
        source,
    };

    let candidates = (address, port).to_socket_addrs().map_err(resolve_err)?;
    candidates
        .into_iter()
        .find(|addr| addr.is_ipv6() == ipv6)
        .ok_or_else(|| {
            resolve_err(io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!(
                    "no {} address for {}",
                    if ipv6 { "IPv6" } else { "IPv4" },
                    address
                ),
            ))
        })
}

/// Normalized server name: IP literals in canonical text form, hostnames
/// as given.
fn server_name(address: &str) -> String {
    match address.parse::<IpAddr>() {
        Ok(ip) => ip.to_string(),
        Err(_) => address.to_string(),
    }
}
