//! Persistent-socket registry.
//!
//! # Responsibilities
//! - Decide, once per process, whether a listening socket already exists
//!   for this lineage (advertised via `SERVER_FD`) or must be created
//! - Create the socket with close-on-exec cleared so the descriptor
//!   survives an exec-style respawn
//! - Advertise the descriptor number for the next process in the lineage
//!
//! # Design Decisions
//! - The registry is an explicit single-owner object constructed in main
//!   and passed by reference, not ambient global state
//! - Acquisition is idempotent within one process: the second call
//!   returns the same handle and never creates a second socket

use std::env;
use std::os::unix::io::{AsRawFd, FromRawFd, RawFd};

use socket2::{Domain, Socket, Type};

use crate::error::ServeError;

/// Environment variable carrying the advertised descriptor number.
pub const SERVER_FD_ENV: &str = "SERVER_FD";

/// A stream socket shared by every process in a respawn lineage.
///
/// The first process creates the kernel resource; each respawned process
/// rebuilds a handle onto the same resource from the advertised fd. The
/// handle lives as long as the process; there is no explicit close.
#[derive(Debug)]
pub struct PersistentSocket {
    socket: Socket,
    inherited: bool,
}

impl PersistentSocket {
    /// Descriptor number identifying the kernel resource.
    pub fn raw_fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }

    /// Whether this handle was adopted from an advertisement rather than
    /// freshly created.
    pub fn inherited(&self) -> bool {
        self.inherited
    }

    /// The underlying socket.
    pub fn socket(&self) -> &Socket {
        &self.socket
    }
}

/// Process-wide owner of the persistent listening socket.
pub struct SocketRegistry {
    socket: Option<PersistentSocket>,
}

impl SocketRegistry {
    /// Create an empty registry. Nothing touches the environment until
    /// [`acquire`](Self::acquire) is called.
    pub fn new() -> Self {
        Self { socket: None }
    }

    /// Get the lineage's listening socket, creating and advertising it if
    /// no advertisement exists yet.
    ///
    /// `use_ipv6` selects the family for a freshly created socket. An
    /// adopted socket is assumed to have been created with the same flag;
    /// consistency across respawns is the caller's responsibility and is
    /// not validated here.
    pub fn acquire(&mut self, use_ipv6: bool) -> Result<&PersistentSocket, ServeError> {
        let socket = match self.socket.take() {
            Some(existing) => existing,
            None => Self::open(use_ipv6)?,
        };
        Ok(self.socket.insert(socket))
    }

    fn open(use_ipv6: bool) -> Result<PersistentSocket, ServeError> {
        let domain = if use_ipv6 { Domain::IPV6 } else { Domain::IPV4 };

        match env::var(SERVER_FD_ENV) {
            Ok(value) if !value.is_empty() => {
                let fd: RawFd = value.trim().parse().map_err(|source| {
                    ServeError::Advertisement {
                        value: value.clone(),
                        source,
                    }
                })?;
                // SAFETY: the advertised descriptor was opened by an
                // earlier process of this lineage and arrives here open
                // and unowned; this is the only handle built from it.
                let socket = unsafe { Socket::from_raw_fd(fd) };
                tracing::debug!(fd, family = ?domain, "adopted advertised listening socket");
                Ok(PersistentSocket {
                    socket,
                    inherited: true,
                })
            }
            _ => {
                let socket = Socket::new(domain, Type::STREAM, None).map_err(ServeError::Create)?;
                // The descriptor must survive exec into the next process.
                socket.set_cloexec(false).map_err(ServeError::Create)?;
                let fd = socket.as_raw_fd();
                env::set_var(SERVER_FD_ENV, fd.to_string());
                tracing::debug!(fd, family = ?domain, "created listening socket, advertised fd");
                Ok(PersistentSocket {
                    socket,
                    inherited: false,
                })
            }
        }
    }
}

impl Default for SocketRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Mutex, MutexGuard, OnceLock};

    /// SERVER_FD is process-global state; every test that touches it must
    /// hold this lock.
    pub(crate) fn env_lock() -> MutexGuard<'static, ()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(())).lock().unwrap()
    }
}
