//! Error taxonomy for socket acquisition, bind/activate, and serving.
//!
//! # Design Decisions
//! - Bind-time failures are classified by decoding the OS error code into
//!   a typed enum, not by inspecting formatted message text
//! - The tolerated re-bind of an inherited socket surfaces as
//!   `BindErrorKind::InvalidArgument` and is handled inside the sequencer;
//!   every other kind is fatal

use std::io;
use std::num::ParseIntError;
use thiserror::Error;

/// Errors that can occur while bringing up or running the server.
#[derive(Debug, Error)]
pub enum ServeError {
    /// The `SERVER_FD` advertisement exists but does not hold an fd number.
    #[error("invalid SERVER_FD value {value:?}: {source}")]
    Advertisement {
        value: String,
        source: ParseIntError,
    },

    /// Creating a fresh listening socket failed.
    #[error("failed to create listening socket: {0}")]
    Create(#[source] io::Error),

    /// The configured listen address did not resolve to a socket address.
    #[error("failed to resolve {address} port {port}: {source}")]
    Resolve {
        address: String,
        port: u16,
        source: io::Error,
    },

    /// The bind step failed with something other than the tolerated
    /// re-bind of an already-bound inherited socket.
    #[error("failed to bind {address} port {port}: {source}")]
    Bind {
        address: String,
        port: u16,
        source: io::Error,
    },

    /// Duplicating the persistent socket for the accept loop failed.
    #[error("failed to duplicate listening socket: {0}")]
    Dup(#[source] io::Error),

    /// The listen step failed on a bound socket.
    #[error("failed to listen on bound socket: {0}")]
    Listen(#[source] io::Error),

    /// The accept loop hit a non-transient error.
    #[error("failed to accept connection: {0}")]
    Accept(#[source] io::Error),
}

impl ServeError {
    /// The underlying socket error, when this variant carries one.
    pub fn io_source(&self) -> Option<&io::Error> {
        match self {
            ServeError::Advertisement { .. } => None,
            ServeError::Create(e)
            | ServeError::Dup(e)
            | ServeError::Listen(e)
            | ServeError::Accept(e) => Some(e),
            ServeError::Resolve { source, .. } | ServeError::Bind { source, .. } => Some(source),
        }
    }

    /// Classification of the underlying OS error, `Other` when there is
    /// no OS error to decode.
    pub fn bind_kind(&self) -> BindErrorKind {
        self.io_source()
            .map(BindErrorKind::classify)
            .unwrap_or(BindErrorKind::Other)
    }
}

/// Bind-time failure category, decoded from the platform error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindErrorKind {
    /// EACCES: privileged port without the privilege.
    PermissionDenied,
    /// EADDRINUSE: another socket is bound to the address.
    AddrInUse,
    /// EADDRNOTAVAIL: the address does not belong to this host.
    AddrNotAvailable,
    /// EINVAL: bind(2) on a socket that is already bound. Expected for a
    /// socket inherited in bound state from the previous process.
    InvalidArgument,
    /// Anything else.
    Other,
}

impl BindErrorKind {
    /// Decode an I/O error into a bind failure category.
    pub fn classify(err: &io::Error) -> Self {
        match err.raw_os_error() {
            Some(libc::EACCES) => BindErrorKind::PermissionDenied,
            Some(libc::EADDRINUSE) => BindErrorKind::AddrInUse,
            Some(libc::EADDRNOTAVAIL) => BindErrorKind::AddrNotAvailable,
            Some(libc::EINVAL) => BindErrorKind::InvalidArgument,
            _ => BindErrorKind::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn os_err(code: i32) -> io::Error {
        io::Error::from_raw_os_error(code)
    }

    #[test]
    fn classify_known_codes() {
        assert_eq!(
            BindErrorKind::classify(&os_err(libc::EACCES)),
            BindErrorKind::PermissionDenied
        );
        assert_eq!(
            BindErrorKind::classify(&os_err(libc::EADDRINUSE)),
            BindErrorKind::AddrInUse
        );
        assert_eq!(
            BindErrorKind::classify(&os_err(libc::EADDRNOTAVAIL)),
            BindErrorKind::AddrNotAvailable
        );
        assert_eq!(
            BindErrorKind::classify(&os_err(libc::EINVAL)),
            BindErrorKind::InvalidArgument
        );
    }

    #[test]
    fn classify_unknown_code_is_other() {
        assert_eq!(
            BindErrorKind::classify(&os_err(libc::ENOENT)),
            BindErrorKind::Other
        );
        let synthetic = io::Error::new(io::ErrorKind::Other, "no raw code");
        assert_eq!(BindErrorKind::classify(&synthetic), BindErrorKind::Other);
    }

    #[test]
    fn serve_error_exposes_bind_kind() {
        let err = ServeError::Bind {
            address: "127.0.0.1".into(),
            port: 8000,
            source: os_err(libc::EADDRINUSE),
        };
        assert_eq!(err.bind_kind(), BindErrorKind::AddrInUse);

        let err = ServeError::Advertisement {
            value: "not-a-number".into(),
            source: "x".parse::<i32>().unwrap_err(),
        };
        assert_eq!(err.bind_kind(), BindErrorKind::Other);
    }
}
