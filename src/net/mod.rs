//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Process start
//!     → registry.rs (adopt advertised fd, or create + advertise)
//!     → listener.rs (bind-or-tolerate, listen, accepting view)
//!     → Hand off to HTTP layer
//!
//! Per connection:
//!     accept → connection.rs (ID, in-flight count) → HTTP layer
//! ```
//!
//! # Design Decisions
//! - One listening socket per process lineage, identified by descriptor
//!   number in the `SERVER_FD` environment variable
//! - The accept loop runs on a duplicate; the advertised descriptor is
//!   never consumed, so it stays valid for the next process

pub mod connection;
pub mod listener;
pub mod registry;

pub use listener::{bind_and_activate, BoundListener};
pub use registry::{PersistentSocket, SocketRegistry, SERVER_FD_ENV};
