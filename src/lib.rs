//! pserve — a development HTTP server that keeps its listening socket
//! across process restarts.
//!
//! An auto-reload supervisor can replace the serving process after a code
//! change without clients ever seeing a connection refusal: the first
//! process of a lineage creates the listening socket and advertises its
//! descriptor number in `SERVER_FD`; every respawned process adopts the
//! same kernel socket from that advertisement instead of binding a new
//! one.
//!
//! # Architecture Overview
//!
//! ```text
//!   process start
//!       │
//!       ▼
//!   ┌──────────────┐   SERVER_FD absent: create + advertise
//!   │ net/registry │   SERVER_FD present: adopt descriptor
//!   └──────┬───────┘
//!          ▼
//!   ┌──────────────┐   fresh socket: bind(2)
//!   │ net/listener │   inherited socket: tolerate EINVAL, synthesize
//!   └──────┬───────┘   then listen(2)
//!          ▼
//!   ┌──────────────┐   sequential or thread-per-connection
//!   │ http/strategy│──▶ http/request → http/handler → http/response
//!   └──────┬───────┘
//!          ▼
//!   lifecycle: SIGINT → exit 0 │ fatal socket error → message + _exit(1)
//! ```
//!
//! The serving loop is deliberately synchronous: one blocking accept
//! loop, optionally one thread per connection. Request threads are
//! abandonable on shutdown; the listening socket is not, since the next
//! process in the lineage needs it.

// Core subsystems
pub mod config;
pub mod http;
pub mod net;

// Cross-cutting concerns
pub mod error;
pub mod lifecycle;
pub mod observability;

pub use config::ServeConfig;
pub use error::{BindErrorKind, ServeError};
pub use http::{Handler, HttpServer, Request, Response, StatusHandler};
pub use net::{SocketRegistry, SERVER_FD_ENV};
