//! HTTP serving subsystem.
//!
//! # Data Flow
//! ```text
//! Persistent socket (net layer)
//!     → server.rs (bootstrap: strategy pick, bind/activate, serve)
//!     → strategy.rs (accept loop: sequential or thread-per-connection)
//!     → request.rs (parse one request)
//!     → handler.rs (application callback)
//!     → response.rs (serialize, Connection: close)
//! ```

pub mod handler;
pub mod request;
pub mod response;
pub mod server;
pub mod strategy;

pub use handler::{Handler, StatusHandler};
pub use request::Request;
pub use response::Response;
pub use server::HttpServer;
pub use strategy::{Sequential, ServeStrategy, ThreadPerConnection};
