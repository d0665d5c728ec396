//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     System checks → banner → bootstrap serves
//!
//! Interrupt (signals.rs):
//!     SIGINT/SIGTERM → optional shutdown message → exit 0
//!
//! Fatal socket error (shutdown.rs):
//!     classify errno → operator message on stderr → _exit(1)
//! ```
//!
//! # Design Decisions
//! - Interrupt exit and error abort are separate terminal paths with
//!   distinct exit codes (0 vs 1)
//! - Neither path waits for in-flight request threads; the persistent
//!   listening socket survives both as a kernel resource

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{abort_with_socket_error, operator_message};
pub use signals::install_interrupt_handler;
