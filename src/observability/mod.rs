//! Observability subsystem.
//!
//! # Design Decisions
//! - Structured logging via tracing; the fmt layer stamps every line, so
//!   banner and request lines carry wall-clock timestamps for free
//! - Per-request lines at info, socket-lifecycle detail at debug

pub mod logging;
