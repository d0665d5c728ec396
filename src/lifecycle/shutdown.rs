//! Terminal outcomes for fatal socket errors.
//!
//! # Design Decisions
//! - Operator messages come from the typed bind-error classification, not
//!   from matching on formatted error text
//! - The abort path is distinct from graceful shutdown: it terminates
//!   without unwinding or cleanup, because the error may be observed on a
//!   worker thread where a normal exit would not take the process down.
//!   The listening socket survives regardless: it is a kernel resource
//!   that outlives the process image, not something released in order.

use std::io::{self, Write};

use crate::error::{BindErrorKind, ServeError};

/// Map a fatal socket error to the message shown to the operator.
/// Unrecognized categories fall back to the error's own text.
pub fn operator_message(err: &ServeError) -> String {
    match err.bind_kind() {
        BindErrorKind::PermissionDenied => {
            "You don't have permission to access that port.".to_string()
        }
        BindErrorKind::AddrInUse => "That port is already in use.".to_string(),
        BindErrorKind::AddrNotAvailable => "That IP address can't be assigned to.".to_string(),
        BindErrorKind::InvalidArgument | BindErrorKind::Other => err.to_string(),
    }
}

/// Print the mapped message to stderr and terminate immediately with a
/// failure status, skipping unwind and cleanup.
pub fn abort_with_socket_error(err: &ServeError) -> ! {
    let mut stderr = io::stderr();
    let _ = writeln!(stderr, "Error: {}", operator_message(err));
    let _ = stderr.flush();
    // SAFETY: _exit terminates the process without running any further
    // user code; stderr has been flushed above.
    unsafe { libc::_exit(1) }
}
