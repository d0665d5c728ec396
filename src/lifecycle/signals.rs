//! Interrupt handling.
//!
//! # Responsibilities
//! - Watch for SIGINT/SIGTERM on a dedicated thread
//! - Emit the configured shutdown message on the way out
//! - Exit with status 0: an interrupt is a normal shutdown, not an error
//!
//! Request threads are abandonable, so the exit is immediate. The
//! listening socket is left open on purpose; the next process in the
//! lineage adopts it via the advertised descriptor.

use std::io;
use std::process;
use std::thread;

use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;

/// Install the interrupt watcher. Returns once the watcher thread is
/// running; the thread lives for the rest of the process.
pub fn install_interrupt_handler(shutdown_message: Option<String>) -> io::Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    thread::Builder::new()
        .name("interrupt-watcher".to_string())
        .spawn(move || {
            if let Some(signal) = signals.forever().next() {
                tracing::info!(signal, "interrupt received, shutting down");
                if let Some(message) = shutdown_message {
                    println!("{}", message);
                }
                process::exit(0);
            }
        })?;
    Ok(())
}
