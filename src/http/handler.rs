//! Application handler interface.
//!
//! The framework layer lives behind this trait: the server parses a
//! request, calls the handler, and writes whatever response comes back.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::http::request::Request;
use crate::http::response::Response;
use crate::net::registry::SERVER_FD_ENV;

/// A request handler. Invoked once per accepted connection; must be
/// callable from multiple threads at once in threaded mode.
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, request: &Request) -> Response;
}

impl<F> Handler for F
where
    F: Fn(&Request) -> Response + Send + Sync + 'static,
{
    fn handle(&self, request: &Request) -> Response {
        self(request)
    }
}

/// Built-in application served by the `pserve` binary.
///
/// Returns a small JSON status document. The pid changes on every reload
/// while the advertised descriptor and port stay put, which makes the
/// socket handoff visible from a browser.
#[derive(Debug, Default)]
pub struct StatusHandler {
    served: AtomicU64,
}

impl StatusHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of requests answered so far by this process.
    pub fn served(&self) -> u64 {
        self.served.load(Ordering::Relaxed)
    }
}

impl Handler for StatusHandler {
    fn handle(&self, request: &Request) -> Response {
        if request.path() != "/" {
            return Response::text(404, format!("{} not found\n", request.path()));
        }
        let served = self.served.fetch_add(1, Ordering::Relaxed) + 1;
        let status = serde_json::json!({
            "pid": std::process::id(),
            "requests_served": served,
            "server_fd": std::env::var(SERVER_FD_ENV).ok(),
        });
        Response::json(200, &status)
    }
}
