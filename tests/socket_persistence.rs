//! Lineage behavior end to end: create-and-advertise, adopt after a
//! simulated respawn, rebind tolerance, and serving on the shared socket.

use std::env;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

use pserve::config::{ListenerConfig, ServeConfig};
use pserve::http::{Handler, HttpServer, Request, Response, Sequential, ServeStrategy, StatusHandler};
use pserve::lifecycle::operator_message;
use pserve::net::{bind_and_activate, SocketRegistry, SERVER_FD_ENV};
use pserve::{BindErrorKind, ServeError};

// SERVER_FD is process-global; tests in this binary serialize on this.
fn env_lock() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(())).lock().unwrap()
}

fn loopback(port: u16) -> ListenerConfig {
    ListenerConfig {
        address: "127.0.0.1".to_string(),
        port,
        ipv6: false,
        backlog: 16,
    }
}

fn http_roundtrip(port: u16, request: &str) -> String {
    let mut stream = connect_with_retry(port);
    stream.write_all(request.as_bytes()).unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();
    response
}

/// Connect to loopback `port`, retrying briefly while a background server
/// thread comes up.
fn connect_with_retry(port: u16) -> TcpStream {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        match TcpStream::connect(("127.0.0.1", port)) {
            Ok(stream) => {
                stream
                    .set_read_timeout(Some(Duration::from_secs(5)))
                    .unwrap();
                return stream;
            }
            Err(_) if Instant::now() < deadline => {
                thread::sleep(Duration::from_millis(20));
            }
            Err(err) => panic!("server never came up on port {}: {}", port, err),
        }
    }
}

#[test]
fn lineage_shares_one_descriptor_across_respawn() {
    let _guard = env_lock();
    env::remove_var(SERVER_FD_ENV);

    // First process of the lineage: create, advertise, bind, listen.
    let mut first = SocketRegistry::new();
    let created = first.acquire(false).unwrap();
    assert!(!created.inherited());
    let advertised: i32 = env::var(SERVER_FD_ENV).unwrap().parse().unwrap();
    assert_eq!(advertised, created.raw_fd());

    let bound = bind_and_activate(created.socket(), &loopback(0)).unwrap();
    let port = bound.server_port();

    // Respawned process: same environment, fresh registry, same fd.
    let mut second = SocketRegistry::new();
    let adopted = second.acquire(false).unwrap();
    assert!(adopted.inherited());
    assert_eq!(adopted.raw_fd(), advertised);

    // The adopted socket is already bound; the sequencer must tolerate
    // the failed re-bind and report the same state as a fresh bind.
    let rebound = bind_and_activate(adopted.socket(), &loopback(port)).unwrap();
    assert_eq!(rebound.server_port(), port);
    assert_eq!(rebound.server_name(), "127.0.0.1");

    // Zero listen gap: serve on the adopted socket and answer a request.
    let handler: Arc<dyn Handler> = Arc::new(|_req: &Request| Response::text(200, "still here"));
    thread::spawn(move || {
        let _ = Sequential.serve(&rebound, handler);
    });

    let response = http_roundtrip(port, "GET / HTTP/1.1\r\nHost: test\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.ends_with("still here"));

    // Both registries reference the same descriptor; leak the first so
    // only one close happens at teardown.
    std::mem::forget(first);
    env::remove_var(SERVER_FD_ENV);
}

#[test]
fn fresh_start_serves_and_advertises() {
    let _guard = env_lock();
    env::remove_var(SERVER_FD_ENV);

    let mut config = ServeConfig::default();
    config.listener = loopback(28311);

    let server = HttpServer::new(config, Arc::new(StatusHandler::new()));
    thread::spawn(move || {
        let mut registry = SocketRegistry::new();
        let _ = server.run(&mut registry);
    });

    let response = http_roundtrip(28311, "GET / HTTP/1.1\r\nHost: test\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.contains("\"pid\":"));

    // The run advertised the descriptor for the next process.
    let advertised = env::var(SERVER_FD_ENV).unwrap();
    assert!(advertised.parse::<i32>().is_ok());

    env::remove_var(SERVER_FD_ENV);
}

#[test]
fn occupied_port_fails_with_mapped_message() {
    let _guard = env_lock();
    env::remove_var(SERVER_FD_ENV);

    // Unrelated process already owns the port.
    let unrelated = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = unrelated.local_addr().unwrap().port();

    let mut config = ServeConfig::default();
    config.listener = loopback(port);

    let server = HttpServer::new(config, Arc::new(StatusHandler::new()));
    let mut registry = SocketRegistry::new();
    let err = server.run(&mut registry).unwrap_err();

    assert!(matches!(err, ServeError::Bind { .. }));
    assert_eq!(err.bind_kind(), BindErrorKind::AddrInUse);
    assert_eq!(operator_message(&err), "That port is already in use.");

    env::remove_var(SERVER_FD_ENV);
}
