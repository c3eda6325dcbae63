// Integration tests driving a real server loop and client connection
// against a slot file in a scratch directory, one OS thread per role.

use fipc::cancel::CancelToken;
use fipc::client::{ClientConfig, Connection, ServerReply};
use fipc::error::IpcError;
use fipc::router::{format_envelope, RouterConfig, RouterHandler};
use fipc::server::{CleanupPolicy, PingHandler, Server, ServerConfig};
use fipc::slot::{SlotFile, Status};
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use std::time::Duration;

fn server_config(cleanup: CleanupPolicy) -> ServerConfig {
    ServerConfig {
        poll_interval: Duration::from_millis(2),
        post_reply_pause: Duration::from_millis(1),
        cleanup,
    }
}

fn client_config() -> ClientConfig {
    ClientConfig {
        free_poll_interval: Duration::from_millis(2),
        max_free_attempts: 25,
        ready_poll_interval: Duration::from_millis(2),
        ready_timeout: Duration::from_secs(2),
        probe_poll_interval: Duration::from_millis(2),
        probe_timeout: Duration::from_millis(200),
    }
}

fn spawn_ping_server(
    dir: &Path,
) -> (PathBuf, CancelToken, JoinHandle<Server<PingHandler>>) {
    let cancel = CancelToken::new();
    let server = Server::bind(dir, server_config(CleanupPolicy::RemoveFile), cancel.clone())
        .expect("failed to bind server");
    let path = server.slot_path().to_path_buf();
    let handle = std::thread::spawn(move || {
        let mut server = server;
        server.run().expect("server loop failed");
        server
    });
    (path, cancel, handle)
}

fn spawn_router_server(
    path: &Path,
    router_config: RouterConfig,
) -> (CancelToken, JoinHandle<Server<RouterHandler>>) {
    let cancel = CancelToken::new();
    let server = Server::attach(
        path,
        RouterHandler::new(router_config),
        server_config(CleanupPolicy::MarkFree),
        cancel.clone(),
    )
    .expect("failed to attach server");
    let handle = std::thread::spawn(move || {
        let mut server = server;
        server.run().expect("server loop failed");
        server
    });
    (cancel, handle)
}

fn quick_router_config() -> RouterConfig {
    RouterConfig {
        ack_delay: Duration::from_millis(1),
        timeout_delay: Duration::from_millis(1),
    }
}

// ============================================================================
// PING SERVER (multi-server variant)
// ============================================================================

#[test]
fn test_ping_exchange_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let (path, cancel, handle) = spawn_ping_server(dir.path());

    let mut conn = Connection::open(&path, client_config(), CancelToken::new()).unwrap();
    match conn.send("ping").unwrap() {
        ServerReply::Text(text) => {
            assert!(text.contains("pong"), "unexpected response: {}", text);
            assert!(text.contains("server #1"));
            assert!(text.contains("client #1"));
        }
        other => panic!("expected Text, got {:?}", other),
    }
    assert_eq!(conn.client_id(), 1);

    // The exchange must end with the slot released
    let mut slot = SlotFile::open(&path).unwrap();
    assert_eq!(slot.read().unwrap().status, Status::Free);
    drop(slot);

    cancel.cancel();
    let server = handle.join().unwrap();
    assert_eq!(server.connected_clients(), 1);
    assert!(!path.exists(), "slot file should be removed at shutdown");
}

#[test]
fn test_identity_sticky_across_exchanges() {
    let dir = tempfile::tempdir().unwrap();
    let (path, cancel, handle) = spawn_ping_server(dir.path());

    let mut conn = Connection::open(&path, client_config(), CancelToken::new()).unwrap();
    conn.send("ping").unwrap();
    let assigned = conn.client_id();
    assert!(assigned > 0);

    conn.send("ping").unwrap();
    assert_eq!(conn.client_id(), assigned, "identity must not change");

    cancel.cancel();
    let server = handle.join().unwrap();
    // Reusing the id must not grow the connected set
    assert_eq!(server.connected_clients(), 1);
}

#[test]
fn test_two_clients_get_distinct_increasing_ids() {
    let dir = tempfile::tempdir().unwrap();
    let (path, cancel, handle) = spawn_ping_server(dir.path());

    let mut first = Connection::open(&path, client_config(), CancelToken::new()).unwrap();
    first.send("ping").unwrap();
    let mut second = Connection::open(&path, client_config(), CancelToken::new()).unwrap();
    second.send("ping").unwrap();

    assert!(second.client_id() > first.client_id());

    cancel.cancel();
    let server = handle.join().unwrap();
    assert_eq!(server.connected_clients(), 2);
}

#[test]
fn test_invalid_request_rejected_without_identity() {
    let dir = tempfile::tempdir().unwrap();
    let (path, cancel, handle) = spawn_ping_server(dir.path());

    let mut conn = Connection::open(&path, client_config(), CancelToken::new()).unwrap();
    match conn.send("hello").unwrap() {
        ServerReply::Text(text) => assert!(text.starts_with("ERROR"), "got: {}", text),
        other => panic!("expected error text, got {:?}", other),
    }
    // A rejected request assigns no identity to the sender
    assert_eq!(conn.client_id(), 0);

    cancel.cancel();
    let server = handle.join().unwrap();
    assert_eq!(server.connected_clients(), 0);
}

#[test]
fn test_reconnect_presents_as_new_client() {
    let dir = tempfile::tempdir().unwrap();
    let (path, cancel, handle) = spawn_ping_server(dir.path());

    let mut conn = Connection::open(&path, client_config(), CancelToken::new()).unwrap();
    conn.send("ping").unwrap();
    let first_id = conn.client_id();
    conn.close().unwrap();

    // A reconnect starts over with id 0 and receives a fresh identity
    let mut conn = Connection::open(&path, client_config(), CancelToken::new()).unwrap();
    assert_eq!(conn.client_id(), 0);
    conn.send("ping").unwrap();
    assert!(conn.client_id() > first_id);

    cancel.cancel();
    let server = handle.join().unwrap();
    assert_eq!(server.connected_clients(), 2);
}

// ============================================================================
// REQUEST ROUTER (single-server variant)
// ============================================================================

#[test]
fn test_sequential_requests_answered_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ipc_slot.bin");
    let (cancel, handle) = spawn_router_server(&path, quick_router_config());

    let mut conn = Connection::open(&path, client_config(), CancelToken::new()).unwrap();
    match conn.send(&format_envelope(10, "foo")).unwrap() {
        ServerReply::Text(text) => assert_eq!(text, "[10] ack: foo"),
        other => panic!("expected Text, got {:?}", other),
    }
    match conn.send(&format_envelope(11, "bar")).unwrap() {
        ServerReply::Text(text) => assert_eq!(text, "[11] ack: bar"),
        other => panic!("expected Text, got {:?}", other),
    }

    cancel.cancel();
    handle.join().unwrap();
}

#[test]
fn test_empty_body_returns_no_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ipc_slot.bin");
    let (cancel, handle) = spawn_router_server(&path, quick_router_config());

    let mut conn = Connection::open(&path, client_config(), CancelToken::new()).unwrap();
    assert_eq!(
        conn.send(&format_envelope(1, "empty")).unwrap(),
        ServerReply::NoContent
    );

    cancel.cancel();
    handle.join().unwrap();
}

#[test]
fn test_error_body_keeps_protocol_usable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ipc_slot.bin");
    let (cancel, handle) = spawn_router_server(&path, quick_router_config());

    let mut conn = Connection::open(&path, client_config(), CancelToken::new()).unwrap();
    match conn.send(&format_envelope(2, "error")).unwrap() {
        ServerReply::Text(text) => assert!(text.contains("ERROR"), "got: {}", text),
        other => panic!("expected Text, got {:?}", other),
    }
    // The simulated error must not wedge the slot
    match conn.send(&format_envelope(3, "still here")).unwrap() {
        ServerReply::Text(text) => assert_eq!(text, "[3] ack: still here"),
        other => panic!("expected Text, got {:?}", other),
    }

    cancel.cancel();
    handle.join().unwrap();
}

#[test]
fn test_malformed_envelope_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ipc_slot.bin");
    let (cancel, handle) = spawn_router_server(&path, quick_router_config());

    let mut conn = Connection::open(&path, client_config(), CancelToken::new()).unwrap();
    match conn.send("no envelope").unwrap() {
        ServerReply::Text(text) => assert!(text.starts_with("ERROR: malformed request")),
        other => panic!("expected error text, got {:?}", other),
    }

    cancel.cancel();
    let server = handle.join().unwrap();
    assert_eq!(server.connected_clients(), 0);
}

#[test]
fn test_timeout_body_recovers_slot_to_free() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ipc_slot.bin");
    // Server-side delay far past the client's patience
    let (cancel, handle) = spawn_router_server(
        &path,
        RouterConfig {
            ack_delay: Duration::from_millis(1),
            timeout_delay: Duration::from_secs(3),
        },
    );

    let mut config = client_config();
    config.ready_timeout = Duration::from_millis(200);
    let mut conn = Connection::open(&path, config, CancelToken::new()).unwrap();

    match conn.send(&format_envelope(1, "timeout")) {
        Err(IpcError::Timeout(_)) => {}
        other => panic!("expected Timeout, got {:?}", other),
    }

    // Recovery must leave the slot FREE with a cleared payload, well before
    // the abandoned server computation completes.
    let mut slot = SlotFile::open(&path).unwrap();
    let msg = slot.read().unwrap();
    assert_eq!(msg.status, Status::Free);
    assert!(msg.text().is_empty());
    drop(slot);

    cancel.cancel();
    handle.join().unwrap();
}

#[test]
fn test_crash_body_recovers_and_serves_again() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ipc_slot.bin");
    let (cancel, handle) = spawn_router_server(&path, quick_router_config());

    let mut config = client_config();
    config.ready_timeout = Duration::from_millis(200);
    let mut conn = Connection::open(&path, config, CancelToken::new()).unwrap();

    // The server never answers a crash body; the client resets the slot
    match conn.send(&format_envelope(1, "crash")) {
        Err(IpcError::Timeout(_)) => {}
        other => panic!("expected Timeout, got {:?}", other),
    }
    let mut slot = SlotFile::open(&path).unwrap();
    assert_eq!(slot.read().unwrap().status, Status::Free);
    drop(slot);

    // Give the server a few poll intervals to observe the reclaimed slot
    std::thread::sleep(Duration::from_millis(50));

    // The server must pick up brand-new work afterwards
    match conn.send(&format_envelope(2, "hi")).unwrap() {
        ServerReply::Text(text) => assert_eq!(text, "[2] ack: hi"),
        other => panic!("expected Text, got {:?}", other),
    }

    cancel.cancel();
    handle.join().unwrap();
}
