//! End-to-end daemon tests over a real Unix socket with a stub executor

use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use workerctl::control::{Handler, Server};
use workerctl::exec::ServiceController;
use workerctl::policy::{AllowList, ValidatedCommand};
use workerctl::protocol::{ControlResponse, INVALID_SERVICE_OR_ACTION};

const ALLOWED: [&str; 2] = ["booking-event-worker", "google-calendar-worker"];

/// Records every invocation; optionally sleeps per service to simulate a
/// slow service manager.
struct StubController {
    invocations: Mutex<Vec<(String, String)>>,
    slow_service: Option<(&'static str, Duration)>,
}

impl StubController {
    fn new() -> Self {
        Self {
            invocations: Mutex::new(Vec::new()),
            slow_service: None,
        }
    }

    fn slow_for(service: &'static str, delay: Duration) -> Self {
        Self {
            invocations: Mutex::new(Vec::new()),
            slow_service: Some((service, delay)),
        }
    }

    fn invocations(&self) -> Vec<(String, String)> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl ServiceController for StubController {
    async fn control(&self, cmd: &ValidatedCommand) -> ControlResponse {
        if let Some((service, delay)) = self.slow_service
            && cmd.service() == service
        {
            tokio::time::sleep(delay).await;
        }
        self.invocations
            .lock()
            .unwrap()
            .push((cmd.service().to_string(), cmd.action().as_str().to_string()));
        ControlResponse::ok(format!("stub: {}\n", cmd))
    }
}

fn allow_list() -> AllowList {
    AllowList::new(ALLOWED.iter().map(|s| s.to_string()).collect())
}

/// Bind a daemon on `socket` and serve until the returned sender flips.
async fn start_daemon(
    socket: &Path,
    controller: Arc<StubController>,
    max_request_bytes: usize,
    read_timeout: Duration,
) -> (watch::Sender<bool>, JoinHandle<()>) {
    let handler = Arc::new(Handler::new(
        allow_list(),
        controller,
        max_request_bytes,
        read_timeout,
    ));

    let mut server = Server::new(socket);
    server.bind().await.unwrap();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move {
        server
            .run(
                move |stream| {
                    let handler = Arc::clone(&handler);
                    async move { handler.handle(stream).await }
                },
                shutdown_rx,
            )
            .await
            .unwrap();
        // Server drops here and removes its socket
    });

    // Wait for the accept loop to come up
    tokio::time::sleep(Duration::from_millis(50)).await;
    (shutdown_tx, handle)
}

/// Send raw bytes, half-close, read the full response.
async fn send_raw(socket: &Path, payload: &[u8]) -> ControlResponse {
    let mut stream = UnixStream::connect(socket).await.unwrap();
    // The server may answer and close before consuming everything we send
    let _ = stream.write_all(payload).await;
    let _ = stream.shutdown().await;

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    serde_json::from_slice(&buf).unwrap()
}

async fn send_request(socket: &Path, service: &str, action: &str) -> ControlResponse {
    let payload = serde_json::json!({ "service": service, "action": action });
    send_raw(socket, payload.to_string().as_bytes()).await
}

#[tokio::test]
async fn test_allowed_request_invokes_executor_once() {
    let dir = TempDir::new().unwrap();
    let socket = dir.path().join("control.sock");
    let stub = Arc::new(StubController::new());
    let (_tx, _handle) = start_daemon(&socket, Arc::clone(&stub), 64 * 1024, secs(2)).await;

    let response = send_request(&socket, "booking-event-worker", "restart").await;

    assert!(response.success);
    assert_eq!(
        response.output.as_deref(),
        Some("stub: restart booking-event-worker\n")
    );
    assert!(response.error.is_none());
    assert_eq!(
        stub.invocations(),
        vec![("booking-event-worker".to_string(), "restart".to_string())]
    );
}

#[tokio::test]
async fn test_disallowed_service_never_reaches_executor() {
    let dir = TempDir::new().unwrap();
    let socket = dir.path().join("control.sock");
    let stub = Arc::new(StubController::new());
    let (_tx, _handle) = start_daemon(&socket, Arc::clone(&stub), 64 * 1024, secs(2)).await;

    let response = send_request(&socket, "sshd", "restart").await;

    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some(INVALID_SERVICE_OR_ACTION));
    assert!(response.output.is_none());
    assert!(stub.invocations().is_empty());
}

#[tokio::test]
async fn test_disallowed_action_never_reaches_executor() {
    let dir = TempDir::new().unwrap();
    let socket = dir.path().join("control.sock");
    let stub = Arc::new(StubController::new());
    let (_tx, _handle) = start_daemon(&socket, Arc::clone(&stub), 64 * 1024, secs(2)).await;

    let response = send_request(&socket, "booking-event-worker", "enable").await;

    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some(INVALID_SERVICE_OR_ACTION));
    assert!(stub.invocations().is_empty());
}

#[tokio::test]
async fn test_injection_attempt_rejected_before_argument_construction() {
    let dir = TempDir::new().unwrap();
    let socket = dir.path().join("control.sock");
    let stub = Arc::new(StubController::new());
    let (_tx, _handle) = start_daemon(&socket, Arc::clone(&stub), 64 * 1024, secs(2)).await;

    let response = send_request(&socket, "booking-event-worker; rm -rf /", "start").await;
    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some(INVALID_SERVICE_OR_ACTION));

    let response = send_request(&socket, "booking-event-worker", "start; rm -rf /").await;
    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some(INVALID_SERVICE_OR_ACTION));

    assert!(stub.invocations().is_empty());
}

#[tokio::test]
async fn test_rejection_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let socket = dir.path().join("control.sock");
    let stub = Arc::new(StubController::new());
    let (_tx, _handle) = start_daemon(&socket, Arc::clone(&stub), 64 * 1024, secs(2)).await;

    for _ in 0..5 {
        let response = send_request(&socket, "sshd", "stop").await;
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some(INVALID_SERVICE_OR_ACTION));
    }

    assert!(stub.invocations().is_empty());
}

#[tokio::test]
async fn test_missing_keys_are_rejected() {
    let dir = TempDir::new().unwrap();
    let socket = dir.path().join("control.sock");
    let stub = Arc::new(StubController::new());
    let (_tx, _handle) = start_daemon(&socket, Arc::clone(&stub), 64 * 1024, secs(2)).await;

    // Empty-object request: keys default to empty strings, which never validate
    let response = send_raw(&socket, b"{}").await;

    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some(INVALID_SERVICE_OR_ACTION));
    assert!(stub.invocations().is_empty());
}

#[tokio::test]
async fn test_malformed_payload_still_gets_a_response() {
    let dir = TempDir::new().unwrap();
    let socket = dir.path().join("control.sock");
    let stub = Arc::new(StubController::new());
    let (_tx, _handle) = start_daemon(&socket, Arc::clone(&stub), 64 * 1024, secs(2)).await;

    let response = tokio::time::timeout(secs(3), send_raw(&socket, b"restart it please"))
        .await
        .expect("handler must respond within bounded time");

    assert!(!response.success);
    assert!(response.error.is_some());
    assert!(stub.invocations().is_empty());
}

#[tokio::test]
async fn test_truncated_payload_still_gets_a_response() {
    let dir = TempDir::new().unwrap();
    let socket = dir.path().join("control.sock");
    let stub = Arc::new(StubController::new());
    let (_tx, _handle) = start_daemon(&socket, Arc::clone(&stub), 64 * 1024, secs(2)).await;

    let response = tokio::time::timeout(secs(3), send_raw(&socket, br#"{"service":"book"#))
        .await
        .expect("handler must respond within bounded time");

    assert!(!response.success);
    assert!(stub.invocations().is_empty());
}

#[tokio::test]
async fn test_oversized_payload_is_malformed_not_buffered() {
    let dir = TempDir::new().unwrap();
    let socket = dir.path().join("control.sock");
    let stub = Arc::new(StubController::new());
    // Tight limit for the test
    let (_tx, _handle) = start_daemon(&socket, Arc::clone(&stub), 1024, secs(2)).await;

    let mut payload = br#"{"service":""#.to_vec();
    payload.extend(std::iter::repeat(b'a').take(8 * 1024));
    payload.extend(br#"","action":"start"}"#);

    let response = tokio::time::timeout(secs(3), send_raw(&socket, &payload))
        .await
        .expect("handler must respond within bounded time");

    assert!(!response.success);
    assert!(stub.invocations().is_empty());
}

#[tokio::test]
async fn test_silent_client_gets_timeout_response() {
    let dir = TempDir::new().unwrap();
    let socket = dir.path().join("control.sock");
    let stub = Arc::new(StubController::new());
    let (_tx, _handle) = start_daemon(&socket, Arc::clone(&stub), 64 * 1024, secs(1)).await;

    // Connect and say nothing; the daemon must not wait forever
    let mut stream = UnixStream::connect(&socket).await.unwrap();
    let mut buf = Vec::new();
    tokio::time::timeout(secs(3), stream.read_to_end(&mut buf))
        .await
        .expect("daemon must close the connection")
        .unwrap();

    let response: ControlResponse = serde_json::from_slice(&buf).unwrap();
    assert!(!response.success);
    assert!(response.error.unwrap().contains("timed out"));
    assert!(stub.invocations().is_empty());
}

#[tokio::test]
async fn test_concurrent_handlers_are_independent() {
    let dir = TempDir::new().unwrap();
    let socket = dir.path().join("control.sock");
    // Executions for booking-event-worker hang for a while; the other
    // service resolves immediately
    let stub = Arc::new(StubController::slow_for(
        "booking-event-worker",
        Duration::from_millis(800),
    ));
    let (_tx, _handle) = start_daemon(&socket, Arc::clone(&stub), 64 * 1024, secs(5)).await;

    let slow_socket = socket.clone();
    let slow = tokio::spawn(async move {
        send_request(&slow_socket, "booking-event-worker", "restart").await
    });

    // Give the slow request a head start into its executor sleep
    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = std::time::Instant::now();
    let fast = send_request(&socket, "google-calendar-worker", "status").await;
    let fast_elapsed = started.elapsed();

    assert!(fast.success);
    assert!(
        fast_elapsed < Duration::from_millis(400),
        "fast request should not wait on the slow one (took {:?})",
        fast_elapsed
    );

    let slow = slow.await.unwrap();
    assert!(slow.success);
    assert_eq!(stub.invocations().len(), 2);
}

#[tokio::test]
async fn test_stale_socket_is_replaced_at_startup() {
    let dir = TempDir::new().unwrap();
    let socket = dir.path().join("control.sock");

    // Leftover from a crashed prior instance
    std::fs::write(&socket, b"stale").unwrap();

    let stub = Arc::new(StubController::new());
    let (_tx, _handle) = start_daemon(&socket, Arc::clone(&stub), 64 * 1024, secs(2)).await;

    let response = send_request(&socket, "booking-event-worker", "status").await;
    assert!(response.success);
}

#[tokio::test]
async fn test_shutdown_removes_socket() {
    let dir = TempDir::new().unwrap();
    let socket = dir.path().join("control.sock");
    let stub = Arc::new(StubController::new());
    let (shutdown_tx, handle) = start_daemon(&socket, stub, 64 * 1024, secs(2)).await;

    assert!(socket.exists());

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();

    assert!(!socket.exists(), "socket must be removed on shutdown");
}

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}
