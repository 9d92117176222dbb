//! Per-connection request handling
//!
//! One handler call per accepted connection, no state shared with other
//! connections. Whatever happens inside the pipeline, the connection gets
//! exactly one response and is then closed; the privileged command runs
//! exactly once for a well-formed allowed request and zero times otherwise.

use crate::error::Result;
use crate::exec::ServiceController;
use crate::logging::audit::{AuditEvent, AuditWriter};
use crate::policy::AllowList;
use crate::protocol::{read_request, write_response, ControlResponse};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tracing::{debug, warn};

/// Handles accepted control connections
pub struct Handler<C> {
    allow: AllowList,
    controller: Arc<C>,
    audit: Option<Arc<AuditWriter>>,
    max_request_bytes: usize,
    read_timeout: Duration,
    connection_counter: AtomicU64,
}

impl<C: ServiceController> Handler<C> {
    /// Create a handler over the given policy and executor
    pub fn new(
        allow: AllowList,
        controller: Arc<C>,
        max_request_bytes: usize,
        read_timeout: Duration,
    ) -> Self {
        Self {
            allow,
            controller,
            audit: None,
            max_request_bytes,
            read_timeout,
            connection_counter: AtomicU64::new(0),
        }
    }

    /// Attach an audit log
    pub fn with_audit(mut self, audit: Arc<AuditWriter>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Handle one connection: read, decode, validate, execute, respond, close.
    pub async fn handle(&self, mut stream: UnixStream) -> Result<()> {
        let conn_id = self.connection_counter.fetch_add(1, Ordering::Relaxed);
        debug!(conn_id, "Client connected");

        // Every path below produces a response; only the write can fail
        let response = self.process(&mut stream).await;
        let written = write_response(&mut stream, &response).await;
        let _ = stream.shutdown().await;

        debug!(conn_id, success = response.success, "Client disconnected");
        written
    }

    async fn process(&self, stream: &mut UnixStream) -> ControlResponse {
        let read = tokio::time::timeout(
            self.read_timeout,
            read_request(stream, self.max_request_bytes),
        )
        .await;

        let request = match read {
            Ok(Ok(request)) => request,
            Ok(Err(e)) => {
                let detail = e.to_string();
                debug!(error = %detail, "Failed to read request");
                self.audit(AuditEvent::error(&detail));
                return ControlResponse::failure(detail);
            }
            Err(_) => {
                let detail = format!(
                    "Request read timed out after {}s",
                    self.read_timeout.as_secs()
                );
                debug!("{}", detail);
                self.audit(AuditEvent::error(&detail));
                return ControlResponse::failure(detail);
            }
        };

        match self.allow.validate(&request.service, &request.action) {
            Some(cmd) => {
                let response = self.controller.control(&cmd).await;
                self.audit(AuditEvent::allowed(
                    &request.service,
                    &request.action,
                    response.success,
                ));
                response
            }
            None => {
                // Expected adversarial-input path, not an anomaly
                debug!(
                    service = %request.service,
                    action = %request.action,
                    "Rejected by allow-list"
                );
                self.audit(AuditEvent::rejected(&request.service, &request.action));
                ControlResponse::rejected()
            }
        }
    }

    fn audit(&self, event: AuditEvent) {
        if let Some(audit) = &self.audit
            && let Err(e) = audit.write(&event)
        {
            warn!(error = %e, "Failed to write audit record");
        }
    }
}
