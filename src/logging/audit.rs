//! JSONL audit trail for control requests
//!
//! Each handled request is appended as one JSON object per line. The audit
//! log answers "who asked this daemon to do what, and what happened" after
//! the fact; it is not a debug log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

/// Audit event kinds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventKind {
    /// Daemon bound its socket and entered the accept loop
    ServerStart,
    /// Daemon shut down and removed its socket
    ServerStop,
    /// One control request was handled to completion
    Request,
    /// A connection failed before producing a request (malformed, timeout)
    Error,
}

/// Allow-list decision for a request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allowed,
    Rejected,
}

/// A single audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event timestamp (UTC)
    pub timestamp: DateTime<Utc>,

    /// Event kind
    pub kind: AuditEventKind,

    /// Requested service name, verbatim as received
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,

    /// Requested action, verbatim as received
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    /// Allow-list decision
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,

    /// Whether the external command succeeded (allowed requests only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,

    /// Free-form detail (error text, socket path)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AuditEvent {
    fn bare(kind: AuditEventKind) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            service: None,
            action: None,
            decision: None,
            success: None,
            detail: None,
        }
    }

    /// Daemon startup marker
    pub fn server_start(socket: &Path) -> Self {
        Self {
            detail: Some(socket.display().to_string()),
            ..Self::bare(AuditEventKind::ServerStart)
        }
    }

    /// Daemon shutdown marker
    pub fn server_stop() -> Self {
        Self::bare(AuditEventKind::ServerStop)
    }

    /// A request rejected by the allow-list
    pub fn rejected(service: &str, action: &str) -> Self {
        Self {
            service: Some(service.to_string()),
            action: Some(action.to_string()),
            decision: Some(Decision::Rejected),
            ..Self::bare(AuditEventKind::Request)
        }
    }

    /// An allowed request and the outcome of its execution
    pub fn allowed(service: &str, action: &str, success: bool) -> Self {
        Self {
            service: Some(service.to_string()),
            action: Some(action.to_string()),
            decision: Some(Decision::Allowed),
            success: Some(success),
            ..Self::bare(AuditEventKind::Request)
        }
    }

    /// A connection that failed before yielding a request
    pub fn error(detail: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
            ..Self::bare(AuditEventKind::Error)
        }
    }
}

/// Append-only JSONL writer
pub struct AuditWriter {
    writer: Mutex<BufWriter<File>>,
}

impl AuditWriter {
    /// Open (or create) the audit log for appending
    pub fn open<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        if let Some(parent) = path.as_ref().parent()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Append one event and flush it to disk
    pub fn write(&self, event: &AuditEvent) -> std::io::Result<()> {
        let line = serde_json::to_string(event)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        writeln!(writer, "{}", line)?;
        writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_audit_request_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let writer = AuditWriter::open(&path).unwrap();

        writer
            .write(&AuditEvent::allowed("booking-event-worker", "restart", true))
            .unwrap();
        writer.write(&AuditEvent::rejected("sshd", "stop")).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: AuditEvent = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.kind, AuditEventKind::Request);
        assert_eq!(first.decision, Some(Decision::Allowed));
        assert_eq!(first.success, Some(true));
        assert_eq!(first.service.as_deref(), Some("booking-event-worker"));

        let second: AuditEvent = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.decision, Some(Decision::Rejected));
        assert!(second.success.is_none());
    }

    #[test]
    fn test_audit_creates_parent_dir() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state").join("audit.jsonl");
        let writer = AuditWriter::open(&path).unwrap();
        writer.write(&AuditEvent::server_stop()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_audit_appends_across_opens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");

        AuditWriter::open(&path)
            .unwrap()
            .write(&AuditEvent::server_start(Path::new("/tmp/x.sock")))
            .unwrap();
        AuditWriter::open(&path)
            .unwrap()
            .write(&AuditEvent::server_stop())
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }
}
