//! Logging for workerctl
//!
//! Diagnostic logging goes to stderr through tracing; the security-relevant
//! record of who asked for what lives in the JSONL audit log ([`audit`]).

pub mod audit;

pub use audit::{AuditEvent, AuditEventKind, AuditWriter, Decision};

use tracing_subscriber::EnvFilter;

/// Initialize logging with tracing-subscriber
///
/// `RUST_LOG` overrides the verbosity flags when set.
pub fn init(verbose: bool, quiet: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else if quiet {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
