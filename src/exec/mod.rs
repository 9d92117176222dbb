//! Execution of validated service control commands
//!
//! The executor is the only place the daemon touches its privileged
//! capability. It accepts [`ValidatedCommand`] values exclusively, re-checks
//! them against its own allow-list, and runs the service manager with discrete
//! argv tokens. Every path out of here is a [`ControlResponse`]; a fault
//! during execution is an answer for the caller, never a crash for the daemon.

use crate::policy::{AllowList, ValidatedCommand};
use crate::protocol::ControlResponse;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// The service manager binary. Fixed: the invocation shape is part of the
/// security contract, not configuration.
const SYSTEMCTL: &str = "systemctl";

/// Executes validated control commands.
///
/// The trait seam exists so tests can substitute a recording stub for the
/// real service manager.
#[async_trait]
pub trait ServiceController: Send + Sync {
    /// Run one validated command and report its outcome
    async fn control(&self, cmd: &ValidatedCommand) -> ControlResponse;
}

/// Real controller that shells out to `systemctl --user`
pub struct SystemctlController {
    allow: AllowList,
    exec_timeout: Duration,
}

impl SystemctlController {
    /// Create a controller bound to the given allow-list.
    ///
    /// `exec_timeout` bounds the wait on the external command; on expiry the
    /// child is killed and a failure is reported.
    pub fn new(allow: AllowList, exec_timeout: Duration) -> Self {
        Self {
            allow,
            exec_timeout,
        }
    }

    async fn run_systemctl(&self, cmd: &ValidatedCommand) -> ControlResponse {
        // Discrete argv tokens only; nothing passes through a shell
        let child = Command::new(SYSTEMCTL)
            .arg("--user")
            .arg(cmd.action().as_str())
            .arg(cmd.service())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                warn!(error = %e, "Failed to launch {}", SYSTEMCTL);
                return ControlResponse::failure(format!(
                    "Failed to launch {}: {}",
                    SYSTEMCTL, e
                ));
            }
        };

        let output = match tokio::time::timeout(self.exec_timeout, child.wait_with_output()).await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return ControlResponse::failure(format!("Failed to collect {}: {}", SYSTEMCTL, e));
            }
            Err(_) => {
                // kill_on_drop reaps the child once the future is dropped
                warn!(
                    command = %cmd,
                    timeout_secs = self.exec_timeout.as_secs(),
                    "Service manager did not finish in time"
                );
                return ControlResponse::failure(format!(
                    "{} {} timed out after {}s",
                    SYSTEMCTL,
                    cmd,
                    self.exec_timeout.as_secs()
                ));
            }
        };

        if output.status.success() {
            ControlResponse::ok(String::from_utf8_lossy(&output.stdout))
        } else {
            debug!(command = %cmd, status = ?output.status.code(), "Service manager returned nonzero");
            ControlResponse::failure(String::from_utf8_lossy(&output.stderr))
        }
    }
}

#[async_trait]
impl ServiceController for SystemctlController {
    async fn control(&self, cmd: &ValidatedCommand) -> ControlResponse {
        // Fail closed if the command was validated against a different policy
        if !self.allow.permits(cmd) {
            warn!(command = %cmd, "Command validated against a different policy, refusing");
            return ControlResponse::rejected();
        }

        self.run_systemctl(cmd).await
    }
}
