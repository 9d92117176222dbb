//! Unix socket server for the control daemon
//!
//! The server owns the endpoint for the daemon's lifetime: it removes stale
//! artifacts, binds, restricts access to the owner plus the caller group,
//! accepts connections, and removes the socket again on the way out.

use crate::error::{Error, Result};
use crate::utils::socket::{
    lookup_group, prepare_socket_path, remove_existing_socket, set_socket_group,
    set_socket_permissions,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn};

/// Unix socket server for accepting control connections
pub struct Server {
    /// Path to the socket file
    socket_path: PathBuf,
    /// Group granted access to the socket, if configured
    socket_group: Option<String>,
    /// The listener (created on bind)
    listener: Option<UnixListener>,
}

impl Server {
    /// Create a new server that will listen on the specified path
    pub fn new<P: AsRef<Path>>(socket_path: P) -> Self {
        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
            socket_group: None,
            listener: None,
        }
    }

    /// Grant a group read/write access to the socket once bound
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.socket_group = Some(group.into());
        self
    }

    /// Get the socket path
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Bind the server to the socket path.
    ///
    /// Removes a stale socket left by a crashed prior instance (refusing to
    /// touch a symlink), binds, then restricts the mode to 0660. A failure to
    /// hand the socket to the caller group is logged and tolerated: the
    /// endpoint is still owner-accessible. Bind failure itself is fatal.
    pub async fn bind(&mut self) -> Result<()> {
        prepare_socket_path(&self.socket_path)
            .map_err(|e| Error::Socket(e.to_string()))?;

        let listener = UnixListener::bind(&self.socket_path).map_err(|e| {
            Error::Socket(format!(
                "Failed to bind to socket at {}: {}",
                self.socket_path.display(),
                e
            ))
        })?;

        set_socket_permissions(&self.socket_path)
            .map_err(|e| Error::Socket(e.to_string()))?;

        if let Some(group) = &self.socket_group {
            match lookup_group(group).and_then(|gid| set_socket_group(&self.socket_path, gid)) {
                Ok(()) => {
                    debug!(group = %group, "Socket group assigned");
                }
                Err(e) => {
                    warn!(
                        group = %group,
                        error = %e,
                        "Could not assign socket group; continuing with owner-only access"
                    );
                }
            }
        }

        info!(path = %self.socket_path.display(), "Server listening");
        self.listener = Some(listener);
        Ok(())
    }

    /// Accept the next client connection
    pub async fn accept(&self) -> Result<UnixStream> {
        let listener = self
            .listener
            .as_ref()
            .ok_or_else(|| Error::Socket("Server is not bound".to_string()))?;

        let (stream, _addr) = listener
            .accept()
            .await
            .map_err(|e| Error::Socket(format!("Failed to accept connection: {}", e)))?;

        trace!("Accepted new client connection");
        Ok(stream)
    }

    /// Run the accept loop with a connection handler.
    ///
    /// Each accepted connection is dispatched to its own task; the loop never
    /// waits on a handler. Runs until the shutdown signal flips.
    pub async fn run<F, Fut>(&self, handler: F, mut shutdown_rx: watch::Receiver<bool>) -> Result<()>
    where
        F: Fn(UnixStream) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        let listener = self
            .listener
            .as_ref()
            .ok_or_else(|| Error::Socket("Server is not bound".to_string()))?;

        let handler = Arc::new(handler);

        loop {
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    // A dropped sender counts as shutdown
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Received shutdown signal, stopping server");
                        break;
                    }
                }

                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, _addr)) => {
                            trace!("Accepted new client connection");
                            let handler = Arc::clone(&handler);
                            tokio::spawn(async move {
                                if let Err(e) = handler(stream).await {
                                    // Client went away mid-response, nothing to salvage
                                    debug!(error = %e, "Connection handler error");
                                }
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                            // Keep serving other callers
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Remove the socket file
    fn cleanup(&self) {
        match remove_existing_socket(&self.socket_path) {
            Ok(()) => debug!(path = %self.socket_path.display(), "Removed socket file"),
            Err(e) => warn!(
                path = %self.socket_path.display(),
                error = %e,
                "Failed to remove socket file during cleanup"
            ),
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if self.listener.is_some() {
            self.cleanup();
        }
    }
}
