//! Run command - execute the control daemon in the foreground

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::cli::args::RunArgs;
use crate::cli::exit_code::ExitCode;
use crate::config::load_config_from_path_or_default;
use crate::control::{Handler, Server};
use crate::exec::SystemctlController;
use crate::logging::audit::{AuditEvent, AuditWriter};
use crate::policy::AllowList;
use crate::utils::socket::remove_existing_socket;

/// Execute the run command
pub async fn execute(args: RunArgs, config_path: Option<PathBuf>) -> Result<ExitCode> {
    let mut config = load_config_from_path_or_default(config_path.as_deref())
        .context("Failed to load configuration")?
        .config;

    // CLI flags override file values
    if let Some(socket) = &args.socket {
        config.socket = socket.to_string_lossy().to_string();
    }
    if let Some(group) = &args.group {
        config.socket_group = group.clone();
    }
    if !args.services.is_empty() {
        config.services = args.services.clone();
    }
    if let Some(audit_log) = &args.audit_log {
        config.audit_log = Some(audit_log.to_string_lossy().to_string());
    }

    let cfg = match config.expand() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Ok(ExitCode::ConfigError);
        }
    };

    info!(
        socket = %cfg.socket.display(),
        group = %cfg.socket_group,
        services = ?cfg.services,
        "Starting workerctl"
    );

    let allow = AllowList::new(cfg.services.clone());
    let controller = Arc::new(SystemctlController::new(allow.clone(), cfg.exec_timeout));

    let audit = match &cfg.audit_log {
        Some(path) => match AuditWriter::open(path) {
            Ok(writer) => {
                info!(path = %path.display(), "Audit logging enabled");
                Some(Arc::new(writer))
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not open audit log, continuing without");
                None
            }
        },
        None => None,
    };

    let mut handler = Handler::new(allow, controller, cfg.max_request_bytes, cfg.read_timeout);
    if let Some(audit) = &audit {
        handler = handler.with_audit(Arc::clone(audit));
    }
    let handler = Arc::new(handler);

    // Bind before anything else; a daemon without its endpoint is useless
    let mut server = Server::new(&cfg.socket).with_group(&cfg.socket_group);
    if let Err(e) = server.bind().await {
        error!(error = %e, "Failed to bind control socket");
        return Ok(ExitCode::SocketError);
    }

    // The socket must also disappear when the accept loop exits through an
    // error path, not just on Server drop
    let cleanup_path = cfg.socket.clone();
    let _cleanup = scopeguard::guard((), move |_| {
        let _ = remove_existing_socket(&cleanup_path);
    });

    if let Some(audit) = &audit {
        if let Err(e) = audit.write(&AuditEvent::server_start(&cfg.socket)) {
            warn!(error = %e, "Failed to write audit record");
        }
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    spawn_signal_task(shutdown_tx)?;

    let handler_for_conn = Arc::clone(&handler);
    server
        .run(
            move |stream| {
                let handler = Arc::clone(&handler_for_conn);
                async move { handler.handle(stream).await }
            },
            shutdown_rx,
        )
        .await
        .context("Accept loop failed")?;

    if let Some(audit) = &audit {
        if let Err(e) = audit.write(&AuditEvent::server_stop()) {
            warn!(error = %e, "Failed to write audit record");
        }
    }

    info!("Shutdown complete");
    Ok(ExitCode::Success)
}

/// Forward SIGINT/SIGTERM into the shutdown channel
fn spawn_signal_task(shutdown_tx: watch::Sender<bool>) -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => info!("Received SIGINT"),
            _ = sigterm.recv() => info!("Received SIGTERM"),
        }
        let _ = shutdown_tx.send(true);
    });

    Ok(())
}
