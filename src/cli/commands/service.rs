//! Service management commands - register/unregister/status

use anyhow::Result;
use tracing::info;

use crate::cli::args::{RegisterArgs, UnregisterArgs};
use crate::cli::exit_code::ExitCode;
use crate::service::Systemd;

/// Execute the register command
pub async fn register(args: RegisterArgs) -> Result<ExitCode> {
    let systemd = Systemd::new();

    // Arguments the unit's ExecStart forwards to `workerctl run`
    let mut run_args = Vec::new();
    if let Some(socket) = &args.socket {
        run_args.push("--socket".to_string());
        run_args.push(socket.to_string_lossy().to_string());
    }
    for service in &args.services {
        run_args.push("--service".to_string());
        run_args.push(service.clone());
    }

    systemd.register(&run_args)?;
    println!("Registered {}", systemd.service_name());
    println!("Unit file: {}", systemd.unit_path().display());
    Ok(ExitCode::Success)
}

/// Execute the unregister command
pub async fn unregister(args: UnregisterArgs) -> Result<ExitCode> {
    let systemd = Systemd::new();

    if !systemd.is_registered() && args.if_registered {
        info!("Service not registered, nothing to do");
        return Ok(ExitCode::Success);
    }

    systemd.unregister()?;
    println!("Unregistered {}", systemd.service_name());
    Ok(ExitCode::Success)
}

/// Execute the status command
pub async fn status() -> Result<ExitCode> {
    let status = Systemd::new().status();

    println!("Service:   {}", status.service_name);
    println!("Unit file: {}", status.unit_path.display());
    println!(
        "Registered: {}",
        if status.registered { "yes" } else { "no" }
    );
    println!("Running:    {}", if status.running { "yes" } else { "no" });

    Ok(if status.registered {
        ExitCode::Success
    } else {
        ExitCode::GeneralError
    })
}
