//! Call command - send one control request to a running daemon

use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

use crate::cli::args::CallArgs;
use crate::cli::exit_code::ExitCode;
use crate::config::{expand_path, load_config_from_path_or_default};
use crate::protocol::{ControlRequest, ControlResponse};

/// Execute the call command
pub async fn execute(args: CallArgs, config_path: Option<PathBuf>) -> Result<ExitCode> {
    let socket = match &args.socket {
        Some(path) => path.clone(),
        None => {
            let config = load_config_from_path_or_default(config_path.as_deref())
                .context("Failed to load configuration")?
                .config;
            PathBuf::from(expand_path(&config.socket)?)
        }
    };

    let mut stream = UnixStream::connect(&socket)
        .await
        .with_context(|| format!("Failed to connect to {}", socket.display()))?;

    let request = ControlRequest::new(&args.service, &args.action);
    let payload = serde_json::to_vec(&request)?;
    stream.write_all(&payload).await.context("Failed to send request")?;
    // Half-close so the daemon sees EOF even for exotic payloads
    stream.shutdown().await.context("Failed to close write side")?;

    let mut buf = Vec::new();
    stream
        .read_to_end(&mut buf)
        .await
        .context("Failed to read response")?;

    let response: ControlResponse =
        serde_json::from_slice(&buf).context("Daemon returned a malformed response")?;

    if args.json {
        println!("{}", serde_json::to_string(&response)?);
    } else if response.success {
        if let Some(output) = &response.output {
            print!("{}", output);
        }
    } else {
        eprintln!(
            "{} {} failed: {}",
            args.action,
            args.service,
            response.error.as_deref().unwrap_or("unknown error")
        );
    }

    Ok(if response.success {
        ExitCode::Success
    } else {
        ExitCode::ControlFailed
    })
}
