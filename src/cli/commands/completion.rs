//! Completion command implementation

use anyhow::Result;
use clap::CommandFactory;
use clap_complete::generate;
use std::io;

use crate::cli::Cli;
use crate::cli::args::CompletionArgs;
use crate::cli::exit_code::ExitCode;

/// Execute the completion command
pub async fn execute(args: CompletionArgs) -> Result<ExitCode> {
    let mut cmd = Cli::command();
    generate(args.shell, &mut cmd, "workerctl", &mut io::stdout());
    Ok(ExitCode::Success)
}
