//! workerctl - privilege-separated worker service control

use clap::{CommandFactory, Parser};
use clap_complete::env::CompleteEnv;

use workerctl::cli::commands;
use workerctl::cli::exit_code::ExitCode;
use workerctl::cli::{Cli, Commands, ServiceCommand};
use workerctl::logging;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    // Handle dynamic shell completion if COMPLETE env var is set
    CompleteEnv::with_factory(Cli::command).complete();

    let cli = Cli::parse();

    logging::init(cli.verbose, cli.quiet);

    match dispatch(cli).await {
        Ok(code) => code.into(),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::GeneralError.into()
        }
    }
}

async fn dispatch(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Commands::Run(args) => commands::run::execute(args, cli.config).await,
        Commands::Call(args) => commands::call::execute(args, cli.config).await,
        Commands::Config(args) => commands::config::execute(args, cli.config).await,
        Commands::Service { command } => match command {
            ServiceCommand::Register(args) => commands::service::register(args).await,
            ServiceCommand::Unregister(args) => commands::service::unregister(args).await,
            ServiceCommand::Status => commands::service::status().await,
        },
        Commands::Completion(args) => commands::completion::execute(args).await,
        Commands::Version => {
            commands::version::print_version(cli.verbose);
            Ok(ExitCode::Success)
        }
    }
}
