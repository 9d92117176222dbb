//! Argument structures for CLI commands

use clap::Args;
use clap_complete::Shell;
use std::path::PathBuf;

/// Arguments for the `run` command
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Control socket path (overrides configuration)
    #[arg(short, long)]
    pub socket: Option<PathBuf>,

    /// Group granted access to the socket (overrides configuration)
    #[arg(short, long)]
    pub group: Option<String>,

    /// Allow-listed service name (repeatable, overrides configuration)
    #[arg(long = "service", value_name = "NAME")]
    pub services: Vec<String>,

    /// Path to JSONL audit log (overrides configuration)
    #[arg(long)]
    pub audit_log: Option<PathBuf>,
}

/// Arguments for the `call` command
#[derive(Args, Debug, Clone)]
pub struct CallArgs {
    /// Service name to control
    pub service: String,

    /// Action to perform (start, stop, restart, status)
    pub action: String,

    /// Control socket path (overrides configuration)
    #[arg(short, long)]
    pub socket: Option<PathBuf>,

    /// Print the raw JSON response
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `config` command
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Show the configuration search paths
    #[arg(long)]
    pub paths: bool,

    /// Validate configuration only
    #[arg(long)]
    pub validate: bool,

    /// Show the built-in default configuration
    #[arg(long)]
    pub show_default: bool,

    /// Output format
    #[arg(short, long, default_value = "toml", value_parser = ["toml", "json"])]
    pub format: String,
}

/// Arguments for the `service register` command
#[derive(Args, Debug, Clone)]
pub struct RegisterArgs {
    /// Control socket path to pass to the daemon
    #[arg(short, long)]
    pub socket: Option<PathBuf>,

    /// Allow-listed service name to pass to the daemon (repeatable)
    #[arg(long = "service", value_name = "NAME")]
    pub services: Vec<String>,
}

/// Arguments for the `service unregister` command
#[derive(Args, Debug, Clone)]
pub struct UnregisterArgs {
    /// Do not fail if the unit is not registered
    #[arg(long)]
    pub if_registered: bool,
}

/// Arguments for the `completion` command
#[derive(Args, Debug, Clone)]
pub struct CompletionArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
