//! CLI module for workerctl
//!
//! This module provides the command-line interface using clap derive macros.

pub mod args;
pub mod commands;
pub mod exit_code;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use args::{CallArgs, CompletionArgs, ConfigArgs, RegisterArgs, RunArgs, UnregisterArgs};

/// Privilege-separated worker service control over a Unix socket
#[derive(Parser, Debug)]
#[command(name = "workerctl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file path
    #[arg(long, global = true, env = "WORKERCTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the control daemon in the foreground
    Run(RunArgs),

    /// Send one control request to a running daemon
    Call(CallArgs),

    /// Show or validate configuration
    Config(ConfigArgs),

    /// Manage the daemon's own systemd user service
    Service {
        #[command(subcommand)]
        command: ServiceCommand,
    },

    /// Generate shell completion scripts
    Completion(CompletionArgs),

    /// Show version information
    Version,
}

/// Service management subcommands
#[derive(Subcommand, Debug)]
pub enum ServiceCommand {
    /// Install and enable the systemd user unit
    Register(RegisterArgs),

    /// Stop, disable, and remove the systemd user unit
    Unregister(UnregisterArgs),

    /// Show the state of the systemd user unit
    Status,
}
