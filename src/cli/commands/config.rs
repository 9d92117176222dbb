//! Config command - show or validate configuration

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::cli::args::ConfigArgs;
use crate::cli::exit_code::ExitCode;
use crate::config::{self, Config};

/// Execute the config command
pub async fn execute(args: ConfigArgs, config_path: Option<PathBuf>) -> Result<ExitCode> {
    if args.paths {
        println!("Config search paths (in priority order):");
        for (i, path) in config::config_search_paths().iter().enumerate() {
            let exists = if path.exists() { " [exists]" } else { "" };
            println!("  {}. {}{}", i + 1, path.display(), exists);
        }
        return Ok(ExitCode::Success);
    }

    if args.show_default {
        print_config(&Config::default(), &args.format)?;
        return Ok(ExitCode::Success);
    }

    let config_file = match config::load_config_from_path_or_default(config_path.as_deref()) {
        Ok(cf) => cf,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return Ok(ExitCode::ConfigError);
        }
    };

    if args.validate {
        // Expansion catches empty allow-lists and bad durations too
        match config_file.config.expand() {
            Ok(_) => {
                if config_file.path.as_os_str().is_empty() {
                    println!("No configuration file found; built-in defaults are valid");
                } else {
                    println!("Configuration valid: {}", config_file.path.display());
                }
                return Ok(ExitCode::Success);
            }
            Err(e) => {
                eprintln!("Configuration invalid: {}", e);
                return Ok(ExitCode::ConfigError);
            }
        }
    }

    if !config_file.path.as_os_str().is_empty() {
        println!("# loaded from {}", config_file.path.display());
    }
    print_config(&config_file.config, &args.format)?;
    Ok(ExitCode::Success)
}

fn print_config(config: &Config, format: &str) -> Result<()> {
    match format {
        "json" => {
            let json =
                serde_json::to_string_pretty(config).context("Failed to serialize config")?;
            println!("{}", json);
        }
        _ => {
            let toml = toml::to_string_pretty(config).context("Failed to serialize config")?;
            print!("{}", toml);
        }
    }
    Ok(())
}
