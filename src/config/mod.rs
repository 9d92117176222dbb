//! Configuration for workerctl
//!
//! Configuration is TOML, discovered in standard locations or given with
//! `--config`. Paths support environment variable and tilde expansion;
//! durations are human-readable strings ("5s", "30s").

mod file;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub use file::{
    ConfigFile, config_search_paths, find_config_file, load_config,
    load_config_from_path_or_default,
};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Path to the control socket
    /// Supports environment variable and tilde expansion
    #[serde(default = "default_socket")]
    pub socket: String,

    /// Group granted read/write access to the socket
    #[serde(default = "default_socket_group")]
    pub socket_group: String,

    /// Services the daemon is willing to control. Names are matched exactly.
    #[serde(default = "default_services")]
    pub services: Vec<String>,

    /// Optional JSONL audit log path
    /// Supports environment variable and tilde expansion
    #[serde(default)]
    pub audit_log: Option<String>,

    /// Request handling limits
    #[serde(default)]
    pub limits: Limits,
}

/// Bounds on a single request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Limits {
    /// Maximum request payload size in bytes
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: usize,

    /// How long to wait for a client to send its request
    /// Format: "5s", "1m", whole seconds and up
    #[serde(default = "default_read_timeout")]
    pub read_timeout: String,

    /// How long to wait for the service manager to finish
    #[serde(default = "default_exec_timeout")]
    pub exec_timeout: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket: default_socket(),
            socket_group: default_socket_group(),
            services: default_services(),
            audit_log: None,
            limits: Limits::default(),
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_request_bytes: default_max_request_bytes(),
            read_timeout: default_read_timeout(),
            exec_timeout: default_exec_timeout(),
        }
    }
}

fn default_socket() -> String {
    "/srv/calendar/workers/control.sock".to_string()
}

fn default_socket_group() -> String {
    "www-data".to_string()
}

fn default_services() -> Vec<String> {
    vec![
        "booking-event-worker".to_string(),
        "google-calendar-worker".to_string(),
    ]
}

fn default_max_request_bytes() -> usize {
    crate::protocol::DEFAULT_MAX_REQUEST_SIZE
}

fn default_read_timeout() -> String {
    "5s".to_string()
}

fn default_exec_timeout() -> String {
    "30s".to_string()
}

impl Config {
    /// Expand paths and parse durations into a ready-to-use configuration
    pub fn expand(&self) -> crate::Result<ExpandedConfig> {
        if self.services.is_empty() {
            return Err(crate::Error::Config(
                "Service allow-list is empty; the daemon would reject everything".to_string(),
            ));
        }

        let socket = PathBuf::from(expand_path(&self.socket)?);
        let audit_log = self
            .audit_log
            .as_ref()
            .map(|p| expand_path(p))
            .transpose()?
            .map(PathBuf::from);

        Ok(ExpandedConfig {
            socket,
            socket_group: self.socket_group.clone(),
            services: self.services.clone(),
            audit_log,
            max_request_bytes: self.limits.max_request_bytes,
            read_timeout: parse_duration(&self.limits.read_timeout)?,
            exec_timeout: parse_duration(&self.limits.exec_timeout)?,
        })
    }
}

/// Configuration with paths expanded and durations parsed
#[derive(Debug, Clone)]
pub struct ExpandedConfig {
    /// Resolved control socket path
    pub socket: PathBuf,

    /// Group granted access to the socket
    pub socket_group: String,

    /// Allow-listed service names
    pub services: Vec<String>,

    /// Resolved audit log path
    pub audit_log: Option<PathBuf>,

    /// Maximum request payload size in bytes
    pub max_request_bytes: usize,

    /// Client read timeout
    pub read_timeout: Duration,

    /// Service manager wait timeout
    pub exec_timeout: Duration,
}

/// Expand environment variables and tilde in a path string
pub fn expand_path(path: &str) -> crate::Result<String> {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .map_err(|e| crate::Error::Config(format!("Failed to expand path '{}': {}", path, e)))
}

/// Parse a duration string like "30s", "5m", "1h"
pub fn parse_duration(s: &str) -> crate::Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return Err(crate::Error::Config("Empty duration string".to_string()));
    }

    let (num_str, unit) = s
        .char_indices()
        .find(|(_, c)| c.is_alphabetic())
        .map(|(i, _)| (&s[..i], &s[i..]))
        .unwrap_or((s, "s"));

    let num: u64 = num_str.trim().parse().map_err(|e| {
        crate::Error::Config(format!("Invalid duration number '{}': {}", num_str, e))
    })?;

    let seconds = match unit.to_lowercase().as_str() {
        "s" | "sec" | "secs" | "second" | "seconds" => num,
        "m" | "min" | "mins" | "minute" | "minutes" => num * 60,
        "h" | "hr" | "hrs" | "hour" | "hours" => num * 60 * 60,
        "" => num,
        _ => {
            return Err(crate::Error::Config(format!(
                "Unknown duration unit '{}' in '{}'",
                unit, s
            )));
        }
    };

    Ok(Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.socket, "/srv/calendar/workers/control.sock");
        assert_eq!(config.socket_group, "www-data");
        assert_eq!(
            config.services,
            vec!["booking-event-worker", "google-calendar-worker"]
        );
        assert!(config.audit_log.is_none());
        assert_eq!(config.limits.max_request_bytes, 64 * 1024);
        assert_eq!(config.limits.read_timeout, "5s");
        assert_eq!(config.limits.exec_timeout, "30s");
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_str = r#"
socket = "$XDG_RUNTIME_DIR/workerctl/control.sock"
socket_group = "webapps"
services = ["booking-event-worker", "sms-worker"]
audit_log = "~/.local/state/workerctl/audit.jsonl"

[limits]
max_request_bytes = 4096
read_timeout = "2s"
exec_timeout = "1m"
"#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.socket, "$XDG_RUNTIME_DIR/workerctl/control.sock");
        assert_eq!(config.socket_group, "webapps");
        assert_eq!(config.services, vec!["booking-event-worker", "sms-worker"]);
        assert_eq!(
            config.audit_log.as_deref(),
            Some("~/.local/state/workerctl/audit.jsonl")
        );
        assert_eq!(config.limits.max_request_bytes, 4096);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: std::result::Result<Config, _> =
            toml::from_str(r#"allow_all_services = true"#);
        assert!(result.is_err(), "Should reject unknown fields");
    }

    #[test]
    fn test_expand_parses_durations() {
        let mut config = Config::default();
        config.limits.read_timeout = "2s".to_string();
        config.limits.exec_timeout = "1m".to_string();

        let expanded = config.expand().unwrap();
        assert_eq!(expanded.read_timeout, Duration::from_secs(2));
        assert_eq!(expanded.exec_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_expand_rejects_empty_allow_list() {
        let config = Config {
            services: Vec::new(),
            ..Config::default()
        };
        assert!(config.expand().is_err());
    }

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("45").unwrap(), Duration::from_secs(45));
    }

    #[test]
    fn test_parse_duration_invalid() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("10x").is_err());
    }

    #[test]
    fn test_expand_path_tilde() {
        let result = expand_path("~/workerctl.sock").unwrap();
        assert!(result.starts_with('/'));
        assert!(!result.starts_with('~'));
    }
}
