//! workerctl - privilege-separated worker service control
//!
//! This library implements a small daemon that listens on a Unix socket and
//! executes an allow-listed set of `systemctl --user` actions on behalf of a
//! less-trusted caller (typically the web server). The caller never holds
//! service-management rights itself; the socket is the entire trust boundary.

pub mod cli;
pub mod config;
pub mod control;
pub mod error;
pub mod exec;
pub mod logging;
pub mod policy;
pub mod protocol;
pub mod service;
pub mod utils;

pub use error::{Error, Result};

/// Package version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name
pub const NAME: &str = env!("CARGO_PKG_NAME");
