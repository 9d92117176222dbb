//! Service management module
//!
//! Installs workerctl as a systemd *user* service so the daemon comes up at
//! login with the same rights it needs to control the worker units.

mod systemd;

pub use systemd::{Systemd, SystemdStatus};
