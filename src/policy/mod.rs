//! Allow-list policy for service control requests
//!
//! Everything that reaches the executor must pass through here first. Both
//! enumerations are closed: actions are a fixed enum, service names come from
//! configuration and are matched exactly. There is no pattern matching and no
//! case normalization anywhere in this module; an ambiguous match would widen
//! the privilege boundary.

use std::fmt;
use std::str::FromStr;

/// The fixed set of service lifecycle verbs the daemon will ever run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Stop,
    Restart,
    Status,
}

impl Action {
    /// All permitted actions, in display order
    pub const ALL: [Action; 4] = [
        Action::Start,
        Action::Stop,
        Action::Restart,
        Action::Status,
    ];

    /// The verb as passed to the service manager
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Start => "start",
            Action::Stop => "stop",
            Action::Restart => "restart",
            Action::Status => "status",
        }
    }
}

impl FromStr for Action {
    type Err = ();

    /// Exact, case-sensitive match. `"Start"` or `"start "` are not actions.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "start" => Ok(Action::Start),
            "stop" => Ok(Action::Stop),
            "restart" => Ok(Action::Restart),
            "status" => Ok(Action::Status),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Membership tests over the configured service set and the fixed action set
#[derive(Debug, Clone)]
pub struct AllowList {
    services: Vec<String>,
}

impl AllowList {
    /// Create an allow-list from the configured service names
    pub fn new(services: Vec<String>) -> Self {
        Self { services }
    }

    /// The configured service names
    pub fn services(&self) -> &[String] {
        &self.services
    }

    /// Check whether a service name is a member of the configured set
    pub fn is_allowed_service(&self, name: &str) -> bool {
        self.services.iter().any(|s| s == name)
    }

    /// Check whether an action string is one of the fixed verbs
    pub fn is_allowed_action(&self, action: &str) -> bool {
        Action::from_str(action).is_ok()
    }

    /// Validate an untrusted (service, action) pair.
    ///
    /// This is the only way to construct a [`ValidatedCommand`]; the executor
    /// only accepts that type, so an unvalidated pair cannot reach it by
    /// construction.
    pub fn validate(&self, service: &str, action: &str) -> Option<ValidatedCommand> {
        if !self.is_allowed_service(service) {
            return None;
        }
        let action = Action::from_str(action).ok()?;
        Some(ValidatedCommand {
            service: service.to_string(),
            action,
        })
    }

    /// Re-check an already-validated command against this allow-list.
    ///
    /// Used by the executor to fail closed if it is ever handed a command
    /// validated against a different policy instance.
    pub fn permits(&self, cmd: &ValidatedCommand) -> bool {
        self.is_allowed_service(cmd.service())
    }
}

/// A (service, action) pair that has passed allow-list validation.
///
/// Fields are private: holding a value of this type is proof that
/// [`AllowList::validate`] accepted the pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCommand {
    service: String,
    action: Action,
}

impl ValidatedCommand {
    /// The validated service name, verbatim as received
    pub fn service(&self) -> &str {
        &self.service
    }

    /// The validated action
    pub fn action(&self) -> Action {
        self.action
    }
}

impl fmt::Display for ValidatedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.action, self.service)
    }
}
