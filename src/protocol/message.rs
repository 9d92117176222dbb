//! Control request and response payloads

use serde::{Deserialize, Serialize};

/// Fixed rejection text for allow-list failures.
///
/// Deliberately does not echo the submitted values or say which of the two
/// checks failed; the caller learns nothing about the shape of the allow-list.
pub const INVALID_SERVICE_OR_ACTION: &str = "Invalid service or action";

/// An inbound control request, untrusted until validated.
///
/// Missing keys deserialize to empty strings. An empty string is never a
/// member of either allow-list, so an incomplete request fails validation
/// instead of being special-cased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlRequest {
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub action: String,
}

impl ControlRequest {
    pub fn new(service: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            action: action.into(),
        }
    }
}

/// The outcome of one control request.
///
/// Exactly one of `output`/`error` is populated; the constructors are the only
/// way this type is built, so the invariant holds on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlResponse {
    pub success: bool,

    /// Captured stdout of the service manager, present iff `success`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Human-readable failure reason, present iff not `success`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ControlResponse {
    /// A successful outcome carrying the captured stdout
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: Some(output.into()),
            error: None,
        }
    }

    /// A failed outcome carrying a failure description
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
        }
    }

    /// The fixed rejection for allow-list failures
    pub fn rejected() -> Self {
        Self::failure(INVALID_SERVICE_OR_ACTION)
    }
}
