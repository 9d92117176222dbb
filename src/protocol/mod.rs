//! Control protocol for the workerctl socket
//!
//! Requests and responses are single JSON objects, UTF-8 encoded, with no
//! length framing. [`codec`] handles the bounded read and symmetric encode;
//! [`message`] defines the two payload shapes.

mod codec;
mod message;

pub use codec::{read_request, write_response, DEFAULT_MAX_REQUEST_SIZE};
pub use message::{ControlRequest, ControlResponse, INVALID_SERVICE_OR_ACTION};
