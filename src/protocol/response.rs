//! Response definitions
//!
//! Represents the single response sent back per connection.

use serde::{Deserialize, Serialize};

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Success,
    NotFound,
    Error,
}

/// A response to send to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Value for a successful GET, or an error message for ERROR
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub value: Option<String>,
}

impl Response {
    /// Create a SUCCESS response with optional value
    pub fn success(value: Option<String>) -> Self {
        Self {
            status: Status::Success,
            value,
        }
    }

    /// Create a NOT_FOUND response
    pub fn not_found() -> Self {
        Self {
            status: Status::NotFound,
            value: None,
        }
    }

    /// Create an ERROR response
    pub fn error(message: &str) -> Self {
        Self {
            status: Status::Error,
            value: Some(message.to_string()),
        }
    }
}
