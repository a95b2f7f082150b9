//! Request definitions
//!
//! Represents the single request a client sends per connection.

use serde::{Deserialize, Serialize};

/// A client request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum Request {
    /// Get a value by key
    Get { key: String },

    /// Set a key-value pair
    Set { key: String, value: String },

    /// Remove a key
    Remove { key: String },
}

impl Request {
    /// The key this request targets
    pub fn key(&self) -> &str {
        match self {
            Request::Get { key } => key,
            Request::Set { key, .. } => key,
            Request::Remove { key } => key,
        }
    }
}
