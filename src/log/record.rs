//! Record definitions
//!
//! Defines the command stored in each log record and its on-disk position.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Size of the big-endian length prefix preceding each record payload
pub const LEN_PREFIX_SIZE: usize = 4;

/// Cosmetic terminator appended to every payload (included in the length)
const RECORD_TERMINATOR: &[u8] = b"\r\n";

/// A write intent recorded in the log
///
/// Serialized as a type-tagged JSON object, e.g.
/// `{"type":"set","key":"a","value":"1"}` or `{"type":"remove","key":"b"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Command {
    /// Set a key to a value
    Set { key: String, value: String },

    /// Remove a key (tombstone)
    Remove { key: String },
}

impl Command {
    /// The key this command applies to
    pub fn key(&self) -> &str {
        match self {
            Command::Set { key, .. } => key,
            Command::Remove { key } => key,
        }
    }

    /// Encode to the on-disk payload: JSON followed by CR LF
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec(self)?;
        bytes.extend_from_slice(RECORD_TERMINATOR);
        Ok(bytes)
    }

    /// Decode from an on-disk payload
    ///
    /// Trailing whitespace and control bytes after the JSON object are
    /// tolerated and ignored.
    pub fn decode(bytes: &[u8]) -> Result<Command> {
        let mut end = bytes.len();
        while end > 0 && (bytes[end - 1].is_ascii_whitespace() || bytes[end - 1].is_ascii_control())
        {
            end -= 1;
        }
        Ok(serde_json::from_slice(&bytes[..end])?)
    }
}

/// On-disk position of a record's payload: `pos` is the file offset
/// immediately after the length prefix, `len` the payload length
/// (terminator included)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordPos {
    pub pos: u64,
    pub len: u32,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_appends_terminator() {
        let cmd = Command::Set {
            key: "a".to_string(),
            value: "1".to_string(),
        };
        let bytes = cmd.encode().unwrap();
        assert!(bytes.ends_with(b"\r\n"));
    }

    #[test]
    fn encode_is_type_tagged_json() {
        let cmd = Command::Remove {
            key: "gone".to_string(),
        };
        let bytes = cmd.encode().unwrap();
        let text = std::str::from_utf8(&bytes).unwrap();
        assert!(text.contains("\"type\":\"remove\""));
        assert!(text.contains("\"key\":\"gone\""));
    }

    #[test]
    fn decode_round_trips() {
        let cmd = Command::Set {
            key: "k".to_string(),
            value: "v".to_string(),
        };
        let decoded = Command::decode(&cmd.encode().unwrap()).unwrap();
        assert_eq!(decoded, cmd);
    }

    #[test]
    fn decode_tolerates_trailing_junk() {
        let mut bytes = serde_json::to_vec(&Command::Remove {
            key: "k".to_string(),
        })
        .unwrap();
        bytes.extend_from_slice(b"\r\n \t\0\0");

        let decoded = Command::decode(&bytes).unwrap();
        assert_eq!(
            decoded,
            Command::Remove {
                key: "k".to_string()
            }
        );
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(Command::decode(b"not json at all\r\n").is_err());
    }
}
