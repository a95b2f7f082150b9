//! Append-only Log Module
//!
//! The durability substrate: a single file of framed, serialized commands.
//!
//! ## Responsibilities
//! - Frame and encode commands (length prefix + self-describing payload)
//! - Append records and serve positioned reads
//! - Replay the whole log for index recovery, tolerating torn tails
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ Record 1                                    │
//! │ ┌─────────┬─────────────────────────┬─────┐ │
//! │ │ Len (4) │ JSON command (UTF-8)    │ \r\n│ │
//! │ └─────────┴─────────────────────────┴─────┘ │
//! ├─────────────────────────────────────────────┤
//! │ Record 2                                    │
//! │ ┌─────────┬─────────────────────────┬─────┐ │
//! │ │ Len (4) │ JSON command (UTF-8)    │ \r\n│ │
//! │ └─────────┴─────────────────────────┴─────┘ │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The length is big-endian and includes the trailing CR LF. The CR LF is
//! cosmetic (it keeps the file greppable); decoders ignore trailing
//! whitespace and control bytes after the JSON payload.

mod record;
mod file;

pub use record::{Command, RecordPos, LEN_PREFIX_SIZE};
pub use file::{scan, LogFile, ReplayStats};
