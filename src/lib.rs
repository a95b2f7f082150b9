//! # emberkv
//!
//! An embeddable log-structured key-value store with:
//! - A single append-only log as the durable source of truth
//! - An in-memory index for O(1) lookup by byte offset
//! - Crash recovery by replaying the log (torn tails tolerated)
//! - Background compaction that bounds log growth
//! - A one-request-per-connection TCP front-end
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │              (one request per connection)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Engine                                 │
//! │          (RwLock over Index + Log, write counter)            │
//! └──────────┬───────────────────────────────┬──────────────────┘
//!            │                               │
//!            ▼                               ▼
//!     ┌─────────────┐                ┌───────────────┐
//!     │     Log     │◄───rewrite─────│   Compactor   │
//!     │ (append-only│                │ (worker thread│
//!     │    file)    │                │  + file swap) │
//!     └─────────────┘                └───────────────┘
//! ```
//!
//! Writes append a framed command to the log, then point the index at the
//! new record. Reads consult the index and read exactly that byte range.
//! Recovery replays the whole log into a fresh index. Compaction rewrites
//! the log off to the side, swaps it in atomically, and rebuilds the index.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod log;
pub mod index;
pub mod engine;
pub mod compaction;
pub mod protocol;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{EmberError, Result};
pub use config::Config;
pub use engine::Engine;
pub use log::Command;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of emberkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
