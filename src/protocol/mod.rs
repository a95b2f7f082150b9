//! Protocol Module
//!
//! Defines the wire protocol for client-server communication. Both sides
//! use the identical serialization scheme: a type-tagged JSON message in a
//! length-prefixed frame, mirroring the self-describing encoding of the
//! log itself. It is not negotiated.
//!
//! ## Frame Format
//! ```text
//! ┌──────────┬─────────────────────────────┐
//! │ Len (4)  │       JSON message          │
//! └──────────┴─────────────────────────────┘
//! ```
//!
//! ## Messages
//! - Request:  `{"type": "GET"|"SET"|"REMOVE", "key": ..., "value"?: ...}`
//! - Response: `{"status": "SUCCESS"|"NOT_FOUND"|"ERROR", "value"?: ...}`
//!
//! One request per connection: the server reads a single request, writes a
//! single response, and the connection closes.

mod request;
mod response;
mod codec;

pub use request::Request;
pub use response::{Response, Status};
pub use codec::{read_request, read_response, write_request, write_response, MAX_FRAME_SIZE};
