//! Protocol codec
//!
//! Length-prefixed JSON frames over a blocking stream.
//!
//! ## Frame Format
//! ```text
//! ┌──────────┬─────────────────────────────┐
//! │ Len (4)  │       JSON message          │
//! └──────────┴─────────────────────────────┘
//! ```
//!
//! The length is big-endian and counts only the JSON payload.

use std::io::{Read, Write};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{EmberError, Result};

use super::{Request, Response};

/// Size of the frame length prefix
pub const FRAME_HEADER_SIZE: usize = 4;

/// Maximum frame payload size (16 MB)
pub const MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Frame I/O
// =============================================================================

/// Write one length-prefixed JSON frame
fn write_frame<W: Write, T: Serialize>(writer: &mut W, message: &T) -> Result<()> {
    let payload = serde_json::to_vec(message)?;
    if payload.len() > MAX_FRAME_SIZE as usize {
        return Err(EmberError::Protocol(format!(
            "frame too large: {} bytes (max {})",
            payload.len(),
            MAX_FRAME_SIZE
        )));
    }

    writer.write_all(&(payload.len() as u32).to_be_bytes())?;
    writer.write_all(&payload)?;
    writer.flush()?;
    Ok(())
}

/// Read one length-prefixed JSON frame
///
/// Blocks until a complete frame is received or an error occurs.
fn read_frame<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<T> {
    let mut header = [0u8; FRAME_HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = u32::from_be_bytes(header);
    if payload_len > MAX_FRAME_SIZE {
        return Err(EmberError::Protocol(format!(
            "frame too large: {} bytes (max {})",
            payload_len, MAX_FRAME_SIZE
        )));
    }

    let mut payload = vec![0u8; payload_len as usize];
    reader.read_exact(&mut payload)?;

    Ok(serde_json::from_slice(&payload)?)
}

// =============================================================================
// Request / Response helpers
// =============================================================================

/// Read a complete request from a stream
pub fn read_request<R: Read>(reader: &mut R) -> Result<Request> {
    read_frame(reader)
}

/// Write a request to a stream
pub fn write_request<W: Write>(writer: &mut W, request: &Request) -> Result<()> {
    write_frame(writer, request)
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    read_frame(reader)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    write_frame(writer, response)
}
