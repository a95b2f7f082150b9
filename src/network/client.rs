//! Blocking client
//!
//! Opens a fresh connection per call, mirroring the server's
//! one-request-per-connection contract.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::time::Duration;

use crate::error::{EmberError, Result};
use crate::protocol::{read_response, write_request, Request, Response, Status};

/// A blocking client for the emberkv wire protocol
#[derive(Debug, Clone)]
pub struct Client {
    addr: String,
    timeout: Option<Duration>,
}

impl Client {
    /// Create a client for the given server address
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            timeout: Some(Duration::from_secs(5)),
        }
    }

    /// Override the per-call read/write timeout (`None` blocks forever)
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get a value by key; `Ok(None)` when the key is absent
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let response = self.call(Request::Get {
            key: key.to_string(),
        })?;
        match response.status {
            Status::Success => Ok(response.value),
            Status::NotFound => Ok(None),
            Status::Error => Err(remote_error(response)),
        }
    }

    /// Set a key-value pair
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let response = self.call(Request::Set {
            key: key.to_string(),
            value: value.to_string(),
        })?;
        match response.status {
            Status::Success => Ok(()),
            _ => Err(remote_error(response)),
        }
    }

    /// Remove a key
    pub fn remove(&self, key: &str) -> Result<()> {
        let response = self.call(Request::Remove {
            key: key.to_string(),
        })?;
        match response.status {
            Status::Success => Ok(()),
            _ => Err(remote_error(response)),
        }
    }

    /// Send one request on a fresh connection and read the single reply
    fn call(&self, request: Request) -> Result<Response> {
        let stream = TcpStream::connect(&self.addr)?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(self.timeout)?;
        stream.set_write_timeout(self.timeout)?;

        let mut writer = BufWriter::new(stream.try_clone()?);
        let mut reader = BufReader::new(stream);

        write_request(&mut writer, &request)?;
        read_response(&mut reader)
    }
}

fn remote_error(response: Response) -> EmberError {
    EmberError::Protocol(
        response
            .value
            .unwrap_or_else(|| "server returned an error".to_string()),
    )
}
