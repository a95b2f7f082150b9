//! Connection Handler
//!
//! Handles a single client connection: one request, one response, done.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::Engine;
use crate::error::{EmberError, Result};
use crate::protocol::{read_request, write_response, Request, Response};

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Reference to the storage engine
    engine: Arc<Engine>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O and disables Nagle's algorithm.
    pub fn new(stream: TcpStream, engine: Arc<Engine>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            engine,
            peer_addr,
        })
    }

    /// Configure connection timeouts
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .get_ref()
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Handle the connection: read one request, send one response
    ///
    /// A client that disconnects without sending a request is not an error.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("connection established from {}", self.peer_addr);

        let request = match read_request(&mut self.reader) {
            Ok(request) => request,
            Err(EmberError::Io(ref e)) if is_disconnect(e.kind()) => {
                tracing::debug!("client {} disconnected before sending a request", self.peer_addr);
                return Ok(());
            }
            Err(e) => {
                tracing::warn!("error reading from {}: {}", self.peer_addr, e);
                let _ = self.send_response(Response::error(&e.to_string()));
                return Err(e);
            }
        };

        tracing::trace!("received request from {}: {:?}", self.peer_addr, request);

        let response = self.execute_request(request);

        if let Err(e) = self.send_response(response) {
            if let EmberError::Io(ref io_err) = e {
                if is_disconnect(io_err.kind()) {
                    tracing::debug!(
                        "client {} disconnected before the response could be sent: {}",
                        self.peer_addr,
                        e
                    );
                    return Ok(());
                }
            }
            tracing::warn!("error writing to {}: {}", self.peer_addr, e);
            return Err(e);
        }

        Ok(())
    }

    /// Execute a request against the engine and build the response
    fn execute_request(&self, request: Request) -> Response {
        match request {
            Request::Get { key } => match self.engine.get(&key) {
                Ok(Some(value)) => Response::success(Some(value)),
                Ok(None) => Response::not_found(),
                Err(e) => Response::error(&e.to_string()),
            },
            Request::Set { key, value } => match self.engine.set(&key, &value) {
                Ok(()) => Response::success(None),
                Err(e) => Response::error(&e.to_string()),
            },
            Request::Remove { key } => match self.engine.remove(&key) {
                Ok(()) => Response::success(None),
                Err(e) => Response::error(&e.to_string()),
            },
        }
    }

    /// Send a response to the client
    fn send_response(&mut self, response: Response) -> Result<()> {
        write_response(&mut self.writer, &response)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

/// Error kinds that mean the peer went away rather than a server fault
fn is_disconnect(kind: std::io::ErrorKind) -> bool {
    matches!(
        kind,
        std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::WouldBlock
            | std::io::ErrorKind::TimedOut
    )
}
