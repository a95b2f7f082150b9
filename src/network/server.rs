//! TCP Server
//!
//! Accepts connections and hands each one to its own handler thread.

use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::Config;
use crate::engine::Engine;
use crate::error::Result;
use crate::network::Connection;

/// How often the accept loop checks the shutdown flag
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// TCP server for emberkv
///
/// One handler thread per connection, capped by `max_connections`;
/// connections above the cap are dropped with a warning.
pub struct Server {
    config: Config,
    engine: Arc<Engine>,
    listener: TcpListener,
    shutdown: AtomicBool,
    active: Arc<AtomicUsize>,
}

impl Server {
    /// Bind the listen address and prepare the server
    pub fn bind(config: Config, engine: Arc<Engine>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr)?;
        tracing::info!("listening on {}", listener.local_addr()?);

        Ok(Self {
            config,
            engine,
            listener,
            shutdown: AtomicBool::new(false),
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Address the server is actually bound to (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the accept loop (blocking) until `shutdown` is called
    pub fn run(&self) -> Result<()> {
        // Non-blocking accept so the shutdown flag is observed promptly.
        self.listener.set_nonblocking(true)?;

        while !self.shutdown.load(Ordering::Relaxed) {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    if self.active.load(Ordering::Relaxed) >= self.config.max_connections {
                        tracing::warn!("connection limit reached, refusing {}", addr);
                        drop(stream);
                        continue;
                    }

                    // The stream inherits non-blocking from the listener on
                    // some platforms; handlers want blocking I/O.
                    if let Err(e) = stream.set_nonblocking(false) {
                        tracing::warn!("failed to configure stream for {}: {}", addr, e);
                        continue;
                    }

                    let engine = Arc::clone(&self.engine);
                    let active = Arc::clone(&self.active);
                    let read_ms = self.config.read_timeout_ms;
                    let write_ms = self.config.write_timeout_ms;

                    active.fetch_add(1, Ordering::Relaxed);
                    thread::spawn(move || {
                        let result = Connection::new(stream, engine).and_then(|mut conn| {
                            conn.set_timeouts(read_ms, write_ms)?;
                            conn.handle()
                        });
                        if let Err(e) = result {
                            tracing::warn!("connection from {} failed: {}", addr, e);
                        }
                        active.fetch_sub(1, Ordering::Relaxed);
                    });
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    tracing::warn!("accept failed: {}", e);
                }
            }
        }

        tracing::info!("accept loop stopped");
        Ok(())
    }

    /// Signal the server to stop accepting connections
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Number of currently active connections
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }
}
