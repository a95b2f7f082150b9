//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread, one handler thread per connection
//! - One request per connection, closed after the single reply
//! - Requests routed through the Engine; transport errors never affect
//!   engine state

mod server;
mod connection;
mod client;

pub use server::Server;
pub use connection::Connection;
pub use client::Client;
