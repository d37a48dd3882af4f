//! Network Layer: Unix Datagram Transport
//!
//! Menggunakan mio untuk blocking wait dengan timeout terbatas.
//!
//! Fitur:
//! - Endpoint per process, dialamatkan lewat process id
//! - Relay server: satu datagram diproses sampai selesai
//! - Watcher session: announce + event loop + timer query

mod connection;
mod server;
mod session;

pub use connection::{Endpoint, UnixTransport};
pub use server::{RelayError, RelayServer, RelayStats};
pub use session::{Flow, Session, SessionError, SessionHandler, SessionState};
