//! Watcher session: connect, announce, event loop
//!
//! State machine: `Connecting -> Announcing -> EventLoop -> Terminating`.
//! Satu thread, satu blocking wait dengan timeout terbatas. Role yang
//! bertanya juga punya timer query periodik.

use std::io;
use std::path::PathBuf;
use std::time::Instant;

use log::{debug, info, warn};
use mio::{Events, Interest, Poll, Token};
use thiserror::Error;

use super::connection::Endpoint;
use crate::config::{client_path, SessionConfig};
use crate::protocol::{decode, encode, Message, Origin, ResourceKind, ServiceRole};

const SESSION_TOKEN: Token = Token(0);
const EVENTS_CAPACITY: usize = 4;
const RECV_BUFFER_SIZE: usize = 512;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to open endpoint {path}: {source}")]
    Connect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("announcement to relay failed: {0}")]
    Announce(#[source] io::Error),
    #[error("event poll failed: {0}")]
    Poll(#[source] io::Error),
    #[error("session endpoint error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Announcing,
    EventLoop,
    Terminating,
}

/// Keputusan setelah satu putaran event loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Terminate,
}

/// Role-specific behaviour plugged into a [`Session`]
pub trait SessionHandler {
    fn role(&self) -> ServiceRole;

    /// Kind yang di-query secara periodik; `None` untuk role yang hanya menjawab
    fn periodic_query(&self) -> Option<ResourceKind> {
        None
    }

    /// Handle a relay-stamped message. A returned message goes back to the relay.
    fn on_message(&mut self, msg: &Message) -> Option<Message>;
}

/// Client session ke relay
pub struct Session {
    poll: Poll,
    events: Events,
    endpoint: Endpoint,
    relay_path: PathBuf,
    config: SessionConfig,
    pid: u32,
    state: SessionState,
    next_query: Option<Instant>,
}

impl Session {
    /// Connect memakai process id sendiri
    pub fn connect(config: SessionConfig) -> Result<Self, SessionError> {
        Self::connect_as(config, std::process::id())
    }

    /// Connect dengan identifier eksplisit. Endpoint di-bind di `<dir>/<pid>.sock`.
    pub fn connect_as(config: SessionConfig, pid: u32) -> Result<Self, SessionError> {
        let path = client_path(&config.socket_dir, pid);
        let mut endpoint = Endpoint::bind(&path).map_err(|source| SessionError::Connect {
            path: path.clone(),
            source,
        })?;

        let poll = Poll::new().map_err(SessionError::Poll)?;
        poll.registry()
            .register(&mut endpoint, SESSION_TOKEN, Interest::READABLE)?;

        Ok(Self {
            poll,
            events: Events::with_capacity(EVENTS_CAPACITY),
            endpoint,
            relay_path: config.relay_path(),
            config,
            pid,
            state: SessionState::Connecting,
            next_query: None,
        })
    }

    #[inline(always)]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[inline(always)]
    pub fn process_id(&self) -> u32 {
        self.pid
    }

    /// Kirim announcement. Gagal di sini berarti startup gagal (tidak di-retry).
    pub fn announce<H: SessionHandler>(&mut self, handler: &H) -> Result<(), SessionError> {
        self.state = SessionState::Announcing;

        let role = handler.role();
        let msg = Message::announcement(role, self.pid, &self.config.host_address);
        self.send(&msg).map_err(SessionError::Announce)?;

        info!(
            "{} announced as pid {} to {}",
            role,
            self.pid,
            self.relay_path.display()
        );

        self.state = SessionState::EventLoop;
        // First query goes out on the first turn
        self.next_query = handler.periodic_query().map(|_| Instant::now());
        Ok(())
    }

    /// Announce, then loop until the channel hangs up or the relay is gone
    pub fn run<H: SessionHandler>(&mut self, handler: &mut H) -> Result<(), SessionError> {
        self.announce(handler)?;

        let result = loop {
            match self.turn(handler) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Terminate) => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        self.state = SessionState::Terminating;
        info!("{} session pid {} terminating", handler.role(), self.pid);
        result
    }

    /// One bounded wait: fire the query timer if due, then handle inbound data.
    pub fn turn<H: SessionHandler>(&mut self, handler: &mut H) -> Result<Flow, SessionError> {
        if self.fire_query_timer(handler) == Flow::Terminate {
            return Ok(Flow::Terminate);
        }

        let timeout = match self.next_query {
            Some(due) => due
                .saturating_duration_since(Instant::now())
                .min(self.config.wait_timeout),
            None => self.config.wait_timeout,
        };

        match self.poll.poll(&mut self.events, Some(timeout)) {
            Ok(()) => {}
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => return Ok(Flow::Continue),
            Err(e) => return Err(SessionError::Poll(e)),
        }

        let mut readable = false;
        let mut hangup = false;
        for event in self.events.iter() {
            if event.token() != SESSION_TOKEN {
                continue;
            }
            readable |= event.is_readable();
            hangup |= event.is_error() || event.is_read_closed();
        }

        if readable && self.drain(handler)? == Flow::Terminate {
            return Ok(Flow::Terminate);
        }

        if hangup {
            warn!("{} endpoint hung up", handler.role());
            return Ok(Flow::Terminate);
        }
        Ok(Flow::Continue)
    }

    fn fire_query_timer<H: SessionHandler>(&mut self, handler: &H) -> Flow {
        let (Some(due), Some(kind)) = (self.next_query, handler.periodic_query()) else {
            return Flow::Continue;
        };
        if Instant::now() < due {
            return Flow::Continue;
        }
        self.next_query = Some(Instant::now() + self.config.query_interval);

        let Some(query) = Message::query(Origin::Role(handler.role()), kind) else {
            return Flow::Continue;
        };
        match self.send(&query) {
            Ok(()) => {
                debug!("{} sent {:?} query", handler.role(), kind);
                Flow::Continue
            }
            Err(e) if relay_gone(&e) => {
                warn!("{} relay endpoint is gone: {}", handler.role(), e);
                Flow::Terminate
            }
            // Query hilang itu normal; tidak di-retry
            Err(e) => {
                warn!("{} query send failed: {}", handler.role(), e);
                Flow::Continue
            }
        }
    }

    fn drain<H: SessionHandler>(&mut self, handler: &mut H) -> Result<Flow, SessionError> {
        let mut buf = [0u8; RECV_BUFFER_SIZE];

        while let Some(n) = self.endpoint.recv(&mut buf)? {
            let msg = match decode(&buf[..n]) {
                Ok(msg) => msg,
                Err(e) => {
                    warn!("{} dropping datagram: {}", handler.role(), e);
                    continue;
                }
            };

            if msg.origin != Origin::Relay {
                warn!(
                    "{} dropping message not stamped by relay: {:?}",
                    handler.role(),
                    msg.origin
                );
                continue;
            }

            if let Some(reply) = handler.on_message(&msg) {
                match self.send(&reply) {
                    Ok(()) => {}
                    Err(e) if relay_gone(&e) => {
                        warn!("{} relay endpoint is gone: {}", handler.role(), e);
                        return Ok(Flow::Terminate);
                    }
                    Err(e) => warn!("{} reply send failed: {}", handler.role(), e),
                }
            }
        }

        Ok(Flow::Continue)
    }

    #[inline]
    fn send(&self, msg: &Message) -> io::Result<()> {
        self.endpoint.send_to(&encode(msg), &self.relay_path)
    }
}

/// Relay endpoint hilang (file dihapus atau tidak ada yang bind)
fn relay_gone(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused
    )
}
