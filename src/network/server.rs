//! Relay server dengan event-driven I/O
//!
//! Satu thread, satu mio `Poll`. Setiap datagram diproses sampai selesai
//! (decode -> registry -> paling banyak satu send) sebelum datagram berikutnya.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Instant;

use log::{debug, info, warn};
use mio::{Events, Interest, Poll, Token};
use thiserror::Error;

use super::connection::{Endpoint, UnixTransport};
use crate::config::RelayConfig;
use crate::core::{Dispatch, Liveness, ProcessTable, Router};

const RELAY_TOKEN: Token = Token(0);
const EVENTS_CAPACITY: usize = 16;
/// Lebih besar dari MESSAGE_SIZE supaya datagram kebesaran terdeteksi
const RECV_BUFFER_SIZE: usize = 512;
/// Error receive beruntun sebelum drain menyerah sampai edge berikutnya
const MAX_RECV_ERRORS: usize = 8;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("failed to prepare socket directory {path}: {source}")]
    SocketDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to bind relay endpoint {path}: {source}")]
    Bind {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("event poll failed: {0}")]
    Poll(#[source] io::Error),
    #[error("relay endpoint error: {0}")]
    Io(#[from] io::Error),
}

/// Relay statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    pub received: u64,
    pub malformed: u64,
    pub registered: u64,
    pub registrations_ignored: u64,
    pub forwarded: u64,
    pub no_destination: u64,
    pub send_failures: u64,
    pub ignored: u64,
}

/// Relay Server
///
/// Memegang endpoint di alamat rendezvous dan router beserta registry-nya.
pub struct RelayServer<L> {
    poll: Poll,
    events: Events,
    endpoint: Endpoint,
    config: RelayConfig,
    router: Router<L>,
    stats: RelayStats,
    last_stats_log: Instant,
}

impl RelayServer<ProcessTable> {
    /// Bind relay dengan liveness dari process table OS
    pub fn bind(config: RelayConfig) -> Result<Self, RelayError> {
        Self::with_liveness(config, ProcessTable)
    }
}

impl<L: Liveness> RelayServer<L> {
    pub fn with_liveness(config: RelayConfig, liveness: L) -> Result<Self, RelayError> {
        fs::create_dir_all(&config.socket_dir).map_err(|source| RelayError::SocketDir {
            path: config.socket_dir.clone(),
            source,
        })?;

        let path = config.relay_path();
        let mut endpoint =
            Endpoint::bind(&path).map_err(|source| RelayError::Bind { path, source })?;

        let poll = Poll::new().map_err(RelayError::Poll)?;
        poll.registry()
            .register(&mut endpoint, RELAY_TOKEN, Interest::READABLE)?;

        info!("relay listening on {}", endpoint.path().display());

        Ok(Self {
            poll,
            events: Events::with_capacity(EVENTS_CAPACITY),
            endpoint,
            config,
            router: Router::new(liveness),
            stats: RelayStats::default(),
            last_stats_log: Instant::now(),
        })
    }

    pub fn local_path(&self) -> &std::path::Path {
        self.endpoint.path()
    }

    pub fn stats(&self) -> RelayStats {
        self.stats
    }

    pub fn router(&self) -> &Router<L> {
        &self.router
    }

    /// Run relay event loop sampai terjadi error fatal
    pub fn run(&mut self) -> Result<(), RelayError> {
        loop {
            self.turn()?;
        }
    }

    /// One bounded wait plus processing of everything that arrived.
    ///
    /// Returns the number of datagrams handled.
    pub fn turn(&mut self) -> Result<usize, RelayError> {
        match self
            .poll
            .poll(&mut self.events, Some(self.config.poll_timeout))
        {
            Ok(()) => {}
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => return Ok(0),
            Err(e) => return Err(RelayError::Poll(e)),
        }

        let mut readable = false;
        for event in self.events.iter() {
            if event.token() != RELAY_TOKEN {
                continue;
            }
            if event.is_error() {
                warn!("relay endpoint reported an error event");
            }
            readable |= event.is_readable();
        }

        let handled = if readable { self.drain() } else { 0 };

        self.maybe_log_stats();
        Ok(handled)
    }

    /// Baca semua datagram sampai WouldBlock (mio edge-triggered)
    fn drain(&mut self) -> usize {
        let mut buf = [0u8; RECV_BUFFER_SIZE];
        let mut handled = 0;
        let mut errors = 0;

        loop {
            let n = match self.endpoint.recv(&mut buf) {
                Ok(Some(n)) => n,
                Ok(None) => break,
                Err(e) => {
                    errors += 1;
                    warn!("relay receive failed: {}", e);
                    if recv_error_ends_drain(&e, errors) {
                        break;
                    }
                    continue;
                }
            };
            errors = 0;

            let mut transport = UnixTransport::new(&self.endpoint, &self.config.socket_dir);
            let outcome = self.router.dispatch(&buf[..n], &mut transport);
            self.record(outcome);
            handled += 1;
        }

        handled
    }

    fn record(&mut self, outcome: Dispatch) {
        self.stats.received += 1;

        match outcome {
            Dispatch::Rejected(e) => {
                self.stats.malformed += 1;
                warn!("dropping datagram: {}", e);
            }
            Dispatch::Registered {
                role,
                pid,
                accepted: true,
            } => {
                self.stats.registered += 1;
                info!("{} registered with pid {}", role, pid);
            }
            Dispatch::Registered {
                role,
                pid,
                accepted: false,
            } => {
                self.stats.registrations_ignored += 1;
                info!(
                    "{} announcement from pid {} ignored, slot held by live pid {:?}",
                    role,
                    pid,
                    self.router.registry().peek(role)
                );
            }
            Dispatch::Forwarded(fwd) => {
                self.stats.forwarded += 1;
                debug!(
                    "forwarded {:?} to {} (pid {})",
                    fwd.message.resource_kind(),
                    fwd.role,
                    fwd.pid
                );
            }
            Dispatch::NoDestination(role) => {
                self.stats.no_destination += 1;
                debug!("no live {} registered, message dropped", role);
            }
            Dispatch::SendFailed { role, pid, error } => {
                self.stats.send_failures += 1;
                warn!("send to {} (pid {}) failed: {}; slot cleared", role, pid, error);
            }
            Dispatch::Ignored => {
                self.stats.ignored += 1;
            }
        }
    }

    fn maybe_log_stats(&mut self) {
        if self.config.stats_interval.is_zero()
            || self.last_stats_log.elapsed() < self.config.stats_interval
        {
            return;
        }
        self.last_stats_log = Instant::now();

        let s = &self.stats;
        info!(
            "stats: received={} forwarded={} registered={} ignored_announcements={} \
             no_destination={} send_failures={} malformed={} discarded={}",
            s.received,
            s.forwarded,
            s.registered,
            s.registrations_ignored,
            s.no_destination,
            s.send_failures,
            s.malformed,
            s.ignored
        );
    }
}

/// Error sekali (EINTR, pending socket error) tidak menghentikan drain;
/// error yang terus berulang dianggap persisten.
fn recv_error_ends_drain(e: &io::Error, consecutive: usize) -> bool {
    e.kind() != io::ErrorKind::Interrupted && consecutive >= MAX_RECV_ERRORS
}
