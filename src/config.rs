//! Relay and watcher configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::protocol::LOOPBACK_HOST;

/// Default rendezvous directory for all endpoints
pub const DEFAULT_SOCKET_DIR: &str = "/tmp/watchrelay";
/// Nama endpoint relay di dalam rendezvous directory
pub const RELAY_SOCKET_NAME: &str = "relay.sock";

/// Relay server configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub socket_dir: PathBuf,
    /// Upper bound for one blocking wait
    pub poll_timeout: Duration,
    /// Interval log statistik; `Duration::ZERO` mematikan
    pub stats_interval: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            socket_dir: PathBuf::from(DEFAULT_SOCKET_DIR),
            poll_timeout: Duration::from_secs(1),
            stats_interval: Duration::from_secs(30),
        }
    }
}

impl RelayConfig {
    pub fn with_socket_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.socket_dir = dir.into();
        self
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    pub fn with_stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = interval;
        self
    }

    pub fn relay_path(&self) -> PathBuf {
        relay_path(&self.socket_dir)
    }
}

/// Watcher session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub socket_dir: PathBuf,
    /// Host text sent in the announcement
    pub host_address: String,
    /// Batas atas satu blocking wait
    pub wait_timeout: Duration,
    /// Interval query periodik (hanya untuk role yang bertanya)
    pub query_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            socket_dir: PathBuf::from(DEFAULT_SOCKET_DIR),
            host_address: LOOPBACK_HOST.to_string(),
            wait_timeout: Duration::from_secs(10),
            query_interval: Duration::from_secs(5),
        }
    }
}

impl SessionConfig {
    pub fn with_socket_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.socket_dir = dir.into();
        self
    }

    /// Host text untuk announcement; dipotong ke 16 byte saat encode
    pub fn with_host_address(mut self, host: impl Into<String>) -> Self {
        self.host_address = host.into();
        self
    }

    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    pub fn with_query_interval(mut self, interval: Duration) -> Self {
        self.query_interval = interval;
        self
    }

    pub fn relay_path(&self) -> PathBuf {
        relay_path(&self.socket_dir)
    }
}

/// Path endpoint relay
pub fn relay_path(dir: &Path) -> PathBuf {
    dir.join(RELAY_SOCKET_NAME)
}

/// A client's endpoint is named after its process id
pub fn client_path(dir: &Path, pid: u32) -> PathBuf {
    dir.join(format!("{}.sock", pid))
}
