//! CLI argument parsing untuk relay dan watcher binaries

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser};

use crate::config::{RelayConfig, SessionConfig, DEFAULT_SOCKET_DIR};
use crate::protocol::LOOPBACK_HOST;

#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Rendezvous directory holding all endpoints
    #[arg(short = 'd', long, env = "WATCHRELAY_DIR", default_value = DEFAULT_SOCKET_DIR)]
    pub socket_dir: PathBuf,

    /// Verbose output (debug logging)
    #[arg(short, long)]
    pub verbose: bool,
}

impl CommonArgs {
    pub fn log_level(&self) -> log::LevelFilter {
        if self.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        }
    }
}

/// Relay server options
#[derive(Parser, Debug)]
#[command(name = "watchrelay_server")]
#[command(author, version, about = "Relay resource status between watcher services", long_about = None)]
pub struct RelayCli {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Log relay statistics every N seconds (0 disables)
    #[arg(long, env = "WATCHRELAY_STATS_SECS", default_value_t = 30)]
    pub stats_secs: u64,
}

impl RelayCli {
    pub fn config(&self) -> RelayConfig {
        RelayConfig::default()
            .with_socket_dir(&self.common.socket_dir)
            .with_stats_interval(Duration::from_secs(self.stats_secs))
    }
}

/// Watcher options
#[derive(Parser, Debug)]
#[command(author, version, long_about = None)]
pub struct WatcherCli {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Seconds between periodic queries
    #[arg(long, env = "WATCHRELAY_QUERY_SECS", default_value_t = 5)]
    pub query_secs: u64,

    /// Upper bound in seconds for one blocking wait
    #[arg(long, env = "WATCHRELAY_WAIT_SECS", default_value_t = 10)]
    pub wait_secs: u64,

    /// Host text carried in the announcement
    #[arg(long, env = "WATCHRELAY_HOST", default_value = LOOPBACK_HOST)]
    pub host: String,

    /// Mount point measured by the resource watcher
    #[arg(long, env = "WATCHRELAY_MOUNT", default_value = "/")]
    pub mount: PathBuf,
}

impl WatcherCli {
    pub fn config(&self) -> SessionConfig {
        SessionConfig::default()
            .with_socket_dir(&self.common.socket_dir)
            .with_host_address(self.host.as_str())
            .with_query_interval(Duration::from_secs(self.query_secs.max(1)))
            .with_wait_timeout(Duration::from_secs(self.wait_secs.max(1)))
    }
}

/// Inisialisasi env_logger; RUST_LOG tetap menang
pub fn setup_logging(level: log::LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}
