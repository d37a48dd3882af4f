//! Memory Watcher Binary (MW)
//!
//! Announce ke relay lalu kirim query memory secara periodik.
//! Setiap laporan dicetak ke stdout.
//!
//! Usage:
//!   cargo run --release --bin memory_watcher -- --query-secs 5

use clap::Parser;
use log::error;

use watchrelay::cli::{setup_logging, WatcherCli};
use watchrelay::network::{Session, SessionError};
use watchrelay::protocol::{ResourceInfo, ResourceKind};
use watchrelay::watcher::ReportWatcher;

fn run_watcher(cli: WatcherCli) -> Result<(), SessionError> {
    let mut session = Session::connect(cli.config())?;
    let mut watcher = ReportWatcher::memory(|_: ResourceKind, info: ResourceInfo| {
        println!(
            "Memory Information (total: {} bytes, free: {} bytes)",
            info.total_bytes, info.free_bytes
        );
    });
    session.run(&mut watcher)
}

fn main() {
    let cli = WatcherCli::parse();
    setup_logging(cli.common.log_level());

    if let Err(e) = run_watcher(cli) {
        error!("memory watcher error: {}", e);
        std::process::exit(1);
    }
}
