//! Disk Watcher Binary (DW)
//!
//! Announce ke relay lalu kirim query disk secara periodik.
//! Setiap laporan dicetak ke stdout.
//!
//! Usage:
//!   cargo run --release --bin disk_watcher -- --query-secs 5

use clap::Parser;
use log::error;

use watchrelay::cli::{setup_logging, WatcherCli};
use watchrelay::network::{Session, SessionError};
use watchrelay::protocol::{ResourceInfo, ResourceKind};
use watchrelay::watcher::ReportWatcher;

fn run_watcher(cli: WatcherCli) -> Result<(), SessionError> {
    let mut session = Session::connect(cli.config())?;
    let mut watcher = ReportWatcher::disk(|_: ResourceKind, info: ResourceInfo| {
        println!(
            "Disk Information (total: {} bytes, free: {} bytes)",
            info.total_bytes, info.free_bytes
        );
    });
    session.run(&mut watcher)
}

fn main() {
    let cli = WatcherCli::parse();
    setup_logging(cli.common.log_level());

    if let Err(e) = run_watcher(cli) {
        error!("disk watcher error: {}", e);
        std::process::exit(1);
    }
}
