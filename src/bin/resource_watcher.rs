//! Resource Watcher Binary (RW)
//!
//! Announce ke relay lalu jawab setiap query disk/memory dengan data
//! dari `statvfs` dan `sysconf`. Probe gagal = tidak ada jawaban.
//!
//! Usage:
//!   cargo run --release --bin resource_watcher -- --mount /

use clap::Parser;
use log::{error, info};

use watchrelay::cli::{setup_logging, WatcherCli};
use watchrelay::network::{Session, SessionError};
use watchrelay::watcher::{ResourceWatcher, SystemProbe};

fn run_watcher(cli: WatcherCli) -> Result<(), SessionError> {
    let probe = SystemProbe::new(&cli.mount);
    info!("measuring disk usage of {}", probe.mount().display());

    let mut session = Session::connect(cli.config())?;
    let mut watcher = ResourceWatcher::new(probe);
    let result = session.run(&mut watcher);

    info!(
        "answered {} queries, {} suppressed by probe errors",
        watcher.answered(),
        watcher.suppressed()
    );
    result
}

fn main() {
    let cli = WatcherCli::parse();
    setup_logging(cli.common.log_level());

    if let Err(e) = run_watcher(cli) {
        error!("resource watcher error: {}", e);
        std::process::exit(1);
    }
}
