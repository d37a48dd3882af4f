//! watchrelay Server Binary
//!
//! Relay perantara antara disk watcher, memory watcher dan resource watcher:
//! - Registry satu slot per role, holder hidup pertama menang
//! - Query diteruskan ke resource watcher tanpa data
//! - Jawaban diteruskan ke peminta apa adanya
//!
//! Usage:
//!   cargo run --release --bin watchrelay_server -- [OPTIONS]

use clap::Parser;
use log::{error, info};

use watchrelay::cli::{setup_logging, RelayCli};
use watchrelay::network::{RelayError, RelayServer};

fn run_server(cli: RelayCli) -> Result<(), RelayError> {
    let config = cli.config();
    info!(
        "watchrelay server starting (dir: {}, stats every {:?})",
        config.socket_dir.display(),
        config.stats_interval
    );

    let mut server = RelayServer::bind(config)?;
    server.run()
}

fn main() {
    let cli = RelayCli::parse();
    setup_logging(cli.common.log_level());

    if let Err(e) = run_server(cli) {
        error!("relay error: {}", e);
        std::process::exit(1);
    }
}
