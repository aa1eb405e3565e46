mod app;
mod codec;
mod config;
mod dump;
mod eol;
mod logging;
mod persistence;
mod scrollback;
mod session;
mod transport;
mod tui;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use app::run_tui;
use config::{Cli, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = cli.log_file.clone().or_else(persistence::default_log_file) {
        if !logging::init_global(&path) {
            eprintln!("warning: cannot write log file {}", path.display());
        }
    }

    let config = Config::load(cli)?;
    info!(endpoint = %config.endpoint, mode = config.mode.name(), "starting");

    if let Some(reason) = run_tui(config).await? {
        eprintln!("ttyterm: {}", reason);
        std::process::exit(1);
    }

    Ok(())
}
