//! The memtro service.
//!
//! For usage, run `cargo run -- --help`.

mod cli;

use crate::cli::Args;
use clap::error::ErrorKind;
use clap::Parser as _;
use memtro::{Config, Location, Supervisor};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let Args { port, workers } = match Args::try_parse() {
        Ok(args) => args,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            // Usage errors exit with 1 rather than clap's default of 2.
            let _printed = err.print();
            return ExitCode::FAILURE;
        }
    };

    let config = match Config::new(Location::any(port), workers) {
        Ok(config) => config,
        Err(err) => {
            error!(%err, "startup failed");
            return ExitCode::FAILURE;
        }
    };

    let supervisor = match Supervisor::start(config) {
        Ok(supervisor) => supervisor,
        Err(err) => {
            error!(%err, "startup failed");
            return ExitCode::FAILURE;
        }
    };
    info!(local_addr = %supervisor.local_addr(), "serving");

    let err = supervisor.wait();
    error!(%err, kind = ?err.kind(), "shutting down");
    ExitCode::FAILURE
}
