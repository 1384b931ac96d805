//! Command-line interface for the memtro service.

use clap::Parser;

/// Serve an in-memory key-value cache on `tcp://*:PORT`.
#[derive(Debug, Parser)]
#[command(version, about)]
pub(crate) struct Args {
    /// The TCP port to listen on, on every interface.
    pub(crate) port: u16,
    /// The number of worker threads serving requests. Must be between 1 and 499.
    pub(crate) workers: usize,
}
