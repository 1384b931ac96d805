//! Command-line interface for the memtro load generator.

use clap::Parser;
use std::net::IpAddr;

/// Measure `Get` throughput and latency of a running memtro service.
#[derive(Debug, Parser)]
#[command(version, about)]
pub(crate) struct Args {
    /// The port the service listens on.
    pub(crate) port: u16,
    /// The number of concurrent connections. Must be between 1 and 499.
    pub(crate) workers: usize,
    /// The number of requests each connection sends.
    pub(crate) requests: usize,
    /// The address of the service.
    #[arg(long, default_value = "127.0.0.1")]
    pub(crate) host: IpAddr,
    /// The key every request looks up.
    #[arg(long, default_value = "foo")]
    pub(crate) key: String,
}
