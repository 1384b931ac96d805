#![allow(
    missing_docs,
    clippy::missing_docs_in_private_items,
    unused_results,
    clippy::unwrap_used
)]

mod codec;
mod service;

use criterion::Criterion;
use tracing_subscriber::filter::EnvFilter;

fn main() {
    // Silent unless `RUST_LOG` says otherwise.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    store::store();
    codec::codec();
    service::service();

    Criterion::default().configure_from_args().final_summary();
}
