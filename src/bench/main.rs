//! A load generator for a running memtro service.
//!
//! Every connection pipelines all of its `Get` requests for a single key before reading any reply,
//! so a request's measured latency includes the time it spent queued behind earlier ones. All
//! replies to these requests are identical, so they are matched to requests in arrival order.

mod cli;

use crate::cli::Args;
use clap::error::ErrorKind;
use clap::Parser as _;
use futures::future;
use memtro::codec::Request;
use memtro::latency::LatencyReport;
use memtro::supervisor::WORKER_COUNT;
use memtro::transport::Client;
use memtro::{Bytes, Error, Location};
use std::io;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Barrier;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            let _printed = err.print();
            return ExitCode::FAILURE;
        }
    };
    if !WORKER_COUNT.contains(&args.workers) {
        error!(workers = args.workers, "worker count must be between 1 and 499");
        return ExitCode::FAILURE;
    }
    if total_requests(args.workers, args.requests).is_none() {
        error!(
            workers = args.workers,
            requests = args.requests,
            "total request count overflows"
        );
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(%err, "failed to start runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(args)) {
        Ok(Some(report)) => {
            #[allow(clippy::print_stdout)]
            {
                print!("{report}");
            }
            ExitCode::SUCCESS
        }
        Ok(None) => {
            info!("no requests were sent");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(%err, "benchmark failed");
            ExitCode::FAILURE
        }
    }
}

/// Connect every worker, fire the starter pistol, and summarize the results.
async fn run(
    Args {
        port,
        workers,
        requests,
        host,
        key,
    }: Args,
) -> Result<Option<LatencyReport>, Error> {
    let location = Location::from(SocketAddr::new(host, port));
    let frame = Request::Get { key }.encode()?;

    // Connect up front so that a failed connection cannot leave the others waiting forever.
    let clients = future::try_join_all((0..workers).map(|_| Client::connect(&location))).await?;

    // The extra party is this task, which starts the clock as the workers are released.
    let starter_pistol = Arc::new(Barrier::new(workers + 1));
    let tasks = clients
        .into_iter()
        .map(|client| {
            tokio::spawn(measure(
                client,
                frame.clone(),
                requests,
                Arc::clone(&starter_pistol),
            ))
        })
        .collect::<Vec<_>>();

    info!(%location, "all {workers} workers benchmarking");
    let _leader = starter_pistol.wait().await;
    let start = Instant::now();

    let mut samples = Vec::new();
    samples.try_reserve_exact(workers.saturating_mul(requests))?;
    for (id, task) in tasks.into_iter().enumerate() {
        let worker_samples = task.await.map_err(io::Error::other)??;
        debug!(worker = id, "worker finished");
        samples.extend(worker_samples);
    }

    Ok(LatencyReport::new(samples, start.elapsed()))
}

/// The number of requests sent across every connection, if it can be counted at all.
const fn total_requests(workers: usize, requests: usize) -> Option<usize> {
    workers.checked_mul(requests)
}

/// Pipeline `requests` copies of `frame` once the pistol fires, then time each reply.
async fn measure(
    mut client: Client,
    frame: Bytes,
    requests: usize,
    starter_pistol: Arc<Barrier>,
) -> Result<Vec<Duration>, Error> {
    // Wait first: a task that fails early must still release the others from the barrier.
    let _leader = starter_pistol.wait().await;
    let mut sent = Vec::new();
    sent.try_reserve_exact(requests)?;

    for _ in 0..requests {
        sent.push(Instant::now());
        client.send(&frame).await?;
    }

    let mut samples = Vec::new();
    samples.try_reserve_exact(requests)?;
    for sent_at in sent {
        let _reply = client.recv().await?;
        samples.push(sent_at.elapsed());
    }
    Ok(samples)
}
