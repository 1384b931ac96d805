#![allow(
    missing_docs,
    clippy::missing_docs_in_private_items,
    unused_results,
    clippy::unwrap_used
)]

use criterion::{criterion_group, Criterion};
use memtro::{transitive, Bytes};
use rand::distributions::{Alphanumeric, DistString};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

fn create_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .unwrap()
}

fn service_get(c: &mut Criterion) {
    let runtime = create_runtime();
    let client = runtime.block_on(async {
        let mut client = transitive::client(4).await.unwrap();
        client.put("foo", Bytes::from_static(b"bar")).await.unwrap();
        Arc::new(Mutex::new(client))
    });

    c.bench_function("service_get", |b| {
        b.to_async(&runtime).iter_custom(|iters| {
            let client = Arc::clone(&client);
            async move {
                let mut client = client.lock().await;
                let start = Instant::now();
                for _ in 0..iters {
                    client.get("foo").await.unwrap();
                }
                start.elapsed()
            }
        });
    });
}

fn service_put(c: &mut Criterion) {
    let runtime = create_runtime();
    let client = Arc::new(Mutex::new(runtime.block_on(transitive::client(4)).unwrap()));
    let mut rng = rand::thread_rng();

    c.bench_function("service_put", |b| {
        b.to_async(&runtime).iter_custom(|iters| {
            let client = Arc::clone(&client);
            let keys = (0..iters)
                .map(|_| Alphanumeric.sample_string(&mut rng, 20))
                .collect::<Vec<_>>();
            async move {
                let mut client = client.lock().await;
                let start = Instant::now();
                for key in keys {
                    client.put(key, Bytes::from_static(b"value")).await.unwrap();
                }
                start.elapsed()
            }
        });
    });
}

criterion_group!(service, service_get, service_put);
