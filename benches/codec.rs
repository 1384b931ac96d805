#![allow(
    missing_docs,
    clippy::missing_docs_in_private_items,
    unused_results,
    clippy::unwrap_used
)]

use criterion::{criterion_group, Criterion};
use memtro::codec::{Request, Response};
use memtro::worker;
use memtro::{Bytes, Store};

fn codec_decode_put(c: &mut Criterion) {
    let frame = Request::Put {
        key: "benchmark-key".to_owned(),
        value: Bytes::from(vec![0xab; 1024]),
    }
    .encode()
    .unwrap();

    c.bench_function("codec_decode_put", |b| {
        b.iter(|| Request::decode(frame.clone()).unwrap());
    });
}

fn codec_encode_get_response(c: &mut Criterion) {
    let response = Response::Get {
        value: Some(Bytes::from(vec![0xab; 1024])),
    };

    c.bench_function("codec_encode_get_response", |b| {
        b.iter(|| response.encode().unwrap());
    });
}

fn worker_handle_get(c: &mut Criterion) {
    let store = Store::new();
    store.put("foo".to_owned(), Bytes::from_static(b"bar"));
    let frame = Request::Get {
        key: "foo".to_owned(),
    }
    .encode()
    .unwrap();

    c.bench_function("worker_handle_get", |b| {
        b.iter(|| worker::handle(&store, frame.clone()).unwrap());
    });
}

criterion_group!(
    codec,
    codec_decode_put,
    codec_encode_get_response,
    worker_handle_get
);
