//! Protobuf messages exchanged between clients and the service.
//!
//! These are declared directly with `prost` derives rather than generated at build time. Field
//! presence follows proto2 semantics: required fields are `Option`s so that a frame omitting them
//! can be rejected instead of silently defaulting.

#![allow(missing_docs, clippy::missing_docs_in_private_items)]

use prost::bytes::Bytes;

/// Look up the value stored for `key`.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct Get {
    #[prost(string, optional, tag = "1")]
    pub key: Option<String>,
}

/// Store `value` under `key` unless the key already has a value.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct Put {
    #[prost(string, optional, tag = "1")]
    pub key: Option<String>,
    #[prost(bytes = "bytes", optional, tag = "2")]
    pub value: Option<Bytes>,
}

/// The envelope every inbound frame carries. Exactly one of `get` and `put` must be set.
///
/// Not a `oneof`: a frame setting both fields decodes with both present, and
/// [`codec::Request`](crate::codec::Request) rejects it.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct Request {
    #[prost(message, optional, tag = "1")]
    pub get: Option<Get>,
    #[prost(message, optional, tag = "2")]
    pub put: Option<Put>,
}

/// Reply to a [`Get`]. `value` is present if and only if `has_value` is set.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct GetResponse {
    #[prost(bool, tag = "1")]
    pub has_value: bool,
    #[prost(bytes = "bytes", optional, tag = "2")]
    pub value: Option<Bytes>,
}

/// Reply to a [`Put`]. `is_new` is set when this request created the entry.
#[derive(Clone, Copy, PartialEq, Eq, prost::Message)]
pub struct PutResponse {
    #[prost(bool, tag = "1")]
    pub is_new: bool,
}
