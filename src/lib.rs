//! An in-memory key-value cache served by a fixed pool of worker threads.
//!
//! Clients send protobuf-encoded [`Get`](codec::Request::Get) and [`Put`](codec::Request::Put)
//! requests as length-prefixed frames over TCP. Values are opaque bytes keyed by strings, and a
//! key's first value is kept for the lifetime of the process: a later `Put` for the same key is
//! reported as not new and changes nothing.
//!
//! ```no_run
//! use memtro::{Config, Location, Supervisor};
//!
//! let config = Config::new(Location::any(5555), 8)?;
//! let supervisor = Supervisor::start(config)?;
//! // Only returns if a worker stops, which is always an error.
//! return Err(supervisor.wait().into());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod tracing_shim;

pub mod codec;
pub mod error;
pub mod latency;
mod location;
pub mod proto;
pub mod store;
pub mod supervisor;
pub mod transitive;
pub mod transport;
pub mod worker;

pub use self::error::{Error, ErrorKind, Result};
pub use self::location::Location;
pub use self::store::Store;
pub use self::supervisor::{Config, Supervisor};
pub use prost::bytes::Bytes;
