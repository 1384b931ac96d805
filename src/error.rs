//! Errors produced by the service, its transport, and its wire codec.

use crate::Location;
use std::collections::TryReserveError;
use std::io;
use thiserror::Error;

/// Convenient result alias for fallible memtro operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Any error memtro can report.
#[derive(Debug, Error)]
pub enum Error {
    /// The service was configured with invalid parameters.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// The listening endpoint could not be bound.
    #[error("failed to bind {location}: {source}")]
    Bind {
        /// Where the endpoint was supposed to listen.
        location: Location,
        /// Why binding failed.
        #[source]
        source: io::Error,
    },
    /// An inbound frame could not be decoded.
    #[error("malformed frame: {0}")]
    Decode(#[from] DecodeError),
    /// Memory for an outbound frame could not be reserved.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(#[from] TryReserveError),
    /// The encoder ran out of buffer space.
    #[error("failed to encode frame: {0}")]
    Encode(#[from] prost::EncodeError),
    /// A frame could not be moved through the transport.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// A socket operation failed.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// A worker stopped while the service was expected to run forever.
    #[error("worker {worker} terminated unexpectedly{}", panic_suffix(.panicked))]
    WorkerTerminated {
        /// Index of the worker within the pool.
        worker: usize,
        /// Whether the worker unwound from a panic.
        panicked: bool,
    },
}

/// Invalid service configuration. Always detected before anything is bound.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The number of workers is outside of `1..500`.
    #[error("worker count must be between 1 and 499, got {0}")]
    WorkerCount(usize),
    /// An endpoint string could not be parsed.
    #[error("invalid endpoint `{0}`, expected `tcp://*:<port>` or `tcp://<ip>:<port>`")]
    Location(String),
}

/// An inbound frame that does not hold a well-formed message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The bytes are not valid protobuf for the expected message.
    #[error(transparent)]
    Protobuf(#[from] prost::DecodeError),
    /// A required field was absent.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    /// Both `get` and `put` were set on one request.
    #[error("request carries both `get` and `put`")]
    AmbiguousOperation,
    /// `has_value` disagrees with the presence of `value`.
    #[error("`has_value` is {has_value} but `value` is {}", value_presence(.has_value))]
    InconsistentValue {
        /// The flag as it was received.
        has_value: bool,
    },
}

/// Failures moving frames through the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The endpoint has been closed; no further frames will arrive.
    #[error("endpoint closed")]
    Closed,
    /// No frame arrived within the requested time.
    #[error("timed out waiting for a frame")]
    TimedOut,
    /// The connection a reply was addressed to has gone away.
    #[error("peer disconnected")]
    PeerGone,
    /// A frame exceeded [`MAX_FRAME_LEN`](crate::transport::MAX_FRAME_LEN).
    #[error("frame of {0} bytes exceeds the maximum frame length")]
    FrameTooLarge(usize),
}

/// Suffix noting that a worker unwound rather than returned.
const fn panic_suffix(panicked: &bool) -> &'static str {
    if *panicked {
        " (panicked)"
    } else {
        ""
    }
}

/// What `value` must have looked like for `has_value` to be inconsistent.
const fn value_presence(has_value: &bool) -> &'static str {
    if *has_value {
        "absent"
    } else {
        "present"
    }
}

/// Broad classification of an [`Error`], mirroring how the service reacts to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad parameters. Fatal at startup.
    Config,
    /// The endpoint is unavailable. Fatal at startup.
    Bind,
    /// A malformed frame. The frame is dropped.
    Decode,
    /// Allocation failed while producing a reply. The reply is dropped.
    ResourceExhausted,
    /// A connection-level failure. Only that connection is affected.
    Transport,
    /// A worker stopped. Fatal.
    WorkerTerminated,
}

impl ErrorKind {
    /// Whether the process must stop when this kind of error occurs.
    #[inline]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::Config | Self::Bind | Self::WorkerTerminated)
    }
}

impl Error {
    /// How the service classifies this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::Bind { .. } => ErrorKind::Bind,
            Self::Decode(_) => ErrorKind::Decode,
            Self::ResourceExhausted(_) | Self::Encode(_) => ErrorKind::ResourceExhausted,
            Self::Transport(_) | Self::Io(_) => ErrorKind::Transport,
            Self::WorkerTerminated { .. } => ErrorKind::WorkerTerminated,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_only_startup_and_supervision_errors_are_fatal() {
        let fatal = [
            Error::from(ConfigError::WorkerCount(0)),
            Error::Bind {
                location: Location::any(0),
                source: io::Error::from(io::ErrorKind::AddrInUse),
            },
            Error::WorkerTerminated {
                worker: 3,
                panicked: false,
            },
        ];
        let recoverable = [
            Error::from(DecodeError::MissingField("key")),
            Error::from(TransportError::PeerGone),
            Error::from(io::Error::from(io::ErrorKind::BrokenPipe)),
        ];

        assert!(fatal.iter().all(|err| err.kind().is_fatal()));
        assert!(recoverable.iter().all(|err| !err.kind().is_fatal()));
    }

    #[test]
    fn test_worker_termination_mentions_panics() {
        let err = Error::WorkerTerminated {
            worker: 7,
            panicked: true,
        };
        assert_eq!(err.to_string(), "worker 7 terminated unexpectedly (panicked)");
    }
}
