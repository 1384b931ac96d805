//! The request loop run by every thread of the pool.

use crate::codec::{Request, Response};
use crate::error::{Error, TransportError};
use crate::store::Store;
use crate::tracing_shim::{debug, trace, warn};
use crate::transport::Endpoint;
use prost::bytes::Bytes;
use std::sync::Arc;

/// Serves frames from a shared [`Endpoint`] against a shared [`Store`].
#[derive(Debug)]
pub struct Worker {
    id: usize,
    store: Arc<Store>,
    endpoint: Arc<Endpoint>,
}

impl Worker {
    /// Create worker number `id` of a pool.
    #[inline]
    pub const fn new(id: usize, store: Arc<Store>, endpoint: Arc<Endpoint>) -> Self {
        Self {
            id,
            store,
            endpoint,
        }
    }

    /// The position of this worker within its pool.
    #[inline]
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Receive, handle, and reply to frames until the endpoint is closed.
    ///
    /// A frame that cannot be decoded or answered is dropped without a reply; it never stops the
    /// loop. While the endpoint is open this does not return.
    pub fn run(&self) {
        debug!(worker = self.id, "worker started");

        loop {
            let frame = match self.endpoint.recv() {
                Ok(frame) => frame,
                Err(TransportError::Closed) => break,
                Err(err) => {
                    warn!(worker = self.id, %err, "failed to receive frame");
                    continue;
                }
            };
            let (payload, reply_to) = frame.into_parts();

            let reply = match handle(&self.store, payload) {
                Ok(reply) => reply,
                Err(err) => {
                    warn!(worker = self.id, peer = %reply_to.peer(), %err, "dropping frame");
                    continue;
                }
            };
            if let Err(err) = reply_to.send(reply) {
                debug!(worker = self.id, peer = %reply_to.peer(), %err, "reply not delivered");
            }
        }

        debug!(worker = self.id, "endpoint closed; worker stopping");
    }
}

/// Decode `frame`, apply it to `store`, and encode the reply.
pub fn handle(store: &Store, frame: Bytes) -> Result<Bytes, Error> {
    let request = Request::decode(frame)?;
    trace!(key = request.key(), "dispatching request");
    dispatch(store, request).encode()
}

/// Apply `request` to `store`.
///
/// The key and value of a `Put` are moved into the store; nothing is copied.
pub fn dispatch(store: &Store, request: Request) -> Response {
    match request {
        Request::Get { key } => Response::Get {
            value: store.get(&key),
        },
        Request::Put { key, value } => Response::Put {
            is_new: store.put(key, value),
        },
    }
}
