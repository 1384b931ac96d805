use super::{read_frame, write_frame, Frame, ReplyTo};
use crate::error::{Error, TransportError};
use crate::tracing_shim::{debug, debug_span, error, info, info_span, trace, warn, Instrument as _};
use crate::Location;
use crossbeam::channel::{self, RecvTimeoutError};
use parking_lot::Mutex;
use prost::bytes::Bytes;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncWriteExt as _, BufReader, BufWriter};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

/// Threads driving socket I/O. Request handling happens on the callers of [`Endpoint::recv`].
const IO_THREADS: usize = 2;

/// A bound listening socket whose inbound frames are shared among any number of receivers.
///
/// Socket I/O runs on a private runtime. Frames from every connection are pushed onto a single
/// unbounded queue; each frame is taken by exactly one [`recv`](Self::recv) call. The queue is the
/// only buffering between the network and the receivers, so there is no backpressure beyond what
/// TCP itself provides.
#[derive(Debug)]
pub struct Endpoint {
    location: Location,
    local_addr: SocketAddr,
    inbound: channel::Receiver<Frame>,
    runtime: Mutex<Option<Runtime>>,
}

impl Endpoint {
    /// Bind `location` and start accepting connections.
    ///
    /// The socket is bound before this returns, so an unavailable address is reported here as
    /// [`Error::Bind`].
    pub fn bind(location: &Location) -> Result<Self, Error> {
        let bind_error = |source| Error::Bind {
            location: *location,
            source,
        };

        let listener = std::net::TcpListener::bind(location.socket_addr()).map_err(bind_error)?;
        listener.set_nonblocking(true).map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(IO_THREADS)
            .thread_name("memtro-io")
            .enable_io()
            .build()?;

        let (inbound_tx, inbound) = channel::unbounded();
        drop(runtime.spawn(accept(listener, inbound_tx)));

        info!(%location, %local_addr, "endpoint bound");

        Ok(Self {
            location: *location,
            local_addr,
            inbound,
            runtime: Mutex::new(Some(runtime)),
        })
    }

    /// The location this endpoint was bound with.
    #[inline]
    pub const fn location(&self) -> &Location {
        &self.location
    }

    /// The address actually bound. Differs from [`location`](Self::location) when binding port 0.
    #[inline]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Block until a frame arrives.
    ///
    /// Fails only once the endpoint is [closed](Self::close) and every frame received before that
    /// has been taken.
    pub fn recv(&self) -> Result<Frame, TransportError> {
        self.inbound.recv().map_err(|_| TransportError::Closed)
    }

    /// Block until a frame arrives or `timeout` elapses.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Frame, TransportError> {
        self.inbound.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => TransportError::TimedOut,
            RecvTimeoutError::Disconnected => TransportError::Closed,
        })
    }

    /// Stop accepting connections and drop every open one.
    ///
    /// Receivers blocked in [`recv`](Self::recv) are woken with [`TransportError::Closed`] once the
    /// queue drains. Closing an already closed endpoint does nothing.
    pub fn close(&self) {
        if let Some(runtime) = self.runtime.lock().take() {
            debug!(location = %self.location, "closing endpoint");
            runtime.shutdown_background();
        }
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        self.close();
    }
}

/// Accept connections for as long as the runtime lives.
async fn accept(listener: std::net::TcpListener, inbound: channel::Sender<Frame>) {
    let listener = match TcpListener::from_std(listener) {
        Ok(listener) => listener,
        Err(err) => {
            error!(%err, "failed to register listener with the runtime");
            return;
        }
    };

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                if let Err(err) = stream.set_nodelay(true) {
                    debug!(%peer, %err, "failed to disable Nagle's algorithm");
                }
                drop(tokio::spawn(
                    connection(stream, peer, inbound.clone())
                        .instrument(info_span!("connection", %peer)),
                ));
            }
            Err(err) => {
                warn!(%err, "failed to accept connection");
                tokio::task::yield_now().await;
            }
        }
    }
}

/// Read frames from one connection onto the shared queue until the peer goes away.
async fn connection(stream: TcpStream, peer: SocketAddr, inbound: channel::Sender<Frame>) {
    debug!("connection opened");

    let (reader, writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let (reply_to, replies) = ReplyTo::channel(peer);
    drop(tokio::spawn(
        write_replies(writer, replies).instrument(debug_span!("replies", %peer)),
    ));

    loop {
        match read_frame(&mut reader).await {
            Ok(Some(payload)) => {
                trace!(len = payload.len(), "frame received");
                let frame = Frame {
                    payload,
                    reply_to: reply_to.clone(),
                };
                if inbound.send(frame).is_err() {
                    break;
                }
            }
            Ok(None) => {
                debug!("connection closed by peer");
                break;
            }
            Err(err) => {
                warn!(%err, "dropping connection");
                break;
            }
        }
    }
}

/// Write replies back to the peer in the order they are queued.
///
/// Runs until every [`ReplyTo`] for the connection has been dropped, so replies to frames still
/// being handled are delivered even after the peer stops sending.
async fn write_replies(writer: OwnedWriteHalf, mut replies: mpsc::UnboundedReceiver<Bytes>) {
    let mut writer = BufWriter::new(writer);

    while let Some(reply) = replies.recv().await {
        if let Err(err) = write_batch(&mut writer, reply, &mut replies).await {
            debug!(%err, "failed to write reply");
            return;
        }
    }
}

/// Write `first` and every other reply that is already queued, then flush once.
async fn write_batch(
    writer: &mut BufWriter<OwnedWriteHalf>,
    first: Bytes,
    replies: &mut mpsc::UnboundedReceiver<Bytes>,
) -> Result<(), Error> {
    write_frame(writer, &first).await?;
    while let Ok(reply) = replies.try_recv() {
        write_frame(writer, &reply).await?;
    }
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::transport::Client;

    #[test]
    fn test_bind_reports_address_in_use() -> Result<(), Error> {
        let first = Endpoint::bind(&Location::localhost(0))?;
        let taken = Location::from(first.local_addr());

        match Endpoint::bind(&taken) {
            Err(Error::Bind { location, .. }) => assert_eq!(location, taken),
            other => panic!("expected a bind error, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_recv_times_out_without_traffic() -> Result<(), Error> {
        let endpoint = Endpoint::bind(&Location::localhost(0))?;

        assert!(matches!(
            endpoint.recv_timeout(Duration::from_millis(20)),
            Err(TransportError::TimedOut)
        ));
        Ok(())
    }

    #[test]
    fn test_close_wakes_receivers() -> Result<(), Error> {
        let endpoint = std::sync::Arc::new(Endpoint::bind(&Location::localhost(0))?);

        let receiver = {
            let endpoint = std::sync::Arc::clone(&endpoint);
            std::thread::spawn(move || endpoint.recv().map(|_| ()))
        };
        endpoint.close();
        endpoint.close();

        assert_eq!(receiver.join().unwrap(), Err(TransportError::Closed));
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_echo_through_endpoint() -> Result<(), Error> {
        let endpoint = std::sync::Arc::new(Endpoint::bind(&Location::localhost(0))?);

        let echo = {
            let endpoint = std::sync::Arc::clone(&endpoint);
            std::thread::spawn(move || -> Result<SocketAddr, TransportError> {
                let (payload, reply_to) = endpoint.recv()?.into_parts();
                reply_to.send(payload)?;
                Ok(reply_to.peer())
            })
        };

        let mut client = Client::connect(&Location::from(endpoint.local_addr())).await?;
        client.send(b"ping").await?;
        assert_eq!(client.recv().await?, Bytes::from_static(b"ping"));

        let peer = echo.join().unwrap()?;
        assert_eq!(peer.ip(), endpoint.local_addr().ip());
        Ok(())
    }
}
