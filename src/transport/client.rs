use super::{read_frame, write_frame};
use crate::codec::{self, Request, Response};
use crate::error::{Error, TransportError};
use crate::Location;
use prost::bytes::Bytes;
use std::net::SocketAddr;
use tokio::io::{AsyncWriteExt as _, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// A connection to a memtro endpoint.
///
/// Frames may be pipelined: any number can be [sent](Self::send) before their replies are
/// [received](Self::recv). A single service worker answers frames in order, but with several
/// workers the replies to pipelined frames may arrive in a different order than the frames were
/// sent.
#[derive(Debug)]
pub struct Client {
    peer: SocketAddr,
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
}

impl Client {
    /// Connect to the endpoint at `location`.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug"))]
    pub async fn connect(location: &Location) -> Result<Self, Error> {
        let stream = TcpStream::connect(location.socket_addr()).await?;
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;
        let (reader, writer) = stream.into_split();

        Ok(Self {
            peer,
            reader: BufReader::new(reader),
            writer: BufWriter::new(writer),
        })
    }

    /// The address of the endpoint this client is connected to.
    #[inline]
    pub const fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Send one raw frame.
    pub async fn send(&mut self, payload: &[u8]) -> Result<(), Error> {
        write_frame(&mut self.writer, payload).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Receive one raw frame.
    pub async fn recv(&mut self) -> Result<Bytes, Error> {
        read_frame(&mut self.reader)
            .await?
            .ok_or(Error::Transport(TransportError::PeerGone))
    }

    /// Send `request` and wait for its response.
    ///
    /// Only meaningful when no other frames are in flight on this connection.
    pub async fn call(&mut self, request: &Request) -> Result<Response, Error> {
        self.send(&request.encode()?).await?;
        let frame = self.recv().await?;
        Ok(Response::decode(request, frame)?)
    }

    /// Obtain the value stored for `key`, if any.
    pub async fn get(&mut self, key: impl Into<String> + Send) -> Result<Option<Bytes>, Error> {
        let request = Request::Get { key: key.into() };
        self.send(&request.encode()?).await?;
        Ok(codec::decode_get_response(self.recv().await?)?)
    }

    /// Store `value` under `key` unless the key already has a value. Returns whether the entry
    /// was created.
    pub async fn put(
        &mut self,
        key: impl Into<String> + Send,
        value: impl Into<Bytes> + Send,
    ) -> Result<bool, Error> {
        let request = Request::Put {
            key: key.into(),
            value: value.into(),
        };
        self.send(&request.encode()?).await?;
        Ok(codec::decode_put_response(self.recv().await?)?)
    }
}
