//! Length-prefixed frames over TCP.
//!
//! Every frame is a 4-byte big-endian payload length followed by the payload. An [`Endpoint`]
//! accepts connections and hands each inbound frame to exactly one caller of
//! [`Endpoint::recv`], together with a [`ReplyTo`] that routes the answer back over the connection
//! the frame arrived on. A [`Client`] is the other side of that exchange.

mod client;
mod endpoint;

pub use self::client::Client;
pub use self::endpoint::Endpoint;
use crate::error::{Error, TransportError};
use prost::bytes::Bytes;
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncReadExt as _, AsyncWrite, AsyncWriteExt as _};
use tokio::sync::mpsc;

/// The largest payload a frame may carry. Connections sending anything larger are closed.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// One inbound message and the address its reply goes to.
#[derive(Debug)]
pub struct Frame {
    payload: Bytes,
    reply_to: ReplyTo,
}

impl Frame {
    /// The message as received.
    #[inline]
    pub const fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Split the frame into its payload and reply address.
    #[inline]
    pub fn into_parts(self) -> (Bytes, ReplyTo) {
        (self.payload, self.reply_to)
    }
}

/// Where the reply to a [`Frame`] is sent.
#[derive(Debug, Clone)]
pub struct ReplyTo {
    peer: SocketAddr,
    outbound: mpsc::UnboundedSender<Bytes>,
}

impl ReplyTo {
    /// Create a reply address for `peer` whose replies appear on the returned receiver.
    pub(crate) fn channel(peer: SocketAddr) -> (Self, mpsc::UnboundedReceiver<Bytes>) {
        let (outbound, replies) = mpsc::unbounded_channel();
        (Self { peer, outbound }, replies)
    }

    /// The remote address of the connection the frame arrived on.
    #[inline]
    pub const fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Queue `payload` to be written back to the peer.
    ///
    /// This never blocks. It fails only if the connection has already gone away.
    pub fn send(&self, payload: Bytes) -> Result<(), TransportError> {
        self.outbound
            .send(payload)
            .map_err(|_| TransportError::PeerGone)
    }
}

/// Read one frame. Returns `None` if the peer closed the connection between frames.
pub(crate) async fn read_frame<R>(reader: &mut R) -> Result<Option<Bytes>, Error>
where
    R: AsyncRead + Unpin,
{
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    if len > MAX_FRAME_LEN {
        return Err(TransportError::FrameTooLarge(len).into());
    }

    // Reserved fallibly so that a length the process cannot hold only costs this connection.
    let mut payload = Vec::new();
    payload.try_reserve_exact(len)?;
    let read = reader.take(len as u64).read_to_end(&mut payload).await?;
    if read < len {
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
    }
    Ok(Some(Bytes::from(payload)))
}

/// Write one frame. The writer is not flushed.
pub(crate) async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), Error>
where
    W: AsyncWrite + Unpin,
{
    let len = match u32::try_from(payload.len()) {
        Ok(len) if payload.len() <= MAX_FRAME_LEN => len,
        _ => return Err(TransportError::FrameTooLarge(payload.len()).into()),
    };
    writer.write_u32(len).await?;
    writer.write_all(payload).await?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_frames_keep_boundaries() -> Result<(), Error> {
        let (mut client, mut server) = tokio::io::duplex(64);

        let writer = tokio::spawn(async move {
            for payload in [&b"first"[..], b"", b"third frame"] {
                write_frame(&mut client, payload).await?;
            }
            client.flush().await?;
            Ok::<_, Error>(())
        });

        assert_eq!(read_frame(&mut server).await?, Some(Bytes::from_static(b"first")));
        assert_eq!(read_frame(&mut server).await?, Some(Bytes::new()));
        assert_eq!(
            read_frame(&mut server).await?,
            Some(Bytes::from_static(b"third frame"))
        );
        writer.await.unwrap()?;

        // The writer half is gone, so the stream ends cleanly between frames.
        assert_eq!(read_frame(&mut server).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_oversized_frames_are_rejected() -> Result<(), Error> {
        let (mut client, mut server) = tokio::io::duplex(64);

        client.write_u32(MAX_FRAME_LEN as u32 + 1).await?;
        assert!(matches!(
            read_frame(&mut server).await,
            Err(Error::Transport(TransportError::FrameTooLarge(len))) if len == MAX_FRAME_LEN + 1
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_truncated_frame_is_an_error() -> Result<(), Error> {
        let (mut client, mut server) = tokio::io::duplex(64);

        client.write_u32(10).await?;
        client.write_all(b"short").await?;
        drop(client);

        assert!(matches!(read_frame(&mut server).await, Err(Error::Io(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_largest_frame_header_without_payload_is_an_error() -> Result<(), Error> {
        let (mut client, mut server) = tokio::io::duplex(64);

        client.write_u32(MAX_FRAME_LEN as u32).await?;
        client.write_all(b"partial").await?;
        drop(client);

        assert!(matches!(
            read_frame(&mut server).await,
            Err(Error::Io(err)) if err.kind() == io::ErrorKind::UnexpectedEof
        ));
        Ok(())
    }

    #[test]
    fn test_reply_after_disconnect() {
        let (reply_to, replies) = ReplyTo::channel("127.0.0.1:9".parse().unwrap());
        assert_eq!(reply_to.send(Bytes::from_static(b"ok")), Ok(()));

        drop(replies);
        assert_eq!(
            reply_to.send(Bytes::from_static(b"late")),
            Err(TransportError::PeerGone)
        );
    }
}
