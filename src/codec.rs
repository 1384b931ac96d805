//! Conversion between frames and the requests and responses they carry.
//!
//! Encoding is two-phase: the exact length of the message is computed first, a buffer of that
//! capacity is reserved, and the message is written into it without the buffer ever growing.
//! Reserving memory is fallible, so a failed allocation surfaces as
//! [`Error::ResourceExhausted`] rather than aborting the process.

use crate::error::{DecodeError, Error};
use crate::proto;
use prost::bytes::Bytes;
use prost::Message;

/// A decoded client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Look up the value for `key`.
    Get {
        /// The key to look up.
        key: String,
    },
    /// Store `value` under `key` unless the key already has a value.
    Put {
        /// The key to store under.
        key: String,
        /// The value to store.
        value: Bytes,
    },
}

/// The reply to a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// The value stored for the requested key, if there is one.
    Get {
        /// `None` if the key has never been stored.
        value: Option<Bytes>,
    },
    /// Whether the request created a new entry.
    Put {
        /// `false` if the key already had a value, which was left untouched.
        is_new: bool,
    },
}

/// Encode `message` into a buffer of exactly its encoded length.
pub fn encode<M>(message: &M) -> Result<Bytes, Error>
where
    M: Message,
{
    let len = message.encoded_len();
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)?;
    message.encode(&mut buf)?;
    debug_assert_eq!(buf.len(), len);
    Ok(Bytes::from(buf))
}

/// Decode a single `M` spanning all of `frame`.
///
/// Length-delimited fields of `M` that hold [`Bytes`] share `frame`'s buffer rather than copying
/// it.
pub fn decode<M>(frame: Bytes) -> Result<M, DecodeError>
where
    M: Message + Default,
{
    Ok(M::decode(frame)?)
}

impl Request {
    /// Decode a request from an inbound frame.
    pub fn decode(frame: Bytes) -> Result<Self, DecodeError> {
        decode::<proto::Request>(frame)?.try_into()
    }

    /// Encode this request into a frame.
    pub fn encode(&self) -> Result<Bytes, Error> {
        encode(&proto::Request::from(self.clone()))
    }

    /// The key this request refers to.
    pub fn key(&self) -> &str {
        match self {
            Self::Get { key } | Self::Put { key, .. } => key,
        }
    }
}

impl TryFrom<proto::Request> for Request {
    type Error = DecodeError;

    fn try_from(request: proto::Request) -> Result<Self, Self::Error> {
        match (request.get, request.put) {
            (Some(proto::Get { key }), None) => Ok(Self::Get {
                key: key.ok_or(DecodeError::MissingField("get.key"))?,
            }),
            (None, Some(proto::Put { key, value })) => Ok(Self::Put {
                key: key.ok_or(DecodeError::MissingField("put.key"))?,
                value: value.ok_or(DecodeError::MissingField("put.value"))?,
            }),
            (Some(_), Some(_)) => Err(DecodeError::AmbiguousOperation),
            (None, None) => Err(DecodeError::MissingField("get|put")),
        }
    }
}

impl From<Request> for proto::Request {
    fn from(request: Request) -> Self {
        match request {
            Request::Get { key } => Self {
                get: Some(proto::Get { key: Some(key) }),
                put: None,
            },
            Request::Put { key, value } => Self {
                get: None,
                put: Some(proto::Put {
                    key: Some(key),
                    value: Some(value),
                }),
            },
        }
    }
}

impl Response {
    /// Encode this response into a frame. `Get` and `Put` replies are distinct message types.
    pub fn encode(&self) -> Result<Bytes, Error> {
        match self {
            Self::Get { value } => encode(&proto::GetResponse {
                has_value: value.is_some(),
                value: value.clone(),
            }),
            Self::Put { is_new } => encode(&proto::PutResponse { is_new: *is_new }),
        }
    }

    /// Decode the reply to `request`.
    ///
    /// Replies do not identify their own shape; the request they answer determines it.
    pub fn decode(request: &Request, frame: Bytes) -> Result<Self, DecodeError> {
        match request {
            Request::Get { .. } => decode_get_response(frame).map(|value| Self::Get { value }),
            Request::Put { .. } => decode_put_response(frame).map(|is_new| Self::Put { is_new }),
        }
    }
}

/// Decode the reply to a `Get`: the stored value, if there is one.
pub fn decode_get_response(frame: Bytes) -> Result<Option<Bytes>, DecodeError> {
    let proto::GetResponse { has_value, value } = decode::<proto::GetResponse>(frame)?;
    if has_value != value.is_some() {
        return Err(DecodeError::InconsistentValue { has_value });
    }
    Ok(value)
}

/// Decode the reply to a `Put`: whether the entry was created.
pub fn decode_put_response(frame: Bytes) -> Result<bool, DecodeError> {
    Ok(decode::<proto::PutResponse>(frame)?.is_new)
}
