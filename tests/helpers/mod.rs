use anyhow::Result;
use memtro::codec::Request;
use memtro::Bytes;

pub(crate) fn get(key: impl ToString) -> Request {
    Request::Get {
        key: key.to_string(),
    }
}

pub(crate) fn put(key: impl ToString, value: &'static [u8]) -> Request {
    Request::Put {
        key: key.to_string(),
        value: Bytes::from_static(value),
    }
}

/// Encode a request into a raw frame.
pub(crate) fn frame(request: &Request) -> Result<Bytes> {
    Ok(request.encode()?)
}
