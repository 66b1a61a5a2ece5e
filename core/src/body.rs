//! Raw body representations.
//!
//! A body leaf is bound to exactly one raw representation (`BodyKind`):
//! a buffered byte string, text, or a byte stream. Transports hand over a
//! `RawBody`; `BodyRaw` converts it into the representation a body codec
//! works on, failing with a `DecodeError` when the two cannot meet (e.g. a
//! stream where text was expected).

use std::fmt;
use std::io;
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt, TryStreamExt};

use crate::error::{DecodeError, DecodeResult};

/// A streaming body, as handed over by a transport.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Bytes,
    Text,
    Stream,
}

impl fmt::Display for BodyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyKind::Bytes => f.write_str("bytes"),
            BodyKind::Text => f.write_str("text"),
            BodyKind::Stream => f.write_str("byte stream"),
        }
    }
}

pub enum RawBody {
    Bytes(Bytes),
    Text(String),
    Stream(ByteStream),
}

impl RawBody {
    pub fn kind(&self) -> BodyKind {
        match self {
            RawBody::Bytes(_) => BodyKind::Bytes,
            RawBody::Text(_) => BodyKind::Text,
            RawBody::Stream(_) => BodyKind::Stream,
        }
    }

    /// Length in bytes, when known without reading a stream.
    pub fn len(&self) -> Option<usize> {
        match self {
            RawBody::Bytes(bytes) => Some(bytes.len()),
            RawBody::Text(text) => Some(text.len()),
            RawBody::Stream(_) => None,
        }
    }

    /// Buffers the whole body.
    pub async fn into_bytes(self) -> io::Result<Bytes> {
        match self {
            RawBody::Bytes(bytes) => Ok(bytes),
            RawBody::Text(text) => Ok(Bytes::from(text)),
            RawBody::Stream(stream) => {
                let buffered = stream
                    .try_fold(BytesMut::new(), |mut acc, chunk| async move {
                        acc.extend_from_slice(&chunk);
                        Ok(acc)
                    })
                    .await?;
                Ok(buffered.freeze())
            }
        }
    }
}

impl fmt::Debug for RawBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawBody::Bytes(bytes) => f.debug_tuple("Bytes").field(bytes).finish(),
            RawBody::Text(text) => f.debug_tuple("Text").field(text).finish(),
            RawBody::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// A raw representation a body codec can work on.
pub trait BodyRaw: Sized + Send + 'static {
    const KIND: BodyKind;

    fn from_raw(raw: RawBody) -> DecodeResult<Self>;

    fn into_raw(self) -> RawBody;
}

impl BodyRaw for String {
    const KIND: BodyKind = BodyKind::Text;

    fn from_raw(raw: RawBody) -> DecodeResult<Self> {
        match raw {
            RawBody::Text(text) => Ok(text),
            RawBody::Bytes(bytes) => String::from_utf8(bytes.to_vec())
                .map_err(|e| DecodeError::malformed(String::from_utf8_lossy(&bytes), e)),
            RawBody::Stream(_) => Err(DecodeError::mismatch("text body", "byte stream")),
        }
    }

    fn into_raw(self) -> RawBody {
        RawBody::Text(self)
    }
}

impl BodyRaw for Bytes {
    const KIND: BodyKind = BodyKind::Bytes;

    fn from_raw(raw: RawBody) -> DecodeResult<Self> {
        match raw {
            RawBody::Bytes(bytes) => Ok(bytes),
            RawBody::Text(text) => Ok(Bytes::from(text)),
            RawBody::Stream(_) => Err(DecodeError::mismatch("buffered body", "byte stream")),
        }
    }

    fn into_raw(self) -> RawBody {
        RawBody::Bytes(self)
    }
}

impl BodyRaw for ByteStream {
    const KIND: BodyKind = BodyKind::Stream;

    fn from_raw(raw: RawBody) -> DecodeResult<Self> {
        let bytes = match raw {
            RawBody::Stream(stream) => return Ok(stream),
            RawBody::Bytes(bytes) => bytes,
            RawBody::Text(text) => Bytes::from(text),
        };
        Ok(stream::once(async move { Ok::<_, io::Error>(bytes) }).boxed())
    }

    fn into_raw(self) -> RawBody {
        RawBody::Stream(self)
    }
}
