//! Serialization Adapter
//!
//! Converts typed values to and from byte payloads.

use bytes::{Bytes, BytesMut};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{CacheError, Result};

// == Payload ==
/// Serialized value, possibly split across several segments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    segments: Vec<Bytes>,
}

impl Payload {
    /// Payload made of one contiguous segment.
    pub fn single(bytes: impl Into<Bytes>) -> Self {
        Self {
            segments: vec![bytes.into()],
        }
    }

    /// Payload made of the given segments, in order. Empty segments are dropped.
    pub fn from_segments<I>(segments: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Bytes>,
    {
        Self {
            segments: segments
                .into_iter()
                .map(Into::into)
                .filter(|s: &Bytes| !s.is_empty())
                .collect(),
        }
    }

    /// Total length in bytes across all segments.
    pub fn len(&self) -> usize {
        self.segments.iter().map(Bytes::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when the payload can be handed to the store without copying.
    pub fn is_single_segment(&self) -> bool {
        self.segments.len() <= 1
    }

    pub fn segments(&self) -> &[Bytes] {
        &self.segments
    }

    /// Returns the payload as one owned buffer; free for single-segment payloads.
    pub fn into_contiguous(self) -> Bytes {
        match self.segments.len() {
            0 => Bytes::new(),
            1 => self.segments.into_iter().next().unwrap_or_default(),
            _ => {
                let mut buf = BytesMut::with_capacity(self.len());
                for segment in &self.segments {
                    buf.extend_from_slice(segment);
                }
                buf.freeze()
            }
        }
    }
}

// == Codec Trait ==
/// Encodes values into payloads and decodes raw bytes back into values.
pub trait PayloadCodec: Send + Sync {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Payload>;

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;
}

// == JSON Codec ==
/// JSON codec backed by serde_json.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl PayloadCodec for JsonCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Payload> {
        serde_json::to_vec(value)
            .map(Payload::single)
            .map_err(|e| CacheError::Serialization(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|e| CacheError::Deserialization(e.to_string()))
    }
}
