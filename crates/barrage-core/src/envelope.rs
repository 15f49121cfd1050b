//! Binary envelope framing.
//!
//! Socket-stream frames arrive as an outer envelope (headers plus an opaque,
//! usually gzip-compressed payload). The payload holds an inner envelope: a
//! batch of raw records, each tagged with a method name and a message id.
//!
//! ```text
//! OuterEnvelope ── headers[compress_type=gzip] ── payload ──inflate──► RecordBatch
//!                                                                       │
//!                                                        records[method, msg_id, payload]
//! ```

use prost::Message;

use crate::error::{EnvelopeError, Result};

/// First byte of an outer envelope that carries a sequence id.
///
/// Frames flagged for decompression that do not start with this tag are
/// dropped before any decoding is attempted.
pub const GZIP_FRAME_TAG: u8 = 0x08;

/// Header key naming the payload compression.
pub const COMPRESS_TYPE_HEADER: &str = "compress_type";

/// Header value for gzip-compressed payloads.
pub const COMPRESS_TYPE_GZIP: &str = "gzip";

/// A single (key, value) header pair of the outer envelope.
#[derive(Clone, PartialEq, Message)]
pub struct HeaderPair {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(string, tag = "2")]
    pub value: String,
}

impl HeaderPair {
    /// Creates a new header pair.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Outer envelope of a socket-stream frame.
#[derive(Clone, PartialEq, Message)]
pub struct OuterEnvelope {
    #[prost(uint64, tag = "1")]
    pub seq_id: u64,
    #[prost(uint64, tag = "2")]
    pub log_id: u64,
    #[prost(uint64, tag = "3")]
    pub service: u64,
    #[prost(uint64, tag = "4")]
    pub method: u64,
    #[prost(message, repeated, tag = "5")]
    pub headers: Vec<HeaderPair>,
    #[prost(string, tag = "6")]
    pub payload_encoding: String,
    #[prost(string, tag = "7")]
    pub payload_type: String,
    #[prost(bytes = "vec", tag = "8")]
    pub payload: Vec<u8>,
}

impl OuterEnvelope {
    /// Returns the value of the first header with the given key.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.key == key)
            .map(|h| h.value.as_str())
    }

    /// Returns true if the envelope declares a gzip payload.
    pub fn is_gzip(&self) -> bool {
        self.headers
            .iter()
            .any(|h| h.key == COMPRESS_TYPE_HEADER && h.value == COMPRESS_TYPE_GZIP)
    }
}

/// One record of an inner envelope.
#[derive(Clone, PartialEq, Message)]
pub struct RawRecord {
    /// Type identifier, e.g. `WebcastChatMessage`.
    #[prost(string, tag = "1")]
    pub method: String,
    #[prost(bytes = "vec", tag = "2")]
    pub payload: Vec<u8>,
    #[prost(int64, tag = "3")]
    pub msg_id: i64,
    #[prost(int32, tag = "4")]
    pub msg_type: i32,
    #[prost(int64, tag = "5")]
    pub offset: i64,
}

impl RawRecord {
    /// Creates a record from its three essential fields.
    pub fn new(method: impl Into<String>, msg_id: i64, payload: Vec<u8>) -> Self {
        Self {
            method: method.into(),
            payload,
            msg_id,
            ..Default::default()
        }
    }
}

/// Inner envelope: an ordered batch of records plus fetch bookkeeping.
#[derive(Clone, PartialEq, Message)]
pub struct RecordBatch {
    #[prost(message, repeated, tag = "1")]
    pub messages: Vec<RawRecord>,
    #[prost(string, tag = "2")]
    pub cursor: String,
    #[prost(uint64, tag = "3")]
    pub fetch_interval: u64,
    #[prost(uint64, tag = "4")]
    pub now: u64,
    #[prost(string, tag = "5")]
    pub internal_ext: String,
    #[prost(uint32, tag = "6")]
    pub fetch_type: u32,
    #[prost(uint64, tag = "8")]
    pub heartbeat_duration: u64,
    #[prost(bool, tag = "9")]
    pub need_ack: bool,
    #[prost(string, tag = "10")]
    pub push_server: String,
}

impl RecordBatch {
    /// Creates a batch holding the given records.
    pub fn with_records(messages: Vec<RawRecord>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if the batch holds no records.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Decodes an outer envelope from a raw socket-stream frame.
pub fn decode_outer(bytes: &[u8]) -> Result<OuterEnvelope> {
    if bytes.is_empty() {
        return Err(EnvelopeError::Empty);
    }
    Ok(OuterEnvelope::decode(bytes)?)
}

/// Decodes an inner envelope from an (already inflated) payload.
///
/// A batch with no fields set encodes to zero bytes, so empty input yields
/// an empty batch.
pub fn decode_inner(bytes: &[u8]) -> Result<RecordBatch> {
    Ok(RecordBatch::decode(bytes)?)
}
