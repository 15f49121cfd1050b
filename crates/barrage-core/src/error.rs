//! Error types for the decode path.
//!
//! Errors never cross a frame boundary: each variant describes why a single
//! frame or a single record was dropped. Intentional discards are modelled
//! separately by [`PolicyDrop`] and are not errors.

use thiserror::Error;

use crate::pack::PackMsgType;

/// Framing failure of an outer or inner envelope.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// Binary framing could not be decoded.
    #[error("malformed envelope: {0}")]
    Malformed(#[from] prost::DecodeError),

    /// JSON pack could not be decoded.
    #[error("malformed JSON pack: {0}")]
    Json(#[from] serde_json::Error),

    /// The frame carried no bytes.
    #[error("empty frame")]
    Empty,
}

/// Gzip inflate failure.
#[derive(Debug, Error)]
pub enum DecompressError {
    /// Corrupt or truncated gzip stream.
    #[error("gzip inflate failed: {0}")]
    Io(#[from] std::io::Error),

    /// Inflated output exceeded the configured ceiling.
    #[error("inflated payload exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

/// A single record whose payload does not match its declared type.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Binary record payload failed to decode.
    #[error("failed to decode {method}: {source}")]
    Record {
        method: String,
        #[source]
        source: prost::DecodeError,
    },

    /// JSON pack payload failed to map onto the requested variant.
    #[error("failed to decode {kind} pack: {source}")]
    Pack {
        kind: PackMsgType,
        #[source]
        source: serde_json::Error,
    },
}

/// Any failure that drops a whole frame.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error(transparent)]
    Decompress(#[from] DecompressError),
}

/// Reasons a frame is discarded without it being a fault.
///
/// Policy drops are expected traffic noise and are never logged above `trace`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyDrop {
    /// The originating process is not on the allow-list.
    DisabledProcess,
    /// The frame carried no bytes.
    EmptyPayload,
    /// Decompression was requested but the frame does not start with the expected tag.
    BadMagic,
    /// The outer envelope lacks the `compress_type=gzip` header.
    MissingCompressHeader,
    /// The pipeline is not running.
    Stopped,
}

impl PolicyDrop {
    /// Returns a short label for the drop reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyDrop::DisabledProcess => "disabled_process",
            PolicyDrop::EmptyPayload => "empty_payload",
            PolicyDrop::BadMagic => "bad_magic",
            PolicyDrop::MissingCompressHeader => "missing_compress_header",
            PolicyDrop::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for PolicyDrop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result type for envelope operations.
pub type Result<T> = std::result::Result<T, EnvelopeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_drop_labels() {
        assert_eq!(PolicyDrop::BadMagic.to_string(), "bad_magic");
        assert_eq!(
            PolicyDrop::MissingCompressHeader.as_str(),
            "missing_compress_header"
        );
    }

    #[test]
    fn frame_error_is_transparent() {
        let err = FrameError::from(EnvelopeError::Empty);
        assert_eq!(err.to_string(), "empty frame");

        let err = FrameError::from(DecompressError::TooLarge { limit: 16 });
        assert!(err.to_string().contains("16 bytes"));
    }
}
