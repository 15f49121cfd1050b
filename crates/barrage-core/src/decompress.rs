//! Gzip inflate of envelope payloads.

use std::io::Read;

use flate2::read::GzDecoder;

use crate::error::DecompressError;

/// Size of the intermediate read buffer.
pub const INFLATE_CHUNK_SIZE: usize = 1024;

/// Default ceiling on inflated output (16 MiB).
pub const DEFAULT_MAX_INFLATE_SIZE: usize = 16 * 1024 * 1024;

/// Inflates a compressed payload.
///
/// The pipeline holds this as a trait object so hosts can swap or wrap the
/// implementation.
pub trait Inflate: Send + Sync {
    /// Inflates `bytes` into a freshly allocated buffer.
    fn inflate(&self, bytes: &[u8]) -> Result<Vec<u8>, DecompressError>;
}

/// Streaming gzip inflater with an output ceiling.
#[derive(Debug, Clone)]
pub struct GzipInflater {
    max_size: usize,
}

impl Default for GzipInflater {
    fn default() -> Self {
        Self::new()
    }
}

impl GzipInflater {
    /// Creates an inflater with the default output ceiling.
    pub fn new() -> Self {
        Self {
            max_size: DEFAULT_MAX_INFLATE_SIZE,
        }
    }

    /// Creates an inflater with a custom output ceiling.
    pub fn with_max_size(max_size: usize) -> Self {
        Self { max_size }
    }

    /// Returns the output ceiling.
    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

impl Inflate for GzipInflater {
    fn inflate(&self, bytes: &[u8]) -> Result<Vec<u8>, DecompressError> {
        let mut decoder = GzDecoder::new(bytes);
        let mut out = Vec::with_capacity(bytes.len().saturating_mul(4).min(self.max_size));
        let mut block = [0u8; INFLATE_CHUNK_SIZE];

        loop {
            let read = decoder.read(&mut block)?;
            if read == 0 {
                break;
            }
            if out.len() + read > self.max_size {
                return Err(DecompressError::TooLarge {
                    limit: self.max_size,
                });
            }
            out.extend_from_slice(&block[..read]);
        }

        Ok(out)
    }
}

/// Inflates a gzip stream with the default ceiling.
pub fn inflate(bytes: &[u8]) -> Result<Vec<u8>, DecompressError> {
    GzipInflater::new().inflate(bytes)
}
