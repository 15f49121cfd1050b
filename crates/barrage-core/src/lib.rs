//! Barrage Core - wire codec and message model for live-stream traffic.
//!
//! This crate turns raw captured bytes into typed room events. It performs no
//! I/O and owns no threads; the pipeline in `barrage-grab` drives it.
//!
//! ## Wire Encodings
//!
//! - Binary: an outer envelope with headers and a gzip payload, holding a
//!   batch of records, each decoded by method name through the
//!   [`MessageRegistry`].
//! - JSON: a [`BarrageMsgPack`] with a numeric type and a nested JSON
//!   document, decoded lazily per requested variant.
//!
//! ## Architecture
//!
//! ```text
//! socket frame → decode_outer → compress_type=gzip? → inflate → decode_inner
//!                                                                   │
//!                                                  for each RawRecord
//!                                                                   ▼
//!                                     MessageRegistry::decode → DedupCache::admit
//!
//! JSON pack    → decode_json_pack → decode_event → DedupCache::admit
//! ```

mod convert;
pub mod decompress;
pub mod dedup;
pub mod envelope;
mod error;
mod lenient;
pub mod messages;
pub mod pack;
pub mod registry;

pub use convert::SOCIAL_ACTION_FOLLOW;
pub use decompress::{inflate, GzipInflater, Inflate, DEFAULT_MAX_INFLATE_SIZE};
pub use dedup::{DedupCache, DEFAULT_DEDUP_CAPACITY};
pub use envelope::{
    decode_inner, decode_outer, HeaderPair, OuterEnvelope, RawRecord, RecordBatch,
    GZIP_FRAME_TAG,
};
pub use error::{DecodeError, DecompressError, EnvelopeError, FrameError, PolicyDrop, Result};
pub use messages::{BarrageMessage, MessageKind, Record};
pub use pack::{decode_json_pack, looks_like_json, BarrageMsgPack, PackEvent, PackMsgType};
pub use registry::{default_registry, MessageRegistry, RecordDecoder};
