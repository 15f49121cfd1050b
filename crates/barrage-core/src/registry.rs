//! Message type registry for the binary path.
//!
//! Maps a record's method name to the function that decodes its payload.
//! The default registry is built once and shared; hosts that need extra
//! record shapes build their own with [`MessageRegistry::register`].

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::envelope::RawRecord;
use crate::error::DecodeError;
use crate::messages::{
    BarrageMessage, ChatMessage, ControlMessage, FansclubMessage, GiftMessage, LikeMessage,
    MemberMessage, Record, RoomUserSeqMessage, SocialMessage,
};

/// Decodes one record payload into the message family.
pub type RecordDecoder = fn(&[u8]) -> Result<BarrageMessage, prost::DecodeError>;

/// Shared default registry.
static DEFAULT_REGISTRY: Lazy<Arc<MessageRegistry>> =
    Lazy::new(|| Arc::new(MessageRegistry::with_defaults()));

/// Returns the shared default registry.
pub fn default_registry() -> Arc<MessageRegistry> {
    Arc::clone(&DEFAULT_REGISTRY)
}

fn decode_typed<T: Record>(payload: &[u8]) -> Result<BarrageMessage, prost::DecodeError> {
    T::decode(payload).map(Record::into_message)
}

/// Registry of record decoders keyed by method name.
#[derive(Clone, Default)]
pub struct MessageRegistry {
    decoders: HashMap<String, RecordDecoder>,
}

impl std::fmt::Debug for MessageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut methods = self.methods();
        methods.sort_unstable();
        f.debug_struct("MessageRegistry")
            .field("methods", &methods)
            .finish()
    }
}

impl MessageRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with all eight built-in record shapes.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_record::<MemberMessage>();
        registry.register_record::<SocialMessage>();
        registry.register_record::<ChatMessage>();
        registry.register_record::<LikeMessage>();
        registry.register_record::<GiftMessage>();
        registry.register_record::<RoomUserSeqMessage>();
        registry.register_record::<ControlMessage>();
        registry.register_record::<FansclubMessage>();
        registry
    }

    /// Registers a decoder for a method name, replacing any previous one.
    pub fn register(&mut self, method: impl Into<String>, decoder: RecordDecoder) {
        self.decoders.insert(method.into(), decoder);
    }

    /// Registers a built-in record shape under its method name.
    pub fn register_record<T: Record>(&mut self) {
        self.register(T::KIND.method(), decode_typed::<T>);
    }

    /// Returns true if a decoder exists for the method.
    pub fn contains(&self, method: &str) -> bool {
        self.decoders.contains_key(method)
    }

    /// Returns the number of registered methods.
    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Returns the registered method names.
    pub fn methods(&self) -> Vec<&str> {
        self.decoders.keys().map(String::as_str).collect()
    }

    /// Decodes a record payload by method name.
    ///
    /// Returns `Ok(None)` for methods without a decoder; those are expected
    /// traffic noise, not failures.
    pub fn decode_record(
        &self,
        method: &str,
        payload: &[u8],
    ) -> Result<Option<BarrageMessage>, DecodeError> {
        let Some(decoder) = self.decoders.get(method) else {
            return Ok(None);
        };

        decoder(payload)
            .map(Some)
            .map_err(|source| DecodeError::Record {
                method: method.to_string(),
                source,
            })
    }

    /// Decodes a raw record from an inner envelope.
    pub fn decode(&self, record: &RawRecord) -> Result<Option<BarrageMessage>, DecodeError> {
        self.decode_record(&record.method, &record.payload)
    }
}
