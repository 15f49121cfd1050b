//! Typed event dispatch.
//!
//! The dispatcher owns every subscriber reference. Sinks are registered per
//! variant (or for all events) and invoked in registration order; a variant
//! with no sinks is a silent no-op. A broadcast channel additionally carries
//! every emitted event to async subscribers.
//!
//! ```text
//! emit(event) → sinks[kind] (in order) → sinks[any] → broadcast channel
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use barrage_core::messages::{
    ChatMessage, ControlMessage, FansclubMessage, GiftMessage, LikeMessage, MemberMessage,
    RoomUserSeqMessage, SocialMessage,
};
use barrage_core::pack::{FansclubMsg, GiftMsg, LikeMsg, MemberMsg, Msg, ShareMsg, UserSeqMsg};
use barrage_core::{PackEvent, PackMsgType, Record};

use crate::event::{EventKind, EventPayload, GrabEvent, RoomEvent};

/// Buffered events per broadcast receiver before the oldest are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Callback receiving every event it was registered for.
pub type EventSink = Arc<dyn Fn(&GrabEvent) + Send + Sync>;

#[derive(Default)]
struct Sinks {
    by_kind: HashMap<EventKind, Vec<EventSink>>,
    any: Vec<EventSink>,
}

macro_rules! pack_sink {
    ($(#[$doc:meta])* $name:ident, $variant:ident, $ty:ty) => {
        $(#[$doc])*
        pub fn $name<F>(&self, sink: F)
        where
            F: for<'a> Fn(RoomEvent<'a, $ty>) + Send + Sync + 'static,
        {
            self.add(
                EventKind::Pack(PackMsgType::$variant),
                Arc::new(move |event: &GrabEvent| {
                    if let EventPayload::Pack(PackEvent::$variant(message)) = &event.payload {
                        sink(RoomEvent {
                            process: &event.process,
                            message,
                            received_at: event.received_at,
                        });
                    }
                }),
            );
        }
    };
}

/// Routes emitted events to registered sinks.
pub struct Dispatcher {
    sinks: RwLock<Sinks>,
    channel: broadcast::Sender<Arc<GrabEvent>>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("sinks", &self.sink_count())
            .field("subscribers", &self.channel.receiver_count())
            .finish()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Creates a dispatcher with the default channel capacity.
    pub fn new() -> Self {
        Self::with_channel_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates a dispatcher with a custom channel capacity.
    pub fn with_channel_capacity(capacity: usize) -> Self {
        let (channel, _) = broadcast::channel(capacity.max(1));
        Self {
            sinks: RwLock::new(Sinks::default()),
            channel,
        }
    }

    fn add(&self, kind: EventKind, sink: EventSink) {
        self.sinks.write().by_kind.entry(kind).or_default().push(sink);
    }

    /// Registers a sink for one binary record shape.
    pub fn on<T, F>(&self, sink: F)
    where
        T: Record,
        F: for<'a> Fn(RoomEvent<'a, T>) + Send + Sync + 'static,
    {
        self.add(
            EventKind::Barrage(T::KIND),
            Arc::new(move |event: &GrabEvent| {
                if let EventPayload::Barrage(message) = &event.payload {
                    if let Some(message) = T::from_message(message) {
                        sink(RoomEvent {
                            process: &event.process,
                            message,
                            received_at: event.received_at,
                        });
                    }
                }
            }),
        );
    }

    /// Registers a sink for binary viewer-join records.
    pub fn on_member<F>(&self, sink: F)
    where
        F: for<'a> Fn(RoomEvent<'a, MemberMessage>) + Send + Sync + 'static,
    {
        self.on::<MemberMessage, F>(sink);
    }

    /// Registers a sink for binary follow and share records.
    pub fn on_social<F>(&self, sink: F)
    where
        F: for<'a> Fn(RoomEvent<'a, SocialMessage>) + Send + Sync + 'static,
    {
        self.on::<SocialMessage, F>(sink);
    }

    /// Registers a sink for binary chat records.
    pub fn on_chat<F>(&self, sink: F)
    where
        F: for<'a> Fn(RoomEvent<'a, ChatMessage>) + Send + Sync + 'static,
    {
        self.on::<ChatMessage, F>(sink);
    }

    /// Registers a sink for binary like records.
    pub fn on_like<F>(&self, sink: F)
    where
        F: for<'a> Fn(RoomEvent<'a, LikeMessage>) + Send + Sync + 'static,
    {
        self.on::<LikeMessage, F>(sink);
    }

    /// Registers a sink for binary gift records.
    pub fn on_gift<F>(&self, sink: F)
    where
        F: for<'a> Fn(RoomEvent<'a, GiftMessage>) + Send + Sync + 'static,
    {
        self.on::<GiftMessage, F>(sink);
    }

    /// Registers a sink for binary viewer-count records.
    pub fn on_room_user_seq<F>(&self, sink: F)
    where
        F: for<'a> Fn(RoomEvent<'a, RoomUserSeqMessage>) + Send + Sync + 'static,
    {
        self.on::<RoomUserSeqMessage, F>(sink);
    }

    /// Registers a sink for binary room-control records.
    pub fn on_control<F>(&self, sink: F)
    where
        F: for<'a> Fn(RoomEvent<'a, ControlMessage>) + Send + Sync + 'static,
    {
        self.on::<ControlMessage, F>(sink);
    }

    /// Registers a sink for binary fan-club records.
    pub fn on_fansclub<F>(&self, sink: F)
    where
        F: for<'a> Fn(RoomEvent<'a, FansclubMessage>) + Send + Sync + 'static,
    {
        self.on::<FansclubMessage, F>(sink);
    }

    pack_sink!(
        /// Registers a sink for JSON chat packs.
        on_pack_chat, Chat, Msg
    );
    pack_sink!(
        /// Registers a sink for JSON like packs.
        on_pack_like, Like, LikeMsg
    );
    pack_sink!(
        /// Registers a sink for JSON viewer-join packs.
        on_pack_member, Member, MemberMsg
    );
    pack_sink!(
        /// Registers a sink for JSON follow packs.
        on_pack_follow, Follow, Msg
    );
    pack_sink!(
        /// Registers a sink for JSON gift packs.
        on_pack_gift, Gift, GiftMsg
    );
    pack_sink!(
        /// Registers a sink for JSON viewer-count packs.
        on_pack_user_seq, UserSeq, UserSeqMsg
    );
    pack_sink!(
        /// Registers a sink for JSON fan-club packs.
        on_pack_fansclub, Fansclub, FansclubMsg
    );
    pack_sink!(
        /// Registers a sink for JSON share packs.
        on_pack_share, Share, ShareMsg
    );
    pack_sink!(
        /// Registers a sink for JSON live-end packs.
        on_pack_live_end, LiveEnd, Msg
    );

    /// Registers a sink receiving every event of both families.
    pub fn on_any<F>(&self, sink: F)
    where
        F: Fn(&GrabEvent) + Send + Sync + 'static,
    {
        self.sinks.write().any.push(Arc::new(sink));
    }

    /// Returns a receiver for every emitted event.
    ///
    /// A receiver that falls behind loses the oldest events; it never slows
    /// the pipeline down.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<GrabEvent>> {
        self.channel.subscribe()
    }

    /// Delivers an event to its sinks and to channel subscribers.
    ///
    /// Returns the number of sinks invoked. Sinks run on the caller's thread
    /// and outside the registration lock.
    pub fn emit(&self, event: GrabEvent) -> usize {
        let targets: Vec<EventSink> = {
            let sinks = self.sinks.read();
            sinks
                .by_kind
                .get(&event.kind())
                .into_iter()
                .flatten()
                .chain(sinks.any.iter())
                .cloned()
                .collect()
        };

        for sink in &targets {
            sink(&event);
        }

        if self.channel.receiver_count() > 0 {
            // Receivers may drop between the check and the send.
            let _ = self.channel.send(Arc::new(event));
        }

        targets.len()
    }

    /// Returns the number of registered sinks.
    pub fn sink_count(&self) -> usize {
        let sinks = self.sinks.read();
        sinks.by_kind.values().map(Vec::len).sum::<usize>() + sinks.any.len()
    }

    /// Returns true if at least one sink or subscriber would see `kind`.
    pub fn has_sinks_for(&self, kind: EventKind) -> bool {
        let sinks = self.sinks.read();
        !sinks.any.is_empty()
            || self.channel.receiver_count() > 0
            || sinks.by_kind.get(&kind).is_some_and(|v| !v.is_empty())
    }

    /// Removes every sink.
    pub fn clear(&self) {
        let mut sinks = self.sinks.write();
        sinks.by_kind.clear();
        sinks.any.clear();
    }
}
