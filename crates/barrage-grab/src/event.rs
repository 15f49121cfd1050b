//! Events delivered to subscribers.

use chrono::{DateTime, Utc};
use serde::Serialize;

use barrage_core::{BarrageMessage, MessageKind, PackEvent, PackMsgType};

/// Which family and variant an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A binary-path record.
    Barrage(MessageKind),
    /// A JSON-path pack.
    Pack(PackMsgType),
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Barrage(kind) => write!(f, "{kind}"),
            EventKind::Pack(kind) => write!(f, "pack:{kind}"),
        }
    }
}

/// Decoded payload of an event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Barrage(BarrageMessage),
    Pack(PackEvent),
}

/// A fully decoded, admitted record plus its origin.
///
/// Events are immutable once emitted; sinks receive shared references.
#[derive(Debug, Clone, PartialEq)]
pub struct GrabEvent {
    /// Name of the process the frame was captured from.
    pub process: String,
    /// When the pipeline emitted the event.
    pub received_at: DateTime<Utc>,
    pub payload: EventPayload,
}

impl GrabEvent {
    /// Creates an event for a binary record.
    pub fn barrage(process: impl Into<String>, message: BarrageMessage) -> Self {
        Self {
            process: process.into(),
            received_at: Utc::now(),
            payload: EventPayload::Barrage(message),
        }
    }

    /// Creates an event for a JSON pack.
    pub fn pack(process: impl Into<String>, event: PackEvent) -> Self {
        Self {
            process: process.into(),
            received_at: Utc::now(),
            payload: EventPayload::Pack(event),
        }
    }

    /// Returns the event kind.
    pub fn kind(&self) -> EventKind {
        match &self.payload {
            EventPayload::Barrage(m) => EventKind::Barrage(m.kind()),
            EventPayload::Pack(e) => EventKind::Pack(e.kind()),
        }
    }

    /// Returns the message id.
    pub fn msg_id(&self) -> i64 {
        match &self.payload {
            EventPayload::Barrage(m) => m.msg_id() as i64,
            EventPayload::Pack(e) => e.msg_id(),
        }
    }

    /// Returns the event in the JSON family, converting binary records.
    pub fn to_pack_event(&self) -> Option<PackEvent> {
        match &self.payload {
            EventPayload::Barrage(m) => PackEvent::from_message(m),
            EventPayload::Pack(e) => Some(e.clone()),
        }
    }

    /// Returns a one-line human-readable summary.
    pub fn summary(&self) -> String {
        let Some(event) = self.to_pack_event() else {
            return format!("[{}] {}", self.process, self.kind());
        };
        let base = event.base();
        let who = base
            .user
            .as_ref()
            .map(|u| u.nickname.as_str())
            .filter(|n| !n.is_empty())
            .unwrap_or("-");

        let detail = match &event {
            PackEvent::Chat(m) => m.content.clone(),
            PackEvent::Like(m) => format!("liked x{} (total {})", m.count, m.total),
            PackEvent::Member(m) => format!("joined ({} online)", m.current_count),
            PackEvent::Follow(_) => "followed".to_string(),
            PackEvent::Gift(m) => format!("sent {} x{}", m.gift_name, m.repeat_count.max(m.gift_count)),
            PackEvent::UserSeq(m) => format!(
                "{} online, {} total",
                m.online_user_count, m.total_user_count
            ),
            PackEvent::Fansclub(m) => format!("fans club {:?} level {}", m.fansclub_type(), m.level),
            PackEvent::Share(m) => format!("shared to {:?}", m.share_type),
            PackEvent::LiveEnd(_) => "live ended".to_string(),
        };

        format!(
            "[{}] {} {}: {}",
            self.process,
            event.kind().description(),
            who,
            detail
        )
    }
}

/// Borrowed view handed to typed sinks.
#[derive(Debug, Clone, Copy)]
pub struct RoomEvent<'a, T> {
    pub process: &'a str,
    pub message: &'a T,
    pub received_at: DateTime<Utc>,
}

/// Serializable form of an event for printing and forwarding.
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    pub kind: String,
    pub process: String,
    pub msg_id: i64,
    pub received_at: DateTime<Utc>,
    /// JSON-family payload, absent for records with no counterpart.
    pub data: Option<serde_json::Value>,
}

impl From<&GrabEvent> for EventRecord {
    fn from(event: &GrabEvent) -> Self {
        let data = event
            .to_pack_event()
            .and_then(|e| e.to_data().ok())
            .and_then(|s| serde_json::from_str(&s).ok());

        Self {
            kind: event.kind().to_string(),
            process: event.process.clone(),
            msg_id: event.msg_id(),
            received_at: event.received_at,
            data,
        }
    }
}
