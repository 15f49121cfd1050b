//! JSON pack path.
//!
//! A pack is a JSON object with a numeric `Type` discriminator, the name of
//! the process that produced it and a `Data` string holding a nested JSON
//! document. The nested document is decoded lazily: a caller asks for the
//! payload as one specific variant and only that decode has to succeed.
//!
//! ```json
//! {"Type": 1, "ProcessName": "live.exe", "Data": "{\"Content\":\"hi\"}"}
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::{DecodeError, EnvelopeError};

// =============================================================================
// Discriminators
// =============================================================================

/// Pack type discriminator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PackMsgType {
    #[default]
    None = 0,
    Chat = 1,
    Like = 2,
    Member = 3,
    Follow = 4,
    Gift = 5,
    UserSeq = 6,
    Fansclub = 7,
    Share = 8,
    LiveEnd = 9,
}

/// A `Type` value outside 0–9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown pack type {0}")]
pub struct UnknownPackType(pub u8);

impl TryFrom<u8> for PackMsgType {
    type Error = UnknownPackType;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => PackMsgType::None,
            1 => PackMsgType::Chat,
            2 => PackMsgType::Like,
            3 => PackMsgType::Member,
            4 => PackMsgType::Follow,
            5 => PackMsgType::Gift,
            6 => PackMsgType::UserSeq,
            7 => PackMsgType::Fansclub,
            8 => PackMsgType::Share,
            9 => PackMsgType::LiveEnd,
            other => return Err(UnknownPackType(other)),
        })
    }
}

impl From<PackMsgType> for u8 {
    fn from(value: PackMsgType) -> Self {
        value as u8
    }
}

impl PackMsgType {
    /// All types that carry a payload.
    pub const EVENTS: [PackMsgType; 9] = [
        PackMsgType::Chat,
        PackMsgType::Like,
        PackMsgType::Member,
        PackMsgType::Follow,
        PackMsgType::Gift,
        PackMsgType::UserSeq,
        PackMsgType::Fansclub,
        PackMsgType::Share,
        PackMsgType::LiveEnd,
    ];

    /// Returns the type name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PackMsgType::None => "none",
            PackMsgType::Chat => "chat",
            PackMsgType::Like => "like",
            PackMsgType::Member => "member",
            PackMsgType::Follow => "follow",
            PackMsgType::Gift => "gift",
            PackMsgType::UserSeq => "user_seq",
            PackMsgType::Fansclub => "fansclub",
            PackMsgType::Share => "share",
            PackMsgType::LiveEnd => "live_end",
        }
    }

    /// Returns a human-friendly label.
    pub fn description(&self) -> &'static str {
        match self {
            PackMsgType::None => "None",
            PackMsgType::Chat => "Chat",
            PackMsgType::Like => "Like",
            PackMsgType::Member => "Join",
            PackMsgType::Follow => "Follow",
            PackMsgType::Gift => "Gift",
            PackMsgType::UserSeq => "Viewers",
            PackMsgType::Fansclub => "Fan club",
            PackMsgType::Share => "Share",
            PackMsgType::LiveEnd => "Live ended",
        }
    }

    /// Parses a type from its name.
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.to_lowercase();
        std::iter::once(PackMsgType::None)
            .chain(Self::EVENTS)
            .find(|t| t.as_str() == lower)
    }

    /// Key under which this type's message ids are deduplicated.
    pub fn dedup_key(&self) -> &'static str {
        match self {
            PackMsgType::None => "pack:none",
            PackMsgType::Chat => "pack:chat",
            PackMsgType::Like => "pack:like",
            PackMsgType::Member => "pack:member",
            PackMsgType::Follow => "pack:follow",
            PackMsgType::Gift => "pack:gift",
            PackMsgType::UserSeq => "pack:user_seq",
            PackMsgType::Fansclub => "pack:fansclub",
            PackMsgType::Share => "pack:share",
            PackMsgType::LiveEnd => "pack:live_end",
        }
    }
}

impl std::fmt::Display for PackMsgType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fans-club event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FansclubType {
    None,
    Upgrade,
    Join,
}

impl FansclubType {
    /// Maps the wire value (1 = upgrade, 2 = join).
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => FansclubType::Upgrade,
            2 => FansclubType::Join,
            _ => FansclubType::None,
        }
    }
}

/// How a viewer entered the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnterType {
    Normal,
    Shared,
    Other(i64),
}

impl EnterType {
    /// Maps the wire value (0 = normal, 6 = through a share).
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => EnterType::Normal,
            6 => EnterType::Shared,
            other => EnterType::Other(other),
        }
    }
}

/// Share destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum ShareType {
    #[default]
    Unknown,
    WeChat,
    Moments,
    Weibo,
    QZone,
    Qq,
    DouyinFriend,
}

impl From<i64> for ShareType {
    fn from(value: i64) -> Self {
        match value {
            1 => ShareType::WeChat,
            2 => ShareType::Moments,
            3 => ShareType::Weibo,
            4 => ShareType::QZone,
            5 => ShareType::Qq,
            112 => ShareType::DouyinFriend,
            _ => ShareType::Unknown,
        }
    }
}

impl From<ShareType> for i64 {
    fn from(value: ShareType) -> Self {
        match value {
            ShareType::Unknown => 0,
            ShareType::WeChat => 1,
            ShareType::Moments => 2,
            ShareType::Weibo => 3,
            ShareType::QZone => 4,
            ShareType::Qq => 5,
            ShareType::DouyinFriend => 112,
        }
    }
}

// =============================================================================
// Payload shapes
// =============================================================================

/// Fans-club membership of a viewer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct FansClubInfo {
    #[serde(deserialize_with = "crate::lenient::text")]
    pub club_name: String,
    /// 0 when not a member.
    #[serde(deserialize_with = "crate::lenient::int")]
    pub level: i32,
}

/// Anchor summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RoomAnchorInfo {
    #[serde(deserialize_with = "crate::lenient::text")]
    pub user_id: String,
    #[serde(deserialize_with = "crate::lenient::text")]
    pub sec_uid: String,
    #[serde(deserialize_with = "crate::lenient::text")]
    pub nickname: String,
    #[serde(deserialize_with = "crate::lenient::text")]
    pub head_url: String,
    /// 0 = not followed, 1 = followed.
    #[serde(deserialize_with = "crate::lenient::int")]
    pub follow_status: i32,
}

/// Viewer profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MsgUser {
    #[serde(deserialize_with = "crate::lenient::int")]
    pub id: i64,
    #[serde(deserialize_with = "crate::lenient::or_default")]
    pub is_admin: bool,
    #[serde(deserialize_with = "crate::lenient::or_default")]
    pub is_anchor: bool,
    #[serde(deserialize_with = "crate::lenient::int")]
    pub short_id: i64,
    #[serde(deserialize_with = "crate::lenient::text")]
    pub display_id: String,
    #[serde(deserialize_with = "crate::lenient::text")]
    pub nickname: String,
    #[serde(deserialize_with = "crate::lenient::int")]
    pub level: i32,
    #[serde(deserialize_with = "crate::lenient::int")]
    pub pay_level: i32,
    /// 1 = male, 2 = female.
    #[serde(deserialize_with = "crate::lenient::int")]
    pub gender: i32,
    #[serde(deserialize_with = "crate::lenient::text")]
    pub head_img_url: String,
    #[serde(deserialize_with = "crate::lenient::text")]
    pub sec_uid: String,
    pub fans_club: Option<FansClubInfo>,
    #[serde(deserialize_with = "crate::lenient::int")]
    pub follower_count: i64,
    #[serde(deserialize_with = "crate::lenient::int")]
    pub follow_status: i64,
    #[serde(deserialize_with = "crate::lenient::int")]
    pub following_count: i64,
}

impl MsgUser {
    /// Returns a label for the gender code.
    pub fn gender_label(&self) -> &'static str {
        match self.gender {
            1 => "male",
            2 => "female",
            _ => "unknown",
        }
    }
}

/// Attributes shared by every pack payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Msg {
    #[serde(deserialize_with = "crate::lenient::int")]
    pub msg_id: i64,
    pub user: Option<MsgUser>,
    pub owner: Option<RoomAnchorInfo>,
    #[serde(deserialize_with = "crate::lenient::text")]
    pub content: String,
    #[serde(deserialize_with = "crate::lenient::text")]
    pub room_id: String,
    #[serde(deserialize_with = "crate::lenient::text")]
    pub web_room_id: String,
    #[serde(deserialize_with = "crate::lenient::text")]
    pub room_title: String,
    #[serde(deserialize_with = "crate::lenient::or_default")]
    pub is_anonymous: bool,
    /// App the viewer used (e.g. 1128, 8663, 2329).
    #[serde(deserialize_with = "crate::lenient::text")]
    pub appid: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct GiftMsg {
    #[serde(flatten)]
    pub base: Msg,
    #[serde(deserialize_with = "crate::lenient::int")]
    pub gift_id: i64,
    #[serde(deserialize_with = "crate::lenient::text")]
    pub gift_name: String,
    #[serde(deserialize_with = "crate::lenient::int")]
    pub group_id: i64,
    /// Count added by this message.
    #[serde(deserialize_with = "crate::lenient::int")]
    pub gift_count: i64,
    /// Running count of the current combo.
    #[serde(deserialize_with = "crate::lenient::int")]
    pub repeat_count: i64,
    #[serde(deserialize_with = "crate::lenient::int")]
    pub diamond_count: i32,
    #[serde(deserialize_with = "crate::lenient::or_default")]
    pub combo: bool,
    #[serde(deserialize_with = "crate::lenient::text")]
    pub img_url: String,
    /// Recipient in co-host rooms.
    pub to_user: Option<MsgUser>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LikeMsg {
    #[serde(flatten)]
    pub base: Msg,
    #[serde(deserialize_with = "crate::lenient::int")]
    pub count: i64,
    #[serde(deserialize_with = "crate::lenient::int")]
    pub total: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct UserSeqMsg {
    #[serde(flatten)]
    pub base: Msg,
    #[serde(deserialize_with = "crate::lenient::int")]
    pub online_user_count: i64,
    #[serde(deserialize_with = "crate::lenient::int")]
    pub total_user_count: i64,
    #[serde(deserialize_with = "crate::lenient::text")]
    pub total_user_count_str: String,
    #[serde(deserialize_with = "crate::lenient::text")]
    pub online_user_count_str: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct FansclubMsg {
    #[serde(flatten)]
    pub base: Msg,
    /// 1 = upgrade, 2 = join.
    #[serde(deserialize_with = "crate::lenient::int")]
    pub r#type: i32,
    #[serde(deserialize_with = "crate::lenient::int")]
    pub level: i32,
}

impl FansclubMsg {
    /// Returns the typed event kind.
    pub fn fansclub_type(&self) -> FansclubType {
        FansclubType::from_code(self.r#type)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MemberMsg {
    #[serde(flatten)]
    pub base: Msg,
    #[serde(deserialize_with = "crate::lenient::int")]
    pub current_count: i64,
    #[serde(deserialize_with = "crate::lenient::int")]
    pub enter_tip_type: i64,
}

impl MemberMsg {
    /// Returns how the viewer entered.
    pub fn enter_type(&self) -> EnterType {
        EnterType::from_code(self.enter_tip_type)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ShareMsg {
    #[serde(flatten)]
    pub base: Msg,
    #[serde(deserialize_with = "crate::lenient::int")]
    pub share_type: ShareType,
}

/// A decoded pack payload.
#[derive(Debug, Clone, PartialEq)]
pub enum PackEvent {
    Chat(Msg),
    Like(LikeMsg),
    Member(MemberMsg),
    Follow(Msg),
    Gift(GiftMsg),
    UserSeq(UserSeqMsg),
    Fansclub(FansclubMsg),
    Share(ShareMsg),
    LiveEnd(Msg),
}

impl PackEvent {
    /// Returns the pack type of this event.
    pub fn kind(&self) -> PackMsgType {
        match self {
            PackEvent::Chat(_) => PackMsgType::Chat,
            PackEvent::Like(_) => PackMsgType::Like,
            PackEvent::Member(_) => PackMsgType::Member,
            PackEvent::Follow(_) => PackMsgType::Follow,
            PackEvent::Gift(_) => PackMsgType::Gift,
            PackEvent::UserSeq(_) => PackMsgType::UserSeq,
            PackEvent::Fansclub(_) => PackMsgType::Fansclub,
            PackEvent::Share(_) => PackMsgType::Share,
            PackEvent::LiveEnd(_) => PackMsgType::LiveEnd,
        }
    }

    /// Returns the shared attributes.
    pub fn base(&self) -> &Msg {
        match self {
            PackEvent::Chat(m) | PackEvent::Follow(m) | PackEvent::LiveEnd(m) => m,
            PackEvent::Like(m) => &m.base,
            PackEvent::Member(m) => &m.base,
            PackEvent::Gift(m) => &m.base,
            PackEvent::UserSeq(m) => &m.base,
            PackEvent::Fansclub(m) => &m.base,
            PackEvent::Share(m) => &m.base,
        }
    }

    /// Returns the message id.
    pub fn msg_id(&self) -> i64 {
        self.base().msg_id
    }

    /// Serializes the payload as a JSON document.
    pub fn to_data(&self) -> serde_json::Result<String> {
        match self {
            PackEvent::Chat(m) | PackEvent::Follow(m) | PackEvent::LiveEnd(m) => {
                serde_json::to_string(m)
            }
            PackEvent::Like(m) => serde_json::to_string(m),
            PackEvent::Member(m) => serde_json::to_string(m),
            PackEvent::Gift(m) => serde_json::to_string(m),
            PackEvent::UserSeq(m) => serde_json::to_string(m),
            PackEvent::Fansclub(m) => serde_json::to_string(m),
            PackEvent::Share(m) => serde_json::to_string(m),
        }
    }

    /// Wraps the event in a pack for the given process.
    pub fn to_pack(&self, process_name: impl Into<String>) -> serde_json::Result<BarrageMsgPack> {
        Ok(BarrageMsgPack::new(self.kind(), process_name, self.to_data()?))
    }
}

// =============================================================================
// Pack envelope
// =============================================================================

/// JSON pack envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BarrageMsgPack {
    #[serde(rename = "Type")]
    pub kind: PackMsgType,
    #[serde(default, deserialize_with = "crate::lenient::text")]
    pub process_name: String,
    #[serde(default)]
    pub data: Option<String>,
}

impl BarrageMsgPack {
    /// Creates a pack.
    pub fn new(kind: PackMsgType, process_name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            kind,
            process_name: process_name.into(),
            data: Some(data.into()),
        }
    }

    /// Serializes the pack.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parses the `Data` string into a JSON value.
    ///
    /// A `Data` string that itself holds an encoded JSON string (double
    /// encoding) is unwrapped once more.
    fn data_value(&self, data: &str) -> serde_json::Result<Value> {
        match serde_json::from_str::<Value>(data)? {
            Value::String(inner) => serde_json::from_str(&inner),
            value => Ok(value),
        }
    }

    /// Decodes the payload as `T` if this pack is of type `expected`.
    ///
    /// Returns `Ok(None)` when the type differs or the pack has no payload,
    /// and a [`DecodeError`] when the payload does not fit `T`. A failed
    /// decode says nothing about the pack envelope itself.
    pub fn decode_as<T: DeserializeOwned>(
        &self,
        expected: PackMsgType,
    ) -> Result<Option<T>, DecodeError> {
        if self.kind != expected {
            return Ok(None);
        }
        self.decode_payload(expected)
    }

    fn decode_payload<T: DeserializeOwned>(
        &self,
        kind: PackMsgType,
    ) -> Result<Option<T>, DecodeError> {
        let Some(data) = self.data.as_deref() else {
            return Ok(None);
        };

        self.data_value(data)
            .and_then(serde_json::from_value)
            .map(Some)
            .map_err(|source| DecodeError::Pack { kind, source })
    }

    pub fn chat(&self) -> Result<Option<Msg>, DecodeError> {
        self.decode_as(PackMsgType::Chat)
    }

    pub fn like(&self) -> Result<Option<LikeMsg>, DecodeError> {
        self.decode_as(PackMsgType::Like)
    }

    pub fn member(&self) -> Result<Option<MemberMsg>, DecodeError> {
        self.decode_as(PackMsgType::Member)
    }

    pub fn follow(&self) -> Result<Option<Msg>, DecodeError> {
        self.decode_as(PackMsgType::Follow)
    }

    pub fn gift(&self) -> Result<Option<GiftMsg>, DecodeError> {
        self.decode_as(PackMsgType::Gift)
    }

    pub fn user_seq(&self) -> Result<Option<UserSeqMsg>, DecodeError> {
        self.decode_as(PackMsgType::UserSeq)
    }

    pub fn fansclub(&self) -> Result<Option<FansclubMsg>, DecodeError> {
        self.decode_as(PackMsgType::Fansclub)
    }

    pub fn share(&self) -> Result<Option<ShareMsg>, DecodeError> {
        self.decode_as(PackMsgType::Share)
    }

    pub fn live_end(&self) -> Result<Option<Msg>, DecodeError> {
        self.decode_as(PackMsgType::LiveEnd)
    }

    /// Decodes the payload as the base attribute set, whatever the type.
    pub fn decode_any(&self) -> Result<Option<Msg>, DecodeError> {
        self.decode_payload(self.kind)
    }

    /// Decodes the payload as the variant named by the pack's type.
    ///
    /// Returns `Ok(None)` for [`PackMsgType::None`] and for packs without data.
    pub fn decode_event(&self) -> Result<Option<PackEvent>, DecodeError> {
        let kind = self.kind;
        let event = match kind {
            PackMsgType::None => None,
            PackMsgType::Chat => self.decode_payload(kind)?.map(PackEvent::Chat),
            PackMsgType::Like => self.decode_payload(kind)?.map(PackEvent::Like),
            PackMsgType::Member => self.decode_payload(kind)?.map(PackEvent::Member),
            PackMsgType::Follow => self.decode_payload(kind)?.map(PackEvent::Follow),
            PackMsgType::Gift => self.decode_payload(kind)?.map(PackEvent::Gift),
            PackMsgType::UserSeq => self.decode_payload(kind)?.map(PackEvent::UserSeq),
            PackMsgType::Fansclub => self.decode_payload(kind)?.map(PackEvent::Fansclub),
            PackMsgType::Share => self.decode_payload(kind)?.map(PackEvent::Share),
            PackMsgType::LiveEnd => self.decode_payload(kind)?.map(PackEvent::LiveEnd),
        };
        Ok(event)
    }
}

/// Decodes a JSON pack envelope.
pub fn decode_json_pack(bytes: &[u8]) -> Result<BarrageMsgPack, EnvelopeError> {
    if bytes.is_empty() {
        return Err(EnvelopeError::Empty);
    }
    Ok(serde_json::from_slice(bytes)?)
}

/// Returns true if the bytes look like a JSON object.
///
/// A binary batch and each of its records start with `0x0a`, which is also
/// a newline, so the trimmed body must be brace-delimited and the first
/// non-whitespace byte inside the braces must open a key. This is a sniff,
/// not a proof: callers should fall back to the binary path when the JSON
/// decode fails.
pub fn looks_like_json(bytes: &[u8]) -> bool {
    let [b'{', body @ .., b'}'] = bytes.trim_ascii() else {
        return false;
    };
    matches!(body.trim_ascii_start().first(), None | Some(b'"'))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAT_PACK: &str = r#"{"Type":1,"ProcessName":"live.exe","Data":"{\"Content\":\"hi\"}"}"#;

    #[test]
    fn decodes_chat_pack() {
        let pack = decode_json_pack(CHAT_PACK.as_bytes()).unwrap();
        assert_eq!(pack.kind, PackMsgType::Chat);
        assert_eq!(pack.process_name, "live.exe");

        let chat = pack.chat().unwrap().unwrap();
        assert_eq!(chat.content, "hi");
        assert_eq!(chat.msg_id, 0);
        assert!(chat.user.is_none());
    }

    #[test]
    fn other_variants_are_none_for_chat_pack() {
        let pack = decode_json_pack(CHAT_PACK.as_bytes()).unwrap();
        assert!(pack.gift().unwrap().is_none());
        assert!(pack.follow().unwrap().is_none());
        assert!(pack.live_end().unwrap().is_none());
    }

    #[test]
    fn unknown_type_is_envelope_error() {
        let result = decode_json_pack(br#"{"Type":42,"ProcessName":"x","Data":"{}"}"#);
        assert!(matches!(result, Err(EnvelopeError::Json(_))));
    }

    #[test]
    fn garbage_is_envelope_error() {
        assert!(matches!(
            decode_json_pack(b"{not json"),
            Err(EnvelopeError::Json(_))
        ));
        assert!(matches!(decode_json_pack(b""), Err(EnvelopeError::Empty)));
    }

    #[test]
    fn bad_payload_is_decode_error_not_envelope_error() {
        let pack = decode_json_pack(br#"{"Type":5,"ProcessName":"x","Data":"{\"GiftId\":\"abc\"}"}"#)
            .unwrap();
        match pack.gift() {
            Err(DecodeError::Pack { kind, .. }) => assert_eq!(kind, PackMsgType::Gift),
            other => panic!("expected pack decode error, got {other:?}"),
        }
    }

    #[test]
    fn null_fields_decode_as_defaults() {
        let pack = decode_json_pack(
            br#"{"Type":1,"ProcessName":null,"Data":"{\"Content\":\"hi\",\"RoomTitle\":null,\"Appid\":null,\"IsAnonymous\":null,\"MsgId\":null,\"User\":{\"Nickname\":null,\"Level\":null,\"FansClub\":null}}"}"#,
        )
        .unwrap();
        assert_eq!(pack.process_name, "");

        let chat = pack.chat().unwrap().unwrap();
        assert_eq!(chat.content, "hi");
        assert_eq!(chat.room_title, "");
        assert_eq!(chat.appid, "");
        assert!(!chat.is_anonymous);
        assert_eq!(chat.msg_id, 0);

        let user = chat.user.unwrap();
        assert_eq!(user.nickname, "");
        assert_eq!(user.level, 0);
        assert!(user.fans_club.is_none());
    }

    #[test]
    fn ids_accept_numbers_and_strings() {
        let pack = decode_json_pack(
            br#"{"Type":5,"ProcessName":"x","Data":"{\"RoomId\":7300,\"WebRoomId\":\"81\",\"Appid\":1128,\"MsgId\":\"99\",\"GiftId\":\"463\",\"Combo\":null,\"Owner\":{\"UserId\":1001}}"}"#,
        )
        .unwrap();

        let gift = pack.gift().unwrap().unwrap();
        assert_eq!(gift.base.room_id, "7300");
        assert_eq!(gift.base.web_room_id, "81");
        assert_eq!(gift.base.appid, "1128");
        assert_eq!(gift.base.msg_id, 99);
        assert_eq!(gift.gift_id, 463);
        assert!(!gift.combo);
        assert_eq!(gift.base.owner.unwrap().user_id, "1001");
    }

    #[test]
    fn null_share_type_is_unknown() {
        let pack = decode_json_pack(
            br#"{"Type":8,"ProcessName":"x","Data":"{\"ShareType\":null,\"MsgId\":3}"}"#,
        )
        .unwrap();
        let share = pack.share().unwrap().unwrap();
        assert_eq!(share.share_type, ShareType::Unknown);
        assert_eq!(share.base.msg_id, 3);
    }

    #[test]
    fn gift_payload_maps_base_and_specific_fields() {
        let data = serde_json::json!({
            "MsgId": 77,
            "Content": "sent a rose",
            "RoomId": "7300",
            "User": {"Id": 5, "Nickname": "donor", "Gender": 2,
                     "FansClub": {"ClubName": "stars", "Level": 3}},
            "GiftId": 463,
            "GiftName": "Rose",
            "GiftCount": 1,
            "RepeatCount": 10,
            "DiamondCount": 1,
            "Combo": true
        });
        let pack = BarrageMsgPack::new(PackMsgType::Gift, "live.exe", data.to_string());

        let gift = pack.gift().unwrap().unwrap();
        assert_eq!(gift.base.msg_id, 77);
        assert_eq!(gift.base.room_id, "7300");
        assert_eq!(gift.gift_name, "Rose");
        assert_eq!(gift.repeat_count, 10);
        assert!(gift.combo);

        let user = gift.base.user.unwrap();
        assert_eq!(user.gender_label(), "female");
        assert_eq!(user.fans_club.unwrap().level, 3);
    }

    #[test]
    fn double_encoded_data_is_unwrapped() {
        let inner = r#"{"Count":3,"Total":10}"#;
        let data = serde_json::to_string(inner).unwrap();
        let pack = BarrageMsgPack::new(PackMsgType::Like, "p", data);

        let like = pack.like().unwrap().unwrap();
        assert_eq!(like.count, 3);
        assert_eq!(like.total, 10);
    }

    #[test]
    fn missing_data_is_none() {
        let pack = decode_json_pack(br#"{"Type":1,"ProcessName":"p"}"#).unwrap();
        assert!(pack.chat().unwrap().is_none());
        assert!(pack.decode_event().unwrap().is_none());
    }

    #[test]
    fn decode_any_reads_base_of_any_type() {
        let pack = BarrageMsgPack::new(
            PackMsgType::Member,
            "p",
            r#"{"MsgId":9,"CurrentCount":120,"EnterTipType":6}"#,
        );
        assert_eq!(pack.decode_any().unwrap().unwrap().msg_id, 9);

        match pack.decode_event().unwrap() {
            Some(PackEvent::Member(member)) => {
                assert_eq!(member.current_count, 120);
                assert_eq!(member.enter_type(), EnterType::Shared);
            }
            other => panic!("expected member, got {other:?}"),
        }
    }

    #[test]
    fn none_type_decodes_to_nothing() {
        let pack = BarrageMsgPack::new(PackMsgType::None, "p", "{}");
        assert!(pack.decode_event().unwrap().is_none());
    }

    #[test]
    fn share_type_maps_known_and_unknown_codes() {
        let pack = BarrageMsgPack::new(PackMsgType::Share, "p", r#"{"ShareType":112}"#);
        assert_eq!(
            pack.share().unwrap().unwrap().share_type,
            ShareType::DouyinFriend
        );

        let pack = BarrageMsgPack::new(PackMsgType::Share, "p", r#"{"ShareType":77}"#);
        assert_eq!(pack.share().unwrap().unwrap().share_type, ShareType::Unknown);
    }

    #[test]
    fn event_to_pack_and_back() {
        let event = PackEvent::Fansclub(FansclubMsg {
            base: Msg {
                msg_id: 3,
                content: "joined".to_string(),
                ..Default::default()
            },
            r#type: 2,
            level: 1,
        });
        let json = event.to_pack("live.exe").unwrap().to_json().unwrap();
        assert!(json.contains("\"Type\":7"));

        let pack = decode_json_pack(json.as_bytes()).unwrap();
        let decoded = pack.decode_event().unwrap().unwrap();
        assert_eq!(decoded, event);
        match decoded {
            PackEvent::Fansclub(m) => assert_eq!(m.fansclub_type(), FansclubType::Join),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn type_names_parse() {
        for kind in PackMsgType::EVENTS {
            assert_eq!(PackMsgType::parse(kind.as_str()), Some(kind));
            assert!(kind.dedup_key().ends_with(kind.as_str()));
        }
        assert_eq!(PackMsgType::parse("GIFT"), Some(PackMsgType::Gift));
        assert_eq!(PackMsgType::parse("unknown"), None);
    }

    #[test]
    fn looks_like_json_skips_whitespace() {
        assert!(looks_like_json(b"  \n{\"Type\":1}\r\n"));
        assert!(looks_like_json(b"{ }"));
        assert!(!looks_like_json(&[0x0a, 0x02, b'{']));
        assert!(!looks_like_json(&[0x0a, 0x7b, 0x0a, 0x12, 0x7d]));
        assert!(!looks_like_json(&[0x0a, 0x7b, 0x0a, 0x0a, 0x12, 0x57, 0x7d]));
        assert!(looks_like_json(b"{\n  \"Type\": 1\n}"));
        assert!(!looks_like_json(b""));
    }
}
