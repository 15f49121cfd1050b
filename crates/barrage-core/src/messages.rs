//! Typed records carried by the binary path.
//!
//! Each record payload is a length-framed structure whose layout depends on
//! the record's method name. The eight supported shapes are defined here,
//! together with the closed [`BarrageMessage`] family and the [`Record`]
//! trait that ties each shape to its [`MessageKind`].

use prost::Message;

// =============================================================================
// Shared blocks
// =============================================================================

/// Header block present at the start of every record payload.
#[derive(Clone, PartialEq, Message)]
pub struct Common {
    #[prost(string, tag = "1")]
    pub method: String,
    #[prost(uint64, tag = "2")]
    pub msg_id: u64,
    #[prost(uint64, tag = "3")]
    pub room_id: u64,
    #[prost(uint64, tag = "4")]
    pub create_time: u64,
    #[prost(string, tag = "7")]
    pub describe: String,
}

/// Image reference (avatar, gift icon).
#[derive(Clone, PartialEq, Message)]
pub struct Image {
    #[prost(string, repeated, tag = "1")]
    pub url_list: Vec<String>,
    #[prost(string, tag = "2")]
    pub uri: String,
}

impl Image {
    /// Returns the first URL, if any.
    pub fn first_url(&self) -> Option<&str> {
        self.url_list.first().map(String::as_str)
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct FollowInfo {
    #[prost(uint64, tag = "1")]
    pub following_count: u64,
    #[prost(uint64, tag = "2")]
    pub follower_count: u64,
    #[prost(uint64, tag = "3")]
    pub follow_status: u64,
}

#[derive(Clone, PartialEq, Message)]
pub struct PayGrade {
    #[prost(int64, tag = "6")]
    pub level: i64,
}

#[derive(Clone, PartialEq, Message)]
pub struct FansClubData {
    #[prost(string, tag = "1")]
    pub club_name: String,
    #[prost(int32, tag = "2")]
    pub level: i32,
}

#[derive(Clone, PartialEq, Message)]
pub struct FansClub {
    #[prost(message, optional, tag = "1")]
    pub data: Option<FansClubData>,
}

/// Viewer profile attached to most records.
#[derive(Clone, PartialEq, Message)]
pub struct User {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(uint64, tag = "2")]
    pub short_id: u64,
    #[prost(string, tag = "3")]
    pub nickname: String,
    /// 1 = male, 2 = female.
    #[prost(uint32, tag = "4")]
    pub gender: u32,
    #[prost(uint32, tag = "6")]
    pub level: u32,
    #[prost(message, optional, tag = "9")]
    pub avatar_thumb: Option<Image>,
    #[prost(message, optional, tag = "22")]
    pub follow_info: Option<FollowInfo>,
    #[prost(message, optional, tag = "23")]
    pub pay_grade: Option<PayGrade>,
    #[prost(message, optional, tag = "24")]
    pub fans_club: Option<FansClub>,
    #[prost(string, tag = "38")]
    pub display_id: String,
    #[prost(string, tag = "46")]
    pub sec_uid: String,
}

impl User {
    /// Returns the fans-club level, 0 when not a member.
    pub fn fans_club_level(&self) -> i32 {
        self.fans_club
            .as_ref()
            .and_then(|c| c.data.as_ref())
            .map(|d| d.level)
            .unwrap_or(0)
    }
}

// =============================================================================
// Record shapes
// =============================================================================

/// A viewer joined the room.
#[derive(Clone, PartialEq, Message)]
pub struct MemberMessage {
    #[prost(message, optional, tag = "1")]
    pub common: Option<Common>,
    #[prost(message, optional, tag = "2")]
    pub user: Option<User>,
    #[prost(uint64, tag = "3")]
    pub member_count: u64,
    #[prost(message, optional, tag = "4")]
    pub operator: Option<User>,
    #[prost(bool, tag = "5")]
    pub is_set_to_admin: bool,
    /// 0 = normal entry, 6 = entered through a share.
    #[prost(uint64, tag = "9")]
    pub enter_type: u64,
    #[prost(uint64, tag = "10")]
    pub action: u64,
    #[prost(string, tag = "11")]
    pub action_description: String,
}

/// Follow or share.
#[derive(Clone, PartialEq, Message)]
pub struct SocialMessage {
    #[prost(message, optional, tag = "1")]
    pub common: Option<Common>,
    #[prost(message, optional, tag = "2")]
    pub user: Option<User>,
    #[prost(uint64, tag = "3")]
    pub share_type: u64,
    /// 1 = follow.
    #[prost(uint64, tag = "4")]
    pub action: u64,
    #[prost(string, tag = "5")]
    pub share_target: String,
    #[prost(uint64, tag = "6")]
    pub follow_count: u64,
}

/// Chat line.
#[derive(Clone, PartialEq, Message)]
pub struct ChatMessage {
    #[prost(message, optional, tag = "1")]
    pub common: Option<Common>,
    #[prost(message, optional, tag = "2")]
    pub user: Option<User>,
    #[prost(string, tag = "3")]
    pub content: String,
    #[prost(bool, tag = "4")]
    pub visible_to_sender: bool,
}

/// Likes sent by a viewer.
#[derive(Clone, PartialEq, Message)]
pub struct LikeMessage {
    #[prost(message, optional, tag = "1")]
    pub common: Option<Common>,
    #[prost(uint64, tag = "2")]
    pub count: u64,
    #[prost(uint64, tag = "3")]
    pub total: u64,
    #[prost(message, optional, tag = "5")]
    pub user: Option<User>,
}

/// Static description of a gift.
#[derive(Clone, PartialEq, Message)]
pub struct GiftStruct {
    #[prost(message, optional, tag = "1")]
    pub image: Option<Image>,
    #[prost(string, tag = "2")]
    pub describe: String,
    #[prost(uint64, tag = "4")]
    pub duration: u64,
    #[prost(uint64, tag = "5")]
    pub id: u64,
    #[prost(bool, tag = "10")]
    pub combo: bool,
    #[prost(uint32, tag = "12")]
    pub diamond_count: u32,
    #[prost(string, tag = "16")]
    pub name: String,
}

/// Gift sent to the anchor (or to a co-host).
#[derive(Clone, PartialEq, Message)]
pub struct GiftMessage {
    #[prost(message, optional, tag = "1")]
    pub common: Option<Common>,
    #[prost(uint64, tag = "2")]
    pub gift_id: u64,
    #[prost(uint64, tag = "3")]
    pub fan_ticket_count: u64,
    #[prost(uint64, tag = "4")]
    pub group_count: u64,
    #[prost(uint64, tag = "5")]
    pub repeat_count: u64,
    #[prost(uint64, tag = "6")]
    pub combo_count: u64,
    #[prost(message, optional, tag = "7")]
    pub user: Option<User>,
    #[prost(message, optional, tag = "8")]
    pub to_user: Option<User>,
    /// 1 once a combo streak has finished.
    #[prost(uint32, tag = "9")]
    pub repeat_end: u32,
    #[prost(uint64, tag = "11")]
    pub group_id: u64,
    #[prost(message, optional, tag = "15")]
    pub gift: Option<GiftStruct>,
    #[prost(string, tag = "16")]
    pub log_id: String,
}

impl GiftMessage {
    /// Returns the gift name, empty if the gift block is missing.
    pub fn gift_name(&self) -> &str {
        self.gift.as_ref().map(|g| g.name.as_str()).unwrap_or("")
    }

    /// Returns the unit price in diamonds.
    pub fn diamond_count(&self) -> u32 {
        self.gift.as_ref().map(|g| g.diamond_count).unwrap_or(0)
    }

    /// Returns true if the gift can be sent in combos.
    pub fn is_combo(&self) -> bool {
        self.gift.as_ref().is_some_and(|g| g.combo)
    }
}

/// Viewer count statistics.
#[derive(Clone, PartialEq, Message)]
pub struct RoomUserSeqMessage {
    #[prost(message, optional, tag = "1")]
    pub common: Option<Common>,
    /// Viewers currently in the room.
    #[prost(uint64, tag = "3")]
    pub total: u64,
    #[prost(string, tag = "4")]
    pub pop_str: String,
    #[prost(uint64, tag = "6")]
    pub popularity: u64,
    /// Viewers accumulated since the stream started.
    #[prost(uint64, tag = "7")]
    pub total_user: u64,
    #[prost(string, tag = "8")]
    pub total_user_str: String,
    #[prost(string, tag = "9")]
    pub total_str: String,
}

/// Room state change.
#[derive(Clone, PartialEq, Message)]
pub struct ControlMessage {
    #[prost(message, optional, tag = "1")]
    pub common: Option<Common>,
    /// 3 = stream ended.
    #[prost(int32, tag = "2")]
    pub status: i32,
}

/// Control status signalling the end of a stream.
pub const CONTROL_STATUS_LIVE_END: i32 = 3;

impl ControlMessage {
    /// Returns true if the stream has ended.
    pub fn is_live_end(&self) -> bool {
        self.status == CONTROL_STATUS_LIVE_END
    }
}

/// Fans-club upgrade or join.
#[derive(Clone, PartialEq, Message)]
pub struct FansclubMessage {
    #[prost(message, optional, tag = "1")]
    pub common: Option<Common>,
    /// 1 = upgrade, 2 = join.
    #[prost(int32, tag = "2")]
    pub r#type: i32,
    #[prost(string, tag = "3")]
    pub content: String,
    #[prost(message, optional, tag = "4")]
    pub user: Option<User>,
}

// =============================================================================
// Message family
// =============================================================================

/// Kind of a binary-path record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Member,
    Social,
    Chat,
    Like,
    Gift,
    RoomUserSeq,
    Control,
    Fansclub,
}

impl MessageKind {
    /// All kinds, in registration order.
    pub const ALL: [MessageKind; 8] = [
        MessageKind::Member,
        MessageKind::Social,
        MessageKind::Chat,
        MessageKind::Like,
        MessageKind::Gift,
        MessageKind::RoomUserSeq,
        MessageKind::Control,
        MessageKind::Fansclub,
    ];

    /// Returns the wire method name.
    pub fn method(&self) -> &'static str {
        match self {
            MessageKind::Member => "WebcastMemberMessage",
            MessageKind::Social => "WebcastSocialMessage",
            MessageKind::Chat => "WebcastChatMessage",
            MessageKind::Like => "WebcastLikeMessage",
            MessageKind::Gift => "WebcastGiftMessage",
            MessageKind::RoomUserSeq => "WebcastRoomUserSeqMessage",
            MessageKind::Control => "WebcastControlMessage",
            MessageKind::Fansclub => "WebcastFansclubMessage",
        }
    }

    /// Looks up a kind by wire method name.
    pub fn from_method(method: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.method() == method)
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.method())
    }
}

/// A decoded binary-path record.
#[derive(Debug, Clone, PartialEq)]
pub enum BarrageMessage {
    Member(MemberMessage),
    Social(SocialMessage),
    Chat(ChatMessage),
    Like(LikeMessage),
    Gift(GiftMessage),
    RoomUserSeq(RoomUserSeqMessage),
    Control(ControlMessage),
    Fansclub(FansclubMessage),
}

/// Ties a record shape to its place in the [`BarrageMessage`] family.
pub trait Record: Message + Default + Sized + 'static {
    /// Kind of this record.
    const KIND: MessageKind;

    /// Wraps the record into the family enum.
    fn into_message(self) -> BarrageMessage;

    /// Borrows the record out of the family enum if the kind matches.
    fn from_message(message: &BarrageMessage) -> Option<&Self>;

    /// Returns the common header block.
    fn common(&self) -> Option<&Common>;

    /// Returns the acting viewer, if the shape carries one.
    fn user(&self) -> Option<&User>;
}

macro_rules! impl_record {
    ($ty:ident, $variant:ident, user) => {
        impl_record!(@impl $ty, $variant);

        impl $ty {
            fn user_block(&self) -> Option<&User> {
                self.user.as_ref()
            }
        }
    };
    ($ty:ident, $variant:ident, no_user) => {
        impl_record!(@impl $ty, $variant);

        impl $ty {
            fn user_block(&self) -> Option<&User> {
                None
            }
        }
    };
    (@impl $ty:ident, $variant:ident) => {
        impl Record for $ty {
            const KIND: MessageKind = MessageKind::$variant;

            fn into_message(self) -> BarrageMessage {
                BarrageMessage::$variant(self)
            }

            fn from_message(message: &BarrageMessage) -> Option<&Self> {
                match message {
                    BarrageMessage::$variant(m) => Some(m),
                    _ => None,
                }
            }

            fn common(&self) -> Option<&Common> {
                self.common.as_ref()
            }

            fn user(&self) -> Option<&User> {
                self.user_block()
            }
        }
    };
}

impl_record!(MemberMessage, Member, user);
impl_record!(SocialMessage, Social, user);
impl_record!(ChatMessage, Chat, user);
impl_record!(LikeMessage, Like, user);
impl_record!(GiftMessage, Gift, user);
impl_record!(RoomUserSeqMessage, RoomUserSeq, no_user);
impl_record!(ControlMessage, Control, no_user);
impl_record!(FansclubMessage, Fansclub, user);

impl BarrageMessage {
    /// Returns the kind of this record.
    pub fn kind(&self) -> MessageKind {
        match self {
            BarrageMessage::Member(_) => MessageKind::Member,
            BarrageMessage::Social(_) => MessageKind::Social,
            BarrageMessage::Chat(_) => MessageKind::Chat,
            BarrageMessage::Like(_) => MessageKind::Like,
            BarrageMessage::Gift(_) => MessageKind::Gift,
            BarrageMessage::RoomUserSeq(_) => MessageKind::RoomUserSeq,
            BarrageMessage::Control(_) => MessageKind::Control,
            BarrageMessage::Fansclub(_) => MessageKind::Fansclub,
        }
    }

    /// Returns the common header block.
    pub fn common(&self) -> Option<&Common> {
        match self {
            BarrageMessage::Member(m) => m.common(),
            BarrageMessage::Social(m) => m.common(),
            BarrageMessage::Chat(m) => m.common(),
            BarrageMessage::Like(m) => m.common(),
            BarrageMessage::Gift(m) => m.common(),
            BarrageMessage::RoomUserSeq(m) => m.common(),
            BarrageMessage::Control(m) => m.common(),
            BarrageMessage::Fansclub(m) => m.common(),
        }
    }

    /// Returns the acting viewer, if any.
    pub fn user(&self) -> Option<&User> {
        match self {
            BarrageMessage::Member(m) => m.user(),
            BarrageMessage::Social(m) => m.user(),
            BarrageMessage::Chat(m) => m.user(),
            BarrageMessage::Like(m) => m.user(),
            BarrageMessage::Gift(m) => m.user(),
            BarrageMessage::RoomUserSeq(m) => m.user(),
            BarrageMessage::Control(m) => m.user(),
            BarrageMessage::Fansclub(m) => m.user(),
        }
    }

    /// Returns the message id from the common block (0 if absent).
    pub fn msg_id(&self) -> u64 {
        self.common().map(|c| c.msg_id).unwrap_or(0)
    }

    /// Returns the room id from the common block (0 if absent).
    pub fn room_id(&self) -> u64 {
        self.common().map(|c| c.room_id).unwrap_or(0)
    }

    /// Encodes the record payload.
    pub fn encode_payload(&self) -> Vec<u8> {
        match self {
            BarrageMessage::Member(m) => m.encode_to_vec(),
            BarrageMessage::Social(m) => m.encode_to_vec(),
            BarrageMessage::Chat(m) => m.encode_to_vec(),
            BarrageMessage::Like(m) => m.encode_to_vec(),
            BarrageMessage::Gift(m) => m.encode_to_vec(),
            BarrageMessage::RoomUserSeq(m) => m.encode_to_vec(),
            BarrageMessage::Control(m) => m.encode_to_vec(),
            BarrageMessage::Fansclub(m) => m.encode_to_vec(),
        }
    }
}
