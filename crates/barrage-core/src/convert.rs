//! Conversion from binary records to the JSON pack family.
//!
//! Lets a subscriber consume one event family whichever wire path a record
//! arrived on.

use crate::messages::{
    BarrageMessage, ChatMessage, Common, ControlMessage, FansclubMessage, GiftMessage,
    LikeMessage, MemberMessage, RoomUserSeqMessage, SocialMessage, User,
};
use crate::pack::{
    FansClubInfo, FansclubMsg, GiftMsg, LikeMsg, MemberMsg, Msg, MsgUser, PackEvent, ShareMsg,
    ShareType, UserSeqMsg,
};

/// Social action code for a follow.
pub const SOCIAL_ACTION_FOLLOW: u64 = 1;

/// Saturates at `i64::MAX`.
fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Saturates at `i32::MAX`.
fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

impl From<&User> for MsgUser {
    fn from(user: &User) -> Self {
        let follow = user.follow_info.clone().unwrap_or_default();
        Self {
            id: to_i64(user.id),
            short_id: to_i64(user.short_id),
            display_id: user.display_id.clone(),
            nickname: user.nickname.clone(),
            level: to_i32(user.level),
            pay_level: user
                .pay_grade
                .as_ref()
                .map_or(0, |g| i32::try_from(g.level).unwrap_or_default()),
            gender: to_i32(user.gender),
            head_img_url: user
                .avatar_thumb
                .as_ref()
                .and_then(|i| i.first_url())
                .unwrap_or_default()
                .to_string(),
            sec_uid: user.sec_uid.clone(),
            fans_club: user
                .fans_club
                .as_ref()
                .and_then(|c| c.data.as_ref())
                .map(|d| FansClubInfo {
                    club_name: d.club_name.clone(),
                    level: d.level,
                }),
            follower_count: to_i64(follow.follower_count),
            follow_status: to_i64(follow.follow_status),
            following_count: to_i64(follow.following_count),
            ..Default::default()
        }
    }
}

fn base(common: Option<&Common>, user: Option<&User>, content: impl Into<String>) -> Msg {
    let (msg_id, room_id) = common.map_or((0, 0), |c| (to_i64(c.msg_id), c.room_id));
    Msg {
        msg_id,
        user: user.map(MsgUser::from),
        content: content.into(),
        room_id: if room_id == 0 {
            String::new()
        } else {
            room_id.to_string()
        },
        ..Default::default()
    }
}

fn describe(common: Option<&Common>) -> String {
    common.map(|c| c.describe.clone()).unwrap_or_default()
}

fn chat(m: &ChatMessage) -> PackEvent {
    PackEvent::Chat(base(m.common.as_ref(), m.user.as_ref(), m.content.clone()))
}

fn like(m: &LikeMessage) -> PackEvent {
    PackEvent::Like(LikeMsg {
        base: base(m.common.as_ref(), m.user.as_ref(), describe(m.common.as_ref())),
        count: to_i64(m.count),
        total: to_i64(m.total),
    })
}

fn member(m: &MemberMessage) -> PackEvent {
    PackEvent::Member(MemberMsg {
        base: base(m.common.as_ref(), m.user.as_ref(), describe(m.common.as_ref())),
        current_count: to_i64(m.member_count),
        enter_tip_type: to_i64(m.enter_type),
    })
}

fn social(m: &SocialMessage) -> Option<PackEvent> {
    let msg = base(m.common.as_ref(), m.user.as_ref(), describe(m.common.as_ref()));
    if m.action == SOCIAL_ACTION_FOLLOW {
        return Some(PackEvent::Follow(msg));
    }
    if m.share_type != 0 {
        return Some(PackEvent::Share(ShareMsg {
            base: msg,
            share_type: ShareType::from(to_i64(m.share_type)),
        }));
    }
    None
}

fn gift(m: &GiftMessage) -> PackEvent {
    PackEvent::Gift(GiftMsg {
        base: base(m.common.as_ref(), m.user.as_ref(), describe(m.common.as_ref())),
        gift_id: to_i64(m.gift_id),
        gift_name: m.gift_name().to_string(),
        group_id: to_i64(m.group_id),
        gift_count: to_i64(m.group_count.max(1)),
        repeat_count: to_i64(m.repeat_count),
        diamond_count: to_i32(m.diamond_count()),
        combo: m.is_combo(),
        img_url: m
            .gift
            .as_ref()
            .and_then(|g| g.image.as_ref())
            .and_then(|i| i.first_url())
            .unwrap_or_default()
            .to_string(),
        to_user: m.to_user.as_ref().map(MsgUser::from),
    })
}

fn user_seq(m: &RoomUserSeqMessage) -> PackEvent {
    PackEvent::UserSeq(UserSeqMsg {
        base: base(m.common.as_ref(), None, describe(m.common.as_ref())),
        online_user_count: to_i64(m.total),
        total_user_count: to_i64(m.total_user),
        total_user_count_str: m.total_user_str.clone(),
        online_user_count_str: m.total_str.clone(),
    })
}

fn control(m: &ControlMessage) -> Option<PackEvent> {
    m.is_live_end().then(|| {
        PackEvent::LiveEnd(base(
            m.common.as_ref(),
            None,
            describe(m.common.as_ref()),
        ))
    })
}

fn fansclub(m: &FansclubMessage) -> PackEvent {
    PackEvent::Fansclub(FansclubMsg {
        base: base(m.common.as_ref(), m.user.as_ref(), m.content.clone()),
        r#type: m.r#type,
        level: m.user.as_ref().map_or(0, User::fans_club_level),
    })
}

impl PackEvent {
    /// Converts a binary record into its JSON-family counterpart.
    ///
    /// Social records that are neither a follow nor a share, and control
    /// records other than live-end, have no counterpart.
    pub fn from_message(message: &BarrageMessage) -> Option<PackEvent> {
        match message {
            BarrageMessage::Chat(m) => Some(chat(m)),
            BarrageMessage::Like(m) => Some(like(m)),
            BarrageMessage::Member(m) => Some(member(m)),
            BarrageMessage::Social(m) => social(m),
            BarrageMessage::Gift(m) => Some(gift(m)),
            BarrageMessage::RoomUserSeq(m) => Some(user_seq(m)),
            BarrageMessage::Control(m) => control(m),
            BarrageMessage::Fansclub(m) => Some(fansclub(m)),
        }
    }
}
