use std::sync::Arc;

use teloxide::{prelude::*, types::ChatMemberKind, types::ChatMemberUpdated};
use tracing::warn;

use gatebot_core::{
    domain::{ChatId, UserId},
    guard::{MembershipEvent, MembershipStatus},
};

use crate::router::AppState;

fn status_of(kind: &ChatMemberKind) -> MembershipStatus {
    match kind {
        ChatMemberKind::Owner(_) => MembershipStatus::Owner,
        ChatMemberKind::Administrator(_) => MembershipStatus::Administrator,
        ChatMemberKind::Member => MembershipStatus::Member,
        ChatMemberKind::Restricted(_) => MembershipStatus::Restricted,
        ChatMemberKind::Left => MembershipStatus::Left,
        ChatMemberKind::Banned(_) => MembershipStatus::Banned,
    }
}

pub async fn handle_chat_member(
    upd: ChatMemberUpdated,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let event = MembershipEvent {
        chat: ChatId(upd.chat.id.0),
        chat_title: upd.chat.title().unwrap_or("this group").to_string(),
        user: UserId(upd.new_chat_member.user.id.0 as i64),
        new_status: status_of(&upd.new_chat_member.kind),
    };

    // Guard failures must never take down the dispatcher.
    if let Err(e) = state.guard.handle_event(&event).await {
        warn!(chat = event.chat.0, user = event.user.0, error = %e, "membership guard failed");
    }

    Ok(())
}
