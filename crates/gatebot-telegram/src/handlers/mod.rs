//! Telegram update handlers.
//!
//! Each handler is a thin adapter: it extracts what the core state machines
//! need from the raw update, calls into `gatebot-core`, and renders the
//! outcome back to the chat. Group chatter never reaches the wizard or the
//! command surface; only `chat_member` updates matter outside private chats.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, ChatMemberUpdated, Message},
};

use gatebot_core::domain::UserId;

use crate::router::AppState;

mod callback;
mod commands;
mod member;
mod text;

pub async fn handle_chat_member(
    upd: ChatMemberUpdated,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    member::handle_chat_member(upd, state).await
}

pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    callback::handle_callback(bot, q, state).await
}

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    if !msg.chat.is_private() {
        return Ok(());
    }
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let owner = UserId(user.id.0 as i64);

    if let Some(text) = msg.text() {
        if text.starts_with('/') {
            return commands::handle_command(bot, msg, state).await;
        }
    }

    // Non-command private messages only matter mid-setup.
    if state.wizard.has_session(owner).await {
        return text::handle_wizard_message(bot, msg, state).await;
    }

    Ok(())
}
