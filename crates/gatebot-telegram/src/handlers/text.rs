use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode},
};

use gatebot_core::{
    callback,
    domain::{ChatId, UserId},
    errors::Error,
    formatting::escape_html,
    wizard::{WizardInput, WizardReply},
};

use crate::router::AppState;

fn setup_confirm_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback(
            "✅ Create Portal",
            callback::SETUP_CONFIRM_PAYLOAD.to_string(),
        ),
        InlineKeyboardButton::callback("❌ Cancel", callback::SETUP_CANCEL_PAYLOAD.to_string()),
    ]])
}

/// Feed a private message into the owner's live setup session.
pub async fn handle_wizard_message(
    bot: Bot,
    msg: Message,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let owner = UserId(user.id.0 as i64);

    // Forwarded messages carry an authenticated source chat; everything else
    // is treated as raw text input for the current step.
    let input = if let Some(chat) = msg.forward_from_chat() {
        WizardInput::Forwarded {
            chat: ChatId(chat.id.0),
            title: chat.title().map(str::to_string),
            username: chat.username().map(str::to_string),
        }
    } else if let Some(text) = msg.text() {
        WizardInput::Text(text.to_string())
    } else {
        return Ok(());
    };

    match state.wizard.advance(owner, input).await {
        Ok(WizardReply::ChannelAccepted { handle }) => {
            bot.send_message(
                msg.chat.id,
                format!(
                    "✅ Channel @{handle} linked.\n\nStep 2: forward a message \
                     from your private group."
                ),
            )
            .await?;
        }
        Ok(WizardReply::GroupAccepted {
            channel_handle,
            group_title,
        }) => {
            bot.send_message(
                msg.chat.id,
                format!(
                    "📋 <b>Ready to create</b>\n\n📢 Channel: @{}\n🔒 Group: \
                     {}\n\nCreate this portal?",
                    escape_html(&channel_handle),
                    escape_html(&group_title),
                ),
            )
            .parse_mode(ParseMode::Html)
            .reply_markup(setup_confirm_keyboard())
            .await?;
        }
        Ok(WizardReply::Retry { message }) => {
            bot.send_message(msg.chat.id, message).await?;
        }
        Err(Error::SessionExpired) => {
            bot.send_message(
                msg.chat.id,
                "⌛ Setup session expired. Use /portal setup to start again.",
            )
            .await?;
        }
        Err(e) => {
            bot.send_message(msg.chat.id, e.user_message()).await?;
        }
    }

    Ok(())
}
