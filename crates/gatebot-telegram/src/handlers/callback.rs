use std::sync::Arc;

use teloxide::{prelude::*, types::ParseMode};

use gatebot_core::{
    callback::{parse_callback, CallbackAction},
    domain::{PortalId, UserId},
    formatting,
};

use crate::router::AppState;

use super::commands::settings_keyboard;

pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let cb_id = q.id.clone();
    let data = q.data.clone().unwrap_or_default();

    // Every callback query gets answered, even unrecognized ones, or the
    // client keeps its spinner.
    let Some(action) = parse_callback(&data) else {
        let _ = bot.answer_callback_query(cb_id).await;
        return Ok(());
    };

    let actor = UserId(q.from.id.0 as i64);

    match action {
        CallbackAction::Verify(id) => {
            match state
                .engine
                .verify_user(&id, actor, q.from.username.clone())
                .await
            {
                Ok(invite) => {
                    let text = formatting::verification_success(
                        &invite.group_title,
                        &invite.invite_link,
                        state.cfg.invite_expiry_minutes(),
                    );
                    // The link goes out via DM so it never appears in the
                    // public channel.
                    let dm = bot
                        .send_message(teloxide::types::ChatId(actor.0), text)
                        .parse_mode(ParseMode::Html)
                        .await;
                    match dm {
                        Ok(_) => {
                            let _ = bot
                                .answer_callback_query(cb_id)
                                .text("✅ Verified! Check your private messages.")
                                .await;
                        }
                        Err(_) => {
                            let _ = bot
                                .answer_callback_query(cb_id)
                                .text(
                                    "Please open a private chat with me first, \
                                     then press Verify again.",
                                )
                                .show_alert(true)
                                .await;
                        }
                    }
                }
                Err(e) => {
                    let _ = bot
                        .answer_callback_query(cb_id)
                        .text(e.user_message())
                        .show_alert(true)
                        .await;
                }
            }
        }

        CallbackAction::ToggleActive(id) => {
            match state.service.toggle_active(actor, &id).await {
                Ok(active) => {
                    let note = if active {
                        "Portal activated"
                    } else {
                        "Portal deactivated"
                    };
                    let _ = bot.answer_callback_query(cb_id).text(note).await;
                    refresh_settings(&bot, &q, &state, actor, &id).await;
                }
                Err(e) => answer_error(&bot, cb_id, e).await,
            }
        }

        CallbackAction::ToggleRequireUsername(id) => {
            match state.service.toggle_require_username(actor, &id).await {
                Ok(on) => {
                    let note = if on {
                        "Username now required"
                    } else {
                        "Username no longer required"
                    };
                    let _ = bot.answer_callback_query(cb_id).text(note).await;
                    refresh_settings(&bot, &q, &state, actor, &id).await;
                }
                Err(e) => answer_error(&bot, cb_id, e).await,
            }
        }

        CallbackAction::ToggleRequirePhoto(id) => {
            match state.service.toggle_require_photo(actor, &id).await {
                Ok(on) => {
                    let note = if on {
                        "Profile photo now required"
                    } else {
                        "Profile photo no longer required"
                    };
                    let _ = bot.answer_callback_query(cb_id).text(note).await;
                    refresh_settings(&bot, &q, &state, actor, &id).await;
                }
                Err(e) => answer_error(&bot, cb_id, e).await,
            }
        }

        CallbackAction::ConfirmDelete(id) => {
            match state.service.delete_portal(actor, &id).await {
                Ok(()) => {
                    let _ = bot.answer_callback_query(cb_id).await;
                    edit_origin(&bot, &q, "🗑 Portal deleted.").await;
                }
                Err(e) => answer_error(&bot, cb_id, e).await,
            }
        }

        CallbackAction::CancelDelete => {
            let _ = bot.answer_callback_query(cb_id).await;
            edit_origin(&bot, &q, "Deletion cancelled.").await;
        }

        CallbackAction::SetupConfirm => match state.wizard.confirm(actor).await {
            Ok(portal) => {
                let _ = bot.answer_callback_query(cb_id).await;
                if let Some(msg) = &q.message {
                    let _ = bot
                        .edit_message_text(msg.chat.id, msg.id, formatting::portal_created(&portal))
                        .parse_mode(ParseMode::Html)
                        .await;
                }
            }
            Err(e) => answer_error(&bot, cb_id, e).await,
        },

        CallbackAction::SetupCancel => match state.wizard.cancel(actor).await {
            Ok(()) => {
                let _ = bot.answer_callback_query(cb_id).await;
                edit_origin(&bot, &q, "Setup cancelled.").await;
            }
            Err(e) => answer_error(&bot, cb_id, e).await,
        },
    }

    Ok(())
}

async fn answer_error(bot: &Bot, cb_id: String, e: gatebot_core::Error) {
    let _ = bot
        .answer_callback_query(cb_id)
        .text(e.user_message())
        .show_alert(true)
        .await;
}

async fn edit_origin(bot: &Bot, q: &CallbackQuery, text: &str) {
    if let Some(msg) = &q.message {
        let _ = bot.edit_message_text(msg.chat.id, msg.id, text).await;
    }
}

/// Re-render the settings panel in place after a toggle.
async fn refresh_settings(
    bot: &Bot,
    q: &CallbackQuery,
    state: &AppState,
    actor: UserId,
    id: &PortalId,
) {
    let Some(msg) = &q.message else {
        return;
    };
    let Ok(portal) = state.service.owned_portal(actor, id).await else {
        return;
    };
    let _ = bot
        .edit_message_text(msg.chat.id, msg.id, formatting::portal_settings_text(&portal))
        .parse_mode(ParseMode::Html)
        .reply_markup(settings_keyboard(&portal))
        .await;
}
