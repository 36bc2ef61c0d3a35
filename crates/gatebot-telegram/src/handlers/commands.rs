use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode},
};

use gatebot_core::{
    callback,
    domain::{Portal, PortalId, UserId},
    formatting,
};

use crate::router::AppState;

const START_TEXT: &str = "👋 <b>Portal Bot</b>\n\nI gate access to private \
    groups behind a verification button in your public channel.\n\nUse \
    <code>/portal setup</code> to create a portal, or /help for all commands.";

const HELP_TEXT: &str = "<b>Commands</b>\n\n\
    <code>/portal setup</code> - Create a new portal\n\
    <code>/portal list</code> - List your portals\n\
    <code>/portal post &lt;id&gt;</code> - Publish the verification post\n\
    <code>/portal stats &lt;id&gt;</code> - View statistics\n\
    <code>/portal settings &lt;id&gt;</code> - Toggle requirements\n\
    <code>/portal delete &lt;id&gt;</code> - Delete a portal\n\
    <code>/portal ban &lt;id&gt; &lt;user_id&gt; [reason]</code> - Ban a user \
    from verifying\n\
    <code>/portal unban &lt;id&gt; &lt;user_id&gt;</code> - Lift a ban";

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

pub(crate) fn settings_keyboard(portal: &Portal) -> InlineKeyboardMarkup {
    let active_label = if portal.is_active {
        "🔴 Deactivate"
    } else {
        "🟢 Activate"
    };
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(
            active_label,
            callback::toggle_payload(&portal.id),
        )],
        vec![InlineKeyboardButton::callback(
            "👤 Toggle username requirement",
            callback::req_username_payload(&portal.id),
        )],
        vec![InlineKeyboardButton::callback(
            "🖼️ Toggle photo requirement",
            callback::req_photo_payload(&portal.id),
        )],
    ])
}

fn delete_keyboard(id: &PortalId) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("🗑 Delete", callback::confirm_delete_payload(id)),
        InlineKeyboardButton::callback("Cancel", callback::CANCEL_DELETE_PAYLOAD.to_string()),
    ]])
}

pub async fn handle_command(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let owner = UserId(user.id.0 as i64);
    let (cmd, args) = parse_command(msg.text().unwrap_or_default());

    match cmd.as_str() {
        "start" => {
            bot.send_message(msg.chat.id, START_TEXT)
                .parse_mode(ParseMode::Html)
                .await?;
        }
        "help" => {
            bot.send_message(msg.chat.id, HELP_TEXT)
                .parse_mode(ParseMode::Html)
                .await?;
        }
        "portal" => {
            handle_portal(&bot, &msg, &state, owner, &args).await?;
        }
        _ => {
            bot.send_message(msg.chat.id, "Unknown command. See /help.")
                .await?;
        }
    }

    Ok(())
}

async fn handle_portal(
    bot: &Bot,
    msg: &Message,
    state: &AppState,
    owner: UserId,
    args: &str,
) -> ResponseResult<()> {
    let mut words = args.split_whitespace();
    let sub = words.next().unwrap_or("");

    match sub {
        "setup" => {
            state.wizard.start(owner).await;
            bot.send_message(
                msg.chat.id,
                "🛠 Let's set up a portal.\n\nStep 1: forward a message from \
                 your public channel, or send its username (e.g. @yourchannel).",
            )
            .await?;
        }

        "list" => match state.service.list_portals(owner).await {
            Ok(summaries) => {
                bot.send_message(msg.chat.id, formatting::portal_list(&summaries))
                    .parse_mode(ParseMode::Html)
                    .await?;
            }
            Err(e) => {
                bot.send_message(msg.chat.id, e.user_message()).await?;
            }
        },

        "post" => {
            let Some(id) = words.next() else {
                bot.send_message(msg.chat.id, "Usage: /portal post <id>").await?;
                return Ok(());
            };
            let id = PortalId(id.to_string());
            match state.service.owned_portal(owner, &id).await {
                Ok(portal) => {
                    let post =
                        formatting::channel_post(&portal, state.cfg.invite_expiry_minutes());
                    let keyboard = InlineKeyboardMarkup::new(vec![vec![
                        InlineKeyboardButton::callback(post.button_text, post.callback_data),
                    ]]);
                    let sent = bot
                        .send_message(teloxide::types::ChatId(portal.channel.0), post.text)
                        .parse_mode(ParseMode::Html)
                        .reply_markup(keyboard)
                        .await;
                    let reply = match sent {
                        Ok(_) => format!(
                            "✅ Verification post published to @{}.",
                            portal.channel_handle
                        ),
                        Err(e) => format!("❌ Could not post to the channel: {e}"),
                    };
                    bot.send_message(msg.chat.id, reply).await?;
                }
                Err(e) => {
                    bot.send_message(msg.chat.id, e.user_message()).await?;
                }
            }
        }

        "stats" => {
            let Some(id) = words.next() else {
                bot.send_message(msg.chat.id, "Usage: /portal stats <id>").await?;
                return Ok(());
            };
            let id = PortalId(id.to_string());
            let rendered = match state.service.owned_portal(owner, &id).await {
                Ok(portal) => match state.service.portal_stats(owner, &id).await {
                    Ok(stats) => formatting::portal_stats_text(&portal, &stats),
                    Err(e) => e.user_message(),
                },
                Err(e) => e.user_message(),
            };
            bot.send_message(msg.chat.id, rendered)
                .parse_mode(ParseMode::Html)
                .await?;
        }

        "settings" => {
            let Some(id) = words.next() else {
                bot.send_message(msg.chat.id, "Usage: /portal settings <id>").await?;
                return Ok(());
            };
            let id = PortalId(id.to_string());
            match state.service.owned_portal(owner, &id).await {
                Ok(portal) => {
                    bot.send_message(msg.chat.id, formatting::portal_settings_text(&portal))
                        .parse_mode(ParseMode::Html)
                        .reply_markup(settings_keyboard(&portal))
                        .await?;
                }
                Err(e) => {
                    bot.send_message(msg.chat.id, e.user_message()).await?;
                }
            }
        }

        "delete" => {
            let Some(id) = words.next() else {
                bot.send_message(msg.chat.id, "Usage: /portal delete <id>").await?;
                return Ok(());
            };
            let id = PortalId(id.to_string());
            match state.service.owned_portal(owner, &id).await {
                Ok(portal) => {
                    bot.send_message(msg.chat.id, formatting::delete_confirmation_text(&portal))
                        .parse_mode(ParseMode::Html)
                        .reply_markup(delete_keyboard(&id))
                        .await?;
                }
                Err(e) => {
                    bot.send_message(msg.chat.id, e.user_message()).await?;
                }
            }
        }

        "ban" => {
            let (Some(id), Some(target)) = (words.next(), words.next()) else {
                bot.send_message(msg.chat.id, "Usage: /portal ban <id> <user_id> [reason]")
                    .await?;
                return Ok(());
            };
            let Ok(target) = target.parse::<i64>() else {
                bot.send_message(msg.chat.id, "User id must be numeric.").await?;
                return Ok(());
            };
            let reason = {
                let r = words.collect::<Vec<_>>().join(" ");
                if r.is_empty() {
                    "banned by owner".to_string()
                } else {
                    r
                }
            };
            let id = PortalId(id.to_string());
            let reply = match state
                .service
                .ban_user(owner, &id, UserId(target), reason)
                .await
            {
                Ok(()) => format!("🚫 User {target} banned from this portal."),
                Err(e) => e.user_message(),
            };
            bot.send_message(msg.chat.id, reply).await?;
        }

        "unban" => {
            let (Some(id), Some(target)) = (words.next(), words.next()) else {
                bot.send_message(msg.chat.id, "Usage: /portal unban <id> <user_id>")
                    .await?;
                return Ok(());
            };
            let Ok(target) = target.parse::<i64>() else {
                bot.send_message(msg.chat.id, "User id must be numeric.").await?;
                return Ok(());
            };
            let id = PortalId(id.to_string());
            let reply = match state.service.unban_user(owner, &id, UserId(target)).await {
                Ok(()) => format!("✅ User {target} unbanned."),
                Err(e) => e.user_message(),
            };
            bot.send_message(msg.chat.id, reply).await?;
        }

        _ => {
            bot.send_message(
                msg.chat.id,
                "Usage: /portal <setup|list|post|stats|settings|delete|ban|unban>",
            )
            .await?;
        }
    }

    Ok(())
}
