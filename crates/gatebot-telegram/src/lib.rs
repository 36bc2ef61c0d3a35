//! Telegram adapter (teloxide).
//!
//! This crate implements the `gatebot-core` ChatPlatform port over the
//! Telegram Bot API and hosts the update router and handlers.

use async_trait::async_trait;

use chrono::{DateTime, Utc};
use teloxide::{prelude::*, types::Recipient};
use tokio::time::sleep;

pub mod handlers;
pub mod router;

use gatebot_core::{
    domain::{ChatId, UserId},
    errors::Error,
    platform::{ChatPlatform, MemberRights, ResolvedChat},
    Result,
};

#[derive(Clone)]
pub struct TelegramPortal {
    bot: Bot,
    bot_user_id: teloxide::types::UserId,
}

impl TelegramPortal {
    pub fn new(bot: Bot, bot_user_id: teloxide::types::UserId) -> Self {
        Self { bot, bot_user_id }
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    fn tg_chat(chat: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat.0)
    }

    fn tg_user(user: UserId) -> teloxide::types::UserId {
        teloxide::types::UserId(user.0 as u64)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Platform(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }

    fn resolved_from(chat: &teloxide::types::Chat) -> ResolvedChat {
        ResolvedChat {
            id: ChatId(chat.id.0),
            title: chat.title().map(str::to_string),
            username: chat.username().map(str::to_string),
        }
    }
}

#[async_trait]
impl ChatPlatform for TelegramPortal {
    async fn resolve_handle(&self, handle: &str) -> Result<ResolvedChat> {
        let recipient = Recipient::ChannelUsername(format!("@{handle}"));
        let chat = self
            .with_retry(|| self.bot.get_chat(recipient.clone()))
            .await?;
        Ok(Self::resolved_from(&chat))
    }

    async fn resolve_chat(&self, chat: ChatId) -> Result<ResolvedChat> {
        let chat = self
            .with_retry(|| self.bot.get_chat(Self::tg_chat(chat)))
            .await?;
        Ok(Self::resolved_from(&chat))
    }

    async fn bot_rights(&self, chat: ChatId) -> Result<MemberRights> {
        let member = self
            .with_retry(|| self.bot.get_chat_member(Self::tg_chat(chat), self.bot_user_id))
            .await?;

        use teloxide::types::ChatMemberKind;
        Ok(match member.kind {
            ChatMemberKind::Owner(_) => MemberRights {
                is_admin: true,
                can_invite_users: true,
            },
            ChatMemberKind::Administrator(a) => MemberRights {
                is_admin: true,
                can_invite_users: a.can_invite_users,
            },
            _ => MemberRights::default(),
        })
    }

    async fn user_username(&self, user: UserId) -> Result<Option<String>> {
        // A user's private chat carries the username.
        let chat = self
            .with_retry(|| self.bot.get_chat(Self::tg_chat(ChatId(user.0))))
            .await?;
        Ok(chat.username().map(str::to_string))
    }

    async fn user_photo_count(&self, user: UserId) -> Result<u32> {
        let photos = self
            .with_retry(|| self.bot.get_user_profile_photos(Self::tg_user(user)))
            .await?;
        Ok(photos.total_count)
    }

    async fn create_invite_link(
        &self,
        chat: ChatId,
        member_limit: u32,
        expires_at: DateTime<Utc>,
        name: &str,
    ) -> Result<String> {
        let link = self
            .with_retry(|| {
                self.bot
                    .create_chat_invite_link(Self::tg_chat(chat))
                    .member_limit(member_limit)
                    .expire_date(expires_at)
                    .name(name.to_string())
            })
            .await?;
        Ok(link.invite_link)
    }

    async fn ban_member(&self, chat: ChatId, user: UserId) -> Result<()> {
        self.with_retry(|| self.bot.ban_chat_member(Self::tg_chat(chat), Self::tg_user(user)))
            .await?;
        Ok(())
    }

    async fn unban_member(&self, chat: ChatId, user: UserId) -> Result<()> {
        self.with_retry(|| self.bot.unban_chat_member(Self::tg_chat(chat), Self::tg_user(user)))
            .await?;
        Ok(())
    }

    async fn send_direct(&self, user: UserId, text: &str) -> Result<()> {
        self.with_retry(|| {
            self.bot
                .send_message(Self::tg_chat(ChatId(user.0)), text.to_string())
        })
        .await?;
        Ok(())
    }
}
