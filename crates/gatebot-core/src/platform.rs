use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    domain::{ChatId, UserId},
    Result,
};

/// A chat resolved from a `@handle` or id.
#[derive(Clone, Debug)]
pub struct ResolvedChat {
    pub id: ChatId,
    pub title: Option<String>,
    /// Handle without the leading `@`, if the chat has one.
    pub username: Option<String>,
}

/// What the bot itself is allowed to do inside a chat.
#[derive(Clone, Copy, Debug, Default)]
pub struct MemberRights {
    pub is_admin: bool,
    pub can_invite_users: bool,
}

/// Messaging-platform port.
///
/// Telegram is the first implementation; every call is potentially blocking
/// I/O and must be awaited. Failures surface as `Error::Platform` with the
/// underlying error text, never as panics or silent defaults.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Resolve a `@handle` (without the `@`) to a chat identity.
    async fn resolve_handle(&self, handle: &str) -> Result<ResolvedChat>;

    /// Look up a chat by numeric id.
    async fn resolve_chat(&self, chat: ChatId) -> Result<ResolvedChat>;

    /// The bot process's own rights inside `chat`.
    async fn bot_rights(&self, chat: ChatId) -> Result<MemberRights>;

    /// The user's public username, if set.
    async fn user_username(&self, user: UserId) -> Result<Option<String>>;

    /// Number of profile photos the user exposes. Separate from the username
    /// lookup so callers only pay for (and only fail on) what they check.
    async fn user_photo_count(&self, user: UserId) -> Result<u32>;

    /// Create a chat invite link with a use-limit and expiry.
    async fn create_invite_link(
        &self,
        chat: ChatId,
        member_limit: u32,
        expires_at: DateTime<Utc>,
        name: &str,
    ) -> Result<String>;

    async fn ban_member(&self, chat: ChatId, user: UserId) -> Result<()>;
    async fn unban_member(&self, chat: ChatId, user: UserId) -> Result<()>;

    /// Direct message to a user. May fail if the user never started the bot.
    async fn send_direct(&self, user: UserId, text: &str) -> Result<()>;
}
