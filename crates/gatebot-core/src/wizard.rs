use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::Mutex;
use tracing::info;

use crate::{
    domain::{ChatId, Portal, UserId},
    errors::Error,
    platform::ChatPlatform,
    store::PortalStore,
    Result,
};

const MSG_CHANNEL_PROMPT: &str =
    "Please forward a message from your channel or send its username (e.g. @yourchannel).";
const MSG_CHANNEL_NOT_ADMIN: &str =
    "Bot is not an admin in this channel!\n\nPlease make the bot an admin and try again.";
const MSG_GROUP_PROMPT: &str = "Please forward a message from your private group.";
const MSG_GROUP_LINK_REJECTED: &str =
    "Please forward a message from the group instead of sending a link.";
const MSG_GROUP_NOT_ADMIN: &str =
    "Bot is not an admin in this group!\n\nPlease make the bot an admin with 'Invite Users' permission.";
const MSG_GROUP_NO_INVITE: &str =
    "Bot doesn't have 'Invite Users' permission!\n\nPlease enable this permission for the bot.";
const MSG_AWAITING_BUTTONS: &str = "Use the Create Portal / Cancel buttons to finish setup.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WizardStep {
    AwaitingChannel,
    AwaitingGroup,
    AwaitingConfirmation,
}

/// Ephemeral per-owner onboarding state. Never persisted.
#[derive(Clone, Debug)]
pub struct SetupSession {
    pub step: WizardStep,
    channel: Option<(ChatId, String)>,
    group: Option<(ChatId, String)>,
    started_at: Instant,
}

impl SetupSession {
    fn new() -> Self {
        Self {
            step: WizardStep::AwaitingChannel,
            channel: None,
            group: None,
            started_at: Instant::now(),
        }
    }
}

/// Bounded, TTL-evicting session map keyed by owner.
///
/// Injected into the wizard instead of living as process-global state.
/// Capacity overflow evicts the oldest session; expired sessions surface as
/// `SessionExpired` on the next step.
pub struct SetupSessions {
    ttl: Duration,
    capacity: usize,
    inner: Mutex<HashMap<i64, SetupSession>>,
}

impl SetupSessions {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            inner: Mutex::new(HashMap::new()),
        }
    }

    async fn insert(&self, owner: UserId) {
        let mut map = self.inner.lock().await;
        let now = Instant::now();
        map.retain(|_, s| now.duration_since(s.started_at) < self.ttl);

        if map.len() >= self.capacity && !map.contains_key(&owner.0) {
            if let Some(oldest) = map
                .iter()
                .min_by_key(|(_, s)| s.started_at)
                .map(|(k, _)| *k)
            {
                map.remove(&oldest);
            }
        }

        map.insert(owner.0, SetupSession::new());
    }

    async fn get(&self, owner: UserId) -> Option<SetupSession> {
        let mut map = self.inner.lock().await;
        match map.get(&owner.0) {
            Some(s) if s.started_at.elapsed() < self.ttl => Some(s.clone()),
            Some(_) => {
                map.remove(&owner.0);
                None
            }
            None => None,
        }
    }

    /// Store back an updated session; false if it vanished in the meantime.
    async fn put(&self, owner: UserId, session: SetupSession) -> bool {
        let mut map = self.inner.lock().await;
        if !map.contains_key(&owner.0) {
            return false;
        }
        map.insert(owner.0, session);
        true
    }

    async fn remove(&self, owner: UserId) -> Option<SetupSession> {
        self.inner.lock().await.remove(&owner.0)
    }
}

/// What the user fed into the current wizard step.
#[derive(Clone, Debug)]
pub enum WizardInput {
    /// Forwarded-message provenance: authenticated chat identity.
    Forwarded {
        chat: ChatId,
        title: Option<String>,
        username: Option<String>,
    },
    Text(String),
}

/// Step outcome handed back to the message handler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WizardReply {
    /// Channel verified; now awaiting the destination group.
    ChannelAccepted { handle: String },
    /// Group verified; now awaiting the confirm/cancel buttons.
    GroupAccepted {
        channel_handle: String,
        group_title: String,
    },
    /// Step failed; state unchanged, user should retry.
    Retry { message: String },
}

/// Per-owner, multi-step onboarding state machine producing a new Portal.
pub struct SetupWizard {
    store: Arc<dyn PortalStore>,
    platform: Arc<dyn ChatPlatform>,
    sessions: Arc<SetupSessions>,
}

impl SetupWizard {
    pub fn new(
        store: Arc<dyn PortalStore>,
        platform: Arc<dyn ChatPlatform>,
        sessions: Arc<SetupSessions>,
    ) -> Self {
        Self {
            store,
            platform,
            sessions,
        }
    }

    /// Begin (or restart) onboarding for an owner. A live session for the
    /// same owner is superseded.
    pub async fn start(&self, owner: UserId) {
        self.sessions.insert(owner).await;
        info!(owner = owner.0, "portal setup started");
    }

    pub async fn has_session(&self, owner: UserId) -> bool {
        self.sessions.get(owner).await.is_some()
    }

    /// Feed one message into the owner's current step.
    pub async fn advance(&self, owner: UserId, input: WizardInput) -> Result<WizardReply> {
        let session = self.sessions.get(owner).await.ok_or(Error::SessionExpired)?;

        match session.step {
            WizardStep::AwaitingChannel => self.advance_channel(owner, session, input).await,
            WizardStep::AwaitingGroup => self.advance_group(owner, session, input).await,
            WizardStep::AwaitingConfirmation => Ok(WizardReply::Retry {
                message: MSG_AWAITING_BUTTONS.to_string(),
            }),
        }
    }

    async fn advance_channel(
        &self,
        owner: UserId,
        mut session: SetupSession,
        input: WizardInput,
    ) -> Result<WizardReply> {
        let (chat, handle) = match input {
            WizardInput::Forwarded { chat, username, .. } => {
                let handle = username.unwrap_or_else(|| chat.0.to_string());
                (chat, handle)
            }
            WizardInput::Text(text) => {
                let text = text.trim();
                let Some(handle) = text.strip_prefix('@') else {
                    return Ok(WizardReply::Retry {
                        message: MSG_CHANNEL_PROMPT.to_string(),
                    });
                };
                match self.platform.resolve_handle(handle).await {
                    Ok(resolved) => {
                        let handle = resolved.username.unwrap_or_else(|| handle.to_string());
                        (resolved.id, handle)
                    }
                    Err(e) => {
                        return Ok(WizardReply::Retry {
                            message: e.user_message(),
                        })
                    }
                }
            }
        };

        // The bot itself must hold admin rights on the channel.
        match self.platform.bot_rights(chat).await {
            Ok(rights) if rights.is_admin => {}
            Ok(_) => {
                return Ok(WizardReply::Retry {
                    message: MSG_CHANNEL_NOT_ADMIN.to_string(),
                })
            }
            Err(e) => {
                return Ok(WizardReply::Retry {
                    message: e.user_message(),
                })
            }
        }

        session.channel = Some((chat, handle.clone()));
        session.step = WizardStep::AwaitingGroup;
        if !self.sessions.put(owner, session).await {
            return Err(Error::SessionExpired);
        }
        Ok(WizardReply::ChannelAccepted { handle })
    }

    async fn advance_group(
        &self,
        owner: UserId,
        mut session: SetupSession,
        input: WizardInput,
    ) -> Result<WizardReply> {
        let (chat, title) = match input {
            WizardInput::Forwarded { chat, title, .. } => {
                (chat, title.unwrap_or_else(|| "Private Group".to_string()))
            }
            WizardInput::Text(text) => {
                let text = text.trim();
                // A bare invite link carries no authenticated identity.
                if text.contains("t.me/") {
                    return Ok(WizardReply::Retry {
                        message: MSG_GROUP_LINK_REJECTED.to_string(),
                    });
                }
                let Ok(group_id) = text.parse::<i64>() else {
                    return Ok(WizardReply::Retry {
                        message: MSG_GROUP_PROMPT.to_string(),
                    });
                };
                if group_id >= 0 {
                    return Ok(WizardReply::Retry {
                        message: MSG_GROUP_PROMPT.to_string(),
                    });
                }
                match self.platform.resolve_chat(ChatId(group_id)).await {
                    Ok(resolved) => (
                        resolved.id,
                        resolved.title.unwrap_or_else(|| "Private Group".to_string()),
                    ),
                    Err(e) => {
                        return Ok(WizardReply::Retry {
                            message: e.user_message(),
                        })
                    }
                }
            }
        };

        // Admin rights and invite capability are reported separately so the
        // owner knows exactly what to fix.
        match self.platform.bot_rights(chat).await {
            Ok(rights) if !rights.is_admin => {
                return Ok(WizardReply::Retry {
                    message: MSG_GROUP_NOT_ADMIN.to_string(),
                })
            }
            Ok(rights) if !rights.can_invite_users => {
                return Ok(WizardReply::Retry {
                    message: MSG_GROUP_NO_INVITE.to_string(),
                })
            }
            Ok(_) => {}
            Err(e) => {
                return Ok(WizardReply::Retry {
                    message: e.user_message(),
                })
            }
        }

        let channel_handle = session
            .channel
            .as_ref()
            .map(|(_, h)| h.clone())
            .unwrap_or_default();
        session.group = Some((chat, title.clone()));
        session.step = WizardStep::AwaitingConfirmation;
        if !self.sessions.put(owner, session).await {
            return Err(Error::SessionExpired);
        }
        Ok(WizardReply::GroupAccepted {
            channel_handle,
            group_title: title,
        })
    }

    /// Confirm button: create and persist the Portal, clear the session.
    pub async fn confirm(&self, owner: UserId) -> Result<Portal> {
        let Some(session) = self.sessions.get(owner).await else {
            return Err(Error::SessionExpired);
        };
        if session.step != WizardStep::AwaitingConfirmation {
            return Err(Error::SessionExpired);
        }
        let (Some((channel, handle)), Some((group, title))) =
            (session.channel.clone(), session.group.clone())
        else {
            return Err(Error::SessionExpired);
        };

        let portal = Portal::new(owner, channel, handle, group, title, None);
        self.store.create_portal(portal.clone()).await?;
        self.sessions.remove(owner).await;

        info!(owner = owner.0, portal = %portal.id, "portal created");
        Ok(portal)
    }

    /// Cancel button: clear the session without creating anything.
    pub async fn cancel(&self, owner: UserId) -> Result<()> {
        match self.sessions.remove(owner).await {
            Some(_) => {
                info!(owner = owner.0, "portal setup cancelled");
                Ok(())
            }
            None => Err(Error::SessionExpired),
        }
    }
}
