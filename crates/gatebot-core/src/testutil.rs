//! Shared test doubles for the core state machines.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU32, Ordering},
    sync::Mutex,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    domain::{ChatId, Portal, UserId},
    errors::Error,
    platform::{ChatPlatform, MemberRights, ResolvedChat},
    Result,
};

pub fn make_portal(owner: UserId) -> Portal {
    Portal::new(
        owner,
        ChatId(-100),
        "testchannel".into(),
        ChatId(-200),
        "Test Group".into(),
        None,
    )
}

#[derive(Clone, Debug, PartialEq)]
pub enum PlatformCall {
    Ban(ChatId, UserId),
    Unban(ChatId, UserId),
    Direct(UserId, String),
    Invite {
        chat: ChatId,
        member_limit: u32,
        expires_at: DateTime<Utc>,
    },
}

/// Scriptable `ChatPlatform` recording every side-effecting call.
#[derive(Default)]
pub struct MockPlatform {
    pub usernames: Mutex<HashMap<i64, String>>,
    pub photo_counts: Mutex<HashMap<i64, u32>>,
    pub rights: Mutex<HashMap<i64, MemberRights>>,
    pub handles: Mutex<HashMap<String, ResolvedChat>>,
    pub calls: Mutex<Vec<PlatformCall>>,
    /// When set, `user_username` fails with this transport error.
    pub profile_error: Mutex<Option<String>>,
    /// When set, `user_photo_count` fails with this transport error.
    pub photo_error: Mutex<Option<String>>,
    /// When set, `send_direct` fails (user blocked DMs).
    pub direct_fails: Mutex<bool>,
    invite_counter: AtomicU32,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_username(&self, user: UserId, username: &str) {
        self.usernames
            .lock()
            .unwrap()
            .insert(user.0, username.to_string());
    }

    pub fn set_photo_count(&self, user: UserId, count: u32) {
        self.photo_counts.lock().unwrap().insert(user.0, count);
    }

    pub fn set_rights(&self, chat: ChatId, rights: MemberRights) {
        self.rights.lock().unwrap().insert(chat.0, rights);
    }

    pub fn set_handle(&self, handle: &str, chat: ResolvedChat) {
        self.handles.lock().unwrap().insert(handle.to_string(), chat);
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatPlatform for MockPlatform {
    async fn resolve_handle(&self, handle: &str) -> Result<ResolvedChat> {
        self.handles
            .lock()
            .unwrap()
            .get(handle)
            .cloned()
            .ok_or_else(|| Error::Platform(format!("chat @{handle} not found")))
    }

    async fn resolve_chat(&self, chat: ChatId) -> Result<ResolvedChat> {
        Ok(ResolvedChat {
            id: chat,
            title: Some("Test Group".into()),
            username: None,
        })
    }

    async fn bot_rights(&self, chat: ChatId) -> Result<MemberRights> {
        Ok(self
            .rights
            .lock()
            .unwrap()
            .get(&chat.0)
            .copied()
            .unwrap_or_default())
    }

    async fn user_username(&self, user: UserId) -> Result<Option<String>> {
        if let Some(msg) = self.profile_error.lock().unwrap().clone() {
            return Err(Error::Platform(msg));
        }
        Ok(self.usernames.lock().unwrap().get(&user.0).cloned())
    }

    async fn user_photo_count(&self, user: UserId) -> Result<u32> {
        if let Some(msg) = self.photo_error.lock().unwrap().clone() {
            return Err(Error::Platform(msg));
        }
        Ok(self
            .photo_counts
            .lock()
            .unwrap()
            .get(&user.0)
            .copied()
            .unwrap_or(0))
    }

    async fn create_invite_link(
        &self,
        chat: ChatId,
        member_limit: u32,
        expires_at: DateTime<Utc>,
        _name: &str,
    ) -> Result<String> {
        self.calls.lock().unwrap().push(PlatformCall::Invite {
            chat,
            member_limit,
            expires_at,
        });
        let n = self.invite_counter.fetch_add(1, Ordering::SeqCst);
        Ok(format!("https://t.me/+invite{n}"))
    }

    async fn ban_member(&self, chat: ChatId, user: UserId) -> Result<()> {
        self.calls.lock().unwrap().push(PlatformCall::Ban(chat, user));
        Ok(())
    }

    async fn unban_member(&self, chat: ChatId, user: UserId) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(PlatformCall::Unban(chat, user));
        Ok(())
    }

    async fn send_direct(&self, user: UserId, text: &str) -> Result<()> {
        if *self.direct_fails.lock().unwrap() {
            return Err(Error::Platform("user blocked the bot".into()));
        }
        self.calls
            .lock()
            .unwrap()
            .push(PlatformCall::Direct(user, text.to_string()));
        Ok(())
    }
}
