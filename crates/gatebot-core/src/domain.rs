use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric; groups use the negative-id convention).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub i64);

/// Opaque short portal identifier.
///
/// Generated once at creation and immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortalId(pub String);

const PORTAL_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const PORTAL_ID_LEN: usize = 8;

impl PortalId {
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let id: String = (0..PORTAL_ID_LEN)
            .map(|_| PORTAL_ID_ALPHABET[rng.gen_range(0..PORTAL_ID_ALPHABET.len())] as char)
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PortalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a portal challenges users. Only `Button` is evaluated today;
/// `Captcha` is persisted for forward compatibility.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationType {
    #[default]
    Button,
    Captcha,
}

/// An owner-configured gate linking a public channel to a private group.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Portal {
    pub id: PortalId,
    pub owner: UserId,
    pub channel: ChatId,
    /// Public channel handle, without the leading `@`.
    pub channel_handle: String,
    pub group: ChatId,
    pub group_title: String,
    pub welcome_message: String,
    pub verification_type: VerificationType,
    pub captcha_enabled: bool,
    /// Reserved: the platform does not expose account-creation time,
    /// so this is persisted but never evaluated.
    pub min_account_age_days: u32,
    pub require_profile_photo: bool,
    pub require_username: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Portal {
    pub fn new(
        owner: UserId,
        channel: ChatId,
        channel_handle: String,
        group: ChatId,
        group_title: String,
        welcome_message: Option<String>,
    ) -> Self {
        let now = Utc::now();
        let welcome_message = welcome_message
            .unwrap_or_else(|| default_welcome_message(&group_title));
        Self {
            id: PortalId::generate(),
            owner,
            channel,
            channel_handle,
            group,
            group_title,
            welcome_message,
            verification_type: VerificationType::default(),
            captcha_enabled: false,
            min_account_age_days: 0,
            require_profile_photo: false,
            require_username: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

pub fn default_welcome_message(group_title: &str) -> String {
    format!(
        "🔐 Portal Verification\n\nWelcome! To join {group_title}, you need to \
         verify yourself.\n\nClick the button below to start verification."
    )
}

/// Explicit patch of the mutable portal fields.
///
/// Only the fields enumerated here may change after creation; identity,
/// owner and the channel/group link are immutable.
#[derive(Clone, Debug, Default)]
pub struct PortalPatch {
    pub welcome_message: Option<String>,
    pub verification_type: Option<VerificationType>,
    pub captcha_enabled: Option<bool>,
    pub min_account_age_days: Option<u32>,
    pub require_profile_photo: Option<bool>,
    pub require_username: Option<bool>,
    pub is_active: Option<bool>,
}

impl PortalPatch {
    pub fn is_empty(&self) -> bool {
        self.welcome_message.is_none()
            && self.verification_type.is_none()
            && self.captcha_enabled.is_none()
            && self.min_account_age_days.is_none()
            && self.require_profile_photo.is_none()
            && self.require_username.is_none()
            && self.is_active.is_none()
    }

    pub fn apply(&self, portal: &mut Portal) {
        if let Some(v) = &self.welcome_message {
            portal.welcome_message = v.clone();
        }
        if let Some(v) = self.verification_type {
            portal.verification_type = v;
        }
        if let Some(v) = self.captcha_enabled {
            portal.captcha_enabled = v;
        }
        if let Some(v) = self.min_account_age_days {
            portal.min_account_age_days = v;
        }
        if let Some(v) = self.require_profile_photo {
            portal.require_profile_photo = v;
        }
        if let Some(v) = self.require_username {
            portal.require_username = v;
        }
        if let Some(v) = self.is_active {
            portal.is_active = v;
        }
        portal.updated_at = Utc::now();
    }
}

/// Outcome of a user's challenge for one portal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Joined,
}

impl VerificationStatus {
    /// Status transitions are monotonic: pending → verified → joined.
    pub fn can_advance_to(self, next: VerificationStatus) -> bool {
        next > self
    }
}

/// Per-(portal, user) record of challenge outcome and issued admission token.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Verification {
    pub portal_id: PortalId,
    pub user_id: UserId,
    pub username: Option<String>,
    pub status: VerificationStatus,
    pub verified_at: Option<DateTime<Utc>>,
    pub invite_link: Option<String>,
    pub invite_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Verification {
    pub fn pending(portal_id: PortalId, user_id: UserId, username: Option<String>) -> Self {
        Self {
            portal_id,
            user_id,
            username,
            status: VerificationStatus::Pending,
            verified_at: None,
            invite_link: None,
            invite_expires_at: None,
            created_at: Utc::now(),
        }
    }

    /// True when a stored invite token exists and has not expired yet.
    pub fn has_live_invite(&self, now: DateTime<Utc>) -> bool {
        match (&self.invite_link, self.invite_expires_at) {
            (Some(_), Some(expires)) => expires > now,
            _ => false,
        }
    }
}

/// Owner-issued exclusion. Re-banning overwrites the prior record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BannedUser {
    pub portal_id: PortalId,
    pub user_id: UserId,
    pub reason: String,
    pub banned_by: UserId,
    pub banned_at: DateTime<Utc>,
}

/// Count-by-status aggregate for one portal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PortalStats {
    pub pending: u64,
    pub verified: u64,
    pub joined: u64,
    pub banned: u64,
}
