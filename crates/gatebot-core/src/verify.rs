use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::{
    domain::{PortalId, UserId},
    errors::Error,
    platform::ChatPlatform,
    requirements::RequirementChecker,
    store::PortalStore,
    Result,
};

/// A successfully issued (or reused) admission token.
#[derive(Clone, Debug)]
pub struct VerifiedInvite {
    pub invite_link: String,
    pub expires_at: DateTime<Utc>,
    pub group_title: String,
    /// True when an unexpired stored token was handed back instead of a
    /// freshly issued one.
    pub reused: bool,
}

/// Orchestrates ban check → requirement check → ledger write → single-use
/// admission-token issuance.
pub struct VerificationEngine {
    store: Arc<dyn PortalStore>,
    platform: Arc<dyn ChatPlatform>,
    checker: RequirementChecker,
    invite_expiry_minutes: i64,
    invite_max_uses: u32,
}

impl VerificationEngine {
    pub fn new(
        store: Arc<dyn PortalStore>,
        platform: Arc<dyn ChatPlatform>,
        invite_expiry_minutes: u64,
        invite_max_uses: u32,
    ) -> Self {
        Self {
            store,
            checker: RequirementChecker::new(platform.clone()),
            platform,
            invite_expiry_minutes: invite_expiry_minutes as i64,
            invite_max_uses,
        }
    }

    /// Run the full check chain for one (portal, user) pair.
    ///
    /// Checks run in a fixed order and return on first failure: portal
    /// exists, portal active, user not banned, requirements met. On success
    /// the ledger is written `pending` then promoted to `verified` with the
    /// issued token.
    ///
    /// Repeated clicks are expected: if the pair already holds an unexpired
    /// token, that token is returned instead of issuing a new one.
    /// Concurrent duplicates are not serialized; a second issued token may
    /// overwrite the first, which is harmless (both links admit one user).
    pub async fn verify_user(
        &self,
        portal_id: &PortalId,
        user: UserId,
        username: Option<String>,
    ) -> Result<VerifiedInvite> {
        let portal = self
            .store
            .portal(portal_id)
            .await?
            .ok_or(Error::PortalNotFound)?;

        if !portal.is_active {
            return Err(Error::PortalInactive);
        }

        if self.store.is_banned(portal_id, user).await? {
            return Err(Error::UserBanned);
        }

        self.checker.check(&portal, user).await?;

        self.store
            .ensure_verification(portal_id, user, username)
            .await?;

        let now = Utc::now();
        if let Some(rec) = self.store.verification(portal_id, user).await? {
            if rec.has_live_invite(now) {
                // unwrap-free: has_live_invite guarantees both fields.
                if let (Some(link), Some(expires_at)) = (rec.invite_link, rec.invite_expires_at) {
                    info!(portal = %portal_id, user = user.0, "reusing unexpired invite");
                    return Ok(VerifiedInvite {
                        invite_link: link,
                        expires_at,
                        group_title: portal.group_title,
                        reused: true,
                    });
                }
            }
        }

        let expires_at = now + Duration::minutes(self.invite_expiry_minutes);
        let invite_link = self
            .platform
            .create_invite_link(
                portal.group,
                self.invite_max_uses,
                expires_at,
                &format!("Portal-{}", user.0),
            )
            .await?;

        self.store
            .mark_verified(portal_id, user, invite_link.clone(), expires_at)
            .await?;

        info!(portal = %portal_id, user = user.0, "user verified, invite issued");

        Ok(VerifiedInvite {
            invite_link,
            expires_at,
            group_title: portal.group_title,
            reused: false,
        })
    }
}
