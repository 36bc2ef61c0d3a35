use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    domain::{
        BannedUser, ChatId, Portal, PortalId, PortalPatch, PortalStats, UserId, Verification,
        VerificationStatus,
    },
    errors::Error,
    store::PortalStore,
    Result,
};

#[derive(Default)]
struct Inner {
    portals: HashMap<PortalId, Portal>,
    verifications: HashMap<(PortalId, UserId), Verification>,
    bans: HashMap<(PortalId, UserId), BannedUser>,
}

/// In-memory `PortalStore`.
///
/// Interior mutability via a single `RwLock`; handlers for different
/// (portal, user) pairs run concurrently and only serialize on the lock.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PortalStore for MemoryStore {
    async fn create_portal(&self, portal: Portal) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.portals.contains_key(&portal.id) {
            return Err(Error::Store(format!(
                "portal id collision: {}",
                portal.id
            )));
        }
        inner.portals.insert(portal.id.clone(), portal);
        Ok(())
    }

    async fn portal(&self, id: &PortalId) -> Result<Option<Portal>> {
        Ok(self.inner.read().await.portals.get(id).cloned())
    }

    async fn portal_by_group(&self, group: ChatId) -> Result<Option<Portal>> {
        Ok(self
            .inner
            .read()
            .await
            .portals
            .values()
            .find(|p| p.group == group && p.is_active)
            .cloned())
    }

    async fn portals_by_owner(&self, owner: UserId) -> Result<Vec<Portal>> {
        let inner = self.inner.read().await;
        let mut out: Vec<Portal> = inner
            .portals
            .values()
            .filter(|p| p.owner == owner)
            .cloned()
            .collect();
        out.sort_by_key(|p| p.created_at);
        Ok(out)
    }

    async fn update_portal(&self, id: &PortalId, patch: &PortalPatch) -> Result<()> {
        let mut inner = self.inner.write().await;
        let portal = inner.portals.get_mut(id).ok_or(Error::PortalNotFound)?;
        patch.apply(portal);
        Ok(())
    }

    async fn delete_portal(&self, id: &PortalId) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.portals.remove(id).is_none() {
            return Err(Error::PortalNotFound);
        }
        inner.verifications.retain(|(pid, _), _| pid != id);
        inner.bans.retain(|(pid, _), _| pid != id);
        Ok(())
    }

    async fn ensure_verification(
        &self,
        portal_id: &PortalId,
        user_id: UserId,
        username: Option<String>,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner
            .verifications
            .entry((portal_id.clone(), user_id))
            .or_insert_with(|| Verification::pending(portal_id.clone(), user_id, username));
        Ok(())
    }

    async fn verification(
        &self,
        portal_id: &PortalId,
        user_id: UserId,
    ) -> Result<Option<Verification>> {
        Ok(self
            .inner
            .read()
            .await
            .verifications
            .get(&(portal_id.clone(), user_id))
            .cloned())
    }

    async fn mark_verified(
        &self,
        portal_id: &PortalId,
        user_id: UserId,
        invite_link: String,
        invite_expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        let rec = inner
            .verifications
            .get_mut(&(portal_id.clone(), user_id))
            .ok_or_else(|| Error::Store(format!("no verification for {portal_id}/{}", user_id.0)))?;

        // No regression from `joined`; a re-verified member just gets fresh
        // token fields.
        if rec.status.can_advance_to(VerificationStatus::Verified) {
            rec.status = VerificationStatus::Verified;
        }
        rec.verified_at = Some(Utc::now());
        rec.invite_link = Some(invite_link);
        rec.invite_expires_at = Some(invite_expires_at);
        Ok(())
    }

    async fn mark_joined(&self, portal_id: &PortalId, user_id: UserId) -> Result<()> {
        let mut inner = self.inner.write().await;
        let rec = inner
            .verifications
            .get_mut(&(portal_id.clone(), user_id))
            .ok_or_else(|| Error::Store(format!("no verification for {portal_id}/{}", user_id.0)))?;

        if rec.status.can_advance_to(VerificationStatus::Joined) {
            rec.status = VerificationStatus::Joined;
        }
        Ok(())
    }

    async fn is_banned(&self, portal_id: &PortalId, user_id: UserId) -> Result<bool> {
        Ok(self
            .inner
            .read()
            .await
            .bans
            .contains_key(&(portal_id.clone(), user_id)))
    }

    async fn ban_user(&self, ban: BannedUser) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner
            .bans
            .insert((ban.portal_id.clone(), ban.user_id), ban);
        Ok(())
    }

    async fn unban_user(&self, portal_id: &PortalId, user_id: UserId) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.bans.remove(&(portal_id.clone(), user_id));
        Ok(())
    }

    async fn portal_stats(&self, portal_id: &PortalId) -> Result<PortalStats> {
        let inner = self.inner.read().await;
        let mut stats = PortalStats::default();
        for ((pid, _), rec) in &inner.verifications {
            if pid != portal_id {
                continue;
            }
            match rec.status {
                VerificationStatus::Pending => stats.pending += 1,
                VerificationStatus::Verified => stats.verified += 1,
                VerificationStatus::Joined => stats.joined += 1,
            }
        }
        stats.banned = inner
            .bans
            .keys()
            .filter(|(pid, _)| pid == portal_id)
            .count() as u64;
        Ok(stats)
    }
}
