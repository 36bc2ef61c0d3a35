use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::{
    domain::{BannedUser, Portal, PortalId, PortalPatch, PortalStats, UserId},
    errors::Error,
    store::PortalStore,
    Result,
};

/// A portal together with its verification counters, for owner listings.
#[derive(Clone, Debug)]
pub struct PortalSummary {
    pub portal: Portal,
    pub stats: PortalStats,
}

/// Owner-facing portal management. Every mutation verifies ownership
/// before touching the store.
pub struct PortalService {
    store: Arc<dyn PortalStore>,
}

impl PortalService {
    pub fn new(store: Arc<dyn PortalStore>) -> Self {
        Self { store }
    }

    /// Fetch a portal the acting user owns.
    pub async fn owned_portal(&self, acting: UserId, id: &PortalId) -> Result<Portal> {
        let portal = self.store.portal(id).await?.ok_or(Error::PortalNotFound)?;
        if portal.owner != acting {
            return Err(Error::OwnershipViolation);
        }
        Ok(portal)
    }

    /// All portals of an owner, newest last, each with live counters.
    pub async fn list_portals(&self, owner: UserId) -> Result<Vec<PortalSummary>> {
        let portals = self.store.portals_by_owner(owner).await?;
        let mut out = Vec::with_capacity(portals.len());
        for portal in portals {
            let stats = self.store.portal_stats(&portal.id).await?;
            out.push(PortalSummary { portal, stats });
        }
        Ok(out)
    }

    pub async fn portal_stats(&self, acting: UserId, id: &PortalId) -> Result<PortalStats> {
        self.owned_portal(acting, id).await?;
        self.store.portal_stats(id).await
    }

    /// Apply a settings patch. Empty patches are a no-op.
    pub async fn update_settings(
        &self,
        acting: UserId,
        id: &PortalId,
        patch: &PortalPatch,
    ) -> Result<Portal> {
        self.owned_portal(acting, id).await?;
        if !patch.is_empty() {
            self.store.update_portal(id, patch).await?;
        }
        self.store.portal(id).await?.ok_or(Error::PortalNotFound)
    }

    /// Flip the active flag; returns the new state.
    pub async fn toggle_active(&self, acting: UserId, id: &PortalId) -> Result<bool> {
        let portal = self.owned_portal(acting, id).await?;
        let next = !portal.is_active;
        self.store
            .update_portal(
                id,
                &PortalPatch {
                    is_active: Some(next),
                    ..Default::default()
                },
            )
            .await?;
        info!(portal = %id, active = next, "portal toggled");
        Ok(next)
    }

    pub async fn toggle_require_username(&self, acting: UserId, id: &PortalId) -> Result<bool> {
        let portal = self.owned_portal(acting, id).await?;
        let next = !portal.require_username;
        self.store
            .update_portal(
                id,
                &PortalPatch {
                    require_username: Some(next),
                    ..Default::default()
                },
            )
            .await?;
        Ok(next)
    }

    pub async fn toggle_require_photo(&self, acting: UserId, id: &PortalId) -> Result<bool> {
        let portal = self.owned_portal(acting, id).await?;
        let next = !portal.require_profile_photo;
        self.store
            .update_portal(
                id,
                &PortalPatch {
                    require_profile_photo: Some(next),
                    ..Default::default()
                },
            )
            .await?;
        Ok(next)
    }

    /// Delete a portal and everything recorded under it.
    pub async fn delete_portal(&self, acting: UserId, id: &PortalId) -> Result<()> {
        self.owned_portal(acting, id).await?;
        self.store.delete_portal(id).await?;
        info!(portal = %id, "portal deleted");
        Ok(())
    }

    /// Ban a user from a portal's verification flow. Does not touch any
    /// existing group membership.
    pub async fn ban_user(
        &self,
        acting: UserId,
        id: &PortalId,
        target: UserId,
        reason: String,
    ) -> Result<()> {
        self.owned_portal(acting, id).await?;
        self.store
            .ban_user(BannedUser {
                portal_id: id.clone(),
                user_id: target,
                reason,
                banned_by: acting,
                banned_at: Utc::now(),
            })
            .await?;
        info!(portal = %id, user = target.0, "user banned from portal");
        Ok(())
    }

    pub async fn unban_user(&self, acting: UserId, id: &PortalId, target: UserId) -> Result<()> {
        self.owned_portal(acting, id).await?;
        self.store.unban_user(id, target).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::testutil::make_portal;

    async fn seeded() -> (PortalService, Arc<MemoryStore>, PortalId) {
        let store = Arc::new(MemoryStore::new());
        let portal = make_portal(UserId(1));
        let id = portal.id.clone();
        store.create_portal(portal).await.unwrap();
        (PortalService::new(store.clone()), store, id)
    }

    #[tokio::test]
    async fn non_owner_cannot_mutate() {
        let (service, _store, id) = seeded().await;

        let err = service.toggle_active(UserId(2), &id).await.unwrap_err();
        assert!(matches!(err, Error::OwnershipViolation));
        let err = service.delete_portal(UserId(2), &id).await.unwrap_err();
        assert!(matches!(err, Error::OwnershipViolation));
        let err = service
            .ban_user(UserId(2), &id, UserId(42), "spam".into())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::OwnershipViolation));
    }

    #[tokio::test]
    async fn missing_portal_reported_before_ownership() {
        let (service, _store, _id) = seeded().await;

        let err = service
            .toggle_active(UserId(2), &PortalId("missing0".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PortalNotFound));
    }

    #[tokio::test]
    async fn toggle_active_flips_and_reports_new_state() {
        let (service, store, id) = seeded().await;

        assert!(!service.toggle_active(UserId(1), &id).await.unwrap());
        assert!(!store.portal(&id).await.unwrap().unwrap().is_active);
        assert!(service.toggle_active(UserId(1), &id).await.unwrap());
    }

    #[tokio::test]
    async fn requirement_toggles_are_independent() {
        let (service, store, id) = seeded().await;

        assert!(service
            .toggle_require_username(UserId(1), &id)
            .await
            .unwrap());
        let portal = store.portal(&id).await.unwrap().unwrap();
        assert!(portal.require_username);
        assert!(!portal.require_profile_photo);

        assert!(service.toggle_require_photo(UserId(1), &id).await.unwrap());
        let portal = store.portal(&id).await.unwrap().unwrap();
        assert!(portal.require_profile_photo);
    }

    #[tokio::test]
    async fn update_settings_applies_patch() {
        let (service, _store, id) = seeded().await;

        let patch = PortalPatch {
            welcome_message: Some("Custom greeting".into()),
            min_account_age_days: Some(7),
            ..Default::default()
        };
        let portal = service
            .update_settings(UserId(1), &id, &patch)
            .await
            .unwrap();
        assert_eq!(portal.welcome_message, "Custom greeting");
        assert_eq!(portal.min_account_age_days, 7);
        assert!(portal.is_active);
    }

    #[tokio::test]
    async fn listing_includes_counters() {
        let (service, store, id) = seeded().await;
        store
            .ensure_verification(&id, UserId(42), None)
            .await
            .unwrap();

        let listed = service.list_portals(UserId(1)).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].portal.id, id);
        assert_eq!(listed[0].stats.pending, 1);
        assert_eq!(listed[0].stats.verified, 0);
    }

    #[tokio::test]
    async fn ban_then_unban_round_trip() {
        let (service, store, id) = seeded().await;

        service
            .ban_user(UserId(1), &id, UserId(42), "spam".into())
            .await
            .unwrap();
        assert!(store.is_banned(&id, UserId(42)).await.unwrap());

        service.unban_user(UserId(1), &id, UserId(42)).await.unwrap();
        assert!(!store.is_banned(&id, UserId(42)).await.unwrap());
    }
}
