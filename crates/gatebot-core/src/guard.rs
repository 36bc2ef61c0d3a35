use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    domain::{ChatId, UserId, VerificationStatus},
    platform::ChatPlatform,
    store::PortalStore,
    Result,
};

/// Membership status reported by a chat-member update, reduced to what the
/// guard cares about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MembershipStatus {
    Member,
    Restricted,
    Left,
    Banned,
    Administrator,
    Owner,
}

impl MembershipStatus {
    /// Only member/restricted transitions count as joins.
    fn is_join(self) -> bool {
        matches!(self, MembershipStatus::Member | MembershipStatus::Restricted)
    }
}

/// A membership-status-change notification on a group.
#[derive(Clone, Debug)]
pub struct MembershipEvent {
    pub chat: ChatId,
    pub chat_title: String,
    pub user: UserId,
    pub new_status: MembershipStatus,
}

/// What the guard did with an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Not a join, or the group is not portal-protected.
    Ignored,
    /// Ledger says verified (or already joined); member stays.
    Allowed,
    /// Unverified joiner removed (ban + unban).
    Evicted,
}

/// Reconciles native join events against the verification ledger and evicts
/// joiners who bypassed the challenge.
///
/// The check runs against already-committed ledger state; there is a known,
/// accepted race window between token issuance and the `verified` write
/// (an affected user can simply re-request verification).
pub struct MembershipGuard {
    store: Arc<dyn PortalStore>,
    platform: Arc<dyn ChatPlatform>,
}

impl MembershipGuard {
    pub fn new(store: Arc<dyn PortalStore>, platform: Arc<dyn ChatPlatform>) -> Self {
        Self { store, platform }
    }

    pub async fn handle_event(&self, event: &MembershipEvent) -> Result<GuardOutcome> {
        if !event.new_status.is_join() {
            return Ok(GuardOutcome::Ignored);
        }

        let Some(portal) = self.store.portal_by_group(event.chat).await? else {
            return Ok(GuardOutcome::Ignored);
        };

        let verification = self.store.verification(&portal.id, event.user).await?;
        match verification.map(|v| v.status) {
            Some(VerificationStatus::Verified) => {
                self.store.mark_joined(&portal.id, event.user).await?;
                info!(portal = %portal.id, user = event.user.0, "verified member joined");
                Ok(GuardOutcome::Allowed)
            }
            Some(VerificationStatus::Joined) => Ok(GuardOutcome::Allowed),
            Some(VerificationStatus::Pending) | None => {
                self.evict(event).await?;
                Ok(GuardOutcome::Evicted)
            }
        }
    }

    /// Ban then immediately unban: the user is removed but free to
    /// re-attempt through the portal.
    async fn evict(&self, event: &MembershipEvent) -> Result<()> {
        warn!(
            chat = event.chat.0,
            user = event.user.0,
            "evicting unverified joiner"
        );

        self.platform.ban_member(event.chat, event.user).await?;
        self.platform.unban_member(event.chat, event.user).await?;

        // Best-effort: the user may have disabled direct messages.
        let notice = format!(
            "⚠️ You tried to join {} without verification.\n\nPlease verify \
             through the official channel first!",
            event.chat_title
        );
        if let Err(e) = self.platform.send_direct(event.user, &notice).await {
            info!(user = event.user.0, error = %e, "eviction notice not delivered");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use crate::domain::PortalId;
    use crate::store::MemoryStore;
    use crate::testutil::{make_portal, MockPlatform, PlatformCall};

    fn join_event(chat: ChatId, user: UserId) -> MembershipEvent {
        MembershipEvent {
            chat,
            chat_title: "Test Group".into(),
            user,
            new_status: MembershipStatus::Member,
        }
    }

    async fn seeded() -> (Arc<MemoryStore>, Arc<MockPlatform>, MembershipGuard, PortalId) {
        let store = Arc::new(MemoryStore::new());
        let platform = Arc::new(MockPlatform::new());
        let portal = make_portal(UserId(1));
        let id = portal.id.clone();
        store.create_portal(portal).await.unwrap();
        let guard = MembershipGuard::new(store.clone(), platform.clone());
        (store, platform, guard, id)
    }

    #[tokio::test]
    async fn non_join_transitions_are_ignored() {
        let (_store, platform, guard, _id) = seeded().await;
        let mut ev = join_event(ChatId(-200), UserId(42));
        ev.new_status = MembershipStatus::Left;

        assert_eq!(guard.handle_event(&ev).await.unwrap(), GuardOutcome::Ignored);
        assert!(platform.calls().is_empty());
    }

    #[tokio::test]
    async fn unprotected_groups_are_ignored() {
        let (_store, platform, guard, _id) = seeded().await;
        let ev = join_event(ChatId(-999), UserId(42));

        assert_eq!(guard.handle_event(&ev).await.unwrap(), GuardOutcome::Ignored);
        assert!(platform.calls().is_empty());
    }

    #[tokio::test]
    async fn verified_joiner_is_promoted_and_kept() {
        let (store, platform, guard, id) = seeded().await;
        store.ensure_verification(&id, UserId(42), None).await.unwrap();
        store
            .mark_verified(
                &id,
                UserId(42),
                "link".into(),
                Utc::now() + Duration::minutes(5),
            )
            .await
            .unwrap();

        let ev = join_event(ChatId(-200), UserId(42));
        assert_eq!(guard.handle_event(&ev).await.unwrap(), GuardOutcome::Allowed);

        let rec = store.verification(&id, UserId(42)).await.unwrap().unwrap();
        assert_eq!(rec.status, VerificationStatus::Joined);
        assert!(platform.calls().is_empty());
    }

    #[tokio::test]
    async fn already_joined_member_is_never_evicted() {
        let (store, platform, guard, id) = seeded().await;
        store.ensure_verification(&id, UserId(42), None).await.unwrap();
        store
            .mark_verified(
                &id,
                UserId(42),
                "link".into(),
                Utc::now() + Duration::minutes(5),
            )
            .await
            .unwrap();
        store.mark_joined(&id, UserId(42)).await.unwrap();

        let ev = join_event(ChatId(-200), UserId(42));
        assert_eq!(guard.handle_event(&ev).await.unwrap(), GuardOutcome::Allowed);
        assert!(platform.calls().is_empty());
    }

    #[tokio::test]
    async fn unverified_joiner_is_banned_then_unbanned() {
        let (_store, platform, guard, _id) = seeded().await;
        let ev = join_event(ChatId(-200), UserId(77));

        assert_eq!(guard.handle_event(&ev).await.unwrap(), GuardOutcome::Evicted);

        let calls = platform.calls();
        assert_eq!(calls[0], PlatformCall::Ban(ChatId(-200), UserId(77)));
        assert_eq!(calls[1], PlatformCall::Unban(ChatId(-200), UserId(77)));
        match &calls[2] {
            PlatformCall::Direct(user, text) => {
                assert_eq!(*user, UserId(77));
                assert!(text.contains("Test Group"));
            }
            other => panic!("unexpected call: {other:?}"),
        }
    }

    #[tokio::test]
    async fn pending_only_record_is_evicted() {
        let (store, platform, guard, id) = seeded().await;
        store.ensure_verification(&id, UserId(77), None).await.unwrap();

        let ev = join_event(ChatId(-200), UserId(77));
        assert_eq!(guard.handle_event(&ev).await.unwrap(), GuardOutcome::Evicted);
        assert!(matches!(platform.calls()[0], PlatformCall::Ban(_, _)));
    }

    #[tokio::test]
    async fn failed_eviction_notice_is_swallowed() {
        let (_store, platform, guard, _id) = seeded().await;
        *platform.direct_fails.lock().unwrap() = true;

        let ev = join_event(ChatId(-200), UserId(77));
        // Eviction still succeeds even though the DM bounced.
        assert_eq!(guard.handle_event(&ev).await.unwrap(), GuardOutcome::Evicted);
    }

    #[tokio::test]
    async fn inactive_portal_does_not_guard_its_group() {
        let (store, platform, guard, id) = seeded().await;
        store
            .update_portal(
                &id,
                &crate::domain::PortalPatch {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let ev = join_event(ChatId(-200), UserId(42));
        assert_eq!(guard.handle_event(&ev).await.unwrap(), GuardOutcome::Ignored);
        assert!(platform.calls().is_empty());
    }
}
