//! Persistence contract for portals, verifications and bans.
//!
//! The bundled implementation is in-memory; a SQL-backed collaborator only
//! needs to satisfy this trait. All methods are keyed the way the callers
//! need them: portals by id (and by destination group, active only),
//! verifications and bans by (portal, user).

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    domain::{BannedUser, ChatId, Portal, PortalId, PortalPatch, PortalStats, UserId, Verification},
    Result,
};

#[async_trait]
pub trait PortalStore: Send + Sync {
    /// Persist a freshly-created portal. Fails on portal-id collision.
    async fn create_portal(&self, portal: Portal) -> Result<()>;

    async fn portal(&self, id: &PortalId) -> Result<Option<Portal>>;

    /// Active portal whose destination group matches, if any.
    async fn portal_by_group(&self, group: ChatId) -> Result<Option<Portal>>;

    async fn portals_by_owner(&self, owner: UserId) -> Result<Vec<Portal>>;

    /// Apply a patch to the mutable portal fields.
    async fn update_portal(&self, id: &PortalId, patch: &PortalPatch) -> Result<()>;

    /// Delete a portal; cascades to its verifications and bans.
    async fn delete_portal(&self, id: &PortalId) -> Result<()>;

    /// Create the (portal, user) verification record as `pending` if absent.
    /// An existing record is left untouched (at most one per pair).
    async fn ensure_verification(
        &self,
        portal_id: &PortalId,
        user_id: UserId,
        username: Option<String>,
    ) -> Result<()>;

    async fn verification(
        &self,
        portal_id: &PortalId,
        user_id: UserId,
    ) -> Result<Option<Verification>>;

    /// Stamp an issued admission token and promote the record to `verified`.
    ///
    /// Status never regresses: a record already `joined` keeps its status and
    /// only has the token fields refreshed.
    async fn mark_verified(
        &self,
        portal_id: &PortalId,
        user_id: UserId,
        invite_link: String,
        invite_expires_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Promote a `verified` record to `joined` (terminal).
    async fn mark_joined(&self, portal_id: &PortalId, user_id: UserId) -> Result<()>;

    async fn is_banned(&self, portal_id: &PortalId, user_id: UserId) -> Result<bool>;

    /// Insert or overwrite the exclusion record for (portal, user).
    async fn ban_user(&self, ban: BannedUser) -> Result<()>;

    async fn unban_user(&self, portal_id: &PortalId, user_id: UserId) -> Result<()>;

    /// Count-by-status aggregate for portal statistics.
    async fn portal_stats(&self, portal_id: &PortalId) -> Result<PortalStats>;
}
