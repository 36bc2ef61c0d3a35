use std::sync::Arc;

use crate::{
    domain::{Portal, UserId},
    errors::Error,
    platform::ChatPlatform,
    Result,
};

pub const REASON_USERNAME: &str = "You need to set a Telegram username to join.";
pub const REASON_PHOTO: &str = "You need to set a profile photo to join.";

/// Evaluates platform-reported user attributes against a portal's
/// configured requirements.
pub struct RequirementChecker {
    platform: Arc<dyn ChatPlatform>,
}

impl RequirementChecker {
    pub fn new(platform: Arc<dyn ChatPlatform>) -> Self {
        Self { platform }
    }

    /// Short-circuits on the first failed requirement, in a fixed order:
    /// username presence, then profile-photo presence. Each platform lookup
    /// only happens when the matching flag is on, so a photos-API failure
    /// cannot sink a username-only portal.
    ///
    /// Transport failures propagate as `Error::Platform` with the underlying
    /// message; they are never treated as "requirement not met".
    ///
    /// `min_account_age_days` is reserved and not evaluated: the platform
    /// does not expose account-creation time.
    pub async fn check(&self, portal: &Portal, user: UserId) -> Result<()> {
        if portal.require_username {
            let username = self.platform.user_username(user).await?;
            if username.is_none() {
                return Err(Error::RequirementNotMet(REASON_USERNAME.to_string()));
            }
        }

        if portal.require_profile_photo {
            let photos = self.platform.user_photo_count(user).await?;
            if photos == 0 {
                return Err(Error::RequirementNotMet(REASON_PHOTO.to_string()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;
    use crate::testutil::{make_portal, MockPlatform};

    #[tokio::test]
    async fn passes_when_nothing_required() {
        let platform = Arc::new(MockPlatform::new());
        let checker = RequirementChecker::new(platform.clone());
        let portal = make_portal(UserId(1));

        checker.check(&portal, UserId(42)).await.unwrap();
    }

    #[tokio::test]
    async fn missing_username_fails_with_username_reason() {
        let platform = Arc::new(MockPlatform::new());
        platform.set_photo_count(UserId(42), 3);
        let checker = RequirementChecker::new(platform.clone());
        let mut portal = make_portal(UserId(1));
        portal.require_username = true;
        portal.require_profile_photo = true;

        let err = checker.check(&portal, UserId(42)).await.unwrap_err();
        match err {
            Error::RequirementNotMet(reason) => assert_eq!(reason, REASON_USERNAME),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_photo_fails_after_username_passes() {
        let platform = Arc::new(MockPlatform::new());
        platform.set_username(UserId(42), "alice");
        let checker = RequirementChecker::new(platform.clone());
        let mut portal = make_portal(UserId(1));
        portal.require_username = true;
        portal.require_profile_photo = true;

        let err = checker.check(&portal, UserId(42)).await.unwrap_err();
        match err {
            Error::RequirementNotMet(reason) => assert_eq!(reason, REASON_PHOTO),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn transport_error_is_not_requirement_not_met() {
        let platform = Arc::new(MockPlatform::new());
        *platform.profile_error.lock().unwrap() = Some("timeout talking to telegram".into());
        let checker = RequirementChecker::new(platform.clone());
        let mut portal = make_portal(UserId(1));
        portal.require_username = true;

        let err = checker.check(&portal, UserId(42)).await.unwrap_err();
        match err {
            Error::Platform(msg) => assert!(msg.contains("timeout")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn username_only_portal_never_touches_the_photos_api() {
        let platform = Arc::new(MockPlatform::new());
        platform.set_username(UserId(42), "alice");
        *platform.photo_error.lock().unwrap() = Some("photos endpoint down".into());
        let checker = RequirementChecker::new(platform.clone());
        let mut portal = make_portal(UserId(1));
        portal.require_username = true;

        // A failing photos lookup must not sink a username-only check.
        checker.check(&portal, UserId(42)).await.unwrap();
    }
}
