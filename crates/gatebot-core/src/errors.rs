/// Core error type for the bot.
///
/// Adapter crates map their specific failures into this type so handlers can
/// turn any outcome into one distinct, user-facing message. Nothing in the
/// event path panics; every failure is a value returned to the caller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("portal not found")]
    PortalNotFound,

    #[error("portal is inactive")]
    PortalInactive,

    #[error("user is banned from this portal")]
    UserBanned,

    #[error("requirement not met: {0}")]
    RequirementNotMet(String),

    #[error("setup session expired")]
    SessionExpired,

    #[error("not the portal owner")]
    OwnershipViolation,

    #[error("platform error: {0}")]
    Platform(String),

    #[error("store error: {0}")]
    Store(String),
}

impl Error {
    /// Human-readable message for the end user.
    ///
    /// `Platform` surfaces the underlying error text so owners can
    /// self-diagnose permission problems (missing admin rights etc).
    pub fn user_message(&self) -> String {
        match self {
            Error::PortalNotFound => "Portal not found.".to_string(),
            Error::PortalInactive => "This portal is currently inactive.".to_string(),
            Error::UserBanned => "You are banned from this portal.".to_string(),
            Error::RequirementNotMet(reason) => reason.clone(),
            Error::SessionExpired => {
                "Setup session expired. Please start again with /portal setup.".to_string()
            }
            Error::OwnershipViolation => "You don't own this portal.".to_string(),
            Error::Platform(msg) => format!("Telegram error: {msg}"),
            other => format!("Something went wrong: {other}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_are_distinct_per_kind() {
        let errs = [
            Error::PortalNotFound,
            Error::PortalInactive,
            Error::UserBanned,
            Error::RequirementNotMet("You need to set a username to join.".into()),
            Error::SessionExpired,
            Error::OwnershipViolation,
            Error::Platform("chat not found".into()),
        ];
        let msgs: Vec<String> = errs.iter().map(|e| e.user_message()).collect();
        for (i, a) in msgs.iter().enumerate() {
            for b in msgs.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn platform_message_carries_underlying_text() {
        let e = Error::Platform("bot is not a member of the channel chat".into());
        assert!(e.user_message().contains("not a member"));
    }
}
