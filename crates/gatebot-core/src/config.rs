use std::{env, fs, path::Path, time::Duration};

use crate::{errors::Error, Result};

/// Typed configuration, loaded from environment variables with an optional
/// `.env` file (existing env always wins).
#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_bot_token: String,

    /// Lifetime of issued admission tokens.
    pub invite_expiry: Duration,
    /// member-limit on issued invite links (single-use by default).
    pub invite_max_uses: u32,

    /// Setup wizard session expiry.
    pub setup_session_ttl: Duration,
    /// Max concurrently-onboarding owners.
    pub setup_session_capacity: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let invite_expiry_minutes = env_u64("PORTAL_INVITE_EXPIRY_MINUTES").unwrap_or(5).max(1);
        let invite_max_uses = env_u32("PORTAL_MAX_USES").unwrap_or(1).max(1);

        let setup_session_ttl =
            Duration::from_secs(env_u64("SETUP_SESSION_TTL_SECS").unwrap_or(900).max(1));
        let setup_session_capacity = env_usize("SETUP_SESSION_CAPACITY").unwrap_or(64).max(1);

        Ok(Self {
            telegram_bot_token,
            invite_expiry: Duration::from_secs(invite_expiry_minutes.saturating_mul(60)),
            invite_max_uses,
            setup_session_ttl,
            setup_session_capacity,
        })
    }

    pub fn invite_expiry_minutes(&self) -> u64 {
        self.invite_expiry.as_secs() / 60
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    env_str(key).and_then(|s| s.trim().parse::<u32>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_expiry_saturates_instead_of_overflowing() {
        env::set_var("TELEGRAM_BOT_TOKEN", "test-token");
        env::set_var("PORTAL_INVITE_EXPIRY_MINUTES", u64::MAX.to_string());

        let cfg = Config::load().unwrap();
        assert_eq!(cfg.invite_expiry, Duration::from_secs(u64::MAX));

        env::remove_var("PORTAL_INVITE_EXPIRY_MINUTES");
    }
}
