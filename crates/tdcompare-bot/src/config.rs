//! Startup configuration for the bot binary.

use secrecy::SecretString;
use tdcompare_core::{CompareConfig, CompareResult, UserId};

use crate::error::{BotError, BotResult};

const DEFAULT_API_URL: &str = "https://api.telegram.org";
const DEFAULT_POLL_TIMEOUT_SECS: u32 = 30;

/// Transport settings read from the environment.
#[derive(Debug)]
pub struct BotConfig {
    pub telegram_token: SecretString,
    /// The only user allowed to stop the bot.
    pub admin_id: UserId,
    /// Long-poll timeout passed to `getUpdates`.
    pub poll_timeout_secs: u32,
    pub api_url: String,
}

impl BotConfig {
    /// Read `TELEGRAM_TOKEN`, `ADMIN_ID`, `TDC_POLL_TIMEOUT_SECS` and
    /// `TELEGRAM_API_URL`.
    pub fn from_env() -> BotResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> BotResult<Self> {
        let telegram_token = lookup("TELEGRAM_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or(BotError::MissingVar("TELEGRAM_TOKEN"))?;

        let raw_admin = lookup("ADMIN_ID").ok_or(BotError::MissingVar("ADMIN_ID"))?;
        let admin_id = raw_admin
            .trim()
            .parse::<i64>()
            .map_err(|_| BotError::InvalidVar {
                name: "ADMIN_ID",
                expected: "a numeric Telegram user id",
                value: raw_admin.clone(),
            })?;

        let poll_timeout_secs = match lookup("TDC_POLL_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse().map_err(|_| BotError::InvalidVar {
                name: "TDC_POLL_TIMEOUT_SECS",
                expected: "a number of seconds",
                value: raw,
            })?,
            None => DEFAULT_POLL_TIMEOUT_SECS,
        };

        let api_url = lookup("TELEGRAM_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        Ok(Self {
            telegram_token: SecretString::new(telegram_token.trim().to_string()),
            admin_id: UserId(admin_id),
            poll_timeout_secs,
            api_url,
        })
    }
}

/// Comparison settings: the file named by `TDC_CONFIG` if set, with the
/// environment layered on top.
pub fn load_compare_config() -> CompareResult<CompareConfig> {
    match std::env::var("TDC_CONFIG") {
        Ok(path) => {
            let mut config = CompareConfig::from_file(&path)?;
            config.apply_env()?;
            Ok(config)
        }
        Err(_) => CompareConfig::from_env(),
    }
}
