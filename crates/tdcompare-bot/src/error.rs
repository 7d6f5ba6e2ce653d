//! Error handling for the Telegram front end.

use tdcompare_core::CompareError;
use thiserror::Error;

/// Errors raised by the bot transport and its startup configuration.
#[derive(Error, Debug)]
pub enum BotError {
    #[error("{0} is not set")]
    MissingVar(&'static str),

    #[error("{name} must be {expected}, got {value:?}")]
    InvalidVar {
        name: &'static str,
        expected: &'static str,
        value: String,
    },

    /// Transport failure. The request URL is stripped since it embeds the token.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("Telegram {method} failed ({}): {description}", .status.map_or_else(|| "no status".to_string(), |s| s.to_string()))]
    Api {
        method: &'static str,
        status: Option<u16>,
        description: String,
        retry_after: Option<u64>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Compare(#[from] CompareError),
}

impl From<reqwest::Error> for BotError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.without_url())
    }
}

pub type BotResult<T> = Result<T, BotError>;

impl BotError {
    /// Throttled by Telegram.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Api { status: Some(429), .. })
            || matches!(self, Self::Api { retry_after: Some(_), .. })
    }

    /// Map a failed send into the messenger error of the core crate.
    pub fn into_send_error(self) -> CompareError {
        match self {
            Self::Compare(e) => e,
            e if e.is_rate_limited() => CompareError::rate_limit(e.to_string()),
            e => CompareError::messenger(e.to_string()),
        }
    }

    /// Map a failed file download into the core download error.
    pub fn into_download_error(self) -> CompareError {
        match self {
            Self::Compare(e) => e,
            e => CompareError::download(e.to_string()),
        }
    }
}
