//! Uploads, reports and the identifiers they are keyed by.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tdcompare_extractors::DocumentFormat;

use crate::locale::Locale;
use crate::traits::TokenUsage;

/// Chat user identifier. Sessions are keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

/// Chat identifier. Replies are addressed to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One accepted file waiting for its pair.
#[derive(Debug, Clone)]
pub struct Upload {
    pub user: UserId,
    pub format: DocumentFormat,
    pub file_name: String,
    /// Extracted text; may be blank, which is rejected at comparison time.
    pub text: String,
    pub received_at: Instant,
}

impl Upload {
    pub fn new(
        user: UserId,
        format: DocumentFormat,
        file_name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            user,
            format,
            file_name: file_name.into(),
            text: text.into(),
            received_at: Instant::now(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Generated comparison report.
#[derive(Debug, Clone)]
pub struct Report {
    pub text: String,
    pub locale: Locale,
    pub usage: Option<TokenUsage>,
}

impl Report {
    pub fn new(text: impl Into<String>, locale: Locale) -> Self {
        Self {
            text: text.into(),
            locale,
            usage: None,
        }
    }
}
