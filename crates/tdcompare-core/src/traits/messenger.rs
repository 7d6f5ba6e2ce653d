//! Outbound chat transport.

use std::path::Path;

use async_trait::async_trait;

use crate::error::CompareResult;
use crate::types::ChatId;

/// Delivers text replies and document attachments to a chat.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a plain text reply.
    async fn send_text(&self, chat: ChatId, text: &str) -> CompareResult<()>;

    /// Attach the file at `path` under the visible name `file_name`.
    async fn send_document(&self, chat: ChatId, file_name: &str, path: &Path)
        -> CompareResult<()>;
}
