//! Prompt token accounting.

use crate::error::CompareResult;
use crate::types::Message;

/// Counts the tokens a chat request will consume on the provider side.
pub trait TokenCounter: Send + Sync {
    /// Tokens for `messages` including per-message framing.
    fn count_messages(&self, messages: &[Message]) -> CompareResult<usize>;
}
