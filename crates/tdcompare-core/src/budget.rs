//! Token budget accounting for comparison requests.

use tiktoken_rs::CoreBPE;
use tracing::debug;

use crate::config::BudgetConfig;
use crate::error::{CompareError, CompareResult};
use crate::traits::TokenCounter;
use crate::types::Message;

/// Framing tokens added around every chat message.
const TOKENS_PER_MESSAGE: usize = 3;
/// Tokens priming the assistant reply.
const REPLY_PRIMING_TOKENS: usize = 3;

/// Context-window arithmetic for a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBudget {
    pub context_window: u32,
    pub completion_cap: u32,
    pub min_completion_tokens: u32,
}

impl TokenBudget {
    pub fn new(context_window: u32, completion_cap: u32) -> Self {
        Self {
            context_window,
            completion_cap,
            min_completion_tokens: 1,
        }
    }

    /// Raw `min(cap, window - prompt)`, floored at zero.
    pub fn available(&self, prompt_tokens: usize) -> u32 {
        let prompt = u32::try_from(prompt_tokens).unwrap_or(u32::MAX);
        self.completion_cap
            .min(self.context_window.saturating_sub(prompt))
    }

    /// Completion tokens to request, or `PromptTooLarge` if the prompt
    /// leaves less than `min_completion_tokens`.
    pub fn completion_budget(&self, prompt_tokens: usize) -> CompareResult<u32> {
        let available = self.available(prompt_tokens);
        if available < self.min_completion_tokens.max(1) {
            return Err(CompareError::PromptTooLarge {
                prompt_tokens,
                context_window: self.context_window,
                available,
            });
        }
        Ok(available)
    }
}

impl From<BudgetConfig> for TokenBudget {
    fn from(config: BudgetConfig) -> Self {
        Self {
            context_window: config.context_window,
            completion_cap: config.completion_cap,
            min_completion_tokens: config.min_completion_tokens,
        }
    }
}

/// Token counter backed by the model's tiktoken encoding.
pub struct TiktokenCounter {
    bpe: CoreBPE,
    encoding: String,
}

impl std::fmt::Debug for TiktokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TiktokenCounter")
            .field("encoding", &self.encoding)
            .finish()
    }
}

impl TiktokenCounter {
    /// Encoding for `model`, falling back to `cl100k_base` for unknown names.
    pub fn for_model(model: &str) -> CompareResult<Self> {
        match tiktoken_rs::get_bpe_from_model(model) {
            Ok(bpe) => Ok(Self {
                bpe,
                encoding: model.to_string(),
            }),
            Err(e) => {
                debug!(model, error = %e, "No tokenizer for model, using cl100k_base");
                Self::cl100k()
            }
        }
    }

    pub fn cl100k() -> CompareResult<Self> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| CompareError::Configuration(format!("cl100k_base: {}", e)))?;
        Ok(Self {
            bpe,
            encoding: "cl100k_base".to_string(),
        })
    }

    pub fn count_text(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

impl TokenCounter for TiktokenCounter {
    fn count_messages(&self, messages: &[Message]) -> CompareResult<usize> {
        let framed: usize = messages
            .iter()
            .map(|m| {
                TOKENS_PER_MESSAGE + self.count_text(m.role.as_str()) + self.count_text(&m.content)
            })
            .sum();
        Ok(framed + REPLY_PRIMING_TOKENS)
    }
}
