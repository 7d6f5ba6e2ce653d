//! Factory for creating LLM providers.

use std::sync::Arc;

use tdcompare_core::error::CompareResult;
use tdcompare_core::traits::{Llm, LlmConfig};

use crate::openai::OpenAIProvider;

/// Factory for creating LLM providers.
pub struct LlmFactory;

impl LlmFactory {
    /// Create the comparison provider from configuration.
    pub fn create(config: LlmConfig) -> CompareResult<Arc<dyn Llm>> {
        Ok(Arc::new(OpenAIProvider::new(config)?))
    }
}
