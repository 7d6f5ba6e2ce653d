//! tdcompare-llm - LLM provider implementations for tdcompare.
//!
//! # Supported Providers
//!
//! - **OpenAI** (feature: `openai`) - chat completions, any compatible base URL
//!
//! # Example
//!
//! ```ignore
//! use tdcompare_llm::LlmFactory;
//!
//! let llm = LlmFactory::create(config.llm.clone())?;
//! ```

mod factory;
mod openai;

pub use factory::LlmFactory;
pub use openai::OpenAIProvider;

// Re-export core types for convenience
pub use tdcompare_core::traits::{GenerationOptions, Llm, LlmConfig, LlmResponse};
