//! tdcompare-core - Core library for tdcompare.
//!
//! Collects two uploaded documents per user, asks an LLM for a structured
//! comparison, and delivers the report in the configured formats.
//!
//! # Example
//!
//! ```ignore
//! use tdcompare_core::{ChatId, CompareConfig, ComparisonPipeline, UserId};
//!
//! let config = CompareConfig::from_env()?;
//! let pipeline = ComparisonPipeline::from_config(&config, llm, messenger)?;
//!
//! pipeline.handle_upload(UserId(42), ChatId(42), "ref.pdf", &ref_bytes).await;
//! let outcome = pipeline.handle_upload(UserId(42), ChatId(42), "test.pdf", &test_bytes).await;
//! ```

pub mod budget;
pub mod config;
pub mod error;
pub mod locale;
pub mod pipeline;
pub mod prompts;
pub mod requester;
pub mod session;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use budget::{TiktokenCounter, TokenBudget};
pub use config::{BudgetConfig, CompareConfig, SessionConfig};
pub use error::{CompareError, CompareResult, ErrorCode};
pub use locale::{select_locale, Locale};
pub use pipeline::{ComparisonPipeline, FailureReason, UploadOutcome};
pub use requester::{ComparisonRequester, RetryPolicy};
pub use session::{Session, SessionStore, SessionSweeper};
pub use traits::{
    GenerationOptions, Llm, LlmConfig, LlmResponse, Messenger, TokenCounter, TokenUsage,
};
pub use types::{ChatId, Message, MessageRole, Report, Upload, UserId};

pub use tdcompare_extractors::{DocumentFormat, ExtractionPipeline};
pub use tdcompare_render::{OutputFormat, ReportRenderer};
