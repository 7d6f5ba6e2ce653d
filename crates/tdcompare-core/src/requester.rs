//! Report requester: prompt assembly, token budget and the model call.

use std::sync::Arc;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use tracing::{info, warn};

use crate::budget::TokenBudget;
use crate::error::{CompareError, CompareResult};
use crate::locale::Locale;
use crate::prompts::comparison_prompt;
use crate::traits::{GenerationOptions, Llm, TokenCounter};
use crate::types::{Message, Report};

/// Retry policy for transient provider failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first; 0 disables retrying.
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay_ms: 500,
            max_delay_ms: 10_000,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }
}

/// Builds the comparison request and obtains the report from the model.
pub struct ComparisonRequester {
    llm: Arc<dyn Llm>,
    counter: Arc<dyn TokenCounter>,
    budget: TokenBudget,
    temperature: f32,
    retry: RetryPolicy,
}

impl ComparisonRequester {
    pub fn new(
        llm: Arc<dyn Llm>,
        counter: Arc<dyn TokenCounter>,
        budget: TokenBudget,
        temperature: f32,
    ) -> Self {
        Self {
            llm,
            counter,
            budget,
            temperature,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn budget(&self) -> &TokenBudget {
        &self.budget
    }

    /// Request a comparison report for two document texts.
    ///
    /// Blank documents and prompts that leave no room for a completion are
    /// refused without calling the model.
    pub async fn request_comparison(
        &self,
        text1: &str,
        text2: &str,
        locale: Locale,
    ) -> CompareResult<Report> {
        for (index, text) in [text1, text2].into_iter().enumerate() {
            if text.trim().is_empty() {
                return Err(CompareError::EmptyDocument { index: index + 1 });
            }
        }

        let messages = vec![Message::user(comparison_prompt(locale, text1, text2))];
        let prompt_tokens = self.counter.count_messages(&messages)?;
        let max_tokens = self.budget.completion_budget(prompt_tokens)?;

        info!(
            model = self.llm.model_name(),
            %locale,
            prompt_tokens,
            max_tokens,
            context_window = self.budget.context_window,
            "Requesting comparison"
        );

        let options = GenerationOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(max_tokens),
        };

        let attempt = || async { self.llm.generate(&messages, Some(options.clone())).await };
        let response = attempt
            .retry(
                ExponentialBuilder::default()
                    .with_max_times(self.retry.max_retries as usize)
                    .with_min_delay(Duration::from_millis(self.retry.initial_delay_ms))
                    .with_max_delay(Duration::from_millis(self.retry.max_delay_ms))
                    .with_jitter(),
            )
            .when(|e: &CompareError| e.is_retryable())
            .notify(|err: &CompareError, dur: Duration| {
                warn!(error = %err, delay_ms = dur.as_millis() as u64, "Comparison request failed, retrying");
            })
            .await?;

        let text = response
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| CompareError::llm_invalid_response("Model returned an empty report"))?;

        if let Some(usage) = response.usage {
            info!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "Comparison received"
            );
        }

        let mut report = Report::new(text, locale);
        report.usage = response.usage;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{LlmResponse, MockLlm, TokenUsage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts one token per prompt byte.
    struct ByteCounter;

    impl TokenCounter for ByteCounter {
        fn count_messages(&self, messages: &[Message]) -> CompareResult<usize> {
            Ok(messages.iter().map(|m| m.content.len()).sum())
        }
    }

    fn requester(llm: MockLlm, budget: TokenBudget) -> ComparisonRequester {
        ComparisonRequester::new(Arc::new(llm), Arc::new(ByteCounter), budget, 0.2)
    }

    fn model_name(llm: &mut MockLlm) {
        llm.expect_model_name().return_const("gpt-4".to_string());
    }

    #[tokio::test]
    async fn test_budget_passed_to_model() {
        let text1 = "Voltage: 5V";
        let text2 = "Voltage: 12V";
        let prompt_len = comparison_prompt(Locale::English, text1, text2).len();
        let budget = TokenBudget::new(prompt_len as u32 + 500, 2000);

        let mut llm = MockLlm::new();
        model_name(&mut llm);
        llm.expect_generate()
            .withf(|messages, options| {
                messages.len() == 1
                    && messages[0].content.contains("Voltage: 12V")
                    && *options
                        == Some(GenerationOptions {
                            temperature: Some(0.2),
                            max_tokens: Some(500),
                        })
            })
            .times(1)
            .returning(|_, _| {
                Ok(LlmResponse {
                    content: Some("Voltage | 5V | 12V | no".to_string()),
                    usage: Some(TokenUsage {
                        prompt_tokens: 10,
                        completion_tokens: 5,
                        total_tokens: 15,
                    }),
                })
            });

        let report = requester(llm, budget)
            .request_comparison(text1, text2, Locale::English)
            .await
            .unwrap();

        assert_eq!(report.text, "Voltage | 5V | 12V | no");
        assert_eq!(report.locale, Locale::English);
        assert_eq!(report.usage.map(|u| u.total_tokens), Some(15));
    }

    #[tokio::test]
    async fn test_blank_document_never_calls_model() {
        let mut llm = MockLlm::new();
        llm.expect_generate().never();

        let requester = requester(llm, TokenBudget::new(8192, 2000));
        let err = requester
            .request_comparison("text", "  \n ", Locale::Russian)
            .await
            .unwrap_err();
        assert!(matches!(err, CompareError::EmptyDocument { index: 2 }));

        let err = requester
            .request_comparison("", "text", Locale::Russian)
            .await
            .unwrap_err();
        assert!(matches!(err, CompareError::EmptyDocument { index: 1 }));
    }

    #[tokio::test]
    async fn test_oversized_prompt_never_calls_model() {
        let mut llm = MockLlm::new();
        llm.expect_generate().never();

        let err = requester(llm, TokenBudget::new(50, 2000))
            .request_comparison("a", "b", Locale::Russian)
            .await
            .unwrap_err();
        assert!(matches!(err, CompareError::PromptTooLarge { available: 0, .. }));
    }

    #[tokio::test]
    async fn test_provider_failure_is_single_attempt_by_default() {
        let mut llm = MockLlm::new();
        model_name(&mut llm);
        llm.expect_generate()
            .times(1)
            .returning(|_, _| Err(CompareError::rate_limit("429 Too Many Requests")));

        let err = requester(llm, TokenBudget::new(8192, 2000))
            .request_comparison("a", "b", Locale::Russian)
            .await
            .unwrap_err();
        assert!(matches!(err, CompareError::RateLimit { .. }));
    }

    #[tokio::test]
    async fn test_retryable_failure_retried_when_enabled() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();

        let mut llm = MockLlm::new();
        model_name(&mut llm);
        llm.expect_generate().times(2).returning(move |_, _| {
            if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(CompareError::api("connection reset"))
            } else {
                Ok(LlmResponse {
                    content: Some("report".to_string()),
                    usage: None,
                })
            }
        });

        let retry = RetryPolicy {
            max_retries: 2,
            initial_delay_ms: 1,
            max_delay_ms: 1,
        };
        let report = requester(llm, TokenBudget::new(8192, 2000))
            .with_retry(retry)
            .request_comparison("a", "b", Locale::Russian)
            .await
            .unwrap();
        assert_eq!(report.text, "report");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_failure_not_retried() {
        let mut llm = MockLlm::new();
        model_name(&mut llm);
        llm.expect_generate()
            .times(1)
            .returning(|_, _| Err(CompareError::authentication("invalid api key")));

        let err = requester(llm, TokenBudget::new(8192, 2000))
            .with_retry(RetryPolicy::with_max_retries(3))
            .request_comparison("a", "b", Locale::Russian)
            .await
            .unwrap_err();
        assert!(matches!(err, CompareError::Authentication { .. }));
    }

    #[tokio::test]
    async fn test_empty_model_output_is_error() {
        let mut llm = MockLlm::new();
        model_name(&mut llm);
        llm.expect_generate()
            .returning(|_, _| Ok(LlmResponse::default()));

        let err = requester(llm, TokenBudget::new(8192, 2000))
            .request_comparison("a", "b", Locale::Russian)
            .await
            .unwrap_err();
        assert!(matches!(err, CompareError::Llm { .. }));
    }
}
