//! Session pipeline: collects two uploads per user, then compares them.
//!
//! ```text
//! EMPTY --upload--> ONE_RECEIVED --upload--> (comparing) --> EMPTY
//! ```
//!
//! Rejected and unreadable uploads leave the state untouched. Once a pair
//! is complete the session is drained before the comparison starts, so it
//! is empty afterwards whatever the comparison outcome.

use std::sync::Arc;

use strum::IntoEnumIterator;
use tdcompare_extractors::{DocumentFormat, ExtractionPipeline};
use tdcompare_render::{OutputFormat, ReportRenderer};
use tracing::{debug, error, info, warn};

use crate::budget::TiktokenCounter;
use crate::config::CompareConfig;
use crate::error::{CompareError, CompareResult};
use crate::locale::{select_locale, Locale};
use crate::requester::{ComparisonRequester, RetryPolicy};
use crate::session::SessionStore;
use crate::traits::{Llm, Messenger};
use crate::types::{ChatId, Upload, UserId};

/// Why a completed pair produced no report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Document `index` (1-based) had no text.
    EmptyDocument { index: usize },
    PromptTooLarge,
    Model,
    Render,
    Delivery,
}

/// Result of handling one uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Unsupported file extension; session unchanged.
    Rejected,
    /// The file could not be read; session unchanged.
    ExtractionFailed,
    /// Upload stored, waiting for its pair.
    Pending { count: usize },
    /// Report delivered in these formats.
    Compared { delivered: Vec<OutputFormat> },
    /// The pair was consumed but no complete report was delivered.
    ComparisonFailed { reason: FailureReason },
}

/// Drives uploads through extraction, comparison, rendering and delivery.
pub struct ComparisonPipeline {
    extractors: ExtractionPipeline,
    requester: ComparisonRequester,
    renderer: ReportRenderer,
    messenger: Arc<dyn Messenger>,
    sessions: Arc<SessionStore>,
    default_locale: Locale,
}

impl ComparisonPipeline {
    pub fn new(
        extractors: ExtractionPipeline,
        requester: ComparisonRequester,
        renderer: ReportRenderer,
        messenger: Arc<dyn Messenger>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            extractors,
            requester,
            renderer,
            messenger,
            sessions,
            default_locale: Locale::default(),
        }
    }

    /// Wire a pipeline from configuration.
    ///
    /// Fails when the pdf font is missing and pdf output is enabled.
    pub fn from_config(
        config: &CompareConfig,
        llm: Arc<dyn Llm>,
        messenger: Arc<dyn Messenger>,
    ) -> CompareResult<Self> {
        let counter = Arc::new(TiktokenCounter::for_model(&config.llm.model)?);
        let requester = ComparisonRequester::new(
            llm,
            counter,
            config.budget.into(),
            config.llm.temperature,
        )
        .with_retry(RetryPolicy::with_max_retries(config.max_retries));
        let renderer = ReportRenderer::new(config.output_formats.clone(), &config.font_path)?;

        let extractors = ExtractionPipeline::with_defaults();
        debug!(extractors = extractors.len(), "Extraction pipeline ready");
        for format in DocumentFormat::iter().filter(|f| !extractors.supports(*f)) {
            warn!(%format, "No extractor built in, uploads in this format will fail");
        }

        Ok(Self::new(
            extractors,
            requester,
            renderer,
            messenger,
            Arc::new(SessionStore::new()),
        )
        .with_default_locale(config.default_locale))
    }

    pub fn with_default_locale(mut self, locale: Locale) -> Self {
        self.default_locale = locale;
        self
    }

    pub fn default_locale(&self) -> Locale {
        self.default_locale
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Handle one uploaded file from `user` in `chat`.
    pub async fn handle_upload(
        &self,
        user: UserId,
        chat: ChatId,
        file_name: &str,
        bytes: &[u8],
    ) -> UploadOutcome {
        let ui = self.default_locale;

        let format = match DocumentFormat::from_file_name(file_name) {
            Ok(format) => format,
            Err(e) => {
                info!(user_id = %user, file_name, error = %e, "Rejected upload");
                self.reply(chat, &ui.unsupported_format()).await;
                return UploadOutcome::Rejected;
            }
        };

        let extracted = match self.extractors.extract(bytes, format).await {
            Ok(extracted) => extracted,
            Err(e) => {
                warn!(user_id = %user, file_name, %format, error = %e, "Extraction failed");
                self.reply(chat, &ui.extraction_failed(&e.to_string())).await;
                return UploadOutcome::ExtractionFailed;
            }
        };

        let session = self.sessions.session(user);
        let mut session = session.lock().await;

        let pages = extracted.page_count;
        let count = session.push(Upload::new(user, format, file_name, extracted.text));
        info!(
            user_id = %user,
            file_name,
            %format,
            bytes = bytes.len(),
            pages = ?pages,
            count,
            "Upload accepted"
        );
        self.reply(chat, &ui.file_received(count)).await;

        let Some((first, second)) = session.take_pair() else {
            return UploadOutcome::Pending { count };
        };

        // The lock stays held until the comparison finishes so a racing
        // upload from the same user starts a fresh pair afterwards.
        self.compare(user, chat, first, second).await
    }

    async fn compare(
        &self,
        user: UserId,
        chat: ChatId,
        first: Upload,
        second: Upload,
    ) -> UploadOutcome {
        for (index, upload) in [&first, &second].into_iter().enumerate() {
            if upload.is_blank() {
                let index = index + 1;
                warn!(user_id = %user, index, file_name = %upload.file_name, "Document has no text");
                self.reply(chat, &self.default_locale.empty_document(index))
                    .await;
                return UploadOutcome::ComparisonFailed {
                    reason: FailureReason::EmptyDocument { index },
                };
            }
        }

        let locale = select_locale(&first.text, &second.text, self.default_locale);
        debug!(
            user_id = %user,
            %locale,
            pair_wait_ms = second.received_at.duration_since(first.received_at).as_millis(),
            "Comparing pair"
        );
        self.reply(chat, &locale.analysing()).await;

        let report = match self
            .requester
            .request_comparison(&first.text, &second.text, locale)
            .await
        {
            Ok(report) => report,
            Err(e) => {
                let (reason, message) = match &e {
                    CompareError::PromptTooLarge { .. } => {
                        (FailureReason::PromptTooLarge, locale.prompt_too_large())
                    }
                    CompareError::EmptyDocument { index } => (
                        FailureReason::EmptyDocument { index: *index },
                        locale.empty_document(*index),
                    ),
                    _ => (FailureReason::Model, locale.model_failed(&e.to_string())),
                };
                warn!(user_id = %user, error = %e, code = e.code().as_str(), "Comparison failed");
                self.reply(chat, &message).await;
                return UploadOutcome::ComparisonFailed { reason };
            }
        };

        let formats = self.renderer.formats();
        self.reply(chat, &locale.sending_results(formats)).await;

        let labels = locale.document_labels();
        let mut delivered = Vec::with_capacity(formats.len());
        for &format in formats {
            let document = match self.renderer.render(&report.text, format, &labels).await {
                Ok(document) => document,
                Err(e) => {
                    error!(user_id = %user, %format, error = %e, "Render failed");
                    self.reply(chat, &locale.render_failed(&e.to_string())).await;
                    return UploadOutcome::ComparisonFailed {
                        reason: FailureReason::Render,
                    };
                }
            };

            if let Err(e) = self
                .messenger
                .send_document(chat, document.file_name(), document.path())
                .await
            {
                warn!(user_id = %user, %format, error = %e, "Document delivery failed");
                self.reply(chat, &locale.delivery_failed()).await;
                return UploadOutcome::ComparisonFailed {
                    reason: FailureReason::Delivery,
                };
            }
            delivered.push(format);
        }

        info!(
            user_id = %user,
            %locale,
            delivered = delivered.len(),
            total_tokens = ?report.usage.map(|u| u.total_tokens),
            "Comparison delivered"
        );
        UploadOutcome::Compared { delivered }
    }

    /// Send a text reply; failures are logged and otherwise ignored.
    pub async fn reply(&self, chat: ChatId, text: &str) {
        if let Err(e) = self.messenger.send_text(chat, text).await {
            warn!(chat_id = %chat, error = %e, "Failed to send reply");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::TokenBudget;
    use crate::traits::{GenerationOptions, LlmResponse, MockLlm, MockMessenger, TokenCounter};
    use crate::types::Message;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    struct WordCounter;

    impl TokenCounter for WordCounter {
        fn count_messages(&self, messages: &[Message]) -> CompareResult<usize> {
            Ok(messages
                .iter()
                .map(|m| m.content.split_whitespace().count())
                .sum())
        }
    }

    fn report_llm(report: &'static str) -> MockLlm {
        let mut llm = MockLlm::new();
        llm.expect_model_name().return_const("gpt-4".to_string());
        llm.expect_generate()
            .returning(move |_: &[Message], _: Option<GenerationOptions>| {
                Ok(LlmResponse {
                    content: Some(report.to_string()),
                    usage: None,
                })
            });
        llm
    }

    fn failing_llm() -> MockLlm {
        let mut llm = MockLlm::new();
        llm.expect_model_name().return_const("gpt-4".to_string());
        llm.expect_generate()
            .times(1)
            .returning(|_, _| Err(CompareError::llm("upstream rejected the request")));
        llm
    }

    fn pipeline(llm: MockLlm, messenger: MockMessenger, formats: Vec<OutputFormat>) -> ComparisonPipeline {
        let requester = ComparisonRequester::new(
            Arc::new(llm),
            Arc::new(WordCounter),
            TokenBudget::new(8192, 2000),
            0.2,
        );
        ComparisonPipeline::new(
            ExtractionPipeline::with_defaults(),
            requester,
            ReportRenderer::without_pdf(formats),
            Arc::new(messenger),
            Arc::new(SessionStore::new()),
        )
    }

    fn quiet_messenger() -> MockMessenger {
        let mut messenger = MockMessenger::new();
        messenger.expect_send_text().returning(|_, _| Ok(()));
        messenger
    }

    #[tokio::test]
    async fn test_unsupported_format_rejected_without_state_change() {
        let mut messenger = MockMessenger::new();
        messenger
            .expect_send_text()
            .withf(|_, text| text.starts_with("Формат не поддерживается"))
            .times(1)
            .returning(|_, _| Ok(()));

        let mut llm = MockLlm::new();
        llm.expect_generate().never();
        let pipeline = pipeline(llm, messenger, vec![OutputFormat::Txt]);

        let outcome = pipeline
            .handle_upload(UserId(1), ChatId(1), "scan.png", b"\x89PNG")
            .await;
        assert_eq!(outcome, UploadOutcome::Rejected);
        assert_eq!(pipeline.sessions().pending(UserId(1)).await, 0);
    }

    #[tokio::test]
    async fn test_extraction_failure_keeps_pending_upload() {
        let pipeline = pipeline(MockLlm::new(), quiet_messenger(), vec![OutputFormat::Txt]);

        let outcome = pipeline
            .handle_upload(UserId(1), ChatId(1), "ref.txt", b"Voltage: 5V")
            .await;
        assert_eq!(outcome, UploadOutcome::Pending { count: 1 });

        let outcome = pipeline
            .handle_upload(UserId(1), ChatId(1), "broken.txt", &[0xff, 0xfe, 0x00, 0xd8])
            .await;
        assert_eq!(outcome, UploadOutcome::ExtractionFailed);
        assert_eq!(pipeline.sessions().pending(UserId(1)).await, 1);
    }

    #[tokio::test]
    async fn test_blank_document_resets_session() {
        let mut llm = MockLlm::new();
        llm.expect_generate().never();
        let pipeline = pipeline(llm, quiet_messenger(), vec![OutputFormat::Txt]);

        pipeline
            .handle_upload(UserId(1), ChatId(1), "a.txt", b"Voltage: 5V")
            .await;
        let outcome = pipeline
            .handle_upload(UserId(1), ChatId(1), "b.txt", b"   \n")
            .await;

        assert_eq!(
            outcome,
            UploadOutcome::ComparisonFailed {
                reason: FailureReason::EmptyDocument { index: 2 }
            }
        );
        assert_eq!(pipeline.sessions().pending(UserId(1)).await, 0);
    }

    #[tokio::test]
    async fn test_model_failure_resets_session_and_next_upload_starts_new_pair() {
        let sent = Arc::new(Mutex::new(Vec::<String>::new()));
        let log = sent.clone();
        let mut messenger = MockMessenger::new();
        messenger.expect_send_text().returning(move |_, text| {
            log.lock().unwrap().push(text.to_string());
            Ok(())
        });
        messenger.expect_send_document().never();

        let pipeline = pipeline(failing_llm(), messenger, vec![OutputFormat::Txt]);

        pipeline
            .handle_upload(UserId(1), ChatId(1), "a.txt", b"Voltage: 5V")
            .await;
        let outcome = pipeline
            .handle_upload(UserId(1), ChatId(1), "b.txt", b"Voltage: 12V")
            .await;
        assert_eq!(
            outcome,
            UploadOutcome::ComparisonFailed {
                reason: FailureReason::Model
            }
        );
        assert_eq!(pipeline.sessions().pending(UserId(1)).await, 0);

        let outcome = pipeline
            .handle_upload(UserId(1), ChatId(1), "c.txt", b"Voltage: 3V")
            .await;
        assert_eq!(outcome, UploadOutcome::Pending { count: 1 });

        let sent = sent.lock().unwrap();
        assert!(sent.iter().any(|t| t.contains("upstream rejected the request")));
        assert_eq!(sent.last().map(String::as_str), Some("Файл 1 получен."));
    }

    #[tokio::test]
    async fn test_delivery_failure_still_cleans_up() {
        let paths = Arc::new(Mutex::new(Vec::<PathBuf>::new()));
        let seen = paths.clone();

        let mut messenger = quiet_messenger();
        messenger
            .expect_send_document()
            .times(1)
            .returning(move |_, _, path: &Path| {
                seen.lock().unwrap().push(path.to_path_buf());
                Err(CompareError::messenger("upload rejected"))
            });

        let pipeline = pipeline(
            report_llm("Parameter | Doc 1 | Doc 2\nVoltage | 5V | 12V"),
            messenger,
            vec![OutputFormat::Docx, OutputFormat::Txt],
        );

        pipeline
            .handle_upload(UserId(1), ChatId(1), "a.txt", b"Voltage: 5V")
            .await;
        let outcome = pipeline
            .handle_upload(UserId(1), ChatId(1), "b.txt", b"Voltage: 12V")
            .await;

        assert_eq!(
            outcome,
            UploadOutcome::ComparisonFailed {
                reason: FailureReason::Delivery
            }
        );
        let paths = paths.lock().unwrap();
        assert_eq!(paths.len(), 1);
        assert!(!paths[0].exists());
        assert_eq!(pipeline.sessions().pending(UserId(1)).await, 0);
    }

    #[tokio::test]
    async fn test_reply_failure_does_not_abort() {
        let mut messenger = MockMessenger::new();
        messenger
            .expect_send_text()
            .returning(|_, _| Err(CompareError::messenger("chat not found")));

        let pipeline = pipeline(MockLlm::new(), messenger, vec![OutputFormat::Txt]);
        let outcome = pipeline
            .handle_upload(UserId(5), ChatId(5), "a.TXT", b"Voltage: 5V")
            .await;
        assert_eq!(outcome, UploadOutcome::Pending { count: 1 });
    }
}
