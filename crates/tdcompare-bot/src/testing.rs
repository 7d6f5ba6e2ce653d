//! In-memory doubles shared by the dispatcher and poller tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tdcompare_core::{
    ChatId, CompareError, CompareResult, ComparisonPipeline, ComparisonRequester,
    ExtractionPipeline, GenerationOptions, Llm, LlmResponse, Message as LlmMessage, Messenger,
    OutputFormat, ReportRenderer, SessionStore, TokenBudget, TokenCounter, UserId,
};

use crate::dispatcher::{Dispatcher, FileSource, ShutdownHandle};
use crate::telegram::{Chat, Document, Message, User};

pub const ADMIN: i64 = 100;

/// Answers every request with a fixed summary and keeps the prompts.
#[derive(Default)]
pub struct RecordingLlm {
    pub prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl Llm for RecordingLlm {
    async fn generate(
        &self,
        messages: &[LlmMessage],
        _options: Option<GenerationOptions>,
    ) -> CompareResult<LlmResponse> {
        let prompt = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        self.prompts.lock().unwrap().push(prompt);
        Ok(LlmResponse {
            content: Some("Итог: документы совпадают.".to_string()),
            usage: None,
        })
    }

    fn model_name(&self) -> &str {
        "recording"
    }
}

pub struct CharCounter;

impl TokenCounter for CharCounter {
    fn count_messages(&self, messages: &[LlmMessage]) -> CompareResult<usize> {
        Ok(messages.iter().map(|m| m.content.chars().count()).sum())
    }
}

#[derive(Default)]
pub struct RecordingMessenger {
    pub texts: Mutex<Vec<(ChatId, String)>>,
    pub documents: Mutex<Vec<(ChatId, String)>>,
}

impl RecordingMessenger {
    pub fn last_text(&self) -> String {
        self.texts
            .lock()
            .unwrap()
            .last()
            .map(|(_, t)| t.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_text(&self, chat: ChatId, text: &str) -> CompareResult<()> {
        self.texts.lock().unwrap().push((chat, text.to_string()));
        Ok(())
    }

    async fn send_document(&self, chat: ChatId, file_name: &str, _path: &Path) -> CompareResult<()> {
        self.documents
            .lock()
            .unwrap()
            .push((chat, file_name.to_string()));
        Ok(())
    }
}

pub struct Harness {
    pub dispatcher: Arc<Dispatcher>,
    pub messenger: Arc<RecordingMessenger>,
    pub llm: Arc<RecordingLlm>,
    pub shutdown: ShutdownHandle,
}

/// Dispatcher over a txt-only pipeline with recording doubles.
pub fn harness(files: impl FileSource + 'static) -> Harness {
    let messenger = Arc::new(RecordingMessenger::default());
    let llm = Arc::new(RecordingLlm::default());
    let requester = ComparisonRequester::new(
        llm.clone(),
        Arc::new(CharCounter),
        TokenBudget::new(8192, 2000),
        0.2,
    );
    let pipeline = ComparisonPipeline::new(
        ExtractionPipeline::with_defaults(),
        requester,
        ReportRenderer::without_pdf(vec![OutputFormat::Txt]),
        messenger.clone(),
        Arc::new(SessionStore::new()),
    );
    let shutdown = ShutdownHandle::new();
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::new(pipeline),
        Arc::new(files),
        UserId(ADMIN),
        shutdown.clone(),
    ));
    Harness {
        dispatcher,
        messenger,
        llm,
        shutdown,
    }
}

pub fn text(from: i64, text: &str) -> Message {
    Message {
        message_id: 1,
        from: Some(User {
            id: from,
            is_bot: false,
            username: None,
        }),
        chat: Chat { id: from },
        text: Some(text.to_string()),
        document: None,
    }
}

pub fn document(from: i64, file_id: &str, file_name: &str) -> Message {
    Message {
        text: None,
        document: Some(Document {
            file_id: file_id.to_string(),
            file_name: Some(file_name.to_string()),
            file_size: None,
        }),
        ..text(from, "")
    }
}

/// Serves canned content, sleeping first for the ids listed in `delays`.
pub struct SlowFiles {
    pub delays: HashMap<&'static str, Duration>,
    pub content: HashMap<&'static str, &'static str>,
}

#[async_trait]
impl FileSource for SlowFiles {
    async fn download(&self, file_id: &str) -> CompareResult<Vec<u8>> {
        if let Some(delay) = self.delays.get(file_id) {
            tokio::time::sleep(*delay).await;
        }
        self.content
            .get(file_id)
            .map(|text| text.as_bytes().to_vec())
            .ok_or_else(|| CompareError::download(format!("unknown file {file_id}")))
    }
}
