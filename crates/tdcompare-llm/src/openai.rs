//! OpenAI chat-completions provider.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use tdcompare_core::error::{CompareError, CompareResult};
use tdcompare_core::traits::{GenerationOptions, Llm, LlmConfig, LlmResponse, TokenUsage};
use tdcompare_core::types::Message;
#[cfg(feature = "openai")]
use tdcompare_core::types::MessageRole;

#[cfg(feature = "openai")]
use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
    },
    Client,
};

/// OpenAI LLM provider.
pub struct OpenAIProvider {
    #[cfg(feature = "openai")]
    client: Client<OpenAIConfig>,
    config: LlmConfig,
}

impl std::fmt::Debug for OpenAIProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIProvider")
            .field("model", &self.config.model)
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

impl OpenAIProvider {
    /// Create a new OpenAI LLM provider.
    ///
    /// The key comes from `config.api_key`, then `OPENAI_API_KEY`.
    pub fn new(config: LlmConfig) -> CompareResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok().map(SecretString::new))
            .ok_or_else(|| {
                CompareError::Configuration(
                    "OpenAI API key not found. Set OPENAI_API_KEY.".to_string(),
                )
            })?;

        #[cfg(feature = "openai")]
        let client = {
            let mut openai_config = OpenAIConfig::new().with_api_key(api_key.expose_secret());
            if let Some(ref base_url) = config.base_url {
                openai_config = openai_config.with_api_base(base_url);
            }
            Client::with_config(openai_config)
        };
        #[cfg(not(feature = "openai"))]
        drop(api_key);

        let mut config = config;
        if config.model.is_empty() {
            config.model = LlmConfig::default().model;
        }

        Ok(Self {
            #[cfg(feature = "openai")]
            client,
            config,
        })
    }

    /// Reasoning models reject sampling parameters.
    fn is_reasoning_model(&self) -> bool {
        let model = self.config.model.to_lowercase();
        ["o1", "o3", "o4"].iter().any(|m| model.starts_with(m))
    }

    #[cfg(feature = "openai")]
    fn message_to_openai(msg: &Message) -> ChatCompletionRequestMessage {
        match msg.role {
            MessageRole::User => {
                ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                    content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
                    name: None,
                })
            }
        }
    }
}

/// Classify an API error body by its `type`/`code` fields.
pub(crate) fn classify_api_error(
    message: &str,
    error_type: Option<&str>,
    code: Option<&str>,
) -> CompareError {
    let message = format!("OpenAI API error: {}", message);
    match (error_type, code) {
        (_, Some("rate_limit_exceeded")) | (Some("rate_limit_error"), _) => {
            CompareError::rate_limit(message)
        }
        (_, Some("invalid_api_key")) | (Some("authentication_error"), _) => {
            CompareError::authentication(message)
        }
        (Some("server_error"), _) => CompareError::api(message),
        _ => CompareError::llm(message),
    }
}

#[cfg(feature = "openai")]
fn map_openai_error(err: OpenAIError) -> CompareError {
    match err {
        OpenAIError::ApiError(api) => {
            classify_api_error(&api.message, api.r#type.as_deref(), api.code.as_deref())
        }
        OpenAIError::Reqwest(e) => CompareError::api(format!("OpenAI request failed: {}", e)),
        other => CompareError::llm(format!("OpenAI API error: {}", other)),
    }
}

#[async_trait]
impl Llm for OpenAIProvider {
    #[cfg(feature = "openai")]
    async fn generate(
        &self,
        messages: &[Message],
        options: Option<GenerationOptions>,
    ) -> CompareResult<LlmResponse> {
        let options = options.unwrap_or_default();

        let mut request = CreateChatCompletionRequest {
            model: self.config.model.clone(),
            messages: messages.iter().map(Self::message_to_openai).collect(),
            ..Default::default()
        };

        // Only add temperature for non-reasoning models
        if !self.is_reasoning_model() {
            request.temperature = Some(options.temperature.unwrap_or(self.config.temperature));
        }
        request.max_tokens = options.max_tokens;

        debug!(
            model = %self.config.model,
            messages = messages.len(),
            max_tokens = ?options.max_tokens,
            "Sending chat completion request"
        );

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(map_openai_error)?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CompareError::llm_invalid_response("No response choices returned"))?;

        let usage = response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(LlmResponse {
            content: choice.message.content,
            usage,
        })
    }

    #[cfg(not(feature = "openai"))]
    async fn generate(
        &self,
        _messages: &[Message],
        _options: Option<GenerationOptions>,
    ) -> CompareResult<LlmResponse> {
        Err(CompareError::Configuration(
            "OpenAI feature not enabled. Enable the 'openai' feature.".to_string(),
        ))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
