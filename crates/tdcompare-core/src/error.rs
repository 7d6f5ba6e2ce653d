//! Error types for tdcompare operations.
//!
//! One workspace-wide error enum with structured error codes. The
//! extraction and rendering crates keep their own error types and convert
//! into [`CompareError`] at the pipeline boundary.

use tdcompare_extractors::ExtractError;
use tdcompare_render::RenderError;
use thiserror::Error;

/// Result type alias for tdcompare operations.
pub type CompareResult<T> = Result<T, CompareError>;

/// Main error type for all tdcompare operations.
#[derive(Error, Debug)]
pub enum CompareError {
    /// Authentication failed.
    #[error("Authentication error: {message}")]
    Authentication {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        message: String,
        code: ErrorCode,
        retry_after: Option<u64>,
    },

    /// LLM operation failed.
    #[error("LLM error: {message}")]
    Llm {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Network error.
    #[error("Network error: {message}")]
    Network {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The uploaded file's extension is not a supported document format.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Text extraction failed.
    #[error("Extraction error: {0}")]
    Extraction(#[source] ExtractError),

    /// A document produced no usable text. `index` is 1-based.
    #[error("Document {index} has no extractable text")]
    EmptyDocument { index: usize },

    /// The prompt leaves no room for a completion in the context window.
    #[error(
        "Prompt too large: {prompt_tokens} tokens leaves {available} of the {context_window}-token context window"
    )]
    PromptTooLarge {
        prompt_tokens: usize,
        context_window: u32,
        available: u32,
    },

    /// Report rendering failed.
    #[error("Render error: {0}")]
    Render(#[source] RenderError),

    /// Chat transport failed to deliver a message or document.
    #[error("Messenger error: {message}")]
    Messenger { message: String, code: ErrorCode },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Authentication (AUTH_xxx)
    AuthInvalidKey,

    // Validation (VAL_xxx)
    ValUnsupportedFormat,
    ValEmptyDocument,

    // Rate Limit (RATE_xxx)
    RateLimitExceeded,

    // LLM (LLM_xxx)
    LlmGenerationFailed,
    LlmInvalidResponse,
    LlmPromptTooLarge,

    // Extraction (EXT_xxx)
    ExtFailed,

    // Render (RND_xxx)
    RndConfiguration,
    RndFailed,

    // Messenger (MSG_xxx)
    MsgSendFailed,
    MsgDownloadFailed,

    // Network (NET_xxx)
    NetConnectionFailed,

    // Configuration
    Configuration,

    // Local IO
    Io,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AuthInvalidKey => "AUTH_001",
            ErrorCode::ValUnsupportedFormat => "VAL_003",
            ErrorCode::ValEmptyDocument => "VAL_006",
            ErrorCode::RateLimitExceeded => "RATE_001",
            ErrorCode::LlmGenerationFailed => "LLM_002",
            ErrorCode::LlmInvalidResponse => "LLM_003",
            ErrorCode::LlmPromptTooLarge => "LLM_004",
            ErrorCode::ExtFailed => "EXT_001",
            ErrorCode::RndConfiguration => "RND_001",
            ErrorCode::RndFailed => "RND_002",
            ErrorCode::MsgSendFailed => "MSG_001",
            ErrorCode::MsgDownloadFailed => "MSG_002",
            ErrorCode::NetConnectionFailed => "NET_002",
            ErrorCode::Configuration => "CFG_001",
            ErrorCode::Io => "IO_001",
        }
    }
}

impl CompareError {
    /// Create an LLM error.
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm {
            message: message.into(),
            code: ErrorCode::LlmGenerationFailed,
            source: None,
        }
    }

    /// Create an LLM error for a response that carried no usable content.
    pub fn llm_invalid_response(message: impl Into<String>) -> Self {
        Self::Llm {
            message: message.into(),
            code: ErrorCode::LlmInvalidResponse,
            source: None,
        }
    }

    /// Create an API error.
    pub fn api(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            code: ErrorCode::NetConnectionFailed,
            source: None,
        }
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
            code: ErrorCode::AuthInvalidKey,
            source: None,
        }
    }

    /// Create a rate limit error.
    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::RateLimit {
            message: message.into(),
            code: ErrorCode::RateLimitExceeded,
            retry_after: None,
        }
    }

    /// Create a messenger send error.
    pub fn messenger(message: impl Into<String>) -> Self {
        Self::Messenger {
            message: message.into(),
            code: ErrorCode::MsgSendFailed,
        }
    }

    /// Create a messenger download error.
    pub fn download(message: impl Into<String>) -> Self {
        Self::Messenger {
            message: message.into(),
            code: ErrorCode::MsgDownloadFailed,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Authentication { code, .. } => *code,
            Self::RateLimit { code, .. } => *code,
            Self::Llm { code, .. } => *code,
            Self::Network { code, .. } => *code,
            Self::Messenger { code, .. } => *code,
            Self::Configuration(_) => ErrorCode::Configuration,
            Self::UnsupportedFormat(_) => ErrorCode::ValUnsupportedFormat,
            Self::Extraction(_) => ErrorCode::ExtFailed,
            Self::EmptyDocument { .. } => ErrorCode::ValEmptyDocument,
            Self::PromptTooLarge { .. } => ErrorCode::LlmPromptTooLarge,
            Self::Render(e) if e.is_configuration() => ErrorCode::RndConfiguration,
            Self::Render(_) => ErrorCode::RndFailed,
            Self::Io(_) => ErrorCode::Io,
        }
    }

    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimit { .. } | Self::Network { .. })
    }

    /// Failures that indicate a broken deployment rather than a bad request.
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::Configuration(_) | Self::Authentication { .. } => true,
            Self::Render(e) => e.is_configuration(),
            _ => false,
        }
    }
}

impl From<ExtractError> for CompareError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::UnsupportedFormat(ext) => Self::UnsupportedFormat(ext),
            other => Self::Extraction(other),
        }
    }
}

impl From<RenderError> for CompareError {
    fn from(err: RenderError) -> Self {
        Self::Render(err)
    }
}
