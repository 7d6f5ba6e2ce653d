//! Rendering error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while rendering a report.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The font required for fixed-layout output does not exist.
    #[error("PDF font not found: {}", .0.display())]
    MissingFont(PathBuf),

    /// The font file exists but could not be embedded.
    #[error("PDF font could not be loaded from {}: {message}", .path.display())]
    FontLoad { path: PathBuf, message: String },

    /// The requested output format is not configured on this renderer.
    #[error("Output format not enabled: {0}")]
    FormatDisabled(String),

    /// Document writer failed.
    #[error("{format} rendering failed: {message}")]
    Encode {
        format: &'static str,
        message: String,
    },

    /// IO error writing the temp file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Task join error from spawn_blocking.
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl RenderError {
    /// Configuration problems that must halt startup instead of failing one request.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingFont(_) | Self::FontLoad { .. } | Self::FormatDisabled(_)
        )
    }

    pub(crate) fn encode(format: &'static str, message: impl ToString) -> Self {
        Self::Encode {
            format,
            message: message.to_string(),
        }
    }
}

/// Result type for rendering operations.
pub type RenderResult<T> = Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors() {
        assert!(RenderError::MissingFont(PathBuf::from("x.ttf")).is_configuration());
        assert!(!RenderError::encode("docx", "zip failure").is_configuration());
    }

    #[test]
    fn test_missing_font_message_names_path() {
        let err = RenderError::MissingFont(PathBuf::from("/opt/fonts/MyDejaVuSans.ttf"));
        assert!(err.to_string().contains("/opt/fonts/MyDejaVuSans.ttf"));
    }
}
