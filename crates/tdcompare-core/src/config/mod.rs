//! Configuration system for tdcompare.

use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tdcompare_render::OutputFormat;
use tracing::warn;

use crate::error::{CompareError, CompareResult};
use crate::locale::Locale;
use crate::traits::LlmConfig;

/// Token budget limits for a comparison request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Total tokens the model accepts (prompt + completion).
    pub context_window: u32,
    /// Upper bound on completion tokens.
    pub completion_cap: u32,
    /// Budgets below this refuse the request as too large.
    pub min_completion_tokens: u32,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            context_window: 8192,
            completion_cap: 2000,
            min_completion_tokens: 1,
        }
    }
}

/// Session expiry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Sessions idle longer than this are evicted.
    pub idle_ttl_secs: u64,
    /// How often the sweeper runs.
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_ttl_secs: 3600,
            sweep_interval_secs: 300,
        }
    }
}

/// Main comparison configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    /// LLM configuration.
    pub llm: LlmConfig,
    /// Token budget.
    pub budget: BudgetConfig,
    /// Session expiry.
    pub session: SessionConfig,
    /// Formats delivered after each comparison, in send order.
    pub output_formats: Vec<OutputFormat>,
    /// TrueType font embedded in pdf output.
    pub font_path: PathBuf,
    /// Locale for replies sent before a pair is complete.
    pub default_locale: Locale,
    /// Extra attempts for transient provider failures.
    pub max_retries: u32,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            budget: BudgetConfig::default(),
            session: SessionConfig::default(),
            output_formats: OutputFormat::ALL.to_vec(),
            font_path: PathBuf::from("MyDejaVuSans.ttf"),
            default_locale: Locale::default(),
            max_retries: 0,
        }
    }
}

impl CompareConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> CompareResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        let config: Self = match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| CompareError::Configuration(e.to_string()))?
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| CompareError::Configuration(e.to_string()))?,
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| CompareError::Configuration(e.to_string()))?,
            _ => {
                return Err(CompareError::Configuration(
                    "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
                ))
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> CompareResult<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Overlay environment variables onto this configuration.
    pub fn apply_env(&mut self) -> CompareResult<()> {
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            self.llm.model = model;
        }
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            self.llm.base_url = Some(base_url);
        }
        if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
            self.llm.api_key = Some(SecretString::new(api_key));
        }

        if let Some(v) = parse_env("TDC_CONTEXT_WINDOW")? {
            self.budget.context_window = v;
        }
        if let Some(v) = parse_env("TDC_COMPLETION_CAP")? {
            self.budget.completion_cap = v;
        }
        if let Some(v) = parse_env("TDC_SESSION_TTL_SECS")? {
            self.session.idle_ttl_secs = v;
        }
        if let Some(v) = parse_env("TDC_SWEEP_INTERVAL_SECS")? {
            self.session.sweep_interval_secs = v;
        }
        if let Some(v) = parse_env("TDC_MAX_RETRIES")? {
            self.max_retries = v;
        }
        if let Some(locale) = parse_env("TDC_DEFAULT_LOCALE")? {
            self.default_locale = locale;
        }
        if let Ok(path) = std::env::var("TDC_FONT_PATH") {
            self.font_path = PathBuf::from(path);
        }
        if let Ok(formats) = std::env::var("TDC_OUTPUT_FORMATS") {
            self.output_formats = parse_formats(&formats)?;
        }

        self.validate()
    }

    /// Reject settings that would make every comparison fail.
    pub fn validate(&self) -> CompareResult<()> {
        if self.output_formats.is_empty() {
            return Err(CompareError::Configuration(
                "output_formats must name at least one format".to_string(),
            ));
        }
        if self.budget.completion_cap == 0 {
            return Err(CompareError::Configuration(
                "completion_cap must be greater than zero".to_string(),
            ));
        }
        if self.budget.completion_cap >= self.budget.context_window {
            warn!(
                completion_cap = self.budget.completion_cap,
                context_window = self.budget.context_window,
                "Completion cap is not smaller than the context window"
            );
        }
        Ok(())
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> CompareConfigBuilder {
        CompareConfigBuilder::default()
    }
}

fn parse_env<T>(key: &str) -> CompareResult<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| CompareError::Configuration(format!("{}={:?}: {}", key, raw, e))),
        Err(_) => Ok(None),
    }
}

/// Parse a comma-separated list such as `docx,pdf,txt`, dropping duplicates.
pub fn parse_formats(raw: &str) -> CompareResult<Vec<OutputFormat>> {
    let mut formats = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let format: OutputFormat = name
            .parse()
            .map_err(|_| CompareError::Configuration(format!("Unknown output format: {}", name)))?;
        if !formats.contains(&format) {
            formats.push(format);
        }
    }
    Ok(formats)
}

/// Builder for CompareConfig.
#[derive(Default)]
pub struct CompareConfigBuilder {
    config: CompareConfig,
}

impl CompareConfigBuilder {
    /// Set LLM configuration.
    pub fn llm(mut self, config: LlmConfig) -> Self {
        self.config.llm = config;
        self
    }

    /// Set token budget.
    pub fn budget(mut self, budget: BudgetConfig) -> Self {
        self.config.budget = budget;
        self
    }

    /// Set session expiry.
    pub fn session(mut self, session: SessionConfig) -> Self {
        self.config.session = session;
        self
    }

    /// Set delivered output formats.
    pub fn output_formats(mut self, formats: Vec<OutputFormat>) -> Self {
        self.config.output_formats = formats;
        self
    }

    /// Set pdf font path.
    pub fn font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.font_path = path.into();
        self
    }

    /// Set default locale.
    pub fn default_locale(mut self, locale: Locale) -> Self {
        self.config.default_locale = locale;
        self
    }

    /// Set retry count for transient provider failures.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> CompareConfig {
        self.config
    }
}
