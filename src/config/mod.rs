//! Configuration (layered: code > env > file defaults).

use std::fmt;
use std::path::Path;
use std::time::Duration;

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RillError};
use crate::types::DEFAULT_MAX_TOOLS;
use crate::util::retry::RetryPolicy;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Settings for one chat-completions client.
#[derive(Clone, PartialEq, Serialize, Deserialize, Builder)]
#[serde(default)]
pub struct RillConfig {
    #[builder(default = DEFAULT_BASE_URL.to_string(), into)]
    pub base_url: String,
    #[builder(into)]
    pub api_key: Option<String>,
    #[builder(default)]
    pub retry: RetryConfig,
    /// Requests declaring more tools than this are rejected before sending.
    #[builder(default = DEFAULT_MAX_TOOLS)]
    pub max_tools: usize,
    #[builder(default)]
    pub inline_tags: InlineTagConfig,
    /// Recognise `<tool_call>` blocks written into plain text.
    #[builder(default)]
    pub text_tool_calls: bool,
}

impl fmt::Debug for RillConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RillConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| ".."))
            .field("retry", &self.retry)
            .field("max_tools", &self.max_tools)
            .field("inline_tags", &self.inline_tags)
            .field("text_tool_calls", &self.text_tool_calls)
            .finish()
    }
}

impl Default for RillConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Bounded retry settings for the request executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            multiplier: self.multiplier,
        }
    }
}

/// Markers delimiting reasoning embedded in plain content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InlineTagConfig {
    pub start: String,
    pub end: String,
}

impl Default for InlineTagConfig {
    fn default() -> Self {
        Self {
            start: "<think>".to_string(),
            end: "</think>".to_string(),
        }
    }
}

impl RillConfig {
    /// Load from environment variables, reading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // optional
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    ///
    /// Recognised keys: `RILL_BASE_URL`, `RILL_API_KEY` (falling back to
    /// `OPENAI_API_KEY`), `RILL_MAX_ATTEMPTS`, `RILL_BACKOFF_MS`, `RILL_MAX_TOOLS`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup("RILL_BASE_URL") {
            config.base_url = url;
        }
        config.api_key = lookup("RILL_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        if let Some(value) = lookup("RILL_MAX_ATTEMPTS") {
            config.retry.max_attempts = parse_var("RILL_MAX_ATTEMPTS", &value)?;
        }
        if let Some(value) = lookup("RILL_BACKOFF_MS") {
            config.retry.initial_backoff_ms = parse_var("RILL_BACKOFF_MS", &value)?;
        }
        if let Some(value) = lookup("RILL_MAX_TOOLS") {
            config.max_tools = parse_var("RILL_MAX_TOOLS", &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| RillError::Configuration(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(RillError::Configuration(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.retry.multiplier < 1.0 {
            return Err(RillError::Configuration(
                "retry.multiplier must be >= 1.0".into(),
            ));
        }
        if self.inline_tags.start.is_empty() || self.inline_tags.end.is_empty() {
            return Err(RillError::Configuration(
                "inline tag markers must not be empty".into(),
            ));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| RillError::Configuration(format!("{name} has invalid value {value:?}")))
}
