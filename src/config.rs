//! Configuration types for extraction and generation.
//!
//! Two small structs cover every knob:
//!
//! * [`ExtractOptions`]: upload ceilings (bytes, pages).
//! * [`ClientConfig`]: how to reach the chat-completion endpoint, built via
//!   [`ClientConfigBuilder`] or loaded with [`ClientConfig::from_env`].
//!
//! [`Difficulty`] and the card-count constants describe a single generation
//! request.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest accepted upload: 10 MiB.
pub const MAX_DOCUMENT_BYTES: u64 = 10 * 1024 * 1024;

/// Pages beyond this are never read.
pub const MAX_PAGES: usize = 50;

/// Source text is cut to this many characters before it enters the prompt.
pub const MAX_SOURCE_CHARS: usize = 8000;

/// Upper bound on the number of cards one request may ask for.
pub const MAX_CARD_COUNT: usize = 50;

/// Card counts offered by the study app's generation form.
pub const CARD_COUNT_CHOICES: [usize; 4] = [5, 10, 15, 20];

/// Card count used when the caller does not pick one.
pub const DEFAULT_CARD_COUNT: usize = 10;

/// Environment variable holding the completion API credential.
pub const API_KEY_VAR: &str = "PERPLEXITY_API_KEY";

pub const DEFAULT_ENDPOINT: &str = "https://api.perplexity.ai/chat/completions";
pub const DEFAULT_MODEL: &str = "sonar-pro";

/// Ceilings applied to an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractOptions {
    /// Maximum document size in bytes. Default: 10 MiB.
    pub max_bytes: u64,
    /// Maximum number of pages read, starting at page 1. Default: 50.
    pub max_pages: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_bytes: MAX_DOCUMENT_BYTES,
            max_pages: MAX_PAGES,
        }
    }
}

/// How hard the generated questions should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Basic,
    #[default]
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Basic => "basic",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Difficulty::Basic),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            other => Err(ConfigError::Invalid(format!(
                "difficulty must be basic, intermediate or advanced, got '{other}'"
            ))),
        }
    }
}

/// Settings for [`crate::pipeline::completion::ChatCompletionsClient`].
///
/// The credential is required: a config can only be built with one, and a
/// blank key is rejected when the client is constructed.
#[derive(Clone)]
pub struct ClientConfig {
    /// Bearer credential sent in the `Authorization` header.
    pub api_key: String,

    /// Full chat-completions URL. Default: Perplexity's endpoint.
    pub endpoint: String,

    /// Model identifier. Default: `sonar-pro`.
    pub model: String,

    /// Sampling temperature. Default: 0.7.
    pub temperature: f32,

    /// Completion token ceiling. Default: 4000.
    pub max_tokens: u32,

    /// Per-request timeout in seconds. Default: 60.
    pub timeout_secs: u64,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ClientConfig {
    /// Create a new builder around `api_key`, with every other field defaulted.
    pub fn builder(api_key: impl Into<String>) -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self {
                api_key: api_key.into(),
                endpoint: DEFAULT_ENDPOINT.to_string(),
                model: DEFAULT_MODEL.to_string(),
                temperature: 0.7,
                max_tokens: 4000,
                timeout_secs: 60,
            },
        }
    }

    /// Load the configuration from the environment.
    ///
    /// Reads `.env` first (outside tests), then `PERPLEXITY_API_KEY`,
    /// `PDF2CARDS_ENDPOINT`, `PDF2CARDS_MODEL` and `PDF2CARDS_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let api_key = std::env::var(API_KEY_VAR)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingVar(API_KEY_VAR.to_string()))?;

        let mut builder = Self::builder(api_key);

        if let Ok(endpoint) = std::env::var("PDF2CARDS_ENDPOINT") {
            builder = builder.endpoint(endpoint);
        }
        if let Ok(model) = std::env::var("PDF2CARDS_MODEL") {
            builder = builder.model(model);
        }
        if let Ok(secs) = std::env::var("PDF2CARDS_TIMEOUT_SECS") {
            let secs = secs.parse::<u64>().map_err(|e| {
                ConfigError::InvalidValue("PDF2CARDS_TIMEOUT_SECS".to_string(), e.to_string())
            })?;
            builder = builder.timeout_secs(secs);
        }

        builder.build()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t;
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        let c = &self.config;
        if !(0.0..=2.0).contains(&c.temperature) {
            return Err(ConfigError::Invalid(format!(
                "temperature must be 0.0–2.0, got {}",
                c.temperature
            )));
        }
        if c.max_tokens == 0 {
            return Err(ConfigError::Invalid("max_tokens must be ≥ 1".into()));
        }
        if c.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout must be ≥ 1 second".into()));
        }
        if !(c.endpoint.starts_with("http://") || c.endpoint.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "endpoint must be an http(s) URL, got '{}'",
                c.endpoint
            )));
        }
        if c.model.trim().is_empty() {
            return Err(ConfigError::Invalid("model must not be empty".into()));
        }
        Ok(self.config)
    }
}
