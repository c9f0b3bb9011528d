//! Remote completion: send one prompt, get the model's raw text back.
//!
//! Everything above this module talks to a [`CompletionClient`]. Two
//! implementations ship:
//!
//! * [`ChatCompletionsClient`]: a direct HTTPS POST to an OpenAI-compatible
//!   `/chat/completions` endpoint (Perplexity by default). This is the wire
//!   contract the study app uses, with explicit status handling.
//! * [`ProviderClient`]: any `edgequake_llm` provider, for backends that do
//!   not speak the OpenAI wire format.
//!
//! ## No retries
//!
//! Each call is a single attempt. The completion API is billed per call and
//! the user retries by clicking again, so a failed call is reported at once
//! and classified: 429 becomes [`GenerateError::RateLimited`], 401/403
//! [`GenerateError::AuthError`], anything else
//! [`GenerateError::ServiceUnavailable`].

use crate::config::{ClientConfig, API_KEY_VAR};
use crate::error::{ConfigError, GenerateError};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{AUTHORIZATION, RETRY_AFTER};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Longest slice of an error body kept in an error message.
const ERROR_BODY_SNIPPET: usize = 200;

/// Default time budget for one provider call, matching [`ClientConfig`].
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 60;

// Status codes only count as whole tokens: "HTTP 429", not "4290 tokens".
static RE_RATE_LIMITED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b429\b|rate[ _-]?limit").unwrap());
static RE_AUTH_FAILED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b40[13]\b|unauthori[sz]ed|forbidden|invalid api key").unwrap());

/// A backend that turns one prompt into one completion.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Short label used in logs and configuration errors.
    fn name(&self) -> &str;

    /// Send `prompt` as a single user message and return the reply text.
    async fn complete(&self, prompt: &str) -> Result<String, GenerateError>;
}

// ── OpenAI-compatible HTTP client ────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatRequestMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Direct client for an OpenAI-compatible chat-completions endpoint.
pub struct ChatCompletionsClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl std::fmt::Debug for ChatCompletionsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsClient")
            .field("config", &self.config)
            .finish()
    }
}

impl ChatCompletionsClient {
    /// Build a client. A blank API key fails here, not on the first call.
    pub fn new(config: ClientConfig) -> Result<Self, GenerateError> {
        if config.api_key.trim().is_empty() {
            return Err(not_configured(format!(
                "The API key is empty. Set {API_KEY_VAR}."
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerateError::ServiceUnavailable {
                detail: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { http, config })
    }

    /// Build a client from `PERPLEXITY_API_KEY` and friends.
    pub fn from_env() -> Result<Self, GenerateError> {
        let config = ClientConfig::from_env().map_err(|e| match e {
            ConfigError::MissingVar(var) => not_configured(format!("Set {var} to your API key.")),
            other => not_configured(other.to_string()),
        })?;
        Self::new(config)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn transport_error(&self, e: reqwest::Error) -> GenerateError {
        if e.is_timeout() {
            warn!("Completion request timed out after {}s", self.config.timeout_secs);
            GenerateError::Timeout {
                secs: self.config.timeout_secs,
            }
        } else {
            warn!("Completion request failed: {}", e);
            GenerateError::ServiceUnavailable {
                detail: e.to_string(),
            }
        }
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages: vec![ChatRequestMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        }
    }
}

#[async_trait]
impl CompletionClient for ChatCompletionsClient {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, GenerateError> {
        let start = Instant::now();
        info!(
            "Calling {} ({}) with {} prompt chars",
            self.config.endpoint,
            self.config.model,
            prompt.chars().count()
        );

        let response = self
            .http
            .post(&self.config.endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", self.config.api_key))
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            warn!("Completion API error: {} {}", status, snippet(&body));
            return Err(classify_status(status, retry_after, &body));
        }

        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        let content = completion_content(&body)?;

        debug!(
            "Completion: {} chars in {:?}",
            content.chars().count(),
            start.elapsed()
        );
        Ok(content)
    }
}

/// Map a non-success HTTP status to the error a caller should act on.
pub fn classify_status(status: StatusCode, retry_after_secs: Option<u64>, body: &str) -> GenerateError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => GenerateError::RateLimited { retry_after_secs },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GenerateError::AuthError {
            detail: format!("HTTP {}: {}", status.as_u16(), snippet(body)),
        },
        _ => GenerateError::ServiceUnavailable {
            detail: format!("HTTP {}: {}", status.as_u16(), snippet(body)),
        },
    }
}

/// Extract `choices[0].message.content` from a chat-completions body.
pub fn completion_content(body: &str) -> Result<String, GenerateError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| GenerateError::ServiceUnavailable {
            detail: format!("malformed completion response: {e}"),
        })?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| GenerateError::ServiceUnavailable {
            detail: "completion response has no choices[0].message.content".to_string(),
        })
}

fn snippet(body: &str) -> &str {
    crate::pipeline::request::truncate_chars(body.trim(), ERROR_BODY_SNIPPET)
}

fn not_configured(hint: String) -> GenerateError {
    GenerateError::ServiceNotConfigured {
        service: "chat-completions".to_string(),
        hint,
    }
}

// ── edgequake-llm provider ───────────────────────────────────────────────

/// Adapter from an `edgequake_llm` provider to [`CompletionClient`].
pub struct ProviderClient {
    provider: Arc<dyn LLMProvider>,
    label: String,
    temperature: f32,
    max_tokens: usize,
    timeout_secs: u64,
}

impl ProviderClient {
    /// Wrap a pre-built provider with the default sampling settings.
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>) -> Self {
        Self {
            provider,
            label: label.into(),
            temperature: 0.7,
            max_tokens: 4000,
            timeout_secs: DEFAULT_PROVIDER_TIMEOUT_SECS,
        }
    }

    /// Instantiate a named provider (`openai`, `anthropic`, `ollama`, …).
    ///
    /// The provider reads its own API key variable; a factory failure is a
    /// configuration error.
    pub fn from_name(provider_name: &str, model: &str) -> Result<Self, GenerateError> {
        let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
            GenerateError::ServiceNotConfigured {
                service: provider_name.to_string(),
                hint: format!("{e}"),
            }
        })?;
        Ok(Self::new(provider, format!("{provider_name}/{model}")))
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: usize) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    /// Give up on a provider call after `secs` seconds (minimum 1).
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs.max(1);
        self
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    fn build_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

#[async_trait]
impl CompletionClient for ProviderClient {
    fn name(&self) -> &str {
        &self.label
    }

    async fn complete(&self, prompt: &str) -> Result<String, GenerateError> {
        info!("Calling provider {} with {} prompt chars", self.label, prompt.chars().count());
        let messages = vec![ChatMessage::user(prompt)];
        let options = self.build_options();

        let call = async {
            self.provider
                .chat(&messages, Some(&options))
                .await
                .map_err(|e| {
                    let msg = format!("{}", e);
                    warn!("Provider {} failed: {}", self.label, msg);
                    classify_provider_error(&msg)
                })
        };

        let response = with_deadline(self.timeout_secs, call).await.map_err(|e| {
            if let GenerateError::Timeout { secs } = e {
                warn!("Provider {} timed out after {}s", self.label, secs);
            }
            e
        })?;

        debug!(
            "Provider {}: {} input tokens, {} output tokens",
            self.label, response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }
}

/// Await `call`, or fail with [`GenerateError::Timeout`] once `secs` elapse.
pub async fn with_deadline<T, F>(secs: u64, call: F) -> Result<T, GenerateError>
where
    F: Future<Output = Result<T, GenerateError>>,
{
    match tokio::time::timeout(Duration::from_secs(secs), call).await {
        Ok(result) => result,
        Err(_) => Err(GenerateError::Timeout { secs }),
    }
}

/// Providers report failures as text; recover the rate-limit case from it.
pub fn classify_provider_error(message: &str) -> GenerateError {
    if RE_RATE_LIMITED.is_match(message) {
        GenerateError::RateLimited {
            retry_after_secs: None,
        }
    } else if RE_AUTH_FAILED.is_match(message) {
        GenerateError::AuthError {
            detail: message.to_string(),
        }
    } else {
        GenerateError::ServiceUnavailable {
            detail: message.to_string(),
        }
    }
}
