//! Chat Completions client for OpenAI and servers that mimic its API
//! (Ollama, LM Studio, vLLM and friends).

use crate::llm_provider::*;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";
pub const LM_STUDIO_BASE_URL: &str = "http://localhost:1234/v1";

#[derive(Debug, Clone)]
pub struct OpenAICompatibleConfig {
    /// Root of the API, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    pub model: String,
    /// Per-attempt timeout
    pub timeout_secs: u64,
    /// Extra attempts after the first one
    pub max_retries: u32,
    /// Sent as a bearer token when present
    pub api_key: Option<SecretString>,
    pub provider_name: String,
}

impl Default for OpenAICompatibleConfig {
    fn default() -> Self {
        Self {
            base_url: OPENAI_BASE_URL.to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 30,
            max_retries: 3,
            api_key: None,
            provider_name: "openai".to_string(),
        }
    }
}

impl OpenAICompatibleConfig {
    pub fn openai(model: String, api_key: SecretString) -> Self {
        Self {
            model,
            api_key: Some(api_key),
            ..Default::default()
        }
    }

    pub fn lm_studio(model: String) -> Self {
        Self::local(LM_STUDIO_BASE_URL, "lmstudio", model)
    }

    pub fn ollama(model: String) -> Self {
        Self::local(OLLAMA_BASE_URL, "ollama", model)
    }

    fn local(base_url: &str, provider_name: &str, model: String) -> Self {
        Self {
            base_url: base_url.to_string(),
            model,
            provider_name: provider_name.to_string(),
            ..Default::default()
        }
    }
}

/// Delay before retry number `retry` (1-based): 1 s, 2 s, 4 s, ...
fn backoff_delay(retry: u32) -> Duration {
    Duration::from_secs(1u64 << retry.saturating_sub(1).min(6))
}

/// Auth and malformed-request errors will not improve on retry; rate
/// limits, timeouts and server errors might.
fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

enum AttemptError {
    Transient(anyhow::Error),
    Permanent(anyhow::Error),
}

pub struct OpenAICompatibleProvider {
    config: OpenAICompatibleConfig,
    client: Client,
}

impl OpenAICompatibleProvider {
    pub fn new(config: OpenAICompatibleConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { config, client })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn with_auth(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.config.api_key {
            Some(key) => builder.bearer_auth(key.expose_secret()),
            None => builder,
        }
    }

    fn wire_request(&self, messages: &[Message], config: &GenerationConfig) -> WireRequest {
        WireRequest {
            model: self.config.model.clone(),
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str().to_string(),
                    content: Some(m.content.clone()),
                })
                .collect(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            top_p: config.top_p,
        }
    }

    async fn post_with_retries(&self, request: &WireRequest) -> Result<WireResponse> {
        let attempts = self.config.max_retries + 1;
        let mut retry = 0;

        loop {
            match self.post_once(request).await {
                Ok(response) => return Ok(response),
                Err(AttemptError::Permanent(e)) => return Err(e),
                Err(AttemptError::Transient(e)) if retry + 1 >= attempts => {
                    return Err(e.context(format!("giving up after {} attempts", attempts)));
                }
                Err(AttemptError::Transient(e)) => {
                    retry += 1;
                    let delay = backoff_delay(retry);
                    warn!(
                        provider = %self.config.provider_name,
                        attempt = retry,
                        of = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "chat completion failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn post_once(
        &self,
        request: &WireRequest,
    ) -> std::result::Result<WireResponse, AttemptError> {
        let url = self.endpoint("chat/completions");
        let response = self
            .with_auth(self.client.post(&url).json(request))
            .send()
            .await
            .map_err(|e| {
                let error = anyhow::Error::new(e).context(format!("POST {} failed", url));
                AttemptError::Transient(error)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = anyhow!("{} returned {}: {}", self.config.provider_name, status, body);
            return Err(if is_retryable_status(status) {
                AttemptError::Transient(error)
            } else {
                AttemptError::Permanent(error)
            });
        }

        response.json::<WireResponse>().await.map_err(|e| {
            AttemptError::Transient(
                anyhow::Error::new(e).context("unreadable chat completion body"),
            )
        })
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatibleProvider {
    async fn generate_chat(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> LLMResult<LLMResponse> {
        let started = Instant::now();
        let request = self.wire_request(messages, config);
        let response = self.post_with_retries(&request).await?;

        let usage = response.usage.map(|u| TokenUsage {
            prompt: u.prompt_tokens,
            completion: u.completion_tokens,
            total: u.total_tokens,
        });
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("chat completion contained no choices"))?;

        debug!(
            provider = %self.config.provider_name,
            model = %self.config.model,
            total_tokens = usage.map(|u| u.total),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "chat completion received"
        );

        Ok(LLMResponse {
            content: choice.message.content.unwrap_or_default(),
            model: response.model.unwrap_or_else(|| self.config.model.clone()),
            finish_reason: choice.finish_reason,
            usage,
        })
    }

    async fn is_available(&self) -> bool {
        let probe = self.with_auth(self.client.get(self.endpoint("models")));
        matches!(probe.send().await, Ok(response) if response.status().is_success())
    }

    fn provider_name(&self) -> &str {
        &self.config.provider_name
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}
