use async_trait::async_trait;
use std::fmt;

/// Providers report failures with `anyhow`; the pipeline folds them into
/// `TaskMindError::RemoteCall`.
pub type LLMResult<T> = anyhow::Result<T>;

/// Sampling parameters sent with one completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    /// 0.0..=2.0
    pub temperature: f32,
    pub max_tokens: Option<usize>,
    pub top_p: Option<f32>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::new(0.3, 500)
    }
}

impl GenerationConfig {
    pub fn new(temperature: f32, max_tokens: usize) -> Self {
        Self {
            temperature,
            max_tokens: Some(max_tokens),
            top_p: None,
        }
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One turn of a chat conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt: usize,
    pub completion: usize,
    pub total: usize,
}

/// Text of the first choice plus request metadata.
///
/// `content` is empty when the endpoint returned no text; callers decide
/// whether that is an error.
#[derive(Debug, Clone, PartialEq)]
pub struct LLMResponse {
    pub content: String,
    pub model: String,
    pub finish_reason: Option<String>,
    pub usage: Option<TokenUsage>,
}

/// Remote text-completion capability.
///
/// Implementations own their timeout and retry budget; a returned error
/// means every attempt has already been spent.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn generate_chat(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> LLMResult<LLMResponse>;

    /// System + user prompt completion returning only the text.
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        config: &GenerationConfig,
    ) -> LLMResult<String> {
        let messages = [Message::system(system_prompt), Message::user(user_prompt)];
        let response = self.generate_chat(&messages, config).await?;
        Ok(response.content)
    }

    /// Cheap reachability probe; never retried.
    async fn is_available(&self) -> bool;

    fn provider_name(&self) -> &str;

    fn model_name(&self) -> &str;
}
