use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskMindError {
    #[error("AI service unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Remote call failed: {0}")]
    RemoteCall(String),

    #[error("Remote model returned an empty response")]
    EmptyResponse,

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Voice processing failed: {0}")]
    VoiceProcessing(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TaskMindError {
    /// True for failures that mean no remote model is configured at all.
    pub fn is_service_unavailable(&self) -> bool {
        matches!(self, TaskMindError::RemoteUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, TaskMindError>;
