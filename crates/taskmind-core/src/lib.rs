pub mod config;
pub mod error;
pub mod types;
pub mod validation;

pub use config::{
    AnalysisSettings, CacheSettings, ConfigManager, GenerationSettings, LLMConfig, LoggingConfig,
    SecretsConfig, Settings, KNOWN_PROVIDERS,
};
pub use error::*;
pub use types::*;
