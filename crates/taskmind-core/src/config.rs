use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config as cfg;
use schemars::JsonSchema;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::TaskMindError;

/// Fail validation with [`TaskMindError::Config`] unless `cond` holds.
macro_rules! ensure_setting {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err(TaskMindError::Config(format!($($arg)+)));
        }
    };
}

/// Provider names understood by the provider factory.
pub const KNOWN_PROVIDERS: &[&str] = &["openai", "ollama", "lmstudio", "openai-compatible"];

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LLMConfig {
    /// Disable to run purely on heuristics.
    #[serde(default = "LLMConfig::default_enabled")]
    pub enabled: bool,

    /// LLM provider: "openai", "ollama", "lmstudio" or "openai-compatible"
    #[serde(default = "LLMConfig::default_provider")]
    pub provider: String,

    /// Model identifier sent with every chat completion
    #[serde(default = "LLMConfig::default_model")]
    pub model: String,

    /// Override for the provider's base URL (must include the `/v1` suffix)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "LLMConfig::default_timeout_secs")]
    pub timeout_secs: u64,

    /// Automatic retries after the first failed attempt
    #[serde(default = "LLMConfig::default_max_retries")]
    pub max_retries: u32,

    /// Nucleus sampling parameter forwarded as `top_p`
    #[serde(default = "LLMConfig::default_top_p")]
    pub top_p: f32,
}

impl LLMConfig {
    fn default_enabled() -> bool {
        true
    }

    fn default_provider() -> String {
        "openai".to_string()
    }

    fn default_model() -> String {
        "gpt-4o-mini".to_string()
    }

    fn default_timeout_secs() -> u64 {
        30
    }

    fn default_max_retries() -> u32 {
        3
    }

    fn default_top_p() -> f32 {
        1.0
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            provider: Self::default_provider(),
            model: Self::default_model(),
            base_url: None,
            timeout_secs: Self::default_timeout_secs(),
            max_retries: Self::default_max_retries(),
            top_p: Self::default_top_p(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheSettings {
    #[serde(default = "CacheSettings::default_enabled")]
    pub enabled: bool,
    #[serde(default = "CacheSettings::default_analysis_ttl")]
    pub analysis_ttl_secs: u64,
    #[serde(default = "CacheSettings::default_suggestion_ttl")]
    pub suggestion_ttl_secs: u64,
    /// Upper bound on live entries held by the in-memory store
    #[serde(default = "CacheSettings::default_max_entries")]
    pub max_entries: usize,
}

impl CacheSettings {
    fn default_enabled() -> bool {
        true
    }

    fn default_analysis_ttl() -> u64 {
        3600
    }

    fn default_suggestion_ttl() -> u64 {
        1800
    }

    fn default_max_entries() -> usize {
        10_000
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            analysis_ttl_secs: Self::default_analysis_ttl(),
            suggestion_ttl_secs: Self::default_suggestion_ttl(),
            max_entries: Self::default_max_entries(),
        }
    }
}

/// Sampling parameters for one kind of request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub max_tokens: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisSettings {
    #[serde(default = "AnalysisSettings::default_analysis")]
    pub analysis: GenerationSettings,
    #[serde(default = "AnalysisSettings::default_suggestions")]
    pub suggestions: GenerationSettings,
    #[serde(default = "AnalysisSettings::default_insights")]
    pub insights: GenerationSettings,
    #[serde(default = "AnalysisSettings::default_voice")]
    pub voice: GenerationSettings,
}

impl AnalysisSettings {
    fn default_analysis() -> GenerationSettings {
        GenerationSettings {
            temperature: 0.3,
            max_tokens: 500,
        }
    }

    fn default_suggestions() -> GenerationSettings {
        GenerationSettings {
            temperature: 0.7,
            max_tokens: 300,
        }
    }

    fn default_insights() -> GenerationSettings {
        GenerationSettings {
            temperature: 0.5,
            max_tokens: 800,
        }
    }

    fn default_voice() -> GenerationSettings {
        GenerationSettings {
            temperature: 0.2,
            max_tokens: 400,
        }
    }
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            analysis: Self::default_analysis(),
            suggestions: Self::default_suggestions(),
            insights: Self::default_insights(),
            voice: Self::default_voice(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct SecretsConfig {
    // Do not serialize secrets; allow deserialization from config/env only.
    #[serde(default, skip_serializing)]
    #[schemars(skip)]
    pub openai_api_key: Option<SecretString>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Settings {
    #[serde(default = "Settings::default_env")]
    pub env: String,
    #[serde(default)]
    pub llm: LLMConfig,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub analysis: AnalysisSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub secrets: SecretsConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            env: Self::default_env(),
            llm: LLMConfig::default(),
            cache: CacheSettings::default(),
            analysis: AnalysisSettings::default(),
            logging: LoggingConfig::default(),
            secrets: SecretsConfig::default(),
        }
    }
}

impl Settings {
    fn default_env() -> String {
        env::var("APP_ENV")
            .ok()
            .or_else(|| env::var("RUST_ENV").ok())
            .unwrap_or_else(|| "development".to_string())
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> crate::Result<()> {
        let provider = self.llm.provider.to_lowercase();
        ensure_setting!(
            KNOWN_PROVIDERS.contains(&provider.as_str()),
            "llm.provider must be one of {:?}, got '{}'",
            KNOWN_PROVIDERS,
            self.llm.provider
        );
        ensure_setting!(
            !self.llm.model.trim().is_empty(),
            "llm.model cannot be empty"
        );
        ensure_setting!(self.llm.timeout_secs > 0, "llm.timeout_secs must be > 0");
        ensure_setting!(
            self.llm.top_p > 0.0 && self.llm.top_p <= 1.0,
            "llm.top_p must be in (0, 1]"
        );
        ensure_setting!(
            self.cache.analysis_ttl_secs > 0,
            "cache.analysis_ttl_secs must be > 0"
        );
        ensure_setting!(
            self.cache.suggestion_ttl_secs > 0,
            "cache.suggestion_ttl_secs must be > 0"
        );

        for (name, generation) in [
            ("analysis", &self.analysis.analysis),
            ("suggestions", &self.analysis.suggestions),
            ("insights", &self.analysis.insights),
            ("voice", &self.analysis.voice),
        ] {
            ensure_setting!(
                (0.0..=2.0).contains(&generation.temperature),
                "analysis.{}.temperature must be in [0, 2]",
                name
            );
            ensure_setting!(
                generation.max_tokens > 0,
                "analysis.{}.max_tokens must be > 0",
                name
            );
        }

        Ok(())
    }
}

#[derive(Debug)]
pub struct ConfigManager;

impl ConfigManager {
    /// Load and validate settings from `config_dir` (or the default
    /// directory) for `env_override` (or `APP_ENV`).
    pub fn load(config_dir: Option<PathBuf>, env_override: Option<String>) -> Result<Settings> {
        let env_name = env_override.unwrap_or_else(Settings::default_env);
        let config_dir = Self::get_config_dir(config_dir);
        let settings = Self::load_from_sources(&config_dir, &env_name)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Get the default configuration directory.
    ///
    /// Priority order:
    /// 1. ~/.taskmind/ (primary, user-level config)
    /// 2. ./config/ (project-level config)
    /// 3. Current directory (fallback)
    pub fn default_config_dir() -> PathBuf {
        if let Some(home_dir) = dirs::home_dir() {
            let taskmind_dir = home_dir.join(".taskmind");
            if taskmind_dir.exists() {
                info!("Using config directory: {:?}", taskmind_dir);
                return taskmind_dir;
            }
        }

        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let project_config = cwd.join("config");
        if project_config.exists() {
            info!("Using config directory: {:?}", project_config);
            return project_config;
        }

        info!("Using config directory: {:?}", cwd);
        cwd
    }

    /// Get the config directory path, with an option to specify a custom location
    pub fn get_config_dir(custom_path: Option<PathBuf>) -> PathBuf {
        custom_path.unwrap_or_else(Self::default_config_dir)
    }

    pub fn load_from_sources(config_dir: &Path, env_name: &str) -> Result<Settings> {
        let builder = cfg::Config::builder()
            .add_source(cfg::File::from(config_dir.join("default.toml")).required(false))
            .add_source(cfg::File::from(config_dir.join("default.yaml")).required(false))
            .add_source(cfg::File::from(config_dir.join("default.json")).required(false))
            .add_source(
                cfg::File::from(config_dir.join(format!("{}.toml", env_name))).required(false),
            )
            .add_source(
                cfg::File::from(config_dir.join(format!("{}.yaml", env_name))).required(false),
            )
            .add_source(
                cfg::File::from(config_dir.join(format!("{}.json", env_name))).required(false),
            )
            .add_source(cfg::File::from(config_dir.join("local.toml")).required(false))
            .add_source(cfg::Environment::with_prefix("TASKMIND").separator("__"));

        let settings: Settings = builder
            .build()
            .context("building configuration")?
            .try_deserialize()
            .context("deserializing configuration")?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.cache.analysis_ttl_secs, 3600);
        assert_eq!(settings.cache.suggestion_ttl_secs, 1800);
        assert_eq!(settings.llm.timeout_secs, 30);
        assert_eq!(settings.llm.max_retries, 3);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let mut settings = Settings::default();
        settings.llm.provider = "carrier-pigeon".into();
        let err = settings.validate().unwrap_err();
        assert!(matches!(err, TaskMindError::Config(ref m) if m.contains("llm.provider")));
    }

    #[test]
    fn out_of_range_temperature_is_rejected() {
        let mut settings = Settings::default();
        settings.analysis.voice.temperature = 2.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn secrets_are_never_serialized() {
        let mut settings = Settings::default();
        settings.secrets.openai_api_key = Some(SecretString::from("sk-test".to_string()));
        let toml = toml::to_string(&settings).unwrap();
        assert!(!toml.contains("sk-test"));
    }
}
