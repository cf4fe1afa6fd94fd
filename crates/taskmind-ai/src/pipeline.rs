//! Cache-or-compute orchestration of the analysis operations.
//!
//! Every operation except [`TaskAnalyzer::parse_voice_to_task`] always
//! produces a result: failures of the remote path are logged and replaced
//! by the offline heuristics.

use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use taskmind_cache::{
    get_json, set_json, task_analysis_key, task_suggestions_key, CacheStats, CacheStore,
    MemoryCacheStore, NoopCacheStore,
};
use taskmind_core::{
    AnalysisSettings, AnalysisSource, GenerationSettings, Insight, ProductivitySnapshot, Result,
    Settings, TaskAnalysis, TaskDraft, TaskMindError,
};
use tracing::{debug, info, warn};

use crate::heuristics;
use crate::llm_factory::LLMProviderFactory;
use crate::llm_provider::{GenerationConfig, LLMProvider};
use crate::prompts::{self, Prompt};
use crate::repair;
use crate::response_parser::{parse_json_array, parse_json_object};

pub const MIN_SUGGESTIONS: usize = 1;
pub const MAX_SUGGESTIONS: usize = 10;

/// Tunables for [`TaskAnalyzer`].
#[derive(Debug, Clone)]
pub struct AnalyzerSettings {
    pub analysis_ttl: Duration,
    pub suggestion_ttl: Duration,
    pub generation: AnalysisSettings,
    pub top_p: f32,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl AnalyzerSettings {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            analysis_ttl: Duration::from_secs(settings.cache.analysis_ttl_secs),
            suggestion_ttl: Duration::from_secs(settings.cache.suggestion_ttl_secs),
            generation: settings.analysis.clone(),
            top_p: settings.llm.top_p,
        }
    }

    fn generation_config(&self, params: GenerationSettings) -> GenerationConfig {
        GenerationConfig::new(params.temperature, params.max_tokens).with_top_p(self.top_p)
    }
}

/// Task analysis service.
///
/// The provider and cache are shared handles injected at construction and
/// never mutated afterwards, so one analyzer can serve concurrent callers.
pub struct TaskAnalyzer {
    provider: Option<Arc<dyn LLMProvider>>,
    cache: Arc<dyn CacheStore>,
    settings: AnalyzerSettings,
}

impl TaskAnalyzer {
    pub fn new(
        provider: Option<Arc<dyn LLMProvider>>,
        cache: Arc<dyn CacheStore>,
        settings: AnalyzerSettings,
    ) -> Self {
        Self {
            provider,
            cache,
            settings,
        }
    }

    /// Build the provider and cache described by `settings`.
    ///
    /// A provider that cannot be constructed (disabled, missing API key)
    /// leaves the analyzer in heuristic-only mode.
    pub fn from_settings(settings: &Settings) -> Self {
        let provider = match LLMProviderFactory::create_from_config(&settings.llm, &settings.secrets) {
            Ok(provider) => {
                info!(
                    provider = provider.provider_name(),
                    model = provider.model_name(),
                    "remote model configured"
                );
                Some(provider)
            }
            Err(e) => {
                warn!(error = %e, "remote model unavailable, using heuristic analysis only");
                None
            }
        };

        let cache: Arc<dyn CacheStore> = if settings.cache.enabled {
            Arc::new(MemoryCacheStore::new(settings.cache.max_entries))
        } else {
            Arc::new(NoopCacheStore)
        };

        Self::new(provider, cache, AnalyzerSettings::from_settings(settings))
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Probe the configured remote model. False when none is configured.
    pub async fn remote_available(&self) -> bool {
        match &self.provider {
            Some(provider) => provider.is_available().await,
            None => false,
        }
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Analyze a task. Never fails.
    pub async fn analyze_task(
        &self,
        title: &str,
        description: &str,
        context: Option<&Value>,
    ) -> TaskAnalysis {
        self.analyze_task_with_source(title, description, context)
            .await
            .0
    }

    /// Analyze a task and report which path produced the result.
    pub async fn analyze_task_with_source(
        &self,
        title: &str,
        description: &str,
        context: Option<&Value>,
    ) -> (TaskAnalysis, AnalysisSource) {
        let key = task_analysis_key(title, description, &canonical_context(context));

        if let Some(cached) = self.cache_read::<TaskAnalysis>(&key).await {
            return (cached, AnalysisSource::Cache);
        }

        match self.remote_analysis(title, description, context).await {
            Ok(analysis) => {
                self.cache_write(&key, self.settings.analysis_ttl, &analysis)
                    .await;
                (analysis, AnalysisSource::Remote)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    operation = "analyze_task",
                    "falling back to heuristic analysis"
                );
                (
                    heuristics::fallback_analysis(title, description),
                    AnalysisSource::Fallback,
                )
            }
        }
    }

    async fn remote_analysis(
        &self,
        title: &str,
        description: &str,
        context: Option<&Value>,
    ) -> Result<TaskAnalysis> {
        let prompt = prompts::task_analysis(title, description, context);
        let started = Instant::now();
        let reply = self
            .request(&prompt, self.settings.generation.analysis)
            .await?;
        let raw = parse_json_object(&reply)?;
        let analysis = repair::repair_task_analysis(&raw, title, description);

        info!(
            priority = analysis.priority,
            confidence = analysis.confidence_score,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "remote task analysis complete"
        );
        Ok(analysis)
    }

    /// Suggest follow-up tasks. `limit` is clamped to 1..=10. Never fails.
    pub async fn generate_task_suggestions(
        &self,
        user_id: &str,
        context: &str,
        limit: usize,
    ) -> Vec<String> {
        let limit = limit.clamp(MIN_SUGGESTIONS, MAX_SUGGESTIONS);
        let key = task_suggestions_key(user_id, context);

        if let Some(mut cached) = self.cache_read::<Vec<String>>(&key).await {
            cached.truncate(limit);
            return cached;
        }

        match self.remote_suggestions(context, limit).await {
            Ok(suggestions) => {
                self.cache_write(&key, self.settings.suggestion_ttl, &suggestions)
                    .await;
                suggestions
            }
            Err(e) => {
                warn!(
                    error = %e,
                    operation = "generate_task_suggestions",
                    "falling back to generic suggestions"
                );
                heuristics::fallback_suggestions(limit)
            }
        }
    }

    async fn remote_suggestions(&self, context: &str, limit: usize) -> Result<Vec<String>> {
        let prompt = prompts::task_suggestions(context, limit);
        let reply = self
            .request(&prompt, self.settings.generation.suggestions)
            .await?;
        let raw = parse_json_array(&reply)?;
        let suggestions = repair::repair_suggestions(&raw, limit);

        if suggestions.is_empty() {
            return Err(TaskMindError::Parse(
                "reply contained no usable suggestions".to_string(),
            ));
        }
        Ok(suggestions)
    }

    /// Derive productivity insights from a task history snapshot. Never fails.
    pub async fn generate_productivity_insights(
        &self,
        snapshot: &ProductivitySnapshot,
    ) -> Vec<Insight> {
        match self.remote_insights(snapshot).await {
            Ok(insights) => insights,
            Err(e) => {
                warn!(
                    error = %e,
                    operation = "generate_productivity_insights",
                    "falling back to rule-based insights"
                );
                heuristics::fallback_insights(snapshot)
            }
        }
    }

    async fn remote_insights(&self, snapshot: &ProductivitySnapshot) -> Result<Vec<Insight>> {
        let prompt = prompts::productivity_insights(snapshot);
        let reply = self
            .request(&prompt, self.settings.generation.insights)
            .await?;
        let raw = parse_json_array(&reply)?;
        let insights = repair::repair_insights(&raw);

        if insights.is_empty() {
            return Err(TaskMindError::Parse(
                "reply contained no valid insights".to_string(),
            ));
        }
        Ok(insights)
    }

    /// Turn a voice transcription into a task draft.
    ///
    /// Unlike the other operations this one surfaces failures: there is no
    /// offline way to extract a task, and a partial draft is never returned.
    pub async fn parse_voice_to_task(&self, transcription: &str) -> Result<TaskDraft> {
        if self.provider.is_none() {
            return Err(TaskMindError::RemoteUnavailable(
                "voice parsing requires a configured remote model".to_string(),
            ));
        }
        if transcription.trim().is_empty() {
            return Err(TaskMindError::InvalidInput(
                "transcription is empty".to_string(),
            ));
        }

        self.remote_voice(transcription).await.map_err(|e| match e {
            TaskMindError::VoiceProcessing(_) => e,
            other => {
                warn!(error = %other, "voice parsing failed");
                TaskMindError::VoiceProcessing(other.to_string())
            }
        })
    }

    async fn remote_voice(&self, transcription: &str) -> Result<TaskDraft> {
        let today = chrono::Local::now()
            .date_naive()
            .format("%Y-%m-%d")
            .to_string();
        let prompt = prompts::voice_to_task(transcription, &today);
        let reply = self.request(&prompt, self.settings.generation.voice).await?;
        let raw = parse_json_object(&reply)?;
        repair::repair_task_draft(&raw)
    }

    async fn request(&self, prompt: &Prompt, params: GenerationSettings) -> Result<String> {
        let provider = self.provider.as_ref().ok_or_else(|| {
            TaskMindError::RemoteUnavailable("no remote model configured".to_string())
        })?;

        debug!(
            provider = provider.provider_name(),
            prompt_chars = prompt.system.len() + prompt.user.len(),
            "sending prompt"
        );

        let config = self.settings.generation_config(params);
        let reply = provider
            .complete(&prompt.system, &prompt.user, &config)
            .await
            .map_err(|e| TaskMindError::RemoteCall(format!("{:#}", e)))?;

        if reply.trim().is_empty() {
            return Err(TaskMindError::EmptyResponse);
        }
        Ok(reply)
    }

    async fn cache_read<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        match get_json(self.cache.as_ref(), key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "ignoring unreadable cache entry");
                None
            }
        }
    }

    async fn cache_write<T: serde::Serialize + ?Sized>(
        &self,
        key: &str,
        ttl: Duration,
        value: &T,
    ) {
        if let Err(e) = set_json(self.cache.as_ref(), key, ttl, value).await {
            warn!(key, error = %e, "failed to write cache entry");
        }
    }
}

/// Compact JSON of the caller context, empty when there is none.
/// Key order never affects the cache key, even if another crate turns on
/// serde_json's `preserve_order`.
fn canonical_context(context: Option<&Value>) -> String {
    match context {
        None | Some(Value::Null) => String::new(),
        Some(value) => sorted(value).to_string(),
    }
}

fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sorted(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn context_canonicalization_ignores_key_order() {
        let a = json!({"b": 1, "a": 2});
        let b: Value = serde_json::from_str(r#"{"a": 2, "b": 1}"#).unwrap();
        assert_eq!(canonical_context(Some(&a)), canonical_context(Some(&b)));
        assert_eq!(canonical_context(None), canonical_context(Some(&Value::Null)));
    }

    #[test]
    fn settings_follow_configuration() {
        let mut settings = Settings::default();
        settings.cache.analysis_ttl_secs = 60;
        settings.llm.top_p = 0.9;
        let analyzer_settings = AnalyzerSettings::from_settings(&settings);
        assert_eq!(analyzer_settings.analysis_ttl, Duration::from_secs(60));
        assert_eq!(analyzer_settings.suggestion_ttl, Duration::from_secs(1800));

        let config = analyzer_settings.generation_config(settings.analysis.analysis);
        assert_eq!(config.max_tokens, Some(500));
        assert_eq!(config.top_p, Some(0.9));
    }
}
