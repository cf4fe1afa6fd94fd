pub mod heuristics;
pub mod llm_factory;
pub mod llm_provider;
pub mod openai_compatible_provider;
pub mod pipeline;
pub mod prompts;
pub mod repair;
pub mod response_parser;
pub mod sentiment;

pub use llm_factory::LLMProviderFactory;
pub use llm_provider::*;
pub use openai_compatible_provider::{OpenAICompatibleConfig, OpenAICompatibleProvider};
pub use pipeline::{AnalyzerSettings, TaskAnalyzer};
pub use prompts::Prompt;
pub use sentiment::analyze_sentiment;
