use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde_json::{json, Value};
use std::path::PathBuf;
use taskmind_ai::TaskAnalyzer;
use taskmind_core::{ConfigManager, ProductivitySnapshot, Settings};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "taskmind")]
#[command(about = "TaskMind CLI - AI-assisted task analysis and planning", long_about = None)]
#[command(version)]
struct Cli {
    /// Output format (json, pretty)
    #[arg(short, long, global = true, default_value = "pretty")]
    output: OutputFormat,

    /// Directory holding default.toml, <env>.toml and local.toml
    #[arg(long, global = true, env = "TASKMIND_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Configuration environment (defaults to APP_ENV or "development")
    #[arg(long, global = true)]
    env: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a single task
    Analyze {
        /// Task title
        #[arg(short, long)]
        title: String,

        /// Task description
        #[arg(short, long, default_value = "")]
        description: String,

        /// Extra context as a JSON document
        #[arg(short, long)]
        context: Option<String>,
    },

    /// Suggest follow-up tasks
    Suggest {
        /// User the suggestions are for
        #[arg(short, long)]
        user: String,

        /// Free-text description of what the user is working on
        #[arg(short, long)]
        context: String,

        /// Number of suggestions (1-10)
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// Productivity insights from a task history snapshot
    Insights {
        /// JSON file with the productivity snapshot
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Turn a voice transcription into a task
    Voice {
        /// Transcribed text
        #[arg(short, long)]
        text: String,
    },

    /// Inspect configuration
    Config {
        /// Print the JSON schema of the configuration
        #[arg(long, conflicts_with = "show")]
        schema: bool,

        /// Print the effective configuration (secrets omitted)
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = ConfigManager::load(cli.config_dir.clone(), cli.env.clone())
        .context("Failed to load configuration")?;

    init_tracing(&settings, cli.verbose);

    match execute_command(&cli, &settings).await {
        Ok(output) => {
            print_output(&cli.output, &output)?;
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn init_tracing(settings: &Settings, verbose: bool) {
    let level = if verbose {
        "debug"
    } else {
        settings.logging.level.as_str()
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("taskmind={}", level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn execute_command(cli: &Cli, settings: &Settings) -> Result<Value> {
    match &cli.command {
        Commands::Config { schema, show } => {
            execute_config_command(settings, *schema, *show).await
        }

        Commands::Analyze {
            title,
            description,
            context,
        } => {
            let context = context
                .as_deref()
                .map(serde_json::from_str::<Value>)
                .transpose()
                .context("--context must be valid JSON")?;

            let (analysis, source) = TaskAnalyzer::from_settings(settings)
                .analyze_task_with_source(title, description, context.as_ref())
                .await;
            debug!(%source, "analysis finished");

            Ok(json!({
                "source": source,
                "analysis": analysis,
            }))
        }

        Commands::Suggest {
            user,
            context,
            limit,
        } => {
            let suggestions = TaskAnalyzer::from_settings(settings)
                .generate_task_suggestions(user, context, *limit)
                .await;
            Ok(serde_json::to_value(suggestions)?)
        }

        Commands::Insights { file } => {
            let raw = std::fs::read_to_string(file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let snapshot: ProductivitySnapshot =
                serde_json::from_str(&raw).context("Invalid productivity snapshot")?;

            let insights = TaskAnalyzer::from_settings(settings)
                .generate_productivity_insights(&snapshot)
                .await;
            Ok(serde_json::to_value(insights)?)
        }

        Commands::Voice { text } => {
            let draft = TaskAnalyzer::from_settings(settings)
                .parse_voice_to_task(text)
                .await
                .context("Failed to parse voice input")?;
            Ok(serde_json::to_value(draft)?)
        }
    }
}

async fn execute_config_command(settings: &Settings, schema: bool, show: bool) -> Result<Value> {
    if schema {
        let schema = schemars::schema_for!(Settings);
        return Ok(serde_json::to_value(schema)?);
    }

    let effective = serde_json::to_value(settings)?;
    if show {
        return Ok(effective);
    }

    let analyzer = TaskAnalyzer::from_settings(settings);
    let remote_reachable = analyzer.remote_available().await;

    Ok(json!({
        "env": settings.env,
        "provider": settings.llm.provider,
        "model": settings.llm.model,
        "cache_enabled": settings.cache.enabled,
        "api_key_configured": settings.secrets.openai_api_key.is_some(),
        "remote_configured": analyzer.has_provider(),
        "remote_reachable": remote_reachable,
    }))
}

fn print_output(format: &OutputFormat, value: &Value) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        OutputFormat::Pretty => {
            print_pretty(value, 0)?;
        }
    }
    Ok(())
}

fn print_pretty(value: &Value, depth: usize) -> Result<()> {
    let indent = "  ".repeat(depth);
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                let key_colored = key.cyan().bold();
                match val {
                    Value::Object(_) => {
                        println!("{}{}:", indent, key_colored);
                        print_pretty(val, depth + 1)?;
                    }
                    Value::Array(items) if items.iter().all(Value::is_string) => {
                        let joined = items
                            .iter()
                            .filter_map(Value::as_str)
                            .collect::<Vec<_>>()
                            .join(", ");
                        println!("{}{}: {}", indent, key_colored, joined.green());
                    }
                    Value::Array(_) => {
                        println!("{}{}:", indent, key_colored);
                        print_pretty(val, depth + 1)?;
                    }
                    _ => println!("{}{}: {}", indent, key_colored, scalar(val)),
                }
            }
        }
        Value::Array(arr) => {
            for (i, item) in arr.iter().enumerate() {
                match item {
                    Value::Object(_) | Value::Array(_) => {
                        println!(
                            "\n{}{}{}:",
                            indent,
                            "Item ".cyan(),
                            (i + 1).to_string().yellow()
                        );
                        print_pretty(item, depth + 1)?;
                    }
                    _ => println!(
                        "{}{}. {}",
                        indent,
                        (i + 1).to_string().yellow(),
                        scalar(item)
                    ),
                }
            }
        }
        _ => println!("{}{}", indent, scalar(value)),
    }
    Ok(())
}

fn scalar(value: &Value) -> colored::ColoredString {
    match value {
        Value::String(s) => s.green(),
        Value::Number(n) => n.to_string().yellow(),
        Value::Bool(true) => "true".green(),
        Value::Bool(false) => "false".red(),
        Value::Null => "-".dimmed(),
        other => other.to_string().normal(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_analyze_with_global_flags() {
        let cli = Cli::try_parse_from([
            "taskmind",
            "analyze",
            "--title",
            "Ship release",
            "--context",
            "{\"sprint\": 3}",
            "--output",
            "json",
        ])
        .unwrap();

        assert!(matches!(cli.output, OutputFormat::Json));
        match cli.command {
            Commands::Analyze {
                title,
                description,
                context,
            } => {
                assert_eq!(title, "Ship release");
                assert_eq!(description, "");
                assert_eq!(context.as_deref(), Some("{\"sprint\": 3}"));
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn config_flags_conflict() {
        assert!(Cli::try_parse_from(["taskmind", "config", "--schema", "--show"]).is_err());
    }

    #[tokio::test]
    async fn config_summary_hides_secrets() {
        let value = execute_config_command(&Settings::default(), false, true)
            .await
            .unwrap();
        assert!(value["secrets"].get("openai_api_key").is_none());
        assert_eq!(value["llm"]["provider"], "openai");
    }
}
