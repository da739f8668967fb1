//! nerid CLI - Command-line interface
//!
//! Usage:
//!   nerid tag <text> [--format json|table]
//!   nerid merge <file|-> [--text <text>]
//!   nerid labels

use std::io::Read;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use nerid_core::{
    AppConfig, BackgroundPolicy, ClassifiedToken, ClassifierBackend, LabelRegistry, LoggingConfig,
};
use nerid_extractor::{build_classifier, HighlightedSpan, NerPipeline};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "nerid")]
#[command(about = "Indonesian named-entity highlighting CLI")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<String>,

    /// Classifier backend (rules or http)
    #[arg(long, global = true)]
    backend: Option<ClassifierBackend>,

    /// Background token policy (keep, drop or bridge)
    #[arg(long, global = true)]
    policy: Option<BackgroundPolicy>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify text and print the highlighted spans
    Tag {
        /// Text to analyze
        text: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Merge a JSON array of classified tokens into spans
    Merge {
        /// Token file, or `-` for stdin
        input: String,
        /// Text the offsets refer to; adds covered text and colors
        #[arg(long)]
        text: Option<String>,
    },
    /// Print the label registry
    Labels,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Table,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    init_tracing(&config.logging);

    let registry = config.validate().context("invalid configuration")?;
    let classifier = build_classifier(&config.classifier)?;
    let pipeline = NerPipeline::new(classifier, Arc::new(registry), config.merge.clone());
    tracing::debug!(
        backend = pipeline.classifier_name(),
        background_policy = %config.merge.background_policy,
        "Pipeline ready"
    );

    let output = match cli.command {
        Commands::Tag { text, format } => run_tag(&pipeline, &text, format).await?,
        Commands::Merge { input, text } => {
            let content = read_input(&input)?;
            run_merge(&pipeline, &content, text.as_deref())?
        }
        Commands::Labels => render_labels(pipeline.registry()),
    };

    println!("{output}");
    Ok(())
}

/// Same filter and format choices as the API server, written to stderr
fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "nerid_cli={level},nerid_extractor={level}",
            level = logging.level
        )
        .into()
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_file(logging.include_location)
        .with_line_number(logging.include_location);

    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("loading {path}"))?
            .with_env_override()?,
        None => AppConfig::from_env()?,
    };

    if let Some(backend) = cli.backend {
        config.classifier.backend = backend;
    }
    if let Some(policy) = cli.policy {
        config.merge.background_policy = policy;
    }

    Ok(config)
}

async fn run_tag(
    pipeline: &NerPipeline,
    text: &str,
    format: OutputFormat,
) -> anyhow::Result<String> {
    let analysis = pipeline.analyze(text).await?;
    if let Some(reason) = &analysis.degraded {
        tracing::warn!(reason = %reason, "Highlighting dropped");
    }

    match format {
        OutputFormat::Json => to_json(&analysis),
        OutputFormat::Table => Ok(render_table(&analysis.spans)),
    }
}

fn run_merge(pipeline: &NerPipeline, content: &str, text: Option<&str>) -> anyhow::Result<String> {
    let tokens = parse_tokens(content)?;

    match text {
        Some(text) => to_json(&pipeline.spans_for(text, tokens)?),
        None => to_json(&pipeline.merge_tokens(tokens)?),
    }
}

/// Read a file, or stdin for `-`
fn read_input(input: &str) -> anyhow::Result<String> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }

    std::fs::read_to_string(input).with_context(|| format!("reading {input}"))
}

fn parse_tokens(content: &str) -> anyhow::Result<Vec<ClassifiedToken>> {
    serde_json::from_str(content).context("expected a JSON array of {label, start, end} tokens")
}

fn to_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn render_table(spans: &[HighlightedSpan]) -> String {
    if spans.is_empty() {
        return "No entities found".to_string();
    }

    let mut lines = vec![format!("{:<12} {:>6} {:>6}  TEXT", "LABEL", "START", "END")];
    lines.extend(spans.iter().map(|span| {
        format!(
            "{:<12} {:>6} {:>6}  {}",
            span.label, span.start, span.end, span.text
        )
    }));
    lines.join("\n")
}

fn render_labels(registry: &LabelRegistry) -> String {
    let mut lines = vec![format!("{:<12} {:<9} ALIASES", "LABEL", "COLOR")];
    lines.extend(registry.labels().iter().map(|label| {
        format!(
            "{:<12} {:<9} {}",
            label.name,
            label.color,
            label.aliases.join(", ")
        )
        .trim_end()
        .to_string()
    }));
    lines.join("\n")
}
