//! mail-intel: spam classification and summarization CLI
//!
//! # Usage
//!
//! ```bash
//! # Train on the configured dataset and persist the model pair
//! mail-intel train --dataset spam_ham_dataset.csv
//!
//! # Classify, explain, summarize or analyze text ("-" reads stdin)
//! mail-intel predict "WIN BIG MONEY NOW! CLICK HERE!"
//! mail-intel explain "WIN BIG MONEY NOW! CLICK HERE!" --top 5
//! mail-intel summarize - --max-length 40 < email.txt
//! mail-intel --config mail-intel.toml analyze - --force-summary < email.txt
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use mail_intel::analyze::{AnalyzeOptions, EmailAnalyzer};
use mail_intel::bundle::{load_or_train, training_records, ArtifactPaths, BundleSource};
use mail_intel::config::{AppConfig, LoggingConfig};
use mail_intel::spam::SpamDetector;
use mail_intel::summarizer::{LeadGenerator, Summarizer};
use mail_intel::training::train;
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "mail-intel")]
#[command(about = "Email spam detection and summarization", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the classifier and save both artifacts
    Train {
        /// Dataset CSV, overriding the configured path
        #[arg(long)]
        dataset: Option<PathBuf>,
    },
    /// Classify an email as spam or ham
    Predict {
        /// Email text, or "-" for stdin
        text: String,
    },
    /// Show the features behind a prediction
    Explain {
        /// Email text, or "-" for stdin
        text: String,
        /// Number of features to show
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Summarize an email
    Summarize {
        /// Email text, or "-" for stdin
        text: String,
        /// Maximum summary length, defaults to the configured value
        #[arg(long)]
        max_length: Option<usize>,
        /// Minimum summary length, defaults to the configured value
        #[arg(long)]
        min_length: Option<usize>,
    },
    /// Classify, then summarize legitimate email
    Analyze {
        /// Email text, or "-" for stdin
        text: String,
        /// Maximum summary length, defaults to the configured value
        #[arg(long)]
        max_length: Option<usize>,
        /// Minimum summary length, defaults to the configured value
        #[arg(long)]
        min_length: Option<usize>,
        /// Summarize even when classified as spam
        #[arg(long)]
        force_summary: bool,
    },
}

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("mail_intel={}", config.level).into());
    let registry = tracing_subscriber::registry().with(filter);

    if config.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn read_text(arg: String) -> anyhow::Result<String> {
    if arg != "-" {
        return Ok(arg);
    }
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("reading email text from stdin")?;
    Ok(text)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn detector(config: &AppConfig) -> anyhow::Result<SpamDetector> {
    let loaded = load_or_train(config)?;
    if let BundleSource::Trained(report) = &loaded.source {
        info!(
            "Trained a new model ({} terms, {} training records)",
            report.vocabulary_size, report.train_size
        );
    }
    Ok(SpamDetector::with_bundle(loaded.bundle))
}

fn lengths(config: &AppConfig, max: Option<usize>, min: Option<usize>) -> (usize, usize) {
    (
        max.unwrap_or(config.summarizer.default_max_length),
        min.unwrap_or(config.summarizer.default_min_length),
    )
}

/// Analyzer for classification calls, backed by the weightless summarizer
fn classification_analyzer(config: &AppConfig) -> anyhow::Result<EmailAnalyzer> {
    Ok(EmailAnalyzer::new(
        detector(config)?,
        Summarizer::new(Box::new(LeadGenerator::new())),
    ))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    init_logging(&config.logging);

    info!("Starting mail-intel v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Train { dataset } => {
            let path = dataset.unwrap_or_else(|| config.dataset.path.clone());
            let records = training_records(&path)?;
            let (bundle, report) = train(&records, &config.training)?;
            bundle.save(&ArtifactPaths::from(&config.model))?;
            if let Some(evaluation) = &report.evaluation {
                eprintln!("{}", evaluation);
            }
            print_json(&report)?;
        }
        Commands::Predict { text } => {
            let text = read_text(text)?;
            let analyzer = classification_analyzer(&config)?;
            print_json(&analyzer.predict(&text)?)?;
        }
        Commands::Explain { text, top } => {
            let text = read_text(text)?;
            let analyzer = classification_analyzer(&config)?;
            print_json(&analyzer.explain(&text, top)?)?;
        }
        Commands::Summarize {
            text,
            max_length,
            min_length,
        } => {
            let text = read_text(text)?;
            let (max_length, min_length) = lengths(&config, max_length, min_length);
            let analyzer = EmailAnalyzer::new(
                SpamDetector::new(),
                Summarizer::from_config(&config.summarizer)?,
            );
            print_json(&analyzer.summarize(&text, max_length, min_length)?)?;
        }
        Commands::Analyze {
            text,
            max_length,
            min_length,
            force_summary,
        } => {
            let text = read_text(text)?;
            let (max_length, min_length) = lengths(&config, max_length, min_length);
            let analyzer = EmailAnalyzer::new(
                detector(&config)?,
                Summarizer::from_config(&config.summarizer)?,
            );
            let options = AnalyzeOptions {
                max_length,
                min_length,
                force_summary,
            };
            print_json(&analyzer.analyze(&text, options)?)?;
        }
    }

    Ok(())
}
