//! clinscan command-line interface.
//!
//! Builds the term recognition engine from a knowledge base file and scans
//! notes, printing results as JSON on stdout. Logs go to stderr.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clinscan_common::{Config, DetectedProblem};
use clinscan_ner::ProblemDetector;
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "clinscan")]
#[command(about = "Detect canonical clinical problems in free-text notes", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./clinscan.toml)
    #[arg(short, long, env = "CLINSCAN_CONFIG")]
    config: Option<PathBuf>,

    /// Knowledge base JSON file (overrides knowledge_base.path)
    #[arg(long, global = true)]
    kb: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the engine and print knowledge base statistics
    Check,

    /// Scan notes and print detected problems
    Scan {
        /// Note files to scan. Reads stdin when none are given.
        notes: Vec<PathBuf>,
    },
}

#[derive(Serialize)]
struct NoteReport {
    source: String,
    problems: Vec<DetectedProblem>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = config_path(&cli);
    let config = Config::load_from(&config_path)
        .with_context(|| format!("failed to load configuration {}", config_path.display()))?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .init();

    if config_path.exists() {
        info!("Loaded configuration from {}", config_path.display());
    } else {
        debug!("Config file {} not found, using defaults", config_path.display());
    }

    let kb_path = cli.kb.clone().unwrap_or_else(|| config.knowledge_base.path.clone());

    let detector = ProblemDetector::new(config.engine.clone())?;
    detector
        .reload_from_path(&kb_path)
        .await
        .with_context(|| format!("failed to build engine from {}", kb_path.display()))?;

    match cli.command {
        Commands::Check => {
            let engine = detector.snapshot()?;
            print_json(engine.stats())?;
        }
        Commands::Scan { notes } => {
            let reports = if notes.is_empty() {
                let mut buf = Vec::new();
                std::io::stdin()
                    .read_to_end(&mut buf)
                    .context("failed to read note from stdin")?;
                vec![NoteReport {
                    source: "<stdin>".to_string(),
                    problems: detector.detect_bytes(&buf)?,
                }]
            } else {
                scan_files(&detector, &notes).await?
            };

            info!("Scanned {} notes", reports.len());
            print_json(&reports)?;
        }
    }

    Ok(())
}

/// `--config` (or `CLINSCAN_CONFIG`, via clap) wins over `./clinscan.toml`.
fn config_path(cli: &Cli) -> PathBuf {
    cli.config.clone().unwrap_or_else(Config::default_path)
}

/// Read every note first, then scan them as one batch against one snapshot.
async fn scan_files(detector: &ProblemDetector, paths: &[PathBuf]) -> Result<Vec<NoteReport>> {
    let mut notes = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read note {}", path.display()))?;
        let note = String::from_utf8(bytes)
            .with_context(|| format!("note {} is not valid UTF-8", path.display()))?;
        notes.push(note);
    }

    let refs: Vec<&str> = notes.iter().map(String::as_str).collect();
    let results = detector.detect_batch(&refs)?;

    paths
        .iter()
        .zip(results)
        .map(|(path, result)| -> Result<NoteReport> {
            let problems = result.with_context(|| format!("failed to scan note {}", path.display()))?;
            Ok(NoteReport {
                source: path.display().to_string(),
                problems,
            })
        })
        .collect()
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value)?;
    println!("{out}");
    Ok(())
}
