//! Configuration loading for clinscan.
//! Reads clinscan.toml from the current directory or the path in the CLINSCAN_CONFIG env var.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ClinscanError, Result};

pub const CONFIG_ENV_VAR: &str = "CLINSCAN_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "clinscan.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub knowledge_base: KnowledgeBaseSettings,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

// ── Knowledge base ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBaseSettings {
    /// JSON array of `{term, category, variations}` records.
    #[serde(default = "default_kb_path")]
    pub path: PathBuf,
}

fn default_kb_path() -> PathBuf { PathBuf::from("problems_kb.json") }

impl Default for KnowledgeBaseSettings {
    fn default() -> Self {
        Self { path: default_kb_path() }
    }
}

// ── Engine ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Notes longer than this (in bytes) are rejected.
    #[serde(default = "default_max_note_bytes")]
    pub max_note_bytes: usize,
    /// Batches larger than this are scanned in parallel. 0 disables parallelism.
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,
}

fn default_max_note_bytes()     -> usize { 256 * 1024 }
fn default_parallel_threshold() -> usize { 10 }

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_note_bytes: default_max_note_bytes(),
            parallel_threshold: default_parallel_threshold(),
        }
    }
}

// ── Logging ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when RUST_LOG is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String { "clinscan=info,warn".to_string() }

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { filter: default_log_filter() }
    }
}

impl Config {
    /// `$CLINSCAN_CONFIG` if set, otherwise `clinscan.toml` in the current
    /// directory.
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.engine.max_note_bytes == 0 {
            return Err(ClinscanError::Config(
                "engine.max_note_bytes must be greater than zero".to_string(),
            ));
        }
        if self.knowledge_base.path.as_os_str().is_empty() {
            return Err(ClinscanError::Config(
                "knowledge_base.path must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
