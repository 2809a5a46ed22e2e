//! clinscan-common — Shared types, errors, and configuration used across all clinscan crates.

pub mod error;
pub mod entities;
pub mod config;

// Re-export commonly used types
pub use config::{Config, EngineSettings, KnowledgeBaseSettings, LoggingSettings};
pub use entities::{DetectedProblem, KnowledgeBaseEntry};
pub use error::{ClinscanError, Result};
