//! CTI Core - Domain models, errors and shared types
//!
//! This crate defines the contract shared by the evaluation engine,
//! the knowledge graph and the CLI:
//! - Annotation documents produced by the extraction pipeline
//! - Triplets and the decoding of their loosely typed record shapes
//! - Common error types
//! - Configuration management

pub mod config;
pub mod document;

pub use config::{AppConfig, ConfigError, EvalConfig, GoldAnchoring, GraphConfig, LoggingConfig};
pub use document::{AnnotationDocument, Triplet, TripletRecord};

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for CTI evaluation
#[derive(Error, Debug)]
pub enum CtiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Cannot aggregate an empty batch of metrics")]
    EmptyBatch,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Report error: {0}")]
    Report(String),

    #[error("Graph error: {0}")]
    Graph(String),
}

impl CtiError {
    /// Build an I/O error tagged with the offending path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CtiError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CtiError::EmptyBatch;
        assert_eq!(err.to_string(), "Cannot aggregate an empty batch of metrics");

        let err = CtiError::NotFound("APT28".to_string());
        assert!(err.to_string().contains("APT28"));
    }

    #[test]
    fn test_io_error_carries_path() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = CtiError::io("/tmp/2017-2-1_bio.txt", source);
        assert!(err.to_string().contains("2017-2-1_bio.txt"));
    }

    #[test]
    fn test_config_error_conversion() {
        let err: CtiError = ConfigError::InvalidValue {
            key: "CTI_PARALLEL".to_string(),
            value: "maybe".to_string(),
        }
        .into();
        assert!(matches!(err, CtiError::Config(_)));
    }
}
