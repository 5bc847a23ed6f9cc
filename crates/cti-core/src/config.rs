//! CTI Configuration Management
//!
//! Handles configuration from environment variables and TOML config files
//! with sensible defaults for local evaluation runs.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Evaluation run configuration
    pub eval: EvalConfig,

    /// Knowledge graph configuration
    pub graph: GraphConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        self.apply_env()?;
        Ok(self)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        // Evaluation
        if let Ok(dir) = std::env::var("CTI_ANNOTATION_DIR") {
            self.eval.annotation_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("CTI_GOLD_DIR") {
            self.eval.gold_dir = PathBuf::from(dir);
        }
        if let Ok(suffix) = std::env::var("CTI_GOLD_SUFFIX") {
            self.eval.gold_suffix = suffix;
        }
        if let Ok(path) = std::env::var("CTI_REPORT_PATH") {
            self.eval.report_path = PathBuf::from(path);
        }
        if let Ok(parallel) = std::env::var("CTI_PARALLEL") {
            self.eval.parallel = parse_bool("CTI_PARALLEL", &parallel)?;
        }
        if let Ok(anchoring) = std::env::var("CTI_GOLD_ANCHORING") {
            self.eval.gold_anchoring = anchoring.parse()?;
        }

        // Graph
        if let Ok(path) = std::env::var("CTI_GRAPH_PATH") {
            self.graph.output_path = PathBuf::from(path);
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Evaluation run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Directory holding the extraction pipeline's JSON documents
    pub annotation_dir: PathBuf,

    /// Directory holding the token-tagged gold files
    pub gold_dir: PathBuf,

    /// Suffix appended to a document stem to name its gold file
    pub gold_suffix: String,

    /// CSV report destination
    pub report_path: PathBuf,

    /// Evaluate document pairs on a thread pool
    pub parallel: bool,

    /// How gold entities are placed in the source text
    pub gold_anchoring: GoldAnchoring,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            annotation_dir: PathBuf::from("annotations"),
            gold_dir: PathBuf::from("gold"),
            gold_suffix: "_bio.txt".to_string(),
            report_path: PathBuf::from("evaluation_report.csv"),
            parallel: true,
            gold_anchoring: GoldAnchoring::FirstMatch,
        }
    }
}

/// Strategy for locating gold entities in the document text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoldAnchoring {
    /// First case-insensitive occurrence, same rule as system mentions
    #[default]
    FirstMatch,
    /// Search forward from the previous gold entity, falling back to the first occurrence
    Sequential,
}

impl std::str::FromStr for GoldAnchoring {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "first_match" | "first" => Ok(Self::FirstMatch),
            "sequential" => Ok(Self::Sequential),
            _ => Err(ConfigError::InvalidValue {
                key: "CTI_GOLD_ANCHORING".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for GoldAnchoring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FirstMatch => write!(f, "first_match"),
            Self::Sequential => write!(f, "sequential"),
        }
    }
}

/// Knowledge graph configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Where the built graph is written
    pub output_path: PathBuf,

    /// Neighbourhood depth for related-node queries
    pub default_depth: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("knowledge_graph.json"),
            default_depth: 2,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
