//! nlpy Configuration Management
//!
//! Handles configuration from environment variables and TOML files
//! with defaults matching the reference behavior of the extractors.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Entity clustering configuration
    pub clustering: ClusterConfig,

    /// Relation extraction configuration
    pub relations: RelationConfig,

    /// Keyword map configuration
    pub wordmap: WordmapConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Clustering
        if let Ok(value) = std::env::var("NLPY_SIMILARITY_THRESHOLD") {
            config.clustering.similarity_threshold = parse_ratio("NLPY_SIMILARITY_THRESHOLD", value)?;
        }
        if let Ok(value) = std::env::var("NLPY_OVERLAP_RATIO") {
            config.clustering.overlap_ratio = parse_ratio("NLPY_OVERLAP_RATIO", value)?;
        }
        if let Ok(value) = std::env::var("NLPY_MAX_CLUSTER_PASSES") {
            let passes = value.parse().map_err(|_| ConfigError::InvalidValue {
                key: "NLPY_MAX_CLUSTER_PASSES".to_string(),
                value,
            })?;
            config.clustering.max_passes = Some(passes);
        }

        // Wordmap
        if let Ok(method) = std::env::var("NLPY_WORDMAP_METHOD") {
            config.wordmap.method = method.parse()?;
        }
        if let Ok(value) = std::env::var("NLPY_KEYWORD_RATIO") {
            config.wordmap.keyword_ratio = parse_ratio("NLPY_KEYWORD_RATIO", value)?;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            config.logging.json_format = format.eq_ignore_ascii_case("json");
        }

        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.clone(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        let env_config = Self::from_env()?;
        let defaults = Self::default();

        // Only override if env values differ from defaults
        if env_config.clustering.similarity_threshold != defaults.clustering.similarity_threshold {
            self.clustering.similarity_threshold = env_config.clustering.similarity_threshold;
        }
        if env_config.clustering.overlap_ratio != defaults.clustering.overlap_ratio {
            self.clustering.overlap_ratio = env_config.clustering.overlap_ratio;
        }
        if env_config.clustering.max_passes.is_some() {
            self.clustering.max_passes = env_config.clustering.max_passes;
        }
        if env_config.wordmap.method != defaults.wordmap.method {
            self.wordmap.method = env_config.wordmap.method;
        }
        if env_config.wordmap.keyword_ratio != defaults.wordmap.keyword_ratio {
            self.wordmap.keyword_ratio = env_config.wordmap.keyword_ratio;
        }
        if env_config.logging.level != defaults.logging.level {
            self.logging.level = env_config.logging.level;
        }
        if env_config.logging.json_format {
            self.logging.json_format = true;
        }

        Ok(self)
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_ratio("clustering.similarity_threshold", self.clustering.similarity_threshold)?;
        check_ratio("clustering.overlap_ratio", self.clustering.overlap_ratio)?;
        check_ratio("wordmap.keyword_ratio", self.wordmap.keyword_ratio)?;
        Ok(())
    }
}

fn parse_ratio(key: &str, value: String) -> Result<f32, ConfigError> {
    let parsed: f32 = value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.clone(),
    })?;
    check_ratio(key, parsed)?;
    Ok(parsed)
}

fn check_ratio(key: &str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}

/// Coreference clustering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Refuse to merge clusters whose leaders carry different labels
    pub same_label_only: bool,

    /// Minimum leader similarity that merges two clusters outright
    pub similarity_threshold: f32,

    /// Token overlap ratio that must be exceeded for name labels
    pub overlap_ratio: f32,

    /// Labels eligible for the token overlap heuristic
    pub name_labels: Vec<String>,

    /// Labels dropped before clustering starts
    pub excluded_labels: Vec<String>,

    /// Upper bound on clustering passes (None: entity count)
    pub max_passes: Option<usize>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            same_label_only: true,
            similarity_threshold: 0.90,
            overlap_ratio: 0.3,
            name_labels: vec!["PERSON".to_string(), "ORG".to_string()],
            excluded_labels: ["DATE", "TIME", "NORP", "NUM", "CARDINAL"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_passes: None,
        }
    }
}

impl ClusterConfig {
    /// Whether entities with this label take part in clustering
    pub fn accepts_label(&self, label: &str) -> bool {
        !self.excluded_labels.iter().any(|l| l == label)
    }

    /// Whether the name overlap heuristic applies to this label
    pub fn is_name_label(&self, label: &str) -> bool {
        self.name_labels.iter().any(|l| l == label)
    }
}

/// Relation extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationConfig {
    /// Entity types allowed on the subject side
    pub subject_types: Vec<String>,

    /// Entity types allowed on the object side
    pub object_types: Vec<String>,
}

impl Default for RelationConfig {
    fn default() -> Self {
        let person_org = vec!["PERSON".to_string(), "ORG".to_string()];
        Self {
            subject_types: person_org.clone(),
            object_types: person_org,
        }
    }
}

impl RelationConfig {
    pub fn is_subject_type(&self, ent_type: &str) -> bool {
        self.subject_types.iter().any(|t| t == ent_type)
    }

    pub fn is_object_type(&self, ent_type: &str) -> bool {
        self.object_types.iter().any(|t| t == ent_type)
    }
}

/// Keyword map configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WordmapConfig {
    /// Strategy used when none is requested explicitly
    pub method: WordmapMethod,

    /// Coarse POS tags never counted as keywords on their own
    pub excluded_pos: Vec<String>,

    /// Share of ranked candidates kept by the keyword ranker
    pub keyword_ratio: f32,
}

impl Default for WordmapConfig {
    fn default() -> Self {
        Self {
            method: WordmapMethod::default(),
            excluded_pos: ["ADV", "PRON", "SPACE"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            keyword_ratio: 0.2,
        }
    }
}

impl WordmapConfig {
    pub fn is_excluded_pos(&self, pos: &str) -> bool {
        self.excluded_pos.iter().any(|p| p == pos)
    }
}

/// Keyword extraction strategies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WordmapMethod {
    #[default]
    NounChunks,
    Tokens,
    Entities,
    #[serde(alias = "gensim")]
    Ranked,
}

impl WordmapMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NounChunks => "noun_chunks",
            Self::Tokens => "tokens",
            Self::Entities => "entities",
            Self::Ranked => "ranked",
        }
    }
}

impl std::fmt::Display for WordmapMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for WordmapMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "noun_chunks" => Ok(Self::NounChunks),
            "tokens" => Ok(Self::Tokens),
            "entities" => Ok(Self::Entities),
            "ranked" | "gensim" => Ok(Self::Ranked),
            _ => Err(ConfigError::InvalidValue {
                key: "NLPY_WORDMAP_METHOD".to_string(),
                value: s.to_string(),
            }),
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
