//! nlpy Core - Annotation contract, document models, and shared types
//!
//! This crate defines the core abstractions used throughout nlpy:
//! - Annotated documents (tokens, dependency heads, entity spans, vectors)
//! - Document / Entity models and their JSON form
//! - Common error types
//! - Configuration management

pub mod annotation;
pub mod config;

pub use annotation::{
    AnnotateOptions, AnnotatedDocument, AnnotatedDocumentBuilder, Annotator,
    PrecomputedAnnotator, Span, SpanBounds, Token, TokenRef, RELATIONS_COMPONENT,
};
pub use config::{
    AppConfig, ClusterConfig, ConfigError, LoggingConfig, RelationConfig, WordmapConfig,
    WordmapMethod,
};

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for nlpy operations
#[derive(Error, Debug)]
pub enum NlpError {
    /// A capability (vectors, labels) is missing from the annotation
    #[error("Annotation unavailable: {0}")]
    AnnotationUnavailable(String),

    /// Input that does not satisfy the document or annotation contract
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// An internal bound or structural invariant was broken
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Keyword ranking failed: {0}")]
    Ranker(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, NlpError>;

// ============================================================================
// Document Models
// ============================================================================

/// A named-entity mention with character offsets into the document text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    pub label: String,
    pub start_char: usize,
    pub end_char: usize,
}

impl Entity {
    pub fn new(
        text: impl Into<String>,
        label: impl Into<String>,
        start_char: usize,
        end_char: usize,
    ) -> Self {
        Self {
            text: text.into(),
            label: label.into(),
            start_char,
            end_char,
        }
    }

    /// Read a standalone JSON list of entities
    pub fn list_from_json(json: &str) -> Result<Vec<Entity>> {
        serde_json::from_str(json).map_err(|e| NlpError::MalformedInput(e.to_string()))
    }

    pub fn list_to_json(entities: &[Entity]) -> Result<String> {
        serde_json::to_string(entities).map_err(|e| NlpError::Other(e.into()))
    }
}

/// Document text with its entity mentions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub entities: Vec<Entity>,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            entities: Vec::new(),
        }
    }

    /// Collect the entities of an annotated document.
    ///
    /// Entities whose text is pure whitespace are dropped; some recognizers
    /// tag runs of newlines as entities.
    pub fn from_annotated(doc: &AnnotatedDocument) -> Self {
        let entities = doc
            .ents()
            .filter_map(|span| {
                let text = span.text();
                if text.trim().is_empty() {
                    return None;
                }
                Some(Entity {
                    label: span.label().to_string(),
                    start_char: span.start_char(),
                    end_char: span.end_char(),
                    text,
                })
            })
            .collect();

        Self {
            text: doc.text().to_string(),
            entities,
        }
    }

    /// Load from a JSON string; every entity field is required
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| NlpError::MalformedInput(e.to_string()))
    }

    /// Load from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| NlpError::Other(e.into()))
    }
}

// ============================================================================
// Tests
// ============================================================================
