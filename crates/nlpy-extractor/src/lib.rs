//! nlpy Extractor - Keyword maps and relation triples
//!
//! Consumes annotated documents and derives:
//! - keyword/entity frequency maps, optionally clustering coreferent
//!   entity mentions under one canonical surface form
//! - (subject, predicate, object) relation triples found by walking the
//!   dependency tree

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use nlpy_core::{Result, Span};

/// Surface term -> number of occurrences
pub type Wordmap = HashMap<String, usize>;

/// Text of a triple argument with its character offsets in the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationArgument {
    pub text: String,
    pub start_char: usize,
    pub end_char: usize,
}

impl From<Span<'_>> for RelationArgument {
    fn from(span: Span<'_>) -> Self {
        Self {
            text: span.text(),
            start_char: span.start_char(),
            end_char: span.end_char(),
        }
    }
}

/// Extraction rule that produced a triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationRule {
    /// "X is the mother of Y"
    Copula,
    /// "X met with Y", "Y killed by X"
    Spo,
    /// "X, CEO of Y, ..."
    Preposition,
}

impl RelationRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Copula => "copula",
            Self::Spo => "spo",
            Self::Preposition => "preposition",
        }
    }
}

impl std::fmt::Display for RelationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Extracted (subject, predicate, object) relation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationTriple {
    pub subject: RelationArgument,
    pub predicate: RelationArgument,
    pub object: RelationArgument,
    pub rule: RelationRule,
}

impl RelationTriple {
    /// (subject, predicate, object) texts
    pub fn texts(&self) -> (&str, &str, &str) {
        (&self.subject.text, &self.predicate.text, &self.object.text)
    }
}

impl std::fmt::Display for RelationTriple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {}, {})",
            self.subject.text, self.predicate.text, self.object.text
        )
    }
}

/// Statistical keyword ranker producing newline-delimited keywords
pub trait KeywordRanker: Send + Sync {
    fn keywords(&self, text: &str) -> Result<String>;
}

pub mod cluster;
pub mod pipeline;
pub mod relation;
pub mod textrank;
pub mod tree;
pub mod wordmap;

pub use cluster::{words, Cluster, Clustering, EntityClusterer, Mention};
pub use pipeline::{normalize_line_breaks, Pipeline, ProcessedDocument};
pub use relation::RelationExtractor;
pub use textrank::TextRank;
pub use wordmap::WordmapBuilder;
