//! Text processing pipeline
//!
//! Raw text -> line break normalization -> annotation -> entity document and
//! relation triples.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use nlpy_core::{AnnotateOptions, AnnotatedDocument, Annotator, Document, Result, RELATIONS_COMPONENT};

use crate::relation::RelationExtractor;
use crate::RelationTriple;

static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{2,}").unwrap());

/// Collapse runs of blank lines into one paragraph break and join wrapped
/// lines with a space
pub fn normalize_line_breaks(text: &str) -> String {
    PARAGRAPH_BREAK
        .split(text)
        .map(|paragraph| paragraph.replace('\n', " "))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Entities and relations of one processed text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedDocument {
    pub document: Document,
    pub relations: Vec<RelationTriple>,
}

/// Annotate-then-extract pipeline over an injected annotator
pub struct Pipeline {
    annotator: Arc<dyn Annotator>,
    extractor: RelationExtractor,
    preprocess: bool,
}

impl Pipeline {
    pub fn new(annotator: Arc<dyn Annotator>) -> Self {
        Self {
            annotator,
            extractor: RelationExtractor::default(),
            preprocess: false,
        }
    }

    pub fn with_extractor(mut self, extractor: RelationExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Toggle line break normalization before annotation (off by default)
    pub fn with_preprocessing(mut self, enabled: bool) -> Self {
        self.preprocess = enabled;
        self
    }

    pub fn process(&self, text: &str, options: &AnnotateOptions) -> Result<ProcessedDocument> {
        let text = if self.preprocess {
            normalize_line_breaks(text)
        } else {
            text.to_string()
        };
        let annotated = self.annotator.annotate(&text, options)?;
        self.process_annotated(&annotated, options)
    }

    /// Skip annotation for documents annotated elsewhere
    pub fn process_annotated(
        &self,
        annotated: &AnnotatedDocument,
        options: &AnnotateOptions,
    ) -> Result<ProcessedDocument> {
        let document = Document::from_annotated(annotated);
        let relations = if options.is_enabled(RELATIONS_COMPONENT) {
            self.extractor.extract(annotated)?
        } else {
            debug!("relation extraction disabled");
            Vec::new()
        };

        info!(
            tokens = annotated.len(),
            entities = document.entities.len(),
            relations = relations.len(),
            "processed document"
        );
        Ok(ProcessedDocument {
            document,
            relations,
        })
    }
}
