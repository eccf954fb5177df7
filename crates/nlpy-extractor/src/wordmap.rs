//! Keyword map construction
//!
//! One pure counting function per [`WordmapMethod`], plus a builder that
//! annotates raw text with an injected [`Annotator`] first.

use std::sync::Arc;

use tracing::{debug, warn};

use nlpy_core::{
    AnnotateOptions, AnnotatedDocument, Annotator, ClusterConfig, Result, WordmapConfig,
    WordmapMethod,
};

use crate::cluster::{words, EntityClusterer};
use crate::textrank::TextRank;
use crate::{KeywordRanker, Wordmap};

/// Noun chunk lemmas, skipping single-token chunks with an excluded POS
pub fn from_noun_chunks(doc: &AnnotatedDocument, config: &WordmapConfig) -> Wordmap {
    let mut map = Wordmap::new();
    for chunk in doc.noun_chunks() {
        if chunk.len() == 1 && config.is_excluded_pos(chunk.first().pos()) {
            continue;
        }
        *map.entry(chunk.lemma()).or_insert(0) += 1;
    }
    map
}

/// Token lemmas, skipping stopwords, punctuation and excluded POS tags
pub fn from_tokens(doc: &AnnotatedDocument, config: &WordmapConfig) -> Wordmap {
    let mut map = Wordmap::new();
    for token in doc.tokens() {
        if token.is_stop() || token.is_punct() || config.is_excluded_pos(token.pos()) {
            continue;
        }
        *map.entry(token.lemma().to_string()).or_insert(0) += 1;
    }
    map
}

/// Entity mentions clustered by coreference, counted under each leader
pub fn from_entities(doc: &AnnotatedDocument, config: &ClusterConfig) -> Result<Wordmap> {
    let clusters = EntityClusterer::new(config.clone()).cluster(doc.ents())?;
    Ok(words(&clusters))
}

/// Newline-delimited ranker output; blank lines are ignored
pub fn from_ranked_keywords(text: &str, ranker: &dyn KeywordRanker) -> Result<Wordmap> {
    let mut map = Wordmap::new();
    for line in ranker.keywords(text)?.lines() {
        let keyword = line.trim();
        if !keyword.is_empty() {
            *map.entry(keyword.to_string()).or_insert(0) += 1;
        }
    }
    Ok(map)
}

/// Parse a method name, falling back to noun chunks for unknown names
pub fn resolve_method(name: &str) -> WordmapMethod {
    name.parse().unwrap_or_else(|_| {
        warn!(method = name, "unknown wordmap method, using noun_chunks");
        WordmapMethod::NounChunks
    })
}

// ============================================================================
// Builder
// ============================================================================

/// Keyword map builder over an injected annotator
pub struct WordmapBuilder {
    annotator: Arc<dyn Annotator>,
    ranker: Option<Arc<dyn KeywordRanker>>,
    config: WordmapConfig,
    clustering: ClusterConfig,
}

impl WordmapBuilder {
    pub fn new(annotator: Arc<dyn Annotator>) -> Self {
        Self {
            annotator,
            ranker: None,
            config: WordmapConfig::default(),
            clustering: ClusterConfig::default(),
        }
    }

    /// Replace the built-in TextRank ranker
    pub fn with_ranker(mut self, ranker: Arc<dyn KeywordRanker>) -> Self {
        self.ranker = Some(ranker);
        self
    }

    pub fn with_config(mut self, config: WordmapConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_cluster_config(mut self, config: ClusterConfig) -> Self {
        self.clustering = config;
        self
    }

    /// Count keywords of raw text with the configured default method
    pub fn build_default(&self, text: &str) -> Result<Wordmap> {
        self.build(text, self.config.method)
    }

    /// Annotate `text` (relations disabled) and count its keywords
    pub fn build(&self, text: &str, method: WordmapMethod) -> Result<Wordmap> {
        if method == WordmapMethod::Ranked {
            return self.ranked(text);
        }
        let doc = self
            .annotator
            .annotate(text, &AnnotateOptions::for_counting())?;
        self.build_annotated(&doc, method)
    }

    /// Count keywords of an already annotated document
    pub fn build_annotated(&self, doc: &AnnotatedDocument, method: WordmapMethod) -> Result<Wordmap> {
        let map = match method {
            WordmapMethod::NounChunks => from_noun_chunks(doc, &self.config),
            WordmapMethod::Tokens => from_tokens(doc, &self.config),
            WordmapMethod::Entities => from_entities(doc, &self.clustering)?,
            WordmapMethod::Ranked => self.ranked(doc.text())?,
        };
        debug!(method = %method, terms = map.len(), "built wordmap");
        Ok(map)
    }

    fn ranked(&self, text: &str) -> Result<Wordmap> {
        match &self.ranker {
            Some(ranker) => from_ranked_keywords(text, ranker.as_ref()),
            None => {
                let ranker = TextRank::new().with_ratio(f64::from(self.config.keyword_ratio));
                from_ranked_keywords(text, &ranker)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nlpy_core::{AnnotatedDocumentBuilder, NlpError, PrecomputedAnnotator};

    /// "She quickly bought the red car and a house . The car broke ."
    fn shopping() -> AnnotatedDocument {
        AnnotatedDocumentBuilder::new()
            .stop_words(&["she", "the", "and", "a"])
            .sentence(&[
                ("She", "she", "PRON", "nsubj", 2),
                ("quickly", "quickly", "ADV", "advmod", 2),
                ("bought", "buy", "VERB", "ROOT", 2),
                ("the", "the", "DET", "det", 5),
                ("red", "red", "ADJ", "amod", 5),
                ("car", "car", "NOUN", "dobj", 2),
                ("and", "and", "CCONJ", "cc", 5),
                ("a", "a", "DET", "det", 8),
                ("house", "house", "NOUN", "conj", 5),
                (".", ".", "PUNCT", "punct", 2),
            ])
            .sentence(&[
                ("The", "the", "DET", "det", 1),
                ("car", "car", "NOUN", "nsubj", 2),
                ("broke", "break", "VERB", "ROOT", 2),
                (".", ".", "PUNCT", "punct", 2),
            ])
            .noun_chunk(0, 1)
            .noun_chunk(3, 6)
            .noun_chunk(7, 9)
            .noun_chunk(10, 12)
            .build()
            .unwrap()
    }

    struct FixedRanker(&'static str);

    impl KeywordRanker for FixedRanker {
        fn keywords(&self, _text: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_noun_chunks() {
        let map = from_noun_chunks(&shopping(), &WordmapConfig::default());
        assert_eq!(map.len(), 3);
        assert_eq!(map.get("the red car"), Some(&1));
        assert_eq!(map.get("a house"), Some(&1));
        assert_eq!(map.get("the car"), Some(&1));
        assert_eq!(map.get("she"), None);
    }

    #[test]
    fn test_tokens() {
        let map = from_tokens(&shopping(), &WordmapConfig::default());
        assert_eq!(map.get("car"), Some(&2));
        assert_eq!(map.get("buy"), Some(&1));
        assert_eq!(map.get("break"), Some(&1));
        assert_eq!(map.get("red"), Some(&1));
        assert_eq!(map.get("house"), Some(&1));
        assert_eq!(map.get("quickly"), None);
        assert_eq!(map.get("the"), None);
        assert_eq!(map.get("."), None);
        assert_eq!(map.values().sum::<usize>(), 6);
    }

    #[test]
    fn test_ranked_keywords_ignore_blank_lines() {
        let map = from_ranked_keywords("ignored", &FixedRanker("car\n\nhouse\ncar\n")).unwrap();
        assert_eq!(map.get("car"), Some(&2));
        assert_eq!(map.get("house"), Some(&1));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_resolve_method() {
        assert_eq!(resolve_method("tokens"), WordmapMethod::Tokens);
        assert_eq!(resolve_method("gensim"), WordmapMethod::Ranked);
        assert_eq!(resolve_method("bogus"), WordmapMethod::NounChunks);
    }

    #[test]
    fn test_builder_annotates_text() {
        let doc = shopping();
        let text = doc.text().to_string();
        let annotator = Arc::new(PrecomputedAnnotator::new().with_document(doc));
        let builder = WordmapBuilder::new(annotator);

        let map = builder.build_default(&text).unwrap();
        assert_eq!(map.get("the red car"), Some(&1));

        let map = builder.build(&text, WordmapMethod::Tokens).unwrap();
        assert_eq!(map.get("car"), Some(&2));

        let missing = builder.build("unknown text", WordmapMethod::Tokens);
        assert!(matches!(missing, Err(NlpError::AnnotationUnavailable(_))));
    }

    #[test]
    fn test_builder_ranked_methods() {
        let annotator = Arc::new(PrecomputedAnnotator::new());
        let builder = WordmapBuilder::new(annotator.clone());
        let map = builder
            .build("Rust compiler optimizes Rust code.", WordmapMethod::Ranked)
            .unwrap();
        assert_eq!(map.get("rust"), Some(&1));

        let builder = WordmapBuilder::new(annotator).with_ranker(Arc::new(FixedRanker("alpha")));
        let map = builder.build("anything", WordmapMethod::Ranked).unwrap();
        assert_eq!(map.get("alpha"), Some(&1));
    }

    #[test]
    fn test_entities_strategy() {
        let doc = AnnotatedDocumentBuilder::new()
            .sentence(&[
                ("Thrun", "Thrun", "PROPN", "nsubj", 1),
                ("met", "meet", "VERB", "ROOT", 1),
                ("Sebastian", "Sebastian", "PROPN", "compound", 3),
                ("Thrun", "Thrun", "PROPN", "dobj", 1),
                ("Monday", "Monday", "PROPN", "npadvmod", 1),
            ])
            .entity(0, 1, "PERSON")
            .entity(2, 4, "PERSON")
            .entity(4, 5, "DATE")
            .vector(0, vec![1.0, 0.0])
            .vector(2, vec![0.0, 1.0])
            .vector(3, vec![0.0, 1.0])
            .vector(4, vec![1.0, 0.0])
            .build()
            .unwrap();
        let map = from_entities(&doc, &ClusterConfig::default()).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("Sebastian Thrun"), Some(&2));
    }
}
