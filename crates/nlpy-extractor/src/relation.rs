//! Relation Extraction (RE) module
//!
//! Walks the dependency tree of an annotated document and extracts
//! (subject, predicate, object) triples between typed entities with three
//! rules, applied in order:
//! - copula: "Bill is the president of the U.S."
//! - generic subject-verb-object, passive voice included: "David killed by Hillary"
//! - appositive prepositions: "Mark Zuckerberg, CEO of Facebook, ..."
//!
//! Triples stated under negation are dropped afterwards.

use tracing::debug;

use nlpy_core::{AnnotatedDocument, NlpError, RelationConfig, Result, Span, TokenRef};

use crate::tree::{self, is_compound, is_root, is_subject};
use crate::{RelationRule, RelationTriple};

// ============================================================================
// Candidates
// ============================================================================

/// A triple still bound to the document, so its predicate can be checked
/// for negation
#[derive(Debug, Clone, Copy)]
struct Candidate<'a> {
    subject: Span<'a>,
    predicate: Span<'a>,
    object: Span<'a>,
    rule: RelationRule,
}

impl<'a> Candidate<'a> {
    fn new(subject: TokenRef<'a>, predicate: Span<'a>, object: TokenRef<'a>, rule: RelationRule) -> Self {
        Self {
            subject: subject.into(),
            predicate,
            object: object.into(),
            rule,
        }
    }

    /// The predicate's sentence root carries a `neg` dependent
    fn is_negated(&self) -> Result<bool> {
        let root = tree::root(&self.predicate)?;
        Ok(root.children().any(|child| child.dep() == "neg"))
    }

    fn into_triple(self) -> RelationTriple {
        RelationTriple {
            subject: self.subject.into(),
            predicate: self.predicate.into(),
            object: self.object.into(),
            rule: self.rule,
        }
    }
}

fn predicate_span(doc: &AnnotatedDocument, start: usize, end: usize) -> Result<Span<'_>> {
    doc.span(start, end).ok_or_else(|| {
        NlpError::InvariantViolation(format!("predicate span [{}, {}) out of range", start, end))
    })
}

/// Entity tokens of a document whose entity spans were merged
fn entity_tokens(doc: &AnnotatedDocument) -> Result<Vec<TokenRef<'_>>> {
    doc.ents()
        .map(|span| {
            if span.len() == 1 {
                Ok(span.first())
            } else {
                Err(NlpError::InvariantViolation(format!(
                    "entity '{}' spans {} tokens; merge entities before extracting relations",
                    span.text(),
                    span.len()
                )))
            }
        })
        .collect()
}

/// Whether `object` hangs off the subject's head without passing through the
/// subject itself
fn head_chain_match(subject: TokenRef<'_>, object: TokenRef<'_>) -> Result<bool> {
    let limit = object.sent().len();
    let mut current = object.head();
    for _ in 0..=limit {
        if current == subject {
            return Ok(false);
        }
        if current == subject.head() {
            return Ok(true);
        }
        if current.is_self_headed() {
            return Ok(false);
        }
        current = current.head();
    }
    Err(NlpError::InvariantViolation(format!(
        "head chain from token {} did not reach a root within {} steps",
        object.i(),
        limit
    )))
}

/// Whether `marker` lies on the head chain from `object` up to, not
/// including, `stop`
fn governed_by(object: TokenRef<'_>, marker: TokenRef<'_>, stop: TokenRef<'_>) -> bool {
    let mut current = object.head();
    for _ in 0..=object.sent().len() {
        if current == stop {
            return false;
        }
        if current == marker {
            return true;
        }
        if current.is_self_headed() {
            return false;
        }
        current = current.head();
    }
    false
}

/// Start of `anchor` extended leftwards through adjacent compound modifiers
fn extend_through_compounds(anchor: TokenRef<'_>) -> usize {
    let lefts: Vec<TokenRef> = anchor.lefts().collect();
    let mut start = anchor.i();
    for left in lefts.into_iter().rev() {
        if is_compound(left) && left.i() + 1 == start {
            start = left.i();
        } else {
            break;
        }
    }
    start
}

// ============================================================================
// Extractor
// ============================================================================

/// Rule-based dependency relation extractor
#[derive(Debug, Clone, Default)]
pub struct RelationExtractor {
    config: RelationConfig,
}

impl RelationExtractor {
    pub fn new(config: RelationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RelationConfig {
        &self.config
    }

    /// Merge entity spans, apply every rule and drop negated triples
    pub fn extract(&self, doc: &AnnotatedDocument) -> Result<Vec<RelationTriple>> {
        let merged = doc.merge_entities()?;

        let mut candidates = self.copula_candidates(&merged)?;
        candidates.extend(self.spo_candidates(&merged)?);
        candidates.extend(self.preposition_candidates(&merged)?);

        let found = candidates.len();
        let mut triples = Vec::with_capacity(found);
        for candidate in candidates {
            if !candidate.is_negated()? {
                triples.push(candidate.into_triple());
            }
        }

        debug!(found, kept = triples.len(), "extracted relations");
        Ok(triples)
    }

    /// Copula relations on an entity-merged document, without the negation filter
    pub fn extract_is_relations(&self, doc: &AnnotatedDocument) -> Result<Vec<RelationTriple>> {
        Ok(self
            .copula_candidates(doc)?
            .into_iter()
            .map(Candidate::into_triple)
            .collect())
    }

    /// Subject-verb-object relations on an entity-merged document, without the
    /// negation filter
    pub fn extract_spo_relations(&self, doc: &AnnotatedDocument) -> Result<Vec<RelationTriple>> {
        Ok(self
            .spo_candidates(doc)?
            .into_iter()
            .map(Candidate::into_triple)
            .collect())
    }

    /// Appositive preposition relations on an entity-merged document, without
    /// the negation filter
    pub fn extract_preposition_relations(&self, doc: &AnnotatedDocument) -> Result<Vec<RelationTriple>> {
        Ok(self
            .preposition_candidates(doc)?
            .into_iter()
            .map(Candidate::into_triple)
            .collect())
    }

    /// Object-typed tokens of the subject's sentence matching its head chain
    fn objects_of<'a>(&self, subject: TokenRef<'a>) -> Result<Vec<TokenRef<'a>>> {
        let mut objects = Vec::new();
        for token in subject.sent().tokens() {
            if token != subject
                && self.config.is_object_type(token.ent_type())
                && head_chain_match(subject, token)?
            {
                objects.push(token);
            }
        }
        Ok(objects)
    }

    fn copula_candidates<'a>(&self, doc: &'a AnnotatedDocument) -> Result<Vec<Candidate<'a>>> {
        let mut out = Vec::new();
        for e in entity_tokens(doc)? {
            if !self.config.is_subject_type(e.ent_type())
                || !is_subject(e)
                || !tree::is_copula_or_light_verb_root(&e)?
            {
                continue;
            }

            let root = tree::root(&e)?;
            let Some(anchor) = root.children().filter(|c| !c.is_punct()).last() else {
                continue;
            };
            let start = root.i().min(extend_through_compounds(anchor));

            for object in self.objects_of(e)? {
                let mut end = (anchor.i() + 1).max(root.i() + 1);
                let marker = object.head();
                if marker.dep() == "prep" && marker.head() == anchor && marker.i() >= end {
                    end = marker.i() + 1;
                }
                let predicate = predicate_span(doc, start, end)?;
                out.push(Candidate::new(e, predicate, object, RelationRule::Copula));
            }
        }
        debug!(count = out.len(), "copula relations");
        Ok(out)
    }

    fn spo_candidates<'a>(&self, doc: &'a AnnotatedDocument) -> Result<Vec<Candidate<'a>>> {
        let mut out = Vec::new();
        for e in entity_tokens(doc)? {
            if !self.config.is_subject_type(e.ent_type()) {
                continue;
            }
            if !(is_subject(e) || (is_compound(e) && is_root(e.head()))) {
                continue;
            }

            let verb = e.head();
            if tree::is_copula_or_light_verb_root(&verb)? {
                continue;
            }

            // passive voice: "killed by"
            let agent = if verb.pos() == "VERB" {
                verb.rights().filter(|t| t.dep() == "agent").last()
            } else {
                None
            };
            let end = agent.map_or(verb.i(), |a| a.i()) + 1;
            let predicate = predicate_span(doc, verb.i(), end)?;

            for object in self.objects_of(e)? {
                let candidate = match agent {
                    Some(marker) if governed_by(object, marker, verb) => {
                        Candidate::new(object, predicate, e, RelationRule::Spo)
                    }
                    _ => Candidate::new(e, predicate, object, RelationRule::Spo),
                };
                out.push(candidate);
            }
        }
        debug!(count = out.len(), "spo relations");
        Ok(out)
    }

    fn preposition_candidates<'a>(&self, doc: &'a AnnotatedDocument) -> Result<Vec<Candidate<'a>>> {
        let mut out = Vec::new();
        for pobj in entity_tokens(doc)? {
            if !self.config.is_object_type(pobj.ent_type())
                || pobj.dep() != "pobj"
                || tree::is_copula_or_light_verb_root(&pobj)?
            {
                continue;
            }

            let prep = pobj.head();
            if prep.dep() != "prep" {
                continue;
            }
            let head = prep.head();
            if !matches!(head.dep(), "appos" | "conj") {
                continue;
            }

            // "CEO of": up to, not including, the preposition's right edge
            let end = prep.right_edge().i();
            if end <= head.i() {
                continue;
            }
            let predicate = predicate_span(doc, head.i(), end)?;

            for subject in head.head().subtree() {
                if subject != pobj && self.config.is_subject_type(subject.ent_type()) {
                    out.push(Candidate::new(subject, predicate, pobj, RelationRule::Preposition));
                }
            }
        }
        debug!(count = out.len(), "preposition relations");
        Ok(out)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use nlpy_core::AnnotatedDocumentBuilder;

    /// "Hillary met with Bill ."
    fn met_with() -> AnnotatedDocument {
        AnnotatedDocumentBuilder::new()
            .sentence(&[
                ("Hillary", "Hillary", "PROPN", "nsubj", 1),
                ("met", "meet", "VERB", "ROOT", 1),
                ("with", "with", "ADP", "prep", 1),
                ("Bill", "Bill", "PROPN", "pobj", 2),
                (".", ".", "PUNCT", "punct", 1),
            ])
            .entity(0, 1, "PERSON")
            .entity(3, 4, "PERSON")
            .build()
            .unwrap()
    }

    #[test]
    fn test_head_chain_match() {
        let doc = met_with();
        let hillary = doc.token(0).unwrap();
        let bill = doc.token(3).unwrap();
        // Bill -> with -> met, the subject's head
        assert!(head_chain_match(hillary, bill).unwrap());
        // Hillary's head is met, the sentence root; Bill's head is "with"
        assert!(!head_chain_match(bill, hillary).unwrap());
    }

    #[test]
    fn test_head_chain_rejects_through_subject() {
        // "Hillary , mother of Chelsea , won ."
        let doc = AnnotatedDocumentBuilder::new()
            .sentence(&[
                ("Hillary", "Hillary", "PROPN", "nsubj", 6),
                (",", ",", "PUNCT", "punct", 0),
                ("mother", "mother", "NOUN", "appos", 0),
                ("of", "of", "ADP", "prep", 2),
                ("Chelsea", "Chelsea", "PROPN", "pobj", 3),
                (",", ",", "PUNCT", "punct", 0),
                ("won", "win", "VERB", "ROOT", 6),
            ])
            .build()
            .unwrap();
        let hillary = doc.token(0).unwrap();
        let chelsea = doc.token(4).unwrap();
        assert!(!head_chain_match(hillary, chelsea).unwrap());
    }

    #[test]
    fn test_spo_relation() {
        let doc = met_with();
        let triples = RelationExtractor::default().extract(&doc).unwrap();
        assert_eq!(triples.len(), 1);
        assert_eq!(triples[0].texts(), ("Hillary", "met", "Bill"));
        assert_eq!(triples[0].rule, RelationRule::Spo);
        assert_eq!(triples[0].subject.start_char, 0);
        assert_eq!(triples[0].object.start_char, 17);
        assert_eq!(triples[0].object.end_char, 21);
    }

    #[test]
    fn test_entity_types_are_configurable() {
        let doc = met_with();
        let config = RelationConfig {
            subject_types: vec!["ORG".to_string()],
            ..RelationConfig::default()
        };
        let triples = RelationExtractor::new(config).extract(&doc).unwrap();
        assert!(triples.is_empty());
    }

    #[test]
    fn test_rules_require_merged_entities() {
        let doc = AnnotatedDocumentBuilder::new()
            .sentence(&[
                ("Hillary", "Hillary", "PROPN", "compound", 1),
                ("Clinton", "Clinton", "PROPN", "nsubj", 2),
                ("won", "win", "VERB", "ROOT", 2),
            ])
            .entity(0, 2, "PERSON")
            .build()
            .unwrap();
        let extractor = RelationExtractor::default();
        assert!(matches!(
            extractor.extract_spo_relations(&doc),
            Err(NlpError::InvariantViolation(_))
        ));
        assert!(extractor.extract(&doc).unwrap().is_empty());
        let merged = doc.merge_entities().unwrap();
        assert!(extractor.extract_spo_relations(&merged).unwrap().is_empty());
    }

    #[test]
    fn test_governed_by_coordinated_agent() {
        // "David killed by Hillary and Bill"
        let doc = AnnotatedDocumentBuilder::new()
            .sentence(&[
                ("David", "David", "PROPN", "nsubjpass", 1),
                ("killed", "kill", "VERB", "ROOT", 1),
                ("by", "by", "ADP", "agent", 1),
                ("Hillary", "Hillary", "PROPN", "pobj", 2),
                ("and", "and", "CCONJ", "cc", 3),
                ("Bill", "Bill", "PROPN", "conj", 3),
            ])
            .build()
            .unwrap();
        let verb = doc.token(1).unwrap();
        let by = doc.token(2).unwrap();
        assert!(governed_by(doc.token(3).unwrap(), by, verb));
        assert!(governed_by(doc.token(5).unwrap(), by, verb));
        assert!(!governed_by(doc.token(0).unwrap(), by, verb));
    }

    #[test]
    fn test_compound_extension() {
        // "the step mother"
        let doc = AnnotatedDocumentBuilder::new()
            .sentence(&[
                ("the", "the", "DET", "det", 2),
                ("step", "step", "NOUN", "compound", 2),
                ("mother", "mother", "NOUN", "ROOT", 2),
            ])
            .build()
            .unwrap();
        assert_eq!(extend_through_compounds(doc.token(2).unwrap()), 1);
        assert_eq!(extend_through_compounds(doc.token(1).unwrap()), 1);
    }
}
