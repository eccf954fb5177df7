//! Dependency tree walking primitives shared by the extractors

use nlpy_core::{NlpError, Result, Span, TokenRef};

/// Anything that can start an ascent towards the sentence root
pub trait Anchored<'a> {
    fn anchor(&self) -> TokenRef<'a>;
}

impl<'a> Anchored<'a> for TokenRef<'a> {
    fn anchor(&self) -> TokenRef<'a> {
        *self
    }
}

/// Spans ascend from their first token
impl<'a> Anchored<'a> for Span<'a> {
    fn anchor(&self) -> TokenRef<'a> {
        self.first()
    }
}

/// Ascend through heads until a token labelled as sentence root.
///
/// The ascent is bounded by the sentence length so malformed trees fail
/// instead of looping.
pub fn root<'a>(node: &impl Anchored<'a>) -> Result<TokenRef<'a>> {
    let start = node.anchor();
    let limit = start.sent().len();
    let mut current = start;
    for _ in 0..=limit {
        if is_root(current) {
            return Ok(current);
        }
        current = current.head();
    }
    Err(NlpError::InvariantViolation(format!(
        "no root reached from token {} '{}' within {} steps",
        start.i(),
        start.text(),
        limit
    )))
}

/// `nsubj`, `csubj`, `nsubjpass`, `csubjpass`
pub fn is_subject(token: TokenRef<'_>) -> bool {
    let dep = token.dep();
    let mut chars = dep.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase()) && chars.as_str().starts_with("subj")
}

pub fn is_compound(token: TokenRef<'_>) -> bool {
    token.dep() == "compound"
}

pub fn is_root(token: TokenRef<'_>) -> bool {
    token.dep().eq_ignore_ascii_case("root")
}

/// True when the sentence root is a form of "be" or "do"
pub fn is_copula_or_light_verb_root<'a>(node: &impl Anchored<'a>) -> Result<bool> {
    let lemma = root(node)?.lemma();
    Ok(lemma == "be" || lemma == "do")
}

#[cfg(test)]
mod tests {
    use super::*;
    use nlpy_core::{AnnotatedDocument, AnnotatedDocumentBuilder};

    /// "Bill is the president ."
    fn copula() -> AnnotatedDocument {
        AnnotatedDocumentBuilder::new()
            .sentence(&[
                ("Bill", "Bill", "PROPN", "nsubj", 1),
                ("is", "be", "AUX", "ROOT", 1),
                ("the", "the", "DET", "det", 3),
                ("president", "president", "NOUN", "attr", 1),
                (".", ".", "PUNCT", "punct", 1),
            ])
            .sentence(&[
                ("Hillary", "Hillary", "PROPN", "nsubj", 1),
                ("won", "win", "VERB", "ROOT", 1),
            ])
            .build()
            .unwrap()
    }

    #[test]
    fn test_root_from_token_and_span() {
        let doc = copula();
        let the = doc.token(2).unwrap();
        assert_eq!(root(&the).unwrap().text(), "is");
        assert_eq!(root(&doc.token(1).unwrap()).unwrap().text(), "is");

        let span = doc.span(5, 7).unwrap();
        assert_eq!(root(&span).unwrap().text(), "won");
    }

    #[test]
    fn test_role_predicates() {
        let doc = copula();
        assert!(is_subject(doc.token(0).unwrap()));
        assert!(!is_subject(doc.token(3).unwrap()));
        assert!(is_root(doc.token(1).unwrap()));
        assert!(!is_compound(doc.token(0).unwrap()));
    }

    #[test]
    fn test_subject_labels() {
        let doc = AnnotatedDocumentBuilder::new()
            .sentence(&[
                ("a", "a", "X", "nsubjpass", 4),
                ("b", "b", "X", "csubj", 4),
                ("c", "c", "X", "subj", 4),
                ("d", "d", "X", "Nsubj", 4),
                ("e", "e", "X", "ROOT", 4),
            ])
            .build()
            .unwrap();
        let subjects: Vec<bool> = doc.tokens().map(is_subject).collect();
        assert_eq!(subjects, vec![true, true, false, false, false]);
    }

    #[test]
    fn test_copula_or_light_verb_root() {
        let doc = copula();
        assert!(is_copula_or_light_verb_root(&doc.token(3).unwrap()).unwrap());
        assert!(!is_copula_or_light_verb_root(&doc.token(5).unwrap()).unwrap());
    }

    #[test]
    fn test_root_label_case_insensitive() {
        let doc = AnnotatedDocumentBuilder::new()
            .sentence(&[
                ("she", "she", "PRON", "nsubj", 1),
                ("does", "do", "VERB", "root", 1),
            ])
            .build()
            .unwrap();
        assert!(is_copula_or_light_verb_root(&doc.token(0).unwrap()).unwrap());
    }
}
