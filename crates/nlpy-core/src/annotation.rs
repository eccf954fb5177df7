//! Annotation contract
//!
//! The output of an external annotation pipeline (tokenizer, tagger,
//! dependency parser, NER, word vectors), validated and indexed for
//! read-only navigation:
//! - `AnnotatedDocument`: tokens, sentences, entity spans, noun chunks
//! - `TokenRef` / `Span`: borrowed views with dependency-tree navigation
//! - `Annotator`: the injectable capability that produces documents

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{NlpError, Result};

/// Name of the relation extraction component, for `AnnotateOptions::disable`
pub const RELATIONS_COMPONENT: &str = "relations";

fn default_whitespace() -> String {
    " ".to_string()
}

fn is_root_label(dep: &str) -> bool {
    dep.eq_ignore_ascii_case("root")
}

// ============================================================================
// Serialized form
// ============================================================================

/// One annotated token as produced by the annotator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub lemma: String,
    /// Coarse part-of-speech tag (e.g. "PROPN", "VERB")
    pub pos: String,
    /// Dependency relation to the head (e.g. "nsubj", "ROOT")
    pub dep: String,
    /// Document index of the head token; the sentence root points to itself
    pub head: usize,
    /// Entity type, empty when the token is outside any entity
    #[serde(default)]
    pub ent_type: String,
    /// Character offset in the source text, when the annotator reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idx: Option<usize>,
    /// Whitespace following the token in the source text
    #[serde(default = "default_whitespace")]
    pub whitespace: String,
    #[serde(default)]
    pub is_stop: bool,
    #[serde(default)]
    pub is_punct: bool,
    #[serde(default)]
    pub is_space: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
}

/// Token range `[start, end)` with an optional label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanBounds {
    pub start: usize,
    pub end: usize,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label: String,
}

impl SpanBounds {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            label: String::new(),
        }
    }

    pub fn labeled(start: usize, end: usize, label: impl Into<String>) -> Self {
        Self {
            start,
            end,
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawAnnotatedDocument {
    tokens: Vec<Token>,
    #[serde(default)]
    sents: Vec<SpanBounds>,
    #[serde(default)]
    ents: Vec<SpanBounds>,
    #[serde(default)]
    noun_chunks: Vec<SpanBounds>,
}

// ============================================================================
// Annotated Document
// ============================================================================

/// A validated annotated document
///
/// Construction checks the dependency-tree invariants the extractors rely on:
/// heads stay inside their sentence, each sentence has exactly one
/// self-headed `ROOT` token, head chains are acyclic, and entity spans do
/// not overlap.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "RawAnnotatedDocument", into = "RawAnnotatedDocument")]
pub struct AnnotatedDocument {
    tokens: Vec<Token>,
    sents: Vec<SpanBounds>,
    ents: Vec<SpanBounds>,
    noun_chunks: Vec<SpanBounds>,
    text: String,
    offsets: Vec<usize>,
    sent_of: Vec<usize>,
    children: Vec<Vec<usize>>,
}

impl TryFrom<RawAnnotatedDocument> for AnnotatedDocument {
    type Error = NlpError;

    fn try_from(raw: RawAnnotatedDocument) -> Result<Self> {
        Self::new(raw.tokens, raw.sents, raw.ents, raw.noun_chunks)
    }
}

impl From<AnnotatedDocument> for RawAnnotatedDocument {
    fn from(doc: AnnotatedDocument) -> Self {
        Self {
            tokens: doc.tokens,
            sents: doc.sents,
            ents: doc.ents,
            noun_chunks: doc.noun_chunks,
        }
    }
}

impl fmt::Debug for AnnotatedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnotatedDocument")
            .field("text", &self.text)
            .field("tokens", &self.tokens.len())
            .field("sents", &self.sents.len())
            .field("ents", &self.ents)
            .finish()
    }
}

impl AnnotatedDocument {
    /// Build and validate a document.
    ///
    /// An empty `sents` list treats the whole document as one sentence.
    /// Tokens inside an entity span without an `ent_type` inherit its label.
    pub fn new(
        mut tokens: Vec<Token>,
        mut sents: Vec<SpanBounds>,
        mut ents: Vec<SpanBounds>,
        noun_chunks: Vec<SpanBounds>,
    ) -> Result<Self> {
        let n = tokens.len();
        if sents.is_empty() && n > 0 {
            sents.push(SpanBounds::new(0, n));
        }

        // Sentences must tile the document
        let mut sent_of = vec![0; n];
        let mut expected_start = 0;
        for (s, sent) in sents.iter().enumerate() {
            if sent.start != expected_start || sent.end <= sent.start || sent.end > n {
                return Err(NlpError::MalformedInput(format!(
                    "sentence {} [{}, {}) does not continue the document at token {}",
                    s, sent.start, sent.end, expected_start
                )));
            }
            for slot in &mut sent_of[sent.start..sent.end] {
                *slot = s;
            }
            expected_start = sent.end;
        }
        if expected_start != n {
            return Err(NlpError::MalformedInput(format!(
                "sentences cover {} of {} tokens",
                expected_start, n
            )));
        }

        // Heads
        let mut children = vec![Vec::new(); n];
        let mut roots = vec![0usize; sents.len()];
        for (i, token) in tokens.iter().enumerate() {
            if token.head >= n {
                return Err(NlpError::MalformedInput(format!(
                    "token {} '{}' has head {} outside the document",
                    i, token.text, token.head
                )));
            }
            if sent_of[token.head] != sent_of[i] {
                return Err(NlpError::MalformedInput(format!(
                    "token {} '{}' has head {} in another sentence",
                    i, token.text, token.head
                )));
            }
            if token.head == i {
                if !is_root_label(&token.dep) {
                    return Err(NlpError::MalformedInput(format!(
                        "self-headed token {} '{}' is labelled '{}' instead of ROOT",
                        i, token.text, token.dep
                    )));
                }
                roots[sent_of[i]] += 1;
            } else {
                children[token.head].push(i);
            }
        }
        if let Some(s) = roots.iter().position(|&count| count != 1) {
            return Err(NlpError::MalformedInput(format!(
                "sentence {} has {} root tokens, expected exactly one",
                s, roots[s]
            )));
        }

        // Every head chain must reach the root within the sentence length
        for i in 0..n {
            let sent = &sents[sent_of[i]];
            let limit = sent.end - sent.start;
            let mut current = i;
            let mut steps = 0;
            while tokens[current].head != current {
                current = tokens[current].head;
                steps += 1;
                if steps > limit {
                    return Err(NlpError::MalformedInput(format!(
                        "head chain of token {} '{}' contains a cycle",
                        i, tokens[i].text
                    )));
                }
            }
        }

        // Vectors share one dimension
        let mut dimension = None;
        for token in &tokens {
            if let Some(vector) = &token.vector {
                match dimension {
                    None => dimension = Some(vector.len()),
                    Some(d) if d != vector.len() => {
                        return Err(NlpError::MalformedInput(format!(
                            "token '{}' has a {}-dimensional vector, expected {}",
                            token.text,
                            vector.len(),
                            d
                        )));
                    }
                    Some(_) => {}
                }
            }
        }

        // Entity spans: in range, sorted, disjoint
        ents.sort_by_key(|e| (e.start, e.end));
        let mut previous_end = 0;
        for ent in &ents {
            if ent.start >= ent.end || ent.end > n {
                return Err(NlpError::MalformedInput(format!(
                    "entity [{}, {}) is empty or outside the document",
                    ent.start, ent.end
                )));
            }
            if ent.start < previous_end {
                return Err(NlpError::MalformedInput(format!(
                    "entity [{}, {}) overlaps a previous entity",
                    ent.start, ent.end
                )));
            }
            if sent_of[ent.start] != sent_of[ent.end - 1] {
                return Err(NlpError::MalformedInput(format!(
                    "entity [{}, {}) crosses a sentence boundary",
                    ent.start, ent.end
                )));
            }
            previous_end = ent.end;
            for token in &mut tokens[ent.start..ent.end] {
                if token.ent_type.is_empty() {
                    token.ent_type = ent.label.clone();
                }
            }
        }

        for chunk in &noun_chunks {
            if chunk.start >= chunk.end || chunk.end > n {
                return Err(NlpError::MalformedInput(format!(
                    "noun chunk [{}, {}) is empty or outside the document",
                    chunk.start, chunk.end
                )));
            }
        }

        let (text, offsets) = layout_text(&tokens)?;

        Ok(Self {
            tokens,
            sents,
            ents,
            noun_chunks,
            text,
            offsets,
            sent_of,
            children,
        })
    }

    /// Parse the annotator's JSON output
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| NlpError::MalformedInput(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| NlpError::Other(e.into()))
    }

    /// Document text rebuilt from tokens and their trailing whitespace, padded
    /// so that reported token offsets point at the token text
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Token view by document index
    pub fn token(&self, i: usize) -> Option<TokenRef<'_>> {
        (i < self.tokens.len()).then_some(TokenRef { doc: self, i })
    }

    pub fn tokens(&self) -> impl Iterator<Item = TokenRef<'_>> + '_ {
        (0..self.tokens.len()).map(move |i| TokenRef { doc: self, i })
    }

    /// Span view over `[start, end)`
    pub fn span(&self, start: usize, end: usize) -> Option<Span<'_>> {
        (start < end && end <= self.tokens.len()).then_some(Span {
            doc: self,
            start,
            end,
            label: "",
        })
    }

    pub fn sents(&self) -> impl Iterator<Item = Span<'_>> + '_ {
        self.sents.iter().map(move |b| self.bounded(b))
    }

    /// Entity spans in document order, labelled with their entity type
    pub fn ents(&self) -> impl Iterator<Item = Span<'_>> + '_ {
        self.ents.iter().map(move |b| self.bounded(b))
    }

    pub fn noun_chunks(&self) -> impl Iterator<Item = Span<'_>> + '_ {
        self.noun_chunks.iter().map(move |b| self.bounded(b))
    }

    fn bounded<'a>(&'a self, bounds: &'a SpanBounds) -> Span<'a> {
        Span {
            doc: self,
            start: bounds.start,
            end: bounds.end,
            label: &bounds.label,
        }
    }

    /// Return a copy where every entity span is collapsed into one token.
    ///
    /// The merged token takes its POS, dependency label and head from the
    /// span's syntactic root (the member closest to the sentence root); its
    /// text and lemma are the span text. Heads, sentences, entities and
    /// noun chunks are re-indexed.
    pub fn merge_entities(&self) -> Result<AnnotatedDocument> {
        let n = self.tokens.len();
        let mut new_index = vec![0; n];
        let mut groups: Vec<(usize, usize, Option<&SpanBounds>)> = Vec::new();

        let mut ents = self.ents.iter().peekable();
        let mut i = 0;
        while i < n {
            match ents.peek().map(|e| (e.start, e.end)) {
                Some((start, end)) if start == i => {
                    for slot in &mut new_index[start..end] {
                        *slot = groups.len();
                    }
                    groups.push((start, end, ents.next()));
                    i = end;
                }
                _ => {
                    new_index[i] = groups.len();
                    groups.push((i, i + 1, None));
                    i += 1;
                }
            }
        }

        let mut tokens = Vec::with_capacity(groups.len());
        for &(start, end, ent) in &groups {
            let Some(ent) = ent else {
                let mut token = self.tokens[start].clone();
                token.head = new_index[token.head];
                tokens.push(token);
                continue;
            };

            let span = self.bounded(ent);
            let root = span.syntactic_root()?;
            let text = span.text();
            let head = if root.is_self_headed() {
                new_index[root.i]
            } else {
                new_index[root.head().i]
            };
            let vector = span.vector().ok();

            tokens.push(Token {
                lemma: text.clone(),
                text,
                pos: root.pos().to_string(),
                dep: root.dep().to_string(),
                head,
                ent_type: ent.label.clone(),
                idx: self.tokens[start].idx,
                whitespace: self.tokens[end - 1].whitespace.clone(),
                is_stop: false,
                is_punct: false,
                is_space: false,
                vector,
            });
        }

        let remap = |b: &SpanBounds| SpanBounds {
            start: new_index[b.start],
            end: new_index[b.end - 1] + 1,
            label: b.label.clone(),
        };

        AnnotatedDocument::new(
            tokens,
            self.sents.iter().map(remap).collect(),
            self.ents.iter().map(remap).collect(),
            self.noun_chunks.iter().map(remap).collect(),
        )
    }
}

/// Lay tokens out into a text and per-token character offsets.
///
/// A token's `idx` wins over the running position: a gap is padded with
/// spaces, and an offset inside the previous token's trailing whitespace cuts
/// that whitespace short. Offsets before the end of the previous token's text
/// are rejected.
fn layout_text(tokens: &[Token]) -> Result<(String, Vec<usize>)> {
    let mut text = String::new();
    let mut offsets = Vec::with_capacity(tokens.len());
    let mut chars = 0;
    let mut previous_end = 0;
    for (i, token) in tokens.iter().enumerate() {
        let offset = token.idx.unwrap_or(chars);
        if offset < previous_end {
            return Err(NlpError::MalformedInput(format!(
                "token {} '{}' has offset {} before the end of the previous token at {}",
                i, token.text, offset, previous_end
            )));
        }
        if offset > chars {
            text.extend(std::iter::repeat(' ').take(offset - chars));
        } else if offset < chars {
            let cut = text
                .char_indices()
                .nth(offset)
                .map_or(text.len(), |(byte, _)| byte);
            text.truncate(cut);
        }
        offsets.push(offset);
        text.push_str(&token.text);
        previous_end = offset + token.text.chars().count();
        text.push_str(&token.whitespace);
        chars = previous_end + token.whitespace.chars().count();
    }
    Ok((text, offsets))
}

// ============================================================================
// Token view
// ============================================================================

/// Borrowed view of one token with dependency-tree navigation
#[derive(Clone, Copy)]
pub struct TokenRef<'a> {
    doc: &'a AnnotatedDocument,
    i: usize,
}

impl PartialEq for TokenRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.i == other.i
    }
}

impl Eq for TokenRef<'_> {}

impl fmt::Debug for TokenRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRef")
            .field("i", &self.i)
            .field("text", &self.text())
            .field("dep", &self.dep())
            .finish()
    }
}

impl<'a> TokenRef<'a> {
    fn data(&self) -> &'a Token {
        &self.doc.tokens[self.i]
    }

    pub fn doc(&self) -> &'a AnnotatedDocument {
        self.doc
    }

    /// Position in the document
    pub fn i(&self) -> usize {
        self.i
    }

    pub fn text(&self) -> &'a str {
        &self.data().text
    }

    pub fn lemma(&self) -> &'a str {
        &self.data().lemma
    }

    pub fn pos(&self) -> &'a str {
        &self.data().pos
    }

    pub fn dep(&self) -> &'a str {
        &self.data().dep
    }

    pub fn ent_type(&self) -> &'a str {
        &self.data().ent_type
    }

    pub fn whitespace(&self) -> &'a str {
        &self.data().whitespace
    }

    pub fn is_stop(&self) -> bool {
        self.data().is_stop
    }

    pub fn is_punct(&self) -> bool {
        self.data().is_punct
    }

    pub fn is_space(&self) -> bool {
        self.data().is_space
    }

    pub fn vector(&self) -> Option<&'a [f32]> {
        self.data().vector.as_deref()
    }

    /// Character offset of the token in the document text
    pub fn idx(&self) -> usize {
        self.doc.offsets[self.i]
    }

    pub fn head(&self) -> TokenRef<'a> {
        TokenRef {
            doc: self.doc,
            i: self.data().head,
        }
    }

    /// True for the sentence root, whose head is itself
    pub fn is_self_headed(&self) -> bool {
        self.data().head == self.i
    }

    /// Direct dependents in document order
    pub fn children(&self) -> impl Iterator<Item = TokenRef<'a>> + 'a {
        let doc = self.doc;
        doc.children[self.i]
            .iter()
            .map(move |&i| TokenRef { doc, i })
    }

    /// Dependents left of the token
    pub fn lefts(&self) -> impl Iterator<Item = TokenRef<'a>> + 'a {
        let i = self.i;
        self.children().filter(move |c| c.i < i)
    }

    /// Dependents right of the token
    pub fn rights(&self) -> impl Iterator<Item = TokenRef<'a>> + 'a {
        let i = self.i;
        self.children().filter(move |c| c.i > i)
    }

    /// The token and all of its descendants, in document order
    pub fn subtree(&self) -> Vec<TokenRef<'a>> {
        let mut nodes = vec![*self];
        let mut stack = vec![self.i];
        while let Some(i) = stack.pop() {
            for &child in &self.doc.children[i] {
                nodes.push(TokenRef {
                    doc: self.doc,
                    i: child,
                });
                stack.push(child);
            }
        }
        nodes.sort_by_key(|t| t.i);
        nodes
    }

    /// Leftmost token of the subtree
    pub fn left_edge(&self) -> TokenRef<'a> {
        self.subtree().first().copied().unwrap_or(*self)
    }

    /// Rightmost token of the subtree
    pub fn right_edge(&self) -> TokenRef<'a> {
        self.subtree().last().copied().unwrap_or(*self)
    }

    /// The sentence containing the token
    pub fn sent(&self) -> Span<'a> {
        self.doc.bounded(&self.doc.sents[self.doc.sent_of[self.i]])
    }

    /// Number of head steps from the token to its sentence root
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = *self;
        while !current.is_self_headed() {
            current = current.head();
            depth += 1;
        }
        depth
    }
}

// ============================================================================
// Span view
// ============================================================================

/// Borrowed contiguous token range
#[derive(Clone, Copy)]
pub struct Span<'a> {
    doc: &'a AnnotatedDocument,
    start: usize,
    end: usize,
    label: &'a str,
}

impl PartialEq for Span<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.start == other.start && self.end == other.end
    }
}

impl Eq for Span<'_> {}

impl fmt::Debug for Span<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Span")
            .field("start", &self.start)
            .field("end", &self.end)
            .field("text", &self.text())
            .field("label", &self.label)
            .finish()
    }
}

impl<'a> From<TokenRef<'a>> for Span<'a> {
    fn from(token: TokenRef<'a>) -> Self {
        Span {
            doc: token.doc,
            start: token.i,
            end: token.i + 1,
            label: token.ent_type(),
        }
    }
}

impl<'a> Span<'a> {
    pub fn doc(&self) -> &'a AnnotatedDocument {
        self.doc
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of tokens
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// Entity label, empty for unlabelled spans
    pub fn label(&self) -> &'a str {
        self.label
    }

    pub fn first(&self) -> TokenRef<'a> {
        TokenRef {
            doc: self.doc,
            i: self.start,
        }
    }

    pub fn tokens(&self) -> impl Iterator<Item = TokenRef<'a>> + 'a {
        let doc = self.doc;
        (self.start..self.end).map(move |i| TokenRef { doc, i })
    }

    fn join(&self, part: impl Fn(&Token) -> &str) -> String {
        let mut out = String::new();
        for i in self.start..self.end {
            let token = &self.doc.tokens[i];
            out.push_str(part(token));
            if i + 1 < self.end {
                out.push_str(&token.whitespace);
            }
        }
        out
    }

    /// Span text with inner whitespace preserved
    pub fn text(&self) -> String {
        self.join(|t| &t.text)
    }

    /// Token lemmas joined by the original inner whitespace
    pub fn lemma(&self) -> String {
        self.join(|t| &t.lemma)
    }

    pub fn start_char(&self) -> usize {
        self.doc.offsets[self.start]
    }

    pub fn end_char(&self) -> usize {
        if self.is_empty() {
            return self.start_char();
        }
        let last = self.end - 1;
        self.doc.offsets[last] + self.doc.tokens[last].text.chars().count()
    }

    /// Lowercased token texts
    pub fn lower_tokens(&self) -> BTreeSet<String> {
        self.tokens().map(|t| t.text().to_lowercase()).collect()
    }

    /// The member closest to the sentence root
    pub fn syntactic_root(&self) -> Result<TokenRef<'a>> {
        self.tokens()
            .filter(|t| t.is_self_headed() || !(self.start..self.end).contains(&t.head().i))
            .min_by_key(|t| (t.depth(), t.i))
            .ok_or_else(|| {
                NlpError::InvariantViolation(format!(
                    "span [{}, {}) has no syntactic root",
                    self.start, self.end
                ))
            })
    }

    /// Mean of the token vectors
    pub fn vector(&self) -> Result<Vec<f32>> {
        let mut sum: Vec<f32> = Vec::new();
        for token in self.tokens() {
            let vector = token.vector().ok_or_else(|| {
                NlpError::AnnotationUnavailable(format!(
                    "token {} '{}' has no vector",
                    token.i,
                    token.text()
                ))
            })?;
            if sum.is_empty() {
                sum = vector.to_vec();
            } else {
                for (acc, v) in sum.iter_mut().zip(vector) {
                    *acc += v;
                }
            }
        }
        let count = self.len().max(1) as f32;
        Ok(sum.into_iter().map(|v| v / count).collect())
    }

    /// Cosine similarity of the span vectors, clamped into [0, 1]
    pub fn similarity(&self, other: &Span<'_>) -> Result<f32> {
        let a = self.vector()?;
        let b = other.vector()?;
        Ok(cosine(&a, &b).clamp(0.0, 1.0))
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

// ============================================================================
// Annotator capability
// ============================================================================

/// Components an annotator run may skip
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotateOptions {
    disabled: BTreeSet<String>,
}

impl AnnotateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for frequency counting, which never needs relations
    pub fn for_counting() -> Self {
        Self::new().disable(RELATIONS_COMPONENT)
    }

    pub fn disable(mut self, component: impl Into<String>) -> Self {
        self.disabled.insert(component.into());
        self
    }

    pub fn is_enabled(&self, component: &str) -> bool {
        !self.disabled.contains(component)
    }
}

/// Produces annotated documents from raw text
pub trait Annotator: Send + Sync {
    fn annotate(&self, text: &str, options: &AnnotateOptions) -> Result<AnnotatedDocument>;
}

/// Annotator serving documents annotated ahead of time, keyed by text
#[derive(Debug, Clone, Default)]
pub struct PrecomputedAnnotator {
    documents: HashMap<String, AnnotatedDocument>,
}

impl PrecomputedAnnotator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, doc: AnnotatedDocument) -> Self {
        self.insert(doc);
        self
    }

    pub fn insert(&mut self, doc: AnnotatedDocument) {
        self.documents.insert(doc.text().to_string(), doc);
    }
}

impl Annotator for PrecomputedAnnotator {
    fn annotate(&self, text: &str, _options: &AnnotateOptions) -> Result<AnnotatedDocument> {
        self.documents.get(text).cloned().ok_or_else(|| {
            NlpError::AnnotationUnavailable(format!(
                "no annotation for text of {} chars",
                text.chars().count()
            ))
        })
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Token description for the builder: (text, lemma, pos, dep, head),
/// with `head` relative to the start of its sentence
pub type TokenSpec<'s> = (&'s str, &'s str, &'s str, &'s str, usize);

/// Incremental construction of annotated documents, sentence by sentence
///
/// Whitespace is a single space between tokens except before punctuation.
#[derive(Debug, Default)]
pub struct AnnotatedDocumentBuilder {
    tokens: Vec<Token>,
    sents: Vec<SpanBounds>,
    ents: Vec<SpanBounds>,
    noun_chunks: Vec<SpanBounds>,
    stop_words: BTreeSet<String>,
}

impl AnnotatedDocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Words flagged as stopwords (case-insensitive)
    pub fn stop_words(mut self, words: &[&str]) -> Self {
        self.stop_words
            .extend(words.iter().map(|w| w.to_lowercase()));
        self
    }

    pub fn sentence(mut self, tokens: &[TokenSpec<'_>]) -> Self {
        let base = self.tokens.len();
        for &(text, lemma, pos, dep, head) in tokens {
            self.tokens.push(Token {
                text: text.to_string(),
                lemma: lemma.to_string(),
                pos: pos.to_string(),
                dep: dep.to_string(),
                head: base + head,
                ent_type: String::new(),
                idx: None,
                whitespace: String::new(),
                is_stop: false,
                is_punct: pos == "PUNCT",
                is_space: pos == "SPACE",
                vector: None,
            });
        }
        self.sents.push(SpanBounds::new(base, self.tokens.len()));
        self
    }

    /// Entity over absolute token indices `[start, end)`
    pub fn entity(mut self, start: usize, end: usize, label: &str) -> Self {
        self.ents.push(SpanBounds::labeled(start, end, label));
        self
    }

    pub fn noun_chunk(mut self, start: usize, end: usize) -> Self {
        self.noun_chunks.push(SpanBounds::new(start, end));
        self
    }

    pub fn vector(mut self, i: usize, vector: Vec<f32>) -> Self {
        if let Some(token) = self.tokens.get_mut(i) {
            token.vector = Some(vector);
        }
        self
    }

    pub fn build(mut self) -> Result<AnnotatedDocument> {
        let n = self.tokens.len();
        for i in 0..n {
            let next_is_punct = self.tokens.get(i + 1).map(|t| t.is_punct).unwrap_or(true);
            let token = &mut self.tokens[i];
            token.whitespace = if next_is_punct { String::new() } else { " ".to_string() };
            token.is_stop = self.stop_words.contains(&token.text.to_lowercase());
        }
        AnnotatedDocument::new(self.tokens, self.sents, self.ents, self.noun_chunks)
    }
}
