//! TextRank keyword ranking
//!
//! Builds a word co-occurrence graph over the candidate words of a text and
//! ranks its nodes with weighted PageRank.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use regex::Regex;
use tracing::debug;

use nlpy_core::{NlpError, Result};

use crate::KeywordRanker;

static WORD_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{L}[\p{L}\p{N}'-]*").unwrap());

const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few",
    "for", "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers",
    "herself", "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its",
    "itself", "just", "me", "more", "most", "my", "myself", "no", "nor", "not", "now", "of",
    "off", "on", "once", "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own",
    "same", "she", "should", "so", "some", "such", "than", "that", "the", "their", "theirs",
    "them", "themselves", "then", "there", "these", "they", "this", "those", "through", "to",
    "too", "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "will", "with", "would", "you", "your", "yours", "yourself",
    "yourselves",
];

const MIN_WORD_CHARS: usize = 3;

/// Graph-based keyword ranker
#[derive(Debug, Clone)]
pub struct TextRank {
    /// Fraction of distinct candidate words to return
    ratio: f64,
    /// Words within this distance in the candidate sequence share an edge
    window: usize,
    damping: f64,
    max_iterations: usize,
    tolerance: f64,
}

impl Default for TextRank {
    fn default() -> Self {
        Self {
            ratio: 0.2,
            window: 2,
            damping: 0.85,
            max_iterations: 100,
            tolerance: 1e-6,
        }
    }
}

impl TextRank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ratio(mut self, ratio: f64) -> Self {
        self.ratio = ratio;
        self
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Lowercased candidate words in text order
    fn candidates(text: &str) -> Vec<String> {
        WORD_PATTERN
            .find_iter(text)
            .map(|m| m.as_str().to_lowercase())
            .filter(|w| w.chars().count() >= MIN_WORD_CHARS && !STOPWORDS.contains(&w.as_str()))
            .collect()
    }

    /// Keywords with their scores, best first
    pub fn rank(&self, text: &str) -> Result<Vec<(String, f64)>> {
        if !(self.ratio > 0.0 && self.ratio <= 1.0) {
            return Err(NlpError::Ranker(format!(
                "keyword ratio must be in (0, 1], got {}",
                self.ratio
            )));
        }
        if self.window < 2 {
            return Err(NlpError::Ranker(format!(
                "co-occurrence window must be at least 2, got {}",
                self.window
            )));
        }

        let words = Self::candidates(text);
        if words.is_empty() {
            return Ok(Vec::new());
        }

        let mut graph: UnGraph<String, f64> = UnGraph::new_undirected();
        let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();
        for word in &words {
            nodes
                .entry(word.as_str())
                .or_insert_with(|| graph.add_node(word.clone()));
        }

        for (i, word) in words.iter().enumerate() {
            let a = nodes[word.as_str()];
            for other in words.iter().skip(i + 1).take(self.window - 1) {
                let b = nodes[other.as_str()];
                if a == b {
                    continue;
                }
                match graph.find_edge(a, b) {
                    Some(edge) => graph[edge] += 1.0,
                    None => {
                        graph.add_edge(a, b, 1.0);
                    }
                }
            }
        }

        let scores = self.pagerank(&graph);

        let mut ranked: Vec<(String, f64)> = graph
            .node_indices()
            .map(|n| (graph[n].clone(), scores[n.index()]))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let keep = ((ranked.len() as f64 * self.ratio) as usize).max(1);
        ranked.truncate(keep);
        debug!(
            candidates = words.len(),
            distinct = graph.node_count(),
            keywords = ranked.len(),
            "ranked keywords"
        );
        Ok(ranked)
    }

    fn pagerank(&self, graph: &UnGraph<String, f64>) -> Vec<f64> {
        let n = graph.node_count();
        let strength: Vec<f64> = graph
            .node_indices()
            .map(|v| graph.edges(v).map(|e| *e.weight()).sum::<f64>())
            .collect();
        let mut scores = vec![1.0; n];

        for iteration in 0..self.max_iterations {
            let mut next = vec![1.0 - self.damping; n];
            for v in graph.node_indices() {
                let mut inflow = 0.0;
                for edge in graph.edges(v) {
                    let u = if edge.source() == v {
                        edge.target()
                    } else {
                        edge.source()
                    };
                    if strength[u.index()] > 0.0 {
                        inflow += edge.weight() / strength[u.index()] * scores[u.index()];
                    }
                }
                next[v.index()] += self.damping * inflow;
            }

            let delta = scores
                .iter()
                .zip(&next)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max);
            scores = next;
            if delta < self.tolerance {
                debug!(iterations = iteration + 1, "pagerank converged");
                break;
            }
        }

        scores
    }
}

impl KeywordRanker for TextRank {
    fn keywords(&self, text: &str) -> Result<String> {
        let ranked = self.rank(text)?;
        Ok(ranked
            .into_iter()
            .map(|(word, _)| word)
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
