//! Entity coreference clustering
//!
//! Every mention starts in its own cluster. A pass compares each live
//! cluster with every other live cluster and merges it with the first one
//! judged coreferent; passes repeat until one merges nothing. Because the
//! first match wins, the final clustering depends on mention order.

use std::collections::BTreeSet;

use tracing::debug;

use nlpy_core::{ClusterConfig, NlpError, Result, Span};

use crate::Wordmap;

// ============================================================================
// Mentions
// ============================================================================

/// A clusterable entity mention
pub trait Mention: Clone {
    fn text(&self) -> String;
    fn label(&self) -> &str;
    /// Length in tokens, used to pick cluster leaders
    fn token_count(&self) -> usize;
    fn lower_tokens(&self) -> BTreeSet<String>;
    fn similarity(&self, other: &Self) -> Result<f32>;
}

impl Mention for Span<'_> {
    fn text(&self) -> String {
        Span::text(self)
    }

    fn label(&self) -> &str {
        Span::label(self)
    }

    fn token_count(&self) -> usize {
        self.len()
    }

    fn lower_tokens(&self) -> BTreeSet<String> {
        Span::lower_tokens(self)
    }

    fn similarity(&self, other: &Self) -> Result<f32> {
        Span::similarity(self, other)
    }
}

// ============================================================================
// Cluster
// ============================================================================

/// Mentions judged to denote one referent
#[derive(Debug, Clone)]
pub struct Cluster<M> {
    leader: Option<M>,
    members: Vec<M>,
    merged: bool,
}

impl<M: Mention> Default for Cluster<M> {
    fn default() -> Self {
        Self {
            leader: None,
            members: Vec::new(),
            merged: false,
        }
    }
}

impl<M: Mention> Cluster<M> {
    /// Singleton cluster led by `item`
    pub fn new(item: M) -> Self {
        Self {
            leader: Some(item.clone()),
            members: vec![item],
            merged: false,
        }
    }

    /// Add a member; the first member of an empty cluster becomes its leader
    pub fn add(&mut self, item: M) {
        if self.leader.is_none() {
            self.leader = Some(item.clone());
        }
        self.members.push(item);
    }

    pub fn leader(&self) -> Option<&M> {
        self.leader.as_ref()
    }

    pub fn members(&self) -> &[M] {
        &self.members
    }

    /// True once the cluster has been consumed by a merge
    pub fn is_merged(&self) -> bool {
        self.merged
    }

    /// Combine two clusters into a new one, flagging both inputs as merged
    pub fn merge(c1: &mut Self, c2: &mut Self) -> Self {
        let leader = Self::select_leader(c1, c2);
        let mut members = c1.members.clone();
        members.extend(c2.members.iter().cloned());
        c1.merged = true;
        c2.merged = true;
        Self {
            leader,
            members,
            merged: false,
        }
    }

    /// The longer leader wins; ties keep the first cluster's leader
    fn select_leader(c1: &Self, c2: &Self) -> Option<M> {
        match (&c1.leader, &c2.leader) {
            (None, leader) | (leader, None) => leader.clone(),
            (Some(l1), Some(l2)) => {
                if l1.token_count() >= l2.token_count() {
                    Some(l1.clone())
                } else {
                    Some(l2.clone())
                }
            }
        }
    }
}

fn pair_mut<T>(items: &mut [T], i: usize, j: usize) -> (&mut T, &mut T) {
    if i < j {
        let (head, tail) = items.split_at_mut(j);
        (&mut head[i], &mut tail[0])
    } else {
        let (head, tail) = items.split_at_mut(i);
        (&mut tail[0], &mut head[j])
    }
}

// ============================================================================
// Clusterer
// ============================================================================

/// Final clusters with the number of passes it took to reach them
#[derive(Debug, Clone)]
pub struct Clustering<M> {
    pub clusters: Vec<Cluster<M>>,
    pub passes: usize,
}

enum Slot<M> {
    Merged(Cluster<M>),
    Kept(usize),
}

/// Fixpoint pairwise-merge clusterer
#[derive(Debug, Clone, Default)]
pub struct EntityClusterer {
    config: ClusterConfig,
}

impl EntityClusterer {
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Cluster mentions whose label passes the configured filter
    pub fn cluster<M: Mention>(&self, mentions: impl IntoIterator<Item = M>) -> Result<Vec<Cluster<M>>> {
        Ok(self.cluster_with_stats(mentions)?.clusters)
    }

    pub fn cluster_with_stats<M: Mention>(
        &self,
        mentions: impl IntoIterator<Item = M>,
    ) -> Result<Clustering<M>> {
        let mut clusters: Vec<Cluster<M>> = mentions
            .into_iter()
            .filter(|m| self.config.accepts_label(m.label()))
            .map(Cluster::new)
            .collect();

        // n seeds need at most n - 1 merging passes
        let bound = self
            .config
            .max_passes
            .unwrap_or_else(|| clusters.len().saturating_sub(1));
        let mut passes = 0;
        let mut changed = clusters.len() >= 2;

        while changed {
            if passes >= bound {
                return Err(NlpError::InvariantViolation(format!(
                    "clustering did not converge within {} passes ({} clusters left)",
                    bound,
                    clusters.len()
                )));
            }
            let (next, merged_any) = self.pass(clusters)?;
            clusters = next;
            passes += 1;
            changed = merged_any && clusters.len() >= 2;
            debug!(pass = passes, clusters = clusters.len(), merged_any, "clustering pass");
        }

        Ok(Clustering { clusters, passes })
    }

    /// One full scan; returns the next generation and whether anything merged
    fn pass<M: Mention>(&self, mut clusters: Vec<Cluster<M>>) -> Result<(Vec<Cluster<M>>, bool)> {
        let mut slots = Vec::with_capacity(clusters.len());
        let mut merged_any = false;

        for i in 0..clusters.len() {
            if clusters[i].merged {
                continue;
            }
            for j in 0..clusters.len() {
                if i == j || clusters[j].merged {
                    continue;
                }
                if self.should_merge(&clusters[i], &clusters[j])? {
                    let (c1, c2) = pair_mut(&mut clusters, i, j);
                    slots.push(Slot::Merged(Cluster::merge(c1, c2)));
                    merged_any = true;
                    break;
                }
            }
            if !clusters[i].merged {
                slots.push(Slot::Kept(i));
            }
        }

        // a kept cluster may still have been absorbed later in the pass
        let mut previous: Vec<Option<Cluster<M>>> = clusters.into_iter().map(Some).collect();
        let next = slots
            .into_iter()
            .filter_map(|slot| match slot {
                Slot::Merged(cluster) => Some(cluster),
                Slot::Kept(i) => previous[i].take().filter(|c| !c.merged),
            })
            .collect();

        Ok((next, merged_any))
    }

    /// Coreference test between two cluster leaders
    pub fn should_merge<M: Mention>(&self, c1: &Cluster<M>, c2: &Cluster<M>) -> Result<bool> {
        let (Some(l1), Some(l2)) = (c1.leader(), c2.leader()) else {
            return Ok(false);
        };

        if self.config.same_label_only && l1.label() != l2.label() {
            return Ok(false);
        }

        if l1.similarity(l2)? >= self.config.similarity_threshold {
            return Ok(true);
        }

        // "Thrun" joins "Sebastian Thrun"; "Bill Clinton" stays apart from "Hillary Clinton"
        if self.config.is_name_label(l1.label()) {
            let set1 = l1.lower_tokens();
            let set2 = l2.lower_tokens();
            let total = set1.len() + set2.len();
            if total > 0 {
                let shared = set1.intersection(&set2).count();
                if shared as f32 / total as f32 > self.config.overlap_ratio {
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }
}

/// Count every cluster's mentions under its leader's text
pub fn words<M: Mention>(clusters: &[Cluster<M>]) -> Wordmap {
    let mut map = Wordmap::new();
    for cluster in clusters {
        if let Some(leader) = cluster.leader() {
            *map.entry(leader.text()).or_insert(0) += cluster.members().len();
        }
    }
    map
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use nlpy_core::{AnnotatedDocument, AnnotatedDocumentBuilder};

    /// "Sebastian Thrun met Hillary Clinton and Bill Clinton . Thrun left ."
    fn names() -> AnnotatedDocument {
        let doc = AnnotatedDocumentBuilder::new()
            .sentence(&[
                ("Sebastian", "Sebastian", "PROPN", "compound", 1),
                ("Thrun", "Thrun", "PROPN", "nsubj", 2),
                ("met", "meet", "VERB", "ROOT", 2),
                ("Hillary", "Hillary", "PROPN", "compound", 4),
                ("Clinton", "Clinton", "PROPN", "dobj", 2),
                ("and", "and", "CCONJ", "cc", 4),
                ("Bill", "Bill", "PROPN", "compound", 7),
                ("Clinton", "Clinton", "PROPN", "conj", 4),
                (".", ".", "PUNCT", "punct", 2),
            ])
            .sentence(&[
                ("Thrun", "Thrun", "PROPN", "nsubj", 1),
                ("left", "leave", "VERB", "ROOT", 1),
                (".", ".", "PUNCT", "punct", 1),
            ])
            .entity(0, 2, "PERSON")
            .entity(3, 5, "PERSON")
            .entity(6, 8, "PERSON")
            .entity(9, 10, "PERSON");

        // orthogonal vectors: only the name overlap heuristic can merge
        (0..12)
            .fold(doc, |doc, i| {
                let mut v = vec![0.0; 12];
                v[i] = 1.0;
                doc.vector(i, v)
            })
            .build()
            .unwrap()
    }

    #[test]
    fn test_name_overlap_merges_surname() {
        let doc = names();
        let clusterer = EntityClusterer::default();
        let clusters = clusterer.cluster(doc.ents()).unwrap();

        assert_eq!(clusters.len(), 3);
        let map = words(&clusters);
        assert_eq!(map.get("Sebastian Thrun"), Some(&2));
        assert_eq!(map.get("Hillary Clinton"), Some(&1));
        assert_eq!(map.get("Bill Clinton"), Some(&1));
        assert_eq!(map.get("Thrun"), None);
    }

    #[test]
    fn test_overlap_ratios() {
        let doc = names();
        let clusterer = EntityClusterer::default();
        let ents: Vec<Span> = doc.ents().collect();

        let sebastian = Cluster::new(ents[0]);
        let hillary = Cluster::new(ents[1]);
        let bill = Cluster::new(ents[2]);
        let thrun = Cluster::new(ents[3]);

        // 1 / (1 + 2) > 0.3
        assert!(clusterer.should_merge(&thrun, &sebastian).unwrap());
        // 1 / (2 + 2) = 0.25
        assert!(!clusterer.should_merge(&hillary, &bill).unwrap());
    }

    #[test]
    fn test_similarity_merge_and_label_guard() {
        let doc = AnnotatedDocumentBuilder::new()
            .sentence(&[
                ("Google", "Google", "PROPN", "nsubj", 1),
                ("bought", "buy", "VERB", "ROOT", 1),
                ("Alphabet", "Alphabet", "PROPN", "dobj", 1),
                ("Paris", "Paris", "PROPN", "npadvmod", 1),
            ])
            .entity(0, 1, "ORG")
            .entity(2, 3, "ORG")
            .entity(3, 4, "GPE")
            .vector(0, vec![1.0, 0.0])
            .vector(2, vec![0.95, 0.05])
            .vector(3, vec![1.0, 0.0])
            .build()
            .unwrap();

        let clusterer = EntityClusterer::default();
        let clusters = clusterer.cluster(doc.ents()).unwrap();
        assert_eq!(clusters.len(), 2);

        let map = words(&clusters);
        // equal lengths keep the first cluster's leader
        assert_eq!(map.get("Google"), Some(&2));
        // identical vector, different label
        assert_eq!(map.get("Paris"), Some(&1));
    }

    #[test]
    fn test_merge_flags_inputs_and_selects_longer_leader() {
        let doc = names();
        let ents: Vec<Span> = doc.ents().collect();
        let mut thrun = Cluster::new(ents[3]);
        let mut sebastian = Cluster::new(ents[0]);

        let merged = Cluster::merge(&mut thrun, &mut sebastian);
        assert!(thrun.is_merged());
        assert!(sebastian.is_merged());
        assert!(!merged.is_merged());
        assert_eq!(merged.leader().map(|l| l.text()), Some("Sebastian Thrun".to_string()));
        assert_eq!(merged.members().len(), 2);

        let mut empty = Cluster::default();
        let mut single = Cluster::new(ents[1]);
        let merged = Cluster::merge(&mut empty, &mut single);
        assert_eq!(merged.leader().map(|l| l.text()), Some("Hillary Clinton".to_string()));
    }

    #[test]
    fn test_add_sets_leader() {
        let doc = names();
        let ents: Vec<Span> = doc.ents().collect();
        let mut cluster = Cluster::default();
        cluster.add(ents[3]);
        cluster.add(ents[0]);
        assert_eq!(cluster.leader().map(|l| l.text()), Some("Thrun".to_string()));
        assert_eq!(cluster.members().len(), 2);
    }

    #[test]
    fn test_excluded_labels_are_not_seeded() {
        let doc = AnnotatedDocumentBuilder::new()
            .sentence(&[
                ("Bill", "Bill", "PROPN", "nsubj", 1),
                ("left", "leave", "VERB", "ROOT", 1),
                ("Tuesday", "Tuesday", "PROPN", "npadvmod", 1),
            ])
            .entity(0, 1, "PERSON")
            .entity(2, 3, "DATE")
            .vector(0, vec![1.0])
            .vector(2, vec![1.0])
            .build()
            .unwrap();

        let clusters = EntityClusterer::default().cluster(doc.ents()).unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(words(&clusters).get("Tuesday"), None);
    }

    #[test]
    fn test_missing_vectors_fail() {
        let doc = AnnotatedDocumentBuilder::new()
            .sentence(&[
                ("Bill", "Bill", "PROPN", "nsubj", 1),
                ("met", "meet", "VERB", "ROOT", 1),
                ("Hillary", "Hillary", "PROPN", "dobj", 1),
            ])
            .entity(0, 1, "PERSON")
            .entity(2, 3, "PERSON")
            .build()
            .unwrap();

        let result = EntityClusterer::default().cluster(doc.ents());
        assert!(matches!(result, Err(NlpError::AnnotationUnavailable(_))));
    }

    #[test]
    fn test_pass_bound_violation() {
        let doc = AnnotatedDocumentBuilder::new()
            .sentence(&[
                ("IBM", "IBM", "PROPN", "nsubj", 1),
                ("hired", "hire", "VERB", "ROOT", 1),
                ("IBM", "IBM", "PROPN", "dobj", 1),
                ("IBM", "IBM", "PROPN", "npadvmod", 1),
            ])
            .entity(0, 1, "ORG")
            .entity(2, 3, "ORG")
            .entity(3, 4, "ORG")
            .vector(0, vec![1.0])
            .vector(2, vec![1.0])
            .vector(3, vec![1.0])
            .build()
            .unwrap();

        let unbounded = EntityClusterer::default()
            .cluster_with_stats(doc.ents())
            .unwrap();
        assert_eq!(unbounded.clusters.len(), 1);
        assert_eq!(unbounded.passes, 2);
        assert_eq!(words(&unbounded.clusters).get("IBM"), Some(&3));

        let config = ClusterConfig {
            max_passes: Some(1),
            ..ClusterConfig::default()
        };
        let result = EntityClusterer::new(config).cluster(doc.ents());
        assert!(matches!(result, Err(NlpError::InvariantViolation(_))));
    }

    #[test]
    fn test_fewer_than_two_mentions() {
        let doc = names();
        let one: Vec<Span> = doc.ents().take(1).collect();
        let clustering = EntityClusterer::default().cluster_with_stats(one).unwrap();
        assert_eq!(clustering.passes, 0);
        assert_eq!(clustering.clusters.len(), 1);

        let none: Vec<Span> = Vec::new();
        assert!(EntityClusterer::default().cluster(none).unwrap().is_empty());
    }
}
