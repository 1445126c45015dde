//! Majority-vote label propagation.
//!
//! Each round, every unlabeled node polls its labeled neighbors and adopts
//! the clear winner. Updates from one round are applied together after the
//! whole graph has voted, and labeled nodes (seeds included) never change.
//!
//! Unlike [`LevelSync`](super::LevelSync), a node can only be labeled when a
//! majority of its labeled neighbors agree, so dense boundaries between
//! clusters stay unlabeled instead of being carved up by distance alone.
//!
//! A vote carries three numbers:
//!
//! ```text
//! total_votes = labeled neighbors
//! confidence  = top_votes / total_votes
//! is_tie      = two or more labels share top_votes
//! ```
//!
//! A node adopts the top label only if there is no tie, `total_votes ≥ min_votes`
//! and `confidence ≥ min_confidence`.

use super::traits::{LabelMap, SeedPropagation};
use super::NodeLabel;
use crate::error::{Error, Result};
use crate::graph::{Graph, NodeId};
use crate::seeds::{Label, SeedRegistry};
use std::collections::BTreeMap;

/// Majority-vote propagation.
#[derive(Debug, Clone)]
pub struct MajorityVote {
    /// Maximum rounds.
    max_iter: usize,
    /// Minimum share of votes the winner needs.
    min_confidence: f64,
    /// Minimum labeled neighbors.
    min_votes: usize,
}

impl MajorityVote {
    /// Create a voter with strict-majority defaults.
    pub fn new() -> Self {
        Self {
            max_iter: 50,
            min_confidence: 0.51,
            min_votes: 1,
        }
    }

    /// Set maximum rounds.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the minimum winning share, in `[0, 1]`.
    ///
    /// 0.51 demands a strict majority; lower values accept pluralities.
    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    /// Set the minimum number of labeled neighbors.
    pub fn with_min_votes(mut self, min_votes: usize) -> Self {
        self.min_votes = min_votes;
        self
    }

    /// Run voting rounds until nothing changes or `max_iter` is reached.
    pub fn run(&self, graph: &Graph, seeds: &SeedRegistry) -> Result<VoteOutcome> {
        if self.max_iter == 0 {
            return Err(Error::invalid("max_iter", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(Error::invalid("min_confidence", "must be within [0, 1]"));
        }

        let n = graph.node_count();
        let mut labels: Vec<Option<u32>> = vec![None; n];
        for (id, label) in seeds.indexed() {
            let idx = graph.index_of(id).ok_or(Error::UnknownNode(id))?;
            labels[idx] = Some(label);
        }

        let mut diagnostics: BTreeMap<usize, Ballot> = BTreeMap::new();
        let mut iterations = 0;
        for _iter in 0..self.max_iter {
            iterations += 1;
            let mut updates = Vec::new();

            for node in (0..n).filter(|&i| labels[i].is_none()) {
                let ballot = Ballot::cast(graph, node, &labels);
                if let Some(label) = ballot.chosen {
                    if ballot.total_votes >= self.min_votes
                        && ballot.confidence >= self.min_confidence
                    {
                        updates.push((node, label));
                    }
                }
                let _ = diagnostics.insert(node, ballot);
            }

            if updates.is_empty() {
                break;
            }
            for (node, label) in updates {
                labels[node] = Some(label);
            }
        }

        let mut out = VoteOutcome {
            labels: BTreeMap::new(),
            diagnostics: BTreeMap::new(),
            iterations,
        };
        for (idx, label) in labels.into_iter().enumerate() {
            let id = graph.id_at(idx);
            let ballot = diagnostics.get(&idx);
            let final_label = match (label, ballot) {
                (Some(l), _) => NodeLabel::Label(seeds.label_at(l).to_string()),
                (None, Some(b)) if b.is_tie => NodeLabel::Ambiguous,
                (None, _) => NodeLabel::Unassigned,
            };
            let _ = out.labels.insert(id, final_label);
            if let Some(b) = ballot {
                let _ = out.diagnostics.insert(id, b.describe(seeds));
            }
        }

        tracing::debug!(
            nodes = n,
            iterations,
            labeled = out.labels.values().filter(|l| l.as_label().is_some()).count(),
            "majority vote finished"
        );
        Ok(out)
    }
}

impl Default for MajorityVote {
    fn default() -> Self {
        Self::new()
    }
}

impl SeedPropagation for MajorityVote {
    fn spread(&self, graph: &Graph, seeds: &SeedRegistry) -> Result<LabelMap> {
        Ok(self.run(graph, seeds)?.labels)
    }
}

/// Last vote cast for a node.
#[derive(Debug, Clone, PartialEq)]
pub struct VoteDiagnostic {
    /// Winning label, `None` on a tie or with no labeled neighbors.
    pub chosen: Option<Label>,
    /// Top votes over total votes; 0 with no labeled neighbors.
    pub confidence: f64,
    /// Labeled neighbors that voted.
    pub total_votes: usize,
    /// Whether two or more labels shared the top count.
    pub is_tie: bool,
}

/// Result of a [`MajorityVote`] run.
#[derive(Debug, Clone, PartialEq)]
pub struct VoteOutcome {
    labels: LabelMap,
    diagnostics: BTreeMap<NodeId, VoteDiagnostic>,
    iterations: usize,
}

impl VoteOutcome {
    /// Final labels. A node whose last vote tied is `Ambiguous`.
    pub fn labels(&self) -> &LabelMap {
        &self.labels
    }

    /// Final label of `node`.
    pub fn label(&self, node: NodeId) -> NodeLabel {
        self.labels
            .get(&node)
            .cloned()
            .unwrap_or(NodeLabel::Unassigned)
    }

    /// Last vote for each non-seed node that was polled.
    pub fn diagnostics(&self) -> &BTreeMap<NodeId, VoteDiagnostic> {
        &self.diagnostics
    }

    /// Rounds executed, including the final one that changed nothing.
    pub fn iterations(&self) -> usize {
        self.iterations
    }
}

#[derive(Debug, Clone)]
struct Ballot {
    chosen: Option<u32>,
    confidence: f64,
    total_votes: usize,
    is_tie: bool,
}

impl Ballot {
    fn cast(graph: &Graph, node: usize, labels: &[Option<u32>]) -> Self {
        let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
        for v in graph.neighbor_indices(node) {
            if let Some(l) = labels[v] {
                *counts.entry(l).or_insert(0) += 1;
            }
        }

        let total_votes: usize = counts.values().sum();
        let top = counts.values().max().copied().unwrap_or(0);
        if total_votes == 0 {
            return Self {
                chosen: None,
                confidence: 0.0,
                total_votes,
                is_tie: false,
            };
        }

        let mut leaders = counts.iter().filter(|(_, &c)| c == top).map(|(&l, _)| l);
        let first = leaders.next();
        let is_tie = leaders.next().is_some();
        Self {
            chosen: if is_tie { None } else { first },
            confidence: top as f64 / total_votes as f64,
            total_votes,
            is_tie,
        }
    }

    fn describe(&self, seeds: &SeedRegistry) -> VoteDiagnostic {
        VoteDiagnostic {
            chosen: self.chosen.map(|l| seeds.label_at(l).to_string()),
            confidence: self.confidence,
            total_votes: self.total_votes,
            is_tie: self.is_tie,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::seeds::register_seeds;

    #[test]
    fn test_vote_fills_path() {
        let graph = Graph::from_edges([], [(1, 2), (2, 3), (3, 4)]).unwrap();
        let seeds = register_seeds(&graph, [(1, "A")]).unwrap();
        let out = MajorityVote::new().run(&graph, &seeds).unwrap();

        for id in 1..=4 {
            assert_eq!(out.label(id), NodeLabel::Label("A".into()));
        }
        // Three labeling rounds plus one that changes nothing.
        assert_eq!(out.iterations(), 4);
        assert!(!out.diagnostics().contains_key(&1));
    }

    #[test]
    fn test_tie_stays_ambiguous() {
        // 2 sits between an A seed and a B seed.
        let graph = Graph::from_edges([], [(1, 2), (2, 3)]).unwrap();
        let seeds = register_seeds(&graph, [(1, "A"), (3, "B")]).unwrap();
        let out = MajorityVote::new().run(&graph, &seeds).unwrap();

        assert_eq!(out.label(2), NodeLabel::Ambiguous);
        let diag = &out.diagnostics()[&2];
        assert!(diag.is_tie);
        assert_eq!(diag.chosen, None);
        assert_eq!(diag.total_votes, 2);
        assert!((diag.confidence - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_majority_wins() {
        // 4 has two A neighbors and one B neighbor.
        let graph = Graph::from_edges([], [(1, 4), (2, 4), (3, 4)]).unwrap();
        let seeds = register_seeds(&graph, [(1, "A"), (2, "A"), (3, "B")]).unwrap();
        let out = MajorityVote::new().run(&graph, &seeds).unwrap();
        assert_eq!(out.label(4), NodeLabel::Label("A".into()));

        // 2/3 falls short of a 0.7 threshold.
        let strict = MajorityVote::new().with_min_confidence(0.7);
        let out = strict.run(&graph, &seeds).unwrap();
        assert_eq!(out.label(4), NodeLabel::Unassigned);
        assert_eq!(out.diagnostics()[&4].chosen.as_deref(), Some("A"));
    }

    #[test]
    fn test_min_votes() {
        let graph = Graph::from_edges([], [(1, 2)]).unwrap();
        let seeds = register_seeds(&graph, [(1, "A")]).unwrap();
        let out = MajorityVote::new().with_min_votes(2).run(&graph, &seeds).unwrap();
        assert_eq!(out.label(2), NodeLabel::Unassigned);
        assert_eq!(out.iterations(), 1);
    }

    #[test]
    fn test_isolated_node_unassigned() {
        let graph = Graph::from_edges([9], [(1, 2)]).unwrap();
        let seeds = register_seeds(&graph, [(1, "A")]).unwrap();
        let out = MajorityVote::new().run(&graph, &seeds).unwrap();
        assert_eq!(out.label(9), NodeLabel::Unassigned);
        assert_eq!(out.diagnostics()[&9].total_votes, 0);
    }

    #[test]
    fn test_max_iter_caps_rounds() {
        let graph = Graph::from_edges([], (1..10).map(|i| (i, i + 1))).unwrap();
        let seeds = register_seeds(&graph, [(1, "A")]).unwrap();
        let out = MajorityVote::new().with_max_iter(2).run(&graph, &seeds).unwrap();
        assert_eq!(out.iterations(), 2);
        assert_eq!(out.label(3), NodeLabel::Label("A".into()));
        assert_eq!(out.label(4), NodeLabel::Unassigned);
    }

    #[test]
    fn test_invalid_parameters() {
        let graph = Graph::from_edges([], [(1, 2)]).unwrap();
        let seeds = register_seeds(&graph, [(1, "A")]).unwrap();
        for voter in [
            MajorityVote::new().with_max_iter(0),
            MajorityVote::new().with_min_confidence(1.5),
            MajorityVote::new().with_min_confidence(f64::NAN),
        ] {
            let err = voter.run(&graph, &seeds).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration);
        }
    }
}
