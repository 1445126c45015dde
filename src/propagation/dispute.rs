//! Dispute resolution.
//!
//! A dispute is a node reached for the first time, in one round, by two or
//! more distinct labels. Which label it ends with must not depend on the order
//! neighbors were scanned in, so the candidates arrive as an ordered set and
//! the policy only ever looks at that order.

use crate::graph::NodeId;
use crate::seeds::{Label, SeedRegistry};
use std::collections::BTreeSet;

/// What to do with a node claimed by several labels at the same depth.
///
/// Has no `Default`; every propagator is constructed with an explicit policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisputePolicy {
    /// Take the smallest `(label, source seed)` candidate.
    LowestLabel,
    /// Leave the node without a label and report it as ambiguous.
    Ambiguous,
}

/// How a dispute ended.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DisputeOutcome {
    /// The node was assigned this label by tie-break.
    Resolved(Label),
    /// The node was left ambiguous.
    Ambiguous,
}

/// One disputed node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DisputeRecord {
    /// Disputed node.
    pub node: NodeId,
    /// Depth at which the competing labels arrived.
    pub depth: usize,
    /// Every `(label, source seed)` that arrived, ascending.
    pub candidates: Vec<(Label, NodeId)>,
    /// Resolution.
    pub outcome: DisputeOutcome,
}

impl DisputeRecord {
    /// Distinct candidate labels, ascending.
    pub fn labels(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.candidates.iter().map(|(l, _)| l.as_str()).collect();
        out.dedup();
        out
    }

    /// Label chosen by tie-break, if any.
    pub fn winner(&self) -> Option<&str> {
        match &self.outcome {
            DisputeOutcome::Resolved(l) => Some(l),
            DisputeOutcome::Ambiguous => None,
        }
    }
}

/// A `(label, source)` pair travelling through the graph.
///
/// `label` is a position in the registry's sorted label table, so the derived
/// order is `(label string, source id)` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct Candidate {
    pub(crate) label: u32,
    pub(crate) source: NodeId,
}

pub(crate) enum Resolution {
    Assigned(Candidate),
    Ambiguous,
}

/// True if the candidates carry at least two different labels.
pub(crate) fn is_contested(candidates: &BTreeSet<Candidate>) -> bool {
    match (candidates.first(), candidates.last()) {
        (Some(lo), Some(hi)) => lo.label != hi.label,
        _ => false,
    }
}

/// Settle a contested node. Always produces a record.
pub(crate) fn resolve(
    node: NodeId,
    depth: usize,
    candidates: &BTreeSet<Candidate>,
    policy: DisputePolicy,
    seeds: &SeedRegistry,
) -> (Resolution, DisputeRecord) {
    let (resolution, outcome) = match (policy, candidates.first()) {
        (DisputePolicy::LowestLabel, Some(&winner)) => (
            Resolution::Assigned(winner),
            DisputeOutcome::Resolved(seeds.label_at(winner.label).to_string()),
        ),
        _ => (Resolution::Ambiguous, DisputeOutcome::Ambiguous),
    };

    let record = DisputeRecord {
        node,
        depth,
        candidates: candidates
            .iter()
            .map(|c| (seeds.label_at(c.label).to_string(), c.source))
            .collect(),
        outcome,
    };
    (resolution, record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::seeds::register_seeds;

    fn registry() -> SeedRegistry {
        let graph = Graph::from_edges([], [(1, 2), (2, 3), (3, 4)]).unwrap();
        // Table: ["L1", "L2"]
        register_seeds(&graph, [(4, "L2"), (1, "L1"), (3, "L1")]).unwrap()
    }

    fn cands(pairs: &[(u32, NodeId)]) -> BTreeSet<Candidate> {
        pairs
            .iter()
            .map(|&(label, source)| Candidate { label, source })
            .collect()
    }

    #[test]
    fn test_contested_needs_two_labels() {
        assert!(!is_contested(&cands(&[])));
        assert!(!is_contested(&cands(&[(0, 1), (0, 3)])));
        assert!(is_contested(&cands(&[(1, 4), (0, 3)])));
    }

    #[test]
    fn test_lowest_label_wins() {
        let seeds = registry();
        let set = cands(&[(1, 4), (0, 3), (0, 1)]);
        let (resolution, record) = resolve(7, 2, &set, DisputePolicy::LowestLabel, &seeds);

        match resolution {
            Resolution::Assigned(c) => assert_eq!(c, Candidate { label: 0, source: 1 }),
            Resolution::Ambiguous => panic!("expected a winner"),
        }
        assert_eq!(record.node, 7);
        assert_eq!(record.depth, 2);
        assert_eq!(
            record.candidates,
            vec![("L1".into(), 1), ("L1".into(), 3), ("L2".into(), 4)]
        );
        assert_eq!(record.winner(), Some("L1"));
        assert_eq!(record.labels(), vec!["L1", "L2"]);
    }

    #[test]
    fn test_ambiguous_policy_still_records() {
        let seeds = registry();
        let set = cands(&[(1, 4), (0, 1)]);
        let (resolution, record) = resolve(7, 1, &set, DisputePolicy::Ambiguous, &seeds);

        assert!(matches!(resolution, Resolution::Ambiguous));
        assert_eq!(record.outcome, DisputeOutcome::Ambiguous);
        assert_eq!(record.winner(), None);
        assert_eq!(record.candidates.len(), 2);
    }
}
