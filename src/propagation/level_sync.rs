//! Level-synchronous multi-source propagation.
//!
//! Labels spread outward from every seed at once, one BFS layer per round.
//! Each round has two phases separated by a barrier:
//!
//! 1. **Collect**: every node reached in the previous round offers its
//!    candidates to each unreached neighbor.
//! 2. **Commit**: each newly reached node takes its label from the complete
//!    candidate set for this round.
//!
//! No node is committed while candidates for its round are still arriving,
//! so the result is independent of neighbor order and every node's depth is
//! its shortest-path distance to the nearest seed.

use super::dispute::{self, Candidate, DisputePolicy, DisputeRecord, Resolution};
use super::traits::{LabelMap, SeedPropagation};
use crate::error::{Error, Result};
use crate::graph::{Graph, NodeId};
use crate::seeds::{Label, SeedRegistry};
use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Label state of one node after a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LabelState {
    /// No seed can reach this node.
    Unassigned,
    /// Definite label.
    Assigned {
        /// Label.
        label: Label,
        /// Seed the label came from (smallest id among equally near seeds).
        source: NodeId,
        /// Distance to that seed in edges.
        depth: usize,
    },
    /// Reached by several labels at once and left unresolved.
    Disputed {
        /// `(label, source seed)` pairs that arrived, ascending.
        candidates: Vec<(Label, NodeId)>,
        /// Depth at which they arrived.
        depth: usize,
    },
}

impl LabelState {
    /// Depth at which the node was reached.
    pub fn depth(&self) -> Option<usize> {
        match self {
            LabelState::Unassigned => None,
            LabelState::Assigned { depth, .. } | LabelState::Disputed { depth, .. } => Some(*depth),
        }
    }
}

/// Final label of a node, as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeLabel {
    /// Definite label.
    Label(Label),
    /// Claimed by several labels, none chosen.
    Ambiguous,
    /// Not reached.
    Unassigned,
}

impl NodeLabel {
    /// The label, if definite.
    pub fn as_label(&self) -> Option<&str> {
        match self {
            NodeLabel::Label(l) => Some(l),
            NodeLabel::Ambiguous | NodeLabel::Unassigned => None,
        }
    }
}

impl From<&LabelState> for NodeLabel {
    fn from(state: &LabelState) -> Self {
        match state {
            LabelState::Unassigned => NodeLabel::Unassigned,
            LabelState::Assigned { label, .. } => NodeLabel::Label(label.clone()),
            LabelState::Disputed { .. } => NodeLabel::Ambiguous,
        }
    }
}

/// Result of one propagation run. Owns its label state; the graph is untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Propagation {
    states: BTreeMap<NodeId, LabelState>,
    disputes: Vec<DisputeRecord>,
    /// Node -> position in `disputes`.
    dispute_index: BTreeMap<NodeId, usize>,
    max_depth: usize,
    policy: DisputePolicy,
}

impl Propagation {
    /// State of `node`, or `None` if it is not in the graph.
    pub fn state(&self, node: NodeId) -> Option<&LabelState> {
        self.states.get(&node)
    }

    /// Final label of `node`. Nodes not in the graph report `Unassigned`.
    pub fn label(&self, node: NodeId) -> NodeLabel {
        self.states
            .get(&node)
            .map_or(NodeLabel::Unassigned, NodeLabel::from)
    }

    /// Final labels of all nodes.
    pub fn labels(&self) -> LabelMap {
        self.states
            .iter()
            .map(|(&id, s)| (id, NodeLabel::from(s)))
            .collect()
    }

    /// Depth at which `node` was reached.
    pub fn depth(&self, node: NodeId) -> Option<usize> {
        self.states.get(&node).and_then(LabelState::depth)
    }

    /// All node states, ascending by node.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &LabelState)> + '_ {
        self.states.iter().map(|(&id, s)| (id, s))
    }

    /// Dispute records, ordered by `(depth, node)`.
    pub fn disputes(&self) -> &[DisputeRecord] {
        &self.disputes
    }

    /// Dispute record for `node`, if it was disputed.
    pub fn dispute(&self, node: NodeId) -> Option<&DisputeRecord> {
        self.dispute_index.get(&node).map(|&i| &self.disputes[i])
    }

    /// Nodes no seed reached.
    pub fn unassigned(&self) -> BTreeSet<NodeId> {
        self.states
            .iter()
            .filter(|(_, s)| matches!(s, LabelState::Unassigned))
            .map(|(&id, _)| id)
            .collect()
    }

    /// Nodes grouped by definite label.
    pub fn clusters(&self) -> BTreeMap<Label, BTreeSet<NodeId>> {
        let mut out: BTreeMap<Label, BTreeSet<NodeId>> = BTreeMap::new();
        for (&id, state) in &self.states {
            if let LabelState::Assigned { label, .. } = state {
                let _ = out.entry(label.clone()).or_default().insert(id);
            }
        }
        out
    }

    /// Deepest layer reached (0 if only seeds, or nothing, were labeled).
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Policy the run used.
    pub fn policy(&self) -> DisputePolicy {
        self.policy
    }
}

/// Level-synchronous label propagation.
#[derive(Debug, Clone)]
pub struct LevelSync {
    policy: DisputePolicy,
}

impl LevelSync {
    /// Create a propagator with the given dispute policy.
    pub fn new(policy: DisputePolicy) -> Self {
        Self { policy }
    }

    /// Set the dispute policy.
    pub fn with_policy(mut self, policy: DisputePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Dispute policy in use.
    pub fn policy(&self) -> DisputePolicy {
        self.policy
    }

    /// Run propagation from `seeds` over `graph`.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownNode`] if `seeds` was registered against another graph
    /// and names a node this one lacks.
    pub fn propagate(&self, graph: &Graph, seeds: &SeedRegistry) -> Result<Propagation> {
        let n = graph.node_count();
        let mut reached: Vec<Option<Reached>> = vec![None; n];
        let mut frontier = Vec::with_capacity(seeds.len());

        for (id, label) in seeds.indexed() {
            let idx = graph.index_of(id).ok_or(Error::UnknownNode(id))?;
            reached[idx] = Some(Reached::Assigned {
                cand: Candidate { label, source: id },
                depth: 0,
            });
            frontier.push(idx);
        }
        frontier.sort_unstable();

        let mut disputes = Vec::new();
        let mut depth = 0;
        let mut max_depth = 0;
        while !frontier.is_empty() {
            depth += 1;
            let arrivals = collect_candidates(graph, &frontier, &reached);

            // Barrier: every candidate for this depth is in `arrivals`.
            let mut next = Vec::with_capacity(arrivals.len());
            for (idx, cands) in arrivals {
                let Some(&first) = cands.first() else {
                    continue;
                };
                let slot = if dispute::is_contested(&cands) {
                    let (resolution, record) =
                        dispute::resolve(graph.id_at(idx), depth, &cands, self.policy, seeds);
                    disputes.push(record);
                    match resolution {
                        Resolution::Assigned(cand) => Reached::Assigned { cand, depth },
                        Resolution::Ambiguous => Reached::Ambiguous {
                            cands: cands.into_iter().collect(),
                            depth,
                        },
                    }
                } else {
                    // One label; `first` carries its smallest source.
                    Reached::Assigned { cand: first, depth }
                };
                reached[idx] = Some(slot);
                next.push(idx);
            }

            tracing::trace!(depth, reached = next.len(), "propagation round");
            if !next.is_empty() {
                max_depth = depth;
            }
            frontier = next;
        }

        let states: BTreeMap<NodeId, LabelState> = reached
            .into_iter()
            .enumerate()
            .map(|(idx, slot)| (graph.id_at(idx), to_state(slot, seeds)))
            .collect();

        let dispute_index = disputes
            .iter()
            .enumerate()
            .map(|(i, d)| (d.node, i))
            .collect();
        let result = Propagation {
            states,
            disputes,
            dispute_index,
            max_depth,
            policy: self.policy,
        };
        tracing::debug!(
            nodes = n,
            seeds = seeds.len(),
            unassigned = result.unassigned().len(),
            disputes = result.disputes.len(),
            max_depth,
            policy = ?self.policy,
            "propagation finished"
        );
        Ok(result)
    }
}

impl SeedPropagation for LevelSync {
    fn spread(&self, graph: &Graph, seeds: &SeedRegistry) -> Result<LabelMap> {
        Ok(self.propagate(graph, seeds)?.labels())
    }
}

/// Propagate `seeds` over `graph`, settling disputes with `policy`.
pub fn propagate(graph: &Graph, seeds: &SeedRegistry, policy: DisputePolicy) -> Result<Propagation> {
    LevelSync::new(policy).propagate(graph, seeds)
}

#[derive(Debug, Clone)]
enum Reached {
    Assigned { cand: Candidate, depth: usize },
    Ambiguous { cands: Vec<Candidate>, depth: usize },
}

impl Reached {
    /// Candidates this node hands to its neighbors. An ambiguous node hands on
    /// all of its own: each of those labels is equally near.
    fn forward(&self) -> &[Candidate] {
        match self {
            Reached::Assigned { cand, .. } => std::slice::from_ref(cand),
            Reached::Ambiguous { cands, .. } => cands,
        }
    }
}

/// Collect phase of one round. Workers (when parallel) only read `reached`
/// and each build a private list; lists are merged into ordered sets here.
fn collect_candidates(
    graph: &Graph,
    frontier: &[usize],
    reached: &[Option<Reached>],
) -> BTreeMap<usize, BTreeSet<Candidate>> {
    let scan = |&u: &usize| -> Vec<(usize, Candidate)> {
        let Some(from) = &reached[u] else {
            return Vec::new();
        };
        let forward = from.forward();
        graph
            .neighbor_indices(u)
            .filter(|&v| reached[v].is_none())
            .flat_map(move |v| forward.iter().map(move |&c| (v, c)))
            .collect()
    };

    #[cfg(feature = "parallel")]
    let batches: Vec<Vec<(usize, Candidate)>> = frontier.par_iter().map(scan).collect();

    #[cfg(not(feature = "parallel"))]
    let batches: Vec<Vec<(usize, Candidate)>> = frontier.iter().map(scan).collect();

    let mut arrivals: BTreeMap<usize, BTreeSet<Candidate>> = BTreeMap::new();
    for (v, c) in batches.into_iter().flatten() {
        let _ = arrivals.entry(v).or_default().insert(c);
    }
    arrivals
}

fn to_state(slot: Option<Reached>, seeds: &SeedRegistry) -> LabelState {
    match slot {
        None => LabelState::Unassigned,
        Some(Reached::Assigned { cand, depth }) => LabelState::Assigned {
            label: seeds.label_at(cand.label).to_string(),
            source: cand.source,
            depth,
        },
        Some(Reached::Ambiguous { cands, depth }) => LabelState::Disputed {
            candidates: cands
                .iter()
                .map(|c| (seeds.label_at(c.label).to_string(), c.source))
                .collect(),
            depth,
        },
    }
}
