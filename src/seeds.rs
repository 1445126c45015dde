//! Seed registration.
//!
//! Seeds are the `(node, label)` pairs propagation starts from. Registration
//! checks them against a graph once, up front, so propagation itself never
//! has to second-guess its inputs.

use crate::error::{Error, Result};
use crate::graph::{Graph, NodeId};
use crate::propagation::{NodeLabel, Propagation};
use std::collections::{BTreeMap, BTreeSet};

/// Cluster label. Ordered by byte-wise string comparison.
pub type Label = String;

/// Validated seed assignments for one graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedRegistry {
    /// Seed node -> position in `labels`.
    seeds: BTreeMap<NodeId, u32>,
    unseeded: BTreeSet<NodeId>,
    /// Distinct labels, sorted, so position order is label order.
    labels: Vec<Label>,
}

/// Validate `pairs` against `graph` and build a [`SeedRegistry`].
///
/// Repeated identical pairs collapse silently.
///
/// # Errors
///
/// - [`Error::UnknownNode`] if a pair names a node not in `graph`, checked
///   across all pairs before any conflict is reported
/// - [`Error::ConflictingSeed`] if a node is given two different labels
pub fn register_seeds<I, L>(graph: &Graph, pairs: I) -> Result<SeedRegistry>
where
    I: IntoIterator<Item = (NodeId, L)>,
    L: Into<Label>,
{
    let pairs: Vec<(NodeId, Label)> = pairs
        .into_iter()
        .map(|(node, label)| (node, label.into()))
        .collect();
    if let Some(&(node, _)) = pairs.iter().find(|(node, _)| !graph.contains(*node)) {
        return Err(Error::UnknownNode(node));
    }

    let mut seeds: BTreeMap<NodeId, Label> = BTreeMap::new();
    for (node, label) in pairs {
        match seeds.get(&node) {
            Some(first) if *first != label => {
                return Err(Error::ConflictingSeed {
                    node,
                    first: first.clone(),
                    second: label,
                });
            }
            Some(_) => {}
            None => {
                let _ = seeds.insert(node, label);
            }
        }
    }

    let unseeded = graph
        .node_ids()
        .filter(|id| !seeds.contains_key(id))
        .collect();
    let table: BTreeSet<&Label> = seeds.values().collect();
    let labels: Vec<Label> = table.into_iter().cloned().collect();
    let seeds = seeds
        .iter()
        .map(|(&id, label)| {
            let pos = labels.partition_point(|l| l < label);
            (id, pos as u32)
        })
        .collect();

    let registry = SeedRegistry {
        seeds,
        unseeded,
        labels,
    };
    tracing::debug!(
        seeds = registry.len(),
        labels = registry.labels.len(),
        "registered seeds"
    );
    Ok(registry)
}

impl SeedRegistry {
    /// Seed set made of every node that ended with a definite label.
    ///
    /// Ambiguous and unassigned nodes are left out.
    pub fn from_propagation(graph: &Graph, result: &Propagation) -> Result<Self> {
        register_seeds(
            graph,
            result.labels().into_iter().filter_map(|(id, l)| match l {
                NodeLabel::Label(label) => Some((id, label)),
                NodeLabel::Ambiguous | NodeLabel::Unassigned => None,
            }),
        )
    }

    /// Label seeded at `node`.
    pub fn get(&self, node: NodeId) -> Option<&str> {
        self.seeds.get(&node).map(|&i| self.label_at(i))
    }

    /// Whether `node` is a seed.
    pub fn is_seed(&self, node: NodeId) -> bool {
        self.seeds.contains_key(&node)
    }

    /// Number of distinct seed nodes.
    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    /// True if no seeds were registered.
    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }

    /// Seeds in ascending node order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &str)> + '_ {
        self.seeds.iter().map(|(&id, &i)| (id, self.label_at(i)))
    }

    /// Graph nodes that are not seeds.
    pub fn unseeded(&self) -> &BTreeSet<NodeId> {
        &self.unseeded
    }

    /// Distinct seed labels, sorted.
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Seeds as `(node, label position)`, ascending by node.
    pub(crate) fn indexed(&self) -> impl Iterator<Item = (NodeId, u32)> + '_ {
        self.seeds.iter().map(|(&id, &i)| (id, i))
    }

    pub(crate) fn label_at(&self, index: u32) -> &str {
        &self.labels[index as usize]
    }
}
