//! Propagation traits.

use super::NodeLabel;
use crate::error::Result;
use crate::graph::{Graph, NodeId};
use crate::seeds::SeedRegistry;
use std::collections::BTreeMap;

/// Final label per node, ascending by node id.
pub type LabelMap = BTreeMap<NodeId, NodeLabel>;

/// Trait for algorithms that spread seed labels over a graph.
pub trait SeedPropagation {
    /// Label every node of `graph` starting from `seeds`.
    ///
    /// Returns one entry per node; unreached nodes are `Unassigned`.
    fn spread(&self, graph: &Graph, seeds: &SeedRegistry) -> Result<LabelMap>;
}
