//! Undirected graphs over stable node identifiers.
//!
//! A [`Graph`] wraps a `petgraph` [`UnGraph`] whose node weights are the
//! caller's [`NodeId`]s. Node indices are allocated in ascending id order, so
//! index order and id order agree and every traversal that walks indices in
//! order is reproducible across runs.
//!
//! Graphs are immutable once built. Two constructors exist:
//!
//! - [`build_graph`] / [`build_graph_with_config`]: kNN graph from feature vectors
//! - [`Graph::from_edges`] / [`Graph::from_weighted_edges`]: explicit edge list
//!
//! ```rust
//! use seedprop::Graph;
//!
//! let graph = Graph::from_edges([], [(1, 2), (2, 3)]).unwrap();
//! assert_eq!(graph.node_count(), 3);
//! assert!(graph.contains_edge(2, 1));
//! ```

use crate::error::{Error, Result};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeSet, HashMap};

mod knn;

pub use knn::{
    build_graph, build_graph_from_matrix, build_graph_with_config, KnnGraphConfig, Metric,
    Symmetry, WeightFunction,
};

/// Stable node identifier.
pub type NodeId = u64;

/// Simple undirected graph: no self-loops, no parallel edges.
#[derive(Debug, Clone)]
pub struct Graph {
    inner: UnGraph<NodeId, f32>,
    index: HashMap<NodeId, NodeIndex>,
}

impl Graph {
    /// Build a graph from node ids and unweighted edges (weight `1.0`).
    ///
    /// Edge endpoints are added as nodes if they are not in `nodes`; `nodes`
    /// only needs to list isolated vertices.
    ///
    /// # Errors
    ///
    /// [`Error::SelfLoop`] if an edge connects a node to itself.
    pub fn from_edges<N, E>(nodes: N, edges: E) -> Result<Self>
    where
        N: IntoIterator<Item = NodeId>,
        E: IntoIterator<Item = (NodeId, NodeId)>,
    {
        Self::from_weighted_edges(nodes, edges.into_iter().map(|(a, b)| (a, b, 1.0)))
    }

    /// Build a graph from node ids and weighted edges.
    ///
    /// A repeated edge (in either orientation) keeps the first weight seen.
    ///
    /// # Errors
    ///
    /// - [`Error::SelfLoop`] if an edge connects a node to itself
    /// - [`Error::NonFiniteWeight`] if a weight is NaN or infinite
    pub fn from_weighted_edges<N, E>(nodes: N, edges: E) -> Result<Self>
    where
        N: IntoIterator<Item = NodeId>,
        E: IntoIterator<Item = (NodeId, NodeId, f32)>,
    {
        let edges: Vec<(NodeId, NodeId, f32)> = edges.into_iter().collect();
        let mut ids: BTreeSet<NodeId> = nodes.into_iter().collect();
        for &(a, b, w) in &edges {
            if a == b {
                return Err(Error::SelfLoop(a));
            }
            if !w.is_finite() {
                return Err(Error::NonFiniteWeight { a, b });
            }
            let _ = ids.insert(a);
            let _ = ids.insert(b);
        }

        let mut graph = Self::with_nodes(ids);
        for (a, b, w) in edges {
            graph.insert_edge(a, b, w);
        }
        Ok(graph)
    }

    /// Empty-edged graph over `ids`, which must be ascending and unique.
    pub(crate) fn with_nodes(ids: impl IntoIterator<Item = NodeId>) -> Self {
        let mut inner = UnGraph::<NodeId, f32>::default();
        let mut index = HashMap::new();
        for id in ids {
            let idx = inner.add_node(id);
            let _ = index.insert(id, idx);
        }
        Self { inner, index }
    }

    /// Add an edge between existing nodes unless it is already present.
    pub(crate) fn insert_edge(&mut self, a: NodeId, b: NodeId, weight: f32) {
        let (Some(&ia), Some(&ib)) = (self.index.get(&a), self.index.get(&b)) else {
            return;
        };
        if ia != ib && self.inner.find_edge(ia, ib).is_none() {
            let _ = self.inner.add_edge(ia, ib, weight);
        }
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Number of (undirected) edges.
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Whether `id` is a node of this graph.
    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    /// Node ids in ascending order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.inner.node_weights().copied()
    }

    /// Neighbors of `id`; empty if `id` is unknown.
    pub fn neighbors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.index
            .get(&id)
            .into_iter()
            .flat_map(move |&idx| self.inner.neighbors(idx).map(move |n| self.inner[n]))
    }

    /// Degree of `id`, or `None` if unknown.
    pub fn degree(&self, id: NodeId) -> Option<usize> {
        self.index
            .get(&id)
            .map(|&idx| self.inner.neighbors(idx).count())
    }

    /// Whether `a` and `b` are adjacent.
    pub fn contains_edge(&self, a: NodeId, b: NodeId) -> bool {
        self.edge_weight(a, b).is_some()
    }

    /// Weight of the edge between `a` and `b`.
    pub fn edge_weight(&self, a: NodeId, b: NodeId) -> Option<f32> {
        let ia = *self.index.get(&a)?;
        let ib = *self.index.get(&b)?;
        let e = self.inner.find_edge(ia, ib)?;
        self.inner.edge_weight(e).copied()
    }

    /// All edges as `(low id, high id, weight)`.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId, f32)> + '_ {
        self.inner.edge_references().map(move |e| {
            let a = self.inner[e.source()];
            let b = self.inner[e.target()];
            (a.min(b), a.max(b), *e.weight())
        })
    }

    /// Underlying `petgraph` graph (node weights are the node ids).
    pub fn as_petgraph(&self) -> &UnGraph<NodeId, f32> {
        &self.inner
    }

    pub(crate) fn index_of(&self, id: NodeId) -> Option<usize> {
        self.index.get(&id).map(|idx| idx.index())
    }

    pub(crate) fn id_at(&self, index: usize) -> NodeId {
        self.inner[NodeIndex::new(index)]
    }

    pub(crate) fn neighbor_indices(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.inner
            .neighbors(NodeIndex::new(index))
            .map(|n| n.index())
    }
}
