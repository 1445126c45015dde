//! # seedprop
//!
//! Deterministic multi-source label propagation over k-nearest-neighbor graphs.
//!
//! ```text
//! feature vectors → build_graph → Graph ─┬→ propagate(seeds) → labels + disputes
//!                                        └→ audit_connectivity → components
//! ```
//!
//! A few labeled seeds (e.g. annotated cells) spread their labels outward one
//! BFS layer at a time; every node ends with the label of its nearest seed.
//! Nodes equally near to seeds with different labels are *disputes*, settled
//! by an explicit [`DisputePolicy`] and always recorded.
//!
//! Results never depend on input order, neighbor order, or thread count.
//!
//! ## Features
//!
//! - `parallel`: kNN selection and per-round frontier scans run on rayon.

/// Connectivity audit and result verification.
pub mod audit;
/// Error types used across `seedprop`.
pub mod error;
pub mod graph;
pub mod propagation;
/// Seed registration.
pub mod seeds;


pub use audit::{
    audit_connectivity, unreachable_nodes, verify_propagation, AuditIssue, AuditReport,
    Components, Severity, UnionFind,
};
pub use error::{Error, ErrorKind, Result};
pub use graph::{
    build_graph, build_graph_from_matrix, build_graph_with_config, Graph, KnnGraphConfig, Metric,
    NodeId, Symmetry, WeightFunction,
};
pub use propagation::{
    propagate, DisputeOutcome, DisputePolicy, DisputeRecord, LabelMap, LabelState, LevelSync,
    MajorityVote, NodeLabel, Propagation, SeedPropagation, VoteDiagnostic, VoteOutcome,
};
pub use seeds::{register_seeds, Label, SeedRegistry};
