//! Seed-driven label propagation.
//!
//! Given a graph and a few labeled seed nodes, label the rest of the graph so
//! that each node ends up with the label of its nearest seed.
//!
//! ## Nearest Seed Wins
//!
//! The main propagator, [`LevelSync`], runs a multi-source BFS from all seeds
//! at once. A node first reached at depth d gets the label that reached it at
//! depth d. Because depth d is fully collected before anything at depth d is
//! committed, the outcome is the same whatever order neighbors are visited in:
//!
//! ```text
//! naive BFS (one queue, commit on first touch):
//!
//!   A ─ x ─ B       x gets A or B depending on which seed was dequeued first
//!
//! level-synchronous:
//!
//!   depth 1: x receives {A, B}  ->  dispute, settled by policy
//! ```
//!
//! ## Disputes
//!
//! A node reached by two or more different labels in the same round is a
//! *dispute*. [`DisputePolicy`] decides what happens:
//!
//! - **LowestLabel**: smallest `(label, source seed)` wins; the node then
//!   propagates only the winning label.
//! - **Ambiguous**: the node keeps no label. It still propagates every label
//!   that reached it, so nodes behind it that are equally close to several
//!   seeds are reported as ambiguous too.
//!
//! Either way one [`DisputeRecord`] per disputed node is kept, so callers can
//! tell tie-broken labels from naturally unambiguous ones.
//!
//! ## Majority Vote
//!
//! [`MajorityVote`] is an alternative that assigns a node only when most of
//! its labeled neighbors agree. It does not track depth or source seeds.
//!
//! ## Usage
//!
//! ```rust
//! use seedprop::{propagate, register_seeds, DisputePolicy, Graph, NodeLabel};
//!
//! let graph = Graph::from_edges([], [(1, 2), (2, 3), (3, 4), (4, 5)]).unwrap();
//! let seeds = register_seeds(&graph, [(1, "L1"), (5, "L2")]).unwrap();
//!
//! let result = propagate(&graph, &seeds, DisputePolicy::LowestLabel).unwrap();
//! assert_eq!(result.label(2), NodeLabel::Label("L1".into()));
//! assert_eq!(result.label(3), NodeLabel::Label("L1".into())); // tie-broken
//! assert_eq!(result.disputes().len(), 1);
//! ```

mod dispute;
mod level_sync;
mod traits;
mod vote;

pub use dispute::{DisputeOutcome, DisputePolicy, DisputeRecord};
pub use level_sync::{propagate, LabelState, LevelSync, NodeLabel, Propagation};
pub use traits::{LabelMap, SeedPropagation};
pub use vote::{MajorityVote, VoteDiagnostic, VoteOutcome};
