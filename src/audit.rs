//! Connectivity audit.
//!
//! Label-independent connected components, and a checker that holds a
//! propagation result up against them:
//!
//! - Before a run, [`unreachable_nodes`] lists the nodes no seed can reach.
//! - After a run, [`verify_propagation`] re-derives what must be true of any
//!   correct result and reports every discrepancy.
//!
//! # Example
//!
//! ```rust
//! use seedprop::{audit_connectivity, propagate, register_seeds, verify_propagation};
//! use seedprop::{DisputePolicy, Graph};
//!
//! let graph = Graph::from_edges([], [(1, 2), (3, 4)]).unwrap();
//! assert_eq!(audit_connectivity(&graph).len(), 2);
//!
//! let seeds = register_seeds(&graph, [(1, "A")]).unwrap();
//! let result = propagate(&graph, &seeds, DisputePolicy::LowestLabel).unwrap();
//! let report = verify_propagation(&graph, &seeds, &result);
//! assert!(report.is_healthy(), "{}", report);
//! ```

use crate::graph::{Graph, NodeId};
use crate::propagation::{DisputeOutcome, LabelState, Propagation};
use crate::seeds::SeedRegistry;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// Disjoint-set forest with path compression and union by rank.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
    size: Vec<usize>,
    count: usize,
}

impl UnionFind {
    /// `n` singleton sets.
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
            size: vec![1; n],
            count: n,
        }
    }

    /// Representative of `x`'s set.
    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = x;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    /// Merge the sets of `x` and `y`. Returns false if already merged.
    pub fn union(&mut self, x: usize, y: usize) -> bool {
        let (rx, ry) = (self.find(x), self.find(y));
        if rx == ry {
            return false;
        }
        let (hi, lo) = if self.rank[rx] >= self.rank[ry] {
            (rx, ry)
        } else {
            (ry, rx)
        };
        self.parent[lo] = hi;
        self.size[hi] += self.size[lo];
        if self.rank[hi] == self.rank[lo] {
            self.rank[hi] += 1;
        }
        self.count -= 1;
        true
    }

    /// Whether `x` and `y` are in the same set.
    pub fn connected(&mut self, x: usize, y: usize) -> bool {
        self.find(x) == self.find(y)
    }

    /// Size of `x`'s set.
    pub fn size_of(&mut self, x: usize) -> usize {
        let root = self.find(x);
        self.size[root]
    }

    /// Number of disjoint sets.
    pub fn count(&self) -> usize {
        self.count
    }
}

/// Connected components, numbered in ascending order of their smallest node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Components {
    members: Vec<BTreeSet<NodeId>>,
    of: HashMap<NodeId, usize>,
}

impl Components {
    /// Number of components.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True for the empty graph.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Component id of `node`.
    pub fn component_of(&self, node: NodeId) -> Option<usize> {
        self.of.get(&node).copied()
    }

    /// Nodes of component `id`.
    pub fn members(&self, id: usize) -> Option<&BTreeSet<NodeId>> {
        self.members.get(id)
    }

    /// `(component id, nodes)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &BTreeSet<NodeId>)> + '_ {
        self.members.iter().enumerate()
    }
}

/// Connected components of `graph`, ignoring labels.
pub fn audit_connectivity(graph: &Graph) -> Components {
    let n = graph.node_count();
    let mut uf = UnionFind::new(n);
    for u in 0..n {
        for v in graph.neighbor_indices(u) {
            let _ = uf.union(u, v);
        }
    }

    // Index order is id order, so first-seen roots number components by smallest id.
    let mut by_root: HashMap<usize, usize> = HashMap::with_capacity(uf.count());
    let mut members: Vec<BTreeSet<NodeId>> = Vec::with_capacity(uf.count());
    let mut of = HashMap::with_capacity(n);
    for idx in 0..n {
        let root = uf.find(idx);
        let cid = *by_root.entry(root).or_insert_with(|| {
            members.push(BTreeSet::new());
            members.len() - 1
        });
        let id = graph.id_at(idx);
        let _ = members[cid].insert(id);
        let _ = of.insert(id, cid);
    }

    tracing::debug!(nodes = n, components = members.len(), "computed components");
    Components { members, of }
}

/// Nodes in components that contain no seed.
pub fn unreachable_nodes(graph: &Graph, seeds: &SeedRegistry) -> BTreeSet<NodeId> {
    audit_connectivity(graph)
        .iter()
        .filter(|(_, nodes)| !nodes.iter().any(|&id| seeds.is_seed(id)))
        .flat_map(|(_, nodes)| nodes.iter().copied())
        .collect()
}

/// How bad an [`AuditIssue`] is. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Expected situation worth knowing about, e.g. a seedless component.
    Info,
    /// Legal but suspicious, e.g. one label in several components.
    Warning,
    /// The result contradicts the propagation rules.
    Error,
    /// The result does not even describe this graph.
    Critical,
}

/// One finding, optionally pinned to a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditIssue {
    pub severity: Severity,
    pub node: Option<NodeId>,
    pub message: String,
}

impl fmt::Display for AuditIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node {
            Some(id) => write!(f, "{:?} at node {id}: {}", self.severity, self.message),
            None => write!(f, "{:?}: {}", self.severity, self.message),
        }
    }
}

/// Findings from [`verify_propagation`], in the order they were found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditReport {
    issues: Vec<AuditIssue>,
}

impl AuditReport {
    fn push(&mut self, severity: Severity, node: Option<NodeId>, message: impl Into<String>) {
        self.issues.push(AuditIssue {
            severity,
            node,
            message: message.into(),
        });
    }

    fn at(&mut self, severity: Severity, node: NodeId, message: impl Into<String>) {
        self.push(severity, Some(node), message);
    }

    /// All findings.
    pub fn issues(&self) -> &[AuditIssue] {
        &self.issues
    }

    /// Number of findings with exactly this severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    /// Most severe finding, if any.
    pub fn worst(&self) -> Option<Severity> {
        self.issues.iter().map(|i| i.severity).max()
    }

    /// True when nothing reaches [`Severity::Error`].
    pub fn is_healthy(&self) -> bool {
        self.worst().map_or(true, |s| s < Severity::Error)
    }
}

impl fmt::Display for AuditReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.is_healthy() { "healthy" } else { "UNHEALTHY" };
        writeln!(f, "{verdict}: {} issue(s)", self.issues.len())?;
        for issue in &self.issues {
            writeln!(f, "  {issue}")?;
        }
        Ok(())
    }
}

/// Check `result` against `graph` and `seeds`.
///
/// A result produced by [`propagate`](crate::propagate) for this graph and
/// seed set is always healthy; any `Error` finding means the result was
/// produced elsewhere or by a faulty propagator.
pub fn verify_propagation(
    graph: &Graph,
    seeds: &SeedRegistry,
    result: &Propagation,
) -> AuditReport {
    let mut report = AuditReport::default();

    for id in graph.node_ids() {
        if result.state(id).is_none() {
            report.at(Severity::Critical, id, "node missing from result");
        }
    }
    if !report.is_healthy() {
        return report;
    }

    check_seeds(graph, seeds, result, &mut report);
    check_layers(graph, result, &mut report);
    check_disputes(result, &mut report);
    check_components(graph, seeds, result, &mut report);

    tracing::debug!(
        issues = report.issues.len(),
        healthy = report.is_healthy(),
        "verified propagation"
    );
    report
}

fn check_seeds(graph: &Graph, seeds: &SeedRegistry, result: &Propagation, report: &mut AuditReport) {
    for id in graph.node_ids() {
        match (seeds.get(id), result.state(id)) {
            (Some(expected), Some(LabelState::Assigned { label, source, depth }))
                if label == expected && *source == id && *depth == 0 => {}
            (Some(expected), _) => {
                report.at(
                    Severity::Error,
                    id,
                    format!("seed does not hold its label {expected:?} at depth 0"),
                );
            }
            (None, Some(state)) if state.depth() == Some(0) => {
                report.at(Severity::Error, id, "non-seed at depth 0");
            }
            (None, _) => {}
        }
    }
}

/// Labels a reached node hands on to the next layer.
fn forwarded(state: &LabelState) -> BTreeSet<&str> {
    match state {
        LabelState::Unassigned => BTreeSet::new(),
        LabelState::Assigned { label, .. } => BTreeSet::from([label.as_str()]),
        LabelState::Disputed { candidates, .. } => {
            candidates.iter().map(|(l, _)| l.as_str()).collect()
        }
    }
}

fn check_layers(graph: &Graph, result: &Propagation, report: &mut AuditReport) {
    for id in graph.node_ids() {
        let Some(state) = result.state(id) else {
            continue;
        };
        let Some(depth) = state.depth() else {
            continue;
        };

        // Labels this node may inherit from its parents. `None` means any.
        let accepted: Option<BTreeSet<&str>> = match (result.dispute(id), state) {
            (Some(record), _) => {
                Some(record.candidates.iter().map(|(l, _)| l.as_str()).collect())
            }
            (None, LabelState::Assigned { label, .. }) => Some(BTreeSet::from([label.as_str()])),
            (None, _) => None,
        };

        let mut has_parent = depth == 0;
        for nb in graph.neighbors(id) {
            let Some(nb_state) = result.state(nb) else {
                continue;
            };
            let Some(nb_depth) = nb_state.depth() else {
                report.at(
                    Severity::Error,
                    id,
                    format!("reached node is adjacent to unreached node {nb}"),
                );
                continue;
            };
            if nb_depth + 1 < depth {
                report.at(
                    Severity::Error,
                    id,
                    format!("depth {depth} but neighbor {nb} is at depth {nb_depth}"),
                );
            }
            if nb_depth + 1 != depth {
                continue;
            }
            has_parent = true;

            // Every label `nb` forwards arrived here in the same round.
            let explained = accepted
                .as_ref()
                .map_or(true, |ok| forwarded(nb_state).is_subset(ok));
            if !explained {
                report.at(
                    Severity::Error,
                    id,
                    format!("label differs from neighbor {nb} without a recorded dispute"),
                );
            }
        }
        if !has_parent {
            report.at(
                Severity::Error,
                id,
                format!("no neighbor at depth {}", depth.saturating_sub(1)),
            );
        }
    }
}

fn check_disputes(result: &Propagation, report: &mut AuditReport) {
    let mut seen: BTreeSet<NodeId> = BTreeSet::new();
    for record in result.disputes() {
        if !seen.insert(record.node) {
            report.at(Severity::Error, record.node, "more than one dispute record");
        }
        if record.labels().len() < 2 {
            report.at(Severity::Error, record.node, "dispute with a single label");
        }
        let consistent = match (&record.outcome, result.state(record.node)) {
            (DisputeOutcome::Ambiguous, Some(LabelState::Disputed { depth, .. })) => {
                *depth == record.depth
            }
            (DisputeOutcome::Resolved(winner), Some(LabelState::Assigned { label, depth, .. })) => {
                winner == label && *depth == record.depth
            }
            _ => false,
        };
        if !consistent {
            report.at(
                Severity::Error,
                record.node,
                "dispute record does not match node state",
            );
        }
    }

    for (id, state) in result.iter() {
        if matches!(state, LabelState::Disputed { .. }) && !seen.contains(&id) {
            report.at(Severity::Error, id, "disputed node without a dispute record");
        }
    }
}

fn check_components(
    graph: &Graph,
    seeds: &SeedRegistry,
    result: &Propagation,
    report: &mut AuditReport,
) {
    let components = audit_connectivity(graph);
    let mut label_components: BTreeMap<&str, BTreeSet<usize>> = BTreeMap::new();

    for (cid, nodes) in components.iter() {
        let seeded = nodes.iter().any(|&id| seeds.is_seed(id));
        if !seeded {
            tracing::warn!(component = cid, size = nodes.len(), "component has no seed");
            report.push(
                Severity::Info,
                None,
                format!("component {cid} ({} nodes) has no seed", nodes.len()),
            );
        }

        for &id in nodes {
            let state = result.state(id);
            let reached = state.and_then(LabelState::depth).is_some();
            if seeded && !reached {
                report.at(Severity::Error, id, "unassigned node in a seeded component");
            }
            if !seeded && reached {
                report.at(Severity::Error, id, "labeled node in a component without seeds");
            }
            if let Some(LabelState::Assigned { label, .. }) = state {
                let _ = label_components.entry(label.as_str()).or_default().insert(cid);
            }
        }
    }

    for (label, cids) in label_components {
        if cids.len() > 1 {
            report.push(
                Severity::Warning,
                None,
                format!("label {label:?} spans {} components", cids.len()),
            );
        }
    }
}
