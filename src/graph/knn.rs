//! kNN graph construction from feature vectors.
//!
//! Given one feature vector per node, connect each node to its k nearest
//! others:
//!
//! ```text
//! E = {(v_i, v_j) : v_j ∈ kNN(v_i)}            (Symmetry::Union)
//! E = {(v_i, v_j) : v_j ∈ kNN(v_i) ∧ v_i ∈ kNN(v_j)}   (Symmetry::Mutual)
//! ```
//!
//! Neighbors are selected by exact brute-force search, O(n²·d). Approximate
//! indexes are not used: the neighbor sets must be reproducible bit for bit,
//! with equal distances broken by ascending node id.
//!
//! # Example
//!
//! ```rust
//! use seedprop::{build_graph, Metric, Symmetry};
//!
//! let vectors = vec![
//!     (1, vec![0.0, 0.0]),
//!     (2, vec![0.1, 0.0]),
//!     (3, vec![10.0, 10.0]),
//!     (4, vec![10.1, 10.0]),
//! ];
//! let graph = build_graph(&vectors, 1, Metric::Euclidean, Symmetry::Union).unwrap();
//! assert!(graph.contains_edge(1, 2));
//! assert!(!graph.contains_edge(2, 3));
//! ```

use super::{Graph, NodeId};
use crate::error::{Error, Result};
use ndarray::{Array2, ArrayView1, ArrayView2};
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Signature of a caller-supplied distance function.
pub type MetricFn = dyn Fn(ArrayView1<'_, f32>, ArrayView1<'_, f32>) -> f32 + Send + Sync;

/// Distance between two feature vectors. Smaller is closer.
#[derive(Clone, Default)]
pub enum Metric {
    /// L2 distance.
    #[default]
    Euclidean,
    /// `1 - cos θ`, in `[0, 2]`. A zero vector is at distance 1 from everything.
    Cosine,
    /// Caller-supplied function. Must return finite values.
    Custom(Arc<MetricFn>),
}

impl Metric {
    /// Wrap a closure as a metric.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(ArrayView1<'_, f32>, ArrayView1<'_, f32>) -> f32 + Send + Sync + 'static,
    {
        Metric::Custom(Arc::new(f))
    }

    /// Distance between `a` and `b`.
    ///
    /// The built-in metrics accumulate in `f64` and saturate at `f32::MAX`, so
    /// finite inputs always give a finite distance. Both compare `a` and `b`
    /// component by component over their common length; callers going
    /// through [`build_graph`] never see vectors of different lengths.
    pub fn distance(&self, a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>) -> f32 {
        let pairs = || a.iter().zip(b.iter()).map(|(&x, &y)| (f64::from(x), f64::from(y)));
        let wide = match self {
            Metric::Euclidean => pairs().map(|(x, y)| (x - y).powi(2)).sum::<f64>().sqrt(),
            Metric::Cosine => {
                let (dot, aa, bb) = pairs().fold((0.0, 0.0, 0.0), |(d, aa, bb), (x, y)| {
                    (d + x * y, aa + x * x, bb + y * y)
                });
                let norm = aa.sqrt() * bb.sqrt();
                if norm == 0.0 {
                    return 1.0;
                }
                (1.0 - dot / norm).clamp(0.0, 2.0)
            }
            Metric::Custom(f) => return (**f)(a, b),
        };
        wide.min(f64::from(f32::MAX)) as f32
    }
}

impl fmt::Debug for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Euclidean => write!(f, "Euclidean"),
            Metric::Cosine => write!(f, "Cosine"),
            Metric::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Which directed kNN relations become undirected edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Symmetry {
    /// Edge if either endpoint is among the other's k nearest.
    #[default]
    Union,
    /// Edge only if each endpoint is among the other's k nearest.
    Mutual,
}

/// How to compute edge weights from distances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeightFunction {
    /// w = distance
    #[default]
    Distance,
    /// w = 1 / (1 + distance)
    InverseDistance,
    /// w = 1.0 (unweighted)
    Uniform,
}

impl WeightFunction {
    fn apply(self, distance: f32) -> f32 {
        match self {
            WeightFunction::Distance => distance,
            WeightFunction::InverseDistance => 1.0 / (1.0 + distance),
            WeightFunction::Uniform => 1.0,
        }
    }
}

/// Configuration for kNN graph construction.
#[derive(Debug, Clone)]
pub struct KnnGraphConfig {
    /// Number of neighbors per node (default: 10)
    pub k: usize,
    /// Distance metric (default: Euclidean)
    pub metric: Metric,
    /// Edge symmetry policy (default: union)
    pub symmetry: Symmetry,
    /// Edge weight function (default: raw distance)
    pub weight_fn: WeightFunction,
}

impl Default for KnnGraphConfig {
    fn default() -> Self {
        Self {
            k: 10,
            metric: Metric::Euclidean,
            symmetry: Symmetry::Union,
            weight_fn: WeightFunction::Distance,
        }
    }
}

impl KnnGraphConfig {
    /// Config with `k` neighbors and defaults otherwise.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            ..Default::default()
        }
    }

    /// Set the metric.
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// Set the symmetry policy.
    pub fn with_symmetry(mut self, symmetry: Symmetry) -> Self {
        self.symmetry = symmetry;
        self
    }

    /// Set the edge weight function.
    pub fn with_weight_fn(mut self, weight_fn: WeightFunction) -> Self {
        self.weight_fn = weight_fn;
        self
    }
}

/// Build a kNN graph from `(node id, feature vector)` pairs.
///
/// # Errors
///
/// - [`Error::InvalidParameter`] if `k < 1`, `k ≥ n`, or vectors are zero-dimensional
/// - [`Error::DimensionMismatch`] if vectors differ in length
/// - [`Error::NonFiniteFeature`], [`Error::DuplicateNode`]
/// - [`Error::NonFiniteDistance`] if a [`Metric::Custom`] returns NaN or infinity
pub fn build_graph(
    vectors: &[(NodeId, Vec<f32>)],
    k: usize,
    metric: Metric,
    symmetry: Symmetry,
) -> Result<Graph> {
    build_graph_with_config(
        vectors,
        &KnnGraphConfig {
            k,
            metric,
            symmetry,
            ..Default::default()
        },
    )
}

/// Build a kNN graph with full configuration options.
pub fn build_graph_with_config(
    vectors: &[(NodeId, Vec<f32>)],
    config: &KnnGraphConfig,
) -> Result<Graph> {
    let n = vectors.len();
    let dim = vectors.first().map_or(0, |(_, v)| v.len());

    let mut ids = Vec::with_capacity(n);
    let mut flat = Vec::with_capacity(n * dim);
    for (id, v) in vectors {
        if v.len() != dim {
            return Err(Error::DimensionMismatch {
                node: *id,
                expected: dim,
                found: v.len(),
            });
        }
        ids.push(*id);
        flat.extend_from_slice(v);
    }

    let data = Array2::from_shape_vec((n, dim), flat)
        .map_err(|e| Error::invalid("vectors", e.to_string()))?;
    knn_graph(&ids, data.view(), config)
}

/// Build a kNN graph from a feature matrix with one row per node.
///
/// `ids[i]` names row `i`.
pub fn build_graph_from_matrix(
    ids: &[NodeId],
    data: ArrayView2<'_, f32>,
    config: &KnnGraphConfig,
) -> Result<Graph> {
    if ids.len() != data.nrows() {
        return Err(Error::invalid(
            "ids",
            format!("{} ids for {} matrix rows", ids.len(), data.nrows()),
        ));
    }
    knn_graph(ids, data, config)
}

fn knn_graph(ids: &[NodeId], data: ArrayView2<'_, f32>, config: &KnnGraphConfig) -> Result<Graph> {
    let n = ids.len();
    let k = config.k;
    if k < 1 {
        return Err(Error::invalid("k", "must be at least 1"));
    }
    if k >= n {
        return Err(Error::invalid(
            "k",
            format!("must be less than the number of nodes ({n})"),
        ));
    }
    if data.ncols() == 0 {
        return Err(Error::invalid(
            "metric",
            "feature vectors have zero dimensions",
        ));
    }
    for (row, &id) in data.rows().into_iter().zip(ids) {
        if row.iter().any(|x| !x.is_finite()) {
            return Err(Error::NonFiniteFeature { node: id });
        }
    }

    // Position p holds the p-th smallest id, so position order is id order.
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by_key(|&i| ids[i]);
    if let Some(w) = order.windows(2).find(|w| ids[w[0]] == ids[w[1]]) {
        return Err(Error::DuplicateNode(ids[w[0]]));
    }
    let sorted_ids: Vec<NodeId> = order.iter().map(|&i| ids[i]).collect();

    let nearest = |p: usize| -> Result<Vec<(usize, f32)>> {
        let here = data.row(order[p]);
        let mut cands = Vec::with_capacity(n - 1);
        for q in (0..n).filter(|&q| q != p) {
            // `+ 0.0` folds -0.0 into +0.0 so total_cmp treats them as equal.
            let dist = config.metric.distance(here, data.row(order[q])) + 0.0;
            // Built-in metrics are finite on finite input; only a custom one can fail here.
            if !dist.is_finite() {
                return Err(Error::NonFiniteDistance {
                    a: sorted_ids[p],
                    b: sorted_ids[q],
                });
            }
            cands.push((q, dist));
        }
        cands.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        cands.truncate(k);
        Ok(cands)
    };

    #[cfg(feature = "parallel")]
    let knn: Vec<Vec<(usize, f32)>> = (0..n)
        .into_par_iter()
        .map(nearest)
        .collect::<Vec<_>>()
        .into_iter()
        .collect::<Result<_>>()?;

    #[cfg(not(feature = "parallel"))]
    let knn: Vec<Vec<(usize, f32)>> = (0..n).map(nearest).collect::<Result<_>>()?;

    let mut graph = Graph::with_nodes(sorted_ids.iter().copied());
    for (p, neighbors) in knn.iter().enumerate() {
        for &(q, dist) in neighbors {
            let keep = match config.symmetry {
                Symmetry::Union => true,
                Symmetry::Mutual => knn[q].iter().any(|&(back, _)| back == p),
            };
            if keep {
                graph.insert_edge(sorted_ids[p], sorted_ids[q], config.weight_fn.apply(dist));
            }
        }
    }

    tracing::debug!(
        nodes = n,
        edges = graph.edge_count(),
        k,
        symmetry = ?config.symmetry,
        metric = ?config.metric,
        "built kNN graph"
    );
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use ndarray::array;

    fn two_clusters() -> Vec<(NodeId, Vec<f32>)> {
        vec![
            // Cluster 1
            (1, vec![1.0, 0.0, 0.0]),
            (2, vec![0.9, 0.1, 0.0]),
            (3, vec![0.95, 0.05, 0.0]),
            // Cluster 2
            (4, vec![0.0, 1.0, 0.0]),
            (5, vec![0.1, 0.9, 0.0]),
            (6, vec![0.05, 0.95, 0.0]),
        ]
    }

    #[test]
    fn test_knn_graph_basic() {
        let graph = build_graph(&two_clusters(), 2, Metric::Euclidean, Symmetry::Union).unwrap();

        assert_eq!(graph.node_count(), 6);
        // Each triangle is complete, nothing crosses between clusters.
        assert_eq!(graph.edge_count(), 6);
        for (a, b, _) in graph.edges() {
            assert_eq!(a <= 3, b <= 3, "edge {a}-{b} crosses clusters");
        }
    }

    #[test]
    fn test_scattered_points_without_structure() {
        // Five unrelated points still give every node k outgoing choices.
        let vectors = vec![
            (1, vec![0.0, 0.0]),
            (2, vec![5.0, 1.0]),
            (3, vec![-3.0, 7.0]),
            (4, vec![9.0, -2.0]),
            (5, vec![1.5, 4.5]),
        ];
        let graph = build_graph(&vectors, 2, Metric::Euclidean, Symmetry::Union).unwrap();
        assert_eq!(graph.node_count(), 5);
        for id in 1..=5 {
            assert!(graph.degree(id).unwrap() >= 2);
        }
    }

    #[test]
    fn test_ties_break_by_ascending_id() {
        // 2 and 7 are both at distance 1 from 10.
        let vectors = vec![(10, vec![0.0]), (2, vec![1.0]), (7, vec![-1.0])];

        let union = build_graph(&vectors, 1, Metric::Euclidean, Symmetry::Union).unwrap();
        let mut edges: Vec<_> = union.edges().map(|(a, b, _)| (a, b)).collect();
        edges.sort_unstable();
        assert_eq!(edges, vec![(2, 10), (7, 10)]);

        // 10 picks 2, so 7 -> 10 is one-sided.
        let mutual = build_graph(&vectors, 1, Metric::Euclidean, Symmetry::Mutual).unwrap();
        let edges: Vec<_> = mutual.edges().map(|(a, b, _)| (a, b)).collect();
        assert_eq!(edges, vec![(2, 10)]);
        assert_eq!(mutual.degree(7), Some(0));
    }

    #[test]
    fn test_mutual_is_subset_of_union() {
        let vectors: Vec<(NodeId, Vec<f32>)> = (0..12)
            .map(|i| (i as NodeId, vec![(i as f32 * 0.37).sin(), (i as f32 * 1.3).cos()]))
            .collect();
        let union = build_graph(&vectors, 3, Metric::Euclidean, Symmetry::Union).unwrap();
        let mutual = build_graph(&vectors, 3, Metric::Euclidean, Symmetry::Mutual).unwrap();

        assert!(mutual.edge_count() <= union.edge_count());
        for (a, b, _) in mutual.edges() {
            assert!(union.contains_edge(a, b));
        }
        for id in union.node_ids() {
            assert!(union.degree(id).unwrap() >= 3);
        }
    }

    #[test]
    fn test_invalid_k() {
        let vectors = two_clusters();
        let zero = build_graph(&vectors, 0, Metric::Euclidean, Symmetry::Union).unwrap_err();
        assert_eq!(zero.kind(), ErrorKind::Configuration);
        let too_big = build_graph(&vectors, 6, Metric::Euclidean, Symmetry::Union).unwrap_err();
        assert_eq!(too_big.kind(), ErrorKind::Configuration);
        let empty = build_graph(&[], 1, Metric::Euclidean, Symmetry::Union).unwrap_err();
        assert_eq!(empty.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_dimension_mismatch() {
        let vectors = vec![(1, vec![0.0, 1.0]), (2, vec![1.0]), (3, vec![0.0, 0.0])];
        let err = build_graph(&vectors, 1, Metric::Euclidean, Symmetry::Union).unwrap_err();
        assert_eq!(
            err,
            Error::DimensionMismatch {
                node: 2,
                expected: 2,
                found: 1
            }
        );
        assert_eq!(err.kind(), ErrorKind::Data);
    }

    #[test]
    fn test_zero_dimensional_vectors() {
        let vectors = vec![(1, vec![]), (2, vec![])];
        let err = build_graph(&vectors, 1, Metric::Euclidean, Symmetry::Union).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_non_finite_and_duplicate_input() {
        let nan = vec![(1, vec![0.0]), (2, vec![f32::NAN]), (3, vec![1.0])];
        assert_eq!(
            build_graph(&nan, 1, Metric::Euclidean, Symmetry::Union).unwrap_err(),
            Error::NonFiniteFeature { node: 2 }
        );

        let dup = vec![(1, vec![0.0]), (1, vec![1.0]), (3, vec![2.0])];
        assert_eq!(
            build_graph(&dup, 1, Metric::Euclidean, Symmetry::Union).unwrap_err(),
            Error::DuplicateNode(1)
        );

        let bad_metric = Metric::custom(|_, _| f32::INFINITY);
        let ok = vec![(1, vec![0.0]), (2, vec![1.0])];
        let err = build_graph(&ok, 1, bad_metric, Symmetry::Union).unwrap_err();
        assert_eq!(err, Error::NonFiniteDistance { a: 1, b: 2 });
    }

    #[test]
    fn test_large_finite_features() {
        let vectors = vec![(1, vec![1e20, 0.0]), (2, vec![-1e20, 0.0]), (3, vec![0.0, 0.0])];
        for metric in [Metric::Euclidean, Metric::Cosine] {
            let graph = build_graph(&vectors, 1, metric, Symmetry::Union).unwrap();
            assert!(graph.contains_edge(1, 3));
            assert!(graph.contains_edge(2, 3));
            assert_eq!(graph.edge_count(), 2);
        }

        let m = Metric::Euclidean;
        let hi = array![f32::MAX, f32::MAX];
        let lo = array![-f32::MAX, -f32::MAX];
        assert_eq!(m.distance(hi.view(), lo.view()), f32::MAX);
        let d = Metric::Cosine.distance(hi.view(), lo.view());
        assert!((d - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_distance_uses_common_length() {
        let a = array![3.0f32, 4.0, 100.0];
        let b = array![0.0f32, 0.0];
        assert_eq!(Metric::Euclidean.distance(a.view(), b.view()), 5.0);
        assert_eq!(Metric::Cosine.distance(a.view(), b.view()), 1.0);
    }

    #[test]
    fn test_cosine_metric() {
        let m = Metric::Cosine;
        let a = array![1.0f32, 0.0];
        let b = array![2.0f32, 0.0];
        let c = array![0.0f32, 1.0];
        let zero = array![0.0f32, 0.0];
        assert!(m.distance(a.view(), b.view()).abs() < 1e-6);
        assert!((m.distance(a.view(), c.view()) - 1.0).abs() < 1e-6);
        assert_eq!(m.distance(a.view(), zero.view()), 1.0);

        // Direction matters, magnitude does not.
        let vectors = vec![
            (1, vec![1.0, 0.0]),
            (2, vec![100.0, 1.0]),
            (3, vec![0.0, 1.0]),
            (4, vec![1.0, 90.0]),
        ];
        let graph = build_graph(&vectors, 1, Metric::Cosine, Symmetry::Mutual).unwrap();
        assert!(graph.contains_edge(1, 2));
        assert!(graph.contains_edge(3, 4));
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_custom_metric() {
        let manhattan = Metric::custom(|a, b| a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum());
        let a = array![0.0f32, 0.0];
        let b = array![3.0f32, 4.0];
        assert_eq!(manhattan.distance(a.view(), b.view()), 7.0);
        assert_eq!(format!("{manhattan:?}"), "Custom(..)");
    }

    #[test]
    fn test_weight_functions() {
        let vectors = vec![(1, vec![0.0]), (2, vec![3.0]), (3, vec![10.0])];
        for (weight_fn, expected) in [
            (WeightFunction::Distance, 3.0),
            (WeightFunction::InverseDistance, 0.25),
            (WeightFunction::Uniform, 1.0),
        ] {
            let config = KnnGraphConfig::new(1).with_weight_fn(weight_fn);
            let graph = build_graph_with_config(&vectors, &config).unwrap();
            let w = graph.edge_weight(1, 2).unwrap();
            assert!((w - expected).abs() < 1e-6, "{weight_fn:?}: {w}");
        }
    }

    #[test]
    fn test_matrix_input_matches_vectors() {
        let vectors = two_clusters();
        let ids: Vec<NodeId> = vectors.iter().map(|(id, _)| *id).collect();
        let data = Array2::from_shape_vec(
            (6, 3),
            vectors.iter().flat_map(|(_, v)| v.clone()).collect(),
        )
        .unwrap();

        let config = KnnGraphConfig::new(2).with_symmetry(Symmetry::Mutual);
        let from_matrix = build_graph_from_matrix(&ids, data.view(), &config).unwrap();
        let from_vectors = build_graph_with_config(&vectors, &config).unwrap();

        let mut a: Vec<_> = from_matrix.edges().collect();
        let mut b: Vec<_> = from_vectors.edges().collect();
        a.sort_by(|x, y| (x.0, x.1).cmp(&(y.0, y.1)));
        b.sort_by(|x, y| (x.0, x.1).cmp(&(y.0, y.1)));
        assert_eq!(a, b);

        let err = build_graph_from_matrix(&ids[..3], data.view(), &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let mut vectors = two_clusters();
        let forward = build_graph(&vectors, 2, Metric::Euclidean, Symmetry::Union).unwrap();
        vectors.reverse();
        let backward = build_graph(&vectors, 2, Metric::Euclidean, Symmetry::Union).unwrap();

        let mut a: Vec<_> = forward.edges().map(|(x, y, _)| (x, y)).collect();
        let mut b: Vec<_> = backward.edges().map(|(x, y, _)| (x, y)).collect();
        a.sort_unstable();
        b.sort_unstable();
        assert_eq!(a, b);
    }
}
