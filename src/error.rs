use crate::graph::NodeId;

/// Result alias for `seedprop`.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad class of an [`Error`], for callers that only care about who is at fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A parameter (k, metric, thresholds) is out of range.
    Configuration,
    /// The feature data or edge list is malformed.
    Data,
    /// A seed references a node that is not in the graph.
    UnknownNode,
    /// One node was given two different seed labels.
    ConflictingSeed,
}

/// Errors returned by graph construction, seed registration and propagation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Invalid parameter value.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: String,
    },

    /// Feature vector dimension mismatch.
    #[error("dimension mismatch at node {node}: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Node whose vector has the wrong length.
        node: NodeId,
        /// Expected dimension.
        expected: usize,
        /// Found dimension.
        found: usize,
    },

    /// A feature vector contains NaN or an infinity.
    #[error("non-finite feature value at node {node}")]
    NonFiniteFeature {
        /// Offending node.
        node: NodeId,
    },

    /// A caller-supplied metric returned NaN or an infinity.
    #[error("metric returned a non-finite distance between {a} and {b}")]
    NonFiniteDistance {
        /// First endpoint.
        a: NodeId,
        /// Second endpoint.
        b: NodeId,
    },

    /// An explicit edge weight is NaN or an infinity.
    #[error("non-finite weight on edge {a}-{b}")]
    NonFiniteWeight {
        /// First endpoint.
        a: NodeId,
        /// Second endpoint.
        b: NodeId,
    },

    /// The same node id was supplied twice.
    #[error("duplicate node id {0}")]
    DuplicateNode(NodeId),

    /// An edge connects a node to itself.
    #[error("self-loop on node {0}")]
    SelfLoop(NodeId),

    /// A node id is not present in the graph.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// A node was seeded with two different labels.
    #[error("conflicting seed labels for node {node}: {first:?} vs {second:?}")]
    ConflictingSeed {
        /// Seeded node.
        node: NodeId,
        /// Label registered first.
        first: String,
        /// Label that conflicts with it.
        second: String,
    },
}

impl Error {
    pub(crate) fn invalid(name: &'static str, message: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            message: message.into(),
        }
    }

    /// Taxonomy class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidParameter { .. } => ErrorKind::Configuration,
            Error::DimensionMismatch { .. }
            | Error::NonFiniteFeature { .. }
            | Error::NonFiniteDistance { .. }
            | Error::NonFiniteWeight { .. }
            | Error::DuplicateNode(_)
            | Error::SelfLoop(_) => ErrorKind::Data,
            Error::UnknownNode(_) => ErrorKind::UnknownNode,
            Error::ConflictingSeed { .. } => ErrorKind::ConflictingSeed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::invalid("k", "must be at least 1").kind(), ErrorKind::Configuration);
        assert_eq!(Error::SelfLoop(3).kind(), ErrorKind::Data);
        assert_eq!(Error::NonFiniteWeight { a: 1, b: 2 }.kind(), ErrorKind::Data);
        assert_eq!(Error::UnknownNode(99).kind(), ErrorKind::UnknownNode);
        let conflict = Error::ConflictingSeed {
            node: 1,
            first: "L1".into(),
            second: "L2".into(),
        };
        assert_eq!(conflict.kind(), ErrorKind::ConflictingSeed);
    }

    #[test]
    fn test_error_display() {
        let e = Error::DimensionMismatch {
            node: 7,
            expected: 3,
            found: 2,
        };
        assert_eq!(
            e.to_string(),
            "dimension mismatch at node 7: expected 3, found 2"
        );
        assert_eq!(
            Error::invalid("k", "must be less than the number of nodes").to_string(),
            "invalid parameter 'k': must be less than the number of nodes"
        );
    }
}
