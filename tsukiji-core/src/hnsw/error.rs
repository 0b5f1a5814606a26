//! Error types produced by the HNSW index.

use thiserror::Error;

use crate::{distance::DistanceError, hnsw::DocId};

/// Errors produced by the HNSW index.
#[derive(Clone, Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum HnswError {
    /// Parameters were invalid for the current configuration.
    #[error("invalid HNSW parameter: {reason}")]
    InvalidParameters {
        /// Explanation of the rejected value.
        reason: String,
    },
    /// A vector's length differed from the index dimensionality.
    #[error("vector for document {doc} has {actual} dimension(s), index expects {expected}")]
    DimensionMismatch {
        /// Document the vector belongs to, or the query placeholder.
        doc: DocId,
        /// Dimensionality fixed by the index.
        expected: usize,
        /// Dimensionality of the rejected vector.
        actual: usize,
    },
    /// A vector was empty or contained NaN or infinite components.
    #[error("vector for document {doc} is invalid: {reason}")]
    InvalidVector {
        /// Document the vector belongs to.
        doc: DocId,
        /// What made the vector unusable.
        reason: String,
    },
    /// A completion targeted a document that is already in the graph.
    #[error("node {node} has already been inserted")]
    DuplicateNode {
        /// Document that is already present.
        node: DocId,
    },
    /// The writer needed a vector the accessor could not supply.
    #[error("no vector available for document {doc}")]
    MissingVector {
        /// Document whose vector was missing.
        doc: DocId,
    },
    /// The writer observed a graph state that violates its invariants.
    #[error("HNSW graph invariant violated: {message}")]
    GraphInvariantViolation {
        /// Description of the inconsistency.
        message: String,
    },
    /// A lock guarding index state was poisoned by a panicking thread.
    #[error("{resource} lock poisoned")]
    LockPoisoned {
        /// Name of the poisoned resource.
        resource: &'static str,
    },
    /// The distance function rejected its inputs.
    #[error("distance computation failed: {0}")]
    Distance(#[from] DistanceError),
}
