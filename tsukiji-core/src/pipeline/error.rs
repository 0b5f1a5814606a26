//! Error type produced by the mutation pipeline.

use thiserror::Error;

use crate::hnsw::{DocId, HnswError};

/// Errors produced while submitting work to the pipeline.
#[derive(Clone, Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum PipelineError {
    /// A bounded queue had no free slot for a non-blocking submission.
    #[error("{queue} queue is full")]
    QueueFull {
        /// Name of the saturated queue.
        queue: &'static str,
    },
    /// Another add, update, or remove for the same document is in flight.
    #[error("document {doc} already has an operation in flight")]
    DocumentBusy {
        /// Document that is busy.
        doc: DocId,
    },
    /// An earlier writer failure stopped the pipeline.
    #[error("pipeline halted after a writer failure: {source}")]
    Halted {
        /// Failure that halted the writer.
        source: HnswError,
    },
    /// The executor has shut down and no longer accepts work.
    #[error("{queue} executor has shut down")]
    Shutdown {
        /// Name of the executor.
        queue: &'static str,
    },
    /// Configuration values were rejected.
    #[error("invalid pipeline configuration: {reason}")]
    InvalidConfig {
        /// Explanation of the rejected value.
        reason: String,
    },
    /// A worker thread could not be started.
    #[error("failed to start pipeline workers: {message}")]
    ThreadPool {
        /// Error reported by the pool builder.
        message: String,
    },
    /// An index operation failed synchronously during submission.
    #[error(transparent)]
    Index(#[from] HnswError),
}
