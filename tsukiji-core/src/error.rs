//! Stable machine-readable codes for the public error types.
//!
//! Each error enum keeps its own module; this file pairs every variant with a
//! code string that log pipelines and callers can match on without parsing
//! `Display` output.

use std::fmt;

use crate::{distance::DistanceError, hnsw::HnswError, pipeline::PipelineError};

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $pattern:pat => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this error code.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            #[must_use]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $($pattern => $CodeTy::$CodeVariant,)+
                }
            }
        }
    };
}

define_error_codes! {
    /// Stable codes describing [`DistanceError`] variants.
    enum DistanceErrorCode for DistanceError {
        /// An input vector was empty.
        ZeroLength => Self::ZeroLength => "DISTANCE_ZERO_LENGTH",
        /// Input vectors had different lengths.
        DimensionMismatch => Self::DimensionMismatch { .. } => "DISTANCE_DIMENSION_MISMATCH",
        /// An input vector contained NaN or an infinity.
        NonFinite => Self::NonFinite { .. } => "DISTANCE_NON_FINITE",
        /// Cosine distance was requested for a zero vector.
        ZeroMagnitude => Self::ZeroMagnitude { .. } => "DISTANCE_ZERO_MAGNITUDE",
    }
}

define_error_codes! {
    /// Stable codes describing [`HnswError`] variants.
    enum HnswErrorCode for HnswError {
        /// Construction parameters were rejected.
        InvalidParameters => Self::InvalidParameters { .. } => "HNSW_INVALID_PARAMETERS",
        /// A vector did not match the index dimensionality.
        DimensionMismatch => Self::DimensionMismatch { .. } => "HNSW_DIMENSION_MISMATCH",
        /// A vector was empty or contained non-finite values.
        InvalidVector => Self::InvalidVector { .. } => "HNSW_INVALID_VECTOR",
        /// A completion targeted a document that is already present.
        DuplicateNode => Self::DuplicateNode { .. } => "HNSW_DUPLICATE_NODE",
        /// The vector accessor had no vector for a document the writer needed.
        MissingVector => Self::MissingVector { .. } => "HNSW_MISSING_VECTOR",
        /// The writer detected an inconsistent graph.
        GraphInvariantViolation => Self::GraphInvariantViolation { .. } => "HNSW_GRAPH_INVARIANT_VIOLATION",
        /// A lock guarding index state was poisoned by a panic.
        LockPoisoned => Self::LockPoisoned { .. } => "HNSW_LOCK_POISONED",
        /// The distance function rejected its inputs.
        Distance => Self::Distance(_) => "HNSW_DISTANCE_FAILURE",
    }
}

define_error_codes! {
    /// Stable codes describing [`PipelineError`] variants.
    enum PipelineErrorCode for PipelineError {
        /// A bounded queue had no free slot.
        QueueFull => Self::QueueFull { .. } => "PIPELINE_QUEUE_FULL",
        /// Another operation for the same document is still in flight.
        DocumentBusy => Self::DocumentBusy { .. } => "PIPELINE_DOCUMENT_BUSY",
        /// A previous writer failure stopped the pipeline.
        Halted => Self::Halted { .. } => "PIPELINE_HALTED",
        /// The executor no longer accepts work.
        Shutdown => Self::Shutdown { .. } => "PIPELINE_SHUTDOWN",
        /// Pipeline configuration was rejected.
        InvalidConfig => Self::InvalidConfig { .. } => "PIPELINE_INVALID_CONFIG",
        /// Pipeline worker threads could not be started.
        ThreadPool => Self::ThreadPool { .. } => "PIPELINE_THREAD_POOL",
        /// An index operation failed synchronously during submission.
        Index => Self::Index(_) => "PIPELINE_INDEX_FAILURE",
    }
}

impl PipelineError {
    /// Retrieve the inner [`HnswErrorCode`] when the failure originated in the index.
    #[must_use]
    pub const fn index_code(&self) -> Option<HnswErrorCode> {
        match self {
            Self::Index(error) | Self::Halted { source: error } => Some(error.code()),
            _ => None,
        }
    }
}
