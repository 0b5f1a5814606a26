//! Tsukiji core library.
//!
//! A concurrent HNSW approximate-nearest-neighbour index. Readers search and
//! prepare insertions without locks while a single serialized writer mutates
//! the graph; superseded graph fragments are reclaimed through generation
//! guards and hold lists.
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod distance;
mod error;
pub mod generation;
pub mod hnsw;
mod memory;
mod telemetry;
pub mod pipeline;
mod vectors;

pub use crate::{
    distance::{
        Cosine, Distance, DistanceError, DistanceFunction, Euclidean, SquaredEuclidean,
        VectorKind, cosine_distance, euclidean_distance, squared_euclidean_distance,
    },
    error::{DistanceErrorCode, HnswErrorCode, PipelineErrorCode},
    generation::{Generation, GenerationHandler, Guard},
    hnsw::{
        DocId, EntryPoint, HnswError, HnswIndex, HnswInvariant, HnswInvariantChecker,
        HnswInvariantViolation, HnswParams, InvLogLevelGenerator, LayerConsistencyDetail,
        LevelGenerator, Neighbour, PrepareResult,
    },
    memory::{MemoryUsage, format_bytes},
    pipeline::{
        MutationExecutor, Pipeline, PipelineConfig, PipelineError, PrepareWorkers,
    },
    vectors::{DocVectorAccess, VectorStore},
};
