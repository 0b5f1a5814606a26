//! Concurrent Hierarchical Navigable Small World (HNSW) graph.
//!
//! Readers search and prepare insertions against lock-free snapshots while
//! one serialized writer applies completions and removals. Superseded graph
//! fragments are parked on the writer's hold list until no guard can still
//! observe them.

mod error;
mod graph;
mod index;
mod invariants;
mod level;
mod node;
mod params;
mod prepare;
mod search;
mod select;
mod types;
mod validate;

pub use self::{
    error::HnswError,
    index::HnswIndex,
    invariants::{
        HnswInvariant, HnswInvariantChecker, HnswInvariantViolation, LayerConsistencyDetail,
    },
    level::{InvLogLevelGenerator, LevelGenerator},
    params::HnswParams,
    prepare::PrepareResult,
    types::{DocId, EntryPoint, Neighbour},
};
