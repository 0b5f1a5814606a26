//! Concurrent mutation pipeline.
//!
//! Prepare tasks run on a bounded [`PrepareWorkers`] pool; every completion
//! and removal is funnelled through one [`MutationExecutor`] so the index
//! sees a single writer.

mod config;
mod coordinator;
mod error;
mod executor;
mod prepare;

pub use self::{
    config::PipelineConfig, coordinator::Pipeline, error::PipelineError,
    executor::MutationExecutor, prepare::PrepareWorkers,
};

#[cfg(test)]
mod tests;
