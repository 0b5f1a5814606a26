//! Shared test utilities used across the tsukiji crates.
//!
//! Provides a `tracing` layer that captures spans and events for assertions
//! and the environment-driven proptest profile shared by property suites.

pub mod ci;
pub mod tracing;
