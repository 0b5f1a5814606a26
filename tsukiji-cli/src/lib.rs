//! Support library for the tsukiji CLI binary.
//!
//! Exposes the command and logging modules so doctests and integration tests
//! can drive the stress command without forking a subprocess.

pub mod cli;
pub mod logging;
