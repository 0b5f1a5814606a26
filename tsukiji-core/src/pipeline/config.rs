//! Sizing of the prepare pool and the mutation queue.

use std::num::NonZeroUsize;

use super::PipelineError;

const DEFAULT_PREPARE_THREADS: usize = 10;
const DEFAULT_PREPARE_QUEUE_DEPTH: usize = 50;
const DEFAULT_WRITE_QUEUE_DEPTH: usize = 15;

/// Pipeline sizing.
///
/// `prepare_queue_depth` bounds prepare tasks queued or running;
/// `write_queue_depth` bounds completions waiting for the writer.
///
/// # Examples
/// ```
/// use tsukiji_core::PipelineConfig;
///
/// let config = PipelineConfig::default().with_prepare_threads(4)?;
/// assert_eq!(config.prepare_threads(), 4);
/// assert_eq!(config.write_queue_depth(), 15);
/// assert!(PipelineConfig::default().with_write_queue_depth(0).is_err());
/// # Ok::<(), tsukiji_core::PipelineError>(())
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PipelineConfig {
    prepare_threads: NonZeroUsize,
    prepare_queue_depth: NonZeroUsize,
    write_queue_depth: NonZeroUsize,
}

impl PipelineConfig {
    /// Builds a configuration from explicit sizes.
    ///
    /// # Errors
    /// Returns [`PipelineError::InvalidConfig`] when any size is zero.
    pub fn new(
        prepare_threads: usize,
        prepare_queue_depth: usize,
        write_queue_depth: usize,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            prepare_threads: non_zero("prepare_threads", prepare_threads)?,
            prepare_queue_depth: non_zero("prepare_queue_depth", prepare_queue_depth)?,
            write_queue_depth: non_zero("write_queue_depth", write_queue_depth)?,
        })
    }

    /// Sets the number of prepare threads.
    ///
    /// # Errors
    /// Returns [`PipelineError::InvalidConfig`] for zero.
    pub fn with_prepare_threads(mut self, threads: usize) -> Result<Self, PipelineError> {
        self.prepare_threads = non_zero("prepare_threads", threads)?;
        Ok(self)
    }

    /// Sets how many prepare tasks may be queued or running at once.
    ///
    /// # Errors
    /// Returns [`PipelineError::InvalidConfig`] for zero.
    pub fn with_prepare_queue_depth(mut self, depth: usize) -> Result<Self, PipelineError> {
        self.prepare_queue_depth = non_zero("prepare_queue_depth", depth)?;
        Ok(self)
    }

    /// Sets how many completions may wait for the writer.
    ///
    /// # Errors
    /// Returns [`PipelineError::InvalidConfig`] for zero.
    pub fn with_write_queue_depth(mut self, depth: usize) -> Result<Self, PipelineError> {
        self.write_queue_depth = non_zero("write_queue_depth", depth)?;
        Ok(self)
    }

    /// Number of prepare threads.
    #[must_use]
    pub const fn prepare_threads(&self) -> usize {
        self.prepare_threads.get()
    }

    /// Prepare tasks allowed in flight.
    #[must_use]
    pub const fn prepare_queue_depth(&self) -> usize {
        self.prepare_queue_depth.get()
    }

    /// Mutation queue capacity.
    #[must_use]
    pub const fn write_queue_depth(&self) -> usize {
        self.write_queue_depth.get()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            prepare_threads: NonZeroUsize::new(DEFAULT_PREPARE_THREADS).unwrap_or(NonZeroUsize::MIN),
            prepare_queue_depth: NonZeroUsize::new(DEFAULT_PREPARE_QUEUE_DEPTH)
                .unwrap_or(NonZeroUsize::MIN),
            write_queue_depth: NonZeroUsize::new(DEFAULT_WRITE_QUEUE_DEPTH)
                .unwrap_or(NonZeroUsize::MIN),
        }
    }
}

fn non_zero(name: &str, value: usize) -> Result<NonZeroUsize, PipelineError> {
    NonZeroUsize::new(value).ok_or_else(|| PipelineError::InvalidConfig {
        reason: format!("{name} must be greater than zero"),
    })
}
