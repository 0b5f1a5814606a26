//! Bounded `rayon` pool running the read-only prepare phase.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use super::{PipelineConfig, PipelineError};

/// Counts prepare tasks that are queued or running.
#[derive(Debug)]
struct TaskSlots {
    capacity: usize,
    in_use: Mutex<usize>,
    changed: Condvar,
}

impl TaskSlots {
    fn lock(&self) -> MutexGuard<'_, usize> {
        // The counter stays consistent even if a holder panicked.
        self.in_use.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn acquire(self: &Arc<Self>) -> Permit {
        let mut in_use = self.lock();
        if *in_use >= self.capacity {
            debug!(capacity = self.capacity, "prepare queue full, waiting for a slot");
            while *in_use >= self.capacity {
                in_use = self
                    .changed
                    .wait(in_use)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        }
        *in_use += 1;
        Permit {
            slots: Arc::clone(self),
        }
    }

    fn try_acquire(self: &Arc<Self>) -> Option<Permit> {
        let mut in_use = self.lock();
        if *in_use >= self.capacity {
            return None;
        }
        *in_use += 1;
        Some(Permit {
            slots: Arc::clone(self),
        })
    }

    fn wait_idle(&self) {
        let mut in_use = self.lock();
        while *in_use > 0 {
            in_use = self
                .changed
                .wait(in_use)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn in_use(&self) -> usize {
        *self.lock()
    }
}

/// Releases one slot when the task holding it finishes or unwinds.
#[derive(Debug)]
struct Permit {
    slots: Arc<TaskSlots>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        let mut in_use = self.slots.lock();
        *in_use = in_use.saturating_sub(1);
        drop(in_use);
        self.slots.changed.notify_all();
    }
}

/// Thread pool for prepare tasks with a cap on queued plus running work.
///
/// [`execute`](Self::execute) blocks while the cap is reached;
/// [`try_execute`](Self::try_execute) reports [`PipelineError::QueueFull`]
/// instead.
#[derive(Debug)]
pub struct PrepareWorkers {
    pool: ThreadPool,
    slots: Arc<TaskSlots>,
}

impl PrepareWorkers {
    /// Starts `config.prepare_threads()` worker threads.
    ///
    /// # Errors
    /// Returns [`PipelineError::ThreadPool`] when the pool cannot be built.
    pub fn new(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.prepare_threads())
            .thread_name(|index| format!("tsukiji-prepare-{index}"))
            .build()
            .map_err(|err| PipelineError::ThreadPool {
                message: err.to_string(),
            })?;
        Ok(Self {
            pool,
            slots: Arc::new(TaskSlots {
                capacity: config.prepare_queue_depth(),
                in_use: Mutex::new(0),
                changed: Condvar::new(),
            }),
        })
    }

    /// Queues `task`, waiting for a free slot first.
    pub fn execute<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let permit = self.slots.acquire();
        self.spawn(permit, task);
    }

    /// Queues `task` if a slot is free.
    ///
    /// # Errors
    /// Returns [`PipelineError::QueueFull`] when every slot is taken.
    pub fn try_execute<F>(&self, task: F) -> Result<(), PipelineError>
    where
        F: FnOnce() + Send + 'static,
    {
        let permit = self
            .slots
            .try_acquire()
            .ok_or(PipelineError::QueueFull { queue: "prepare" })?;
        self.spawn(permit, task);
        Ok(())
    }

    /// Blocks until every queued task has finished.
    pub fn sync(&self) {
        self.slots.wait_idle();
    }

    /// Tasks queued or running.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.slots.in_use()
    }

    fn spawn<F>(&self, permit: Permit, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.spawn(move || {
            let _permit = permit;
            task();
        });
    }
}
