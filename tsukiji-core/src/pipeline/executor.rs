//! Single-threaded executor that serializes every graph mutation.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{Sender, TrySendError, bounded};
use tracing::{debug, warn};

use super::PipelineError;

const QUEUE: &str = "mutation";

type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Job),
    Barrier(Sender<()>),
}

/// Runs submitted jobs one at a time, in submission order, on a dedicated
/// thread fed by a bounded channel.
///
/// Jobs must not call [`sync`](Self::sync) on the executor running them.
#[derive(Debug)]
pub struct MutationExecutor {
    sender: Option<Sender<Message>>,
    worker: Option<JoinHandle<()>>,
}

impl MutationExecutor {
    /// Starts the executor thread with room for `depth` queued jobs.
    ///
    /// # Errors
    /// Returns [`PipelineError::InvalidConfig`] for a zero depth and
    /// [`PipelineError::ThreadPool`] when the thread cannot be spawned.
    pub fn new(depth: usize) -> Result<Self, PipelineError> {
        if depth == 0 {
            return Err(PipelineError::InvalidConfig {
                reason: "write_queue_depth must be greater than zero".into(),
            });
        }
        let (sender, receiver) = bounded::<Message>(depth);
        let worker = thread::Builder::new()
            .name("tsukiji-writer".into())
            .spawn(move || {
                for message in receiver {
                    match message {
                        Message::Run(job) => job(),
                        Message::Barrier(done) => {
                            let _ = done.send(());
                        }
                    }
                }
                debug!("mutation executor stopped");
            })
            .map_err(|err| PipelineError::ThreadPool {
                message: err.to_string(),
            })?;
        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    /// Queues `job`, blocking while the queue is full.
    ///
    /// # Errors
    /// Returns [`PipelineError::Shutdown`] when the executor thread is gone.
    pub fn execute<F>(&self, job: F) -> Result<(), PipelineError>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.sender()?;
        match sender.try_send(Message::Run(Box::new(job))) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(message)) => {
                debug!(depth = sender.capacity(), "mutation queue full, waiting");
                sender.send(message).map_err(|_| shutdown())
            }
            Err(TrySendError::Disconnected(_)) => Err(shutdown()),
        }
    }

    /// Queues `job` without blocking.
    ///
    /// # Errors
    /// Returns [`PipelineError::QueueFull`] when the queue is full and
    /// [`PipelineError::Shutdown`] when the executor thread is gone.
    pub fn try_execute<F>(&self, job: F) -> Result<(), PipelineError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.sender()?
            .try_send(Message::Run(Box::new(job)))
            .map_err(|err| match err {
                TrySendError::Full(_) => PipelineError::QueueFull { queue: QUEUE },
                TrySendError::Disconnected(_) => shutdown(),
            })
    }

    /// Blocks until every job queued before this call has run.
    ///
    /// # Errors
    /// Returns [`PipelineError::Shutdown`] when the executor thread is gone.
    pub fn sync(&self) -> Result<(), PipelineError> {
        let (done, finished) = bounded(1);
        self.sender()?
            .send(Message::Barrier(done))
            .map_err(|_| shutdown())?;
        finished.recv().map_err(|_| shutdown())
    }

    /// Jobs waiting in the queue.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.sender.as_ref().map_or(0, Sender::len)
    }

    fn sender(&self) -> Result<&Sender<Message>, PipelineError> {
        self.sender.as_ref().ok_or_else(shutdown)
    }
}

impl Drop for MutationExecutor {
    fn drop(&mut self) {
        // Closing the channel lets the thread finish the backlog and exit.
        drop(self.sender.take());
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            warn!("mutation executor thread panicked");
        }
    }
}

const fn shutdown() -> PipelineError {
    PipelineError::Shutdown { queue: QUEUE }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn jobs_run_in_submission_order() {
        let executor = MutationExecutor::new(2).expect("executor starts");
        let seen = Arc::new(Mutex::new(Vec::new()));
        for value in 0..20 {
            let seen = Arc::clone(&seen);
            executor
                .execute(move || seen.lock().expect("lock").push(value))
                .expect("queued");
        }
        executor.sync().expect("barrier");
        assert_eq!(*seen.lock().expect("lock"), (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn try_execute_reports_a_full_queue() {
        let executor = MutationExecutor::new(1).expect("executor starts");
        let (release, blocked) = bounded::<()>(0);
        let (started_tx, started) = bounded::<()>(1);
        executor
            .execute(move || {
                started_tx.send(()).expect("test waits");
                let _ = blocked.recv();
            })
            .expect("queued");
        started.recv().expect("first job started");
        executor.try_execute(|| {}).expect("one queue slot is free");

        let err = executor.try_execute(|| {}).expect_err("queue is full");
        assert_eq!(err, PipelineError::QueueFull { queue: "mutation" });

        release.send(()).expect("job is waiting");
        executor.sync().expect("barrier");
        assert_eq!(executor.pending(), 0);
    }

    #[test]
    fn zero_depth_is_rejected() {
        assert!(matches!(
            MutationExecutor::new(0),
            Err(PipelineError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn drop_finishes_the_backlog() {
        let ran = Arc::new(Mutex::new(0_usize));
        {
            let executor = MutationExecutor::new(4).expect("executor starts");
            for _ in 0..4 {
                let ran = Arc::clone(&ran);
                executor
                    .execute(move || *ran.lock().expect("lock") += 1)
                    .expect("queued");
            }
        }
        assert_eq!(*ran.lock().expect("lock"), 4);
    }
}
