//! Fixed-size worker pool used to fan spectrum work out across threads.
//!
//! Jobs own their inputs and return their outputs; nothing is shared mutably between
//! units, so callers splice results back into their own buffers after `wait`.

use async_channel::{Receiver, Sender};
use std::any::Any;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use thiserror::Error;
use tracing::{debug, warn};

const WORKER_THREAD_PREFIX: &str = "surroundscope-worker";

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task failed: {0:#}")]
    Failed(anyhow::Error),
    #[error("task panicked: {0}")]
    Panicked(String),
    #[error("task pool shut down before the task completed")]
    Disconnected,
}

/// Completion handle for one submitted unit of work.
#[derive(Debug)]
pub struct TaskHandle<T> {
    result: Receiver<Result<T, TaskError>>,
}

impl<T> TaskHandle<T> {
    /// Blocks until the unit has run and returns its result.
    pub fn wait(self) -> Result<T, TaskError> {
        self.result
            .recv_blocking()
            .unwrap_or(Err(TaskError::Disconnected))
    }
}

pub struct TaskPool {
    size: usize,
    queue: Option<Sender<Job>>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl std::fmt::Debug for TaskPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskPool")
            .field("size", &self.size)
            .field("running", &self.workers.len())
            .finish_non_exhaustive()
    }
}

impl TaskPool {
    pub fn new(worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let (queue, jobs) = async_channel::unbounded::<Job>();

        let mut workers = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let jobs = jobs.clone();
            match thread::Builder::new()
                .name(format!("{WORKER_THREAD_PREFIX}-{index}"))
                .spawn(move || run_worker(jobs))
            {
                Ok(handle) => workers.push(handle),
                Err(err) => warn!("[pool] failed to spawn worker {index}: {err}"),
            }
        }

        if workers.is_empty() {
            warn!("[pool] no worker threads available; submitted tasks will fail");
        } else {
            debug!("[pool] started {} worker(s)", workers.len());
        }

        Self {
            size: worker_count,
            queue: Some(queue),
            workers,
        }
    }

    pub fn with_default_workers() -> Self {
        Self::new(default_worker_count())
    }

    /// Number of workers the pool was built with, even after [`TaskPool::shutdown`].
    pub fn worker_count(&self) -> usize {
        self.size
    }

    pub fn is_running(&self) -> bool {
        self.queue.is_some() && !self.workers.is_empty()
    }

    /// Close the queue and join the workers. Queued jobs still run; later submissions
    /// resolve to [`TaskError::Disconnected`].
    pub fn shutdown(&mut self) {
        if self.queue.take().is_none() {
            return;
        }
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("[pool] worker thread exited abnormally");
            }
        }
        debug!("[pool] shut down");
    }

    pub fn submit<F, T>(&self, job: F) -> TaskHandle<T>
    where
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply, result) = async_channel::bounded(1);
        let wrapped: Job = Box::new(move || {
            let outcome = match panic::catch_unwind(AssertUnwindSafe(job)) {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(err)) => Err(TaskError::Failed(err)),
                Err(payload) => Err(TaskError::Panicked(panic_message(payload.as_ref()))),
            };
            let _ = reply.try_send(outcome);
        });

        // A rejected job is dropped together with its reply sender, which the handle
        // observes as a disconnect.
        match &self.queue {
            Some(queue) if !self.workers.is_empty() => {
                let _ = queue.try_send(wrapped);
            }
            _ => drop(wrapped),
        }

        TaskHandle { result }
    }

    /// Waits for every handle, in order. The first error is reported only once all
    /// units have finished; siblings are never cancelled.
    pub fn wait_all<T, I>(handles: I) -> Result<Vec<T>, TaskError>
    where
        I: IntoIterator<Item = TaskHandle<T>>,
    {
        let mut values = Vec::new();
        let mut first_error = None;
        for handle in handles {
            match handle.wait() {
                Ok(value) => values.push(value),
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(values),
        }
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

pub fn default_worker_count() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

fn run_worker(jobs: Receiver<Job>) {
    while let Ok(job) = jobs.recv_blocking() {
        job();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}
