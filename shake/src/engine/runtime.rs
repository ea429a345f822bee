use core::{future::Future, num::NonZero};
use std::thread::Builder;

use anyhow::{anyhow, Error};
use tokio::task::LocalSet;

/// Represents a thread pool for running workers each in a separate thread.
#[derive(Debug)]
pub struct ThreadPool<F> {
    num_threads: NonZero<usize>,
    factory: F,
}

impl<F> ThreadPool<F> {
    pub fn new(num_threads: NonZero<usize>, factory: F) -> Self {
        Self { num_threads, factory }
    }
}

impl<F, U, T> ThreadPool<F>
where
    F: FnMut(usize) -> U,
    U: FnOnce() -> Result<T, Error> + Send + 'static,
    T: Send + 'static,
{
    /// Runs this [`ThreadPool`] by spawning threads and waiting for them to
    /// complete.
    ///
    /// Results are returned in thread index order. A panicked thread fails
    /// the whole pool, but only after all other threads are joined.
    pub fn run(mut self) -> Result<Vec<T>, Error> {
        let num_threads = self.num_threads.get();
        let mut threads = Vec::with_capacity(num_threads);

        let name = "shake:w".to_string();
        for idx in 0..num_threads {
            let thread = {
                let worker = (self.factory)(idx);

                Builder::new().name(name.clone()).spawn(worker)?
            };

            threads.push(thread);
        }

        let mut results = Vec::with_capacity(num_threads);
        for (idx, thread) in threads.into_iter().enumerate() {
            let result = thread
                .join()
                .map_err(|_| anyhow!("worker thread #{idx} panicked"))
                .and_then(|v| v);
            results.push(result);
        }

        results.into_iter().collect()
    }
}

/// Per-thread task set.
///
/// All tasks run cooperatively on a single-threaded runtime.
#[derive(Debug)]
pub struct LocalTaskPool<F> {
    num_tasks: usize,
    factory: F,
}

impl<F> LocalTaskPool<F> {
    pub fn new(num_tasks: usize, factory: F) -> Self {
        Self { factory, num_tasks }
    }
}

impl<F, T> LocalTaskPool<F>
where
    F: FnMut(usize) -> T,
    T: Future + 'static,
    T::Output: 'static,
{
    /// Runs all tasks to completion, returning their outputs in spawn order.
    pub fn run(mut self) -> Result<Vec<T::Output>, Error> {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        let local = LocalSet::new();

        let mut jobs = Vec::with_capacity(self.num_tasks);
        for idx in 0..self.num_tasks {
            let job = local.spawn_local((self.factory)(idx));

            jobs.push(job);
        }

        let future = async move {
            let mut outputs = Vec::with_capacity(jobs.len());
            for job in jobs {
                outputs.push(job.await?);
            }

            Ok::<_, Error>(outputs)
        };

        local.block_on(&runtime, future)
    }
}
