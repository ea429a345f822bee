use std::{sync::Arc, time::Instant};

use anyhow::Error;

use crate::{
    cfg::RunConfig,
    engine::{
        conn::Connector,
        limit::LimitedWorker,
        runtime::{LocalTaskPool, ThreadPool},
        worker::HttpWorker,
    },
    stat::{Aggregate, Summary},
};

mod conn;
mod io;
mod limit;
mod request;
mod runtime;
mod worker;

/// Task unit.
trait Task {
    /// Executes this task once.
    async fn execute(&mut self);
}

/// Load driver.
///
/// Spawns exactly "concurrency" workers, spread round-robin over the
/// configured number of threads, waits for all of them to finish and
/// merges their statistics.
#[derive(Debug)]
pub struct Engine {
    cfg: Arc<RunConfig>,
}

impl Engine {
    pub fn new(cfg: Arc<RunConfig>) -> Self {
        Self { cfg }
    }

    /// Runs the benchmark to completion.
    ///
    /// Per-iteration failures are only accounted in the returned summary.
    /// Errors are returned for setup failures, such as unresolvable target,
    /// and for panicked workers.
    pub fn run(self) -> Result<Summary, Error> {
        let cfg = self.cfg;
        let connector = Arc::new(Connector::new(&cfg)?);

        let num_threads = cfg.threads;
        let concurrency = cfg.concurrency.get();
        log::info!(
            "running {} workers on {} threads against {}://{}{}",
            concurrency,
            num_threads,
            cfg.target.scheme,
            cfg.target.authority(),
            cfg.target.path,
        );

        let now = Instant::now();

        let pool = ThreadPool::new(num_threads, |tid: usize| {
            let cfg = cfg.clone();
            let connector = connector.clone();
            // Workers with index "tid", "tid + threads", ... are hosted here.
            let num_tasks = (tid..concurrency).step_by(num_threads.get()).count();
            log::debug!("thread #{tid} hosts {num_tasks} workers");

            move || {
                let set = LocalTaskPool::new(num_tasks, move |_: usize| {
                    let worker = HttpWorker::new(cfg.clone(), connector.clone());
                    let worker = LimitedWorker::new(worker, cfg.limit);

                    async move { worker.run().await.finish().await }
                });

                set.run()
            }
        });

        let stats = pool.run()?;
        let wall_clock = now.elapsed();

        let mut stat = Aggregate::default();
        for v in stats.into_iter().flatten() {
            stat.merge(v);
        }
        log::info!("finished {} iterations in {wall_clock:?}", stat.num_requests());

        Ok(stat.finalize(wall_clock, cfg.keep_alive))
    }
}
