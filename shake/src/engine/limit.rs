use std::time::Instant;

use super::Task;
use crate::cfg::Limit;

/// Limited per-task worker.
///
/// Executes the given task until the configured limit is reached: either a
/// fixed number of iterations, or until the deadline passes. The deadline is
/// checked only between iterations, so the one in flight is never
/// interrupted.
#[derive(Debug)]
pub struct LimitedWorker<T> {
    /// Per-task job.
    task: T,
    limit: Limit,
}

impl<T> LimitedWorker<T> {
    pub fn new(task: T, limit: Limit) -> Self {
        Self { task, limit }
    }
}

impl<T> LimitedWorker<T>
where
    T: Task,
{
    /// Runs the task to its limit, returning it back for inspection.
    pub async fn run(mut self) -> T {
        match self.limit {
            Limit::Requests(n) => {
                for _ in 0..n.get() {
                    self.task.execute().await;
                }
            }
            Limit::Duration(duration) => {
                let deadline = Instant::now() + duration;
                while Instant::now() < deadline {
                    self.task.execute().await;
                }
            }
        }

        self.task
    }
}

#[cfg(test)]
mod test {
    use core::{num::NonZero, time::Duration};

    use super::*;

    #[derive(Debug, Default)]
    struct Counter {
        num_executed: u64,
        delay: Duration,
    }

    impl Task for Counter {
        async fn execute(&mut self) {
            self.num_executed += 1;
            tokio::time::sleep(self.delay).await;
        }
    }

    fn block_on<F: core::future::Future>(f: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f)
    }

    #[test]
    fn test_requests_limit() {
        let worker = LimitedWorker::new(Counter::default(), Limit::Requests(NonZero::new(7).unwrap()));

        assert_eq!(7, block_on(worker.run()).num_executed);
    }

    #[test]
    fn test_duration_limit() {
        let task = Counter {
            num_executed: 0,
            delay: Duration::from_millis(10),
        };
        let worker = LimitedWorker::new(task, Limit::Duration(Duration::from_millis(100)));

        let now = Instant::now();
        let task = block_on(worker.run());
        let elapsed = now.elapsed();

        assert!(task.num_executed >= 1);
        assert!(task.num_executed <= 10, "{}", task.num_executed);
        assert!(elapsed >= Duration::from_millis(100));
        // The last iteration may start just before the deadline.
        assert!(elapsed < Duration::from_millis(500), "{elapsed:?}");
    }

    #[test]
    fn test_duration_limit_completes_iteration_in_flight() {
        let task = Counter {
            num_executed: 0,
            delay: Duration::from_millis(150),
        };
        let worker = LimitedWorker::new(task, Limit::Duration(Duration::from_millis(10)));

        let now = Instant::now();
        let task = block_on(worker.run());

        assert_eq!(1, task.num_executed);
        assert!(now.elapsed() >= Duration::from_millis(150));
    }
}
