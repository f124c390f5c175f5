//! Fork/join pool for building sibling contexts concurrently

use crate::config::BuilderConfig;
use crate::{Error, Result};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

/// Fixed-size worker pool that populates sibling contexts in parallel.
///
/// [`run_all`](Self::run_all) joins every task before returning, so a
/// parent closed afterwards never sees an open child. Tasks are not
/// cancelled when a sibling fails.
///
/// ```rust
/// use optbench::builder::ConstructionPool;
///
/// let pool = ConstructionPool::new(2)?;
/// let squares = pool.run_all((1..=4).map(|i| move || Ok(i * i)))?;
/// assert_eq!(squares, vec![1, 4, 9, 16]);
/// # Ok::<(), optbench::Error>(())
/// ```
#[derive(Debug)]
pub struct ConstructionPool {
    pool: ThreadPool,
}

impl ConstructionPool {
    /// Pool with `threads` workers; `0` lets rayon pick.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the threads cannot be spawned.
    pub fn new(threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("optbench-build-{i}"))
            .build()
            .map_err(|e| Error::Config(format!("cannot start construction pool: {e}")))?;
        debug!(threads = pool.current_num_threads(), "construction pool started");
        Ok(Self { pool })
    }

    /// Pool sized by [`BuilderConfig::worker_threads`].
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the threads cannot be spawned.
    pub fn from_config(config: &BuilderConfig) -> Result<Self> {
        Self::new(config.worker_threads)
    }

    /// Number of worker threads
    #[must_use]
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run every task to completion and collect the results in task order.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failed task (in task order) after all
    /// tasks have finished.
    pub fn run_all<T, F, I>(&self, tasks: I) -> Result<Vec<T>>
    where
        I: IntoIterator<Item = F>,
        F: FnOnce() -> Result<T> + Send,
        T: Send,
    {
        let tasks: Vec<F> = tasks.into_iter().collect();
        let outcomes: Vec<Result<T>> = self
            .pool
            .install(|| tasks.into_par_iter().map(|task| task()).collect());
        outcomes.into_iter().collect()
    }
}
