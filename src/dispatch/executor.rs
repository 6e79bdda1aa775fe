//! Execution backend for dispatch work: either run inline on the calling
//! thread, or post onto a [`rayon::ThreadPool`]. Stands in for the original
//! engine's `foundation::thread::IExecutor` abstraction.

use std::sync::Arc;

/// Where dispatch work actually runs.
#[derive(Clone)]
pub enum Executor {
    /// Run on whichever thread calls [`Executor::execute`].
    Inline,
    /// Post onto a shared thread pool and return immediately.
    ThreadPool(Arc<rayon::ThreadPool>),
}

impl Executor {
    /// Build a dedicated thread pool executor with `threads` workers.
    pub fn thread_pool(threads: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("kestrel-dispatch-{i}"))
            .build()?;
        Ok(Executor::ThreadPool(Arc::new(pool)))
    }

    /// Run `task` according to this executor's placement.
    pub fn execute(&self, task: impl FnOnce() + Send + 'static) {
        match self {
            Executor::Inline => task(),
            Executor::ThreadPool(pool) => pool.spawn(task),
        }
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Executor::Inline => f.write_str("Executor::Inline"),
            Executor::ThreadPool(_) => f.write_str("Executor::ThreadPool"),
        }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Executor::Inline
    }
}
