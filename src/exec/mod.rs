//! Task dispatch.
//!
//! The traversal hands closures to an [`Executor`] and never cares where
//! they run. Two implementations ship with the crate: [`CallerThread`] runs
//! every task inline (the single-thread mode used when no executor is
//! configured), and [`ThreadPoolExecutor`] fans tasks out over a
//! work-stealing pool.

use crossbeam_deque::{Injector, Steal, Stealer, Worker};
use std::num::NonZeroUsize;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

/// A unit of traversal work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/**
Accepts tasks for later execution.

The engine enqueues new tasks from inside running ones, so implementations
must accept work at any time from any thread. Every accepted task must
eventually run - a dropped task leaves the query's bookkeeping unbalanced
and its caller blocked. Ordering between tasks is entirely unconstrained:
inline, LIFO, FIFO and stealing schedules are all correct.
*/
pub trait Executor: Send + Sync {
    /// Run `task` now or later.
    fn execute(&self, task: Task);
}

/// Runs each task inline on the thread that submitted it.
///
/// Enqueue-from-within-a-task becomes plain recursion, so traversal depth
/// is bounded by the filesystem tree depth.
#[derive(Debug, Default, Clone, Copy)]
pub struct CallerThread;

impl Executor for CallerThread {
    #[inline]
    fn execute(&self, task: Task) {
        task();
    }
}

/// Pop local work first, then drain the injector, then rob the siblings.
fn find_task(local: &Worker<Task>, injector: &Injector<Task>, stealers: &[Stealer<Task>]) -> Option<Task> {
    if let Some(task) = local.pop() {
        return Some(task);
    }

    loop {
        match injector.steal_batch_and_pop(local) {
            Steal::Success(task) => return Some(task),
            Steal::Retry => continue,
            Steal::Empty => {}
        }

        let mut retry = false;
        for stealer in stealers {
            match stealer.steal() {
                Steal::Success(task) => return Some(task),
                Steal::Retry => retry = true,
                Steal::Empty => {}
            }
        }

        if !retry {
            return None;
        }
    }
}

/**
A fixed-size work-stealing thread pool.

Tasks are pushed to a shared injector; each worker drains its own deque
first and steals from its siblings when idle. Dropping the pool signals
shutdown and joins every worker, after the queues have drained.
*/
pub struct ThreadPoolExecutor {
    injector: Arc<Injector<Task>>,
    shutdown: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl ThreadPoolExecutor {
    /// Spawn a pool with `threads` workers.
    #[must_use]
    pub fn new(threads: NonZeroUsize) -> Self {
        let injector = Arc::new(Injector::new());
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(threads.get());
        let mut stealers = Vec::with_capacity(threads.get());
        for _ in 0..threads.get() {
            let worker = Worker::new_lifo();
            stealers.push(worker.stealer());
            workers.push(worker);
        }
        let stealers = Arc::new(stealers);

        let handles = workers
            .into_iter()
            .enumerate()
            .map(|(index, worker)| {
                let injector = Arc::clone(&injector);
                let shutdown = Arc::clone(&shutdown);
                let stealers = Arc::clone(&stealers);

                thread::spawn(move || {
                    let siblings: Vec<_> = stealers
                        .iter()
                        .enumerate()
                        .filter(|(idx, _)| *idx != index)
                        .map(|(_, stealer)| stealer.clone())
                        .collect();

                    loop {
                        match find_task(&worker, &injector, &siblings) {
                            Some(task) => {
                                // A panicking task must not take the worker
                                // down with it, or queued tasks would starve.
                                let _ = catch_unwind(AssertUnwindSafe(task));
                            }
                            None => {
                                if shutdown.load(Ordering::Relaxed) {
                                    break;
                                }
                                thread::yield_now();
                            }
                        }
                    }
                })
            })
            .collect();

        Self {
            injector,
            shutdown,
            handles,
        }
    }

    /// Spawn a pool sized to the machine, falling back to one worker when
    /// the parallelism cannot be queried.
    #[must_use]
    pub fn with_default_parallelism() -> Self {
        const MIN_THREADS: NonZeroUsize = NonZeroUsize::MIN;
        Self::new(thread::available_parallelism().unwrap_or(MIN_THREADS))
    }

    /// Number of worker threads.
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.handles.len()
    }
}

impl Executor for ThreadPoolExecutor {
    #[inline]
    fn execute(&self, task: Task) {
        self.injector.push(task);
    }
}

impl Drop for ThreadPoolExecutor {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for ThreadPoolExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPoolExecutor")
            .field("threads", &self.handles.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn caller_thread_runs_inline() {
        let flag = Arc::new(AtomicBool::new(false));
        let captured = Arc::clone(&flag);
        CallerThread.execute(Box::new(move || captured.store(true, Ordering::Relaxed)));
        assert!(flag.load(Ordering::Relaxed));
    }

    #[test]
    fn pool_runs_every_task() {
        let pool = ThreadPoolExecutor::new(NonZeroUsize::new(4).unwrap());
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..200 {
            let counter = Arc::clone(&counter);
            pool.execute(Box::new(move || {
                counter.fetch_add(1, Ordering::Relaxed);
            }));
        }
        drop(pool);
        assert_eq!(counter.load(Ordering::Relaxed), 200);
    }

    #[test]
    fn pool_survives_panicking_tasks() {
        let pool = ThreadPoolExecutor::new(NonZeroUsize::new(2).unwrap());
        let counter = Arc::new(AtomicUsize::new(0));
        pool.execute(Box::new(|| panic!("boom")));
        for _ in 0..50 {
            let counter = Arc::clone(&counter);
            pool.execute(Box::new(move || {
                counter.fetch_add(1, Ordering::Relaxed);
            }));
        }
        drop(pool);
        assert_eq!(counter.load(Ordering::Relaxed), 50);
    }

    #[test]
    fn tasks_enqueued_from_tasks_complete() {
        let pool = Arc::new(ThreadPoolExecutor::new(NonZeroUsize::new(3).unwrap()));
        let counter = Arc::new(AtomicUsize::new(0));
        let outer_pool = Arc::clone(&pool);
        let outer_counter = Arc::clone(&counter);
        pool.execute(Box::new(move || {
            for _ in 0..10 {
                let counter = Arc::clone(&outer_counter);
                outer_pool.execute(Box::new(move || {
                    counter.fetch_add(1, Ordering::Relaxed);
                }));
            }
        }));
        while counter.load(Ordering::Relaxed) < 10 {
            thread::yield_now();
        }
        // Let the worker release its clone so the final drop (which joins
        // the workers) happens on this thread.
        while Arc::strong_count(&pool) > 1 {
            thread::yield_now();
        }
    }
}
