use crate::GlobError;
use crate::exec::Executor;
use crate::matcher::SegmentCache;
use crossbeam_channel::{Receiver, Sender, bounded};
use dashmap::DashSet;
use std::any::Any;
use std::io;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

/// What a finished query produced.
#[derive(Debug)]
pub enum GlobOutcome {
    /// Every matched path, deduplicated, in no particular order
    Matched(Vec<PathBuf>),
    /// The query was cancelled before it finished
    Canceled,
}

pub(crate) type Completion = Result<GlobOutcome, GlobError>;

/**
Shared bookkeeping for one query.

`pending` counts tasks that have been handed to the executor but have not
finished their epilogue; it is incremented *before* a task is enqueued and
decremented by a guard on every exit path, so the transition to zero happens
exactly once, after which nothing can resurrect the query. That transition
fires the single-shot completion channel.

Errors land in one of three first-writer-wins slots ordered by severity.
Once any slot is populated (or the cancel flag is up), subsequent task
bodies are skipped; their bookkeeping still runs so the count stays honest.
*/
pub(crate) struct QueryState {
    /// Matched paths; concurrent inserts, duplicates collapse
    results: DashSet<PathBuf>,
    /// Compiled-regex cache shared by every task of this query
    pub(crate) segment_cache: SegmentCache,
    /// Tasks enqueued but not yet through their epilogue
    pending: AtomicUsize,
    /// Tasks ever enqueued, the root bracket included
    total: AtomicUsize,
    /// Monotonic: false -> true, never back
    canceled: AtomicBool,
    fatal: OnceLock<String>,
    fault: OnceLock<String>,
    io: OnceLock<io::Error>,
    done: Sender<Completion>,
    completed: AtomicBool,
}

impl QueryState {
    pub(crate) fn new() -> (Arc<Self>, Receiver<Completion>) {
        let (done, receiver) = bounded(1);
        let state = Arc::new(Self {
            results: DashSet::new(),
            segment_cache: SegmentCache::new(),
            pending: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
            canceled: AtomicBool::new(false),
            fatal: OnceLock::new(),
            fault: OnceLock::new(),
            io: OnceLock::new(),
            done,
            completed: AtomicBool::new(false),
        });
        (state, receiver)
    }

    /// Hand `body` to the executor, wrapped in the bookkeeping epilogue.
    ///
    /// The count goes up before the executor sees the task; the guard takes
    /// it back down whether the body runs, is skipped, or panics.
    pub(crate) fn enqueue<F>(self: &Arc<Self>, executor: &Arc<dyn Executor>, body: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.total.fetch_add(1, Ordering::Relaxed);
        self.pending.fetch_add(1, Ordering::Relaxed);

        let state = Arc::clone(self);
        executor.execute(Box::new(move || {
            let _epilogue = PendingGuard::new(&state);
            if state.should_run() {
                if let Err(payload) = catch_unwind(AssertUnwindSafe(body)) {
                    state.record_fault(panic_message(payload.as_ref()));
                }
            }
        }));
    }

    /// Open the root bracket: holds the count above zero while the
    /// per-pattern roots are dispatched. Balanced by
    /// [`decrement_and_check_done`](Self::decrement_and_check_done).
    pub(crate) fn open_root_bracket(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
        self.pending.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn decrement_and_check_done(&self) {
        let remaining = self.pending.fetch_sub(1, Ordering::AcqRel) - 1;
        if remaining == 0 {
            self.finish();
        }
    }

    /// Complete the single-shot channel. The pending protocol means zero is
    /// reached once, but the flag keeps this idempotent regardless.
    fn finish(&self) {
        if self.completed.swap(true, Ordering::AcqRel) {
            return;
        }
        let completion = if self.is_canceled() {
            Ok(GlobOutcome::Canceled)
        } else if let Some(error) = self.most_serious() {
            Err(error)
        } else {
            Ok(GlobOutcome::Matched(self.snapshot()))
        };
        let _ = self.done.send(completion);
    }

    pub(crate) fn cancel(&self) {
        self.canceled.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Relaxed)
    }

    /// False once the query is cancelled or any error slot is populated;
    /// late tasks then skip their bodies and only do bookkeeping.
    pub(crate) fn should_run(&self) -> bool {
        !self.is_canceled()
            && self.fatal.get().is_none()
            && self.fault.get().is_none()
            && self.io.get().is_none()
    }

    pub(crate) fn add_result(&self, path: PathBuf) {
        self.results.insert(path);
    }

    pub(crate) fn record_io(&self, err: io::Error) {
        let _ = self.io.set(err);
    }

    pub(crate) fn record_fault(&self, what: String) {
        let _ = self.fault.set(what);
    }

    #[allow(dead_code)] // populated by callers once a fatal condition exists to report
    pub(crate) fn record_fatal(&self, what: String) {
        let _ = self.fatal.set(what);
    }

    /// The most severe populated slot, if any.
    fn most_serious(&self) -> Option<GlobError> {
        if let Some(what) = self.fatal.get() {
            return Some(GlobError::Fatal(what.clone()));
        }
        if let Some(what) = self.fault.get() {
            return Some(GlobError::Fault(what.clone()));
        }
        // io::Error is not Clone; rebuild it from kind and message.
        self.io
            .get()
            .map(|err| GlobError::Io(io::Error::new(err.kind(), err.to_string())))
    }

    fn snapshot(&self) -> Vec<PathBuf> {
        self.results.iter().map(|entry| entry.key().clone()).collect()
    }
}

/// Decrements `pending` on drop, so the count is released on every exit
/// path out of a task, panics included.
struct PendingGuard<'guard> {
    state: &'guard QueryState,
}

impl<'guard> PendingGuard<'guard> {
    const fn new(state: &'guard QueryState) -> Self {
        Self { state }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.state.decrement_and_check_done();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "task panicked".to_owned()
    }
}
