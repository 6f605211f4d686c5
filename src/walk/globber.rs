use crate::fs::Filesystem;
use crate::pattern::SplitPattern;
use crate::walk::globber_builder::GlobberBuilder;
use crate::walk::state::{Completion, GlobOutcome, QueryState};
use crate::walk::types::DirFilter;
use crate::walk::visitor::{GlobVisitor, PatternWork};
use crate::{GlobError, exec::Executor};
use crossbeam_channel::Receiver;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/**
The configured glob engine.

A `Globber` is immutable once built and may be reused: every call to
[`glob`](Self::glob) or [`launch`](Self::launch) runs an independent query
with its own counters, result set and regex cache, so the same engine can
serve queries concurrently.

```no_run
use pglob::{GlobOutcome, Globber};

# fn main() -> Result<(), Box<dyn std::error::Error>> {
let globber = Globber::init("/repo/pkg")
    .pattern("src/**/*.rs")
    .pattern("BUILD")
    .build()?;

if let GlobOutcome::Matched(paths) = globber.glob()? {
    for path in paths {
        println!("{}", path.display());
    }
}
# Ok(())
# }
```
*/
pub struct Globber {
    pub(crate) base: PathBuf,
    pub(crate) patterns: Box<[SplitPattern]>,
    pub(crate) exclude_directories: bool,
    pub(crate) dir_filter: Option<DirFilter>,
    pub(crate) executor: Arc<dyn Executor>,
    pub(crate) fs: Arc<dyn Filesystem>,
}

impl Globber {
    /// Start configuring an engine rooted at `base`.
    #[must_use]
    #[inline]
    pub fn init<P: AsRef<Path>>(base: P) -> GlobberBuilder {
        GlobberBuilder::new(base)
    }

    /// The absolute root every pattern is resolved against.
    #[inline]
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /**
    Run one query to completion and return its outcome.

    Blocks until every task has finished, however the executor schedules
    them. There is no way to interrupt the wait from this thread; use
    [`launch`](Self::launch) when cancellation is needed.

    # Errors
    The most severe failure any task recorded: an I/O failure, a runtime
    fault, or a fatal environment failure.
    */
    pub fn glob(&self) -> Result<GlobOutcome, GlobError> {
        self.launch().wait()
    }

    /// Start a query and return a handle to cancel or await it.
    #[must_use]
    pub fn launch(&self) -> GlobHandle {
        let (state, done) = QueryState::new();

        // The bracket keeps the count above zero until every per-pattern
        // root is enqueued; without it a fast first task could drive the
        // count to zero and complete the query while roots are missing.
        state.open_root_bracket();
        self.dispatch_roots(&state);
        state.decrement_and_check_done();

        GlobHandle { state, done }
    }

    fn dispatch_roots(&self, state: &Arc<QueryState>) {
        if self.patterns.is_empty() {
            return;
        }

        let base_kind = match self.fs.stat(&self.base) {
            Ok(Some(kind)) => kind,
            // Missing base: an empty result, not an error.
            Ok(None) => return,
            Err(err) => {
                state.record_io(err);
                return;
            }
        };

        let visitor = GlobVisitor::new(
            Arc::clone(&self.fs),
            Arc::clone(&self.executor),
            Arc::clone(state),
            self.exclude_directories,
            self.dir_filter,
        );

        for pattern in &self.patterns {
            let work = PatternWork::new(pattern.segments.clone(), pattern.recursive_segments);
            visitor.start(self.base.clone(), base_kind.is_directory(), work);
        }
    }
}

impl std::fmt::Debug for Globber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Globber")
            .field("base", &self.base)
            .field("patterns", &self.patterns.len())
            .field("exclude_directories", &self.exclude_directories)
            .finish_non_exhaustive()
    }
}

/// A running query.
///
/// Dropping the handle abandons the caller's view of the query; tasks
/// already with the executor still run their bookkeeping to completion.
pub struct GlobHandle {
    state: Arc<QueryState>,
    done: Receiver<Completion>,
}

impl GlobHandle {
    /// Ask the query to stop.
    ///
    /// Best effort: in-flight tasks finish their bookkeeping but skip
    /// their bodies, queued tasks short-circuit on entry, and in-progress
    /// I/O is not interrupted. The query then completes with
    /// [`GlobOutcome::Canceled`]. Cancelling an already-completed query
    /// changes nothing.
    pub fn cancel(&self) {
        self.state.cancel();
    }

    /**
    Block until the query completes and return its outcome.

    The wait is deliberately uninterruptible so a caller cannot abandon a
    query while its tasks are still writing to shared state; cancellation
    is [`cancel`](Self::cancel), followed by this method observing the
    cancelled outcome.

    # Errors
    As for [`Globber::glob`].
    */
    pub fn wait(self) -> Result<GlobOutcome, GlobError> {
        match self.done.recv() {
            Ok(completion) => completion,
            // Unreachable while `state` holds the sender; fail loudly
            // rather than pretend an empty result.
            Err(_) => Err(GlobError::Fatal(
                "query completed without reporting an outcome".to_owned(),
            )),
        }
    }
}

impl std::fmt::Debug for GlobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobHandle").finish_non_exhaustive()
    }
}
