use crate::fs::Filesystem;
use crate::walk::dedup::TaskGate;
use crate::walk::state::QueryState;
use crate::walk::types::DirFilter;
use crate::{exec::Executor, matcher, pattern};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One pattern's traversal context: its segments plus the gate that filters
/// duplicate subtasks when the pattern carries more than one `**`.
pub(crate) struct PatternWork {
    segments: Box<[Box<str>]>,
    gate: TaskGate,
}

impl PatternWork {
    pub(crate) fn new(segments: Box<[Box<str>]>, recursive_segments: usize) -> Arc<Self> {
        Arc::new(Self {
            segments,
            gate: TaskGate::for_pattern(recursive_segments),
        })
    }
}

/**
The traversal itself.

One visitor serves one query. Each task resumes matching at some
`(directory, segment index)` state; tasks spawn further tasks for
subdirectories, for the `**` zero-components skip, and for symlink
resolution. Anything the visitor finds goes through the shared
[`QueryState`]; anything it cannot read is recorded there as well.
*/
pub(crate) struct GlobVisitor {
    fs: Arc<dyn Filesystem>,
    executor: Arc<dyn Executor>,
    state: Arc<QueryState>,
    exclude_directories: bool,
    dir_filter: Option<DirFilter>,
}

impl GlobVisitor {
    pub(crate) fn new(
        fs: Arc<dyn Filesystem>,
        executor: Arc<dyn Executor>,
        state: Arc<QueryState>,
        exclude_directories: bool,
        dir_filter: Option<DirFilter>,
    ) -> Arc<Self> {
        Arc::new(Self {
            fs,
            executor,
            state,
            exclude_directories,
            dir_filter,
        })
    }

    /// Enqueue the root task for one pattern.
    pub(crate) fn start(self: &Arc<Self>, base: PathBuf, base_is_dir: bool, work: Arc<PatternWork>) {
        self.enqueue_visit(base, base_is_dir, 0, work);
    }

    /// Queue a `(base, idx)` continuation, unless the gate has seen it.
    fn enqueue_visit(
        self: &Arc<Self>,
        base: PathBuf,
        base_is_dir: bool,
        idx: usize,
        work: Arc<PatternWork>,
    ) {
        if !work.gate.admit(&base, idx) {
            return;
        }
        let visitor = Arc::clone(self);
        self.state.enqueue(&self.executor, move || {
            visitor.visit(&base, base_is_dir, idx, &work);
        });
    }

    /// Resume matching `work.segments[idx..]` at `base`.
    fn visit(self: &Arc<Self>, base: &Path, base_is_dir: bool, idx: usize, work: &Arc<PatternWork>) {
        if base_is_dir && !self.admits_directory(base) {
            return;
        }

        // All segments consumed: the current path is a match.
        if idx == work.segments.len() {
            if !(self.exclude_directories && base_is_dir) {
                self.state.add_result(base.to_path_buf());
            }
            return;
        }

        // Segments remain but there is nothing to descend into.
        if !base_is_dir {
            return;
        }

        let segment: &str = &work.segments[idx];

        // "Zero directory components": `**` may also match nothing at all,
        // so the rest of the pattern gets a shot at this very directory.
        if pattern::is_recursive(segment) {
            self.enqueue_visit(base.to_path_buf(), true, idx + 1, Arc::clone(work));
        }

        if !pattern::has_wildcard(segment) {
            self.expand_literal(base, segment, idx, work);
            return;
        }

        self.scan_children(base, segment, idx, work);
    }

    /// A literal segment needs no listing: resolve `base/segment` with a
    /// single stat and continue there if it exists.
    fn expand_literal(self: &Arc<Self>, base: &Path, segment: &str, idx: usize, work: &Arc<PatternWork>) {
        let child = base.join(segment);
        let kind = match self.fs.stat(&child) {
            Ok(Some(kind)) => kind,
            Ok(None) => return,
            Err(err) => {
                self.state.record_io(err);
                return;
            }
        };
        // stat follows links, so a Symlink here means the facade broke its
        // contract; drop the branch rather than guess.
        if !(kind.is_directory() || kind.is_regular_file() || kind.is_other()) {
            return;
        }
        self.enqueue_visit(child, kind.is_directory(), idx + 1, Arc::clone(work));
    }

    /// A wildcard segment (including `**`) matches against every child.
    fn scan_children(self: &Arc<Self>, base: &Path, segment: &str, idx: usize, work: &Arc<PatternWork>) {
        let children = match self.fs.list(base) {
            Ok(children) => children,
            Err(err) => {
                self.state.record_io(err);
                return;
            }
        };

        for child in children {
            let kind = match self.fs.read_attributes(&child) {
                Ok(kind) => kind,
                Err(err) => {
                    self.state.record_io(err);
                    return;
                }
            };
            // Fifos, sockets and devices never match through a listing.
            if kind.is_other() {
                continue;
            }

            let Some(name) = child.file_name() else {
                continue;
            };
            let matched = match matcher::matches(
                segment,
                name.as_encoded_bytes(),
                Some(&self.state.segment_cache),
            ) {
                Ok(matched) => matched,
                Err(err) => {
                    self.state.record_fault(err.to_string());
                    return;
                }
            };
            if !matched {
                continue;
            }

            if kind.is_symbolic_link() {
                self.enqueue_symlink(child, idx, work);
            } else {
                self.process_file_or_directory(child, kind.is_directory(), idx, work);
            }
        }
    }

    /// Resolve a matched symlink in its own task.
    ///
    /// Stat'ing each link inline while holding the directory listing would
    /// serialise on the underlying filesystem; a networked mount turns that
    /// into a long chain of round trips. As a separate task the executor
    /// can overlap them. Links whose target is absent are dropped.
    fn enqueue_symlink(self: &Arc<Self>, link: PathBuf, idx: usize, work: &Arc<PatternWork>) {
        let visitor = Arc::clone(self);
        let work = Arc::clone(work);
        self.state.enqueue(&self.executor, move || {
            match visitor.fs.stat(&link) {
                Ok(Some(kind)) => {
                    if kind.is_other() {
                        return;
                    }
                    visitor.process_file_or_directory(link, kind.is_directory(), idx, &work);
                }
                // Dangling link: historically ignored without comment.
                Ok(None) => {}
                Err(err) => visitor.state.record_io(err),
            }
        });
    }

    /// A child matched `segments[idx]`; route it onward.
    fn process_file_or_directory(
        self: &Arc<Self>,
        path: PathBuf,
        is_dir: bool,
        idx: usize,
        work: &Arc<PatternWork>,
    ) {
        let segment: &str = &work.segments[idx];
        if is_dir {
            // Entering a subdirectory consumes the segment, except `**`,
            // which keeps matching deeper.
            let next = if pattern::is_recursive(segment) { idx } else { idx + 1 };
            self.enqueue_visit(path, true, next, Arc::clone(work));
        } else if idx + 1 == work.segments.len() {
            self.state.add_result(path);
        }
        // A plain file cannot consume the remaining segments: drop it.
    }

    #[inline]
    fn admits_directory(&self, dir: &Path) -> bool {
        self.dir_filter.is_none_or(|keep| keep(dir))
    }
}
