use dashmap::DashSet;
use std::path::{Path, PathBuf};

/// Identity of a recursive subtask: "continue matching from segment `idx`
/// at directory `base`". Structural equality on both fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct GlobTask {
    base: PathBuf,
    idx: usize,
}

/// Gate in front of subtask enqueues.
///
/// A pattern with two or more `**` segments reaches the same `(base, idx)`
/// state along several traversal paths; the dedup variant collapses those
/// with a concurrent insert-once set. Patterns with at most one `**` visit
/// each state once by construction, so they skip the set entirely.
#[derive(Debug)]
pub(crate) enum TaskGate {
    Plain,
    Dedup(DashSet<GlobTask>),
}

impl TaskGate {
    pub(crate) fn for_pattern(recursive_segments: usize) -> Self {
        if recursive_segments > 1 {
            Self::Dedup(DashSet::new())
        } else {
            Self::Plain
        }
    }

    /// True when the subtask has not been enqueued before. Insertion and
    /// the decision are one atomic step, so two racing enqueues of the same
    /// state cannot both pass.
    pub(crate) fn admit(&self, base: &Path, idx: usize) -> bool {
        match self {
            Self::Plain => true,
            Self::Dedup(seen) => seen.insert(GlobTask {
                base: base.to_path_buf(),
                idx,
            }),
        }
    }
}
