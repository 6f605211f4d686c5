use crate::fs::{Filesystem, OsFilesystem};
use crate::pattern::SplitPattern;
use crate::walk::globber::Globber;
use crate::walk::types::DirFilter;
use crate::{
    BuildError,
    exec::{CallerThread, Executor},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/**
A builder for a [`Globber`] with customisable options.

Only the base directory is required. Patterns default to none (which makes
every query an empty result), directories are included in results, no
directory filter is installed, tasks run inline on the calling thread, and
the host filesystem is used.
*/
pub struct GlobberBuilder {
    pub(crate) base: PathBuf,
    pub(crate) patterns: Vec<String>,
    pub(crate) exclude_directories: bool,
    pub(crate) dir_filter: Option<DirFilter>,
    pub(crate) executor: Option<Arc<dyn Executor>>,
    pub(crate) fs: Option<Arc<dyn Filesystem>>,
}

impl GlobberBuilder {
    /// Creates a new builder rooted at `base`, which must be absolute by
    /// the time [`build`](Self::build) runs.
    pub fn new<P: AsRef<Path>>(base: P) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
            patterns: Vec::new(),
            exclude_directories: false,
            dir_filter: None,
            executor: None,
            fs: None,
        }
    }

    /// Add one include pattern.
    #[must_use]
    pub fn pattern<S: AsRef<str>>(mut self, pattern: S) -> Self {
        self.patterns.push(pattern.as_ref().to_owned());
        self
    }

    /// Add a collection of include patterns.
    #[must_use]
    pub fn patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.patterns
            .extend(patterns.into_iter().map(|pattern| pattern.as_ref().to_owned()));
        self
    }

    /// Set whether matched directories are dropped from results, defaults
    /// to false.
    #[must_use]
    pub const fn exclude_directories(mut self, yesorno: bool) -> Self {
        self.exclude_directories = yesorno;
        self
    }

    /// Set a predicate over directories; subtrees it rejects are never
    /// descended into. Defaults to no filtering.
    #[must_use]
    pub const fn dir_filter(mut self, filter: Option<DirFilter>) -> Self {
        self.dir_filter = filter;
        self
    }

    /// Set the executor queries dispatch their tasks to. Defaults to
    /// running every task inline on the calling thread.
    #[must_use]
    pub fn executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Set the filesystem implementation. Defaults to the host filesystem.
    #[must_use]
    pub fn filesystem(mut self, fs: Arc<dyn Filesystem>) -> Self {
        self.fs = Some(fs);
        self
    }

    /**
    Validate the configuration and build the engine.

    Patterns are validated and split here, before any filesystem I/O, so a
    malformed pattern can never waste a traversal.

    # Errors
    Returns an error if the base path is not absolute or any pattern
    violates the dialect (empty, absolute, empty segment, `.`/`..`
    segment, or `**` mixed with other characters).
    */
    pub fn build(self) -> Result<Globber, BuildError> {
        if !self.base.is_absolute() {
            return Err(BuildError::BaseNotAbsolute(self.base));
        }

        let mut patterns = Vec::with_capacity(self.patterns.len());
        for pattern in &self.patterns {
            patterns.push(SplitPattern::parse(pattern)?);
        }

        Ok(Globber {
            base: self.base,
            patterns: patterns.into_boxed_slice(),
            exclude_directories: self.exclude_directories,
            dir_filter: self.dir_filter,
            executor: self.executor.unwrap_or_else(|| Arc::new(CallerThread)),
            fs: self.fs.unwrap_or_else(|| Arc::new(OsFilesystem)),
        })
    }
}
