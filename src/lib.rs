//! A parallel UNIX-style glob engine.
//!
//! Given an absolute base directory and a set of include patterns, `pglob`
//! returns every path under the base whose relative path matches at least
//! one pattern. It was built as the filesystem-scanning backend of a build
//! system's package loader, where one query fans out across thousands of
//! subdirectories on a possibly networked filesystem: traversal work is
//! dispatched to a pluggable [`Executor`], directory listings and stats go
//! through a pluggable [`Filesystem`], and symlinks are resolved in their
//! own tasks so slow mounts do not serialise the walk.
//!
//! The pattern dialect is deliberately small: `*` and `?` within a
//! segment, and `**` as a whole segment matching zero or more directory
//! components. No character classes, no brace expansion, no excludes -
//! callers filter exclusions out of the returned set.
//!
//! ```no_run
//! use pglob::{GlobOutcome, Globber, ThreadPoolExecutor};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let globber = Globber::init("/repo/pkg")
//!     .patterns(["srcs/**/*.c", "hdrs/*.h"])
//!     .executor(Arc::new(ThreadPoolExecutor::with_default_parallelism()))
//!     .build()?;
//!
//! match globber.glob()? {
//!     GlobOutcome::Matched(paths) => println!("{} files", paths.len()),
//!     GlobOutcome::Canceled => unreachable!("nothing cancels this query"),
//! }
//! # Ok(())
//! # }
//! ```

mod error;
pub use error::{BuildError, GlobError, PatternError};

mod pattern;
pub use pattern::validate;

mod matcher;

mod fs;
pub use fs::{FileKind, Filesystem, OsFilesystem};

mod exec;
pub use exec::{CallerThread, Executor, Task, ThreadPoolExecutor};

mod walk;
pub use walk::{DirFilter, GlobHandle, GlobOutcome, Globber, GlobberBuilder};

#[cfg(test)]
mod test;
