//! The filesystem seam.
//!
//! The engine never touches `std::fs` directly; everything flows through
//! [`Filesystem`] so that networked filesystems, instrumented wrappers, and
//! failing test doubles can be slotted in. [`OsFilesystem`] is the stock
//! implementation over the host filesystem.

use libc::{EINVAL, ELOOP, ENAMETOOLONG, ENOENT, ENOTDIR};
use std::io;
use std::path::{Path, PathBuf};

/// What an entry is, as far as the traversal cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Directory,
    /// A regular file
    Regular,
    /// A symbolic link, reported distinctly from its target
    Symlink,
    /// Sockets, fifos, devices - anything that is none of the above
    Other,
}

impl FileKind {
    #[inline]
    #[must_use]
    pub const fn is_directory(self) -> bool {
        matches!(self, Self::Directory)
    }

    #[inline]
    #[must_use]
    pub const fn is_regular_file(self) -> bool {
        matches!(self, Self::Regular)
    }

    #[inline]
    #[must_use]
    pub const fn is_symbolic_link(self) -> bool {
        matches!(self, Self::Symlink)
    }

    #[inline]
    #[must_use]
    pub const fn is_other(self) -> bool {
        matches!(self, Self::Other)
    }

    #[inline]
    #[must_use]
    pub(crate) fn from_file_type(file_type: &std::fs::FileType) -> Self {
        if file_type.is_dir() {
            Self::Directory
        } else if file_type.is_file() {
            Self::Regular
        } else if file_type.is_symlink() {
            Self::Symlink
        } else {
            Self::Other
        }
    }
}

/**
Synchronous filesystem access, the only I/O surface of the engine.

All three operations may block; they are called from whatever thread the
executor runs tasks on. Implementations must be shareable across workers.

The contract mirrors what the traversal needs and nothing more:
- [`stat`](Self::stat) follows symlinks and reports absence as `Ok(None)`
  rather than an error, so a missing entry prunes a branch silently.
- [`list`](Self::list) yields the immediate children of a directory in no
  particular order.
- [`read_attributes`](Self::read_attributes) does not follow symlinks, so a
  link is reported as [`FileKind::Symlink`] and not as its target.
*/
pub trait Filesystem: Send + Sync {
    /// Stat `path`, following symlinks.
    ///
    /// Returns `Ok(None)` when the entry does not exist or its parent chain
    /// cannot be traversed.
    ///
    /// # Errors
    /// Any failure other than absence.
    fn stat(&self, path: &Path) -> io::Result<Option<FileKind>>;

    /// List the immediate children of `dir`, unordered.
    ///
    /// # Errors
    /// Any failure to open or read the directory.
    fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;

    /// Report what `path` is without following symlinks.
    ///
    /// # Errors
    /// Any failure, including the entry having vanished since it was listed.
    fn read_attributes(&self, path: &Path) -> io::Result<FileKind>;
}

/// [`Filesystem`] over the host OS via `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFilesystem;

impl Filesystem for OsFilesystem {
    fn stat(&self, path: &Path) -> io::Result<Option<FileKind>> {
        match std::fs::metadata(path) {
            Ok(metadata) => Ok(Some(FileKind::from_file_type(&metadata.file_type()))),
            Err(err) if error_means_absent(&err) => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut children = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            children.push(entry?.path());
        }
        Ok(children)
    }

    fn read_attributes(&self, path: &Path) -> io::Result<FileKind> {
        std::fs::symlink_metadata(path)
            .map(|metadata| FileKind::from_file_type(&metadata.file_type()))
    }
}

/// Errors that mean "the entry is not there", as opposed to real failures.
///
/// ENOENT/ENOTDIR cover the missing entry and the broken parent chain,
/// EINVAL/ENAMETOOLONG cover paths the OS refuses to parse, and ELOOP is the
/// OS terminating a symlink cycle - an entry that can never resolve.
/// Everything else (notably EACCES) is a genuine I/O failure.
#[inline]
fn error_means_absent(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::NotFound
        || matches!(
            err.raw_os_error(),
            Some(ENOENT | ENOTDIR | EINVAL | ENAMETOOLONG | ELOOP)
        )
}
