use core::fmt;
use std::io;
use std::path::PathBuf;

/// Why a pattern failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// The pattern string was empty
    Empty,
    /// The pattern started with a `/`
    Absolute(String),
    /// The pattern contained an empty segment (`a//b`, trailing `/`)
    EmptySegment(String),
    /// The pattern contained a `.` or `..` segment
    DotSegment(String),
    /// A `**` was glued to other characters within one segment
    RecursiveMixedWithText(String),
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "pattern cannot be empty"),
            Self::Absolute(pattern) => {
                write!(f, "pattern cannot be an absolute path: {pattern}")
            }
            Self::EmptySegment(pattern) => {
                write!(f, "pattern contains an empty segment: {pattern}")
            }
            Self::DotSegment(pattern) => {
                write!(f, "pattern cannot contain a '.' or '..' segment: {pattern}")
            }
            Self::RecursiveMixedWithText(pattern) => {
                write!(f, "'**' must stand alone in its segment: {pattern}")
            }
        }
    }
}

impl std::error::Error for PatternError {}

/// Rejected configuration, reported before any I/O happens.
#[derive(Debug)]
pub enum BuildError {
    /// The base directory must be an absolute path
    BaseNotAbsolute(PathBuf),
    /// One of the include patterns failed validation
    Pattern(PatternError),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BaseNotAbsolute(base) => {
                write!(f, "base directory must be absolute: {}", base.display())
            }
            Self::Pattern(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Pattern(err) => Some(err),
            Self::BaseNotAbsolute(_) => None,
        }
    }
}

impl From<PatternError> for BuildError {
    fn from(err: PatternError) -> Self {
        Self::Pattern(err)
    }
}

/// A failed query, ordered least to most severe.
///
/// One of these is propagated per query; when several tasks fail concurrently
/// the most severe class wins, and within a class the first writer wins.
#[derive(Debug)]
pub enum GlobError {
    /// stat/list/read-attributes failed with something other than absence
    Io(io::Error),
    /// A programming error in the engine or a caller-supplied predicate
    Fault(String),
    /// Unrecoverable environment failure
    Fatal(String),
}

impl fmt::Display for GlobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "filesystem error during glob: {err}"),
            Self::Fault(what) => write!(f, "runtime fault during glob: {what}"),
            Self::Fatal(what) => write!(f, "fatal failure during glob: {what}"),
        }
    }
}

impl std::error::Error for GlobError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Fault(_) | Self::Fatal(_) => None,
        }
    }
}

impl From<io::Error> for GlobError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}
