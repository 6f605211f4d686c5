use crate::PatternError;

/// The whole-segment recursive marker.
pub(crate) const RECURSIVE: &str = "**";

/// True when `segment` is exactly the recursive marker.
#[inline]
#[must_use]
pub(crate) fn is_recursive(segment: &str) -> bool {
    segment == RECURSIVE
}

/// True when `segment` contains a `*` or `?` anywhere.
#[inline]
#[must_use]
pub(crate) fn has_wildcard(segment: &str) -> bool {
    segment.contains(['*', '?'])
}

/**
Check a single include pattern against the dialect rules.

Patterns are relative `/`-separated paths. Rejected: the empty pattern,
a leading `/`, empty segments, `.` or `..` segments, and `**` combined
with any other character inside one segment.

# Errors
Returns the first [`PatternError`] encountered, scanning left to right.
*/
pub fn validate(pattern: &str) -> Result<(), PatternError> {
    if pattern.is_empty() {
        return Err(PatternError::Empty);
    }
    if pattern.starts_with('/') {
        return Err(PatternError::Absolute(pattern.to_owned()));
    }

    for segment in pattern.split('/') {
        if segment.is_empty() {
            return Err(PatternError::EmptySegment(pattern.to_owned()));
        }
        if segment == "." || segment == ".." {
            return Err(PatternError::DotSegment(pattern.to_owned()));
        }
        if segment.contains(RECURSIVE) && !is_recursive(segment) {
            return Err(PatternError::RecursiveMixedWithText(pattern.to_owned()));
        }
    }

    Ok(())
}

/// A validated pattern, pre-split into its segments.
#[derive(Debug, Clone)]
pub(crate) struct SplitPattern {
    pub(crate) segments: Box<[Box<str>]>,
    pub(crate) recursive_segments: usize,
}

impl SplitPattern {
    /// Validate and split in one pass.
    pub(crate) fn parse(pattern: &str) -> Result<Self, PatternError> {
        validate(pattern)?;
        let segments: Box<[Box<str>]> = pattern.split('/').map(Box::from).collect();
        let recursive_segments = segments
            .iter()
            .filter(|segment| is_recursive(segment))
            .count();
        Ok(Self {
            segments,
            recursive_segments,
        })
    }
}
