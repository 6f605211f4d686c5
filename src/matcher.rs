//! Single-segment wildcard matching.
//!
//! A pattern segment is matched against one filename, never a whole path:
//! - `*` matches any run of characters
//! - `?` matches exactly one character
//! - `**` (the whole segment) matches any filename; the traversal layer is
//!   what gives it the "zero or more directory components" meaning
//! - a filename with a leading `.` is only matched by a pattern that spells
//!   the leading `.` out, except under `**`
//!
//! Segments that survive the fast paths are translated to an anchored
//! regular expression; compiled regexes are cached per query so a pattern
//! like `src/**/*.rs` compiles `*.rs` once no matter how many directories
//! the walk fans out over.
//!
//! Filenames are matched as raw bytes rather than `str`, so entries with
//! non-UTF-8 names still participate.

use crate::pattern::RECURSIVE;
use dashmap::DashMap;
use regex::bytes::Regex;

/// Per-query cache from pattern segment to its compiled regex.
pub(crate) type SegmentCache = DashMap<Box<str>, Regex>;

/// Match one filename against one pattern segment.
///
/// `cache` stores compiled regexes keyed by the segment text; pass `None`
/// for one-shot matching.
///
/// # Errors
/// Returns the regex compile error when the translated segment does not
/// form a valid expression. The translation escapes every metacharacter the
/// dialect knows about, so this indicates a bug rather than bad user input.
pub(crate) fn matches(
    pattern: &str,
    filename: &[u8],
    cache: Option<&SegmentCache>,
) -> Result<bool, regex::Error> {
    if pattern.is_empty() || filename.is_empty() {
        return Ok(false);
    }
    if pattern == RECURSIVE {
        return Ok(true);
    }
    // A leading dot must be spelled out by the pattern.
    if filename[0] == b'.' && !pattern.starts_with('.') {
        return Ok(false);
    }
    if pattern == "*" {
        return Ok(true);
    }

    // *SUFFIX and PREFIX* with no other wildcard reduce to slice checks.
    if let Some(suffix) = pattern.strip_prefix('*') {
        if !crate::pattern::has_wildcard(suffix) {
            return Ok(filename.ends_with(suffix.as_bytes()));
        }
    }
    if let Some(prefix) = pattern.strip_suffix('*') {
        if !crate::pattern::has_wildcard(prefix) {
            return Ok(filename.starts_with(prefix.as_bytes()));
        }
    }

    Ok(compiled(pattern, cache)?.is_match(filename))
}

/// Fetch the compiled regex for `pattern`, consulting the cache first.
fn compiled(pattern: &str, cache: Option<&SegmentCache>) -> Result<Regex, regex::Error> {
    let Some(cache) = cache else {
        return Regex::new(&translate(pattern));
    };
    if let Some(hit) = cache.get(pattern) {
        // Regex clones share the compiled program, so this is cheap.
        return Ok(hit.clone());
    }
    let regex = Regex::new(&translate(pattern))?;
    Ok(cache.entry(Box::from(pattern)).or_insert(regex).clone())
}

/// Translate a pattern segment to an anchored regular expression.
///
/// `*` becomes `.*`, `?` becomes `.`, and regex metacharacters are escaped.
/// `**` also becomes `.*` but swallows an adjacent `/` on either side; a
/// validated segment never contains one, yet the substitution keeps whole
/// patterns translating sensibly if one is ever fed through here.
fn translate(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 8);
    regex.push('^');
    let mut chars = pattern.chars().peekable();
    while let Some(chr) = chars.next() {
        match chr {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                if regex.ends_with('/') {
                    regex.pop();
                }
                if chars.peek() == Some(&'/') {
                    chars.next();
                }
                regex.push_str(".*");
            }
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            '^' | '$' | '|' | '+' | '{' | '}' | '[' | ']' | '\\' | '.' => {
                regex.push('\\');
                regex.push(chr);
            }
            other => regex.push(other),
        }
    }
    regex.push('$');
    regex
}
