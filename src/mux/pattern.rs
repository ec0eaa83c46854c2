//! Route pattern splitting
//!
//! A pattern such as `/abc/:id/d` is consumed one piece at a time: a static
//! literal runs up to the next `:`, a parameter runs from `:` up to the next
//! `/`. Every parameter shares the same trie edge, keyed by [`PARAM_SENTINEL`].

use super::RouteError;

/// Trie key used for every `:name` segment.
pub const PARAM_SENTINEL: u8 = b'*';

const PARAM_LITERAL: &[u8] = &[PARAM_SENTINEL];

/// Node kinds, in matching priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// A literal byte run, ex: `/users/`
    Static,
    /// A single `:name` capture bounded by `/`
    Param,
}

impl EntryKind {
    /// Static edges are always tried before the parametric one.
    pub const PRIORITY: [EntryKind; 2] = [EntryKind::Static, EntryKind::Param];

    pub(crate) const fn index(self) -> usize {
        match self {
            EntryKind::Static => 0,
            EntryKind::Param => 1,
        }
    }
}

/// One step of pattern decomposition.
#[derive(Debug, PartialEq, Eq)]
pub struct Split<'a> {
    pub kind: EntryKind,
    /// Bytes this step consumes. `*` for a parameter.
    pub literal: &'a [u8],
    /// Unconsumed tail of the pattern, still carrying its leading `:` if any.
    pub remainder: &'a [u8],
    /// Parameter name, empty for static steps.
    pub param: &'a [u8],
}

/// Split the next segment off `pattern`.
///
/// Returns `None` once the pattern is fully consumed.
pub fn split_pattern(pattern: &[u8]) -> Option<Split<'_>> {
    if pattern.is_empty() {
        return None;
    }

    if let Some(rest) = pattern.strip_prefix(b":") {
        let end = rest.iter().position(|&b| b == b'/').unwrap_or(rest.len());
        return Some(Split {
            kind: EntryKind::Param,
            literal: PARAM_LITERAL,
            remainder: &rest[end..],
            param: &rest[..end],
        });
    }

    let end = pattern
        .iter()
        .position(|&b| b == b':')
        .unwrap_or(pattern.len());

    Some(Split {
        kind: EntryKind::Static,
        literal: &pattern[..end],
        remainder: &pattern[end..],
        param: &[],
    })
}

/// Prefix a pattern with `/` when it lacks one.
pub fn normalize(pattern: &str) -> String {
    if pattern.starts_with('/') {
        pattern.to_string()
    } else {
        format!("/{}", pattern)
    }
}

/// Parameter names of a pattern, left to right.
pub fn param_names(pattern: &str) -> Vec<&str> {
    pattern
        .split('/')
        .filter_map(|segment| segment.find(':').map(|i| &segment[i + 1..]))
        .collect()
}

/// Reject patterns the trie cannot represent faithfully.
pub fn validate(pattern: &str) -> Result<(), RouteError> {
    let mut rest = pattern;
    while let Some(i) = rest.find(':') {
        rest = &rest[i + 1..];
        let end = rest.find('/').unwrap_or(rest.len());
        let name = &rest[..end];
        if name.is_empty() || name.contains(':') {
            return Err(RouteError::InvalidParam(pattern.to_string()));
        }
        rest = &rest[end..];
    }
    Ok(())
}

/// The structural shape of a pattern: parameter names erased.
///
/// Two patterns with the same shape land on the same trie node.
pub fn shape(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut rest = pattern;
    while let Some(i) = rest.find(':') {
        out.push_str(&rest[..=i]);
        rest = &rest[i + 1..];
        let end = rest.find('/').unwrap_or(rest.len());
        rest = &rest[end..];
    }
    out.push_str(rest);
    out
}

/// Length of the shared byte prefix of two slices.
pub fn longest_common(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}
