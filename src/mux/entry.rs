//! Compressed trie over route patterns
//!
//! Each [`Entry`] covers a literal byte run. Children are kept per kind,
//! sorted by their first byte so lookups can binary search. Parameters all
//! share one child edge keyed by `*`; their names live on the terminal value.

use super::pattern::{longest_common, split_pattern, EntryKind, PARAM_SENTINEL};
use std::mem;

#[derive(Debug)]
pub struct Entry<T> {
    kind: EntryKind,
    prefix: u8,
    segment: Vec<u8>,
    children: [Vec<Entry<T>>; 2],
    terminal: Option<T>,
}

impl<T> Default for Entry<T> {
    fn default() -> Self {
        Self::root()
    }
}

impl<T> Entry<T> {
    /// An empty root covering no bytes.
    pub fn root() -> Self {
        Self {
            kind: EntryKind::Static,
            prefix: 0,
            segment: Vec::new(),
            children: [Vec::new(), Vec::new()],
            terminal: None,
        }
    }

    fn new(kind: EntryKind, segment: &[u8]) -> Self {
        Self {
            kind,
            prefix: segment[0],
            segment: segment.to_vec(),
            children: [Vec::new(), Vec::new()],
            terminal: None,
        }
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn segment(&self) -> &[u8] {
        &self.segment
    }

    pub fn terminal(&self) -> Option<&T> {
        self.terminal.as_ref()
    }

    pub fn children(&self, kind: EntryKind) -> &[Entry<T>] {
        &self.children[kind.index()]
    }

    /// Insert `pattern` below this node, attaching `value` where it ends.
    ///
    /// Parameter names are appended to `params` in the order they are walked.
    pub fn insert(&mut self, pattern: &[u8], value: T, params: &mut Vec<String>) {
        let split = match split_pattern(pattern) {
            Some(split) => split,
            None => {
                self.terminal = Some(value);
                return;
            }
        };

        if !split.param.is_empty() {
            params.push(String::from_utf8_lossy(split.param).into_owned());
        }

        let siblings = &mut self.children[split.kind.index()];

        let at = match siblings.binary_search_by_key(&split.literal[0], |e| e.prefix) {
            Ok(at) => at,
            Err(at) => {
                let mut child = Entry::new(split.kind, split.literal);
                if split.remainder.is_empty() {
                    child.terminal = Some(value);
                } else {
                    child.insert(split.remainder, value, params);
                }
                siblings.insert(at, child);
                return;
            }
        };

        let child = &mut siblings[at];
        let common = longest_common(split.literal, &child.segment);

        // the new literal diverges inside the child: push the child's tail down
        // one level so the child itself covers only the shared bytes
        if common < child.segment.len() {
            let tail = child.segment.split_off(common);
            let lower = Entry {
                kind: child.kind,
                prefix: tail[0],
                segment: tail,
                children: mem::take(&mut child.children),
                terminal: child.terminal.take(),
            };
            let kind = lower.kind;
            child.children[kind.index()].push(lower);
        }

        if split.literal.len() > common {
            let mut rest = split.literal[common..].to_vec();
            rest.extend_from_slice(split.remainder);
            child.insert(&rest, value, params);
        } else if split.remainder.is_empty() {
            child.terminal = Some(value);
        } else {
            child.insert(split.remainder, value, params);
        }
    }

    /// Match `path` against the trie below this node.
    ///
    /// Captured parameter values are pushed onto `values` left to right. On a
    /// miss `values` is left as it was.
    pub fn find<'p>(&self, path: &'p str, values: &mut Vec<&'p str>) -> Option<&T> {
        self.find_at(path, 0, values)
    }

    fn find_at<'p>(&self, path: &'p str, pos: usize, values: &mut Vec<&'p str>) -> Option<&T> {
        let rest = &path.as_bytes()[pos..];
        if rest.is_empty() {
            return None;
        }

        let mark = values.len();

        for kind in EntryKind::PRIORITY {
            let siblings = &self.children[kind.index()];
            if siblings.is_empty() {
                continue;
            }

            match kind {
                EntryKind::Static => {
                    let child = match siblings.binary_search_by_key(&rest[0], |e| e.prefix) {
                        Ok(i) => &siblings[i],
                        Err(_) => continue,
                    };
                    if !rest.starts_with(&child.segment) {
                        continue;
                    }
                    if let Some(found) = child.descend(path, pos + child.segment.len(), values) {
                        return Some(found);
                    }
                }
                EntryKind::Param => {
                    let child = &siblings[0];
                    debug_assert_eq!(child.prefix, PARAM_SENTINEL);

                    let end = rest
                        .iter()
                        .position(|&b| b == b'/')
                        .map_or(path.len(), |i| pos + i);
                    if end == pos {
                        continue;
                    }
                    let value = match path.get(pos..end) {
                        Some(value) => value,
                        None => continue,
                    };
                    values.push(value);
                    if let Some(found) = child.descend(path, end, values) {
                        return Some(found);
                    }
                }
            }

            // dead end below this edge, try the next kind
            values.truncate(mark);
        }

        None
    }

    fn descend<'p>(&self, path: &'p str, pos: usize, values: &mut Vec<&'p str>) -> Option<&T> {
        if pos == path.len() {
            self.terminal.as_ref()
        } else {
            self.find_at(path, pos, values)
        }
    }
}
