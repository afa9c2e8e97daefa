//! Bracket path expressions (`order[items][0]`) and their resolution against a
//! staged document.
//!
//! A path is an ordered, non-empty list of string segments. The first segment
//! is everything up to the first `[`; each following segment is the text of one
//! `[...]` pair. Segments address mapping keys directly and sequence elements
//! by their decimal index.

use std::fmt;

use serde_json::Value;

use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PathExpression {
    segments: Vec<String>,
}

impl PathExpression {
    /// Parse `key` or `key[a][b]...`.
    ///
    /// Anything that is not a well-formed chain of bracket pairs (empty head,
    /// empty or nested brackets, unclosed `[`, text after a `]`) is taken
    /// verbatim as a single segment.
    pub fn parse(raw: &str) -> Self {
        match split_brackets(raw) {
            Some(segments) => Self { segments },
            None => Self::single(raw),
        }
    }

    pub fn single(key: impl Into<String>) -> Self {
        Self {
            segments: vec![key.into()],
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_nested(&self) -> bool {
        self.segments.len() > 1
    }

    pub fn terminal(&self) -> &str {
        // parse/single never build an empty segment list
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    fn parents(&self) -> &[String] {
        &self.segments[..self.segments.len().saturating_sub(1)]
    }

    /// Follow every segment and return the addressed value, if any.
    pub fn lookup<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(root, |node, seg| child(node, seg))
    }
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut segs = self.segments.iter();
        if let Some(head) = segs.next() {
            f.write_str(head)?;
        }
        for seg in segs {
            write!(f, "[{}]", seg)?;
        }
        Ok(())
    }
}

impl From<&str> for PathExpression {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

fn split_brackets(raw: &str) -> Option<Vec<String>> {
    let open = raw.find('[')?;
    let head = &raw[..open];
    if head.is_empty() || head.contains(']') {
        return None;
    }
    let mut segments = vec![head.to_string()];
    let mut rest = &raw[open..];
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let close = inner.find(']')?;
        let seg = &inner[..close];
        if seg.is_empty() || seg.contains('[') {
            return None;
        }
        segments.push(seg.to_string());
        rest = &inner[close + 1..];
    }
    Some(segments)
}

/// Decimal index as written by a sequence position: no sign, no leading zeros.
pub(crate) fn parse_index(seg: &str) -> Option<usize> {
    let canonical = seg == "0"
        || (!seg.is_empty() && !seg.starts_with('0') && seg.bytes().all(|b| b.is_ascii_digit()));
    if canonical { seg.parse().ok() } else { None }
}

fn child<'a>(node: &'a Value, seg: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(seg),
        Value::Array(items) => parse_index(seg).and_then(|i| items.get(i)),
        _ => None,
    }
}

fn child_mut<'a>(node: &'a mut Value, seg: &str) -> Option<&'a mut Value> {
    match node {
        Value::Object(map) => map.get_mut(seg),
        Value::Array(items) => parse_index(seg).and_then(|i| items.get_mut(i)),
        _ => None,
    }
}

/// Walk every segment but the last and return the container that should hold
/// the terminal key, together with that key.
///
/// Evaluation is strictly left to right. A missing segment, or a value on the
/// way that is neither a mapping nor a sequence, fails with `PathNotFound`.
/// Whether the terminal key exists is left to the caller.
pub fn resolve<'a, 'p>(
    root: &'a mut Value,
    path: &'p PathExpression,
) -> Result<(&'a mut Value, &'p str)> {
    let not_found = |segment: &str| Error::PathNotFound {
        path: path.to_string(),
        segment: segment.to_string(),
    };
    let mut current = root;
    for seg in path.parents() {
        current = child_mut(current, seg).ok_or_else(|| not_found(seg))?;
    }
    if !matches!(current, Value::Object(_) | Value::Array(_)) {
        let at = path.parents().last().map(String::as_str).unwrap_or(path.terminal());
        return Err(not_found(at));
    }
    Ok((current, path.terminal()))
}

/// Remove `key` from a mapping or sequence container. Returns the removed value.
pub(crate) fn remove_entry(container: &mut Value, key: &str) -> Option<Value> {
    match container {
        Value::Object(map) => map.shift_remove(key),
        Value::Array(items) => match parse_index(key) {
            Some(i) if i < items.len() => Some(items.remove(i)),
            _ => None,
        },
        _ => None,
    }
}
