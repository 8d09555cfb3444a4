//! Attribute path resolution.
//!
//! Paths are dot-separated keys, each optionally followed by bracket
//! suffixes: `tags.Name`, `rules[0].cidr`, `ingress[*].from_port`,
//! `tags["Name"]`. A `[*]` projects the rest of the path over every list
//! element and keeps the elements where it resolves.

use crate::ir::{Attributes, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
    Wildcard,
}

/// Look up `path` in a resource's attributes. `None` means not found;
/// Unknown/Computed values met along the way are returned as found.
pub fn get_attribute(attrs: &Attributes, path: &str) -> Option<Value> {
    let segments = parse_path(path)?;
    let (Segment::Key(first), rest) = segments.split_first()? else {
        return None;
    };
    resolve(attrs.get(first)?, rest)
}

fn resolve(value: &Value, segments: &[Segment]) -> Option<Value> {
    let Some((segment, rest)) = segments.split_first() else {
        return Some(value.clone());
    };
    if value.is_indeterminate() {
        return Some(value.clone());
    }

    match (segment, value) {
        (Segment::Key(key), Value::Object(map)) => resolve(map.get(key)?, rest),
        (Segment::Index(index), Value::List(items)) => resolve(items.get(*index)?, rest),
        (Segment::Wildcard, Value::List(items)) => {
            let projected: Vec<Value> = items.iter().filter_map(|item| resolve(item, rest)).collect();
            if projected.is_empty() {
                None
            } else {
                Some(Value::List(projected))
            }
        }
        _ => None,
    }
}

fn parse_path(path: &str) -> Option<Vec<Segment>> {
    let mut segments = Vec::new();

    for part in path.trim().split('.') {
        let (key, mut rest) = part.split_at(part.find('[').unwrap_or(part.len()));
        if !key.is_empty() {
            segments.push(Segment::Key(key.to_string()));
        } else if rest.is_empty() {
            return None;
        }

        while !rest.is_empty() {
            let inner = rest.strip_prefix('[')?;
            let end = inner.find(']')?;
            segments.push(parse_bracket(inner.get(..end)?)?);
            rest = inner.get(end + 1..)?;
        }
    }

    Some(segments)
}

fn parse_bracket(inner: &str) -> Option<Segment> {
    let inner = inner.trim();
    if inner == "*" {
        return Some(Segment::Wildcard);
    }
    if let Some(quoted) = inner
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
    {
        return Some(Segment::Key(quoted.to_string()));
    }
    inner.parse().ok().map(Segment::Index)
}
