//! Value comparisons behind the leaf check operators.

use regex::Regex;

use crate::ir::Value;

/// Deep equality with the coercions rules rely on: integers and floats
/// compare by numeric value, and booleans equal their `"true"`/`"false"`
/// spelling.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            number(left) == number(right)
        }
        (Value::Bool(b), Value::String(s)) | (Value::String(s), Value::Bool(b)) => {
            parse_bool(s) == Some(*b)
        }
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .all(|(key, x)| b.get(key).is_some_and(|y| values_equal(x, y)))
        }
        _ => left == right,
    }
}

/// Substring for strings, membership for lists, key presence for objects.
pub fn contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::String(s) => needle
            .to_scalar_string()
            .is_some_and(|needle| s.contains(needle.as_str())),
        Value::List(items) => items.iter().any(|item| values_equal(item, needle)),
        Value::Object(map) => needle
            .to_scalar_string()
            .is_some_and(|key| map.contains_key(&key)),
        _ => false,
    }
}

/// Regex over the string form of a scalar.
pub fn matches(value: &Value, pattern: &Regex) -> bool {
    value
        .to_scalar_string()
        .is_some_and(|s| pattern.is_match(&s))
}

pub fn greater_than(value: &Value, bound: &Value) -> bool {
    matches!((value.as_f64(), bound.as_f64()), (Some(a), Some(b)) if a > b)
}

pub fn less_than(value: &Value, bound: &Value) -> bool {
    matches!((value.as_f64(), bound.as_f64()), (Some(a), Some(b)) if a < b)
}

/// Membership in a list of candidates; a scalar candidate is a list of one.
pub fn one_of(value: &Value, candidates: &Value) -> bool {
    match candidates {
        Value::List(items) => items.iter().any(|item| values_equal(value, item)),
        single => values_equal(value, single),
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Attributes;

    fn object(entries: Vec<(&str, Value)>) -> Value {
        Value::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect::<Attributes>(),
        )
    }

    #[test]
    fn numbers_compare_by_value() {
        assert!(values_equal(&Value::Int(1), &Value::Float(1.0)));
        assert!(values_equal(&Value::Float(2.5), &Value::Float(2.5)));
        assert!(!values_equal(&Value::Int(1), &Value::Float(1.5)));
        assert!(!values_equal(&Value::Int(1), &Value::from("1")));
    }

    #[test]
    fn bools_match_their_spelling() {
        assert!(values_equal(&Value::Bool(true), &Value::from("true")));
        assert!(values_equal(&Value::from("false"), &Value::Bool(false)));
        assert!(!values_equal(&Value::Bool(true), &Value::from("yes")));
    }

    #[test]
    fn lists_are_order_sensitive() {
        let a = Value::from(vec![1, 2]);
        assert!(values_equal(&a, &Value::from(vec![1, 2])));
        assert!(!values_equal(&a, &Value::from(vec![2, 1])));
        assert!(!values_equal(&a, &Value::from(vec![1])));
    }

    #[test]
    fn objects_ignore_key_order() {
        let a = object(vec![("x", Value::Int(1)), ("y", Value::from("b"))]);
        let b = object(vec![("y", Value::from("b")), ("x", Value::Float(1.0))]);
        assert!(values_equal(&a, &b));
        assert!(!values_equal(&a, &object(vec![("x", Value::Int(1))])));
    }

    #[test]
    fn contains_by_shape() {
        assert!(contains(&Value::from("public-read"), &Value::from("public")));
        assert!(contains(&Value::from(vec![22, 443]), &Value::Int(22)));
        assert!(!contains(&Value::from(vec![22, 443]), &Value::Int(80)));
        assert!(contains(
            &object(vec![("Name", Value::from("web"))]),
            &Value::from("Name")
        ));
        assert!(!contains(&Value::Int(22), &Value::Int(2)));
    }

    #[test]
    fn matches_uses_scalar_string_form() {
        let pattern = Regex::new("^80(80)?$").unwrap();
        assert!(matches(&Value::Int(8080), &pattern));
        assert!(matches(&Value::from("80"), &pattern));
        assert!(!matches(&Value::from(vec![80]), &pattern));
    }

    #[test]
    fn ordering_parses_numeric_strings() {
        assert!(greater_than(&Value::from("30"), &Value::Int(7)));
        assert!(less_than(&Value::Float(0.5), &Value::Int(1)));
        assert!(!greater_than(&Value::from("many"), &Value::Int(1)));
        assert!(!less_than(&Value::Bool(true), &Value::Int(2)));
    }

    #[test]
    fn one_of_accepts_list_or_scalar() {
        let acls = Value::from(vec!["public-read", "public-read-write"]);
        assert!(one_of(&Value::from("public-read"), &acls));
        assert!(!one_of(&Value::from("private"), &acls));
        assert!(one_of(&Value::from("private"), &Value::from("private")));
    }
}
