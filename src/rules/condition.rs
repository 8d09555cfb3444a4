//! Rule condition trees.
//!
//! A [`Condition`] is either a leaf [`Check`] against one attribute path or
//! a logical combinator over child conditions. Conditions are built and
//! validated once by the loader and never change afterwards.

use regex::Regex;
use serde::Serialize;

use crate::ir::Value;

/// Operators usable in a leaf check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckOperator {
    Exists,
    NotExists,
    Equals,
    NotEquals,
    Contains,
    NotContains,
    Matches,
    GreaterThan,
    LessThan,
    OneOf,
}

impl CheckOperator {
    pub const ALL: [CheckOperator; 10] = [
        Self::Exists,
        Self::NotExists,
        Self::Equals,
        Self::NotEquals,
        Self::Contains,
        Self::NotContains,
        Self::Matches,
        Self::GreaterThan,
        Self::LessThan,
        Self::OneOf,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exists => "exists",
            Self::NotExists => "not_exists",
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::Matches => "matches",
            Self::GreaterThan => "greater_than",
            Self::LessThan => "less_than",
            Self::OneOf => "one_of",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|op| op.as_str() == s)
    }

    /// Existence checks are the only ones that work without a value.
    pub fn requires_value(self) -> bool {
        !matches!(self, Self::Exists | Self::NotExists)
    }

    /// Negative operators hold when the attribute is absent.
    pub fn holds_when_absent(self) -> bool {
        matches!(self, Self::NotExists | Self::NotEquals | Self::NotContains)
    }
}

impl std::fmt::Display for CheckOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Leaf check: `attribute <operator> value`.
#[derive(Debug, Clone)]
pub struct Check {
    pub attribute: String,
    pub operator: CheckOperator,
    pub value: Option<Value>,
    pattern: Option<Regex>,
}

impl Check {
    /// Build a check, enforcing the leaf invariants: a non-empty attribute,
    /// a value for every operator except the existence checks, and a valid
    /// regular expression for `matches`.
    pub fn new(
        attribute: impl Into<String>,
        operator: CheckOperator,
        value: Option<Value>,
    ) -> Result<Self, String> {
        let attribute = attribute.into();
        if attribute.trim().is_empty() {
            return Err(format!("`{operator}` check is missing an attribute"));
        }

        let value = value.filter(|v| !v.is_null());
        if operator.requires_value() && value.is_none() {
            return Err(format!("`{operator}` check on `{attribute}` requires a value"));
        }

        let pattern = match (operator, &value) {
            (CheckOperator::Matches, Some(Value::String(pattern))) => Some(
                Regex::new(pattern)
                    .map_err(|e| format!("invalid pattern for `{attribute}`: {e}"))?,
            ),
            (CheckOperator::Matches, Some(other)) => {
                return Err(format!(
                    "`matches` on `{attribute}` needs a string pattern, got {}",
                    other.type_name()
                ))
            }
            _ => None,
        };

        Ok(Self {
            attribute,
            operator,
            value,
            pattern,
        })
    }

    /// Compiled pattern of a `matches` check.
    pub fn pattern(&self) -> Option<&Regex> {
        self.pattern.as_ref()
    }
}

/// Node of a rule's boolean expression tree.
#[derive(Debug, Clone)]
pub enum Condition {
    Check(Check),
    All(Vec<Condition>),
    Any(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    /// Number of leaf checks in the tree.
    pub fn check_count(&self) -> usize {
        match self {
            Self::Check(_) => 1,
            Self::All(children) | Self::Any(children) => {
                children.iter().map(Condition::check_count).sum()
            }
            Self::Not(child) => child.check_count(),
        }
    }
}

#[cfg(test)]
impl Condition {
    pub(crate) fn exists(attribute: &str) -> Self {
        Self::leaf(attribute, CheckOperator::Exists, None)
    }

    pub(crate) fn not_exists(attribute: &str) -> Self {
        Self::leaf(attribute, CheckOperator::NotExists, None)
    }

    pub(crate) fn equals(attribute: &str, value: impl Into<Value>) -> Self {
        Self::leaf(attribute, CheckOperator::Equals, Some(value.into()))
    }

    pub(crate) fn not_equals(attribute: &str, value: impl Into<Value>) -> Self {
        Self::leaf(attribute, CheckOperator::NotEquals, Some(value.into()))
    }

    fn leaf(attribute: &str, operator: CheckOperator, value: Option<Value>) -> Self {
        match Check::new(attribute, operator, value) {
            Ok(check) => Self::Check(check),
            Err(message) => panic!("{message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_parsing_is_case_insensitive() {
        assert_eq!(CheckOperator::parse("Not_Equals"), Some(CheckOperator::NotEquals));
        assert_eq!(CheckOperator::parse(" one_of "), Some(CheckOperator::OneOf));
        assert_eq!(CheckOperator::parse("equal"), None);
    }

    #[test]
    fn value_required_except_for_existence() {
        assert!(Check::new("a", CheckOperator::Exists, None).is_ok());
        assert!(Check::new("a", CheckOperator::NotExists, None).is_ok());
        assert!(Check::new("a", CheckOperator::Equals, None).is_err());
        assert!(Check::new("a", CheckOperator::Equals, Some(Value::Null)).is_err());
    }

    #[test]
    fn attribute_required() {
        let err = Check::new("  ", CheckOperator::Exists, None).unwrap_err();
        assert!(err.contains("missing an attribute"));
    }

    #[test]
    fn matches_compiles_pattern() {
        let check = Check::new("name", CheckOperator::Matches, Some(Value::from("^prod-"))).unwrap();
        assert!(check.pattern().unwrap().is_match("prod-db"));

        assert!(Check::new("name", CheckOperator::Matches, Some(Value::from("("))).is_err());
        assert!(Check::new("name", CheckOperator::Matches, Some(Value::Int(1))).is_err());
    }

    #[test]
    fn check_count_walks_tree() {
        let condition = Condition::All(vec![
            Condition::exists("a"),
            Condition::Not(Box::new(Condition::Any(vec![
                Condition::equals("b", 1),
                Condition::equals("c", 2),
            ]))),
        ]);
        assert_eq!(condition.check_count(), 3);
    }
}
