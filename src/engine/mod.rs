//! Three-valued condition evaluation.
//!
//! Every node yields an [`Outcome`]: a pass/fail answer plus a flag saying
//! whether the answer depends on values the parser could not resolve.
//! Only confident failures become violations unless strict mode is on.

pub mod ops;
pub mod path;
pub mod template;

use tracing::trace;

use crate::ir::{Attributes, Resource, Value};
use crate::rules::{Check, CheckOperator, Condition, Rule, Violation};

pub use path::get_attribute;

/// Result of evaluating a condition against one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub passed: bool,
    pub unknown: bool,
}

impl Outcome {
    pub const PASS: Outcome = Outcome {
        passed: true,
        unknown: false,
    };
    pub const FAIL: Outcome = Outcome {
        passed: false,
        unknown: false,
    };
    pub const UNKNOWN: Outcome = Outcome {
        passed: true,
        unknown: true,
    };

    fn from_bool(passed: bool) -> Self {
        if passed {
            Self::PASS
        } else {
            Self::FAIL
        }
    }

    pub fn is_confident_failure(self) -> bool {
        !self.passed && !self.unknown
    }
}

/// Evaluate a condition tree against a resource's attributes.
pub fn evaluate(attrs: &Attributes, condition: &Condition) -> Outcome {
    match condition {
        Condition::Check(check) => evaluate_check(attrs, check),
        Condition::All(children) => {
            let mut unknown = false;
            for child in children {
                let outcome = evaluate(attrs, child);
                if !outcome.passed {
                    return outcome;
                }
                unknown |= outcome.unknown;
            }
            Outcome {
                passed: true,
                unknown,
            }
        }
        Condition::Any(children) => {
            let mut unknown = false;
            for child in children {
                let outcome = evaluate(attrs, child);
                if outcome == Outcome::PASS {
                    return outcome;
                }
                unknown |= outcome.unknown;
            }
            Outcome {
                passed: false,
                unknown,
            }
        }
        Condition::Not(child) => {
            let outcome = evaluate(attrs, child);
            Outcome {
                passed: !outcome.passed,
                unknown: outcome.unknown,
            }
        }
    }
}

fn evaluate_check(attrs: &Attributes, check: &Check) -> Outcome {
    let Some(found) = get_attribute(attrs, &check.attribute) else {
        return Outcome::from_bool(check.operator.holds_when_absent());
    };
    if found.is_indeterminate() || depends_on_indeterminate(&found, check.operator) {
        return Outcome::UNKNOWN;
    }

    let expected = check.value.as_ref().unwrap_or(&Value::Null);
    let passed = match check.operator {
        CheckOperator::Exists => !found.is_null(),
        CheckOperator::NotExists => found.is_null(),
        CheckOperator::Equals => ops::values_equal(&found, expected),
        CheckOperator::NotEquals => !ops::values_equal(&found, expected),
        CheckOperator::Contains => ops::contains(&found, expected),
        CheckOperator::NotContains => !ops::contains(&found, expected),
        CheckOperator::Matches => check
            .pattern()
            .is_some_and(|pattern| ops::matches(&found, pattern)),
        CheckOperator::GreaterThan => ops::greater_than(&found, expected),
        CheckOperator::LessThan => ops::less_than(&found, expected),
        CheckOperator::OneOf => ops::one_of(&found, expected),
    };
    Outcome::from_bool(passed)
}

/// Whether the operator's answer hinges on an Unknown/Computed value nested
/// anywhere in `found`. Existence checks never do, and neither does key
/// presence on an object, since keys are always known.
fn depends_on_indeterminate(found: &Value, operator: CheckOperator) -> bool {
    match (operator, found) {
        (CheckOperator::Exists | CheckOperator::NotExists, _) => false,
        (CheckOperator::Contains | CheckOperator::NotContains, Value::Object(_)) => false,
        _ => found.contains_indeterminate(),
    }
}

/// Turns outcomes into violations.
#[derive(Debug, Clone, Copy, Default)]
pub struct Engine {
    strict: bool,
}

impl Engine {
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Check one resource against one rule. Resources of another kind are
    /// never violations.
    pub fn evaluate_rule(&self, resource: &Resource, rule: &Rule) -> Option<Violation> {
        if !rule.applies_to(resource) {
            return None;
        }

        let outcome = evaluate(&resource.attributes, &rule.condition);
        if outcome.unknown {
            if !self.strict {
                trace!(
                    rule_id = %rule.id,
                    resource = %resource.address(),
                    "skipping indeterminate outcome"
                );
                return None;
            }
        } else if outcome.passed {
            return None;
        }

        Some(Violation {
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            severity: rule.severity,
            resource_type: resource.kind.clone(),
            resource_name: resource.name.clone(),
            location: resource.location.clone(),
            message: template::render(&rule.message, resource),
            remediation: (!rule.remediation.is_empty()).then(|| rule.remediation.clone()),
            indeterminate: outcome.unknown,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::SourceLocation;
    use crate::rules::Severity;
    use proptest::prelude::*;
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    fn attrs(entries: Vec<(&str, Value)>) -> Attributes {
        entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    fn check(attribute: &str, operator: CheckOperator, value: Option<Value>) -> Condition {
        Condition::Check(Check::new(attribute, operator, value).unwrap())
    }

    fn resource(kind: &str, attributes: Attributes) -> Resource {
        Resource {
            kind: kind.into(),
            name: "this".into(),
            attributes,
            location: SourceLocation {
                file: PathBuf::from("main.tf"),
                line: 3,
                column: 1,
            },
        }
    }

    fn rule(condition: Condition) -> Rule {
        Rule {
            id: "T_001".into(),
            name: "Test rule".into(),
            description: String::new(),
            severity: Severity::Error,
            resource_kind: "aws_s3_bucket".into(),
            condition,
            message: "{{resource_type}} {{resource_name}} failed".into(),
            remediation: "fix it".into(),
            tags: BTreeSet::new(),
        }
    }

    /// A sample value for every operator that satisfies `Check::new`.
    fn sample_value(operator: CheckOperator) -> Option<Value> {
        match operator {
            CheckOperator::Exists | CheckOperator::NotExists => None,
            CheckOperator::Matches => Some(Value::from(".*")),
            CheckOperator::GreaterThan | CheckOperator::LessThan => Some(Value::Int(5)),
            CheckOperator::OneOf => Some(Value::from(vec!["a", "b"])),
            _ => Some(Value::from("a")),
        }
    }

    #[test]
    fn absent_attribute_passes_only_negative_operators() {
        let empty = Attributes::new();
        for operator in CheckOperator::ALL {
            let outcome = evaluate(&empty, &check("missing", operator, sample_value(operator)));
            assert!(!outcome.unknown);
            assert_eq!(outcome.passed, operator.holds_when_absent(), "{operator}");
        }
    }

    #[test]
    fn sentinels_are_indeterminate_for_every_operator() {
        for sentinel in [Value::Unknown, Value::Computed] {
            let attrs = attrs(vec![("x", sentinel.clone())]);
            for operator in CheckOperator::ALL {
                let outcome = evaluate(&attrs, &check("x", operator, sample_value(operator)));
                assert_eq!(outcome, Outcome::UNKNOWN, "{operator} on {sentinel:?}");
            }
        }
    }

    #[test]
    fn unknown_never_violates_without_strict() {
        let bucket = resource("aws_s3_bucket", attrs(vec![("x", Value::Unknown)]));
        let lenient = Engine::new(false);
        let strict = Engine::new(true);
        for operator in CheckOperator::ALL {
            let rule = rule(check("x", operator, sample_value(operator)));
            assert!(lenient.evaluate_rule(&bucket, &rule).is_none(), "{operator}");

            let negated = Rule {
                condition: Condition::Not(Box::new(rule.condition.clone())),
                ..rule.clone()
            };
            assert!(lenient.evaluate_rule(&bucket, &negated).is_none(), "not {operator}");

            let violation = strict.evaluate_rule(&bucket, &negated).unwrap();
            assert!(violation.indeterminate);
        }
    }

    #[test]
    fn list_with_indeterminate_element() {
        let attrs = attrs(vec![("ports", Value::List(vec![Value::Int(22), Value::Computed]))]);
        assert_eq!(
            evaluate(&attrs, &check("ports", CheckOperator::Contains, Some(Value::Int(80)))),
            Outcome::UNKNOWN
        );
        assert_eq!(
            evaluate(&attrs, &check("ports", CheckOperator::Exists, None)),
            Outcome::PASS
        );
    }

    #[test]
    fn nested_unknown_in_projection_is_indeterminate() {
        let block = |cidr: Value| Value::Object(attrs(vec![("cidr_blocks", Value::List(vec![cidr]))]));
        let bucket = resource(
            "aws_s3_bucket",
            attrs(vec![(
                "ingress",
                Value::List(vec![block(Value::Unknown), block(Value::Computed)]),
            )]),
        );
        let condition = check(
            "ingress[*].cidr_blocks",
            CheckOperator::Contains,
            Some(Value::from(vec!["10.0.0.0/8"])),
        );

        assert_eq!(evaluate(&bucket.attributes, &condition), Outcome::UNKNOWN);
        assert!(Engine::new(false)
            .evaluate_rule(&bucket, &rule(condition.clone()))
            .is_none());
        assert!(Engine::new(true)
            .evaluate_rule(&bucket, &rule(condition))
            .unwrap()
            .indeterminate);
    }

    #[test]
    fn object_with_unknown_member_is_indeterminate_for_comparisons() {
        let tags = attrs(vec![
            ("Owner", Value::Unknown),
            ("Team", Value::from("platform")),
        ]);
        let attrs = attrs(vec![("tags", Value::Object(tags))]);
        let expected = Value::Object(self::attrs(vec![
            ("Owner", Value::from("alice")),
            ("Team", Value::from("platform")),
        ]));

        for operator in [CheckOperator::Equals, CheckOperator::NotEquals, CheckOperator::OneOf] {
            let outcome = evaluate(&attrs, &check("tags", operator, Some(expected.clone())));
            assert_eq!(outcome, Outcome::UNKNOWN, "{operator}");
        }
    }

    #[test]
    fn object_key_presence_stays_confident() {
        let tags = attrs(vec![("Owner", Value::Unknown)]);
        let attrs = attrs(vec![("tags", Value::Object(tags))]);

        let has = |key: &str| check("tags", CheckOperator::Contains, Some(Value::from(key)));
        assert_eq!(evaluate(&attrs, &has("Owner")), Outcome::PASS);
        assert_eq!(evaluate(&attrs, &has("Team")), Outcome::FAIL);
        assert_eq!(
            evaluate(
                &attrs,
                &check("tags", CheckOperator::NotContains, Some(Value::from("Team")))
            ),
            Outcome::PASS
        );
    }

    #[test]
    fn exists_rejects_null() {
        let attrs = attrs(vec![("acl", Value::Null)]);
        assert_eq!(evaluate(&attrs, &Condition::exists("acl")), Outcome::FAIL);
        assert_eq!(evaluate(&attrs, &Condition::not_exists("acl")), Outcome::PASS);
    }

    #[test]
    fn all_returns_first_failure() {
        let attrs = attrs(vec![("a", Value::Unknown), ("b", Value::Int(1))]);
        let condition = Condition::All(vec![
            Condition::equals("a", 1),
            Condition::equals("b", 2),
            Condition::exists("a"),
        ]);
        assert_eq!(evaluate(&attrs, &condition), Outcome::FAIL);

        let passing = Condition::All(vec![Condition::equals("a", 1), Condition::equals("b", 1)]);
        assert_eq!(evaluate(&attrs, &passing), Outcome::UNKNOWN);
    }

    #[test]
    fn any_prefers_confident_pass() {
        let attrs = attrs(vec![("a", Value::Unknown), ("b", Value::Int(1))]);
        let condition = Condition::Any(vec![Condition::equals("a", 1), Condition::equals("b", 1)]);
        assert_eq!(evaluate(&attrs, &condition), Outcome::PASS);

        let failing = Condition::Any(vec![Condition::equals("a", 1), Condition::equals("b", 2)]);
        assert_eq!(
            evaluate(&attrs, &failing),
            Outcome {
                passed: false,
                unknown: true
            }
        );
    }

    #[test]
    fn wildcard_check_on_security_group() {
        let rule_of = |port: i64| {
            check(
                "ingress[*].from_port",
                CheckOperator::Contains,
                Some(Value::Int(port)),
            )
        };
        let ingress = |port: i64| {
            Value::Object(attrs(vec![("from_port", Value::Int(port))]))
        };
        let attrs = attrs(vec![("ingress", Value::List(vec![ingress(22), ingress(443)]))]);
        assert_eq!(evaluate(&attrs, &rule_of(443)), Outcome::PASS);
        assert_eq!(evaluate(&attrs, &rule_of(80)), Outcome::FAIL);
    }

    #[test]
    fn violation_carries_rendered_message() {
        let engine = Engine::default();
        let bucket = resource("aws_s3_bucket", Attributes::new());
        let violation = engine
            .evaluate_rule(&bucket, &rule(Condition::exists("acl")))
            .unwrap();
        assert_eq!(violation.rule_id, "T_001");
        assert_eq!(violation.message, "aws_s3_bucket this failed");
        assert_eq!(violation.remediation.as_deref(), Some("fix it"));
        assert_eq!(violation.location.line, 3);
        assert!(!violation.indeterminate);
    }

    #[test]
    fn other_resource_kinds_are_ignored() {
        let engine = Engine::new(true);
        let instance = resource("aws_instance", Attributes::new());
        assert!(engine
            .evaluate_rule(&instance, &rule(Condition::exists("acl")))
            .is_none());
    }

    fn leaf_condition() -> impl Strategy<Value = Condition> {
        prop_oneof![
            Just(Condition::exists("known")),
            Just(Condition::equals("known", 1)),
            Just(Condition::equals("known", 2)),
            Just(Condition::equals("unknown", 1)),
            Just(Condition::not_equals("computed", "x")),
            Just(Condition::exists("missing")),
            Just(Condition::not_exists("missing")),
        ]
    }

    fn condition_tree() -> impl Strategy<Value = Condition> {
        leaf_condition().prop_recursive(4, 24, 3, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 1..4).prop_map(Condition::All),
                prop::collection::vec(inner.clone(), 1..4).prop_map(Condition::Any),
                inner.prop_map(|c| Condition::Not(Box::new(c))),
            ]
        })
    }

    fn mixed_attrs() -> Attributes {
        attrs(vec![
            ("known", Value::Int(1)),
            ("unknown", Value::Unknown),
            ("computed", Value::Computed),
        ])
    }

    proptest! {
        #[test]
        fn and_or_follow_boolean_algebra(a: bool, b: bool) {
            let attrs = attrs(vec![("a", Value::Bool(a)), ("b", Value::Bool(b))]);
            let leaves = || vec![Condition::equals("a", true), Condition::equals("b", true)];

            prop_assert_eq!(evaluate(&attrs, &Condition::All(leaves())), Outcome::from_bool(a && b));
            prop_assert_eq!(evaluate(&attrs, &Condition::Any(leaves())), Outcome::from_bool(a || b));
            prop_assert_eq!(
                evaluate(&attrs, &Condition::Not(Box::new(Condition::equals("a", true)))),
                Outcome::from_bool(!a)
            );
        }

        #[test]
        fn strict_reports_everything_lenient_does(condition in condition_tree()) {
            let bucket = resource("aws_s3_bucket", mixed_attrs());
            let rule = rule(condition);
            let lenient = Engine::new(false).evaluate_rule(&bucket, &rule);
            let strict = Engine::new(true).evaluate_rule(&bucket, &rule);
            if lenient.is_some() {
                prop_assert!(strict.is_some());
            }
        }

        #[test]
        fn evaluation_is_deterministic(condition in condition_tree()) {
            let attrs = mixed_attrs();
            prop_assert_eq!(evaluate(&attrs, &condition), evaluate(&attrs, &condition));
        }
    }
}
