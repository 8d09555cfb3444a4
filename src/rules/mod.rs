pub mod builtin;
pub mod condition;
pub mod loader;
pub mod policy;
pub mod violation;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ir::Resource;

pub use condition::{Check, CheckOperator, Condition};
pub use loader::{ConditionDef, RuleDef, RuleFormat, RuleSet};
pub use violation::{Severity, Violation};

/// A validated policy rule.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Unique identifier, also the override key across rule sources.
    pub id: String,
    pub name: String,
    pub description: String,
    pub severity: Severity,
    /// Resource type the rule applies to (e.g., "aws_s3_bucket").
    pub resource_kind: String,
    pub condition: Condition,
    /// Message template, see [`crate::engine::template`].
    pub message: String,
    pub remediation: String,
    pub tags: BTreeSet<String>,
}

impl Rule {
    pub fn applies_to(&self, resource: &Resource) -> bool {
        self.resource_kind == resource.kind
    }

    pub fn summary(&self) -> RuleSummary {
        RuleSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            severity: self.severity,
            resource_kind: self.resource_kind.clone(),
            tags: self.tags.iter().cloned().collect(),
        }
    }
}

/// Metadata about a rule, used for `list-rules` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub severity: Severity,
    pub resource_kind: String,
    pub tags: Vec<String>,
}

/// Layer `overlay` on top of `base`: a rule with an id already in `base`
/// replaces it in place, new ids are appended.
pub fn merge_rules(base: &mut Vec<Rule>, overlay: Vec<Rule>) {
    for rule in overlay {
        match base.iter_mut().find(|existing| existing.id == rule.id) {
            Some(existing) => {
                tracing::debug!(rule_id = %rule.id, "overriding rule");
                *existing = rule;
            }
            None => base.push(rule),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: &str, name: &str) -> Rule {
        Rule {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            severity: Severity::Error,
            resource_kind: "aws_s3_bucket".into(),
            condition: Condition::exists("bucket"),
            message: "m".into(),
            remediation: String::new(),
            tags: BTreeSet::new(),
        }
    }

    #[test]
    fn merge_replaces_in_place_and_appends() {
        let mut base = vec![rule("A", "builtin a"), rule("B", "builtin b")];
        merge_rules(&mut base, vec![rule("A", "custom a"), rule("C", "custom c")]);

        let ids: Vec<(&str, &str)> = base.iter().map(|r| (r.id.as_str(), r.name.as_str())).collect();
        assert_eq!(
            ids,
            vec![("A", "custom a"), ("B", "builtin b"), ("C", "custom c")]
        );
    }
}
