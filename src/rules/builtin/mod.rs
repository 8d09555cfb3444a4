//! Built-in rule set, embedded in the binary.

use super::loader::{load_yaml, RuleSet};
use crate::error::Result;

const BUILTIN_RULES: &str = include_str!("rules.yaml");

/// Source name used for the embedded rules in logs and errors.
pub const SOURCE_NAME: &str = "<builtin>";

/// Returns the built-in rule set. Loaded the same way as user rule files.
pub fn builtin_rules() -> Result<RuleSet> {
    load_yaml(SOURCE_NAME, BUILTIN_RULES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Severity;

    #[test]
    fn builtin_rules_load() {
        let set = builtin_rules().unwrap();
        assert!(set.version.is_some());
        assert!(set.rules.len() >= 10);
        assert!(set.rules.iter().any(|r| r.id == "S3_001"));
    }

    #[test]
    fn builtin_rules_have_remediation_and_tags() {
        for rule in builtin_rules().unwrap().rules {
            assert!(!rule.remediation.is_empty(), "{} has no remediation", rule.id);
            assert!(rule.tags.contains("aws"), "{} is not tagged aws", rule.id);
        }
    }

    #[test]
    fn builtin_rules_cover_every_severity() {
        let rules = builtin_rules().unwrap().rules;
        for severity in [Severity::Error, Severity::Warning, Severity::Info] {
            assert!(rules.iter().any(|r| r.severity == severity));
        }
    }
}
