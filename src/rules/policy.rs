use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{Rule, Severity};

/// Policy configuration loaded from the `[policy]` table of
/// `.gatekeeper.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Least severe level still reported.
    #[serde(default = "default_min_severity")]
    pub min_severity: Severity,
    /// Report indeterminate outcomes as violations.
    #[serde(default)]
    pub strict: bool,
    /// Skip the embedded rule set.
    #[serde(default)]
    pub disable_builtin: bool,
    /// Rule IDs to ignore entirely.
    #[serde(default)]
    pub deny_rules: HashSet<String>,
    /// When non-empty, only these rule IDs run.
    #[serde(default)]
    pub allow_rules: HashSet<String>,
}

fn default_min_severity() -> Severity {
    Severity::Info
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            min_severity: Severity::Info,
            strict: false,
            disable_builtin: false,
            deny_rules: HashSet::new(),
            allow_rules: HashSet::new(),
        }
    }
}

impl Policy {
    /// Whether a rule survives the deny list, the allow list and the
    /// severity threshold, in that order.
    pub fn admits(&self, rule: &Rule) -> bool {
        if self.deny_rules.contains(&rule.id) {
            return false;
        }
        if !self.allow_rules.is_empty() && !self.allow_rules.contains(&rule.id) {
            return false;
        }
        rule.severity.meets(self.min_severity)
    }

    /// Rules that should be evaluated, in their original order.
    pub fn filter(&self, rules: &[Rule]) -> Vec<Rule> {
        rules.iter().filter(|r| self.admits(r)).cloned().collect()
    }
}
