//! Rule layering and the check driver.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::engine::Engine;
use crate::error::Result;
use crate::parser;
use crate::rules::builtin::builtin_rules;
use crate::rules::loader::{compile_rules, load_file};
use crate::rules::policy::Policy;
use crate::rules::{merge_rules, Rule, RuleDef, RuleSummary, Severity, Violation};

/// Where rules come from and how they are filtered.
#[derive(Debug, Clone, Default)]
pub struct CheckerOptions {
    pub policy: Policy,
    /// `[[rules]]` entries from the project config.
    pub config_rules: Vec<RuleDef>,
    /// Primary custom rule file.
    pub custom_rules: Option<PathBuf>,
    /// Further rule files, applied in order after `custom_rules`.
    pub extra_rule_files: Vec<PathBuf>,
    /// Variable values overriding declared defaults.
    pub values_file: Option<PathBuf>,
}

/// Outcome of one `check` call.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub violations: Vec<Violation>,
    pub files_scanned: usize,
    pub resources_found: usize,
    pub rules_evaluated: usize,
    pub duration: Duration,
    pub scanned_at: DateTime<Utc>,
}

impl CheckResult {
    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.violations
            .iter()
            .filter(|v| v.severity == severity)
            .count()
    }
}

/// Holds the merged rule set and evaluates it against files.
#[derive(Debug, Clone)]
pub struct Checker {
    rules: Vec<Rule>,
    active: Vec<Rule>,
    engine: Engine,
    values_file: Option<PathBuf>,
}

impl Checker {
    /// Merge built-ins, config rules, the custom rule file and any extra
    /// rule files, each layer overriding earlier ones by id.
    pub fn new(options: CheckerOptions) -> Result<Self> {
        let mut rules = Vec::new();

        if options.policy.disable_builtin {
            debug!("built-in rules disabled");
        } else {
            rules = builtin_rules()?.rules;
        }

        if !options.config_rules.is_empty() {
            merge_rules(&mut rules, compile_rules(&options.config_rules)?);
        }

        for path in options.custom_rules.iter().chain(&options.extra_rule_files) {
            let set = load_file(path)?;
            debug!(
                path = %path.display(),
                version = ?set.version.as_ref().map(ToString::to_string),
                rules = set.rules.len(),
                "merging rule file"
            );
            merge_rules(&mut rules, set.rules);
        }

        let active = options.policy.filter(&rules);
        info!(
            rules = rules.len(),
            active = active.len(),
            strict = options.policy.strict,
            "rule set ready"
        );

        Ok(Self {
            rules,
            active,
            engine: Engine::new(options.policy.strict),
            values_file: options.values_file,
        })
    }

    /// The merged rule set, before policy filtering.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Rules that survive the policy and are evaluated by `check`.
    pub fn active_rules(&self) -> &[Rule] {
        &self.active
    }

    pub fn list_rules(&self) -> Vec<RuleSummary> {
        self.rules.iter().map(Rule::summary).collect()
    }

    /// Parse `files` module by module (one module per parent directory)
    /// and evaluate every active rule against every resource.
    pub fn check(&self, files: &[PathBuf]) -> Result<CheckResult> {
        let started = Instant::now();
        let scanned_at = Utc::now();

        let mut violations = Vec::new();
        let mut resources_found = 0;

        for (dir, group) in group_by_directory(files) {
            let module = parser::parse_files(&group, self.values_file.as_deref())?;
            debug!(
                dir = %dir.display(),
                files = group.len(),
                resources = module.resources.len(),
                "checking module"
            );
            resources_found += module.resources.len();

            for resource in &module.resources {
                violations.extend(
                    self.active
                        .iter()
                        .filter_map(|rule| self.engine.evaluate_rule(resource, rule)),
                );
            }
        }

        let result = CheckResult {
            violations,
            files_scanned: files.len(),
            resources_found,
            rules_evaluated: self.active.len(),
            duration: started.elapsed(),
            scanned_at,
        };
        info!(
            files = result.files_scanned,
            resources = result.resources_found,
            violations = result.violations.len(),
            "check complete"
        );
        Ok(result)
    }
}

fn group_by_directory(files: &[PathBuf]) -> IndexMap<PathBuf, Vec<PathBuf>> {
    let mut groups: IndexMap<PathBuf, Vec<PathBuf>> = IndexMap::new();
    for file in files {
        let dir = file.parent().map_or_else(PathBuf::new, Path::to_path_buf);
        groups.entry(dir).or_default().push(file.clone());
    }
    groups
}
