use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GatekeeperError, Result};
use crate::output::OutputFormat;
use crate::rules::policy::Policy;
use crate::rules::RuleDef;

/// File name looked up in the scanned directory.
pub const CONFIG_FILE_NAME: &str = ".gatekeeper.toml";

/// Top-level configuration from `.gatekeeper.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub policy: Policy,
    #[serde(default)]
    pub output: OutputConfig,
    /// Project rules, layered over the built-ins.
    #[serde(default)]
    pub rules: Vec<RuleDef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: Option<String>,
}

impl Config {
    /// Load config from a TOML file. Returns default if file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), rules = config.rules.len(), "config loaded");
        Ok(config)
    }

    /// Output format named in `[output]`, if any.
    pub fn output_format(&self) -> Result<Option<OutputFormat>> {
        self.output
            .format
            .as_deref()
            .map(|name| {
                OutputFormat::from_str_lenient(name).ok_or_else(|| {
                    GatekeeperError::Config(format!("unknown output format `{name}`"))
                })
            })
            .transpose()
    }

    /// Generate a starter config file.
    pub fn starter_toml() -> &'static str {
        r#"# tf-gatekeeper configuration

[policy]
# Least severe level still reported (error, warning, info).
min_severity = "info"

# Report checks that depend on unresolved values as violations.
strict = false

# Skip the built-in AWS rules.
# disable_builtin = true

# Rule IDs to ignore entirely.
# deny_rules = ["SG_002"]

# When set, only these rule IDs run.
# allow_rules = ["S3_001", "S3_002"]

[output]
# console or json
format = "console"

# Project rules. A rule with a built-in ID replaces it.
# [[rules]]
# id = "ORG_001"
# name = "Buckets carry an owner tag"
# severity = "warning"
# resource_type = "aws_s3_bucket"
# message = "Bucket '{{resource_name}}' has no Owner tag"
# [rules.condition]
# attribute = "tags.Owner"
# operator = "exists"
"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::loader::compile_rules;
    use crate::rules::Severity;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config.policy, Policy::default());
        assert!(config.rules.is_empty());
        assert_eq!(config.output_format().unwrap(), None);
    }

    #[test]
    fn starter_config_parses() {
        let config: Config = toml::from_str(Config::starter_toml()).unwrap();
        assert_eq!(config.policy.min_severity, Severity::Info);
        assert!(!config.policy.strict);
        assert_eq!(config.output_format().unwrap(), Some(OutputFormat::Console));
    }

    #[test]
    fn rules_section_compiles() {
        let config: Config = toml::from_str(
            r#"
[policy]
min_severity = "warning"

[[rules]]
id = "ORG_001"
name = "Owner tag"
severity = "warning"
resource_type = "aws_s3_bucket"
message = "no owner"

[rules.condition]
operator = "any"

[[rules.condition.conditions]]
attribute = "tags.Owner"
operator = "exists"

[[rules.condition.conditions]]
attribute = "tags.Team"
operator = "exists"
"#,
        )
        .unwrap();

        let rules = compile_rules(&config.rules).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].condition.check_count(), 2);
        assert_eq!(config.policy.min_severity, Severity::Warning);
    }

    #[test]
    fn unknown_output_format_is_a_config_error() {
        let config: Config = toml::from_str("[output]\nformat = \"sarif\"\n").unwrap();
        assert!(matches!(
            config.output_format(),
            Err(GatekeeperError::Config(_))
        ));
    }
}
