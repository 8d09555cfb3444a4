//! tf-gatekeeper: static policy checks for Terraform/OpenTofu code.
//!
//! Offline-only: resources are read from HCL source, variables and locals
//! are substituted where they can be, and everything that would need
//! `terraform plan` is treated as unknown rather than guessed.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use gatekeeper::{scan, ScanOptions};
//!
//! let options = ScanOptions::default();
//! let result = scan(Path::new("./infra"), &options).unwrap();
//! println!("Resources: {}, violations: {}", result.resources_found, result.violations.len());
//! ```

pub mod checker;
pub mod config;
pub mod engine;
pub mod error;
pub mod ir;
pub mod output;
pub mod parser;
pub mod rules;

use std::path::{Path, PathBuf};

use checker::{CheckResult, Checker, CheckerOptions};
use config::{Config, CONFIG_FILE_NAME};
use error::Result;
use output::OutputFormat;
use rules::{RuleSummary, Severity};

/// Options for a scan invocation. Set fields override `.gatekeeper.toml`.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Path to config file (defaults to `.gatekeeper.toml` in the scan dir).
    pub config_path: Option<PathBuf>,
    /// Variable values file (`*.tfvars` syntax).
    pub values_file: Option<PathBuf>,
    /// Custom rule file layered over built-in and config rules.
    pub custom_rules: Option<PathBuf>,
    /// More rule files, layered after `custom_rules`.
    pub extra_rule_files: Vec<PathBuf>,
    /// Descend into subdirectories.
    pub recursive: bool,
    pub strict: Option<bool>,
    pub min_severity: Option<Severity>,
    pub disable_builtin: bool,
}

impl ScanOptions {
    /// Load the project config for `target` and apply these overrides.
    pub fn load_config(&self, target: &Path) -> Result<Config> {
        let config_path = self.config_path.clone().unwrap_or_else(|| {
            let dir = if target.is_file() {
                target.parent().unwrap_or(Path::new("."))
            } else {
                target
            };
            dir.join(CONFIG_FILE_NAME)
        });
        let mut config = Config::load(&config_path)?;

        if let Some(strict) = self.strict {
            config.policy.strict = strict;
        }
        if let Some(min_severity) = self.min_severity {
            config.policy.min_severity = min_severity;
        }
        if self.disable_builtin {
            config.policy.disable_builtin = true;
        }
        Ok(config)
    }

    fn checker(&self, config: Config) -> Result<Checker> {
        Checker::new(CheckerOptions {
            policy: config.policy,
            config_rules: config.rules,
            custom_rules: self.custom_rules.clone(),
            extra_rule_files: self.extra_rule_files.clone(),
            values_file: self.values_file.clone(),
        })
    }
}

/// Run a complete scan: load config, build the rule set, find `.tf` files
/// and check them.
pub fn scan(path: &Path, options: &ScanOptions) -> Result<CheckResult> {
    let config = options.load_config(path)?;
    let checker = options.checker(config)?;

    let files = parser::collect_source_files(path, options.recursive)?;
    tracing::info!(path = %path.display(), files = files.len(), "scanning");
    checker.check(&files)
}

/// Every rule the scan of the current directory would know about, after
/// layering and before policy filtering.
pub fn list_rules(options: &ScanOptions) -> Result<Vec<RuleSummary>> {
    let config = options.load_config(Path::new("."))?;
    Ok(options.checker(config)?.list_rules())
}

/// Output format for `path`: the explicit choice, else `[output] format`
/// from the config, else console.
pub fn resolve_format(
    path: &Path,
    options: &ScanOptions,
    explicit: Option<OutputFormat>,
) -> Result<OutputFormat> {
    if let Some(format) = explicit {
        return Ok(format);
    }
    Ok(options
        .load_config(path)?
        .output_format()?
        .unwrap_or(OutputFormat::Console))
}
