//! Rule set loading.
//!
//! All formats decode into the same format-agnostic [`RuleDef`] /
//! [`ConditionDef`] pair, which is then validated into [`Rule`]s:
//!
//! - YAML: a `rules:` list, optionally with a top-level `version:`
//! - HCL: `rule "ID" { ... }` blocks with nested `condition` blocks
//! - TOML: `[[rules]]` tables embedded in `.gatekeeper.toml`
//!
//! A load call either produces every rule or fails; nothing is partially
//! applied.

use std::collections::HashSet;
use std::path::Path;

use hcl::Structure;
use serde::{Deserialize, Serialize};

use super::condition::{Check, CheckOperator, Condition};
use super::{Rule, Severity};
use crate::error::{GatekeeperError, Result};
use crate::ir::Value;
use crate::parser::EvalContext;

/// Rule as written in a rule file, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleDef {
    pub id: String,
    pub name: String,
    pub description: String,
    pub severity: String,
    #[serde(alias = "resource_kind")]
    pub resource_type: String,
    pub condition: Option<ConditionDef>,
    pub message: String,
    pub remediation: String,
    pub tags: Vec<String>,
}

/// Condition node as written in a rule file, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionDef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    pub operator: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(alias = "children", skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ConditionDef>,
}

/// Validated rules of one source.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub version: Option<semver::Version>,
    pub rules: Vec<Rule>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RuleFileDef {
    version: Option<String>,
    rules: Vec<RuleDef>,
}

/// Rule file syntax, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFormat {
    Yaml,
    Hcl,
}

impl RuleFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "hcl" => Some(Self::Hcl),
            _ => None,
        }
    }

    pub fn load(self, source_name: &str, content: &str) -> Result<RuleSet> {
        match self {
            Self::Yaml => load_yaml(source_name, content),
            Self::Hcl => load_hcl(source_name, content),
        }
    }
}

/// Load a rule file, picking the decoder from its extension.
pub fn load_file(path: &Path) -> Result<RuleSet> {
    let source_name = path.display().to_string();
    let format = RuleFormat::from_path(path).ok_or_else(|| GatekeeperError::Load {
        source_name: source_name.clone(),
        message: "unsupported rule file extension (expected .yaml, .yml or .hcl)".into(),
    })?;

    tracing::info!(path = %source_name, "loading rule file");
    let content = std::fs::read_to_string(path)?;
    format.load(&source_name, &content)
}

pub fn load_yaml(source_name: &str, content: &str) -> Result<RuleSet> {
    if content.trim().is_empty() {
        return Ok(RuleSet::default());
    }
    let file: RuleFileDef =
        serde_yaml::from_str(content).map_err(|e| load_error(source_name, e))?;
    build_rule_set(source_name, file)
}

pub fn load_hcl(source_name: &str, content: &str) -> Result<RuleSet> {
    let body = hcl::parse(content).map_err(|e| load_error(source_name, e))?;

    let mut file = RuleFileDef::default();
    for structure in body.iter() {
        match structure {
            Structure::Attribute(attr) if attr.key() == "version" => {
                match EvalContext::default().evaluate(attr.expr()) {
                    Value::String(version) => file.version = Some(version),
                    other => {
                        return Err(load_error(
                            source_name,
                            format!("`version` must be a string, got {}", other.type_name()),
                        ))
                    }
                }
            }
            Structure::Block(block) if block.identifier() == "rule" => {
                let index = file.rules.len();
                let def = rule_def_from_block(block).map_err(|message| {
                    let label = block
                        .labels()
                        .first()
                        .map_or_else(|| format!("#{index}"), |l| l.as_str().to_string());
                    GatekeeperError::rule(label, message)
                })?;
                file.rules.push(def);
            }
            Structure::Attribute(attr) => {
                return Err(load_error(
                    source_name,
                    format!("unexpected top-level attribute `{}`", attr.key()),
                ))
            }
            Structure::Block(block) => {
                return Err(load_error(
                    source_name,
                    format!("unexpected top-level block `{}`", block.identifier()),
                ))
            }
        }
    }

    build_rule_set(source_name, file)
}

/// Validate a batch of rule definitions. Duplicate ids within the batch are
/// an error.
pub fn compile_rules(defs: &[RuleDef]) -> Result<Vec<Rule>> {
    let mut seen = HashSet::new();
    let mut rules = Vec::with_capacity(defs.len());

    for (index, def) in defs.iter().enumerate() {
        let rule = def.compile(index)?;
        if !seen.insert(rule.id.clone()) {
            return Err(GatekeeperError::rule(rule.id, "duplicate rule id"));
        }
        rules.push(rule);
    }

    Ok(rules)
}

fn build_rule_set(source_name: &str, file: RuleFileDef) -> Result<RuleSet> {
    let version = file
        .version
        .map(|v| {
            semver::Version::parse(v.trim())
                .map_err(|e| load_error(source_name, format!("invalid version `{v}`: {e}")))
        })
        .transpose()?;

    let rules = compile_rules(&file.rules)?;
    tracing::debug!(
        source = source_name,
        rules = rules.len(),
        checks = rules.iter().map(|r| r.condition.check_count()).sum::<usize>(),
        "rule set loaded"
    );

    Ok(RuleSet { version, rules })
}

fn load_error(source_name: &str, message: impl ToString) -> GatekeeperError {
    GatekeeperError::Load {
        source_name: source_name.to_string(),
        message: message.to_string(),
    }
}

impl RuleDef {
    /// Validate into a [`Rule`]. Fields are checked in order: id, name,
    /// severity, resource type, condition, message. `index` names the rule
    /// in errors when it has no id.
    pub fn compile(&self, index: usize) -> Result<Rule> {
        let id = self.id.trim();
        let label = if id.is_empty() {
            format!("#{index}")
        } else {
            id.to_string()
        };
        let fail = |message: String| GatekeeperError::rule(label.clone(), message);

        if id.is_empty() {
            return Err(fail("missing `id`".into()));
        }
        if self.name.trim().is_empty() {
            return Err(fail("missing `name`".into()));
        }
        let severity = if self.severity.trim().is_empty() {
            return Err(fail("missing `severity`".into()));
        } else {
            Severity::from_str_lenient(&self.severity).ok_or_else(|| {
                fail(format!(
                    "invalid severity `{}` (expected error, warning or info)",
                    self.severity
                ))
            })?
        };
        if self.resource_type.trim().is_empty() {
            return Err(fail("missing `resource_type`".into()));
        }
        let condition = self
            .condition
            .as_ref()
            .ok_or_else(|| fail("missing `condition`".into()))?
            .compile("condition")
            .map_err(fail)?;
        if self.message.trim().is_empty() {
            return Err(fail("missing `message`".into()));
        }

        Ok(Rule {
            id: id.to_string(),
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            severity,
            resource_kind: self.resource_type.trim().to_string(),
            condition,
            message: self.message.clone(),
            remediation: self.remediation.trim().to_string(),
            tags: self
                .tags
                .iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
        })
    }
}

const LOGICAL_OPERATORS: [&str; 3] = ["all", "any", "not"];

impl ConditionDef {
    /// Validate into a [`Condition`]. `path` locates the node in errors,
    /// e.g. `condition.conditions[1]`.
    pub fn compile(&self, path: &str) -> std::result::Result<Condition, String> {
        let operator = self.operator.trim().to_lowercase();

        match operator.as_str() {
            "" => Err(format!("{path}: missing `operator`")),
            "all" | "any" | "not" => {
                if self.attribute.as_deref().is_some_and(|a| !a.trim().is_empty()) {
                    return Err(format!("{path}: `{operator}` cannot have an attribute"));
                }
                if self.conditions.is_empty() {
                    return Err(format!(
                        "{path}: `{operator}` needs at least one child condition"
                    ));
                }

                let mut children = self
                    .conditions
                    .iter()
                    .enumerate()
                    .map(|(i, child)| child.compile(&format!("{path}.conditions[{i}]")))
                    .collect::<std::result::Result<Vec<_>, _>>()?;

                match operator.as_str() {
                    "all" => Ok(Condition::All(children)),
                    "any" => Ok(Condition::Any(children)),
                    _ => match (children.pop(), children.is_empty()) {
                        (Some(child), true) => Ok(Condition::Not(Box::new(child))),
                        _ => Err(format!("{path}: `not` takes exactly one child condition")),
                    },
                }
            }
            other => {
                let op = CheckOperator::parse(other).ok_or_else(|| unknown_operator(path, other))?;
                if !self.conditions.is_empty() {
                    return Err(format!("{path}: `{op}` check cannot have child conditions"));
                }
                Check::new(
                    self.attribute.clone().unwrap_or_default(),
                    op,
                    self.value.clone().map(Value::from),
                )
                .map(Condition::Check)
                .map_err(|e| format!("{path}: {e}"))
            }
        }
    }
}

fn unknown_operator(path: &str, operator: &str) -> String {
    let suggestion = CheckOperator::ALL
        .iter()
        .map(|op| op.as_str())
        .chain(LOGICAL_OPERATORS)
        .map(|candidate| (levenshtein::levenshtein(operator, candidate), candidate))
        .filter(|(distance, _)| *distance <= 2)
        .min();

    match suggestion {
        Some((_, candidate)) => {
            format!("{path}: unknown operator `{operator}` (did you mean `{candidate}`?)")
        }
        None => format!("{path}: unknown operator `{operator}`"),
    }
}

fn rule_def_from_block(block: &hcl::Block) -> std::result::Result<RuleDef, String> {
    let mut def = RuleDef {
        id: block
            .labels()
            .first()
            .map(|label| label.as_str().to_string())
            .unwrap_or_default(),
        ..RuleDef::default()
    };

    let literal = EvalContext::default();
    for attr in block.body().attributes() {
        let value = literal.evaluate(attr.expr());
        match attr.key() {
            "id" => def.id = expect_string("id", value)?,
            "name" => def.name = expect_string("name", value)?,
            "description" => def.description = expect_string("description", value)?,
            "severity" => def.severity = expect_string("severity", value)?,
            "resource_type" | "resource_kind" => {
                def.resource_type = expect_string(attr.key(), value)?;
            }
            "message" => def.message = expect_string("message", value)?,
            "remediation" => def.remediation = expect_string("remediation", value)?,
            "tags" => def.tags = expect_string_list("tags", value)?,
            other => return Err(format!("unknown attribute `{other}`")),
        }
    }

    let mut conditions = block.body().blocks().filter(|b| b.identifier() == "condition");
    def.condition = match (conditions.next(), conditions.next()) {
        (None, _) => None,
        (Some(condition), None) => Some(condition_def_from_block(condition)?),
        (Some(_), Some(_)) => {
            return Err(
                "more than one top-level `condition` block; combine them with `all` or `any`"
                    .into(),
            )
        }
    };

    if let Some(other) = block.body().blocks().find(|b| b.identifier() != "condition") {
        return Err(format!("unknown block `{}`", other.identifier()));
    }

    Ok(def)
}

fn condition_def_from_block(block: &hcl::Block) -> std::result::Result<ConditionDef, String> {
    let mut def = ConditionDef::default();
    let literal = EvalContext::default();

    for attr in block.body().attributes() {
        let value = literal.evaluate(attr.expr());
        match attr.key() {
            "attribute" => def.attribute = Some(expect_string("attribute", value)?),
            "operator" => def.operator = expect_string("operator", value)?,
            "value" => {
                if value.contains_indeterminate() {
                    return Err("condition `value` must be a literal".into());
                }
                def.value = Some(serde_json::to_value(&value).map_err(|e| e.to_string())?);
            }
            other => return Err(format!("unknown condition attribute `{other}`")),
        }
    }

    for child in block.body().blocks() {
        if child.identifier() != "condition" {
            return Err(format!("unknown block `{}` inside condition", child.identifier()));
        }
        def.conditions.push(condition_def_from_block(child)?);
    }

    Ok(def)
}

fn expect_string(key: &str, value: Value) -> std::result::Result<String, String> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(format!("`{key}` must be a string, got {}", other.type_name())),
    }
}

fn expect_string_list(key: &str, value: Value) -> std::result::Result<Vec<String>, String> {
    match value {
        Value::List(items) => items
            .into_iter()
            .map(|item| expect_string(key, item))
            .collect(),
        other => Err(format!("`{key}` must be a list of strings, got {}", other.type_name())),
    }
}
