//! First pass: build the variable and local tables for a directory.

use std::path::Path;

use hcl::{Expression, Structure};
use indexmap::IndexMap;

use super::eval::EvalContext;
use super::SourceDocument;
use crate::error::{GatekeeperError, Result};
use crate::ir::Value;

/// Collect `variable` defaults and `locals` from every document, then apply
/// the values file on top of the defaults.
pub fn discover(documents: &[SourceDocument], values_file: Option<&Path>) -> Result<EvalContext> {
    let literal = EvalContext::default();
    let mut ctx = EvalContext::default();
    let mut local_exprs: Vec<(String, Expression)> = Vec::new();

    for document in documents {
        for block in document.root_blocks() {
            match block.identifier() {
                "variable" => {
                    let Some(name) = block.labels().first() else {
                        tracing::warn!(path = %document.path.display(), "variable block without a name");
                        continue;
                    };
                    let default = block
                        .body()
                        .attributes()
                        .find(|attr| attr.key() == "default");
                    if let Some(default) = default {
                        ctx.set_variable(name.as_str(), literal.evaluate(default.expr()));
                    }
                }
                "locals" => {
                    for attr in block.body().attributes() {
                        local_exprs.push((attr.key().to_string(), attr.expr().clone()));
                    }
                }
                _ => {}
            }
        }
    }

    if let Some(path) = values_file {
        for (name, value) in load_values_file(path)? {
            tracing::debug!(variable = %name, "overriding variable from values file");
            ctx.set_variable(name, value);
        }
    }

    resolve_locals(&mut ctx, &local_exprs);

    tracing::debug!(
        variables = ctx.variables().len(),
        locals = ctx.locals().len(),
        "discovery pass complete"
    );
    Ok(ctx)
}

/// Parse a `.tfvars` file: top-level `name = expr` assignments.
pub fn load_values_file(path: &Path) -> Result<IndexMap<String, Value>> {
    let content = std::fs::read_to_string(path)?;
    let body: hcl::Body = hcl::parse(&content).map_err(|e| GatekeeperError::Parse {
        file: path.display().to_string(),
        message: e.to_string(),
    })?;

    let literal = EvalContext::default();
    let mut values = IndexMap::new();
    for structure in body.iter() {
        if let Structure::Attribute(attr) = structure {
            values.insert(attr.key().to_string(), literal.evaluate(attr.expr()));
        }
    }
    Ok(values)
}

/// Locals may refer to other locals declared later, so evaluation repeats
/// until a pass no longer changes anything. Each pass can resolve at least
/// one more local, which bounds the number of passes.
fn resolve_locals(ctx: &mut EvalContext, local_exprs: &[(String, Expression)]) {
    for (name, expr) in local_exprs {
        let value = ctx.evaluate(expr);
        ctx.set_local(name.clone(), value);
    }

    for _ in 0..local_exprs.len() {
        let mut changed = false;
        for (name, expr) in local_exprs {
            let value = ctx.evaluate(expr);
            if ctx.locals().get(name) != Some(&value) {
                ctx.set_local(name.clone(), value);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SourceDocument;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn doc(source: &str) -> SourceDocument {
        SourceDocument::parse("main.tf", source.to_string()).unwrap()
    }

    #[test]
    fn collects_variable_defaults() {
        let ctx = discover(
            &[doc(r#"
                variable "name" { default = "bucket" }
                variable "no_default" { type = string }
                variable "ports" { default = [22, 443] }
            "#)],
            None,
        )
        .unwrap();

        assert_eq!(ctx.variables()["name"], Value::from("bucket"));
        assert_eq!(ctx.variables()["ports"], Value::List(vec![Value::Int(22), Value::Int(443)]));
        assert!(!ctx.variables().contains_key("no_default"));
    }

    #[test]
    fn values_file_overrides_defaults() {
        let mut values = tempfile::NamedTempFile::new().unwrap();
        writeln!(values, "bucket_name = \"custom-bucket\"").unwrap();

        let ctx = discover(
            &[doc(r#"variable "bucket_name" { default = "default-bucket" }"#)],
            Some(values.path()),
        )
        .unwrap();

        assert_eq!(ctx.variables()["bucket_name"], Value::from("custom-bucket"));
    }

    #[test]
    fn invalid_values_file_is_a_parse_error() {
        let mut values = tempfile::NamedTempFile::new().unwrap();
        writeln!(values, "this is = = not hcl").unwrap();

        let err = discover(&[], Some(values.path())).unwrap_err();
        assert!(matches!(err, GatekeeperError::Parse { .. }));
    }

    #[test]
    fn locals_resolve_variables_and_forward_references() {
        let ctx = discover(
            &[
                doc(r#"
                    locals {
                      full = local.prefix
                      prefix = var.env
                    }
                "#),
                doc(r#"variable "env" { default = "prod" }"#),
            ],
            None,
        )
        .unwrap();

        assert_eq!(ctx.locals()["prefix"], Value::from("prod"));
        assert_eq!(ctx.locals()["full"], Value::from("prod"));
    }

    #[test]
    fn locals_without_resolvable_inputs_stay_unknown() {
        let ctx = discover(&[doc("locals { a = var.missing }")], None).unwrap();
        assert_eq!(ctx.locals()["a"], Value::Unknown);
    }
}
