//! Partial evaluation of HCL expressions.
//!
//! Only literals and `var.*` / `local.*` substitution are resolved. Everything
//! that would need the real Terraform runtime (functions, conditionals,
//! resource references, operators, splats) becomes [`Value::Computed`];
//! references to variables or locals without a value become
//! [`Value::Unknown`].

use hcl::template::Element;
use hcl::{Expression, ObjectKey, Template, TemplateExpr, Traversal, TraversalOperator};
use indexmap::IndexMap;

use crate::ir::{Attributes, Value};

/// Variable and local tables for one directory.
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    variables: IndexMap<String, Value>,
    locals: IndexMap<String, Value>,
}

impl EvalContext {
    pub fn new(variables: IndexMap<String, Value>, locals: IndexMap<String, Value>) -> Self {
        Self { variables, locals }
    }

    pub fn variables(&self) -> &IndexMap<String, Value> {
        &self.variables
    }

    pub fn locals(&self) -> &IndexMap<String, Value> {
        &self.locals
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    pub fn set_local(&mut self, name: impl Into<String>, value: Value) {
        self.locals.insert(name.into(), value);
    }

    /// Evaluate one expression.
    pub fn evaluate(&self, expr: &Expression) -> Value {
        match expr {
            Expression::Null => Value::Null,
            Expression::Bool(b) => Value::Bool(*b),
            Expression::Number(n) => Value::from(n),
            Expression::String(s) => Value::String(s.clone()),
            Expression::Array(items) => Value::List(items.iter().map(|e| self.evaluate(e)).collect()),
            Expression::Object(object) => {
                let mut map = Attributes::new();
                for (key, value) in object.iter() {
                    if let Some(key) = self.object_key(key) {
                        map.insert(key, self.evaluate(value));
                    }
                }
                Value::Object(map)
            }
            Expression::TemplateExpr(template) => self.evaluate_template(template),
            Expression::Traversal(traversal) => self.evaluate_traversal(traversal),
            Expression::Parenthesis(inner) => self.evaluate(inner),
            // bare identifiers, function calls, conditionals, operators, for expressions
            _ => Value::Computed,
        }
    }

    fn object_key(&self, key: &ObjectKey) -> Option<String> {
        match key {
            ObjectKey::Identifier(ident) => Some(ident.as_str().to_string()),
            ObjectKey::Expression(expr) => match self.evaluate(expr) {
                Value::String(s) => Some(s),
                other => {
                    tracing::debug!(key_type = other.type_name(), "dropping non-string object key");
                    None
                }
            },
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }

    fn evaluate_template(&self, template_expr: &TemplateExpr) -> Value {
        let Ok(template) = Template::from_expr(template_expr) else {
            return Value::Computed;
        };

        match template.elements() {
            [Element::Interpolation(interpolation)] => self.evaluate(&interpolation.expr),
            elements => {
                let mut text = String::new();
                for element in elements {
                    match element {
                        Element::Literal(literal) => text.push_str(literal),
                        _ => return Value::Computed,
                    }
                }
                Value::String(text)
            }
        }
    }

    fn evaluate_traversal(&self, traversal: &Traversal) -> Value {
        let Expression::Variable(root) = &traversal.expr else {
            return Value::Computed;
        };

        let table = match root.as_str() {
            "var" => &self.variables,
            "local" => &self.locals,
            _ => return Value::Computed,
        };

        let Some((TraversalOperator::GetAttr(name), rest)) = traversal.operators.split_first()
        else {
            return Value::Computed;
        };

        match table.get(name.as_str()) {
            Some(value) => self.navigate(value.clone(), rest),
            None => Value::Unknown,
        }
    }

    /// Follow attribute/index steps into an already resolved value.
    fn navigate(&self, mut current: Value, operators: &[TraversalOperator]) -> Value {
        for operator in operators {
            if current.is_indeterminate() {
                return current;
            }
            current = match operator {
                TraversalOperator::GetAttr(ident) => lookup_key(current, ident.as_str()),
                TraversalOperator::Index(expr) => match self.evaluate(expr) {
                    Value::Int(index) => lookup_index(current, index),
                    Value::String(key) => lookup_key(current, &key),
                    Value::Computed => Value::Computed,
                    _ => Value::Unknown,
                },
                TraversalOperator::LegacyIndex(index) => match i64::try_from(*index) {
                    Ok(index) => lookup_index(current, index),
                    Err(_) => Value::Unknown,
                },
                _ => Value::Computed,
            };
        }
        current
    }
}

fn lookup_key(value: Value, key: &str) -> Value {
    match value {
        Value::Object(mut map) => map.swap_remove(key).unwrap_or(Value::Unknown),
        _ => Value::Unknown,
    }
}

fn lookup_index(value: Value, index: i64) -> Value {
    match value {
        Value::List(items) => usize::try_from(index)
            .ok()
            .and_then(|i| items.into_iter().nth(i))
            .unwrap_or(Value::Unknown),
        _ => Value::Unknown,
    }
}
