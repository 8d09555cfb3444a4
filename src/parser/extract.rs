//! Second pass: turn `resource` blocks into [`Resource`]s.

use hcl::{Body, Structure};
use indexmap::IndexMap;

use super::eval::EvalContext;
use super::SourceDocument;
use crate::ir::{Attributes, Resource, Value};

/// Extract every `resource "KIND" "NAME"` block of a document, in
/// declaration order.
pub fn extract_resources(document: &SourceDocument, ctx: &EvalContext) -> Vec<Resource> {
    let mut resources = Vec::new();

    for (location, block) in document.located_blocks() {
        if block.identifier() != "resource" {
            continue;
        }
        let [kind, name] = block.labels() else {
            tracing::warn!(
                location = %location,
                labels = block.labels().len(),
                "resource block without exactly two labels, skipping"
            );
            continue;
        };

        resources.push(Resource {
            kind: kind.as_str().to_string(),
            name: name.as_str().to_string(),
            attributes: body_to_attributes(block.body(), ctx),
            location,
        });
    }

    resources
}

/// Evaluate a block body.
///
/// Nested blocks are grouped by type: a type that occurs once becomes an
/// Object, a type that occurs several times becomes a List of Objects in
/// source order. Rules written as `ingress[*].port` therefore find nothing
/// when there is a single `ingress` block, and `ingress.port` finds nothing
/// when there are several. `dynamic "X"` blocks make `X` Computed.
pub fn body_to_attributes(body: &Body, ctx: &EvalContext) -> Attributes {
    let mut attributes = Attributes::new();
    let mut blocks: IndexMap<String, Vec<Value>> = IndexMap::new();
    let mut dynamic: Vec<String> = Vec::new();

    for structure in body.iter() {
        match structure {
            Structure::Attribute(attr) => {
                attributes.insert(attr.key().to_string(), ctx.evaluate(attr.expr()));
            }
            Structure::Block(block) if block.identifier() == "dynamic" => {
                if let Some(label) = block.labels().first() {
                    dynamic.push(label.as_str().to_string());
                }
            }
            Structure::Block(block) => {
                blocks
                    .entry(block.identifier().to_string())
                    .or_default()
                    .push(Value::Object(body_to_attributes(block.body(), ctx)));
            }
        }
    }

    for (name, mut occurrences) in blocks {
        let value = if occurrences.len() == 1 {
            occurrences.pop().unwrap_or(Value::Null)
        } else {
            Value::List(occurrences)
        };
        attributes.insert(name, value);
    }

    for name in dynamic {
        attributes.insert(name, Value::Computed);
    }

    attributes
}
