//! Intermediate representation shared by the parser and the rule engine.
//!
//! The parser produces [`Resource`]s; the engine only ever reads them.

pub mod value;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use value::{Attributes, Value};

/// One declared `resource "KIND" "NAME" { ... }` block.
#[derive(Debug, Clone, Serialize)]
pub struct Resource {
    /// Resource type, e.g. `aws_s3_bucket`.
    pub kind: String,
    /// Local name of the block.
    pub name: String,
    /// Evaluated attributes and nested blocks.
    pub attributes: Attributes,
    /// Where the block starts.
    pub location: SourceLocation,
}

impl Resource {
    /// `kind.name`, the address Terraform uses for the resource.
    pub fn address(&self) -> String {
        format!("{}.{}", self.kind, self.name)
    }
}

/// Location in source code (1-based line and column).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceLocation {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    /// Builds a location from a byte offset into `content`.
    pub fn from_offset(file: impl Into<PathBuf>, content: &str, offset: usize) -> Self {
        let offset = offset.min(content.len());
        let before = content.get(..offset).unwrap_or(content);
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |pos| pos + 1);
        let column = before.get(line_start..).map_or(0, |s| s.chars().count()) + 1;
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}
