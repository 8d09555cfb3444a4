//! Terraform/OpenTofu configuration extraction.
//!
//! Parsing is two passes over a set of `.tf` files that form one module:
//! 1. [`discovery`] builds the variable and local tables
//! 2. [`extract`] evaluates every `resource` block against those tables
//!
//! Files are parsed with `hcl-edit` to keep spans for source locations, then
//! converted into the simpler `hcl-rs` tree for evaluation.

pub mod discovery;
pub mod eval;
pub mod extract;

use std::path::{Path, PathBuf};

use hcl_edit::structure::Structure;
use hcl_edit::Span;

use crate::error::{GatekeeperError, Result};
use crate::ir::{Resource, SourceLocation};

pub use eval::EvalContext;

/// A parsed source file: its path and its root blocks with their offsets.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub path: PathBuf,
    content: String,
    blocks: Vec<(usize, hcl::Block)>,
}

impl SourceDocument {
    /// Read and parse one file.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "parsing file");
        let content = std::fs::read_to_string(path)?;
        Self::parse(path, content)
    }

    /// Parse already loaded content.
    pub fn parse(path: impl Into<PathBuf>, content: String) -> Result<Self> {
        let path = path.into();
        let body = hcl_edit::parser::parse_body(&content).map_err(|e| GatekeeperError::Parse {
            file: path.display().to_string(),
            message: e.to_string(),
        })?;

        let mut blocks = Vec::new();
        for structure in body {
            if let Structure::Block(block) = structure {
                let offset = block.span().map_or(0, |span| span.start);
                blocks.push((offset, hcl::Block::from(block)));
            }
        }

        Ok(Self {
            path,
            content,
            blocks,
        })
    }

    pub fn root_blocks(&self) -> impl Iterator<Item = &hcl::Block> {
        self.blocks.iter().map(|(_, block)| block)
    }

    pub fn located_blocks(&self) -> impl Iterator<Item = (SourceLocation, &hcl::Block)> {
        self.blocks.iter().map(|(offset, block)| {
            (
                SourceLocation::from_offset(&self.path, &self.content, *offset),
                block,
            )
        })
    }
}

/// Resources of one module together with the tables used to evaluate them.
#[derive(Debug, Clone, Default)]
pub struct ParsedModule {
    pub resources: Vec<Resource>,
    pub context: EvalContext,
    pub files: Vec<PathBuf>,
}

/// Parse an explicit list of files as one module.
///
/// Any file with invalid syntax fails the whole call.
pub fn parse_files(files: &[PathBuf], values_file: Option<&Path>) -> Result<ParsedModule> {
    let documents = files
        .iter()
        .map(|path| SourceDocument::load(path))
        .collect::<Result<Vec<_>>>()?;

    let context = discovery::discover(&documents, values_file)?;

    let resources: Vec<Resource> = documents
        .iter()
        .flat_map(|document| extract::extract_resources(document, &context))
        .collect();

    tracing::debug!(
        files = documents.len(),
        resources = resources.len(),
        "extraction pass complete"
    );

    Ok(ParsedModule {
        resources,
        context,
        files: files.to_vec(),
    })
}

/// Parse every `*.tf` file directly inside `dir` (sorted by file name).
pub fn parse_directory(dir: &Path, values_file: Option<&Path>) -> Result<ParsedModule> {
    let files = collect_source_files(dir, false)?;
    parse_files(&files, values_file)
}

/// Find `*.tf` files below `root`, sorted by path. Hidden directories such
/// as `.terraform` and gitignored files are skipped.
pub fn collect_source_files(root: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    if !root.is_dir() {
        return Err(GatekeeperError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} is not a file or directory", root.display()),
        )));
    }

    let walker = ignore::WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .max_depth(if recursive { None } else { Some(1) })
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut files = Vec::new();
    for entry in walker.flatten() {
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "tf") {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}
