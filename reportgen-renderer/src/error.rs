//! Error types for reportgen-renderer.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::TemplateId;

/// Block-structure mistake found while parsing a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    UnclosedBlock { condition: String },
    UnexpectedElse,
    DuplicateElse { condition: String },
    UnexpectedEndIf,
    NestedBlock { outer: String },
    EmptyCondition,
    InvalidConditionName(String),
}

impl fmt::Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyntaxErrorKind::UnclosedBlock { condition } => {
                write!(f, "block '{condition}' is never closed with {{{{/if}}}}")
            }
            SyntaxErrorKind::UnexpectedElse => f.write_str("{{else}} outside of a block"),
            SyntaxErrorKind::DuplicateElse { condition } => {
                write!(f, "block '{condition}' has more than one {{{{else}}}}")
            }
            SyntaxErrorKind::UnexpectedEndIf => f.write_str("{{/if}} without a matching {{#if}}"),
            SyntaxErrorKind::NestedBlock { outer } => {
                write!(f, "blocks cannot be nested (inside '{outer}')")
            }
            SyntaxErrorKind::EmptyCondition => f.write_str("{{#if}} needs a condition name"),
            SyntaxErrorKind::InvalidConditionName(name) => {
                write!(f, "invalid condition name '{name}'")
            }
        }
    }
}

/// Errors from parsing or resolving a single template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("syntax error at line {line}, column {column}: {kind}")]
    Syntax {
        line: usize,
        column: usize,
        kind: SyntaxErrorKind,
    },

    /// The template tests a condition the caller never supplied.
    #[error("condition '{name}' used at line {line}, column {column} was not supplied")]
    MissingCondition {
        name: String,
        line: usize,
        column: usize,
    },
}

/// All errors that can arise from rendering operations.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no template for {0}")]
    UnknownTemplate(TemplateId),

    #[error("template {id}: {source}")]
    Template {
        id: String,
        #[source]
        source: TemplateError,
    },

    /// Tera error while building the brand style block.
    #[error("style block error: {0}")]
    Tera(#[from] tera::Error),

    /// Filesystem error while loading template overrides.
    #[error("template io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An override file does not name a known theme/page pair.
    #[error("override {path} does not match <theme>/<page>.html in the catalog")]
    UnknownOverride { path: PathBuf },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
    RenderError::Io {
        path: path.into(),
        source,
    }
}
