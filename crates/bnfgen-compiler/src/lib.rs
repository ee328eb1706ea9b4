//! bnfgen compiler: turns a grammar expression tree into recursive-descent
//! parser sources and a companion PSI class hierarchy.
//!
//! The pipeline:
//! - `analyze` - rule-inheritance relation and its transitive closure
//! - `codegen` - expression compilation, parser-unit dispatch, element-type
//!   holder, and PSI interface/implementation emission
//!
//! The grammar front-end and the cardinality analyzer behind
//! [`bnfgen_core::RuleGraph`] are external collaborators; this crate only
//! consumes their surfaces. Everything runs in one synchronous pass: the
//! derived maps are built up front, expression compilation accumulates the
//! referenced simple tokens as a side effect, and the element-type and PSI
//! emitters read the result.

use std::path::PathBuf;

pub mod analyze;
pub mod codegen;

#[cfg(test)]
pub mod test_utils;

pub use codegen::generator::{GeneratedFiles, Generator};

/// Errors that can occur during generation.
#[derive(Debug, thiserror::Error)]
pub enum GenError {
    /// Writing an output file (or its directory) failed.
    #[error("failed to write {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    DuplicateRule(#[from] bnfgen_core::DuplicateRule),

    #[error("grammar has no rules")]
    EmptyGrammar,

    /// A tree shape the compiler cannot translate; front-ends never
    /// produce these, so hitting one is a programming error upstream.
    #[error("unexpected expression in rule `{rule}`: {detail}")]
    UnexpectedExpression { rule: String, detail: String },
}

impl GenError {
    pub(crate) fn unexpected(rule: &str, detail: impl Into<String>) -> Self {
        GenError::UnexpectedExpression {
            rule: rule.to_string(),
            detail: detail.into(),
        }
    }
}

/// Result type for generator operations.
pub type Result<T> = std::result::Result<T, GenError>;
