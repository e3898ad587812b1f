//! Structural errors raised during code generation.

use rispl_core::text::TextSpan;
use thiserror::Error;

/// An error in the program's structure, detected while generating code.
/// These are static errors: they fail compilation rather than becoming
/// deferred runtime rules.
#[derive(Debug, Clone, Error)]
pub enum AnalysisError {
    #[error("call to break not inside a loop")]
    BreakOutsideLoop { span: TextSpan },

    #[error("import must be a top-level expression")]
    ImportOutsideModule { span: TextSpan },

    #[error("use lambda when not defining a top-level function")]
    DefunOutsideModule { span: TextSpan },

    #[error("assignment supports only a simple dotted target, like o.field")]
    MultiDotAssignment { span: TextSpan },

    #[error("invalid assignment target")]
    InvalidAssignmentTarget { span: TextSpan },
}

impl AnalysisError {
    /// The source span the error points at.
    pub fn span(&self) -> TextSpan {
        match self {
            AnalysisError::BreakOutsideLoop { span }
            | AnalysisError::ImportOutsideModule { span }
            | AnalysisError::DefunOutsideModule { span }
            | AnalysisError::MultiDotAssignment { span }
            | AnalysisError::InvalidAssignmentTarget { span } => *span,
        }
    }
}
