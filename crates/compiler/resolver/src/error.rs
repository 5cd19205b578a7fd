//! Soft/hard failure distinction for resolution items.
//!
//! A *deferred* failure means "not resolvable yet": the item stays on the
//! worklist and its diagnostic is shown only by the final diagnostic pass.
//! A *fatal* failure aborts the batch and is reported immediately.

use thiserror::Error;

use yang_compiler_diagnostics::Diagnostic;

#[derive(Debug, Error, Clone)]
pub enum ResolveError {
    /// Not resolvable yet; may succeed in a later round once other items
    /// have resolved.
    #[error("unresolved: {}", .0.message)]
    Deferred(Diagnostic),
    /// Unrecoverable failure.
    #[error("{}", .0.message)]
    Fatal(Diagnostic),
}

impl ResolveError {
    pub fn deferred(diagnostic: Diagnostic) -> Self {
        Self::Deferred(diagnostic)
    }

    pub fn fatal(diagnostic: Diagnostic) -> Self {
        Self::Fatal(diagnostic)
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }

    pub fn into_diagnostic(self) -> Diagnostic {
        match self {
            Self::Deferred(d) | Self::Fatal(d) => d,
        }
    }

    pub fn diagnostic(&self) -> &Diagnostic {
        match self {
            Self::Deferred(d) | Self::Fatal(d) => d,
        }
    }
}

pub type ResolveResult<T = ()> = Result<T, ResolveError>;
