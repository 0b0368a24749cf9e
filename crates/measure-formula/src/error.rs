//! Formula error types

use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Hard failures of the compiler
///
/// Everything a user can get wrong in a formula is reported as a
/// [`ValidationMessage`](measure_formula_core::ValidationMessage) instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormulaError {
    /// Formula parse error at a byte offset of the canonical text
    #[error("Parse error at {offset}: {message}")]
    Parse { offset: usize, message: String },

    /// Formula nesting exceeds the configured depth
    #[error("Formula nesting exceeds the maximum depth of {0}")]
    NestingTooDeep(usize),

    /// Fields were requested before the structure members were loaded
    #[error("Structure member metadata has not been loaded yet")]
    MetadataNotLoaded,

    /// Capability-gated editor surface that this crate does not provide
    #[error("Not implemented here: {0}")]
    NotImplemented(&'static str),

    /// Error from the core crate
    #[error(transparent)]
    Core(measure_formula_core::Error),
}

impl From<measure_formula_core::Error> for FormulaError {
    fn from(err: measure_formula_core::Error) -> Self {
        match err {
            measure_formula_core::Error::MetadataNotLoaded => FormulaError::MetadataNotLoaded,
            other => FormulaError::Core(other),
        }
    }
}

impl FormulaError {
    pub(crate) fn parse(offset: usize, message: impl Into<String>) -> Self {
        FormulaError::Parse {
            offset,
            message: message.into(),
        }
    }
}
