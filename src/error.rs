//! Error type shared across the query core.
//!
//! Programming errors (`InvalidUsage`, `Unsupported`) and missing-context
//! errors (`MissingKeysetValue`, `MissingParameter`) fail fast with a message
//! naming the offending element. Provider failures are carried through
//! `Execution` unchanged; nothing in this crate retries.

use std::fmt;

/// Error type for query building and execution.
#[derive(Debug)]
pub enum QuarryError {
    /// Caller misuse: null-required arguments, negative limits, projections
    /// of an unsupported shape. Never recoverable.
    InvalidUsage(String),
    /// A single-result query matched more rows than expected.
    ///
    /// `expected` lets callers distinguish "not found" (they get `Ok(None)`
    /// instead of this error) from "ambiguous".
    IncorrectResultSize { expected: usize, actual: usize },
    /// A keyset scroll position has no value for a sorted property.
    MissingKeysetValue(String),
    /// A named parameter placeholder with no matching method parameter.
    MissingParameter(String),
    /// The operation is not defined for this query kind (for example a count
    /// query against a stored procedure).
    Unsupported(String),
    /// Provider-level failure reported by the executor; propagated unchanged.
    Execution(String),
    /// Row or value conversion failure.
    Conversion(String),
}

impl fmt::Display for QuarryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuarryError::InvalidUsage(s) => {
                write!(f, "Invalid usage: {s}")
            }
            QuarryError::IncorrectResultSize { expected, actual } => {
                write!(
                    f,
                    "Incorrect result size: expected {expected}, actual {actual}"
                )
            }
            QuarryError::MissingKeysetValue(property) => {
                write!(
                    f,
                    "KeysetScrollPosition does not contain all keyset values; missing value for property '{property}'"
                )
            }
            QuarryError::MissingParameter(name) => {
                write!(f, "No method parameter found for binding '{name}'")
            }
            QuarryError::Unsupported(s) => {
                write!(f, "Unsupported operation: {s}")
            }
            QuarryError::Execution(s) => {
                write!(f, "Execution error: {s}")
            }
            QuarryError::Conversion(s) => {
                write!(f, "Conversion error: {s}")
            }
        }
    }
}

impl std::error::Error for QuarryError {}
