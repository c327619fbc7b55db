//! Error types shared across the jsonsieve crates.

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for filter compilation.
///
/// All variants are user-input or compile-time failures. Evaluation itself
/// never fails: missing fields and type mismatches resolve to false at the
/// leaf that observed them.
#[derive(Error, Debug)]
pub enum Error {
    /// Expression string is empty
    #[error("empty filter expression")]
    EmptyInput,

    /// Parentheses are not balanced at the expression level
    #[error("malformed parenthesis: {open} opening vs {close} closing")]
    MalformedParenthesis {
        /// Number of `(` tokens
        open: usize,
        /// Number of `)` tokens
        close: usize,
    },

    /// Grammar mismatch; message carries location and token
    #[error("parse error: {0}")]
    Parse(String),

    /// Pattern could not be compiled
    #[error("malformed regex: {0}")]
    MalformedRegex(String),

    /// Tree validation failed (a bug in the lowerer)
    #[error("malformed tree: {0}")]
    MalformedTree(String),

    /// Unknown function name
    #[error("not found: {0}")]
    NotFound(String),
}

impl Error {
    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }

    /// Create a malformed regex error
    pub fn malformed_regex(msg: impl Into<String>) -> Self {
        Error::MalformedRegex(msg.into())
    }

    /// Create a malformed tree error
    pub fn malformed_tree(msg: impl Into<String>) -> Self {
        Error::MalformedTree(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }
}
