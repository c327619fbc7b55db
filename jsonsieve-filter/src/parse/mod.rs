//! Parser for the filter language.
//!
//! The parser consumes tokens (not raw `&str`) and produces the surface
//! AST. Failures carry the span of the offending token; the crate front
//! door resolves spans to line/column when building the public error.

mod expr;
mod stream;

pub use expr::parse_filter;
pub use stream::TokenStream;

use crate::span::SourceSpan;

/// A parse failure with the span of the offending token.
#[derive(Clone, Debug)]
pub struct ParseFailure {
    /// What went wrong
    pub message: String,
    /// Where it went wrong
    pub span: SourceSpan,
}

/// Result type for parser internals.
pub type PResult<T> = Result<T, ParseFailure>;
