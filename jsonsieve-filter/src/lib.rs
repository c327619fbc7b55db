//! # jsonsieve filter language
//!
//! Surface compiler for boolean filter expressions over JSON documents.
//!
//! This crate provides:
//! - a winnow lexer producing spanned tokens
//! - a recursive-descent parser for the filter grammar (comparisons,
//!   IS-checks, `EXISTS`, `REGEXP_CONTAINS`, field arithmetic, numeric
//!   intrinsics)
//! - lowering into the engine IR of `jsonsieve-core`
//!
//! ## Quick start
//!
//! ```
//! use jsonsieve_core::Matcher;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let def = jsonsieve_filter::compile("a = 1 AND b IS NOT MISSING").unwrap();
//! let matcher = Matcher::new(Arc::new(def));
//! assert!(matcher.matches(&json!({"a": 1, "b": 2})));
//! assert!(!matcher.matches(&json!({"a": 1})));
//! ```

pub mod ast;
pub mod lex;
pub mod lower;
pub mod parse;
pub mod span;

use jsonsieve_core::error::{Error, Result};
use jsonsieve_core::tree::lower::{lower as lower_tree, MatchDef, OrMode};
use lex::TokenKind;
use span::LineIndex;
use tracing::debug;

/// Compile a filter expression into an executable match definition.
///
/// Pipeline: tokenize, check parenthesis balance across the whole
/// expression, parse, lower to the engine IR, lower to the decision tree.
pub fn compile(expression: &str) -> Result<MatchDef> {
    if expression.is_empty() {
        return Err(Error::EmptyInput);
    }

    let tokens = lex::tokenize(expression);

    // Lexer errors surface as parse errors with their location
    if let Some(token) = tokens
        .iter()
        .find(|t| matches!(t.kind, TokenKind::Error(_)))
    {
        let TokenKind::Error(message) = &token.kind else {
            unreachable!()
        };
        let at = LineIndex::new(expression).line_col(token.span.start);
        return Err(Error::parse(format!("{}: {}", at, message)));
    }

    // Parenthesis totals must agree before any structural parsing
    let open = tokens
        .iter()
        .filter(|t| t.kind == TokenKind::LParen)
        .count();
    let close = tokens
        .iter()
        .filter(|t| t.kind == TokenKind::RParen)
        .count();
    if open != close {
        return Err(Error::MalformedParenthesis { open, close });
    }

    debug!(tokens = tokens.len(), "tokenized filter expression");

    let mut stream = parse::TokenStream::new(tokens);
    let ast = parse::parse_filter(&mut stream).map_err(|failure| {
        let at = LineIndex::new(expression).line_col(failure.span.start);
        Error::parse(format!("{}: {}", at, failure.message))
    })?;

    let ir = lower::lower(&ast)?;
    lower_tree(&ir, OrMode::ShortCircuit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert!(matches!(compile(""), Err(Error::EmptyInput)));
    }

    #[test]
    fn test_whitespace_only_is_parse_error() {
        assert!(matches!(compile("   "), Err(Error::Parse(_))));
    }

    #[test]
    fn test_malformed_parenthesis_wins_over_parse_error() {
        assert!(matches!(
            compile("(a = 1"),
            Err(Error::MalformedParenthesis { open: 1, close: 0 })
        ));
        assert!(matches!(
            compile("a = 1)"),
            Err(Error::MalformedParenthesis { open: 0, close: 1 })
        ));
    }

    #[test]
    fn test_parse_error_carries_location() {
        let Err(Error::Parse(message)) = compile("a = ") else {
            panic!("expected parse error");
        };
        assert!(message.starts_with("1:"), "{}", message);
    }

    #[test]
    fn test_lexer_error_carries_location() {
        let Err(Error::Parse(message)) = compile("a ~ 1") else {
            panic!("expected parse error");
        };
        assert!(message.contains("unexpected character"), "{}", message);
    }

    #[test]
    fn test_bad_regex_is_malformed_regex() {
        assert!(matches!(
            compile("REGEXP_CONTAINS(a, \"(unclosed\")"),
            Err(Error::MalformedRegex(_))
        ));
    }

    #[test]
    fn test_compiles_whole_grammar_surface() {
        for source in [
            "a = 1",
            "a == 1 AND b != 2 OR c <> 3",
            "NOT (a < 1 OR b >= 2) AND c <= 3",
            "a IS NULL",
            "a IS NOT NULL AND b IS MISSING AND c IS NOT MISSING",
            "EXISTS(x.y[0])",
            "REGEXP_CONTAINS(name, \"^foo\")",
            "-price + 10 > 5",
            "ATAN2(y, x) > 0 AND POW(r,2) = 4",
            "SQRT(ABS(delta)) < 2.5",
            "DATE(updated) >= DATE(\"2021-01-02\")",
            "META().id = 7",
            "TRUE",
            "a = TRUE OR b = false",
            "`raw.seg` = 'quoted'",
        ] {
            assert!(compile(source).is_ok(), "failed to compile: {}", source);
        }
    }
}
