//! Filter-language lexer implemented with winnow.
//!
//! Tokenizes filter expressions into a stream of tokens with source spans.

use std::sync::Arc;

use winnow::ascii::digit1;
use winnow::combinator::{alt, delimited, opt};
use winnow::error::ContextError;
use winnow::stream::{AsChar, Location, Stream};
use winnow::token::{any, one_of, take_while};
use winnow::{LocatingSlice, ModalResult, Parser};

use super::chars::*;
use super::token::{keyword_from_str, Token, TokenKind};
use crate::span::SourceSpan;

/// Input type for the lexer - tracks position for spans.
pub type Input<'a> = LocatingSlice<&'a str>;

/// Lexer for filter expressions.
pub struct Lexer<'a> {
    input: &'a str,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    pub fn new(input: &'a str) -> Self {
        Self { input }
    }

    /// Tokenize the entire input.
    pub fn tokenize(self) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut input = LocatingSlice::new(self.input);

        loop {
            let _: ModalResult<&str, ContextError> = take_while(0.., is_ws).parse_next(&mut input);

            if input.is_empty() {
                let pos = input.current_token_start();
                tokens.push(Token::new(TokenKind::Eof, SourceSpan::point(pos)));
                break;
            }

            let start = input.current_token_start();

            match next_token(&mut input) {
                Ok(kind) => {
                    let end = input.current_token_start();
                    tokens.push(Token::new(kind, SourceSpan::new(start, end)));
                }
                Err(_) => {
                    // On error, skip one character and emit an error token
                    let c = any::<_, ContextError>.parse_next(&mut input).unwrap_or('?');
                    let end = input.current_token_start();
                    tokens.push(Token::new(
                        TokenKind::Error(Arc::from(format!("unexpected character: '{}'", c))),
                        SourceSpan::new(start, end),
                    ));
                }
            }
        }

        tokens
    }
}

/// Parse the next token.
fn next_token(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    alt((
        // Multi-char operators (must come before single-char)
        parse_eq_eq,
        parse_ne_bang,
        parse_ne_angle,
        parse_le,
        parse_ge,
        // Literals
        parse_string_double,
        parse_string_single,
        parse_raw_string,
        parse_number,
        // Identifiers and keywords
        parse_ident_or_keyword,
        // Single-char punctuation (must come after multi-char)
        parse_punctuation,
    ))
    .parse_next(input)
}

// =============================================================================
// Identifiers and keywords
// =============================================================================

/// Parse a bare identifier, mapping keyword lexemes to their tokens.
fn parse_ident_or_keyword(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    let word: &str = (
        take_while(1, is_ident_start),
        take_while(0.., is_ident_char),
    )
        .take()
        .parse_next(input)?;

    match keyword_from_str(word) {
        Some(kw) => Ok(kw),
        None => Ok(TokenKind::Ident(Arc::from(word))),
    }
}

// =============================================================================
// String literals
// =============================================================================

/// Parse a double-quoted string: `"..."`
fn parse_string_double(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    delimited('"', parse_string_content_double, '"')
        .map(|s| TokenKind::String(Arc::from(s)))
        .parse_next(input)
}

/// Parse a single-quoted string: `'...'`
fn parse_string_single(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    delimited('\'', parse_string_content_single, '\'')
        .map(|s| TokenKind::String(Arc::from(s)))
        .parse_next(input)
}

/// Parse a backtick raw string: `` `...` `` (no escape processing).
fn parse_raw_string(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    delimited('`', take_while(0.., |c| c != '`'), '`')
        .map(|s: &str| TokenKind::RawString(Arc::from(s)))
        .parse_next(input)
}

/// Parse content inside a double-quoted string (handling escapes).
fn parse_string_content_double(input: &mut Input<'_>) -> ModalResult<String> {
    let mut result = String::new();

    loop {
        let chunk: &str = take_while(0.., |c| c != '"' && c != '\\' && c != '\n' && c != '\r')
            .parse_next(input)?;
        result.push_str(chunk);

        if input.is_empty() || input.starts_with('"') {
            break;
        }

        if input.starts_with('\\') {
            '\\'.parse_next(input)?;
            let escaped = parse_escape_char(input)?;
            result.push(escaped);
        } else {
            // Bare newline inside a short string
            break;
        }
    }

    Ok(result)
}

/// Parse content inside a single-quoted string (handling escapes).
fn parse_string_content_single(input: &mut Input<'_>) -> ModalResult<String> {
    let mut result = String::new();

    loop {
        let chunk: &str = take_while(0.., |c| c != '\'' && c != '\\' && c != '\n' && c != '\r')
            .parse_next(input)?;
        result.push_str(chunk);

        if input.is_empty() || input.starts_with('\'') {
            break;
        }

        if input.starts_with('\\') {
            '\\'.parse_next(input)?;
            let escaped = parse_escape_char(input)?;
            result.push(escaped);
        } else {
            break;
        }
    }

    Ok(result)
}

/// Parse an escape character after a backslash.
///
/// Returns an error for invalid escape sequences rather than silently
/// dropping them.
fn parse_escape_char(input: &mut Input<'_>) -> ModalResult<char> {
    let c: char = any.parse_next(input)?;
    match c {
        't' => Ok('\t'),
        'n' => Ok('\n'),
        'r' => Ok('\r'),
        '"' => Ok('"'),
        '\'' => Ok('\''),
        '\\' => Ok('\\'),
        '/' => Ok('/'),
        'u' => {
            // \uXXXX
            let hex: &str = take_while(4..=4, AsChar::is_hex_digit).parse_next(input)?;
            let code = u32::from_str_radix(hex, 16)
                .map_err(|_| winnow::error::ErrMode::Backtrack(ContextError::new()))?;
            char::from_u32(code)
                .ok_or_else(|| winnow::error::ErrMode::Backtrack(ContextError::new()))
        }
        _ => Err(winnow::error::ErrMode::Backtrack(ContextError::new())),
    }
}

// =============================================================================
// Numbers
// =============================================================================

/// Parse a numeric literal (float or integer, unsigned).
///
/// Signs are separate tokens so that field math (`price - 1`) and negated
/// fields (`-price`) lex the same way regardless of spacing; the parser
/// applies a leading minus where the grammar allows one.
fn parse_number(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    alt((parse_float, parse_integer)).parse_next(input)
}

/// Parse a float: `digits.digits` with an optional exponent, or `digits`
/// with a required exponent.
fn parse_float(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    let text: &str = alt((
        (digit1, '.', digit1, opt(parse_exponent)).take(),
        (digit1, parse_exponent).take(),
    ))
    .parse_next(input)?;

    let value = text
        .parse::<f64>()
        .map_err(|_| winnow::error::ErrMode::Backtrack(ContextError::new()))?;
    Ok(TokenKind::Float(value))
}

fn parse_exponent<'a>(input: &mut Input<'a>) -> ModalResult<&'a str> {
    (one_of(['e', 'E']), opt(one_of(['+', '-'])), digit1)
        .take()
        .parse_next(input)
}

/// Parse an integer literal.
fn parse_integer(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    let digits: &str = digit1.parse_next(input)?;
    let value = digits
        .parse::<i64>()
        .map_err(|_| winnow::error::ErrMode::Backtrack(ContextError::new()))?;
    Ok(TokenKind::Integer(value))
}

// =============================================================================
// Operators and punctuation
// =============================================================================

fn parse_eq_eq(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    "==".map(|_| TokenKind::Eq).parse_next(input)
}

fn parse_ne_bang(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    "!=".map(|_| TokenKind::Ne).parse_next(input)
}

fn parse_ne_angle(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    "<>".map(|_| TokenKind::Ne).parse_next(input)
}

fn parse_le(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    "<=".map(|_| TokenKind::Le).parse_next(input)
}

fn parse_ge(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    ">=".map(|_| TokenKind::Ge).parse_next(input)
}

/// Parse single-character punctuation.
fn parse_punctuation(input: &mut Input<'_>) -> ModalResult<TokenKind> {
    any.verify_map(|c| match c {
        '(' => Some(TokenKind::LParen),
        ')' => Some(TokenKind::RParen),
        '[' => Some(TokenKind::LBracket),
        ']' => Some(TokenKind::RBracket),
        '.' => Some(TokenKind::Dot),
        ',' => Some(TokenKind::Comma),
        '+' => Some(TokenKind::Plus),
        '-' => Some(TokenKind::Minus),
        '*' => Some(TokenKind::Star),
        '/' => Some(TokenKind::Slash),
        '%' => Some(TokenKind::Percent),
        '=' => Some(TokenKind::Eq),
        '<' => Some(TokenKind::Lt),
        '>' => Some(TokenKind::Gt),
        _ => None,
    })
    .parse_next(input)
}

/// Tokenize a filter expression string.
pub fn tokenize(input: &str) -> Vec<Token> {
    Lexer::new(input).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .into_iter()
            .map(|t| t.kind)
            .filter(|k| !matches!(k, TokenKind::Eof))
            .collect()
    }

    #[test]
    fn test_idents_and_keywords() {
        assert_eq!(
            tok("name AND other"),
            vec![
                TokenKind::Ident(Arc::from("name")),
                TokenKind::KwAnd,
                TokenKind::Ident(Arc::from("other")),
            ]
        );
        // Lowercase operator words are field names
        assert_eq!(tok("and"), vec![TokenKind::Ident(Arc::from("and"))]);
        assert_eq!(tok("true"), vec![TokenKind::KwTrue]);
    }

    #[test]
    fn test_strings() {
        assert_eq!(tok("\"hello\""), vec![TokenKind::String(Arc::from("hello"))]);
        assert_eq!(tok("'hello'"), vec![TokenKind::String(Arc::from("hello"))]);
        assert_eq!(
            tok(r#""a\nb""#),
            vec![TokenKind::String(Arc::from("a\nb"))]
        );
        assert_eq!(
            tok("`raw\\path`"),
            vec![TokenKind::RawString(Arc::from("raw\\path"))]
        );
    }

    #[test]
    fn test_invalid_escape_is_error() {
        let tokens = tok(r#""bad\xescape""#);
        assert!(tokens.iter().any(|t| matches!(t, TokenKind::Error(_))));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(tok("42"), vec![TokenKind::Integer(42)]);
        assert_eq!(tok("3.25"), vec![TokenKind::Float(3.25)]);
        assert_eq!(tok("1e3"), vec![TokenKind::Float(1000.0)]);
        assert_eq!(tok("2.5e-1"), vec![TokenKind::Float(0.25)]);
        // Signs are separate tokens
        assert_eq!(tok("-5"), vec![TokenKind::Minus, TokenKind::Integer(5)]);
    }

    #[test]
    fn test_operators() {
        assert_eq!(tok("=="), vec![TokenKind::Eq]);
        assert_eq!(tok("="), vec![TokenKind::Eq]);
        assert_eq!(tok("!="), vec![TokenKind::Ne]);
        assert_eq!(tok("<>"), vec![TokenKind::Ne]);
        assert_eq!(tok("<="), vec![TokenKind::Le]);
        assert_eq!(tok(">="), vec![TokenKind::Ge]);
        assert_eq!(tok("<"), vec![TokenKind::Lt]);
        assert_eq!(tok(">"), vec![TokenKind::Gt]);
    }

    #[test]
    fn test_path_expression() {
        assert_eq!(
            tok("x.y[0]"),
            vec![
                TokenKind::Ident(Arc::from("x")),
                TokenKind::Dot,
                TokenKind::Ident(Arc::from("y")),
                TokenKind::LBracket,
                TokenKind::Integer(0),
                TokenKind::RBracket,
            ]
        );
    }

    #[test]
    fn test_full_expression() {
        assert_eq!(
            tok("NOT (a = 1 OR b = 2)"),
            vec![
                TokenKind::KwNot,
                TokenKind::LParen,
                TokenKind::Ident(Arc::from("a")),
                TokenKind::Eq,
                TokenKind::Integer(1),
                TokenKind::KwOr,
                TokenKind::Ident(Arc::from("b")),
                TokenKind::Eq,
                TokenKind::Integer(2),
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn test_function_call() {
        assert_eq!(
            tok("POW(r,2)"),
            vec![
                TokenKind::KwPow,
                TokenKind::LParen,
                TokenKind::Ident(Arc::from("r")),
                TokenKind::Comma,
                TokenKind::Integer(2),
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn test_spans() {
        let tokens = tokenize("a = 1");
        assert_eq!(tokens[0].span, SourceSpan::new(0, 1));
        assert_eq!(tokens[1].span, SourceSpan::new(2, 3));
        assert_eq!(tokens[2].span, SourceSpan::new(4, 5));
    }

    #[test]
    fn test_unexpected_character() {
        let tokens = tok("a # b");
        assert!(tokens.iter().any(|t| matches!(t, TokenKind::Error(_))));
    }
}
