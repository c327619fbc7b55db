//! Token stream for parsing.
//!
//! The `TokenStream` wraps the lexer output and provides lookahead,
//! position tracking for backtracking, and convenient matching and
//! consuming methods.

use super::{ParseFailure, PResult};
use crate::lex::{Token, TokenKind};
use crate::span::SourceSpan;
use std::sync::Arc;

/// A stream of tokens for parsing.
#[derive(Debug)]
pub struct TokenStream {
    /// The tokens to parse
    tokens: Vec<Token>,
    /// Current position in the token stream
    pos: usize,
}

impl TokenStream {
    /// Create a new token stream from a vector of tokens.
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Get the current position in the stream.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Restore position for backtracking.
    pub fn restore(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Check if at end of stream (only EOF remains).
    pub fn is_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    /// Peek at the current token without consuming it.
    pub fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or_else(|| {
            self.tokens
                .last()
                .expect("token stream should have at least EOF")
        })
    }

    /// Peek at the nth token ahead (0 = current).
    pub fn peek_n(&self, n: usize) -> &Token {
        self.tokens.get(self.pos + n).unwrap_or_else(|| {
            self.tokens
                .last()
                .expect("token stream should have at least EOF")
        })
    }

    /// Get the span of the current token.
    pub fn current_span(&self) -> SourceSpan {
        self.peek().span
    }

    /// Get the span of the previous token.
    pub fn previous_span(&self) -> SourceSpan {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            SourceSpan::point(0)
        }
    }

    /// Advance to the next token.
    pub fn advance(&mut self) {
        if !self.peek().is_eof() {
            self.pos += 1;
        }
    }

    /// Consume the current token and return it (owned).
    pub fn consume(&mut self) -> Token {
        let token = self.peek().clone();
        self.advance();
        token
    }

    /// Check if the current token matches the expected kind (by
    /// discriminant, so payload-carrying kinds match any payload).
    pub fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    /// Consume the current token if it matches, returning true.
    pub fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Expect and consume a specific token kind.
    pub fn expect(&mut self, kind: &TokenKind, expected: &str) -> PResult<Token> {
        if self.check(kind) {
            Ok(self.consume())
        } else {
            Err(self.failure(format!(
                "expected {}, found '{}'",
                expected,
                self.peek().kind
            )))
        }
    }

    /// Build a failure at the current token.
    pub fn failure(&self, message: impl Into<String>) -> ParseFailure {
        ParseFailure {
            message: message.into(),
            span: self.current_span(),
        }
    }

    /// Try to parse something, restoring position on failure.
    pub fn try_parse<T, F>(&mut self, f: F) -> Option<T>
    where
        F: FnOnce(&mut Self) -> PResult<T>,
    {
        let start_pos = self.pos;
        match f(self) {
            Ok(result) => Some(result),
            Err(_) => {
                self.pos = start_pos;
                None
            }
        }
    }

    // =========================================================================
    // Convenience methods for common token patterns
    // =========================================================================

    /// Consume and return an identifier if the current token is one.
    pub fn consume_ident(&mut self) -> Option<(Arc<str>, SourceSpan)> {
        match &self.peek().kind {
            TokenKind::Ident(_) => {
                let token = self.consume();
                if let TokenKind::Ident(name) = token.kind {
                    Some((name, token.span))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Consume and return a quoted string if the current token is one.
    pub fn consume_string(&mut self) -> Option<(Arc<str>, SourceSpan)> {
        match &self.peek().kind {
            TokenKind::String(_) => {
                let token = self.consume();
                if let TokenKind::String(s) = token.kind {
                    Some((s, token.span))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Consume and return a raw string if the current token is one.
    pub fn consume_raw_string(&mut self) -> Option<(Arc<str>, SourceSpan)> {
        match &self.peek().kind {
            TokenKind::RawString(_) => {
                let token = self.consume();
                if let TokenKind::RawString(s) = token.kind {
                    Some((s, token.span))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Consume and return an integer if the current token is one.
    pub fn consume_integer(&mut self) -> Option<(i64, SourceSpan)> {
        match &self.peek().kind {
            TokenKind::Integer(_) => {
                let token = self.consume();
                if let TokenKind::Integer(n) = token.kind {
                    Some((n, token.span))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Consume and return a float if the current token is one.
    pub fn consume_float(&mut self) -> Option<(f64, SourceSpan)> {
        match &self.peek().kind {
            TokenKind::Float(_) => {
                let token = self.consume();
                if let TokenKind::Float(n) = token.kind {
                    Some((n, token.span))
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}
