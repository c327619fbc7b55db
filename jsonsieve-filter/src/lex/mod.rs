//! Lexical analysis for the filter language.
//!
//! The lexer turns raw expression text into spanned tokens; invalid input
//! becomes `TokenKind::Error` tokens rather than failing the whole scan,
//! so the parser can report a precise location.

mod chars;
mod lexer;
mod token;

pub use lexer::{tokenize, Lexer};
pub use token::{keyword_from_str, Token, TokenKind};
