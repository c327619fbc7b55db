//! Recursive-descent parser for filter expressions.
//!
//! ## Precedence (loosest to tightest)
//!
//! 1. `OR`
//! 2. `AND`
//! 3. `NOT`, parenthesized groups
//! 4. Operands (comparisons, checks, boolean functions)
//!
//! Operand scalars are disambiguated by side: on the left of a comparison a
//! quoted string is a field path segment, on the right it is a literal
//! value.

use super::stream::TokenStream;
use super::PResult;
use crate::ast::{
    CheckOp, CompareOp, Condition, ConstFunc, ConstFuncName, Field, FuncArg, Literal, MathOp,
    OnePath, Operand, PathKey, Scalar,
};
use crate::lex::TokenKind;

/// Parse a complete filter expression.
pub fn parse_filter(tokens: &mut TokenStream) -> PResult<Condition> {
    let condition = parse_or(tokens)?;
    if !tokens.is_eof() {
        return Err(tokens.failure(format!(
            "unexpected '{}' after expression",
            tokens.peek().kind
        )));
    }
    Ok(condition)
}

/// Parse an OR chain: `and_expr { OR and_expr }`
fn parse_or(tokens: &mut TokenStream) -> PResult<Condition> {
    let mut left = parse_and(tokens)?;
    while tokens.match_token(&TokenKind::KwOr) {
        let right = parse_and(tokens)?;
        left = Condition::or(left, right);
    }
    Ok(left)
}

/// Parse an AND chain: `condition { AND condition }`
fn parse_and(tokens: &mut TokenStream) -> PResult<Condition> {
    let mut left = parse_condition(tokens)?;
    while tokens.match_token(&TokenKind::KwAnd) {
        let right = parse_condition(tokens)?;
        left = Condition::and(left, right);
    }
    Ok(left)
}

/// Parse a single condition: `NOT condition`, a parenthesized group, or an
/// operand.
fn parse_condition(tokens: &mut TokenStream) -> PResult<Condition> {
    if tokens.match_token(&TokenKind::KwNot) {
        let inner = parse_condition(tokens)?;
        return Ok(Condition::not(inner));
    }

    if tokens.match_token(&TokenKind::LParen) {
        let inner = parse_or(tokens)?;
        tokens.expect(&TokenKind::RParen, "')'")?;
        return Ok(inner);
    }

    parse_operand(tokens).map(Condition::Operand)
}

/// Parse a testable operand.
fn parse_operand(tokens: &mut TokenStream) -> PResult<Operand> {
    match &tokens.peek().kind {
        // A boolean literal is an operand by itself unless it starts a
        // comparison or an IS-check
        TokenKind::KwTrue | TokenKind::KwFalse => {
            let next = &tokens.peek_n(1).kind;
            if !next.is_compare_op() && *next != TokenKind::KwIs {
                let value = tokens.peek().kind == TokenKind::KwTrue;
                tokens.advance();
                return Ok(Operand::Bool(value));
            }
        }
        TokenKind::KwRegexpContains => return parse_regexp_contains(tokens),
        TokenKind::KwExists => return parse_exists(tokens),
        _ => {}
    }

    let lhs = parse_scalar(tokens, Side::Lhs)?;

    if tokens.match_token(&TokenKind::KwIs) {
        let op = parse_check_op(tokens)?;
        return Ok(Operand::Check { lhs, op });
    }

    let op = parse_compare_op(tokens)?;
    let rhs = parse_scalar(tokens, Side::Rhs)?;
    Ok(Operand::Compare { lhs, op, rhs })
}

/// `REGEXP_CONTAINS(arg, "pattern")`
fn parse_regexp_contains(tokens: &mut TokenStream) -> PResult<Operand> {
    tokens.advance(); // REGEXP_CONTAINS
    tokens.expect(&TokenKind::LParen, "'('")?;
    let arg = parse_func_arg(tokens)?;
    tokens.expect(&TokenKind::Comma, "','")?;
    let Some((pattern, _)) = tokens.consume_string() else {
        return Err(tokens.failure("regex pattern must be a string literal"));
    };
    tokens.expect(&TokenKind::RParen, "')'")?;
    Ok(Operand::RegexpContains {
        arg,
        pattern: Literal::Str(pattern),
    })
}

/// `EXISTS(field)`
fn parse_exists(tokens: &mut TokenStream) -> PResult<Operand> {
    tokens.advance(); // EXISTS
    tokens.expect(&TokenKind::LParen, "'('")?;
    let field = parse_field(tokens)?;
    tokens.expect(&TokenKind::RParen, "')'")?;
    Ok(Operand::Exists(field))
}

/// After `IS`: `[NOT] (NULL | MISSING)`
fn parse_check_op(tokens: &mut TokenStream) -> PResult<CheckOp> {
    let negated = tokens.match_token(&TokenKind::KwNot);
    if tokens.match_token(&TokenKind::KwNull) {
        Ok(if negated { CheckOp::NotNull } else { CheckOp::Null })
    } else if tokens.match_token(&TokenKind::KwMissing) {
        Ok(if negated {
            CheckOp::NotMissing
        } else {
            CheckOp::Missing
        })
    } else {
        Err(tokens.failure(format!(
            "expected NULL or MISSING after IS, found '{}'",
            tokens.peek().kind
        )))
    }
}

fn parse_compare_op(tokens: &mut TokenStream) -> PResult<CompareOp> {
    let op = match &tokens.peek().kind {
        TokenKind::Eq => CompareOp::Eq,
        TokenKind::Ne => CompareOp::Ne,
        TokenKind::Lt => CompareOp::Lt,
        TokenKind::Le => CompareOp::Le,
        TokenKind::Gt => CompareOp::Gt,
        TokenKind::Ge => CompareOp::Ge,
        other => {
            return Err(tokens.failure(format!(
                "expected comparison operator or IS, found '{}'",
                other
            )))
        }
    };
    tokens.advance();
    Ok(op)
}

/// Which side of a comparison a scalar sits on. Fields win ties on the
/// left; literal values win on the right.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Side {
    Lhs,
    Rhs,
}

fn parse_scalar(tokens: &mut TokenStream, side: Side) -> PResult<Scalar> {
    if tokens.peek().kind.is_const_func() {
        return parse_const_func(tokens).map(Scalar::Func);
    }

    match tokens.peek().kind {
        TokenKind::KwTrue => {
            tokens.advance();
            return Ok(Scalar::Bool(true));
        }
        TokenKind::KwFalse => {
            tokens.advance();
            return Ok(Scalar::Bool(false));
        }
        _ => {}
    }

    match side {
        Side::Lhs => {
            if let Some(field) = tokens.try_parse(parse_field) {
                return Ok(Scalar::Field(field));
            }
            parse_value(tokens).map(Scalar::Literal)
        }
        Side::Rhs => {
            if let Some(value) = tokens.try_parse(parse_value) {
                return Ok(Scalar::Literal(value));
            }
            parse_field(tokens).map(Scalar::Field)
        }
    }
}

/// A literal value: a quoted string or a (possibly negative) number.
fn parse_value(tokens: &mut TokenStream) -> PResult<Literal> {
    if let Some((s, _)) = tokens.consume_string() {
        return Ok(Literal::Str(s));
    }
    let negative = tokens.match_token(&TokenKind::Minus);
    if let Some((n, _)) = tokens.consume_integer() {
        return Ok(Literal::Int(if negative { -n } else { n }));
    }
    if let Some((f, _)) = tokens.consume_float() {
        return Ok(Literal::Float(if negative { -f } else { f }));
    }
    Err(tokens.failure(format!("expected value, found '{}'", tokens.peek().kind)))
}

/// A field: `[-] one_path { . one_path } [ math_op math_value ]`
fn parse_field(tokens: &mut TokenStream) -> PResult<Field> {
    let neg = tokens.match_token(&TokenKind::Minus);

    let mut path = vec![parse_one_path(tokens)?];
    while tokens.match_token(&TokenKind::Dot) {
        path.push(parse_one_path(tokens)?);
    }

    let math = parse_field_math(tokens)?;
    Ok(Field { neg, path, math })
}

/// Trailing field arithmetic: `+ 3`, `% 2`, ...
fn parse_field_math(tokens: &mut TokenStream) -> PResult<Option<(MathOp, Literal)>> {
    let op = match &tokens.peek().kind {
        TokenKind::Plus => Some(MathOp::Add),
        TokenKind::Minus => Some(MathOp::Sub),
        TokenKind::Star => Some(MathOp::Mul),
        TokenKind::Slash => Some(MathOp::Div),
        TokenKind::Percent => Some(MathOp::Mod),
        _ => None,
    };
    let Some(op) = op else {
        return Ok(None);
    };
    tokens.advance();

    let negative = tokens.match_token(&TokenKind::Minus);
    let value = if let Some((n, _)) = tokens.consume_integer() {
        Literal::Int(if negative { -n } else { n })
    } else if let Some((f, _)) = tokens.consume_float() {
        Literal::Float(if negative { -f } else { f })
    } else {
        return Err(tokens.failure(format!(
            "expected numeric value in field arithmetic, found '{}'",
            tokens.peek().kind
        )));
    };

    Ok(Some((op, value)))
}

/// One path step: a name (identifier, quoted string, raw string, or
/// `META()`) followed by any number of `[int]` accessors.
fn parse_one_path(tokens: &mut TokenStream) -> PResult<OnePath> {
    let key = if tokens.match_token(&TokenKind::KwMeta) {
        tokens.expect(&TokenKind::LParen, "'(' after META")?;
        tokens.expect(&TokenKind::RParen, "')'")?;
        PathKey::Meta
    } else if let Some((name, _)) = tokens.consume_ident() {
        PathKey::Name(name)
    } else if let Some((name, _)) = tokens.consume_string() {
        PathKey::Name(name)
    } else if let Some((name, _)) = tokens.consume_raw_string() {
        PathKey::Name(name)
    } else {
        return Err(tokens.failure(format!(
            "expected field path, found '{}'",
            tokens.peek().kind
        )));
    };

    let mut indexes = Vec::new();
    while tokens.match_token(&TokenKind::LBracket) {
        // Negative indexes are not supported
        let Some((idx, _)) = tokens.consume_integer() else {
            return Err(tokens.failure(format!(
                "expected array index, found '{}'",
                tokens.peek().kind
            )));
        };
        tokens.expect(&TokenKind::RBracket, "']'")?;
        indexes.push(idx as usize);
    }

    Ok(OnePath { key, indexes })
}

/// A constant function application: `PI()`, `ABS(x)`, `POW(a, b)`.
fn parse_const_func(tokens: &mut TokenStream) -> PResult<ConstFunc> {
    let Some(arity) = tokens.peek().kind.const_func_arity() else {
        return Err(tokens.failure(format!(
            "expected function name, found '{}'",
            tokens.peek().kind
        )));
    };
    let name = const_func_name(&tokens.peek().kind);
    tokens.advance();

    tokens.expect(&TokenKind::LParen, "'('")?;
    let mut args = Vec::new();
    for i in 0..arity {
        if i > 0 {
            tokens.expect(&TokenKind::Comma, "','")?;
        }
        args.push(parse_func_arg(tokens)?);
    }
    tokens.expect(&TokenKind::RParen, "')'")?;

    Ok(ConstFunc { name, args })
}

/// A function argument: nested function, field, or numeric literal.
/// Fields soak up identifiers and quoted strings, as on a comparison LHS.
fn parse_func_arg(tokens: &mut TokenStream) -> PResult<FuncArg> {
    if tokens.peek().kind.is_const_func() {
        return parse_const_func(tokens).map(|f| FuncArg::Func(Box::new(f)));
    }
    if let Some(field) = tokens.try_parse(parse_field) {
        return Ok(FuncArg::Field(field));
    }
    parse_value(tokens).map(FuncArg::Literal)
}

fn const_func_name(kind: &TokenKind) -> ConstFuncName {
    match kind {
        TokenKind::KwPi => ConstFuncName::Pi,
        TokenKind::KwE => ConstFuncName::E,
        TokenKind::KwAbs => ConstFuncName::Abs,
        TokenKind::KwAcos => ConstFuncName::Acos,
        TokenKind::KwAsin => ConstFuncName::Asin,
        TokenKind::KwAtan => ConstFuncName::Atan,
        TokenKind::KwCeil => ConstFuncName::Ceil,
        TokenKind::KwCos => ConstFuncName::Cos,
        TokenKind::KwDate => ConstFuncName::Date,
        TokenKind::KwDegrees => ConstFuncName::Degrees,
        TokenKind::KwExp => ConstFuncName::Exp,
        TokenKind::KwFloor => ConstFuncName::Floor,
        TokenKind::KwLog => ConstFuncName::Log,
        TokenKind::KwLn => ConstFuncName::Ln,
        TokenKind::KwSin => ConstFuncName::Sin,
        TokenKind::KwTan => ConstFuncName::Tan,
        TokenKind::KwRadians => ConstFuncName::Radians,
        TokenKind::KwRound => ConstFuncName::Round,
        TokenKind::KwSqrt => ConstFuncName::Sqrt,
        TokenKind::KwAtan2 => ConstFuncName::Atan2,
        TokenKind::KwPow => ConstFuncName::Pow,
        other => unreachable!("not a function token: {}", other),
    }
}
