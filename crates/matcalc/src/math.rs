//! Built-in expression language.
//!
//! A small mathjs-flavoured language: numbers, matrices written as nested
//! `[...]` literals, arithmetic, comparisons and a handful of functions.
//! Text is lexed into [`Token`]s, parsed with a pratt parser into an
//! [`Expression`] tree and walked by the [`Interpreter`].

use chumsky::{input::ValueInput, pratt::*, prelude::*};
use serde::Serialize;
use std::fmt;
use std::ops::Range;

mod lexer;
pub use lexer::{Token, lexer};

mod interpreter;
pub use interpreter::{BUILTINS, CONSTANTS, Interpreter};

mod linalg;

pub type Span = SimpleSpan;
pub type ParseError<'code, T> = Rich<'code, T, Span>;

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub span: Span,
    pub node: T,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression<'code> {
    Number(f64),
    Text(&'code str),
    Bool(bool),
    Null,
    Identifier(&'code str),
    Call {
        name: &'code str,
        arguments: Vec<Spanned<Self>>,
    },
    Array {
        items: Vec<Spanned<Self>>,
    },
    Unary {
        operator: UnaryOperator,
        operand: Box<Spanned<Self>>,
    },
    Binary {
        operator: BinaryOperator,
        operand_a: Box<Spanned<Self>>,
        operand_b: Box<Spanned<Self>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Plus,
    Transpose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Power,
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl BinaryOperator {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Equal
                | Self::NotEqual
                | Self::Less
                | Self::LessOrEqual
                | Self::Greater
                | Self::GreaterOrEqual
        )
    }
}

fn unary<'code>(operator: UnaryOperator, operand: Spanned<Expression<'code>>, span: Span) -> Spanned<Expression<'code>> {
    Spanned {
        span,
        node: Expression::Unary {
            operator,
            operand: Box::new(operand),
        },
    }
}

fn binary<'code>(
    operand_a: Spanned<Expression<'code>>,
    operator: BinaryOperator,
    operand_b: Spanned<Expression<'code>>,
    span: Span,
) -> Spanned<Expression<'code>> {
    Spanned {
        span,
        node: Expression::Binary {
            operator,
            operand_a: Box::new(operand_a),
            operand_b: Box::new(operand_b),
        },
    }
}

pub fn parser<'code, I>()
-> impl Parser<'code, I, Spanned<Expression<'code>>, extra::Err<ParseError<'code, Token<'code>>>>
where
    I: ValueInput<'code, Token = Token<'code>, Span = Span>,
{
    recursive(|expression| {
        let comma = just(Token::Comma);
        let bracket_round_open = just(Token::BracketRoundOpen);
        let bracket_round_close = just(Token::BracketRoundClose);
        let bracket_square_open = just(Token::BracketSquareOpen);
        let bracket_square_close = just(Token::BracketSquareClose);

        let identifier = select! { Token::Identifier(identifier) => identifier };

        let literal = select! {
            Token::Number(number) => Expression::Number(number),
            Token::Text(text) => Expression::Text(text),
            Token::True => Expression::Bool(true),
            Token::False => Expression::Bool(false),
            Token::Null => Expression::Null,
        };

        let call = identifier
            .then(
                expression
                    .clone()
                    .separated_by(comma.clone())
                    .collect::<Vec<_>>()
                    .delimited_by(bracket_round_open.clone(), bracket_round_close.clone()),
            )
            .map(|(name, arguments)| Expression::Call { name, arguments });

        let array = expression
            .clone()
            .separated_by(comma)
            .collect::<Vec<_>>()
            .delimited_by(bracket_square_open, bracket_square_close)
            .map(|items| Expression::Array { items });

        let nested = expression
            .clone()
            .delimited_by(bracket_round_open, bracket_round_close);

        let atom = choice((call, literal, identifier.map(Expression::Identifier), array))
            .map_with(|expression, extra| Spanned {
                node: expression,
                span: extra.span(),
            })
            .or(nested);

        let comparator = select! {
            Token::Equal => BinaryOperator::Equal,
            Token::NotEqual => BinaryOperator::NotEqual,
            Token::Less => BinaryOperator::Less,
            Token::LessOrEqual => BinaryOperator::LessOrEqual,
            Token::Greater => BinaryOperator::Greater,
            Token::GreaterOrEqual => BinaryOperator::GreaterOrEqual,
        };
        let additive = select! {
            Token::Plus => BinaryOperator::Add,
            Token::Minus => BinaryOperator::Subtract,
        };
        let multiplicative = select! {
            Token::Asterisk => BinaryOperator::Multiply,
            Token::Slash => BinaryOperator::Divide,
            Token::Percent => BinaryOperator::Remainder,
        };
        let sign = select! {
            Token::Minus => UnaryOperator::Negate,
            Token::Plus => UnaryOperator::Plus,
        };

        // `-2^2` is `-(2^2)`: power binds tighter than the sign.
        atom.pratt((
            infix(left(1), comparator, |l, operator, r, extra| {
                binary(l, operator, r, extra.span())
            }),
            infix(left(2), additive, |l, operator, r, extra| {
                binary(l, operator, r, extra.span())
            }),
            infix(left(3), multiplicative, |l, operator, r, extra| {
                binary(l, operator, r, extra.span())
            }),
            prefix(4, sign, |operator, operand, extra| {
                unary(operator, operand, extra.span())
            }),
            infix(right(5), just(Token::Caret), |l, _, r, extra| {
                binary(l, BinaryOperator::Power, r, extra.span())
            }),
            postfix(6, just(Token::Apostrophe), |operand, _, extra| {
                unary(UnaryOperator::Transpose, operand, extra.span())
            }),
        ))
    })
}

/// A lexer or parser error with its byte range in the source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub span: Range<usize>,
    pub message: String,
    pub reason: String,
}

impl Diagnostic {
    fn from_error<T: fmt::Display>(error: ParseError<'_, T>) -> Self {
        Self {
            span: error.span().into_range(),
            message: error.to_string(),
            reason: error.reason().to_string(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}: {}", self.span.start, self.span.end, self.message)
    }
}

/// Parses `code` and hands the tree to `f`.
///
/// The tree borrows both the source text and the token buffer, so it only
/// lives for the duration of the callback.
pub fn with_parsed<R>(
    code: &str,
    f: impl FnOnce(&Spanned<Expression<'_>>) -> R,
) -> Result<R, Vec<Diagnostic>> {
    let (tokens, lex_errors) = lexer().parse(code).into_output_errors();
    if !lex_errors.is_empty() {
        return Err(lex_errors.into_iter().map(Diagnostic::from_error).collect());
    }
    let tokens = tokens.unwrap_or_default();

    let input = tokens.map(Span::from(code.len()..code.len()), |Spanned { node, span }| (node, span));

    let (expression, parse_errors) = parser().parse(input).into_output_errors();
    if !parse_errors.is_empty() {
        return Err(parse_errors.into_iter().map(Diagnostic::from_error).collect());
    }
    match expression {
        Some(expression) => Ok(f(&expression)),
        None => Err(vec![Diagnostic {
            span: 0..code.len(),
            message: "No expression from parser".to_owned(),
            reason: "empty input".to_owned(),
        }]),
    }
}

/// Lexer and parser errors for `code`; empty when it parses.
pub fn diagnose(code: &str) -> Vec<Diagnostic> {
    with_parsed(code, |_| ()).err().unwrap_or_default()
}
