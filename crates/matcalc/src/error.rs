//! Failures raised by the math engine.
//!
//! These never leave the evaluator: [`crate::evaluator::Evaluator`] turns
//! every one of them into `Outcome::Unevaluable`.

use crate::math::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Syntax error: {}", first_message(.0))]
    Syntax(Vec<Diagnostic>),
    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(String),
    #[error("Unknown function: {0}")]
    UnknownFunction(String),
    #[error("Arity mismatch for {name}: expected {expected}, got {got}")]
    Arity {
        name: String,
        expected: &'static str,
        got: usize,
    },
    #[error("Type error: expected {expected}, got {got}")]
    Type {
        expected: &'static str,
        got: &'static str,
    },
    #[error("Shape mismatch: {0}")]
    Shape(String),
    #[error("Matrix is singular")]
    Singular,
}

pub type MathResult<T> = Result<T, MathError>;

fn first_message(diagnostics: &[Diagnostic]) -> &str {
    diagnostics
        .first()
        .map_or("invalid expression", |diagnostic| diagnostic.message.as_str())
}

impl MathError {
    pub fn arity(name: &str, expected: &'static str, got: usize) -> Self {
        MathError::Arity {
            name: name.to_owned(),
            expected,
            got,
        }
    }

    pub fn shape(message: impl Into<String>) -> Self {
        MathError::Shape(message.into())
    }
}
