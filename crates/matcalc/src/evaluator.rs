//! Safe evaluation: any text + scope in, `Outcome` out.
//!
//! The expression language lives behind [`MathEngine`]. The [`Evaluator`]
//! wraps an engine, absorbs its failures and narrows whatever it produces to
//! the two shapes the calculator supports, scalars and matrices.

use crate::error::MathResult;
use crate::math::Interpreter;
use crate::scope::Scope;
use crate::value::{Matrix, Outcome, Value};

/// Untyped result of a math engine.
#[derive(Clone, Debug, PartialEq)]
pub enum Raw {
    Number(f64),
    Bool(bool),
    Text(String),
    /// Missing value, e.g. a variable bound to `Unevaluable`.
    Null,
    /// A reference to a function that was not called.
    Function(String),
    Array(Vec<Raw>),
}

impl Raw {
    pub fn type_name(&self) -> &'static str {
        match self {
            Raw::Number(_) => "number",
            Raw::Bool(_) => "boolean",
            Raw::Text(_) => "string",
            Raw::Null => "null",
            Raw::Function(_) => "function",
            Raw::Array(_) => "array",
        }
    }
}

impl From<&Matrix> for Raw {
    fn from(matrix: &Matrix) -> Self {
        Raw::Array(
            (0..matrix.rows())
                .map(|row| Raw::Array(matrix.row(row).map(Raw::Number).collect()))
                .collect(),
        )
    }
}

impl From<&Outcome> for Raw {
    fn from(outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Value(Value::Scalar(number)) => Raw::Number(number.0),
            Outcome::Value(Value::Matrix(matrix)) => Raw::from(matrix),
            Outcome::Unevaluable => Raw::Null,
        }
    }
}

/// Expression-language collaborator.
///
/// Implementations read `bindings` and must not keep state between calls.
/// Variables bound to `Unevaluable` are expected to read as [`Raw::Null`].
pub trait MathEngine {
    fn evaluate(&self, expression: &str, bindings: &Scope) -> MathResult<Raw>;
}

impl<E: MathEngine + ?Sized> MathEngine for &E {
    fn evaluate(&self, expression: &str, bindings: &Scope) -> MathResult<Raw> {
        (**self).evaluate(expression, bindings)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Evaluator<E = Interpreter> {
    engine: E,
}

impl<E: MathEngine> Evaluator<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Never fails: empty text, engine errors and unsupported result shapes
    /// all come back as `Outcome::Unevaluable`.
    pub fn evaluate(&self, text: &str, scope: &Scope) -> Outcome {
        let text = text.trim();
        if text.is_empty() {
            return Outcome::Unevaluable;
        }
        match self.engine.evaluate(text, scope) {
            Ok(raw) => narrow(raw),
            Err(error) => {
                log::trace!("`{text}` is unevaluable: {error}");
                Outcome::Unevaluable
            }
        }
    }
}

/// Narrows an engine result to a scalar or a matrix.
///
/// NaN is the engine's undefined number and is unevaluable. Arrays must be
/// rectangular, at most two-dimensional and purely numeric; a single null or
/// NaN element makes the whole array unevaluable.
pub fn narrow(raw: Raw) -> Outcome {
    match raw {
        Raw::Number(number) if number.is_nan() => Outcome::Unevaluable,
        Raw::Number(number) => Outcome::scalar(number),
        Raw::Array(items) => narrow_array(items).map_or(Outcome::Unevaluable, Outcome::from),
        Raw::Bool(_) | Raw::Text(_) | Raw::Null | Raw::Function(_) => Outcome::Unevaluable,
    }
}

fn narrow_array(items: Vec<Raw>) -> Option<Matrix> {
    let is_nested = !items.is_empty() && items.iter().all(|item| matches!(item, Raw::Array(_)));
    if !is_nested {
        return numbers(items).map(Matrix::row_vector);
    }
    let rows = items
        .into_iter()
        .map(|item| match item {
            Raw::Array(row) => numbers(row),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    Matrix::from_rows(rows)
}

fn numbers(items: Vec<Raw>) -> Option<Vec<f64>> {
    items
        .into_iter()
        .map(|item| match item {
            Raw::Number(number) if !number.is_nan() => Some(number),
            _ => None,
        })
        .collect()
}
