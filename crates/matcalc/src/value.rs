//! Calculator values.
//!
//! A calculator row evaluates to an [`Outcome`]: either a [`Value`] (a scalar
//! or a row-major matrix) or `Unevaluable`. `Unevaluable` is a state of its
//! own, never an encoding of zero or of an empty matrix.
//!
//! Numbers are stored as `OrderedFloat<f64>` so values are `Eq + Hash` and
//! can be compared structurally by the recompute engine.

use ordered_float::OrderedFloat;
use serde::Serialize;
use std::fmt;

/// Rectangular matrix of numbers stored row-major.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<OrderedFloat<f64>>,
}

impl Matrix {
    /// Returns `None` when `data` doesn't hold exactly `rows * cols` numbers.
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Option<Self> {
        if rows.checked_mul(cols)? != data.len() {
            return None;
        }
        Some(Self {
            rows,
            cols,
            data: data.into_iter().map(OrderedFloat).collect(),
        })
    }

    /// Builds a matrix from rows; `None` for ragged input.
    ///
    /// No rows at all gives the empty `1×0` matrix, matching how an empty
    /// 1-D vector is shaped.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Option<Self> {
        let Some(first) = rows.first() else {
            return Some(Self::zeros(1, 0));
        };
        let cols = first.len();
        if rows.iter().any(|row| row.len() != cols) {
            return None;
        }
        let row_count = rows.len();
        let data = rows.into_iter().flatten().collect();
        Self::new(row_count, cols, data)
    }

    /// 1-D vectors are row vectors (`1×n`) everywhere in the calculator.
    pub fn row_vector(items: Vec<f64>) -> Self {
        let cols = items.len();
        Self {
            rows: 1,
            cols,
            data: items.into_iter().map(OrderedFloat).collect(),
        }
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![OrderedFloat(0.0); rows * cols],
        }
    }

    pub fn identity(size: usize) -> Self {
        let mut matrix = Self::zeros(size, size);
        for index in 0..size {
            matrix.data[index * size + index] = OrderedFloat(1.0);
        }
        matrix
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// # Panics
    /// Panics if `row` or `col` is out of bounds.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        assert!(
            row < self.rows && col < self.cols,
            "matrix index ({row}, {col}) out of bounds for {}×{}",
            self.rows,
            self.cols
        );
        self.data[row * self.cols + col].0
    }

    /// Row-major iterator over all elements.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.data.iter().map(|number| number.0)
    }

    pub fn row(&self, row: usize) -> impl Iterator<Item = f64> + '_ {
        self.data[row * self.cols..(row + 1) * self.cols]
            .iter()
            .map(|number| number.0)
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|number| OrderedFloat(f(number.0))).collect(),
        }
    }

    /// Element-wise combination; `None` when shapes differ.
    pub fn zip_with(&self, other: &Self, f: impl Fn(f64, f64) -> f64) -> Option<Self> {
        if self.rows != other.rows || self.cols != other.cols {
            return None;
        }
        Some(Self {
            rows: self.rows,
            cols: self.cols,
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(a, b)| OrderedFloat(f(a.0, b.0)))
                .collect(),
        })
    }

    pub fn transpose(&self) -> Self {
        let mut data = Vec::with_capacity(self.data.len());
        for col in 0..self.cols {
            for row in 0..self.rows {
                data.push(self.data[row * self.cols + col]);
            }
        }
        Self {
            rows: self.cols,
            cols: self.rows,
            data,
        }
    }

    /// Literal text that evaluates back to this matrix, e.g. `[[1,2],[3,4]]`.
    ///
    /// Numbers are written unrounded; this is what matrix-kind entries store
    /// as their right-hand side.
    pub fn to_expression_text(&self) -> String {
        self.format_rows(|number| format_number(number, None))
    }

    /// Display text with every element rounded to `precision` decimals.
    pub fn render(&self, precision: u32) -> String {
        self.format_rows(|number| format_number(number, Some(precision)))
    }

    fn format_rows(&self, format: impl Fn(f64) -> String) -> String {
        if self.rows == 0 {
            return "[[]]".to_owned();
        }
        let rows: Vec<String> = (0..self.rows)
            .map(|row| {
                let cells: Vec<String> = self.row(row).map(&format).collect();
                format!("[{}]", cells.join(","))
            })
            .collect();
        format!("[{}]", rows.join(","))
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_expression_text())
    }
}

/// A successfully evaluated result.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Value {
    Scalar(OrderedFloat<f64>),
    Matrix(Matrix),
}

impl Value {
    pub fn scalar(number: f64) -> Self {
        Value::Scalar(OrderedFloat(number))
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(number) => Some(number.0),
            Value::Matrix(_) => None,
        }
    }

    pub fn as_matrix(&self) -> Option<&Matrix> {
        match self {
            Value::Matrix(matrix) => Some(matrix),
            Value::Scalar(_) => None,
        }
    }

    pub fn render(&self, precision: u32) -> String {
        match self {
            Value::Scalar(number) => format_number(number.0, Some(precision)),
            Value::Matrix(matrix) => matrix.render(precision),
        }
    }
}

impl From<Matrix> for Value {
    fn from(matrix: Matrix) -> Self {
        Value::Matrix(matrix)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(number) => f.write_str(&format_number(number.0, None)),
            Value::Matrix(matrix) => matrix.fmt(f),
        }
    }
}

/// Result of evaluating an entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Outcome {
    Value(Value),
    #[default]
    Unevaluable,
}

impl Outcome {
    pub fn scalar(number: f64) -> Self {
        Outcome::Value(Value::scalar(number))
    }

    pub fn is_unevaluable(&self) -> bool {
        matches!(self, Outcome::Unevaluable)
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Outcome::Value(value) => Some(value),
            Outcome::Unevaluable => None,
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        self.value().and_then(Value::as_scalar)
    }

    pub fn as_matrix(&self) -> Option<&Matrix> {
        self.value().and_then(Value::as_matrix)
    }
}

impl From<Value> for Outcome {
    fn from(value: Value) -> Self {
        Outcome::Value(value)
    }
}

impl From<Matrix> for Outcome {
    fn from(matrix: Matrix) -> Self {
        Outcome::Value(Value::Matrix(matrix))
    }
}

/// Formats a number, optionally rounded to `precision` decimals.
///
/// Infinities print as `Infinity` / `-Infinity` (both re-evaluate to the same
/// number) and negative zero prints as `0`.
pub fn format_number(number: f64, precision: Option<u32>) -> String {
    if number.is_nan() {
        return "NaN".to_owned();
    }
    if number.is_infinite() {
        return if number > 0.0 { "Infinity" } else { "-Infinity" }.to_owned();
    }
    let number = match precision {
        Some(precision) => round_to(number, precision),
        None => number,
    };
    if number == 0.0 {
        return "0".to_owned();
    }
    number.to_string()
}

fn round_to(number: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision.min(i32::MAX as u32) as i32);
    let scaled = number * factor;
    if !scaled.is_finite() || !factor.is_finite() {
        return number;
    }
    scaled.round() / factor
}
