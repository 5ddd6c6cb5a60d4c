use super::linalg;
use super::{BinaryOperator, Expression, Spanned, UnaryOperator, with_parsed};
use crate::error::{MathError, MathResult};
use crate::evaluator::{MathEngine, Raw, narrow};
use crate::scope::Scope;
use crate::value::{Matrix, Outcome, Value};
use std::f64::consts;

pub const CONSTANTS: &[(&str, f64)] = &[
    ("pi", consts::PI),
    ("e", consts::E),
    ("tau", consts::TAU),
    ("Infinity", f64::INFINITY),
];

pub const BUILTINS: &[&str] = &[
    "sqrt",
    "abs",
    "exp",
    "log",
    "log10",
    "sin",
    "cos",
    "tan",
    "asin",
    "acos",
    "atan",
    "floor",
    "ceil",
    "round",
    "min",
    "max",
    "det",
    "transpose",
    "inv",
    "zeros",
    "identity",
];

/// Tree-walking evaluator for the built-in expression language.
#[derive(Clone, Copy, Debug, Default)]
pub struct Interpreter;

impl MathEngine for Interpreter {
    fn evaluate(&self, expression: &str, bindings: &Scope) -> MathResult<Raw> {
        with_parsed(expression, |tree| self.eval(tree, bindings))
            .map_err(MathError::Syntax)
            .and_then(|result| result)
    }
}

/// Numeric operand of arithmetic.
#[derive(Clone, Debug)]
enum Operand {
    Scalar(f64),
    Matrix(Matrix),
}

impl Operand {
    fn from_raw(raw: Raw) -> MathResult<Self> {
        match raw {
            Raw::Number(number) => Ok(Operand::Scalar(number)),
            Raw::Array(_) => match narrow(raw) {
                Outcome::Value(Value::Matrix(matrix)) => Ok(Operand::Matrix(matrix)),
                _ => Err(MathError::Type {
                    expected: "numeric matrix",
                    got: "array",
                }),
            },
            other => Err(MathError::Type {
                expected: "number or matrix",
                got: other.type_name(),
            }),
        }
    }

    fn into_raw(self) -> Raw {
        match self {
            Operand::Scalar(number) => Raw::Number(number),
            Operand::Matrix(matrix) => Raw::from(&matrix),
        }
    }

    fn map(self, f: impl Fn(f64) -> f64) -> Self {
        match self {
            Operand::Scalar(number) => Operand::Scalar(f(number)),
            Operand::Matrix(matrix) => Operand::Matrix(matrix.map(f)),
        }
    }
}

impl Interpreter {
    fn eval(&self, expression: &Spanned<Expression>, scope: &Scope) -> MathResult<Raw> {
        match &expression.node {
            Expression::Number(number) => Ok(Raw::Number(*number)),
            Expression::Text(text) => Ok(Raw::Text((*text).to_owned())),
            Expression::Bool(value) => Ok(Raw::Bool(*value)),
            Expression::Null => Ok(Raw::Null),
            Expression::Identifier(name) => self.lookup(name, scope),
            Expression::Array { items } => items
                .iter()
                .map(|item| self.eval(item, scope))
                .collect::<MathResult<Vec<_>>>()
                .map(Raw::Array),
            Expression::Call { name, arguments } => {
                let arguments = arguments
                    .iter()
                    .map(|argument| self.eval(argument, scope))
                    .collect::<MathResult<Vec<_>>>()?;
                call(name, arguments)
            }
            Expression::Unary { operator, operand } => {
                let operand = Operand::from_raw(self.eval(operand, scope)?)?;
                let result = match operator {
                    UnaryOperator::Negate => operand.map(|number| -number),
                    UnaryOperator::Plus => operand,
                    UnaryOperator::Transpose => match operand {
                        Operand::Matrix(matrix) => Operand::Matrix(matrix.transpose()),
                        scalar => scalar,
                    },
                };
                Ok(result.into_raw())
            }
            Expression::Binary {
                operator,
                operand_a,
                operand_b,
            } => {
                let a = self.eval(operand_a, scope)?;
                let b = self.eval(operand_b, scope)?;
                if operator.is_comparison() {
                    return compare(*operator, a, b);
                }
                arithmetic(*operator, Operand::from_raw(a)?, Operand::from_raw(b)?)
                    .map(Operand::into_raw)
            }
        }
    }

    fn lookup(&self, name: &str, scope: &Scope) -> MathResult<Raw> {
        if let Some(outcome) = scope.get(name) {
            return Ok(Raw::from(outcome));
        }
        if let Some((_, number)) = CONSTANTS.iter().find(|(constant, _)| *constant == name) {
            return Ok(Raw::Number(*number));
        }
        if BUILTINS.contains(&name) {
            return Ok(Raw::Function(name.to_owned()));
        }
        Err(MathError::UnknownIdentifier(name.to_owned()))
    }
}

fn compare(operator: BinaryOperator, a: Raw, b: Raw) -> MathResult<Raw> {
    let (Raw::Number(a), Raw::Number(b)) = (&a, &b) else {
        let got = if matches!(a, Raw::Number(_)) { b.type_name() } else { a.type_name() };
        return Err(MathError::Type {
            expected: "number",
            got,
        });
    };
    let result = match operator {
        BinaryOperator::Equal => a == b,
        BinaryOperator::NotEqual => a != b,
        BinaryOperator::Less => a < b,
        BinaryOperator::LessOrEqual => a <= b,
        BinaryOperator::Greater => a > b,
        BinaryOperator::GreaterOrEqual => a >= b,
        _ => unreachable!("{operator:?} is not a comparison"),
    };
    Ok(Raw::Bool(result))
}

fn scalar_operation(operator: BinaryOperator, x: f64, y: f64) -> f64 {
    match operator {
        BinaryOperator::Add => x + y,
        BinaryOperator::Subtract => x - y,
        BinaryOperator::Multiply => x * y,
        BinaryOperator::Divide => x / y,
        BinaryOperator::Power => x.powf(y),
        // Floored modulo; the result takes the sign of the divisor.
        BinaryOperator::Remainder if y == 0.0 => x,
        BinaryOperator::Remainder => x - y * (x / y).floor(),
        _ => unreachable!("{operator:?} is not arithmetic"),
    }
}

fn arithmetic(operator: BinaryOperator, a: Operand, b: Operand) -> MathResult<Operand> {
    use BinaryOperator::*;
    match (a, b) {
        (Operand::Scalar(x), Operand::Scalar(y)) => {
            Ok(Operand::Scalar(scalar_operation(operator, x, y)))
        }
        (Operand::Matrix(a), Operand::Matrix(b)) => match operator {
            Multiply => linalg::matmul(&a, &b).map(Operand::Matrix),
            Divide => linalg::matmul(&a, &linalg::inverse(&b)?).map(Operand::Matrix),
            Power => Err(MathError::shape("matrix exponent")),
            _ => a
                .zip_with(&b, |x, y| scalar_operation(operator, x, y))
                .map(Operand::Matrix)
                .ok_or_else(|| {
                    MathError::shape(format!(
                        "[{} {}] and [{} {}] differ",
                        a.rows(),
                        a.cols(),
                        b.rows(),
                        b.cols()
                    ))
                }),
        },
        (Operand::Matrix(matrix), Operand::Scalar(y)) => match operator {
            Power => {
                let exponent = non_negative_integer(y).ok_or(MathError::Type {
                    expected: "non-negative integer exponent",
                    got: "number",
                })?;
                let exponent = u32::try_from(exponent)
                    .map_err(|_| MathError::shape("matrix exponent too large"))?;
                linalg::power(&matrix, exponent).map(Operand::Matrix)
            }
            _ => Ok(Operand::Matrix(
                matrix.map(|x| scalar_operation(operator, x, y)),
            )),
        },
        (Operand::Scalar(x), Operand::Matrix(matrix)) => match operator {
            Divide => Ok(Operand::Matrix(linalg::inverse(&matrix)?.map(|y| x * y))),
            Power => Err(MathError::shape("matrix exponent")),
            _ => Ok(Operand::Matrix(
                matrix.map(|y| scalar_operation(operator, x, y)),
            )),
        },
    }
}

fn non_negative_integer(number: f64) -> Option<usize> {
    (number >= 0.0 && number.fract() == 0.0 && number <= usize::MAX as f64)
        .then_some(number as usize)
}

fn scalar(raw: Raw) -> MathResult<f64> {
    match raw {
        Raw::Number(number) => Ok(number),
        other => Err(MathError::Type {
            expected: "number",
            got: other.type_name(),
        }),
    }
}

fn matrix(raw: Raw) -> MathResult<Matrix> {
    match Operand::from_raw(raw)? {
        Operand::Matrix(matrix) => Ok(matrix),
        Operand::Scalar(number) => Ok(Matrix::row_vector(vec![number])),
    }
}

fn dimension(raw: Raw) -> MathResult<usize> {
    let number = scalar(raw)?;
    non_negative_integer(number).ok_or(MathError::Type {
        expected: "non-negative integer",
        got: "number",
    })
}

fn allocation(rows: usize, cols: usize) -> MathResult<(usize, usize)> {
    linalg::check_size(rows, cols)?;
    Ok((rows, cols))
}

fn exactly<const N: usize>(name: &str, arguments: Vec<Raw>) -> MathResult<[Raw; N]> {
    let got = arguments.len();
    arguments
        .try_into()
        .map_err(|_| MathError::arity(name, arity_text(N), got))
}

fn arity_text(count: usize) -> &'static str {
    match count {
        0 => "0",
        1 => "1",
        2 => "2",
        _ => "more",
    }
}

fn element_wise(name: &str, arguments: Vec<Raw>, f: fn(f64) -> f64) -> MathResult<Raw> {
    let [argument] = exactly::<1>(name, arguments)?;
    Ok(Operand::from_raw(argument)?.map(f).into_raw())
}

fn extremum(name: &str, arguments: Vec<Raw>, pick: fn(f64, f64) -> f64) -> MathResult<Raw> {
    let numbers: Vec<f64> = match arguments.len() {
        0 => return Err(MathError::arity(name, "at least 1", 0)),
        1 => match arguments.into_iter().next() {
            Some(Raw::Number(number)) => vec![number],
            Some(other) => matrix(other)?.values().collect(),
            None => Vec::new(),
        },
        _ => arguments
            .into_iter()
            .map(scalar)
            .collect::<MathResult<_>>()?,
    };
    numbers
        .into_iter()
        .reduce(pick)
        .map(Raw::Number)
        .ok_or_else(|| MathError::shape(format!("{name} of an empty matrix")))
}

fn call(name: &str, arguments: Vec<Raw>) -> MathResult<Raw> {
    match name {
        "sqrt" => element_wise(name, arguments, f64::sqrt),
        "abs" => element_wise(name, arguments, f64::abs),
        "exp" => element_wise(name, arguments, f64::exp),
        "log10" => element_wise(name, arguments, f64::log10),
        "sin" => element_wise(name, arguments, f64::sin),
        "cos" => element_wise(name, arguments, f64::cos),
        "tan" => element_wise(name, arguments, f64::tan),
        "asin" => element_wise(name, arguments, f64::asin),
        "acos" => element_wise(name, arguments, f64::acos),
        "atan" => element_wise(name, arguments, f64::atan),
        "floor" => element_wise(name, arguments, f64::floor),
        "ceil" => element_wise(name, arguments, f64::ceil),
        "log" => match arguments.len() {
            1 => element_wise(name, arguments, f64::ln),
            2 => {
                let [value, base] = exactly::<2>(name, arguments)?;
                let base = scalar(base)?.ln();
                Ok(Operand::from_raw(value)?.map(|x| x.ln() / base).into_raw())
            }
            got => Err(MathError::arity(name, "1 or 2", got)),
        },
        "round" => match arguments.len() {
            // Half away from zero, like `f64::round`.
            1 => element_wise(name, arguments, f64::round),
            2 => {
                let [value, digits] = exactly::<2>(name, arguments)?;
                let factor = 10f64.powi(dimension(digits)?.min(15) as i32);
                Ok(Operand::from_raw(value)?
                    .map(|x| (x * factor).round() / factor)
                    .into_raw())
            }
            got => Err(MathError::arity(name, "1 or 2", got)),
        },
        "min" => extremum(name, arguments, f64::min),
        "max" => extremum(name, arguments, f64::max),
        "det" => {
            let [argument] = exactly::<1>(name, arguments)?;
            match Operand::from_raw(argument)? {
                Operand::Scalar(number) => Ok(Raw::Number(number)),
                Operand::Matrix(matrix) => linalg::determinant(&matrix).map(Raw::Number),
            }
        }
        "transpose" => {
            let [argument] = exactly::<1>(name, arguments)?;
            Ok(match Operand::from_raw(argument)? {
                Operand::Matrix(matrix) => Operand::Matrix(matrix.transpose()),
                scalar => scalar,
            }
            .into_raw())
        }
        "inv" => {
            let [argument] = exactly::<1>(name, arguments)?;
            match Operand::from_raw(argument)? {
                Operand::Scalar(number) if number == 0.0 => Err(MathError::Singular),
                Operand::Scalar(number) => Ok(Raw::Number(1.0 / number)),
                Operand::Matrix(matrix) => linalg::inverse(&matrix).map(|m| Raw::from(&m)),
            }
        }
        // `zeros(n)` is a length-n vector, `zeros(r, c)` an r×c matrix.
        "zeros" => match arguments.len() {
            1 => {
                let [cols] = exactly::<1>(name, arguments)?;
                let (rows, cols) = allocation(1, dimension(cols)?)?;
                Ok(Raw::from(&Matrix::zeros(rows, cols)))
            }
            2 => {
                let [rows, cols] = exactly::<2>(name, arguments)?;
                let (rows, cols) = allocation(dimension(rows)?, dimension(cols)?)?;
                Ok(Raw::from(&Matrix::zeros(rows, cols)))
            }
            got => Err(MathError::arity(name, "1 or 2", got)),
        },
        "identity" => {
            let [size] = exactly::<1>(name, arguments)?;
            let size = dimension(size)?;
            allocation(size, size)?;
            Ok(Raw::from(&Matrix::identity(size)))
        }
        _ => Err(MathError::UnknownFunction(name.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(code: &str) -> MathResult<Raw> {
        Interpreter.evaluate(code, &Scope::new())
    }

    fn eval_in(code: &str, scope: &Scope) -> MathResult<Raw> {
        Interpreter.evaluate(code, scope)
    }

    fn number(code: &str) -> f64 {
        match eval(code) {
            Ok(Raw::Number(number)) => number,
            other => panic!("Expected number from `{code}`, got {other:?}"),
        }
    }

    fn matrix_of(code: &str) -> Matrix {
        match narrow(eval(code).unwrap()) {
            Outcome::Value(Value::Matrix(matrix)) => matrix,
            other => panic!("Expected matrix from `{code}`, got {other:?}"),
        }
    }

    fn rows(rows: Vec<Vec<f64>>) -> Matrix {
        Matrix::from_rows(rows).unwrap()
    }

    #[test]
    fn test_scalar_arithmetic() {
        assert_eq!(number("1 + 2 * 3"), 7.0);
        assert_eq!(number("2^3^2"), 512.0);
        assert_eq!(number("-2^2"), -4.0);
        assert_eq!(number("(1 + 2) / 4"), 0.75);
        assert_eq!(number("7 % 3"), 1.0);
        assert_eq!(number("-7 % 3"), 2.0);
        assert_eq!(number("5 % 0"), 5.0);
        assert_eq!(number("1 / 0"), f64::INFINITY);
        assert!(number("0 / 0").is_nan());
    }

    #[test]
    fn test_constants_and_functions() {
        assert_eq!(number("pi"), consts::PI);
        assert_eq!(number("sqrt(16)"), 4.0);
        assert_eq!(number("log(8, 2)"), 3.0);
        assert_eq!(number("max(1, 5, 3)"), 5.0);
        assert_eq!(number("min([[4, 2], [3, 9]])"), 2.0);
        assert_eq!(number("round(2.346, 2)"), 2.35);
        assert_eq!(number("-Infinity"), f64::NEG_INFINITY);
    }

    #[test]
    fn test_matrix_arithmetic() {
        assert_eq!(
            matrix_of("[[1, 2], [3, 4]] * [[5], [6]]"),
            rows(vec![vec![17.0], vec![39.0]])
        );
        assert_eq!(
            matrix_of("[[1, 2], [3, 4]] + [[1, 1], [1, 1]]"),
            rows(vec![vec![2.0, 3.0], vec![4.0, 5.0]])
        );
        assert_eq!(
            matrix_of("2 * [1, 2, 3]"),
            Matrix::row_vector(vec![2.0, 4.0, 6.0])
        );
        assert_eq!(
            matrix_of("[[1, 2], [3, 4]]'"),
            rows(vec![vec![1.0, 3.0], vec![2.0, 4.0]])
        );
        assert_eq!(
            matrix_of("[[1, 1], [1, 0]]^5"),
            rows(vec![vec![8.0, 5.0], vec![5.0, 3.0]])
        );
        assert_eq!(matrix_of("zeros(2, 3)"), Matrix::zeros(2, 3));
        assert_eq!(matrix_of("identity(2)"), Matrix::identity(2));
    }

    #[test]
    fn test_linear_algebra_builtins() {
        assert!((number("det([[1, 2], [3, 4]])") + 2.0).abs() < 1e-12);
        let inverse = matrix_of("inv([[4, 7], [2, 6]])");
        let expected = [0.6, -0.7, -0.2, 0.4];
        for (actual, expected) in inverse.values().zip(expected) {
            assert!((actual - expected).abs() < 1e-12);
        }
        assert_eq!(eval("inv([[1, 2], [2, 4]])"), Err(MathError::Singular));
    }

    #[test]
    fn test_shape_mismatch() {
        assert!(matches!(eval("[1, 2] + [1, 2, 3]"), Err(MathError::Shape(_))));
        assert!(matches!(eval("[[1, 2]] * [[1, 2]]"), Err(MathError::Shape(_))));
        assert!(matches!(eval("zeros(100000, 100000)"), Err(MathError::Shape(_))));
        assert!(matches!(
            eval("zeros(1, 1048576)' * zeros(1, 1048576)"),
            Err(MathError::Shape(_))
        ));
        assert!(matches!(
            eval("identity(1024) ^ 4294967295"),
            Err(MathError::Shape(_))
        ));
    }

    #[test]
    fn test_scope_bindings() {
        let mut scope = Scope::new();
        scope.set("a", Outcome::scalar(2.0));
        scope.set("broken", Outcome::Unevaluable);
        scope.set("e", Outcome::scalar(10.0));

        assert_eq!(eval_in("a * 3", &scope), Ok(Raw::Number(6.0)));
        assert_eq!(eval_in("e", &scope), Ok(Raw::Number(10.0)));
        assert_eq!(eval_in("broken", &scope), Ok(Raw::Null));
        assert_eq!(
            eval_in("[1, broken]", &scope),
            Ok(Raw::Array(vec![Raw::Number(1.0), Raw::Null]))
        );
        assert!(matches!(
            eval_in("broken + 1", &scope),
            Err(MathError::Type { got: "null", .. })
        ));
    }

    #[test]
    fn test_non_numeric_results() {
        assert_eq!(eval("1 < 2"), Ok(Raw::Bool(true)));
        assert_eq!(eval("\"hi\""), Ok(Raw::Text("hi".into())));
        assert_eq!(eval("sqrt"), Ok(Raw::Function("sqrt".into())));
    }

    #[test]
    fn test_errors() {
        assert_eq!(eval("bogus"), Err(MathError::UnknownIdentifier("bogus".into())));
        assert_eq!(eval("frobnicate(1)"), Err(MathError::UnknownFunction("frobnicate".into())));
        assert!(matches!(eval("sqrt(1, 2)"), Err(MathError::Arity { got: 2, .. })));
        assert!(matches!(eval("1 +"), Err(MathError::Syntax(_))));
        assert!(matches!(eval("[1, bogus]"), Err(MathError::UnknownIdentifier(_))));
    }
}
