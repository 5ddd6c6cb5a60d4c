use crate::error::{MathError, MathResult};
use crate::value::Matrix;

/// Largest matrix an operation may produce.
pub const MAX_ELEMENTS: usize = 1 << 20;
/// Largest number of multiply-adds one operation may spend.
pub const MAX_WORK: usize = 1 << 27;

pub fn check_size(rows: usize, cols: usize) -> MathResult<()> {
    match rows.checked_mul(cols) {
        Some(count) if count <= MAX_ELEMENTS => Ok(()),
        _ => Err(MathError::shape(format!("[{rows} {cols}] is too large"))),
    }
}

fn check_work(operation: &str, factors: &[usize]) -> MathResult<()> {
    let work = factors
        .iter()
        .try_fold(1usize, |work, &factor| work.checked_mul(factor));
    match work {
        Some(work) if work <= MAX_WORK => Ok(()),
        _ => Err(MathError::shape(format!("{operation} is too large"))),
    }
}

pub fn matmul(a: &Matrix, b: &Matrix) -> MathResult<Matrix> {
    let (m, n, p) = (a.rows(), a.cols(), b.cols());
    if n != b.rows() {
        return Err(MathError::shape(format!(
            "Matrix dimensions incompatible: [{m} {n}] × [{} {p}]",
            b.rows()
        )));
    }
    check_size(m, p)?;
    check_work("Matrix product", &[m, n, p])?;
    let mut result = Vec::with_capacity(m * p);
    for i in 0..m {
        for j in 0..p {
            let mut sum = 0.0;
            for k in 0..n {
                sum += a.get(i, k) * b.get(k, j);
            }
            result.push(sum);
        }
    }
    Matrix::new(m, p, result).ok_or_else(|| MathError::shape("matrix product"))
}

fn require_square(matrix: &Matrix, operation: &str) -> MathResult<()> {
    if matrix.is_square() {
        Ok(())
    } else {
        Err(MathError::shape(format!(
            "{operation} requires a square matrix, got [{} {}]",
            matrix.rows(),
            matrix.cols()
        )))
    }
}

fn rows_of(matrix: &Matrix) -> Vec<Vec<f64>> {
    (0..matrix.rows()).map(|row| matrix.row(row).collect()).collect()
}

/// Index of the row at or below `col` with the largest magnitude in `col`.
fn pivot_row(rows: &[Vec<f64>], col: usize) -> usize {
    (col..rows.len())
        .max_by(|&x, &y| rows[x][col].abs().total_cmp(&rows[y][col].abs()))
        .unwrap_or(col)
}

/// Gaussian elimination with partial pivoting. A singular matrix has
/// determinant `0`; it is not an error.
pub fn determinant(matrix: &Matrix) -> MathResult<f64> {
    require_square(matrix, "det")?;
    let size = matrix.rows();
    check_work("det", &[size, size, size])?;
    if size == 0 {
        return Ok(1.0);
    }
    let mut rows = rows_of(matrix);
    let mut det = 1.0;
    for col in 0..size {
        let pivot = pivot_row(&rows, col);
        if rows[pivot][col] == 0.0 {
            return Ok(0.0);
        }
        if pivot != col {
            rows.swap(pivot, col);
            det = -det;
        }
        det *= rows[col][col];
        for row in col + 1..size {
            let factor = rows[row][col] / rows[col][col];
            for k in col..size {
                rows[row][k] -= factor * rows[col][k];
            }
        }
    }
    Ok(det)
}

/// Gauss-Jordan elimination on `[matrix | identity]`.
pub fn inverse(matrix: &Matrix) -> MathResult<Matrix> {
    require_square(matrix, "inv")?;
    let size = matrix.rows();
    check_work("inv", &[size, size, size])?;
    let mut rows = rows_of(matrix);
    let mut inverse = rows_of(&Matrix::identity(size));
    for col in 0..size {
        let pivot = pivot_row(&rows, col);
        if rows[pivot][col] == 0.0 {
            return Err(MathError::Singular);
        }
        rows.swap(pivot, col);
        inverse.swap(pivot, col);

        let scale = rows[col][col];
        for k in 0..size {
            rows[col][k] /= scale;
            inverse[col][k] /= scale;
        }
        for row in 0..size {
            if row == col {
                continue;
            }
            let factor = rows[row][col];
            if factor == 0.0 {
                continue;
            }
            for k in 0..size {
                rows[row][k] -= factor * rows[col][k];
                inverse[row][k] -= factor * inverse[col][k];
            }
        }
    }
    if size == 0 {
        return Ok(Matrix::zeros(0, 0));
    }
    Matrix::from_rows(inverse).ok_or_else(|| MathError::shape("inverse"))
}

/// Repeated squaring; `power(m, 0)` is the identity.
pub fn power(matrix: &Matrix, exponent: u32) -> MathResult<Matrix> {
    require_square(matrix, "Matrix power")?;
    let size = matrix.rows();
    let products = (u32::BITS - exponent.leading_zeros() + exponent.count_ones()) as usize;
    check_work("Matrix power", &[products, size, size, size])?;
    let mut result = Matrix::identity(matrix.rows());
    let mut base = matrix.clone();
    let mut exponent = exponent;
    while exponent > 0 {
        if exponent & 1 == 1 {
            result = matmul(&result, &base)?;
        }
        exponent >>= 1;
        if exponent > 0 {
            base = matmul(&base, &base)?;
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: Vec<Vec<f64>>) -> Matrix {
        Matrix::from_rows(rows).unwrap()
    }

    fn assert_close(actual: &Matrix, expected: &Matrix) {
        assert_eq!((actual.rows(), actual.cols()), (expected.rows(), expected.cols()));
        for (a, e) in actual.values().zip(expected.values()) {
            assert!((a - e).abs() < 1e-9, "{actual} != {expected}");
        }
    }

    #[test]
    fn matmul_shapes() {
        let a = matrix(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        let b = matrix(vec![vec![5.0], vec![6.0]]);
        assert_eq!(matmul(&a, &b).unwrap(), matrix(vec![vec![17.0], vec![39.0]]));
        assert!(matches!(matmul(&b, &b), Err(MathError::Shape(_))));
    }

    #[test]
    fn determinant_with_pivoting() {
        let swapped = matrix(vec![vec![0.0, 1.0], vec![1.0, 0.0]]);
        assert_eq!(determinant(&swapped).unwrap(), -1.0);

        let a = matrix(vec![vec![2.0, 0.0, 1.0], vec![1.0, 3.0, 2.0], vec![1.0, 1.0, 1.0]]);
        assert!((determinant(&a).unwrap() - 1.0).abs() < 1e-12);

        let singular = matrix(vec![vec![1.0, 2.0], vec![2.0, 4.0]]);
        assert_eq!(determinant(&singular).unwrap(), 0.0);

        assert!(determinant(&Matrix::zeros(2, 3)).is_err());
    }

    #[test]
    fn inverse_round_trips_through_product() {
        let a = matrix(vec![vec![4.0, 7.0], vec![2.0, 6.0]]);
        let inv = inverse(&a).unwrap();
        assert_close(&inv, &matrix(vec![vec![0.6, -0.7], vec![-0.2, 0.4]]));
        assert_close(&matmul(&a, &inv).unwrap(), &Matrix::identity(2));
    }

    #[test]
    fn inverse_of_singular_fails() {
        let singular = matrix(vec![vec![1.0, 2.0], vec![2.0, 4.0]]);
        assert_eq!(inverse(&singular), Err(MathError::Singular));
    }

    #[test]
    fn power_by_squaring() {
        let a = matrix(vec![vec![1.0, 1.0], vec![1.0, 0.0]]);
        assert_eq!(power(&a, 0).unwrap(), Matrix::identity(2));
        // Fibonacci: [[F(n+1), F(n)], [F(n), F(n-1)]]
        assert_eq!(power(&a, 10).unwrap(), matrix(vec![vec![89.0, 55.0], vec![55.0, 34.0]]));
    }

    #[test]
    fn oversized_operations_are_refused() {
        let column = Matrix::zeros(1 << 20, 1);
        let row = Matrix::zeros(1, 1 << 20);
        assert!(matches!(matmul(&column, &row), Err(MathError::Shape(_))));
        assert_eq!(matmul(&row, &column).unwrap(), Matrix::zeros(1, 1));

        let large = Matrix::identity(1024);
        assert!(matches!(power(&large, u32::MAX), Err(MathError::Shape(_))));
        assert!(matches!(inverse(&large), Err(MathError::Shape(_))));
        assert!(matches!(determinant(&large), Err(MathError::Shape(_))));
        assert_eq!(power(&Matrix::identity(64), u32::MAX).unwrap(), Matrix::identity(64));
    }
}
