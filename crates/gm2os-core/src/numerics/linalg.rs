use faer::Mat;

pub type RealMatrix = Mat<f64>;

const SINGULAR_PIVOT_EPSILON: f64 = 1.0e-14;
const SYMMETRY_TOLERANCE: f64 = 1.0e-10;
const JACOBI_MAX_SWEEPS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LuError {
    #[error("LU factorization requires a square matrix, got {rows}x{cols}")]
    NonSquareMatrix { rows: usize, cols: usize },
    #[error("LU factorization requires a non-empty matrix")]
    EmptyMatrix,
    #[error("matrix is singular at pivot index {pivot_index}")]
    SingularMatrix { pivot_index: usize },
    #[error("right-hand side length mismatch: expected {expected}, got {actual}")]
    RhsLengthMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EigenError {
    #[error("eigen decomposition requires a square matrix, got {rows}x{cols}")]
    NonSquareMatrix { rows: usize, cols: usize },
    #[error("eigen decomposition requires a symmetric matrix, entry ({row},{col}) differs")]
    NonSymmetricMatrix { row: usize, col: usize },
    #[error("eigen decomposition requires finite matrix entries")]
    NonFiniteEntry,
}

/// Eigen decomposition `Z A Z^T = diag(values)` of a real symmetric matrix.
///
/// Row `i` of `mixing` is the normalized eigenvector of `values[i]`; values
/// are sorted in ascending order.
#[derive(Debug, Clone, PartialEq)]
pub struct SymmetricEigen {
    pub values: Vec<f64>,
    pub mixing: RealMatrix,
}

impl SymmetricEigen {
    /// Reorders eigenpairs by ascending absolute eigenvalue.
    pub fn sorted_by_magnitude(self) -> Self {
        let mut order: Vec<usize> = (0..self.values.len()).collect();
        order.sort_by(|&lhs, &rhs| self.values[lhs].abs().total_cmp(&self.values[rhs].abs()));
        self.reordered(&order)
    }

    fn reordered(self, order: &[usize]) -> Self {
        let dimension = self.values.len();
        let mut mixing = RealMatrix::zeros(dimension, dimension);
        let mut values = Vec::with_capacity(dimension);
        for (row, &source) in order.iter().enumerate() {
            values.push(self.values[source]);
            for col in 0..dimension {
                mixing[(row, col)] = self.mixing[(source, col)];
            }
        }
        Self { values, mixing }
    }
}

pub fn lu_solve(matrix: &RealMatrix, rhs: &[f64]) -> Result<Vec<f64>, LuError> {
    let dimension = validate_square_shape(matrix)?;
    if rhs.len() != dimension {
        return Err(LuError::RhsLengthMismatch {
            expected: dimension,
            actual: rhs.len(),
        });
    }

    let scale = matrix_max_abs(matrix).max(f64::MIN_POSITIVE);
    let mut lu = matrix.clone();
    let mut pivots: Vec<usize> = (0..dimension).collect();

    for pivot_col in 0..dimension {
        let mut pivot_row = pivot_col;
        for row in (pivot_col + 1)..dimension {
            if lu[(row, pivot_col)].abs() > lu[(pivot_row, pivot_col)].abs() {
                pivot_row = row;
            }
        }

        if lu[(pivot_row, pivot_col)].abs() <= SINGULAR_PIVOT_EPSILON * scale {
            return Err(LuError::SingularMatrix {
                pivot_index: pivot_col,
            });
        }

        if pivot_row != pivot_col {
            for col in 0..dimension {
                let value = lu[(pivot_col, col)];
                lu[(pivot_col, col)] = lu[(pivot_row, col)];
                lu[(pivot_row, col)] = value;
            }
            pivots.swap(pivot_col, pivot_row);
        }

        let pivot = lu[(pivot_col, pivot_col)];
        for row in (pivot_col + 1)..dimension {
            lu[(row, pivot_col)] /= pivot;
            let multiplier = lu[(row, pivot_col)];
            for col in (pivot_col + 1)..dimension {
                let updated = lu[(row, col)] - multiplier * lu[(pivot_col, col)];
                lu[(row, col)] = updated;
            }
        }
    }

    let mut forward = vec![0.0; dimension];
    for row in 0..dimension {
        let mut value = rhs[pivots[row]];
        for col in 0..row {
            value -= lu[(row, col)] * forward[col];
        }
        forward[row] = value;
    }

    let mut solution = vec![0.0; dimension];
    for row in (0..dimension).rev() {
        let mut value = forward[row];
        for col in (row + 1)..dimension {
            value -= lu[(row, col)] * solution[col];
        }
        solution[row] = value / lu[(row, row)];
    }

    Ok(solution)
}

/// Cyclic Jacobi diagonalization of a real symmetric matrix.
pub fn symmetric_eigen(matrix: &RealMatrix) -> Result<SymmetricEigen, EigenError> {
    let rows = matrix.nrows();
    let cols = matrix.ncols();
    if rows != cols {
        return Err(EigenError::NonSquareMatrix { rows, cols });
    }
    let dimension = rows;
    let scale = matrix_max_abs(matrix);
    if !scale.is_finite() {
        return Err(EigenError::NonFiniteEntry);
    }
    for row in 0..dimension {
        for col in (row + 1)..dimension {
            if (matrix[(row, col)] - matrix[(col, row)]).abs() > SYMMETRY_TOLERANCE * scale.max(1.0)
            {
                return Err(EigenError::NonSymmetricMatrix { row, col });
            }
        }
    }

    let mut a = matrix.clone();
    let mut v = identity(dimension);

    for _ in 0..JACOBI_MAX_SWEEPS {
        let off_diagonal: f64 = (0..dimension)
            .flat_map(|row| ((row + 1)..dimension).map(move |col| (row, col)))
            .map(|(row, col)| a[(row, col)] * a[(row, col)])
            .sum();
        if off_diagonal.sqrt() <= f64::EPSILON * scale {
            break;
        }

        for p in 0..dimension {
            for q in (p + 1)..dimension {
                let apq = a[(p, q)];
                if apq == 0.0 {
                    continue;
                }
                let theta = (a[(q, q)] - a[(p, p)]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..dimension {
                    let akp = a[(k, p)];
                    let akq = a[(k, q)];
                    a[(k, p)] = c * akp - s * akq;
                    a[(k, q)] = s * akp + c * akq;
                }
                for k in 0..dimension {
                    let apk = a[(p, k)];
                    let aqk = a[(q, k)];
                    a[(p, k)] = c * apk - s * aqk;
                    a[(q, k)] = s * apk + c * aqk;
                }
                for k in 0..dimension {
                    let vkp = v[(k, p)];
                    let vkq = v[(k, q)];
                    v[(k, p)] = c * vkp - s * vkq;
                    v[(k, q)] = s * vkp + c * vkq;
                }
            }
        }
    }

    let mut order: Vec<usize> = (0..dimension).collect();
    order.sort_by(|&lhs, &rhs| a[(lhs, lhs)].total_cmp(&a[(rhs, rhs)]));

    let mut mixing = RealMatrix::zeros(dimension, dimension);
    let mut values = Vec::with_capacity(dimension);
    for (row, &source) in order.iter().enumerate() {
        values.push(a[(source, source)]);
        for col in 0..dimension {
            mixing[(row, col)] = v[(col, source)];
        }
    }

    Ok(SymmetricEigen { values, mixing })
}

/// Singular values of a real 2x2 matrix in ascending order.
pub fn singular_values_2x2(matrix: &[[f64; 2]; 2]) -> [f64; 2] {
    let [[a, b], [c, d]] = *matrix;
    let frobenius = a * a + b * b + c * c + d * d;
    let determinant = a * d - b * c;
    let discriminant = (frobenius * frobenius - 4.0 * determinant * determinant)
        .max(0.0)
        .sqrt();
    let larger = (0.5 * (frobenius + discriminant)).sqrt();
    let smaller = if larger > 0.0 {
        determinant.abs() / larger
    } else {
        0.0
    };
    [smaller, larger]
}

pub fn matrix_from_rows<const N: usize>(rows: &[[f64; N]; N]) -> RealMatrix {
    let mut matrix = RealMatrix::zeros(N, N);
    for (row_index, row) in rows.iter().enumerate() {
        for (col_index, value) in row.iter().enumerate() {
            matrix[(row_index, col_index)] = *value;
        }
    }
    matrix
}

pub fn rows_from_matrix<const N: usize>(matrix: &RealMatrix) -> [[f64; N]; N] {
    let mut rows = [[0.0; N]; N];
    for (row_index, row) in rows.iter_mut().enumerate() {
        for (col_index, value) in row.iter_mut().enumerate() {
            *value = matrix[(row_index, col_index)];
        }
    }
    rows
}

pub fn identity(size: usize) -> RealMatrix {
    let mut matrix = RealMatrix::zeros(size, size);
    for index in 0..size {
        matrix[(index, index)] = 1.0;
    }
    matrix
}

/// Largest entry of `|Z Z^T - 1|`.
pub fn orthogonality_defect<const N: usize>(rows: &[[f64; N]; N]) -> f64 {
    let mut defect: f64 = 0.0;
    for i in 0..N {
        for k in 0..N {
            let product: f64 = (0..N).map(|j| rows[i][j] * rows[k][j]).sum();
            let expected = if i == k { 1.0 } else { 0.0 };
            defect = defect.max((product - expected).abs());
        }
    }
    defect
}

fn validate_square_shape(matrix: &RealMatrix) -> Result<usize, LuError> {
    let rows = matrix.nrows();
    let cols = matrix.ncols();
    if rows == 0 || cols == 0 {
        return Err(LuError::EmptyMatrix);
    }
    if rows != cols {
        return Err(LuError::NonSquareMatrix { rows, cols });
    }
    Ok(rows)
}

fn matrix_max_abs(matrix: &RealMatrix) -> f64 {
    let mut largest: f64 = 0.0;
    for row in 0..matrix.nrows() {
        for col in 0..matrix.ncols() {
            largest = largest.max(matrix[(row, col)].abs());
        }
    }
    largest
}
