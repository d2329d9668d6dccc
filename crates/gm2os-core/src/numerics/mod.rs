pub mod dilog;
pub mod linalg;
pub mod root_finding;
pub mod vector;

pub use dilog::{
    SeriesPrecision, clausen_2, clausen_2_extended, complex_dilog, dilog, dilog_complex,
    dilog_complex_extended, dilog_extended, real_dilog,
};
pub use linalg::{
    EigenError, LuError, RealMatrix, SymmetricEigen, identity, lu_solve, matrix_from_rows,
    orthogonality_defect, rows_from_matrix, singular_values_2x2, symmetric_eigen,
};
pub use root_finding::{ConvergenceCriteria, Residual, RootFindingError, RootSolution, find_root};
pub use vector::{NumericVector, VectorError};

/// Relative comparison with an absolute floor, `|a - b| <= tol * max(|a|, |b|, 1)`.
pub fn is_close(a: f64, b: f64, tolerance: f64) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= tolerance * scale
}
