//! Derivative-free multidimensional root finding.
//!
//! Damped Newton iteration on a forward-difference Jacobian with
//! backtracking on `|F|^2`. When the Newton step is unavailable or rejected,
//! a Cauchy step along the steepest descent direction of `|F|^2` is tried.
//! If neither decreases `|F|^2` the iterate is a stationary point and the
//! search stops there. The iteration never exceeds the configured cap and
//! never fails on non-convergence: the best iterate is always returned
//! together with a `converged` flag.

use serde::{Deserialize, Serialize};

use super::linalg::{RealMatrix, lu_solve};
use super::vector::{NumericVector, VectorError};
use crate::common::constants::{DEFAULT_MAX_ITERATIONS, DEFAULT_PRECISION_GOAL};

const FINITE_DIFFERENCE_STEP: f64 = 1.490_116_119_384_765_6e-8;
const MAX_BACKTRACKS: usize = 12;

/// Precision goal and iteration cap shared by every iterative procedure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConvergenceCriteria {
    pub precision_goal: f64,
    pub max_iterations: usize,
}

impl ConvergenceCriteria {
    pub fn new(precision_goal: f64, max_iterations: usize) -> Self {
        Self {
            precision_goal,
            max_iterations,
        }
    }
}

impl Default for ConvergenceCriteria {
    fn default() -> Self {
        Self {
            precision_goal: DEFAULT_PRECISION_GOAL,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// A system of equations `F(x) = 0` with as many equations as unknowns.
pub trait Residual {
    fn evaluate(&mut self, point: &[f64], residual: &mut [f64]);
}

impl<F> Residual for F
where
    F: FnMut(&[f64], &mut [f64]),
{
    fn evaluate(&mut self, point: &[f64], residual: &mut [f64]) {
        self(point, residual)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RootFindingError {
    #[error("root finder requires at least one unknown")]
    EmptyProblem,
    #[error("precision goal must be finite and positive, got {0}")]
    InvalidPrecisionGoal(f64),
    #[error("initial guess must be finite, got {0}")]
    NonFiniteGuess(NumericVector),
    #[error(transparent)]
    Vector(#[from] VectorError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RootSolution {
    /// Best iterate found, the root when `converged` is set.
    pub solution: NumericVector,
    pub residual: NumericVector,
    /// `max_i |F_i|` at `solution`.
    pub residual_norm: f64,
    pub iterations: usize,
    pub converged: bool,
}

pub fn find_root<R>(
    residual: &mut R,
    initial_guess: &NumericVector,
    criteria: ConvergenceCriteria,
) -> Result<RootSolution, RootFindingError>
where
    R: Residual + ?Sized,
{
    let dimension = initial_guess.size();
    if dimension == 0 {
        return Err(RootFindingError::EmptyProblem);
    }
    if !(criteria.precision_goal.is_finite() && criteria.precision_goal > 0.0) {
        return Err(RootFindingError::InvalidPrecisionGoal(
            criteria.precision_goal,
        ));
    }
    if !initial_guess.is_finite() {
        return Err(RootFindingError::NonFiniteGuess(initial_guess.clone()));
    }

    let mut point = initial_guess.clone();
    let mut values = NumericVector::zeros(dimension)?;
    residual.evaluate(point.as_slice(), values.as_mut_slice());

    let mut best_point = point.clone();
    let mut best_values = values.clone();
    let mut best_norm = residual_norm(&values);
    let mut iterations = 0;

    let mut trial_point = NumericVector::zeros(dimension)?;
    let mut trial_values = NumericVector::zeros(dimension)?;

    while best_norm > criteria.precision_goal && iterations < criteria.max_iterations {
        if !values.is_finite() {
            break;
        }
        iterations += 1;

        let jacobian = finite_difference_jacobian(residual, &point, &values)?;
        let current = squared_norm(values.as_slice());
        let mut line_search = |step: &[f64]| {
            backtrack(
                residual,
                &point,
                step,
                current,
                &mut trial_point,
                &mut trial_values,
            )
        };
        let accepted = newton_step(&jacobian, values.as_slice())
            .is_some_and(|step| line_search(&step))
            || cauchy_step(&jacobian, values.as_slice()).is_some_and(|step| line_search(&step));
        if !accepted {
            break;
        }

        point.assign(trial_point.as_slice())?;
        values.assign(trial_values.as_slice())?;

        let norm = residual_norm(&values);
        if norm < best_norm {
            best_norm = norm;
            best_point.assign(point.as_slice())?;
            best_values.assign(values.as_slice())?;
        }
    }

    Ok(RootSolution {
        solution: best_point,
        residual: best_values,
        residual_norm: best_norm,
        iterations,
        converged: best_norm <= criteria.precision_goal,
    })
}

fn finite_difference_jacobian<R>(
    residual: &mut R,
    point: &NumericVector,
    values: &NumericVector,
) -> Result<RealMatrix, VectorError>
where
    R: Residual + ?Sized,
{
    let dimension = point.size();
    let mut jacobian = RealMatrix::zeros(dimension, dimension);
    let mut shifted = point.clone();
    let mut shifted_values = NumericVector::zeros(dimension)?;

    for col in 0..dimension {
        let x = point.get(col)?;
        let step = FINITE_DIFFERENCE_STEP * x.abs().max(1.0);
        shifted.set(col, x + step)?;
        residual.evaluate(shifted.as_slice(), shifted_values.as_mut_slice());
        for row in 0..dimension {
            jacobian[(row, col)] = (shifted_values.get(row)? - values.get(row)?) / step;
        }
        shifted.set(col, x)?;
    }

    Ok(jacobian)
}

/// Halves the step until `|F|^2` decreases. The trial buffers hold the
/// accepted point on success; `point` itself is never moved.
fn backtrack<R>(
    residual: &mut R,
    point: &NumericVector,
    step: &[f64],
    current: f64,
    trial_point: &mut NumericVector,
    trial_values: &mut NumericVector,
) -> bool
where
    R: Residual + ?Sized,
{
    let mut lambda = 1.0;
    for _ in 0..MAX_BACKTRACKS {
        for ((trial, &x), &dx) in trial_point.iter_mut().zip(point.iter()).zip(step) {
            *trial = x + lambda * dx;
        }
        residual.evaluate(trial_point.as_slice(), trial_values.as_mut_slice());
        if trial_values.is_finite() && squared_norm(trial_values.as_slice()) < current {
            return true;
        }
        lambda *= 0.5;
    }
    false
}

/// Newton step `-J^-1 F`, `None` when `J` is singular.
fn newton_step(jacobian: &RealMatrix, values: &[f64]) -> Option<Vec<f64>> {
    let negated: Vec<f64> = values.iter().map(|value| -value).collect();
    lu_solve(jacobian, &negated)
        .ok()
        .filter(|step| step.iter().all(|value| value.is_finite()))
}

/// Minimizer of the linear model of `|F|^2` along `-J^T F`.
fn cauchy_step(jacobian: &RealMatrix, values: &[f64]) -> Option<Vec<f64>> {
    let dimension = values.len();
    let gradient: Vec<f64> = (0..dimension)
        .map(|col| (0..dimension).map(|row| jacobian[(row, col)] * values[row]).sum())
        .collect();
    let gradient_norm = squared_norm(&gradient);
    if gradient_norm == 0.0 || !gradient_norm.is_finite() {
        return None;
    }

    let projected: Vec<f64> = (0..dimension)
        .map(|row| (0..dimension).map(|col| jacobian[(row, col)] * gradient[col]).sum())
        .collect();
    let projected_norm = squared_norm(&projected);
    let scale = if projected_norm > 0.0 {
        gradient_norm / projected_norm
    } else {
        1.0
    };

    Some(gradient.iter().map(|value| -scale * value).collect())
}

fn squared_norm(values: &[f64]) -> f64 {
    values.iter().map(|value| value * value).sum()
}

fn residual_norm(values: &NumericVector) -> f64 {
    if values.is_finite() {
        values.max_abs()
    } else {
        f64::INFINITY
    }
}
