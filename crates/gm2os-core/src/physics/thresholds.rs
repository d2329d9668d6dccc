//! Finite, tan(beta)-enhanced threshold corrections to the bottom Yukawa.

use crate::common::constants::{ONE_OVER_16_PI2, PI};

const DEGENERACY_THRESHOLD: f64 = 1.0e-5;

/// Three-point loop function
/// `I(a,b,c) = (ab ln(a/b) + bc ln(b/c) + ca ln(c/a)) / ((a-b)(b-c)(a-c))`
/// of squared masses, continuous across degenerate arguments.
pub fn loop_function_i(a: f64, b: f64, c: f64) -> f64 {
    if !(a > 0.0 && b > 0.0 && c > 0.0) {
        return 0.0;
    }

    let mut sorted = [a, b, c];
    sorted.sort_by(f64::total_cmp);
    let [low, mid, high] = sorted;
    let (x, y, z) = if mid - low <= high - mid {
        (low, mid, high)
    } else {
        (mid, high, low)
    };

    if (x - y).abs() <= DEGENERACY_THRESHOLD * x.max(y) {
        return divided_log_derivative(0.5 * (x + y), z);
    }
    (divided_log(x, z) - divided_log(y, z)) / (x - y)
}

/// `x ln(x/c) / (x - c)`
fn divided_log(x: f64, c: f64) -> f64 {
    let t = (x - c) / c;
    if t.abs() <= DEGENERACY_THRESHOLD {
        return 1.0 + 0.5 * t - t * t / 6.0;
    }
    x * (x / c).ln() / (x - c)
}

fn divided_log_derivative(x: f64, c: f64) -> f64 {
    let r = x - c;
    if r.abs() <= DEGENERACY_THRESHOLD * c {
        return 0.5 / c - r / (3.0 * c * c);
    }
    (r - c * (x / c).ln()) / (r * r)
}

/// Inputs of the gluino and higgsino-stop contributions to `Delta_b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BottomThreshold {
    pub alpha_s: f64,
    pub gluino_mass: f64,
    pub mu: f64,
    pub tan_beta: f64,
    pub sbottom_masses: [f64; 2],
    pub stop_masses: [f64; 2],
    pub top_yukawa: f64,
    pub top_trilinear: f64,
}

impl BottomThreshold {
    pub fn delta_b(&self) -> f64 {
        let mu_tan_beta = self.mu * self.tan_beta;
        let [msb1, msb2] = self.sbottom_masses;
        let [mst1, mst2] = self.stop_masses;

        let gluino = 2.0 * self.alpha_s / (3.0 * PI)
            * self.gluino_mass
            * mu_tan_beta
            * loop_function_i(msb1 * msb1, msb2 * msb2, self.gluino_mass.powi(2));
        let higgsino = self.top_yukawa.powi(2)
            * ONE_OVER_16_PI2
            * self.top_trilinear
            * mu_tan_beta
            * loop_function_i(mst1 * mst1, mst2 * mst2, self.mu.powi(2));

        gluino + higgsino
    }
}
