//! Mathematical constants and Standard Model reference inputs.
//!
//! Default values follow the PDG 2014 SMINPUTS set and are used whenever an
//! input file does not override them.

pub const PI: f64 = std::f64::consts::PI;
pub const PI2: f64 = PI * PI;
pub const SQRT2: f64 = std::f64::consts::SQRT_2;
pub const ONE_OVER_16_PI2: f64 = 1.0 / (16.0 * PI2);

/// Ratio of GUT to hypercharge normalization, `g1 = sqrt(5/3) gY`.
pub const GUT_NORMALIZATION: f64 = 1.290_994_448_735_805_6_f64;

pub const ALPHA_EM_THOMSON: f64 = 1.0 / 137.035_999_074_f64;
pub const DELTA_ALPHA_HADRONIC_MZ: f64 = 0.027_64_f64;
pub const DELTA_ALPHA_LEPTONIC_MZ: f64 = 0.031_497_686_f64;
pub const ALPHA_S_MZ: f64 = 0.1184_f64;
pub const FERMI_CONSTANT: f64 = 1.166_378_7e-5_f64;

pub const MZ_POLE: f64 = 91.1876_f64;
pub const MW_POLE: f64 = 80.385_f64;

pub const DEFAULT_PRECISION_GOAL: f64 = 1.0e-5;
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

#[cfg(test)]
mod tests {
    use super::{
        ALPHA_EM_THOMSON, ALPHA_S_MZ, DELTA_ALPHA_HADRONIC_MZ, DELTA_ALPHA_LEPTONIC_MZ,
        FERMI_CONSTANT, GUT_NORMALIZATION, MW_POLE, MZ_POLE, PI, PI2,
    };

    #[test]
    fn constants_match_expected_relationships() {
        assert!((PI2 - PI * PI).abs() <= f64::EPSILON);
        assert!((GUT_NORMALIZATION * GUT_NORMALIZATION - 5.0 / 3.0).abs() <= 1.0e-15);
        assert!(MW_POLE < MZ_POLE);
    }

    #[test]
    fn reference_inputs_remain_finite_and_positive() {
        for value in [
            ALPHA_EM_THOMSON,
            ALPHA_S_MZ,
            DELTA_ALPHA_HADRONIC_MZ,
            DELTA_ALPHA_LEPTONIC_MZ,
            FERMI_CONSTANT,
            MZ_POLE,
            MW_POLE,
        ] {
            assert!(value.is_finite());
            assert!(value > 0.0);
        }
    }
}
