use serde::{Deserialize, Serialize};

use crate::common::constants::{
    ALPHA_EM_THOMSON, DELTA_ALPHA_HADRONIC_MZ, DELTA_ALPHA_LEPTONIC_MZ, FERMI_CONSTANT, MW_POLE,
    MZ_POLE, PI, SQRT2,
};
use crate::numerics::ConvergenceCriteria;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeinbergAngleError {
    #[error("{name} must be finite and positive, got {value}")]
    InvalidParameter { name: &'static str, value: f64 },
    #[error("W pole mass {mw} must be below Z pole mass {mz}")]
    InvertedPoleMasses { mw: f64, mz: f64 },
    #[error("{quantity} is not finite at iteration {iteration}")]
    Diverged {
        quantity: &'static str,
        iteration: usize,
    },
}

/// Transverse gauge boson self-energies in GeV^2.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelfEnergies {
    pub z_at_mz: f64,
    pub z_at_zero: f64,
    pub w_at_mw: f64,
}

/// Fixed-point resummation of the on-shell weak mixing angle.
///
/// Every pass starts from the current estimates of `s^2 = sin^2(theta_W)`
/// and `rho_hat`:
///
/// ```text
/// MW_hat^2      = rho_hat c^2 MZ^2
/// delta_rho_hat = Pi_ZZ(MZ) / (rho_hat MZ^2) - Pi_WW(MW) / MW_hat^2
/// rho_hat       = 1 / (1 - delta_rho_hat)
/// delta_r_hat   = rho_hat Pi_ZZ(0) / (c^2 MZ^2) - Pi_ZZ(MZ) / MZ^2
/// s^2 c^2       = pi alpha / (sqrt(2) MZ^2 G_F (1 - delta_r_hat))
/// ```
///
/// `s^2 c^2` is clamped to `[0, 1/4]`; a clamped pass marks the result as
/// saturated. With vanishing self-energies `rho_hat` is exactly one.
#[derive(Debug, Clone, PartialEq)]
pub struct WeinbergAngle {
    criteria: ConvergenceCriteria,
    alpha_em_drbar: f64,
    fermi_constant: f64,
    self_energies: SelfEnergies,
    mz_pole: f64,
    mw_pole: f64,
    rho_hat: f64,
    iterations: usize,
    converged: bool,
    saturated: bool,
}

impl Default for WeinbergAngle {
    fn default() -> Self {
        Self {
            criteria: ConvergenceCriteria::default(),
            alpha_em_drbar: ALPHA_EM_THOMSON
                / (1.0 - DELTA_ALPHA_HADRONIC_MZ - DELTA_ALPHA_LEPTONIC_MZ),
            fermi_constant: FERMI_CONSTANT,
            self_energies: SelfEnergies::default(),
            mz_pole: MZ_POLE,
            mw_pole: MW_POLE,
            rho_hat: 1.0,
            iterations: 0,
            converged: false,
            saturated: false,
        }
    }
}

impl WeinbergAngle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_number_of_iterations(&mut self, iterations: usize) {
        self.criteria.max_iterations = iterations;
    }

    pub fn set_precision_goal(&mut self, precision_goal: f64) {
        self.criteria.precision_goal = precision_goal;
    }

    pub fn set_criteria(&mut self, criteria: ConvergenceCriteria) {
        self.criteria = criteria;
    }

    pub fn set_alpha_em_drbar(&mut self, alpha: f64) {
        self.alpha_em_drbar = alpha;
    }

    pub fn set_fermi_constant(&mut self, fermi_constant: f64) {
        self.fermi_constant = fermi_constant;
    }

    pub fn set_self_energy_z_at_mz(&mut self, value: f64) {
        self.self_energies.z_at_mz = value;
    }

    pub fn set_self_energy_z_at_0(&mut self, value: f64) {
        self.self_energies.z_at_zero = value;
    }

    pub fn set_self_energy_w_at_mw(&mut self, value: f64) {
        self.self_energies.w_at_mw = value;
    }

    pub fn set_self_energies(&mut self, self_energies: SelfEnergies) {
        self.self_energies = self_energies;
    }

    pub fn set_pole_masses(&mut self, mz: f64, mw: f64) {
        self.mz_pole = mz;
        self.mw_pole = mw;
    }

    /// `rho_hat` of the last pass of [`WeinbergAngle::calculate`].
    pub fn rho_hat(&self) -> f64 {
        self.rho_hat
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Whether some pass had no real solution and `s^2 c^2` was clamped.
    pub fn saturated(&self) -> bool {
        self.saturated
    }

    /// Returns `sin(theta_W)`. Hitting the iteration cap or clamping
    /// `s^2 c^2` is logged and the last iterate is returned.
    pub fn calculate(&mut self) -> Result<f64, WeinbergAngleError> {
        self.validate()?;

        let mut sin2_theta = 1.0 - (self.mw_pole / self.mz_pole).powi(2);
        let mut rho_hat = 1.0;
        self.rho_hat = rho_hat;
        self.iterations = 0;
        self.converged = false;
        self.saturated = false;

        for iteration in 1..=self.criteria.max_iterations {
            let delta_rho_hat = self.delta_rho_hat(rho_hat, sin2_theta);
            rho_hat = 1.0 / (1.0 - delta_rho_hat);
            if !rho_hat.is_finite() {
                return Err(WeinbergAngleError::Diverged {
                    quantity: "rho_hat",
                    iteration,
                });
            }

            let delta_r_hat = self.delta_r_hat(rho_hat, sin2_theta);
            let sin2_cos2 = self.sin2_cos2(delta_r_hat);
            if sin2_cos2.is_nan() {
                return Err(WeinbergAngleError::Diverged {
                    quantity: "delta_r_hat",
                    iteration,
                });
            }
            let clamped = sin2_cos2.clamp(0.0, 0.25);
            if clamped != sin2_cos2 {
                tracing::warn!(
                    iteration,
                    sin2_cos2,
                    "no real solution for sin^2(theta_W), clamping sin^2 cos^2 to [0, 1/4]"
                );
                self.saturated = true;
            }

            let updated = 0.5 * (1.0 - (1.0 - 4.0 * clamped).sqrt());
            let relative_change = if updated > 0.0 {
                ((updated - sin2_theta) / updated).abs()
            } else {
                sin2_theta.abs()
            };
            sin2_theta = updated;
            self.iterations = iteration;
            self.rho_hat = rho_hat;

            if relative_change < self.criteria.precision_goal {
                self.converged = true;
                break;
            }
        }

        if !self.converged {
            tracing::warn!(
                iterations = self.iterations,
                sin2_theta,
                "Weinberg angle iteration did not converge"
            );
        }

        Ok(sin2_theta.sqrt())
    }

    fn delta_rho_hat(&self, rho_hat: f64, sin2_theta: f64) -> f64 {
        let mz2 = self.mz_pole * self.mz_pole;
        let mw_hat2 = rho_hat * (1.0 - sin2_theta) * mz2;
        self.self_energies.z_at_mz / (rho_hat * mz2) - self.self_energies.w_at_mw / mw_hat2
    }

    fn delta_r_hat(&self, rho_hat: f64, sin2_theta: f64) -> f64 {
        let mz2 = self.mz_pole * self.mz_pole;
        let cos2_theta = 1.0 - sin2_theta;
        rho_hat * self.self_energies.z_at_zero / (cos2_theta * mz2)
            - self.self_energies.z_at_mz / mz2
    }

    fn sin2_cos2(&self, delta_r_hat: f64) -> f64 {
        PI * self.alpha_em_drbar
            / (SQRT2 * self.mz_pole * self.mz_pole * self.fermi_constant * (1.0 - delta_r_hat))
    }

    fn validate(&self) -> Result<(), WeinbergAngleError> {
        for (name, value) in [
            ("alpha_em_drbar", self.alpha_em_drbar),
            ("fermi_constant", self.fermi_constant),
            ("mz_pole", self.mz_pole),
            ("mw_pole", self.mw_pole),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(WeinbergAngleError::InvalidParameter { name, value });
            }
        }
        if self.mw_pole >= self.mz_pole {
            return Err(WeinbergAngleError::InvertedPoleMasses {
                mw: self.mw_pole,
                mz: self.mz_pole,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{SelfEnergies, WeinbergAngle, WeinbergAngleError};
    use crate::common::constants::{FERMI_CONSTANT, MW_POLE, MZ_POLE, PI, SQRT2};

    fn tree_level_alpha(mz: f64, mw: f64) -> f64 {
        let cos2 = (mw / mz).powi(2);
        let sin2 = 1.0 - cos2;
        sin2 * cos2 * SQRT2 * mz * mz * FERMI_CONSTANT / PI
    }

    fn corrected_engine() -> WeinbergAngle {
        let mut engine = WeinbergAngle::new();
        engine.set_alpha_em_drbar(tree_level_alpha(MZ_POLE, MW_POLE));
        engine.set_self_energies(SelfEnergies {
            z_at_mz: 80.0,
            z_at_zero: 60.0,
            w_at_mw: 55.0,
        });
        engine
    }

    #[test]
    fn tree_level_inputs_converge_in_one_pass() {
        let mut engine = WeinbergAngle::new();
        engine.set_alpha_em_drbar(tree_level_alpha(MZ_POLE, MW_POLE));

        let sin_theta = engine.calculate().expect("tree-level inputs");

        let expected = (1.0 - (MW_POLE / MZ_POLE).powi(2)).sqrt();
        assert!((sin_theta - expected).abs() <= 1.0e-12);
        assert_eq!(engine.rho_hat(), 1.0);
        assert_eq!(engine.iterations(), 1);
        assert!(engine.converged());
        assert!(!engine.saturated());
    }

    #[test]
    fn self_energies_feed_back_until_fixed_point() {
        let mut engine = corrected_engine();
        engine.set_precision_goal(1.0e-12);

        let sin_theta = engine.calculate().expect("small corrections");

        assert!(engine.converged());
        assert!(engine.iterations() > 1, "took {} passes", engine.iterations());
        assert!(engine.rho_hat() > 1.0);

        let sin2 = sin_theta * sin_theta;
        let rho_hat = engine.rho_hat();
        let rho_hat_again = 1.0 / (1.0 - engine.delta_rho_hat(rho_hat, sin2));
        assert!((rho_hat_again - rho_hat).abs() <= 1.0e-10);
        let sin2_cos2 = engine.sin2_cos2(engine.delta_r_hat(rho_hat, sin2));
        assert!((sin2 * (1.0 - sin2) - sin2_cos2).abs() <= 1.0e-10);
    }

    #[test]
    fn z_self_energy_at_zero_shifts_the_angle() {
        let mut without = corrected_engine();
        without.set_self_energy_z_at_0(0.0);
        let mut with = corrected_engine();

        let shifted = with.calculate().expect("small corrections");
        let reference = without.calculate().expect("small corrections");

        assert!(shifted > reference);
        assert!(with.converged() && without.converged());
    }

    #[test]
    fn iteration_cap_returns_last_iterate() {
        let mut engine = WeinbergAngle::new();
        engine.set_self_energy_z_at_mz(120.0);
        engine.set_self_energy_w_at_mw(10.0);
        engine.set_self_energy_z_at_0(30.0);
        engine.set_precision_goal(1.0e-300);
        engine.set_number_of_iterations(3);

        let sin_theta = engine.calculate().expect("finite iterate");

        assert_eq!(engine.iterations(), 3);
        assert!(!engine.converged());
        assert!(sin_theta.is_finite());
    }

    #[test]
    fn oversized_coupling_is_clamped_instead_of_failing() {
        let mut engine = WeinbergAngle::new();
        engine.set_alpha_em_drbar(0.05);

        let sin_theta = engine.calculate().expect("clamped iterate");

        assert!(engine.saturated());
        assert!((sin_theta - 0.5_f64.sqrt()).abs() <= 1.0e-12);
    }

    #[test]
    fn rejects_unphysical_configuration() {
        let mut engine = WeinbergAngle::new();
        engine.set_fermi_constant(0.0);
        assert_eq!(
            engine.calculate(),
            Err(WeinbergAngleError::InvalidParameter {
                name: "fermi_constant",
                value: 0.0
            })
        );

        let mut engine = WeinbergAngle::new();
        engine.set_pole_masses(80.0, 91.0);
        assert!(matches!(
            engine.calculate(),
            Err(WeinbergAngleError::InvertedPoleMasses { .. })
        ));

        let mut engine = WeinbergAngle::new();
        engine.set_self_energy_z_at_mz(f64::NAN);
        assert!(matches!(
            engine.calculate(),
            Err(WeinbergAngleError::Diverged {
                quantity: "rho_hat",
                iteration: 1
            })
        ));
    }
}
