pub mod errors;

pub use errors::{Gm2Error, Gm2ErrorCategory, Gm2Result};

use std::fmt::{Display, Formatter};

/// Ordered stages of the on-shell conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConversionStage {
    CheckInput,
    GaugeCouplings,
    BMu,
    SfermionMasses,
    MuM1M2,
    Vev,
    YukawaCouplings,
}

impl ConversionStage {
    pub const ALL: [Self; 7] = [
        Self::CheckInput,
        Self::GaugeCouplings,
        Self::BMu,
        Self::SfermionMasses,
        Self::MuM1M2,
        Self::Vev,
        Self::YukawaCouplings,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CheckInput => "check_input",
            Self::GaugeCouplings => "convert_gauge_couplings",
            Self::BMu => "convert_BMu",
            Self::SfermionMasses => "convert_mf2",
            Self::MuM1M2 => "convert_Mu_M1_M2",
            Self::Vev => "convert_vev",
            Self::YukawaCouplings => "convert_yukawa_couplings",
        }
    }
}

impl Display for ConversionStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// Result of one iterative solve inside a stage.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    pub label: String,
    pub converged: bool,
    pub committed: bool,
    pub iterations: usize,
    pub residual_norm: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageOutcome {
    pub stage: ConversionStage,
    pub solves: Vec<SolveOutcome>,
}

impl StageOutcome {
    pub fn algebraic(stage: ConversionStage) -> Self {
        Self {
            stage,
            solves: Vec::new(),
        }
    }

    pub fn converged(&self) -> bool {
        self.solves.iter().all(|solve| solve.converged)
    }
}

/// `sin(theta_W)` resummed from `alpha(MZ)` and `G_F`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeinbergOutcome {
    pub sin_theta_w: f64,
    pub rho_hat: f64,
    pub iterations: usize,
    pub converged: bool,
    /// No real solution existed in some pass and `s^2 c^2` was clamped.
    pub saturated: bool,
}

impl WeinbergOutcome {
    pub fn succeeded(&self) -> bool {
        self.converged && !self.saturated
    }

    fn status(&self) -> &'static str {
        if self.saturated {
            "SATURATED"
        } else if self.converged {
            "ok"
        } else {
            "NOT CONVERGED"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConversionReport {
    pub stages: Vec<StageOutcome>,
    pub weinberg: Option<WeinbergOutcome>,
}

impl ConversionReport {
    pub fn converged(&self) -> bool {
        self.stages.iter().all(StageOutcome::converged)
            && self.weinberg.is_none_or(|weinberg| weinberg.succeeded())
    }

    pub fn stage(&self, stage: ConversionStage) -> Option<&StageOutcome> {
        self.stages.iter().find(|outcome| outcome.stage == stage)
    }

    pub fn unconverged_solves(&self) -> impl Iterator<Item = &SolveOutcome> {
        self.stages
            .iter()
            .flat_map(|outcome| outcome.solves.iter())
            .filter(|solve| !solve.converged)
    }
}

impl Display for ConversionReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for outcome in &self.stages {
            let status = if outcome.converged() { "ok" } else { "NOT CONVERGED" };
            writeln!(f, "{:<26} {status}", outcome.stage.as_str())?;
            for solve in &outcome.solves {
                writeln!(
                    f,
                    "  {:<24} iterations={:<4} residual={:.3e}{}",
                    solve.label,
                    solve.iterations,
                    solve.residual_norm,
                    if solve.committed { "" } else { " (kept)" }
                )?;
            }
        }
        if let Some(weinberg) = &self.weinberg {
            writeln!(f, "{:<26} {}", "weinberg_angle", weinberg.status())?;
            writeln!(
                f,
                "  {:<24} {:.10} iterations={}",
                "sin(theta_W)", weinberg.sin_theta_w, weinberg.iterations
            )?;
            writeln!(f, "  {:<24} {:.10}", "rho_hat", weinberg.rho_hat)?;
        }
        Ok(())
    }
}
