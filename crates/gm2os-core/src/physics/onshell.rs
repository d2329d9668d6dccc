//! Conversion of running MSSM parameters to the on-shell scheme.
//!
//! The stages run in a fixed order: `check_input`, gauge couplings, `B mu`,
//! sfermion soft masses, `(mu, M1, M2)`, vacuum expectation values and
//! Yukawa couplings. Sfermion and electroweakino stages match tree-level
//! masses to the frozen pole spectrum with [`find_root`]; both evaluate the
//! mass matrices with the on-shell vevs and Yukawa couplings that the last
//! two stages commit.

use std::fmt::{Display, Formatter};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::constants::{
    ALPHA_EM_THOMSON, ALPHA_S_MZ, DELTA_ALPHA_HADRONIC_MZ, DELTA_ALPHA_LEPTONIC_MZ, FERMI_CONSTANT,
    GUT_NORMALIZATION, PI, SQRT2,
};
use crate::domain::{
    ConversionReport, ConversionStage, Gm2Error, Gm2Result, SolveOutcome, StageOutcome,
    WeinbergOutcome,
};
use crate::numerics::{
    ConvergenceCriteria, NumericVector, RootFindingError, RootSolution, find_root,
    orthogonality_defect,
};

use super::mass_matrices::{
    ElectroweakinoParameters, SfermionParameters, bino_like_index, electromagnetic_coupling,
    fermion_vev, hypercharge_coupling,
};
use super::model::{
    Matrix2, Matrix3, MssmNoFvModel, SfermionFlavor, SfermionPole, SfermionSector, SpectrumState,
    diagonal3,
};
use super::thresholds::BottomThreshold;
use super::weinberg_angle::{SelfEnergies, WeinbergAngle};

const ORTHOGONALITY_TOLERANCE: f64 = 1.0e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversionConfig {
    /// `alpha(MZ)`; derived from `alpha(0)` and the running contributions
    /// when absent.
    pub alpha_mz: Option<f64>,
    pub alpha_thomson: f64,
    pub delta_alpha_hadronic: f64,
    pub delta_alpha_leptonic: f64,
    /// `alpha_s(MZ)` in the gluino contribution to `Delta_b`.
    pub alpha_s: f64,
    pub fermi_constant: f64,
    pub self_energies: SelfEnergies,
    pub sfermion_criteria: ConvergenceCriteria,
    pub electroweakino_criteria: ConvergenceCriteria,
    pub weinberg_criteria: ConvergenceCriteria,
    /// Commit the best iterate of a solve that hit its iteration cap.
    pub accept_unconverged: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            alpha_mz: None,
            alpha_thomson: ALPHA_EM_THOMSON,
            delta_alpha_hadronic: DELTA_ALPHA_HADRONIC_MZ,
            delta_alpha_leptonic: DELTA_ALPHA_LEPTONIC_MZ,
            alpha_s: ALPHA_S_MZ,
            fermi_constant: FERMI_CONSTANT,
            self_energies: SelfEnergies::default(),
            sfermion_criteria: ConvergenceCriteria::default(),
            electroweakino_criteria: ConvergenceCriteria::default(),
            weinberg_criteria: ConvergenceCriteria::default(),
            accept_unconverged: false,
        }
    }
}

impl ConversionConfig {
    pub fn alpha_mz(&self) -> f64 {
        self.alpha_mz.unwrap_or_else(|| {
            self.alpha_thomson / (1.0 - self.delta_alpha_hadronic - self.delta_alpha_leptonic)
        })
    }

    pub fn from_json_str(source: &str) -> Gm2Result<Self> {
        serde_json::from_str(source).map_err(|error| {
            Gm2Error::input_validation(
                "INPUT.CONFIG",
                format!("failed to parse conversion config: {error}"),
            )
        })
    }

    pub fn from_json_file(path: &Path) -> Gm2Result<Self> {
        let source = fs::read_to_string(path).map_err(|error| {
            Gm2Error::io_system(
                "IO.CONFIG",
                format!("failed to read config '{}': {error}", path.display()),
            )
        })?;
        Self::from_json_str(&source)
    }
}

/// Diagonal Yukawa couplings reproducing the fermion pole masses.
#[derive(Debug, Clone, Copy, PartialEq)]
struct OnshellYukawas {
    ye: [f64; 3],
    yu: [f64; 3],
    yd: [f64; 3],
}

impl OnshellYukawas {
    fn coupling(&self, sector: SfermionSector) -> f64 {
        let generation = sector.generation();
        match sector.flavor() {
            SfermionFlavor::ChargedSlepton => self.ye[generation],
            SfermionFlavor::UpSquark => self.yu[generation],
            SfermionFlavor::DownSquark => self.yd[generation],
        }
    }
}

/// On-shell parametrization of an MSSM spectrum.
///
/// Owns the spectrum for the duration of the conversion; only its running
/// parameters are modified.
#[derive(Debug, Clone)]
pub struct MssmNoFvOnshell<S = MssmNoFvModel> {
    spectrum: S,
    config: ConversionConfig,
    el: f64,
    el0: f64,
}

impl<S: SpectrumState> MssmNoFvOnshell<S> {
    pub fn new(spectrum: S) -> Self {
        Self::with_config(spectrum, ConversionConfig::default())
    }

    pub fn with_config(spectrum: S, config: ConversionConfig) -> Self {
        let el = electromagnetic_coupling(spectrum.drbar());
        let el0 = (4.0 * PI * config.alpha_thomson).sqrt();
        Self {
            spectrum,
            config,
            el,
            el0,
        }
    }

    pub fn set_alpha_mz(&mut self, alpha: f64) {
        self.config.alpha_mz = Some(alpha);
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    pub fn spectrum(&self) -> &S {
        &self.spectrum
    }

    pub fn into_spectrum(self) -> S {
        self.spectrum
    }

    /// Electromagnetic coupling at MZ.
    pub fn el(&self) -> f64 {
        self.el
    }

    /// Electromagnetic coupling in the Thomson limit.
    pub fn el0(&self) -> f64 {
        self.el0
    }

    pub fn gy(&self) -> f64 {
        hypercharge_coupling(self.spectrum.drbar().g1)
    }

    pub fn tan_beta(&self) -> f64 {
        self.spectrum.drbar().tan_beta()
    }

    pub fn mudim(&self) -> f64 {
        self.spectrum.scale()
    }

    pub fn ae(&self) -> Matrix3 {
        self.spectrum.drbar().ae
    }

    pub fn au(&self) -> Matrix3 {
        self.spectrum.drbar().au
    }

    pub fn ad(&self) -> Matrix3 {
        self.spectrum.drbar().ad
    }

    pub fn mw(&self) -> f64 {
        self.spectrum.physical().mw
    }

    pub fn mz(&self) -> f64 {
        self.spectrum.physical().mz
    }

    pub fn mm(&self) -> f64 {
        self.spectrum.physical().mm
    }

    pub fn ma0(&self) -> f64 {
        self.spectrum.physical().ma0
    }

    pub fn msmu(&self) -> Option<[f64; 2]> {
        self.sfermion_pole(SfermionSector::Smuon).map(|pole| pole.masses)
    }

    pub fn usmu(&self) -> Option<Matrix2> {
        self.sfermion_pole(SfermionSector::Smuon).map(|pole| pole.mixing)
    }

    pub fn ustau(&self) -> Option<Matrix2> {
        self.sfermion_pole(SfermionSector::Stau).map(|pole| pole.mixing)
    }

    pub fn msbot(&self) -> Option<[f64; 2]> {
        self.sfermion_pole(SfermionSector::Sbottom).map(|pole| pole.masses)
    }

    pub fn usbot(&self) -> Option<Matrix2> {
        self.sfermion_pole(SfermionSector::Sbottom).map(|pole| pole.mixing)
    }

    pub fn mstop(&self) -> Option<[f64; 2]> {
        self.sfermion_pole(SfermionSector::Stop).map(|pole| pole.masses)
    }

    pub fn ustop(&self) -> Option<Matrix2> {
        self.sfermion_pole(SfermionSector::Stop).map(|pole| pole.mixing)
    }

    fn sfermion_pole(&self, sector: SfermionSector) -> Option<SfermionPole> {
        self.spectrum.physical().sfermion(sector).copied()
    }

    /// Index of the physical neutralino with the largest bino component.
    pub fn find_bino_like_neutralino(&self) -> usize {
        bino_like_index(&self.spectrum.physical().zn)
    }

    /// Weak mixing angle engine configured with this conversion's inputs.
    pub fn weinberg_angle(&self) -> WeinbergAngle {
        let mut engine = WeinbergAngle::new();
        engine.set_criteria(self.config.weinberg_criteria);
        engine.set_alpha_em_drbar(self.config.alpha_mz());
        engine.set_fermi_constant(self.config.fermi_constant);
        engine.set_self_energies(self.config.self_energies);
        engine.set_pole_masses(self.mz(), self.mw());
        engine
    }

    /// Runs every stage once in order. Input validation failures abort
    /// before any parameter is touched; unconverged solves are reported.
    ///
    /// The weak mixing angle only depends on the inputs, so it is resummed
    /// right after `check_input` and a failure there also leaves the
    /// parameters untouched.
    pub fn convert_to_onshell(&mut self) -> Gm2Result<ConversionReport> {
        self.check_input()?;
        let weinberg = self.resum_weinberg_angle()?;

        let mut report = ConversionReport {
            weinberg: Some(weinberg),
            ..ConversionReport::default()
        };
        report
            .stages
            .push(StageOutcome::algebraic(ConversionStage::CheckInput));
        report.stages.push(self.convert_gauge_couplings());
        report.stages.push(self.convert_bmu());
        report
            .stages
            .push(self.convert_mf2(self.config.sfermion_criteria)?);
        report
            .stages
            .push(self.convert_mu_m1_m2(self.config.electroweakino_criteria)?);
        report.stages.push(self.convert_vev());
        report.stages.push(self.convert_yukawa_couplings()?);

        for solve in report.unconverged_solves() {
            tracing::warn!(
                solve = %solve.label,
                committed = solve.committed,
                "conversion finished with unconverged solve"
            );
        }
        Ok(report)
    }

    fn resum_weinberg_angle(&self) -> Gm2Result<WeinbergOutcome> {
        let mut engine = self.weinberg_angle();
        let sin_theta_w = engine.calculate()?;
        Ok(WeinbergOutcome {
            sin_theta_w,
            rho_hat: engine.rho_hat(),
            iterations: engine.iterations(),
            converged: engine.converged(),
            saturated: engine.saturated(),
        })
    }

    pub fn check_input(&self) -> Gm2Result<()> {
        let physical = self.spectrum.physical();

        for (name, value) in [
            ("MW", physical.mw),
            ("MZ", physical.mz),
            ("MA0", physical.ma0),
            ("ME", physical.me),
            ("MM", physical.mm),
            ("ML", physical.ml),
            ("MU", physical.mu),
            ("MC", physical.mc),
            ("MT", physical.mt),
            ("MD", physical.md),
            ("MS", physical.ms),
            ("MB", physical.mb),
        ] {
            require_positive("INPUT.POLE_MASS", name, value)?;
        }
        if physical.mw >= physical.mz {
            return Err(Gm2Error::input_validation(
                "INPUT.POLE_MASS",
                format!(
                    "MW ({}) must be smaller than MZ ({})",
                    physical.mw, physical.mz
                ),
            ));
        }

        if physical.sfermion(SfermionSector::Smuon).is_none() {
            return Err(Gm2Error::input_validation(
                "INPUT.SFERMION",
                "smuon pole masses and mixing are required",
            ));
        }
        for (sector, pole) in &physical.sfermions {
            for mass in pole.masses {
                require_positive("INPUT.POLE_MASS", sector.as_str(), mass)?;
            }
            require_orthogonal(sector.mixing_name(), &pole.mixing)?;
        }

        for mass in physical.neutralino_masses {
            require_positive("INPUT.POLE_MASS", "neutralino", mass)?;
        }
        require_orthogonal("ZN", &physical.zn)?;
        for mass in physical.chargino_masses {
            require_positive("INPUT.POLE_MASS", "chargino", mass)?;
        }
        require_orthogonal("UM", &physical.um)?;
        require_orthogonal("UP", &physical.up)?;

        let drbar = self.spectrum.drbar();
        require_positive("INPUT.VEV", "vu", drbar.vu)?;
        require_positive("INPUT.VEV", "vd", drbar.vd)?;
        for (name, value) in [
            ("g1", drbar.g1),
            ("g2", drbar.g2),
            ("g3", drbar.g3),
            ("M3", drbar.m3),
            ("Mu", drbar.mu),
        ] {
            if !value.is_finite() {
                return Err(Gm2Error::input_validation(
                    "INPUT.PARAMETER",
                    format!("{name} must be finite, got {value}"),
                ));
            }
        }

        require_positive("INPUT.COUPLING", "alpha(0)", self.config.alpha_thomson)?;
        require_positive("INPUT.COUPLING", "alpha(MZ)", self.config.alpha_mz())?;
        require_positive("INPUT.COUPLING", "alpha_s(MZ)", self.config.alpha_s)?;
        Ok(())
    }

    pub fn convert_gauge_couplings(&mut self) -> StageOutcome {
        let alpha_mz = self.config.alpha_mz();
        self.el = (4.0 * PI * alpha_mz).sqrt();
        self.el0 = (4.0 * PI * self.config.alpha_thomson).sqrt();

        let cos_theta = self.mw() / self.mz();
        let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();
        let el = self.el;
        let drbar = self.spectrum.drbar_mut();
        drbar.g1 = GUT_NORMALIZATION * el / cos_theta;
        drbar.g2 = el / sin_theta;

        tracing::debug!(
            el,
            el0 = self.el0,
            g1 = drbar.g1,
            g2 = drbar.g2,
            "converted gauge couplings"
        );
        StageOutcome::algebraic(ConversionStage::GaugeCouplings)
    }

    pub fn convert_bmu(&mut self) -> StageOutcome {
        let tan_beta = self.tan_beta();
        let ma0 = self.ma0();
        let drbar = self.spectrum.drbar_mut();
        drbar.bmu = ma0 * ma0 * tan_beta / (1.0 + tan_beta * tan_beta);

        tracing::debug!(bmu = drbar.bmu, tan_beta, "converted B mu");
        StageOutcome::algebraic(ConversionStage::BMu)
    }

    /// Matches the diagonal sfermion soft masses to the pole masses of every
    /// sector present in the spectrum. A down squark whose up partner has
    /// already fixed the doublet mass only solves for its singlet mass.
    pub fn convert_mf2(&mut self, criteria: ConvergenceCriteria) -> Gm2Result<StageOutcome> {
        let (vu, vd) = self.onshell_vevs();
        let yukawas = self.onshell_yukawas(vu, vd)?;
        let mut outcome = StageOutcome::algebraic(ConversionStage::SfermionMasses);
        let mut committed_up_squarks = Vec::new();

        for sector in SfermionSector::ALL {
            let Some(pole) = self.sfermion_pole(sector) else {
                continue;
            };
            let parameters = self.sfermion_parameters(sector, vu, vd, &yukawas);
            let doublet_fixed = sector
                .doublet_partner()
                .is_some_and(|partner| committed_up_squarks.contains(&partner));

            let (label, root, soft_masses) = if doublet_fixed {
                let (left, _) = self.spectrum.drbar().soft_masses(sector);
                let root = match_singlet_mass(&parameters, &pole, left, criteria)?;
                let right = root.solution.get(0)?;
                (format!("{sector} (singlet)"), root, (left, right))
            } else {
                let root = match_sfermion_masses(&parameters, &pole, criteria)?;
                let masses = (root.solution.get(0)?, root.solution.get(1)?);
                (sector.to_string(), root, masses)
            };

            let committed = self.accept_solution(&label, &root);
            if committed {
                let (left, right) = soft_masses;
                self.spectrum
                    .drbar_mut()
                    .set_soft_masses(sector, left, right);
                if sector.flavor() == SfermionFlavor::UpSquark {
                    committed_up_squarks.push(sector);
                }
            }
            outcome.solves.push(solve_outcome(label, &root, committed));
        }

        Ok(outcome)
    }

    /// Matches `(mu, M1, M2)` to the bino-like neutralino and both charginos.
    pub fn convert_mu_m1_m2(&mut self, criteria: ConvergenceCriteria) -> Gm2Result<StageOutcome> {
        let (vu, vd) = self.onshell_vevs();
        let base = ElectroweakinoParameters {
            vu,
            vd,
            ..ElectroweakinoParameters::from_drbar(self.spectrum.drbar())
        };
        let physical = self.spectrum.physical();
        let bino_mass = physical.neutralino_masses[self.find_bino_like_neutralino()];
        let [light_chargino, heavy_chargino] = physical.chargino_masses;

        let mut residual = |point: &[f64], values: &mut [f64]| {
            let candidate = ElectroweakinoParameters {
                mu: point[0],
                m1: point[1],
                m2: point[2],
                ..base
            };
            values[0] = match candidate.neutralino_spectrum() {
                Ok(neutralinos) => {
                    (neutralinos.masses[neutralinos.bino_like_index()] - bino_mass) / bino_mass
                }
                Err(_) => f64::NAN,
            };
            let [light, heavy] = candidate.chargino_masses();
            values[1] = (light - light_chargino) / light_chargino;
            values[2] = (heavy - heavy_chargino) / heavy_chargino;
        };
        let guess = NumericVector::from([base.mu, base.m1, base.m2]);
        let root = find_root(&mut residual, &guess, criteria)?;

        let label = "Mu/M1/M2".to_string();
        let committed = self.accept_solution(&label, &root);
        if committed {
            let mu = root.solution.get(0)?;
            let m1 = root.solution.get(1)?;
            let m2 = root.solution.get(2)?;
            let drbar = self.spectrum.drbar_mut();
            drbar.mu = mu;
            drbar.m1 = m1;
            drbar.m2 = m2;
        }

        let mut outcome = StageOutcome::algebraic(ConversionStage::MuM1M2);
        outcome.solves.push(solve_outcome(label, &root, committed));
        Ok(outcome)
    }

    pub fn convert_vev(&mut self) -> StageOutcome {
        let (vu, vd) = self.onshell_vevs();
        let drbar = self.spectrum.drbar_mut();
        drbar.vu = vu;
        drbar.vd = vd;

        tracing::debug!(vu, vd, "converted vevs");
        StageOutcome::algebraic(ConversionStage::Vev)
    }

    pub fn convert_yukawa_couplings(&mut self) -> Gm2Result<StageOutcome> {
        let (vu, vd) = (self.spectrum.drbar().vu, self.spectrum.drbar().vd);
        let yukawas = self.onshell_yukawas(vu, vd)?;
        let drbar = self.spectrum.drbar_mut();
        drbar.ye = diagonal3(yukawas.ye);
        drbar.yu = diagonal3(yukawas.yu);
        drbar.yd = diagonal3(yukawas.yd);

        tracing::debug!(
            yt = yukawas.yu[2],
            yb = yukawas.yd[2],
            ytau = yukawas.ye[2],
            "converted Yukawa couplings"
        );
        Ok(StageOutcome::algebraic(ConversionStage::YukawaCouplings))
    }

    /// `v = 2 MW / g2` split according to the current `tan(beta)`.
    fn onshell_vevs(&self) -> (f64, f64) {
        let drbar = self.spectrum.drbar();
        let tan_beta = drbar.tan_beta();
        let vev = 2.0 * self.mw() / drbar.g2;
        let vu = vev / (1.0 + 1.0 / (tan_beta * tan_beta)).sqrt();
        (vu, vu / tan_beta)
    }

    fn onshell_yukawas(&self, vu: f64, vd: f64) -> Gm2Result<OnshellYukawas> {
        let physical = self.spectrum.physical();
        let ye = physical
            .charged_lepton_masses()
            .map(|mass| SQRT2 * mass / vd);
        let yu = physical.up_quark_masses().map(|mass| SQRT2 * mass / vu);
        let mut yd = physical.down_quark_masses().map(|mass| SQRT2 * mass / vd);

        let delta_b = self.bottom_threshold(yu[2], vu / vd);
        let resummation = 1.0 + delta_b;
        if !(resummation.is_finite() && resummation > 0.0) {
            return Err(Gm2Error::input_validation(
                "INPUT.BOTTOM_THRESHOLD",
                format!("1 + Delta_b must be finite and positive, got Delta_b = {delta_b}"),
            ));
        }
        yd[2] /= resummation;

        Ok(OnshellYukawas { ye, yu, yd })
    }

    /// `Delta_b`, or zero when the third generation squarks are absent.
    fn bottom_threshold(&self, top_yukawa: f64, tan_beta: f64) -> f64 {
        let (Some(sbottom), Some(stop)) = (
            self.sfermion_pole(SfermionSector::Sbottom),
            self.sfermion_pole(SfermionSector::Stop),
        ) else {
            return 0.0;
        };
        let drbar = self.spectrum.drbar();
        BottomThreshold {
            alpha_s: self.config.alpha_s,
            gluino_mass: drbar.m3,
            mu: drbar.mu,
            tan_beta,
            sbottom_masses: sbottom.masses,
            stop_masses: stop.masses,
            top_yukawa,
            top_trilinear: drbar.au[2][2],
        }
        .delta_b()
    }

    fn sfermion_parameters(
        &self,
        sector: SfermionSector,
        vu: f64,
        vd: f64,
        yukawas: &OnshellYukawas,
    ) -> SfermionParameters {
        let flavor = sector.flavor();
        SfermionParameters {
            vu,
            vd,
            fermion_mass: yukawas.coupling(sector) * fermion_vev(flavor, vu, vd) / SQRT2,
            ..SfermionParameters::from_drbar(self.spectrum.drbar(), sector)
        }
    }

    fn accept_solution(&self, label: &str, root: &RootSolution) -> bool {
        if root.converged {
            tracing::debug!(
                solve = label,
                iterations = root.iterations,
                residual = root.residual_norm,
                "on-shell matching converged"
            );
            return true;
        }
        tracing::warn!(
            solve = label,
            iterations = root.iterations,
            residual = root.residual_norm,
            accepted = self.config.accept_unconverged,
            "on-shell matching did not converge"
        );
        self.config.accept_unconverged
    }
}

/// Solves for (left, right) soft masses reproducing both pole masses. The
/// left-like eigenstate is matched to the left-like physical state.
fn match_sfermion_masses(
    parameters: &SfermionParameters,
    pole: &SfermionPole,
    criteria: ConvergenceCriteria,
) -> Result<RootSolution, RootFindingError> {
    let left_index = pole.left_like_index();
    let targets = [
        pole.masses[left_index].powi(2),
        pole.masses[1 - left_index].powi(2),
    ];
    let (d_left, d_right) = parameters.d_terms();
    let mass2 = parameters.fermion_mass * parameters.fermion_mass;
    let guess = NumericVector::from([
        targets[0] - mass2 - d_left,
        targets[1] - mass2 - d_right,
    ]);

    let mut residual = |point: &[f64], values: &mut [f64]| {
        let (masses, mixing) = parameters.masses_squared(point[0], point[1]);
        let left = left_like(&mixing);
        values[0] = (masses[left] - targets[0]) / targets[0];
        values[1] = (masses[1 - left] - targets[1]) / targets[1];
    };
    find_root(&mut residual, &guess, criteria)
}

/// Solves for the singlet soft mass with the doublet mass held fixed.
fn match_singlet_mass(
    parameters: &SfermionParameters,
    pole: &SfermionPole,
    left_soft_mass: f64,
    criteria: ConvergenceCriteria,
) -> Result<RootSolution, RootFindingError> {
    let target = pole.masses[1 - pole.left_like_index()].powi(2);
    let (_, d_right) = parameters.d_terms();
    let mass2 = parameters.fermion_mass * parameters.fermion_mass;
    let guess = NumericVector::from([target - mass2 - d_right]);

    let mut residual = |point: &[f64], values: &mut [f64]| {
        let (masses, mixing) = parameters.masses_squared(left_soft_mass, point[0]);
        values[0] = (masses[1 - left_like(&mixing)] - target) / target;
    };
    find_root(&mut residual, &guess, criteria)
}

fn left_like(mixing: &Matrix2) -> usize {
    if mixing[0][0].abs() >= mixing[1][0].abs() {
        0
    } else {
        1
    }
}

fn solve_outcome(label: String, root: &RootSolution, committed: bool) -> SolveOutcome {
    SolveOutcome {
        label,
        converged: root.converged,
        committed,
        iterations: root.iterations,
        residual_norm: root.residual_norm,
    }
}

fn require_positive(placeholder: &'static str, name: &str, value: f64) -> Gm2Result<()> {
    if value.is_finite() && value > 0.0 {
        return Ok(());
    }
    Err(Gm2Error::input_validation(
        placeholder,
        format!("{name} must be finite and positive, got {value}"),
    ))
}

fn require_orthogonal<const N: usize>(name: &str, mixing: &[[f64; N]; N]) -> Gm2Result<()> {
    let defect = orthogonality_defect(mixing);
    if defect <= ORTHOGONALITY_TOLERANCE {
        return Ok(());
    }
    Err(Gm2Error::input_validation(
        "INPUT.MIXING",
        format!("mixing matrix {name} is not orthogonal (defect {defect:.3e})"),
    ))
}

impl<S: SpectrumState> Display for MssmNoFvOnshell<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let drbar = self.spectrum.drbar();
        let physical = self.spectrum.physical();
        let rule = "=".repeat(44);
        let diagonal = |matrix: &Matrix3| [matrix[0][0], matrix[1][1], matrix[2][2]];

        writeln!(f, "{rule}")?;
        writeln!(f, " on-shell parameters")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "1/alpha(MZ)  = {:>16.8}", 1.0 / self.config.alpha_mz())?;
        writeln!(f, "1/alpha(0)   = {:>16.8}", 1.0 / self.config.alpha_thomson)?;
        writeln!(f, "EL           = {:>16.8}", self.el)?;
        writeln!(f, "EL0          = {:>16.8}", self.el0)?;
        writeln!(f, "gY           = {:>16.8}", self.gy())?;
        writeln!(f, "g2           = {:>16.8}", drbar.g2)?;
        writeln!(f, "g3           = {:>16.8}", drbar.g3)?;
        writeln!(f, "MW           = {:>16.8}", physical.mw)?;
        writeln!(f, "MZ           = {:>16.8}", physical.mz)?;
        writeln!(f, "MM           = {:>16.8}", physical.mm)?;
        writeln!(f, "MA0          = {:>16.8}", physical.ma0)?;
        writeln!(f, "TB           = {:>16.8}", self.tan_beta())?;
        writeln!(f, "MUDIM        = {:>16.8}", self.mudim())?;
        writeln!(f, "vu           = {:>16.8}", drbar.vu)?;
        writeln!(f, "vd           = {:>16.8}", drbar.vd)?;
        writeln!(f, "Mu           = {:>16.8}", drbar.mu)?;
        writeln!(f, "BMu          = {:>16.8}", drbar.bmu)?;
        writeln!(f, "M1           = {:>16.8}", drbar.m1)?;
        writeln!(f, "M2           = {:>16.8}", drbar.m2)?;
        writeln!(f, "M3           = {:>16.8}", drbar.m3)?;
        for (name, matrix) in [
            ("msl2", &drbar.ml2),
            ("mse2", &drbar.me2),
            ("msq2", &drbar.mq2),
            ("msu2", &drbar.mu2),
            ("msd2", &drbar.md2),
            ("Ae", &drbar.ae),
            ("Au", &drbar.au),
            ("Ad", &drbar.ad),
            ("Ye", &drbar.ye),
            ("Yu", &drbar.yu),
            ("Yd", &drbar.yd),
        ] {
            let [first, second, third] = diagonal(matrix);
            writeln!(
                f,
                "{name:<12} = diag({first:.8e}, {second:.8e}, {third:.8e})"
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConversionConfig, MssmNoFvOnshell};
    use crate::common::constants::{ALPHA_EM_THOMSON, PI};
    use crate::domain::{ConversionStage, Gm2ErrorCategory};
    use crate::physics::model::{
        DrbarParameters, MssmNoFvModel, PhysicalSpectrum, SfermionPole, SfermionSector, diagonal3,
    };
    use std::collections::BTreeMap;

    const IDENTITY2: [[f64; 2]; 2] = [[1.0, 0.0], [0.0, 1.0]];

    fn identity4() -> [[f64; 4]; 4] {
        let mut matrix = [[0.0; 4]; 4];
        for (index, row) in matrix.iter_mut().enumerate() {
            row[index] = 1.0;
        }
        matrix
    }

    fn minimal_model() -> MssmNoFvModel {
        let mut sfermions = BTreeMap::new();
        sfermions.insert(
            SfermionSector::Smuon,
            SfermionPole {
                masses: [300.0, 400.0],
                mixing: IDENTITY2,
            },
        );
        MssmNoFvModel {
            drbar: DrbarParameters {
                scale: 1000.0,
                g1: 0.46,
                g2: 0.65,
                g3: 1.05,
                ye: diagonal3([0.0, 0.0, 0.0]),
                yu: diagonal3([0.0, 0.0, 0.0]),
                yd: diagonal3([0.0, 0.0, 0.0]),
                ae: diagonal3([0.0, 200.0, 0.0]),
                au: diagonal3([0.0, 0.0, 0.0]),
                ad: diagonal3([0.0, 0.0, 0.0]),
                ml2: diagonal3([1.0e5, 1.0e5, 1.0e5]),
                me2: diagonal3([1.0e5, 1.0e5, 1.0e5]),
                mq2: diagonal3([1.0e6, 1.0e6, 1.0e6]),
                mu2: diagonal3([1.0e6, 1.0e6, 1.0e6]),
                md2: diagonal3([1.0e6, 1.0e6, 1.0e6]),
                mu: 200.0,
                bmu: 1.0e4,
                m1: 150.0,
                m2: 300.0,
                m3: 1500.0,
                vu: 174.0,
                vd: 174.0,
            },
            physical: PhysicalSpectrum {
                mw: 80.385,
                mz: 91.1876,
                me: 0.000_510_998_928,
                mm: 0.105_658_371_5,
                ml: 1.777,
                mu: 0.0022,
                mc: 1.275,
                mt: 173.34,
                md: 0.0047,
                ms: 0.095,
                mb: 4.18,
                ma0: 500.0,
                sfermions,
                neutralino_masses: [150.0, 200.0, 250.0, 300.0],
                zn: identity4(),
                chargino_masses: [200.0, 300.0],
                um: IDENTITY2,
                up: IDENTITY2,
            },
        }
    }

    #[test]
    fn gauge_couplings_follow_from_alpha_and_pole_masses() {
        let mut onshell = MssmNoFvOnshell::new(minimal_model());
        onshell.set_alpha_mz(1.0 / 128.0);
        onshell.convert_gauge_couplings();

        let el = (4.0 * PI / 128.0).sqrt();
        let cos: f64 = 80.385 / 91.1876;
        let sin = (1.0 - cos * cos).sqrt();
        assert!((onshell.el() - el).abs() <= 1.0e-14);
        assert!((onshell.gy() - el / cos).abs() <= 1.0e-14);
        assert!((onshell.spectrum().drbar.g2 - el / sin).abs() <= 1.0e-14);
        assert!((onshell.el0() - (4.0 * PI * ALPHA_EM_THOMSON).sqrt()).abs() <= 1.0e-14);
    }

    #[test]
    fn alpha_mz_defaults_to_running_thomson_value() {
        let config = ConversionConfig::default();
        let expected = ALPHA_EM_THOMSON / (1.0 - 0.02764 - 0.031497686);
        assert!((config.alpha_mz() - expected).abs() <= 1.0e-16);
        assert!((1.0 / config.alpha_mz() - 128.94).abs() < 0.05);
    }

    #[test]
    fn bmu_reproduces_pseudoscalar_mass() {
        let mut model = minimal_model();
        model.drbar.vu = 240.0;
        model.drbar.vd = 24.0;
        let mut onshell = MssmNoFvOnshell::new(model);
        onshell.convert_bmu();

        let bmu = onshell.spectrum().drbar.bmu;
        assert!((bmu - 500.0 * 500.0 * 10.0 / 101.0).abs() <= 1.0e-9);
        let tan_beta = onshell.tan_beta();
        let ma2 = bmu * (tan_beta + 1.0 / tan_beta);
        assert!((ma2.sqrt() - 500.0).abs() <= 1.0e-9);
    }

    #[test]
    fn vev_conversion_preserves_tan_beta() {
        let mut model = minimal_model();
        model.drbar.vu = 230.0;
        model.drbar.vd = 23.0;
        let mut onshell = MssmNoFvOnshell::new(model);
        onshell.convert_vev();

        let drbar = &onshell.spectrum().drbar;
        assert!((drbar.vu / drbar.vd - 10.0).abs() <= 1.0e-12);
        assert!((drbar.vev() - 2.0 * 80.385 / 0.65).abs() <= 1.0e-10);
    }

    #[test]
    fn yukawa_couplings_reproduce_fermion_masses() {
        let mut onshell = MssmNoFvOnshell::new(minimal_model());
        onshell
            .convert_yukawa_couplings()
            .expect("no bottom threshold without third generation squarks");

        let drbar = &onshell.spectrum().drbar;
        let physical = &onshell.spectrum().physical;
        assert!((drbar.ye[1][1] * drbar.vd / 2.0_f64.sqrt() - physical.mm).abs() <= 1.0e-15);
        assert!((drbar.yu[2][2] * drbar.vu / 2.0_f64.sqrt() - physical.mt).abs() <= 1.0e-12);
        assert!((drbar.yd[2][2] * drbar.vd / 2.0_f64.sqrt() - physical.mb).abs() <= 1.0e-12);
        assert_eq!(drbar.ye[0][1], 0.0);
    }

    #[test]
    fn bino_like_neutralino_follows_physical_mixing() {
        let mut model = minimal_model();
        model.physical.zn = [
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        let onshell = MssmNoFvOnshell::new(model);
        assert_eq!(onshell.find_bino_like_neutralino(), 2);
    }

    #[test]
    fn check_input_rejects_inconsistent_spectra() {
        let mut model = minimal_model();
        model.physical.mw = 95.0;
        let error = MssmNoFvOnshell::new(model)
            .check_input()
            .expect_err("MW above MZ");
        assert_eq!(error.category(), Gm2ErrorCategory::InputValidationError);
        assert_eq!(error.placeholder(), "INPUT.POLE_MASS");

        let mut model = minimal_model();
        model.physical.sfermions.clear();
        let error = MssmNoFvOnshell::new(model)
            .check_input()
            .expect_err("smuon missing");
        assert_eq!(error.placeholder(), "INPUT.SFERMION");

        let mut model = minimal_model();
        model.physical.um = [[1.0, 0.5], [0.0, 1.0]];
        let error = MssmNoFvOnshell::new(model)
            .check_input()
            .expect_err("non-orthogonal mixing");
        assert_eq!(error.placeholder(), "INPUT.MIXING");

        let mut model = minimal_model();
        model.physical.mb = f64::NAN;
        assert!(MssmNoFvOnshell::new(model).check_input().is_err());
    }

    #[test]
    fn failed_input_check_leaves_parameters_untouched() {
        let mut model = minimal_model();
        model.physical.ma0 = -1.0;
        let before = model.drbar.clone();
        let mut onshell = MssmNoFvOnshell::new(model);

        assert!(onshell.convert_to_onshell().is_err());
        assert_eq!(onshell.spectrum().drbar, before);
    }

    #[test]
    fn unmixed_smuon_soft_masses_equal_pole_masses() {
        let mut model = minimal_model();
        // tan(beta) = 1 removes D-terms; A = mu tan(beta) removes L-R mixing.
        model.drbar.ae[1][1] = model.drbar.mu;
        let mut onshell = MssmNoFvOnshell::new(model);
        let stage = onshell
            .convert_mf2(ConversionConfig::default().sfermion_criteria)
            .expect("solver runs");

        assert_eq!(stage.stage, ConversionStage::SfermionMasses);
        assert!(stage.converged());
        let drbar = &onshell.spectrum().drbar;
        let mm2 = 0.105_658_371_5_f64.powi(2);
        assert!((drbar.ml2[1][1] - (300.0_f64.powi(2) - mm2)).abs() <= 1.0e-6);
        assert!((drbar.me2[1][1] - (400.0_f64.powi(2) - mm2)).abs() <= 1.0e-6);
        assert_eq!(drbar.ml2[0][0], 1.0e5);
    }
}
