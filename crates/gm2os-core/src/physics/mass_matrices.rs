//! Tree-level mass matrices of the MSSM without flavour violation.
//!
//! Conventions: `gY = sqrt(3/5) g1`, `v^2 = vu^2 + vd^2`, mixing matrices
//! store one mass eigenstate per row and eigenstates are sorted by
//! ascending mass.

use crate::common::constants::{GUT_NORMALIZATION, SQRT2};
use crate::numerics::{EigenError, matrix_from_rows, rows_from_matrix, symmetric_eigen};

use super::model::{DrbarParameters, Matrix2, SfermionFlavor, SfermionPole, SfermionSector};

pub fn hypercharge_coupling(g1: f64) -> f64 {
    g1 / GUT_NORMALIZATION
}

pub fn w_mass(drbar: &DrbarParameters) -> f64 {
    0.5 * drbar.g2 * drbar.vev()
}

pub fn z_mass(drbar: &DrbarParameters) -> f64 {
    0.5 * hypercharge_coupling(drbar.g1).hypot(drbar.g2) * drbar.vev()
}

/// `MA^2 = B mu (tan(beta) + 1/tan(beta))`
pub fn a0_mass(drbar: &DrbarParameters) -> f64 {
    let tan_beta = drbar.tan_beta();
    (drbar.bmu * (tan_beta + 1.0 / tan_beta)).sqrt()
}

/// Electromagnetic coupling `e = gY g2 / sqrt(gY^2 + g2^2)`.
pub fn electromagnetic_coupling(drbar: &DrbarParameters) -> f64 {
    let gy = hypercharge_coupling(drbar.g1);
    gy * drbar.g2 / gy.hypot(drbar.g2)
}

/// Vacuum expectation value giving mass to the partner fermion of `flavor`.
pub fn fermion_vev(flavor: SfermionFlavor, vu: f64, vd: f64) -> f64 {
    if flavor.is_up_type() { vu } else { vd }
}

/// Running fermion mass `y v_f / sqrt(2)` of the partner of `sector`.
pub fn fermion_mass(drbar: &DrbarParameters, sector: SfermionSector) -> f64 {
    let flavor = sector.flavor();
    let generation = sector.generation();
    drbar.yukawa(flavor)[generation][generation] * fermion_vev(flavor, drbar.vu, drbar.vd)
        / SQRT2
}

/// Eigenvalues (ascending) and rotation `Z M Z^T = diag` of a real symmetric
/// 2x2 matrix. The dominant component of each row is non-negative.
pub fn diagonalize_symmetric_2x2(matrix: &Matrix2) -> ([f64; 2], Matrix2) {
    let [[a, b], [_, d]] = *matrix;
    if b == 0.0 {
        return if a <= d {
            ([a, d], [[1.0, 0.0], [0.0, 1.0]])
        } else {
            ([d, a], [[0.0, 1.0], [1.0, 0.0]])
        };
    }

    let half_trace = 0.5 * (a + d);
    let radius = (0.5 * (a - d)).hypot(b);
    let theta = 0.5 * (2.0 * b).atan2(a - d);
    let (sin, cos) = theta.sin_cos();

    let mut mixing = [[-sin, cos], [cos, sin]];
    for row in &mut mixing {
        let dominant = if row[0].abs() >= row[1].abs() { row[0] } else { row[1] };
        if dominant < 0.0 {
            row[0] = -row[0];
            row[1] = -row[1];
        }
    }

    ([half_trace - radius, half_trace + radius], mixing)
}

/// Parameters entering one 2x2 sfermion mass matrix besides the soft masses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SfermionParameters {
    pub flavor: SfermionFlavor,
    pub gy: f64,
    pub g2: f64,
    pub vu: f64,
    pub vd: f64,
    pub mu: f64,
    pub trilinear: f64,
    pub fermion_mass: f64,
}

impl SfermionParameters {
    /// Parameters of `sector` with the running fermion mass from the Yukawa
    /// coupling.
    pub fn from_drbar(drbar: &DrbarParameters, sector: SfermionSector) -> Self {
        let flavor = sector.flavor();
        let generation = sector.generation();
        Self {
            flavor,
            gy: hypercharge_coupling(drbar.g1),
            g2: drbar.g2,
            vu: drbar.vu,
            vd: drbar.vd,
            mu: drbar.mu,
            trilinear: drbar.trilinear(flavor)[generation][generation],
            fermion_mass: fermion_mass(drbar, sector),
        }
    }

    /// D-term contributions to the (left, right) diagonal entries.
    pub fn d_terms(&self) -> (f64, f64) {
        let isospin = self.flavor.isospin();
        let charge = self.flavor.charge();
        let hypercharge = charge - isospin;
        let vev_difference = 0.25 * (self.vd * self.vd - self.vu * self.vu);
        let gy2 = self.gy * self.gy;
        (
            (isospin * self.g2 * self.g2 - hypercharge * gy2) * vev_difference,
            charge * gy2 * vev_difference,
        )
    }

    pub fn left_right_mixing(&self) -> f64 {
        let tan_beta = self.vu / self.vd;
        let higgsino_term = if self.flavor.is_up_type() {
            self.mu / tan_beta
        } else {
            self.mu * tan_beta
        };
        self.fermion_mass * (self.trilinear - higgsino_term)
    }

    pub fn mass_matrix(&self, soft_left: f64, soft_right: f64) -> Matrix2 {
        let (d_left, d_right) = self.d_terms();
        let mass2 = self.fermion_mass * self.fermion_mass;
        let mixing = self.left_right_mixing();
        [
            [soft_left + mass2 + d_left, mixing],
            [mixing, soft_right + mass2 + d_right],
        ]
    }

    /// Squared masses (ascending) and mixing for the given soft masses.
    pub fn masses_squared(&self, soft_left: f64, soft_right: f64) -> ([f64; 2], Matrix2) {
        diagonalize_symmetric_2x2(&self.mass_matrix(soft_left, soft_right))
    }

    pub fn spectrum(&self, soft_left: f64, soft_right: f64) -> SfermionPole {
        let (masses_squared, mixing) = self.masses_squared(soft_left, soft_right);
        SfermionPole {
            masses: masses_squared.map(|value| value.max(0.0).sqrt()),
            mixing,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeutralinoSpectrum {
    /// Absolute eigenvalues, ascending.
    pub masses: [f64; 4],
    pub zn: [[f64; 4]; 4],
}

impl NeutralinoSpectrum {
    pub fn bino_like_index(&self) -> usize {
        bino_like_index(&self.zn)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharginoSpectrum {
    pub masses: [f64; 2],
    pub um: Matrix2,
    pub up: Matrix2,
}

/// Row of `zn` with the largest bino component.
pub fn bino_like_index(zn: &[[f64; 4]; 4]) -> usize {
    let mut index = 0;
    for (row, entries) in zn.iter().enumerate() {
        if entries[0].abs() > zn[index][0].abs() {
            index = row;
        }
    }
    index
}

/// Couplings and mass parameters of the neutralino and chargino sectors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElectroweakinoParameters {
    pub gy: f64,
    pub g2: f64,
    pub vu: f64,
    pub vd: f64,
    pub mu: f64,
    pub m1: f64,
    pub m2: f64,
}

impl ElectroweakinoParameters {
    pub fn from_drbar(drbar: &DrbarParameters) -> Self {
        Self {
            gy: hypercharge_coupling(drbar.g1),
            g2: drbar.g2,
            vu: drbar.vu,
            vd: drbar.vd,
            mu: drbar.mu,
            m1: drbar.m1,
            m2: drbar.m2,
        }
    }

    /// Mass matrix in the (bino, wino, down higgsino, up higgsino) basis.
    pub fn neutralino_mass_matrix(&self) -> [[f64; 4]; 4] {
        let Self {
            gy,
            g2,
            vu,
            vd,
            mu,
            m1,
            m2,
        } = *self;
        [
            [m1, 0.0, -0.5 * gy * vd, 0.5 * gy * vu],
            [0.0, m2, 0.5 * g2 * vd, -0.5 * g2 * vu],
            [-0.5 * gy * vd, 0.5 * g2 * vd, 0.0, -mu],
            [0.5 * gy * vu, -0.5 * g2 * vu, -mu, 0.0],
        ]
    }

    pub fn neutralino_spectrum(&self) -> Result<NeutralinoSpectrum, EigenError> {
        let matrix = matrix_from_rows(&self.neutralino_mass_matrix());
        let eigen = symmetric_eigen(&matrix)?.sorted_by_magnitude();
        let mut masses = [0.0; 4];
        for (mass, value) in masses.iter_mut().zip(&eigen.values) {
            *mass = value.abs();
        }
        Ok(NeutralinoSpectrum {
            masses,
            zn: rows_from_matrix(&eigen.mixing),
        })
    }

    pub fn chargino_mass_matrix(&self) -> Matrix2 {
        [
            [self.m2, self.g2 * self.vu / SQRT2],
            [self.g2 * self.vd / SQRT2, self.mu],
        ]
    }

    /// Singular values of the chargino mass matrix with `UM` from `X X^T`
    /// and `UP` from `X^T X`.
    pub fn chargino_spectrum(&self) -> CharginoSpectrum {
        let [[a, b], [c, d]] = self.chargino_mass_matrix();
        let xxt = [[a * a + b * b, a * c + b * d], [a * c + b * d, c * c + d * d]];
        let xtx = [[a * a + c * c, a * b + c * d], [a * b + c * d, b * b + d * d]];
        let (values, um) = diagonalize_symmetric_2x2(&xxt);
        let (_, up) = diagonalize_symmetric_2x2(&xtx);
        CharginoSpectrum {
            masses: values.map(|value| value.max(0.0).sqrt()),
            um,
            up,
        }
    }

    pub fn chargino_masses(&self) -> [f64; 2] {
        crate::numerics::singular_values_2x2(&self.chargino_mass_matrix())
    }
}
