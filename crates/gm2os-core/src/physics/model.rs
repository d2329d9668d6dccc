use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{Gm2Error, Gm2Result};
use crate::numerics::{RealMatrix, matrix_from_rows};

pub type Matrix3 = [[f64; 3]; 3];
pub type Matrix2 = [[f64; 2]; 2];

pub fn diagonal3(entries: [f64; 3]) -> Matrix3 {
    let mut matrix = [[0.0; 3]; 3];
    for (index, entry) in entries.into_iter().enumerate() {
        matrix[index][index] = entry;
    }
    matrix
}

/// Sfermion families without flavour violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SfermionFlavor {
    ChargedSlepton,
    UpSquark,
    DownSquark,
}

impl SfermionFlavor {
    /// Weak isospin of the left-handed partner fermion.
    pub const fn isospin(self) -> f64 {
        match self {
            Self::ChargedSlepton | Self::DownSquark => -0.5,
            Self::UpSquark => 0.5,
        }
    }

    pub const fn charge(self) -> f64 {
        match self {
            Self::ChargedSlepton => -1.0,
            Self::UpSquark => 2.0 / 3.0,
            Self::DownSquark => -1.0 / 3.0,
        }
    }

    pub const fn is_up_type(self) -> bool {
        matches!(self, Self::UpSquark)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SfermionSector {
    Selectron,
    Smuon,
    Stau,
    Sup,
    Scharm,
    Stop,
    Sdown,
    Sstrange,
    Sbottom,
}

impl SfermionSector {
    pub const ALL: [Self; 9] = [
        Self::Selectron,
        Self::Smuon,
        Self::Stau,
        Self::Sup,
        Self::Scharm,
        Self::Stop,
        Self::Sdown,
        Self::Sstrange,
        Self::Sbottom,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Selectron => "selectron",
            Self::Smuon => "smuon",
            Self::Stau => "stau",
            Self::Sup => "sup",
            Self::Scharm => "scharm",
            Self::Stop => "stop",
            Self::Sdown => "sdown",
            Self::Sstrange => "sstrange",
            Self::Sbottom => "sbottom",
        }
    }

    /// Name of the 2x2 mixing matrix of this sector.
    pub const fn mixing_name(self) -> &'static str {
        match self {
            Self::Selectron => "ZE",
            Self::Smuon => "ZM",
            Self::Stau => "ZTau",
            Self::Sup => "ZU",
            Self::Scharm => "ZC",
            Self::Stop => "ZT",
            Self::Sdown => "ZD",
            Self::Sstrange => "ZS",
            Self::Sbottom => "ZB",
        }
    }

    pub fn from_mixing_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|sector| sector.mixing_name() == name)
    }

    pub const fn flavor(self) -> SfermionFlavor {
        match self {
            Self::Selectron | Self::Smuon | Self::Stau => SfermionFlavor::ChargedSlepton,
            Self::Sup | Self::Scharm | Self::Stop => SfermionFlavor::UpSquark,
            Self::Sdown | Self::Sstrange | Self::Sbottom => SfermionFlavor::DownSquark,
        }
    }

    pub const fn generation(self) -> usize {
        match self {
            Self::Selectron | Self::Sup | Self::Sdown => 0,
            Self::Smuon | Self::Scharm | Self::Sstrange => 1,
            Self::Stau | Self::Stop | Self::Sbottom => 2,
        }
    }

    /// Up squark sharing the left-handed doublet soft mass with this sector.
    pub const fn doublet_partner(self) -> Option<Self> {
        match self {
            Self::Sdown => Some(Self::Sup),
            Self::Sstrange => Some(Self::Scharm),
            Self::Sbottom => Some(Self::Stop),
            _ => None,
        }
    }
}

impl Display for SfermionSector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// Pole masses (ascending) and mixing of one sfermion sector. Row `i` of
/// `mixing` is mass eigenstate `i` in the (left, right) basis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SfermionPole {
    pub masses: [f64; 2],
    pub mixing: Matrix2,
}

impl SfermionPole {
    /// Index of the eigenstate with the larger left-handed component.
    pub fn left_like_index(&self) -> usize {
        if self.mixing[0][0].abs() >= self.mixing[1][0].abs() {
            0
        } else {
            1
        }
    }
}

/// Frozen pole masses and mixing matrices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalSpectrum {
    pub mw: f64,
    pub mz: f64,
    pub me: f64,
    pub mm: f64,
    pub ml: f64,
    pub mu: f64,
    pub mc: f64,
    pub mt: f64,
    pub md: f64,
    pub ms: f64,
    pub mb: f64,
    pub ma0: f64,
    #[serde(default)]
    pub sfermions: BTreeMap<SfermionSector, SfermionPole>,
    pub neutralino_masses: [f64; 4],
    pub zn: [[f64; 4]; 4],
    pub chargino_masses: [f64; 2],
    pub um: Matrix2,
    pub up: Matrix2,
}

impl PhysicalSpectrum {
    pub fn sfermion(&self, sector: SfermionSector) -> Option<&SfermionPole> {
        self.sfermions.get(&sector)
    }

    pub fn charged_lepton_masses(&self) -> [f64; 3] {
        [self.me, self.mm, self.ml]
    }

    pub fn up_quark_masses(&self) -> [f64; 3] {
        [self.mu, self.mc, self.mt]
    }

    pub fn down_quark_masses(&self) -> [f64; 3] {
        [self.md, self.ms, self.mb]
    }
}

/// Running parameters at the renormalization scale. `g1` is GUT normalized;
/// `ae`, `au`, `ad` are trilinear couplings in mass units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrbarParameters {
    pub scale: f64,
    pub g1: f64,
    pub g2: f64,
    pub g3: f64,
    pub ye: Matrix3,
    pub yu: Matrix3,
    pub yd: Matrix3,
    pub ae: Matrix3,
    pub au: Matrix3,
    pub ad: Matrix3,
    pub ml2: Matrix3,
    pub me2: Matrix3,
    pub mq2: Matrix3,
    pub mu2: Matrix3,
    pub md2: Matrix3,
    pub mu: f64,
    pub bmu: f64,
    pub m1: f64,
    pub m2: f64,
    pub m3: f64,
    pub vu: f64,
    pub vd: f64,
}

impl DrbarParameters {
    pub fn tan_beta(&self) -> f64 {
        self.vu / self.vd
    }

    pub fn vev(&self) -> f64 {
        self.vu.hypot(self.vd)
    }

    pub fn yukawa(&self, flavor: SfermionFlavor) -> &Matrix3 {
        match flavor {
            SfermionFlavor::ChargedSlepton => &self.ye,
            SfermionFlavor::UpSquark => &self.yu,
            SfermionFlavor::DownSquark => &self.yd,
        }
    }

    pub fn trilinear(&self, flavor: SfermionFlavor) -> &Matrix3 {
        match flavor {
            SfermionFlavor::ChargedSlepton => &self.ae,
            SfermionFlavor::UpSquark => &self.au,
            SfermionFlavor::DownSquark => &self.ad,
        }
    }

    /// Diagonal (left, right) soft masses squared of `sector`.
    pub fn soft_masses(&self, sector: SfermionSector) -> (f64, f64) {
        let generation = sector.generation();
        let (left, right) = match sector.flavor() {
            SfermionFlavor::ChargedSlepton => (&self.ml2, &self.me2),
            SfermionFlavor::UpSquark => (&self.mq2, &self.mu2),
            SfermionFlavor::DownSquark => (&self.mq2, &self.md2),
        };
        (left[generation][generation], right[generation][generation])
    }

    pub fn set_soft_masses(&mut self, sector: SfermionSector, left: f64, right: f64) {
        let generation = sector.generation();
        let (left_matrix, right_matrix) = match sector.flavor() {
            SfermionFlavor::ChargedSlepton => (&mut self.ml2, &mut self.me2),
            SfermionFlavor::UpSquark => (&mut self.mq2, &mut self.mu2),
            SfermionFlavor::DownSquark => (&mut self.mq2, &mut self.md2),
        };
        left_matrix[generation][generation] = left;
        right_matrix[generation][generation] = right;
    }
}

/// Read access to a mass-eigenstate spectrum plus write access to its
/// running parameters.
pub trait SpectrumState {
    fn physical(&self) -> &PhysicalSpectrum;
    fn drbar(&self) -> &DrbarParameters;
    fn drbar_mut(&mut self) -> &mut DrbarParameters;

    fn scale(&self) -> f64 {
        self.drbar().scale
    }

    /// Physical mixing matrix by name: `ZN`, `UM`, `UP` or a sfermion
    /// mixing name such as `ZM`.
    fn mixing_matrix(&self, name: &str) -> Option<RealMatrix> {
        let physical = self.physical();
        match name {
            "ZN" => Some(matrix_from_rows(&physical.zn)),
            "UM" => Some(matrix_from_rows(&physical.um)),
            "UP" => Some(matrix_from_rows(&physical.up)),
            other => SfermionSector::from_mixing_name(other)
                .and_then(|sector| physical.sfermion(sector))
                .map(|pole| matrix_from_rows(&pole.mixing)),
        }
    }
}

/// MSSM without flavour violation: running parameters plus pole spectrum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MssmNoFvModel {
    pub drbar: DrbarParameters,
    pub physical: PhysicalSpectrum,
}

impl MssmNoFvModel {
    pub fn from_json_str(source: &str) -> Gm2Result<Self> {
        serde_json::from_str(source).map_err(|error| {
            Gm2Error::input_validation(
                "INPUT.MODEL",
                format!("failed to parse model description: {error}"),
            )
        })
    }

    pub fn from_json_file(path: &Path) -> Gm2Result<Self> {
        let source = fs::read_to_string(path).map_err(|error| {
            Gm2Error::io_system(
                "IO.MODEL",
                format!("failed to read model '{}': {error}", path.display()),
            )
        })?;
        Self::from_json_str(&source)
    }

    pub fn to_json_string(&self) -> Gm2Result<String> {
        serde_json::to_string_pretty(self).map_err(|error| {
            Gm2Error::internal(
                "SYS.SERIALIZE",
                format!("failed to serialize model: {error}"),
            )
        })
    }
}

impl SpectrumState for MssmNoFvModel {
    fn physical(&self) -> &PhysicalSpectrum {
        &self.physical
    }

    fn drbar(&self) -> &DrbarParameters {
        &self.drbar
    }

    fn drbar_mut(&mut self) -> &mut DrbarParameters {
        &mut self.drbar
    }
}
