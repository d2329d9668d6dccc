pub mod mass_matrices;
pub mod model;
pub mod onshell;
pub mod thresholds;
pub mod weinberg_angle;

pub use mass_matrices::{
    CharginoSpectrum, ElectroweakinoParameters, NeutralinoSpectrum, SfermionParameters, a0_mass,
    bino_like_index, electromagnetic_coupling, fermion_mass, hypercharge_coupling, w_mass, z_mass,
};
pub use model::{
    DrbarParameters, Matrix2, Matrix3, MssmNoFvModel, PhysicalSpectrum, SfermionFlavor,
    SfermionPole, SfermionSector, SpectrumState, diagonal3,
};
pub use onshell::{ConversionConfig, MssmNoFvOnshell};
pub use thresholds::{BottomThreshold, loop_function_i};
pub use weinberg_angle::{SelfEnergies, WeinbergAngle, WeinbergAngleError};
