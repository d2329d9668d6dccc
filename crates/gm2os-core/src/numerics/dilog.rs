//! Real and complex dilogarithm `Li2` and the Clausen function `Cl2`.
//!
//! The real branch is the CERNLIB C332 `DILOG` Chebyshev expansion with its
//! six argument foldings. The complex branch maps the argument into
//! `|z| <= 1, Re(z) <= 1/2` and sums a Bernoulli series in `-ln(1 - z)`.
//!
//! Both expansions come in two precisions. They share one evaluator and
//! differ only in the coefficient tables and in the use of fused
//! multiply-add for the extended tables.

use num_complex::Complex64;

use crate::common::constants::{PI, PI2};

const HALF: f64 = 0.5;
const PI3: f64 = PI2 / 3.0;
const PI6: f64 = PI2 / 6.0;
const PI12: f64 = PI2 / 12.0;

const CHEBYSHEV_STANDARD: [f64; 20] = [
    0.429_966_935_608_136_97,
    0.409_759_875_330_771_05,
    -0.018_588_436_650_145_92,
    0.001_457_510_840_622_68,
    -0.000_143_041_844_423_40,
    0.000_015_884_155_418_80,
    -0.000_001_907_849_593_87,
    0.000_000_241_951_808_54,
    -0.000_000_031_933_412_74,
    0.000_000_004_345_450_63,
    -0.000_000_000_605_784_80,
    0.000_000_000_086_120_98,
    -0.000_000_000_012_443_32,
    0.000_000_000_001_822_56,
    -0.000_000_000_000_270_07,
    0.000_000_000_000_040_42,
    -0.000_000_000_000_006_10,
    0.000_000_000_000_000_93,
    -0.000_000_000_000_000_14,
    0.000_000_000_000_000_02,
];

const CHEBYSHEV_EXTENDED: [f64; 24] = [
    0.429_966_935_608_136_972_04,
    0.409_759_875_330_771_058_47,
    -0.018_588_436_650_145_919_65,
    0.001_457_510_840_622_678_55,
    -0.000_143_041_844_423_400_49,
    0.000_015_884_155_418_795_53,
    -0.000_001_907_849_593_865_83,
    0.000_000_241_951_808_541_65,
    -0.000_000_031_933_412_742_52,
    0.000_000_004_345_450_626_77,
    -0.000_000_000_605_784_801_18,
    0.000_000_000_086_120_977_99,
    -0.000_000_000_012_443_316_60,
    0.000_000_000_001_822_556_96,
    -0.000_000_000_000_270_067_66,
    0.000_000_000_000_040_422_09,
    -0.000_000_000_000_006_103_25,
    0.000_000_000_000_000_928_63,
    -0.000_000_000_000_000_142_26,
    0.000_000_000_000_000_021_93,
    -0.000_000_000_000_000_003_40,
    0.000_000_000_000_000_000_53,
    -0.000_000_000_000_000_000_08,
    0.000_000_000_000_000_000_01,
];

/// `B_{2n} / (2n + 1)!` for n = 1..=10.
const BERNOULLI_STANDARD: [f64; 10] = [
    -1.0 / 4.0,
    1.0 / 36.0,
    -1.0 / 3600.0,
    1.0 / 211_680.0,
    -1.0 / 10_886_400.0,
    1.0 / 526_901_760.0,
    -4.064_761_645_144_226e-11,
    8.921_691_020_456_453e-13,
    -1.993_929_586_072_108e-14,
    4.518_980_029_619_918e-16,
];

/// `B_{2n} / (2n + 1)!` for n = 1..=23.
const BERNOULLI_EXTENDED: [f64; 23] = [
    -1.0 / 4.0,
    1.0 / 36.0,
    -1.0 / 3600.0,
    1.0 / 211_680.0,
    -1.0 / 10_886_400.0,
    1.0 / 526_901_760.0,
    -4.064_761_645_144_225_526_805_909_386_291_966_67e-11,
    8.921_691_020_456_452_555_217_987_316_752_748_85e-13,
    -1.993_929_586_072_107_568_723_644_347_793_789_71e-14,
    4.518_980_029_619_918_191_650_476_552_855_593_23e-16,
    -1.035_651_761_218_124_701_448_341_154_221_865_67e-17,
    2.395_218_621_026_186_745_740_283_743_000_980_38e-19,
    -5.581_785_874_325_009_336_283_074_505_625_419_91e-21,
    1.309_150_755_418_321_285_812_307_399_186_592_30e-22,
    -3.087_419_802_426_740_293_242_279_764_866_462_43e-24,
    7.315_975_652_702_203_420_357_905_609_252_148_59e-26,
    -1.740_845_657_234_000_740_989_055_147_759_702_55e-27,
    4.157_635_644_613_899_719_617_899_620_775_226_67e-29,
    -9.962_148_488_284_622_103_194_006_702_455_838_85e-31,
    2.394_034_424_896_165_300_521_167_987_893_749_56e-32,
    -5.768_347_355_367_390_084_291_793_161_877_654_24e-34,
    1.393_179_479_647_007_977_827_886_603_911_548_33e-35,
    -3.372_121_965_485_089_470_468_473_635_254_930_96e-37,
];

/// Coefficient table selection for the series expansions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SeriesPrecision {
    #[default]
    Standard,
    Extended,
}

impl SeriesPrecision {
    const fn chebyshev(self) -> &'static [f64] {
        match self {
            Self::Standard => &CHEBYSHEV_STANDARD,
            Self::Extended => &CHEBYSHEV_EXTENDED,
        }
    }

    const fn bernoulli(self) -> &'static [f64] {
        match self {
            Self::Standard => &BERNOULLI_STANDARD,
            Self::Extended => &BERNOULLI_EXTENDED,
        }
    }

    fn multiply_add(self, a: f64, b: f64, c: f64) -> f64 {
        match self {
            Self::Standard => a * b + c,
            Self::Extended => a.mul_add(b, c),
        }
    }
}

/// Real dilogarithm `Li2(x)`.
pub fn dilog(x: f64) -> f64 {
    real_dilog(x, SeriesPrecision::Standard)
}

/// Real dilogarithm `Li2(x)` evaluated with the extended coefficient tables.
pub fn dilog_extended(x: f64) -> f64 {
    real_dilog(x, SeriesPrecision::Extended)
}

/// Complex dilogarithm `Li2(z)` on the principal branch.
pub fn dilog_complex(z: Complex64) -> Complex64 {
    complex_dilog(z, SeriesPrecision::Standard)
}

/// Complex dilogarithm `Li2(z)` evaluated with the extended coefficient tables.
pub fn dilog_complex_extended(z: Complex64) -> Complex64 {
    complex_dilog(z, SeriesPrecision::Extended)
}

/// Clausen function `Cl2(theta) = Im(Li2(exp(i theta)))`.
pub fn clausen_2(theta: f64) -> f64 {
    clausen_2_with(theta, SeriesPrecision::Standard)
}

pub fn clausen_2_extended(theta: f64) -> f64 {
    clausen_2_with(theta, SeriesPrecision::Extended)
}

pub fn real_dilog(x: f64, precision: SeriesPrecision) -> f64 {
    if x == 1.0 {
        return PI6;
    }
    if x == -1.0 {
        return -PI12;
    }

    let t = -x;
    let (y, sign, correction) = if t <= -2.0 {
        let b1 = (-t).ln();
        let b2 = (1.0 + 1.0 / t).ln();
        (-1.0 / (1.0 + t), 1.0, -PI3 + HALF * (b1 * b1 - b2 * b2))
    } else if t < -1.0 {
        let a = (-t).ln();
        (-1.0 - t, -1.0, -PI6 + a * (a + (1.0 + 1.0 / t).ln()))
    } else if t <= -0.5 {
        let a = (-t).ln();
        (-(1.0 + t) / t, 1.0, -PI6 + a * (-HALF * a + (1.0 + t).ln()))
    } else if t < 0.0 {
        let b1 = (1.0 + t).ln();
        (-t / (1.0 + t), -1.0, HALF * b1 * b1)
    } else if t <= 1.0 {
        (t, 1.0, 0.0)
    } else {
        let b1 = t.ln();
        (1.0 / t, -1.0, PI6 + HALF * b1 * b1)
    };

    let h = y + y - 1.0;
    let alfa = h + h;
    let mut b0 = 0.0;
    let mut b1 = 0.0;
    let mut b2 = 0.0;
    for &coefficient in precision.chebyshev().iter().rev() {
        b0 = precision.multiply_add(alfa, b1, coefficient) - b2;
        b2 = b1;
        b1 = b0;
    }

    -(sign * (b0 - h * b2) + correction)
}

pub fn complex_dilog(z: Complex64, precision: SeriesPrecision) -> Complex64 {
    let rz = z.re;
    let iz = z.im;
    let nz = rz * rz + iz * iz;

    if iz == 0.0 {
        let real = real_dilog(rz, precision);
        if rz <= 1.0 {
            return Complex64::new(real, 0.0);
        }
        return Complex64::new(real, -PI * rz.ln());
    } else if nz < f64::EPSILON {
        return z;
    }

    let one = Complex64::new(1.0, 0.0);
    // map onto |cz| small: cz = -ln(1 - w) for the transformed argument w
    let (cy, cz, jsgn, ipi12) = if rz <= 0.5 {
        if nz > 1.0 {
            let log_minus_z = (-z).ln();
            (-0.5 * log_minus_z * log_minus_z, -(one - one / z).ln(), -1.0, -2.0)
        } else {
            (Complex64::new(0.0, 0.0), -(one - z).ln(), 1.0, 0.0)
        }
    } else if nz <= 2.0 * rz {
        let cz = -z.ln();
        (cz * (one - z).ln(), cz, -1.0, 2.0)
    } else {
        let log_minus_z = (-z).ln();
        (-0.5 * log_minus_z * log_minus_z, -(one - one / z).ln(), -1.0, -2.0)
    };

    let series = bernoulli_series(cz, precision);
    jsgn * series + cy + ipi12 * PI12
}

/// `cz + cz^2 (b0 + cz (b1 + cz^2 (b2 + ... + cz^2 b_last)))`
fn bernoulli_series(cz: Complex64, precision: SeriesPrecision) -> Complex64 {
    let coefficients = precision.bernoulli();
    let last = coefficients.len() - 1;
    let cz2 = cz * cz;

    let mut accumulator = Complex64::new(coefficients[last], 0.0);
    for &coefficient in coefficients[1..last].iter().rev() {
        accumulator = match precision {
            SeriesPrecision::Standard => cz2 * accumulator + coefficient,
            SeriesPrecision::Extended => Complex64::new(
                cz2.re.mul_add(accumulator.re, -cz2.im * accumulator.im) + coefficient,
                cz2.re.mul_add(accumulator.im, cz2.im * accumulator.re),
            ),
        };
    }

    cz + cz2 * (cz * accumulator + coefficients[0])
}

fn clausen_2_with(theta: f64, precision: SeriesPrecision) -> f64 {
    let reduced = theta.rem_euclid(2.0 * PI);

    if reduced.abs() < f64::EPSILON
        || (reduced - PI).abs() < f64::EPSILON
        || (reduced - 2.0 * PI).abs() < f64::EPSILON
    {
        return 0.0;
    }

    complex_dilog(Complex64::from_polar(1.0, reduced), precision).im
}

#[cfg(test)]
mod tests {
    use super::{
        PI6, PI12, clausen_2, clausen_2_extended, dilog, dilog_complex, dilog_complex_extended,
        dilog_extended,
    };
    use crate::common::constants::PI;
    use num_complex::Complex64;

    const CATALAN: f64 = 0.915_965_594_177_219_015_054_6;

    #[test]
    fn exact_values_at_plus_and_minus_one() {
        assert_eq!(dilog(1.0), PI6);
        assert_eq!(dilog(-1.0), -PI12);
        assert_eq!(dilog_extended(1.0), PI6);
        assert_eq!(dilog_extended(-1.0), -PI12);
        assert!((PI6 - PI * PI / 6.0).abs() <= f64::EPSILON);
    }

    #[test]
    fn real_dilog_matches_closed_forms_on_every_branch() {
        let ln2 = 2.0_f64.ln();
        let cases = [
            (0.0, 0.0),
            (0.5, PI * PI / 12.0 - 0.5 * ln2 * ln2),
            (-0.5, -0.448_414_206_923_646_2),
            (-2.0, -1.436_746_366_883_681),
            (-3.0, -1.939_375_420_766_708_6),
            (2.0, PI * PI / 4.0),
            (3.0, 2.320_180_423_313_098_4),
            (0.9, 1.299_714_723_004_958_8),
        ];

        for (x, expected) in cases {
            for actual in [dilog(x), dilog_extended(x)] {
                assert!(
                    (actual - expected).abs() <= 1.0e-14 * expected.abs().max(1.0),
                    "Li2({x}) expected {expected:.16e} got {actual:.16e}"
                );
            }
        }
    }

    #[test]
    fn complex_dilog_on_real_axis_has_branch_cut_imaginary_part() {
        for x in [-7.5, -1.0, -0.3, 0.0, 0.25, 0.999, 1.0] {
            let value = dilog_complex(Complex64::new(x, 0.0));
            assert_eq!(value.im, 0.0);
            assert_eq!(value.re, dilog(x));
        }

        for x in [1.5, 2.0, 10.0] {
            let value = dilog_complex(Complex64::new(x, 0.0));
            assert!((value.im + PI * x.ln()).abs() <= 1.0e-15 * x.ln().max(1.0));
            let extended = dilog_complex_extended(Complex64::new(x, 0.0));
            assert_eq!(extended.im, value.im);
        }
    }

    #[test]
    fn complex_dilog_returns_argument_near_origin() {
        let z = Complex64::new(1.0e-9, -2.0e-9);
        assert_eq!(dilog_complex(z), z);
        assert_eq!(dilog_complex_extended(z), z);
    }

    #[test]
    fn complex_dilog_matches_reference_points() {
        let cases = [
            (
                Complex64::new(0.0, 1.0),
                Complex64::new(-PI * PI / 48.0, CATALAN),
            ),
            (
                Complex64::new(0.0, -1.0),
                Complex64::new(-PI * PI / 48.0, -CATALAN),
            ),
            (
                Complex64::new(0.5, 0.5),
                Complex64::new(0.453_985_269_150_295_6, 0.643_767_332_889_268_7),
            ),
            (
                Complex64::new(-2.0, 3.0),
                Complex64::new(-1.825_182_869_176_424_8, 1.474_084_998_315_571_3),
            ),
        ];

        for (z, expected) in cases {
            for actual in [dilog_complex(z), dilog_complex_extended(z)] {
                assert!(
                    (actual - expected).norm() <= 1.0e-13,
                    "Li2({z}) expected {expected} got {actual}"
                );
            }
        }
    }

    #[test]
    fn complex_dilog_satisfies_reflection_identity() {
        let one = Complex64::new(1.0, 0.0);
        let pi6 = Complex64::new(PI6, 0.0);
        for z in [
            Complex64::new(0.3, 0.4),
            Complex64::new(0.7, -0.2),
            Complex64::new(-1.5, 2.5),
            Complex64::new(2.0, 0.1),
        ] {
            let lhs = dilog_complex(z) + dilog_complex(one - z);
            let rhs = pi6 - z.ln() * (one - z).ln();
            assert!((lhs - rhs).norm() <= 1.0e-13, "reflection failed at {z}");
        }
    }

    #[test]
    fn clausen_vanishes_at_multiples_of_pi() {
        for theta in [0.0, PI, 2.0 * PI, -PI, 4.0 * PI] {
            assert_eq!(clausen_2(theta), 0.0, "Cl2({theta})");
            assert_eq!(clausen_2_extended(theta), 0.0, "Cl2({theta})");
        }
    }

    #[test]
    fn clausen_matches_catalan_and_is_periodic() {
        assert!((clausen_2(PI / 2.0) - CATALAN).abs() <= 1.0e-14);
        assert!((clausen_2(PI / 3.0) - 1.014_941_606_409_653_6).abs() <= 1.0e-14);
        assert!((clausen_2(PI / 2.0 + 2.0 * PI) - clausen_2(PI / 2.0)).abs() <= 1.0e-13);
        assert!((clausen_2(-PI / 2.0) + CATALAN).abs() <= 1.0e-13);
    }
}
