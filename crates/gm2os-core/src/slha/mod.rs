//! Minimal SLHA block reader and writer.
//!
//! Only `Block` headers (with an optional `Q=` scale), data lines and `#`
//! comments are understood. Values are read as `(integer key, value)`
//! tuples; matrices and scalars are written as `i k value # symbol(i,k)`
//! rows.

use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

use crate::physics::{ConversionConfig, Matrix3, MssmNoFvOnshell, PhysicalSpectrum, SpectrumState};

#[derive(Debug, thiserror::Error)]
pub enum SlhaError {
    #[error("failed to access SLHA file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("data line {line} appears before any block header")]
    DataOutsideBlock { line: usize },
    #[error("block header at line {line} has no name")]
    MissingBlockName { line: usize },
    #[error("invalid scale '{token}' for block {block} at line {line}")]
    InvalidScale {
        block: String,
        token: String,
        line: usize,
    },
    #[error("invalid key '{token}' in block {block} at line {line}")]
    InvalidKey {
        block: String,
        token: String,
        line: usize,
    },
    #[error("invalid value '{token}' in block {block} at line {line}")]
    InvalidValue {
        block: String,
        token: String,
        line: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockPosition {
    Front,
    #[default]
    Back,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlhaLine {
    /// Source line number, zero for generated lines.
    pub source_line: usize,
    pub data: String,
    pub comment: Option<String>,
}

impl SlhaLine {
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.data.split_whitespace()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlhaBlock {
    pub name: String,
    pub scale: Option<f64>,
    pub lines: Vec<SlhaLine>,
}

impl SlhaBlock {
    pub fn new(name: impl Into<String>, scale: Option<f64>) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            scale,
            lines: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SlhaDocument {
    blocks: Vec<SlhaBlock>,
}

impl SlhaDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(source: &str) -> Result<Self, SlhaError> {
        let mut blocks: Vec<SlhaBlock> = Vec::new();
        let mut in_decay_table = false;

        for (index, raw) in source.lines().enumerate() {
            let line = index + 1;
            let (data, comment) = match raw.split_once('#') {
                Some((data, comment)) => (data.trim(), Some(comment.trim().to_string())),
                None => (raw.trim(), None),
            };
            if data.is_empty() {
                continue;
            }

            let mut tokens = data.split_whitespace();
            let first = tokens.next().unwrap_or_default();
            if first.eq_ignore_ascii_case("BLOCK") {
                let name = tokens.next().ok_or(SlhaError::MissingBlockName { line })?;
                let scale = parse_scale(name, tokens, line)?;
                blocks.retain(|block| !block.name.eq_ignore_ascii_case(name));
                blocks.push(SlhaBlock::new(name, scale));
                in_decay_table = false;
                continue;
            }
            if first.eq_ignore_ascii_case("DECAY") {
                in_decay_table = true;
                continue;
            }
            if in_decay_table {
                continue;
            }

            let block = blocks
                .last_mut()
                .ok_or(SlhaError::DataOutsideBlock { line })?;
            block.lines.push(SlhaLine {
                source_line: line,
                data: data.to_string(),
                comment,
            });
        }

        Ok(Self { blocks })
    }

    pub fn read_from_file(path: &Path) -> Result<Self, SlhaError> {
        let source = fs::read_to_string(path).map_err(|source| SlhaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&source)
    }

    pub fn blocks(&self) -> &[SlhaBlock] {
        &self.blocks
    }

    pub fn block(&self, name: &str) -> Option<&SlhaBlock> {
        self.blocks
            .iter()
            .find(|block| block.name.eq_ignore_ascii_case(name))
    }

    /// Feeds every `(key, value)` data line of `name` to `processor`. A
    /// missing block is not an error; short lines are skipped with a warning.
    pub fn read_block<F>(&self, name: &str, mut processor: F) -> Result<(), SlhaError>
    where
        F: FnMut(i32, f64),
    {
        let Some(block) = self.block(name) else {
            return Ok(());
        };

        for line in &block.lines {
            let mut tokens = line.tokens();
            let (Some(key_token), Some(value_token)) = (tokens.next(), tokens.next()) else {
                tracing::warn!(
                    block = %block.name,
                    line = line.source_line,
                    "SLHA entry has not enough columns"
                );
                continue;
            };
            let key = key_token.parse::<i32>().map_err(|_| SlhaError::InvalidKey {
                block: block.name.clone(),
                token: key_token.to_string(),
                line: line.source_line,
            })?;
            let value = parse_number(value_token).ok_or_else(|| SlhaError::InvalidValue {
                block: block.name.clone(),
                token: value_token.to_string(),
                line: line.source_line,
            })?;
            processor(key, value);
        }
        Ok(())
    }

    pub fn read_modsel(&self) -> Result<Modsel, SlhaError> {
        let mut modsel = Modsel::default();
        self.read_block("MODSEL", |key, value| modsel.process(key, value))?;
        Ok(modsel)
    }

    pub fn fill_sminputs(&self) -> Result<SmInputs, SlhaError> {
        let mut inputs = SmInputs::default();
        self.read_block("SMINPUTS", |key, value| inputs.process(key, value))?;
        Ok(inputs)
    }

    /// Replaces (or inserts) `block` at the given end of the document.
    pub fn set_block(&mut self, block: SlhaBlock, position: BlockPosition) {
        self.blocks
            .retain(|existing| !existing.name.eq_ignore_ascii_case(&block.name));
        match position {
            BlockPosition::Front => self.blocks.insert(0, block),
            BlockPosition::Back => self.blocks.push(block),
        }
    }

    /// Writes a scalar as a 1x1 matrix.
    pub fn set_block_scalar(
        &mut self,
        name: &str,
        value: f64,
        symbol: &str,
        scale: Option<f64>,
        position: BlockPosition,
    ) {
        let mut block = SlhaBlock::new(name, scale);
        block.lines.push(matrix_line(1, 1, value, symbol.to_string()));
        self.set_block(block, position);
    }

    pub fn set_block_matrix<const R: usize, const C: usize>(
        &mut self,
        name: &str,
        matrix: &[[f64; C]; R],
        symbol: &str,
        scale: Option<f64>,
        position: BlockPosition,
    ) {
        let mut block = SlhaBlock::new(name, scale);
        for (i, row) in matrix.iter().enumerate() {
            for (k, value) in row.iter().enumerate() {
                block.lines.push(matrix_line(
                    i + 1,
                    k + 1,
                    *value,
                    format!("{symbol}({},{})", i + 1, k + 1),
                ));
            }
        }
        self.set_block(block, position);
    }

    pub fn write_to_file(&self, path: &Path) -> Result<(), SlhaError> {
        fs::write(path, self.to_string()).map_err(|source| SlhaError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Display for SlhaDocument {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for block in &self.blocks {
            write!(f, "Block {}", block.name)?;
            if let Some(scale) = block.scale {
                write!(f, " Q= {}", format_number(scale))?;
            }
            writeln!(f)?;
            for line in &block.lines {
                write!(f, " {}", line.data)?;
                if let Some(comment) = &line.comment {
                    write!(f, "   # {comment}")?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// Recognized MODSEL switches.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Modsel {
    pub parameter_output_scale: Option<f64>,
}

impl Modsel {
    fn process(&mut self, key: i32, value: f64) {
        match key {
            1 | 3 | 4 | 5 | 6 | 11 | 21 => {
                tracing::warn!(key, "MODSEL key currently not supported");
            }
            12 => self.parameter_output_scale = Some(value),
            _ => tracing::warn!(key, "unrecognized key in MODSEL"),
        }
    }
}

/// Standard model inputs from SMINPUTS.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SmInputs {
    pub alpha_em_inverse: Option<f64>,
    pub fermi_constant: Option<f64>,
    pub alpha_s: Option<f64>,
    pub mz: Option<f64>,
    pub mb: Option<f64>,
    pub mt: Option<f64>,
    pub mtau: Option<f64>,
    pub me: Option<f64>,
    pub mmu: Option<f64>,
    pub md: Option<f64>,
    pub mu: Option<f64>,
    pub ms: Option<f64>,
    pub mc: Option<f64>,
}

impl SmInputs {
    fn process(&mut self, key: i32, value: f64) {
        match key {
            1 => self.alpha_em_inverse = Some(value),
            2 => self.fermi_constant = Some(value),
            3 => self.alpha_s = Some(value),
            4 => self.mz = Some(value),
            5 => self.mb = Some(value),
            6 => self.mt = Some(value),
            7 => self.mtau = Some(value),
            11 => self.me = Some(value),
            13 => self.mmu = Some(value),
            21 => self.md = Some(value),
            22 => self.mu = Some(value),
            23 => self.ms = Some(value),
            24 => self.mc = Some(value),
            // neutrino masses
            8 | 12 | 14 => {}
            _ => tracing::warn!(key, "unrecognized key in SMINPUTS"),
        }
    }

    /// Overrides pole masses and couplings with every value that was given.
    pub fn apply(&self, physical: &mut PhysicalSpectrum, config: &mut ConversionConfig) {
        if let Some(inverse) = self.alpha_em_inverse {
            config.alpha_mz = Some(1.0 / inverse);
        }
        if let Some(fermi_constant) = self.fermi_constant {
            config.fermi_constant = fermi_constant;
        }
        if let Some(alpha_s) = self.alpha_s {
            config.alpha_s = alpha_s;
        }
        for (target, source) in [
            (&mut physical.mz, self.mz),
            (&mut physical.mb, self.mb),
            (&mut physical.mt, self.mt),
            (&mut physical.ml, self.mtau),
            (&mut physical.me, self.me),
            (&mut physical.mm, self.mmu),
            (&mut physical.md, self.md),
            (&mut physical.mu, self.mu),
            (&mut physical.ms, self.ms),
            (&mut physical.mc, self.mc),
        ] {
            if let Some(value) = source {
                *target = value;
            }
        }
    }
}

/// Appends the on-shell parameters as SLHA blocks at the renormalization
/// scale.
pub fn set_onshell_blocks<S: SpectrumState>(
    document: &mut SlhaDocument,
    onshell: &MssmNoFvOnshell<S>,
) {
    let drbar = onshell.spectrum().drbar();
    let scale = Some(onshell.mudim());
    let back = BlockPosition::Back;

    for (name, value, symbol) in [
        ("EL", onshell.el(), "EL"),
        ("EL0", onshell.el0(), "EL0"),
        ("GY", onshell.gy(), "gY"),
        ("G2", drbar.g2, "g2"),
        ("BMU", drbar.bmu, "BMu"),
        ("MU", drbar.mu, "Mu"),
        ("M1", drbar.m1, "M1"),
        ("M2", drbar.m2, "M2"),
        ("VU", drbar.vu, "vu"),
        ("VD", drbar.vd, "vd"),
    ] {
        document.set_block_scalar(name, value, symbol, scale, back);
    }

    let matrices: [(&str, &Matrix3, &str); 11] = [
        ("AE", &drbar.ae, "Ae"),
        ("AU", &drbar.au, "Au"),
        ("AD", &drbar.ad, "Ad"),
        ("YE", &drbar.ye, "Ye"),
        ("YU", &drbar.yu, "Yu"),
        ("YD", &drbar.yd, "Yd"),
        ("MSL2", &drbar.ml2, "ml2"),
        ("MSE2", &drbar.me2, "me2"),
        ("MSQ2", &drbar.mq2, "mq2"),
        ("MSU2", &drbar.mu2, "mu2"),
        ("MSD2", &drbar.md2, "md2"),
    ];
    for (name, matrix, symbol) in matrices {
        document.set_block_matrix(name, matrix, symbol, scale, back);
    }
}

/// Scientific notation right-aligned in 16 columns with a signed two digit
/// exponent, e.g. `1.00000000E+03`.
pub fn format_number(value: f64) -> String {
    let formatted = format!("{value:.8E}");
    let rendered = match formatted.split_once('E') {
        Some((mantissa, exponent)) => match exponent.parse::<i32>() {
            Ok(exponent) => {
                let sign = if exponent < 0 { '-' } else { '+' };
                format!("{mantissa}E{sign}{:02}", exponent.abs())
            }
            Err(_) => formatted.clone(),
        },
        None => formatted.clone(),
    };
    format!("{rendered:>16}")
}

fn matrix_line(i: usize, k: usize, value: f64, symbol: String) -> SlhaLine {
    SlhaLine {
        source_line: 0,
        data: format!("{i:>2} {k:>2}   {}", format_number(value)),
        comment: Some(symbol),
    }
}

/// Accepts Fortran style `D` exponents.
fn parse_number(token: &str) -> Option<f64> {
    token
        .parse::<f64>()
        .ok()
        .or_else(|| token.replace(['D', 'd'], "E").parse::<f64>().ok())
}

fn parse_scale<'a>(
    block: &str,
    mut tokens: impl Iterator<Item = &'a str>,
    line: usize,
) -> Result<Option<f64>, SlhaError> {
    let Some(token) = tokens.next() else {
        return Ok(None);
    };
    let Some(inline) = token
        .strip_prefix("Q=")
        .or_else(|| token.strip_prefix("q="))
    else {
        return Ok(None);
    };
    let value_token = if inline.is_empty() {
        tokens.next().unwrap_or_default()
    } else {
        inline
    };
    parse_number(value_token)
        .map(Some)
        .ok_or_else(|| SlhaError::InvalidScale {
            block: block.to_ascii_uppercase(),
            token: value_token.to_string(),
            line,
        })
}
