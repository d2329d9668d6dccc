use super::CliError;
use anyhow::Context;
use gm2os_core::domain::{ConversionReport, Gm2Error};
use gm2os_core::numerics::is_close;
use gm2os_core::physics::{ConversionConfig, MssmNoFvModel, MssmNoFvOnshell, SpectrumState};
use gm2os_core::slha::{SlhaDocument, set_onshell_blocks};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(clap::Args)]
pub(super) struct ConvertArgs {
    /// JSON description of the running parameters and pole spectrum
    #[arg(long)]
    model: PathBuf,

    /// SLHA file whose SMINPUTS override the model; its blocks are kept in the output
    #[arg(long)]
    slha: Option<PathBuf>,

    /// JSON conversion config
    #[arg(long)]
    config: Option<PathBuf>,

    /// SLHA output path (stdout when omitted)
    #[arg(long)]
    output: Option<PathBuf>,

    /// JSON summary of the conversion outcome
    #[arg(long)]
    report: Option<PathBuf>,

    /// Write the converted model as JSON
    #[arg(long)]
    model_output: Option<PathBuf>,

    /// Log verbosity; RUST_LOG is used when omitted
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,

    #[command(flatten)]
    overrides: ConfigOverrides,
}

#[derive(clap::Args)]
struct ConfigOverrides {
    /// Electromagnetic coupling alpha(MZ)
    #[arg(long)]
    alpha_mz: Option<f64>,

    /// Electromagnetic coupling in the Thomson limit
    #[arg(long)]
    alpha_thomson: Option<f64>,

    /// Precision goal of the sfermion and electroweakino solves
    #[arg(long)]
    precision: Option<f64>,

    /// Iteration cap of the sfermion and electroweakino solves
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Commit the best iterate of solves that did not converge
    #[arg(long)]
    accept_unconverged: bool,
}

impl ConfigOverrides {
    fn apply(&self, config: &mut ConversionConfig) {
        if let Some(alpha) = self.alpha_mz {
            config.alpha_mz = Some(alpha);
        }
        if let Some(alpha) = self.alpha_thomson {
            config.alpha_thomson = alpha;
        }
        for criteria in [
            &mut config.sfermion_criteria,
            &mut config.electroweakino_criteria,
        ] {
            if let Some(precision) = self.precision {
                criteria.precision_goal = precision;
            }
            if let Some(max_iterations) = self.max_iterations {
                criteria.max_iterations = max_iterations;
            }
        }
        if self.accept_unconverged {
            config.accept_unconverged = true;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(super) enum LogLevel {
    Verbose,
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            Self::Verbose => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error | Self::Fatal => "error",
        }
    }
}

fn init_logging(level: Option<LogLevel>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level.directive()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    // a second initialization within one process keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConversionSummary {
    converged: bool,
    sin_theta_w: Option<f64>,
    rho_hat: Option<f64>,
    weinberg_saturated: bool,
    solves: Vec<SolveSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SolveSummary {
    stage: &'static str,
    label: String,
    converged: bool,
    committed: bool,
    iterations: usize,
    residual_norm: f64,
}

impl From<&ConversionReport> for ConversionSummary {
    fn from(report: &ConversionReport) -> Self {
        let solves = report
            .stages
            .iter()
            .flat_map(|stage| {
                stage.solves.iter().map(|solve| SolveSummary {
                    stage: stage.stage.as_str(),
                    label: solve.label.clone(),
                    converged: solve.converged,
                    committed: solve.committed,
                    iterations: solve.iterations,
                    residual_norm: solve.residual_norm,
                })
            })
            .collect();
        Self {
            converged: report.converged(),
            sin_theta_w: report.weinberg.map(|weinberg| weinberg.sin_theta_w),
            rho_hat: report.weinberg.map(|weinberg| weinberg.rho_hat),
            weinberg_saturated: report
                .weinberg
                .is_some_and(|weinberg| weinberg.saturated),
            solves,
        }
    }
}

/// Returns 1 when a solve did not converge; outputs are written either way.
pub(super) fn run_convert_command(args: ConvertArgs) -> Result<i32, CliError> {
    init_logging(args.log_level);

    let mut model = MssmNoFvModel::from_json_file(&args.model)?;
    let mut config = match &args.config {
        Some(path) => ConversionConfig::from_json_file(path)?,
        None => ConversionConfig::default(),
    };

    let mut document = match &args.slha {
        Some(path) => SlhaDocument::read_from_file(path).map_err(Gm2Error::from)?,
        None => SlhaDocument::new(),
    };
    if args.slha.is_some() {
        let inputs = document.fill_sminputs().map_err(Gm2Error::from)?;
        inputs.apply(&mut model.physical, &mut config);

        let modsel = document.read_modsel().map_err(Gm2Error::from)?;
        if let Some(scale) = modsel.parameter_output_scale
            && !is_close(scale, model.drbar.scale, 1.0e-12)
        {
            tracing::warn!(
                requested = scale,
                scale = model.drbar.scale,
                "parameters are written at the renormalization scale"
            );
        }
    }
    args.overrides.apply(&mut config);

    let mut onshell = MssmNoFvOnshell::with_config(model, config);
    let report = onshell.convert_to_onshell()?;
    eprint!("{report}");
    eprint!("{onshell}");

    set_onshell_blocks(&mut document, &onshell);
    match &args.output {
        Some(path) => write_text(path, &document.to_string())?,
        None => print!("{document}"),
    }

    if let Some(path) = &args.report {
        let summary = ConversionSummary::from(&report);
        let json = serde_json::to_string_pretty(&summary)
            .context("failed to serialize conversion summary")?;
        write_text(path, &json)?;
    }
    if let Some(path) = &args.model_output {
        let json = onshell.spectrum().to_json_string()?;
        write_text(path, &json)?;
    }

    tracing::info!(
        converged = report.converged(),
        scale = onshell.spectrum().scale(),
        "conversion finished"
    );
    if report.converged() { Ok(0) } else { Ok(1) }
}

fn write_text(path: &Path, content: &str) -> Result<(), CliError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory '{}'", parent.display()))?;
    }
    fs::write(path, content)
        .with_context(|| format!("failed to write '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ConfigOverrides, ConversionSummary, LogLevel};
    use gm2os_core::domain::{
        ConversionReport, ConversionStage, SolveOutcome, StageOutcome, WeinbergOutcome,
    };
    use gm2os_core::physics::ConversionConfig;

    #[test]
    fn overrides_touch_only_given_values() {
        let mut config = ConversionConfig::default();
        let overrides = ConfigOverrides {
            alpha_mz: Some(1.0 / 128.0),
            alpha_thomson: None,
            precision: None,
            max_iterations: Some(7),
            accept_unconverged: false,
        };

        overrides.apply(&mut config);

        assert_eq!(config.alpha_mz, Some(1.0 / 128.0));
        assert_eq!(config.alpha_thomson, ConversionConfig::default().alpha_thomson);
        assert_eq!(config.sfermion_criteria.max_iterations, 7);
        assert_eq!(config.electroweakino_criteria.max_iterations, 7);
        assert_eq!(
            config.weinberg_criteria,
            ConversionConfig::default().weinberg_criteria
        );
        assert!(!config.accept_unconverged);
    }

    #[test]
    fn log_levels_map_to_tracing_directives() {
        assert_eq!(LogLevel::Verbose.directive(), "trace");
        assert_eq!(LogLevel::Warning.directive(), "warn");
        assert_eq!(LogLevel::Fatal.directive(), "error");
    }

    #[test]
    fn summary_flattens_solves_with_their_stage() {
        let mut stage = StageOutcome::algebraic(ConversionStage::MuM1M2);
        stage.solves.push(SolveOutcome {
            label: "Mu/M1/M2".to_string(),
            converged: false,
            committed: false,
            iterations: 100,
            residual_norm: 1.0e-3,
        });
        let report = ConversionReport {
            stages: vec![StageOutcome::algebraic(ConversionStage::BMu), stage],
            weinberg: Some(WeinbergOutcome {
                sin_theta_w: 0.48,
                rho_hat: 1.0,
                iterations: 1,
                converged: true,
                saturated: false,
            }),
        };

        let summary = ConversionSummary::from(&report);
        let json = serde_json::to_value(&summary).expect("summary serializes");

        assert_eq!(json["converged"], false);
        assert_eq!(json["solves"][0]["stage"], "convert_Mu_M1_M2");
        assert_eq!(json["solves"][0]["residualNorm"], 1.0e-3);
        assert_eq!(json["sinThetaW"], 0.48);
        assert_eq!(json["weinbergSaturated"], false);
        assert_eq!(json["solves"].as_array().map(Vec::len), Some(1));
    }
}
