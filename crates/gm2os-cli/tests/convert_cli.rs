use gm2os_core::physics::{
    DrbarParameters, ElectroweakinoParameters, MssmNoFvModel, PhysicalSpectrum, SfermionParameters,
    SfermionSector, a0_mass, diagonal3, electromagnetic_coupling, w_mass, z_mass,
};
use gm2os_core::slha::SlhaDocument;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const SQRT2: f64 = std::f64::consts::SQRT_2;

fn drbar_parameters() -> DrbarParameters {
    let tan_beta: f64 = 20.0;
    let vd = 246.0 / (1.0 + tan_beta * tan_beta).sqrt();
    DrbarParameters {
        scale: 1000.0,
        g1: 0.46,
        g2: 0.65,
        g3: 1.05,
        ye: diagonal3([2.9e-5, 6.0e-3, 0.1]),
        yu: diagonal3([1.3e-5, 7.0e-3, 0.98]),
        yd: diagonal3([2.7e-4, 5.4e-3, 0.3]),
        ae: diagonal3([0.0, 250.0, 0.0]),
        au: diagonal3([0.0, 0.0, -1000.0]),
        ad: diagonal3([0.0, 0.0, 0.0]),
        ml2: diagonal3([4.0e5, 4.0e5, 4.0e5]),
        me2: diagonal3([9.0e4, 9.0e4, 9.0e4]),
        mq2: diagonal3([2.25e6, 2.25e6, 2.25e6]),
        mu2: diagonal3([2.25e6, 2.25e6, 2.25e6]),
        md2: diagonal3([2.25e6, 2.25e6, 2.25e6]),
        mu: 400.0,
        bmu: 3.0e4,
        m1: 200.0,
        m2: 350.0,
        m3: 1800.0,
        vu: vd * tan_beta,
        vd,
    }
}

fn write_model(path: &Path) -> DrbarParameters {
    let drbar = drbar_parameters();
    let mut sfermions = BTreeMap::new();
    for sector in [SfermionSector::Smuon, SfermionSector::Stau] {
        let (left, right) = drbar.soft_masses(sector);
        let pole = SfermionParameters::from_drbar(&drbar, sector).spectrum(left, right);
        sfermions.insert(sector, pole);
    }
    let electroweakinos = ElectroweakinoParameters::from_drbar(&drbar);
    let neutralinos = electroweakinos
        .neutralino_spectrum()
        .expect("neutralino spectrum");
    let charginos = electroweakinos.chargino_spectrum();
    let down = |yukawa: f64| yukawa * drbar.vd / SQRT2;
    let up = |yukawa: f64| yukawa * drbar.vu / SQRT2;

    let physical = PhysicalSpectrum {
        mw: w_mass(&drbar),
        mz: z_mass(&drbar),
        me: down(drbar.ye[0][0]),
        mm: down(drbar.ye[1][1]),
        ml: down(drbar.ye[2][2]),
        mu: up(drbar.yu[0][0]),
        mc: up(drbar.yu[1][1]),
        mt: up(drbar.yu[2][2]),
        md: down(drbar.yd[0][0]),
        ms: down(drbar.yd[1][1]),
        mb: down(drbar.yd[2][2]),
        ma0: a0_mass(&drbar),
        sfermions,
        neutralino_masses: neutralinos.masses,
        zn: neutralinos.zn,
        chargino_masses: electroweakinos.chargino_masses(),
        um: charginos.um,
        up: charginos.up,
    };
    let model = MssmNoFvModel {
        drbar: DrbarParameters {
            m1: drbar.m1 * 1.1,
            m2: drbar.m2 * 0.9,
            ..drbar.clone()
        },
        physical,
    };
    write_file(path, &model.to_json_string().expect("model serializes"));
    drbar
}

fn alpha_mz(drbar: &DrbarParameters) -> f64 {
    let el = electromagnetic_coupling(drbar);
    el * el / (4.0 * std::f64::consts::PI)
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("parent dir should be created");
    }
    fs::write(path, content).expect("file should be written");
}

fn run_convert(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_gm2os"))
        .arg("convert")
        .args(args)
        .output()
        .expect("binary should run")
}

fn scalar_block(document: &SlhaDocument, name: &str) -> f64 {
    let mut value = None;
    document
        .read_block(name, |key, entry| {
            if key == 1 {
                value = Some(entry);
            }
        })
        .expect("numeric block");
    value.unwrap_or_else(|| panic!("block {name} should hold a value"))
}

#[test]
fn convert_writes_onshell_blocks_and_report() {
    let temp = TempDir::new().expect("tempdir should be created");
    let model_path = temp.path().join("model.json");
    let output_path = temp.path().join("out/onshell.slha");
    let report_path = temp.path().join("out/report.json");
    let drbar = write_model(&model_path);
    let alpha = alpha_mz(&drbar).to_string();

    let output = run_convert(&[
        "--model",
        model_path.to_str().expect("utf-8 path"),
        "--output",
        output_path.to_str().expect("utf-8 path"),
        "--report",
        report_path.to_str().expect("utf-8 path"),
        "--alpha-mz",
        &alpha,
        "--precision",
        "1e-10",
    ]);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(0), "stderr: {stderr}");
    assert!(stderr.contains("convert_Mu_M1_M2"));

    let document = SlhaDocument::read_from_file(&output_path).expect("output is valid SLHA");
    let m1 = scalar_block(&document, "M1");
    let m2 = scalar_block(&document, "M2");
    assert!((m1 - drbar.m1).abs() < 1.0e-5 * drbar.m1, "M1={m1}");
    assert!((m2 - drbar.m2).abs() < 1.0e-5 * drbar.m2, "M2={m2}");
    assert_eq!(
        document.block("MSL2").and_then(|block| block.scale),
        Some(drbar.scale)
    );
    assert_eq!(document.block("YE").map(|block| block.lines.len()), Some(9));

    let report: Value =
        serde_json::from_str(&fs::read_to_string(&report_path).expect("report should exist"))
            .expect("report is JSON");
    assert_eq!(report["converged"], true);
    let rho_hat = report["rhoHat"].as_f64().expect("rho_hat is reported");
    assert!((rho_hat - 1.0).abs() < 1.0e-12);
    assert_eq!(report["weinbergSaturated"], false);
}

#[test]
fn slha_inputs_override_couplings_and_are_kept_in_output() {
    let temp = TempDir::new().expect("tempdir should be created");
    let model_path = temp.path().join("model.json");
    let slha_path = temp.path().join("input.slha");
    write_model(&model_path);
    write_file(
        &slha_path,
        "Block SPINFO\n 1 spectrum generator   # name\n\
         Block SMINPUTS\n 1 1.28000000E+02   # alpha_em^(-1)(MZ)\n 99 1.0   # unknown\n",
    );

    let output = run_convert(&[
        "--model",
        model_path.to_str().expect("utf-8 path"),
        "--slha",
        slha_path.to_str().expect("utf-8 path"),
        "--log-level",
        "warning",
    ]);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(0), "stderr: {stderr}");
    assert!(stderr.contains("unrecognized key in SMINPUTS"));

    let document = SlhaDocument::parse(&String::from_utf8_lossy(&output.stdout))
        .expect("stdout is valid SLHA");
    assert!(document.block("SPINFO").is_some());
    let el = scalar_block(&document, "EL");
    let expected = (4.0 * std::f64::consts::PI / 128.0).sqrt();
    assert!((el - expected).abs() < 1.0e-8, "EL={el}");
}

#[test]
fn unconverged_conversion_exits_with_one_and_keeps_parameters() {
    let temp = TempDir::new().expect("tempdir should be created");
    let model_path = temp.path().join("model.json");
    let converted_path = temp.path().join("converted.json");
    let drbar = write_model(&model_path);

    let output = run_convert(&[
        "--model",
        model_path.to_str().expect("utf-8 path"),
        "--max-iterations",
        "0",
        "--precision",
        "1e-12",
        "--model-output",
        converted_path.to_str().expect("utf-8 path"),
    ]);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(1), "stderr: {stderr}");
    assert!(stderr.contains("NOT CONVERGED"));

    let converted = MssmNoFvModel::from_json_file(&converted_path).expect("converted model");
    assert_eq!(converted.drbar.m1, drbar.m1 * 1.1);
}

#[test]
fn missing_model_reports_io_error() {
    let temp = TempDir::new().expect("tempdir should be created");
    let missing = temp.path().join("missing.json");

    let output = run_convert(&["--model", missing.to_str().expect("utf-8 path")]);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr.contains("ERROR: [IO.MODEL]"), "stderr: {stderr}");
    assert!(stderr.contains("FATAL EXIT CODE: 3"));
}

#[test]
fn invalid_input_reports_validation_error() {
    let temp = TempDir::new().expect("tempdir should be created");
    let model_path = temp.path().join("model.json");
    write_model(&model_path);
    let mut model = MssmNoFvModel::from_json_file(&model_path).expect("model parses");
    model.physical.sfermions.remove(&SfermionSector::Smuon);
    write_file(&model_path, &model.to_json_string().expect("model serializes"));

    let output = run_convert(&["--model", model_path.to_str().expect("utf-8 path")]);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr.contains("[INPUT.SFERMION]"), "stderr: {stderr}");
}

#[test]
fn unknown_flag_is_a_usage_error() {
    let output = run_convert(&["--model", "model.json", "--frobnicate"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr.contains("[INPUT.CLI_USAGE]"), "stderr: {stderr}");
}
