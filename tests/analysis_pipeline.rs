// tests/analysis_pipeline.rs

use std::f64::consts::PI;
use std::fs;
use std::path::Path;

use antenna_rf::antenna::{rx_gain_from_s21, to_db};
use antenna_rf::{Analysis, AnalysisConfig, AnalysisError, ImageFormat};
use tempfile::TempDir;

const FREQS_GHZ: [f64; 3] = [2.0, 2.4, 2.8];

/// Writes a synthetic MA-format S2P file whose S21 magnitude scales with `s21`.
fn write_measurement(dir: &Path, name: &str, freqs: &[f64], s21: f64) {
    let mut text = String::from("! synthetic measurement\n# GHz S MA R 50\n");
    for (k, f) in freqs.iter().enumerate() {
        let s21_k = s21 * (1. + k as f64 * 0.1);
        text.push_str(&format!("{} 0.3 -45 {} 90 {} 90 0.2 0\n", f, s21_k, s21_k));
    }
    fs::write(dir.join(name), text).unwrap();
}

fn lab_folder(angles: &[(&str, f64)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (label, s21) in angles {
        write_measurement(dir.path(), &format!("{}.S2P", label), &FREQS_GHZ, *s21);
    }
    dir
}

fn config_for(dir: &TempDir) -> AnalysisConfig {
    AnalysisConfig {
        data_folder: dir.path().to_path_buf(),
        output_dir: dir.path().join("plots"),
        ..Default::default()
    }
}

#[test]
fn three_angles_end_to_end() {
    let dir = lab_folder(&[("30", 0.002), ("-30", 0.001), ("0", 0.004)]);
    fs::write(dir.path().join("notes.txt"), "not a measurement").unwrap();
    // Lower-case extensions are not picked up
    write_measurement(dir.path(), "60.s2p", &FREQS_GHZ, 0.5);

    let config = config_for(&dir);
    let analysis = Analysis::run(&config).unwrap();
    assert_eq!(analysis.results().len(), 3);

    let table = analysis.table();
    let names = table.column_names();
    assert_eq!(names.len(), 1 + 3 * 5);
    assert_eq!(names[0], "Frequency");
    assert_eq!(names[1], "-30_s11");
    assert_eq!(names[names.len() - 1], "30_gain");
    for label in ["-30", "0", "30"] {
        for suffix in ["s11", "s12", "s21", "s22", "gain"] {
            let column = table.column(&format!("{}_{}", label, suffix)).unwrap();
            assert_eq!(column.len(), FREQS_GHZ.len());
        }
    }
    assert_eq!(table.nrows(), 3);
    let freqs = table.column("Frequency").unwrap();
    for (f, ghz) in freqs.iter().zip(FREQS_GHZ.iter()) {
        assert!((f - ghz * 1e9).abs() < 1e-3);
    }
    assert!((table.column("0_s11").unwrap()[0] - 0.3).abs() < 1e-12);

    let pattern = analysis.emission_pattern();
    assert_eq!(pattern.len(), 4);
    assert!(pattern.windows(2).take(2).all(|w| w[0].0 < w[1].0));
    assert_eq!(pattern[0].0, (-30f64).to_radians());
    assert_eq!(pattern[3], pattern[0]);

    let broadside = analysis.broadside().unwrap();
    assert_eq!(broadside.label, "0");
    assert_eq!(broadside.max_index, 2);
    let f = FREQS_GHZ[2] * 1e9;
    let expected = to_db(rx_gain_from_s21(0.004 * 1.2, f / (2. * PI), 4.25, 1.4, 3e8, false));
    assert!((broadside.max_gain - expected).abs() < 1e-9);
    // |S22| = 0.2 at zero phase
    assert!((broadside.impedance.re - 75.).abs() < 1e-9);
    assert!(broadside.impedance.im.abs() < 1e-9);
}

#[test]
fn pattern_order_ignores_file_order() {
    let dir = lab_folder(&[("90", 0.001), ("-90", 0.001), ("0", 0.001), ("180", 0.001), ("45", 0.001)]);
    let analysis = Analysis::run(&config_for(&dir)).unwrap();
    let angles: Vec<f64> = analysis.emission_pattern().iter().map(|p| p.0.to_degrees()).collect();
    let expected = [-90., 0., 45., 90., 180., -90.];
    assert_eq!(angles.len(), expected.len());
    for (a, e) in angles.iter().zip(expected.iter()) {
        assert!((a - e).abs() < 1e-9, "{} != {}", a, e);
    }
}

#[test]
fn missing_broadside_raises() {
    let dir = lab_folder(&[("-30", 0.001), ("30", 0.002)]);
    let config = config_for(&dir);
    let analysis = Analysis::run(&config).unwrap();
    assert_eq!(analysis.emission_pattern().len(), 3);
    match analysis.report() {
        Err(AnalysisError::MissingBroadside(label)) => assert_eq!(label, "0"),
        other => panic!("expected missing broadside error, got {:?}", other),
    }
    assert!(!config.broadside_path().exists());
    assert!(!config.emissions_path().exists());
}

#[test]
fn report_writes_both_plots() {
    let dir = lab_folder(&[("0", 0.004), ("30", 0.002)]);
    let config = config_for(&dir);
    let analysis = Analysis::run(&config).unwrap();
    let (broadside, emissions) = analysis.report().unwrap();
    assert_eq!(broadside, config.broadside_path());
    assert_eq!(emissions, config.emissions_path());
    let folder = config.folder_label();
    assert_eq!(
        broadside.file_name().unwrap().to_string_lossy(),
        format!("{}_broadside_sparams.png", folder)
    );
    assert_eq!(
        emissions.file_name().unwrap().to_string_lossy(),
        format!("{}_emissions.png", folder)
    );
    assert!(fs::metadata(&broadside).unwrap().len() > 0);
    assert!(fs::metadata(&emissions).unwrap().len() > 0);
}

#[test]
fn report_writes_svg_plots() {
    let dir = lab_folder(&[("-30", 0.001), ("0", 0.004), ("30", 0.002)]);
    let config = AnalysisConfig {
        image_format: ImageFormat::Svg,
        ..config_for(&dir)
    };
    let analysis = Analysis::run(&config).unwrap();
    let (broadside, emissions) = analysis.report().unwrap();
    assert_eq!(broadside.extension().unwrap(), "svg");
    assert_eq!(emissions.extension().unwrap(), "svg");
    assert!(broadside.ends_with(format!("{}_broadside_sparams.svg", config.folder_label())));
    assert!(emissions.ends_with(format!("{}_emissions.svg", config.folder_label())));
    let svg = fs::read_to_string(&emissions).unwrap();
    assert!(svg.contains("<svg"));
    assert!(fs::read_to_string(&broadside).unwrap().contains("<svg"));
}

#[test]
fn non_numeric_label_aborts() {
    let dir = lab_folder(&[("0", 0.001), ("boresight", 0.001)]);
    match Analysis::run(&config_for(&dir)) {
        Err(AnalysisError::InvalidAngle(label)) => assert_eq!(label, "boresight"),
        other => panic!("expected invalid angle, got {:?}", other),
    }
}

#[test]
fn mismatched_sweeps_abort() {
    let dir = lab_folder(&[("0", 0.001)]);
    write_measurement(dir.path(), "30.S2P", &[2.0, 2.5, 2.8], 0.001);
    assert!(matches!(
        Analysis::run(&config_for(&dir)),
        Err(AnalysisError::SweepMismatch { .. })
    ));
}

#[test]
fn malformed_file_reports_path() {
    let dir = lab_folder(&[("0", 0.001)]);
    fs::write(dir.path().join("30.S2P"), "# GHz S MA R 50\n2.0 0.3 -45 oops 90 0.1 90 0.2 0\n").unwrap();
    match Analysis::run(&config_for(&dir)) {
        Err(AnalysisError::Parse { path, .. }) => assert!(path.ends_with("30.S2P")),
        other => panic!("expected parse error, got {:?}", other),
    }
}

#[test]
fn empty_and_missing_folders() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        Analysis::run(&config_for(&dir)),
        Err(AnalysisError::NoMeasurements(_))
    ));
    let config = AnalysisConfig {
        data_folder: dir.path().join("does-not-exist"),
        ..Default::default()
    };
    assert!(matches!(Analysis::run(&config), Err(AnalysisError::Io(_))));
}

#[test]
fn linear_mode_reports_linear_gain() {
    let dir = lab_folder(&[("0", 0.004)]);
    let config = AnalysisConfig {
        linear_gain: true,
        tx_gain_db: 2.,
        ..config_for(&dir)
    };
    let analysis = Analysis::run(&config).unwrap();
    let result = analysis.broadside().unwrap();
    let f = FREQS_GHZ[2] * 1e9;
    let expected = rx_gain_from_s21(0.004 * 1.2, f / (2. * PI), 2., 1.4, 3e8, true);
    assert!((result.max_gain - expected).abs() <= 1e-9 * expected);
    assert!((10f64.powf(to_db(result.max_gain) / 10.) - result.max_gain).abs() <= 1e-9 * expected);
}
