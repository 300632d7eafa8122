//! Integration tests for CLI config parsing and util helpers.

use std::path::PathBuf;

use datapro_cli::label::{load_fit_config, FitCommandConfig};
use datapro_cli::util::validate_tsv_or_csv_file;
use datapro_labelmodel::config::DivergencePolicy;

// ---------------------------------------------------------------------------
// validate_tsv_or_csv_file
// ---------------------------------------------------------------------------

#[test]
fn validate_tsv_file_exists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("votes.tsv");
    std::fs::File::create(&path).unwrap();
    assert!(validate_tsv_or_csv_file(&path).is_ok());
}

#[test]
fn validate_csv_file_exists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("votes.CSV");
    std::fs::File::create(&path).unwrap();
    assert!(validate_tsv_or_csv_file(&path).is_ok());
}

#[test]
fn validate_wrong_extension_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("votes.txt");
    std::fs::File::create(&path).unwrap();
    assert!(validate_tsv_or_csv_file(&path).is_err());
}

#[test]
fn validate_nonexistent_file_errors() {
    assert!(validate_tsv_or_csv_file("/nonexistent/path/votes.tsv").is_err());
}

// ---------------------------------------------------------------------------
// FitCommandConfig defaults & serialization
// ---------------------------------------------------------------------------

#[test]
fn fit_config_default_values() {
    let cfg = FitCommandConfig::default();
    assert_eq!(cfg.run_name, "default");
    assert_eq!(cfg.store_dir, PathBuf::from("datapro_models"));
    assert_eq!(cfg.fit.n_iterations, 3000);
    assert_eq!(cfg.fit.class_prior, 0.5);
    assert_eq!(cfg.fit.divergence_policy, DivergencePolicy::Clip);
    assert!(cfg.fit.validate().is_ok());
}

#[test]
fn fit_config_serializes_to_json() {
    let json = serde_json::to_string_pretty(&FitCommandConfig::default()).unwrap();
    assert!(json.contains("run_name"));
    assert!(json.contains("learning_rate"));
    assert!(json.contains("\"divergence_policy\": \"clip\""));
}

#[test]
fn partial_config_file_keeps_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fit.json");
    std::fs::write(
        &path,
        r#"{"run_name": "cdr", "fit": {"learning_rate": 0.01, "divergence_policy": "fail"}}"#,
    )
    .unwrap();

    let cfg = load_fit_config(&path).unwrap();
    assert_eq!(cfg.run_name, "cdr");
    assert_eq!(cfg.store_dir, PathBuf::from("datapro_models"));
    assert_eq!(cfg.fit.learning_rate, 0.01);
    assert_eq!(cfg.fit.n_iterations, 3000);
    assert_eq!(cfg.fit.divergence_policy, DivergencePolicy::Fail);
}

#[test]
fn malformed_config_file_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fit.json");
    std::fs::write(&path, "{ run_name: ").unwrap();
    let err = load_fit_config(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to parse config"));
}

#[test]
fn cli_overrides_apply_on_top_of_defaults() {
    let command = clap::Command::new("fit")
        .arg(clap::Arg::new("run_name").long("run-name"))
        .arg(
            clap::Arg::new("store")
                .long("store")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            clap::Arg::new("iterations")
                .long("iterations")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            clap::Arg::new("learning_rate")
                .long("learning-rate")
                .value_parser(clap::value_parser!(f64)),
        )
        .arg(
            clap::Arg::new("prior")
                .long("prior")
                .value_parser(clap::value_parser!(f64)),
        )
        .arg(
            clap::Arg::new("batch_size")
                .long("batch-size")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            clap::Arg::new("seed")
                .long("seed")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(clap::Arg::new("divergence_policy").long("divergence-policy"));
    let matches = command.get_matches_from([
        "fit",
        "--run-name",
        "override",
        "--iterations",
        "42",
        "--batch-size",
        "16",
        "--divergence-policy",
        "fail",
    ]);

    let cfg = FitCommandConfig::from_arguments(None, &matches).unwrap();
    assert_eq!(cfg.run_name, "override");
    assert_eq!(cfg.fit.n_iterations, 42);
    assert_eq!(cfg.fit.batch_size, Some(16));
    assert_eq!(cfg.fit.divergence_policy, DivergencePolicy::Fail);
    assert_eq!(cfg.fit.learning_rate, FitCommandConfig::default().fit.learning_rate);
}
