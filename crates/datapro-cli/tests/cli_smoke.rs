//! CLI binary smoke tests using assert_cmd.
//!
//! These tests run the compiled `datapro` binary against small labeling
//! matrices written to temporary directories.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn cmd() -> Command {
    Command::cargo_bin("datapro").unwrap()
}

fn write_votes(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("votes.tsv");
    std::fs::write(
        &path,
        "example_id\tsource\tvote\texternal_ref\n\
         1\tlf_causes\t1\tdoc1\n\
         1\tlf_induce\t1\tdoc1\n\
         2\tlf_negation\t-1\tdoc2\n\
         3\tlf_causes\t1\tdoc3\n\
         3\tlf_negation\t-1\tdoc3\n\
         4\tlf_induce\t1\tdoc4\n\
         5\tlf_causes\t0\tdoc5\n",
    )
    .unwrap();
    path
}

fn fit_demo(dir: &Path, votes: &Path) {
    cmd()
        .arg("fit")
        .arg(votes)
        .args(["--run-name", "demo", "-n", "200", "-l", "0.05"])
        .arg("--store")
        .arg(dir.join("models"))
        .assert()
        .success()
        .stderr(predicate::str::contains("Saved run 'demo'"));
}

// ---------------------------------------------------------------------------
// Top-level
// ---------------------------------------------------------------------------

#[test]
fn no_args_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn help_flag() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("fit"))
        .stdout(predicate::str::contains("infer"))
        .stdout(predicate::str::contains("summary"));
}

#[test]
fn version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("datapro"));
}

// ---------------------------------------------------------------------------
// fit
// ---------------------------------------------------------------------------

#[test]
fn fit_without_matrix_errors() {
    cmd().arg("fit").assert().failure();
}

#[test]
fn fit_nonexistent_matrix_errors() {
    cmd()
        .args(["fit", "/nonexistent/votes.tsv"])
        .assert()
        .failure();
}

#[test]
fn fit_without_config_prints_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let votes = write_votes(dir.path());
    cmd()
        .arg("fit")
        .arg(&votes)
        .arg("--store")
        .arg(dir.path().join("models"))
        .assert()
        .success()
        .stderr(predicate::str::contains("No config provided"))
        .stderr(predicate::str::contains("\"n_iterations\""));
    assert!(dir.path().join("models").join("default.json").exists());
}

#[test]
fn fit_rejects_invalid_prior() {
    let dir = tempfile::tempdir().unwrap();
    let votes = write_votes(dir.path());
    cmd()
        .arg("fit")
        .arg(&votes)
        .args(["--prior", "1.5"])
        .arg("--store")
        .arg(dir.path().join("models"))
        .assert()
        .failure();
    assert!(!dir.path().join("models").exists());
}

#[test]
fn fit_reads_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let votes = write_votes(dir.path());
    let config = dir.path().join("fit.json");
    let store = dir.path().join("from_config");
    std::fs::write(
        &config,
        format!(
            "{{\"run_name\": \"configured\", \"store_dir\": {:?}, \
             \"fit\": {{\"n_iterations\": 50, \"learning_rate\": 0.05}}}}",
            store.to_str().unwrap()
        ),
    )
    .unwrap();

    cmd()
        .arg("fit")
        .arg(&votes)
        .arg(&config)
        .assert()
        .success()
        .stderr(predicate::str::contains("Saved run 'configured'"));
    assert!(store.join("configured.json").exists());
}

// ---------------------------------------------------------------------------
// infer / summary / runs
// ---------------------------------------------------------------------------

#[test]
fn fit_then_infer_writes_marginals_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let votes = write_votes(dir.path());
    fit_demo(dir.path(), &votes);

    cmd()
        .arg("infer")
        .arg(&votes)
        .args(["-r", "demo"])
        .arg("--store")
        .arg(dir.path().join("models"))
        .assert()
        .success()
        .stdout(predicate::str::contains("example_id\tprobability\tn_votes"))
        .stdout(predicate::str::contains("5\t0.5\t0"));
}

#[test]
fn infer_writes_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let votes = write_votes(dir.path());
    fit_demo(dir.path(), &votes);
    let out = dir.path().join("marginals.csv");

    cmd()
        .arg("infer")
        .arg(&votes)
        .args(["-r", "demo"])
        .arg("--store")
        .arg(dir.path().join("models"))
        .arg("-o")
        .arg(&out)
        .assert()
        .success();

    let written = std::fs::read_to_string(&out).unwrap();
    assert!(written.starts_with("example_id,probability,n_votes"));
    assert_eq!(written.lines().count(), 6);
}

#[test]
fn infer_unknown_run_errors() {
    let dir = tempfile::tempdir().unwrap();
    let votes = write_votes(dir.path());
    cmd()
        .arg("infer")
        .arg(&votes)
        .args(["-r", "missing"])
        .arg("--store")
        .arg(dir.path().join("models"))
        .assert()
        .failure();
}

#[test]
fn infer_unknown_source_errors() {
    let dir = tempfile::tempdir().unwrap();
    let votes = write_votes(dir.path());
    fit_demo(dir.path(), &votes);
    let other = dir.path().join("other.csv");
    std::fs::write(&other, "example_id,source,vote\n1,lf_new,1\n").unwrap();

    cmd()
        .arg("infer")
        .arg(&other)
        .args(["-r", "demo"])
        .arg("--store")
        .arg(dir.path().join("models"))
        .assert()
        .failure();
}

#[test]
fn summary_reports_sources_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let votes = write_votes(dir.path());
    fit_demo(dir.path(), &votes);
    let gold = dir.path().join("gold.csv");
    std::fs::write(&gold, "example_id,label\n1,1\n2,-1\n3,1\n").unwrap();

    cmd()
        .arg("summary")
        .arg(&votes)
        .args(["-r", "demo"])
        .arg("--store")
        .arg(dir.path().join("models"))
        .arg("--gold")
        .arg(&gold)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"lf_negation\""))
        .stdout(predicate::str::contains("\"coverage\""))
        .stdout(predicate::str::contains("\"empirical_accuracy\""));
}

#[test]
fn runs_lists_saved_runs() {
    let dir = tempfile::tempdir().unwrap();
    let votes = write_votes(dir.path());
    fit_demo(dir.path(), &votes);

    cmd()
        .arg("runs")
        .arg("--store")
        .arg(dir.path().join("models"))
        .assert()
        .success()
        .stdout(predicate::str::contains("demo"));
}
