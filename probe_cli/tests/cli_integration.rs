use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn probe_fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../probes")
        .join(name)
}

fn write_config(dir: &tempfile::TempDir, toml: &str) -> PathBuf {
    let path = dir.path().join("probe.toml");
    fs::write(&path, toml).unwrap();
    path
}

#[rstest]
#[case("clean_probe.csv", 0, "probe: good, z = 0.05")]
#[case("noisy_probe.csv", 3, "probe: bad (feature-out-of-range)")]
fn analyse_reports_result_and_exit_code(
    #[case] trace: &str,
    #[case] exit_code: i32,
    #[case] needle: &str,
) {
    Command::cargo_bin("probe")
        .unwrap()
        .arg("analyse")
        .arg("--trace")
        .arg(probe_fixture(trace))
        .assert()
        .code(exit_code)
        .stdout(predicate::str::contains(needle));
}

#[rstest]
#[case(&["--help"], "Usage:")]
#[case(&["analyse", "--help"], "--trace")]
fn help_is_printed(#[case] args: &[&str], #[case] needle: &str) {
    Command::cargo_bin("probe")
        .unwrap()
        .args(args)
        .assert()
        .success()
        .stdout(predicate::str::contains(needle));
}

#[test]
fn analyse_requires_a_trace() {
    Command::cargo_bin("probe")
        .unwrap()
        .arg("analyse")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--trace"));
}

#[test]
fn rejected_probe_is_explained_on_stderr() {
    Command::cargo_bin("probe")
        .unwrap()
        .arg("analyse")
        .arg("--trace")
        .arg(probe_fixture("noisy_probe.csv"))
        .assert()
        .code(3)
        .stderr(predicate::str::contains("loadAngleCompressionStart"));
}

#[test]
fn missing_trace_file_is_an_error() {
    let dir = tempdir().unwrap();
    Command::cargo_bin("probe")
        .unwrap()
        .arg("analyse")
        .arg("--trace")
        .arg(dir.path().join("nope.csv"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("could not be opened"));
}

#[test]
fn bad_trace_header_is_reported() {
    let dir = tempdir().unwrap();
    let csv = dir.path().join("trace.csv");
    let mut f = fs::File::create(&csv).unwrap();
    writeln!(f, "pos,grams").unwrap();
    writeln!(f, "0.1,2.0").unwrap();

    Command::cargo_bin("probe")
        .unwrap()
        .arg("analyse")
        .arg("--trace")
        .arg(&csv)
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "Invalid headers in trace CSV. Expected 'z,load'.",
        ));
}

#[test]
fn malformed_trace_row_is_reported() {
    let dir = tempdir().unwrap();
    let csv = dir.path().join("trace.csv");
    fs::write(&csv, "z,load\n0.1,2.0\n0.1,heavy\n").unwrap();

    Command::cargo_bin("probe")
        .unwrap()
        .arg("analyse")
        .arg("--trace")
        .arg(&csv)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("row 3"));
}

#[test]
fn short_trace_is_not_ready() {
    let dir = tempdir().unwrap();
    let csv = dir.path().join("trace.csv");
    fs::write(&csv, "z,load\n0.5,0.0\n0.4,0.0\n").unwrap();

    Command::cargo_bin("probe")
        .unwrap()
        .arg("analyse")
        .arg("--trace")
        .arg(&csv)
        .assert()
        .code(3)
        .stdout(predicate::str::contains("probe: bad (not-ready)"));
}

#[rstest]
#[case("[window]\ncapacity = 2\n", "window.capacity must be >= 3")]
#[case("[analysis]\nsampling_interval_ms = 0.0\n", "sampling_interval_ms must be > 0")]
#[case("[analysis]\nskip_border_samples = 99\n", "skip_border_samples must be <= 32")]
#[case("[logging]\nrotation = \"weekly\"\n", "logging.rotation must be one of")]
fn invalid_config_is_rejected(#[case] toml: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, toml);

    Command::cargo_bin("probe")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("self-check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains(needle));
}

#[rstest]
#[case(&["self-check"])]
#[case(&["analyse", "--trace", "../probes/clean_probe.csv"])]
fn oversized_sampling_interval_is_an_error(#[case] args: &[&str]) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "[analysis]\nsampling_interval_ms = 1e30\n");

    Command::cargo_bin("probe")
        .unwrap()
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .arg("--config")
        .arg(&cfg)
        .args(args)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("fit a duration"));
}

#[test]
fn unparsable_config_is_an_error() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "[window\ncapacity = 10\n");

    Command::cargo_bin("probe")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("self-check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("parse config"));
}

#[test]
fn self_check_accepts_the_synthetic_probe() {
    Command::cargo_bin("probe")
        .unwrap()
        .arg("self-check")
        .assert()
        .success()
        .stdout(predicate::str::contains("self-check ok"));
}

#[test]
fn coreone_config_shifts_the_reported_z() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "[printer]\nmodel = \"coreone\"\n");

    Command::cargo_bin("probe")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("analyse")
        .arg("--trace")
        .arg(probe_fixture("clean_probe.csv"))
        .assert()
        .success()
        .stdout(predicate::str::contains("z = 0.07"));
}

#[test]
fn features_are_printed_on_request() {
    Command::cargo_bin("probe")
        .unwrap()
        .arg("analyse")
        .arg("--trace")
        .arg(probe_fixture("clean_probe.csv"))
        .arg("--features")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"loadAngleCompressionStart\""));
}

#[test]
fn log_file_receives_json_lines() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("probe.log");
    let toml = format!(
        "[logging]\nfile = {:?}\nlevel = \"info\"\n",
        log.display().to_string()
    );
    let cfg = write_config(&dir, &toml);

    Command::cargo_bin("probe")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("analyse")
        .arg("--trace")
        .arg(probe_fixture("clean_probe.csv"))
        .env_remove("RUST_LOG")
        .assert()
        .success();

    let text = fs::read_to_string(&log).unwrap();
    let first = text.lines().next().unwrap();
    let v: serde_json::Value = serde_json::from_str(first).unwrap();
    assert!(v.get("level").is_some());
}
