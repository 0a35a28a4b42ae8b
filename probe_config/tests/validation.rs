use probe_config::{PrinterModel, load_toml};
use rstest::rstest;

const FULL: &str = r#"
[window]
capacity = 600

[analysis]
sampling_interval_ms = 2.5
load_delay_ms = 12.5
skip_border_samples = 2

[printer]
model = "xl"

[logging]
level = "debug"
rotation = "daily"
"#;

#[test]
fn accepts_full_config() {
    let cfg = load_toml(FULL).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.window.capacity, 600);
    assert_eq!(cfg.analysis.skip_border_samples, 2);
    assert_eq!(cfg.printer.model, PrinterModel::Xl);
    assert_eq!(cfg.logging.rotation.as_deref(), Some("daily"));
}

#[rstest]
#[case("[window]\ncapacity = 2\n", "window.capacity must be >= 3")]
#[case("[analysis]\nsampling_interval_ms = 0.0\n", "sampling_interval_ms must be > 0")]
#[case("[analysis]\nsampling_interval_ms = -3.0\n", "sampling_interval_ms must be > 0")]
#[case("[analysis]\nsampling_interval_ms = nan\n", "sampling_interval_ms must be > 0")]
#[case("[analysis]\nload_delay_ms = -1.0\n", "load_delay_ms must be >= 0")]
#[case("[analysis]\nload_delay_ms = inf\n", "load_delay_ms must be >= 0")]
#[case("[analysis]\nskip_border_samples = 33\n", "skip_border_samples must be <= 32")]
#[case("[logging]\nrotation = \"weekly\"\n", "logging.rotation must be one of")]
fn rejects_invalid_values(#[case] toml: &str, #[case] expected: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(
        format!("{err}").contains(expected),
        "error {err} does not mention {expected}"
    );
}

#[test]
fn unknown_printer_model_is_a_parse_error() {
    assert!(load_toml("[printer]\nmodel = \"mini\"\n").is_err());
}
