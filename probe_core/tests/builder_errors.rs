use probe_core::error::BuildError;
use probe_core::{AnalysisCfg, PrinterModel, ProbeAnalysis};
use rstest::rstest;

fn invalid_config_message(err: &eyre::Report) -> &'static str {
    match err.downcast_ref::<BuildError>() {
        Some(BuildError::InvalidConfig(msg)) => *msg,
        other => panic!("expected InvalidConfig, got: {other:?}"),
    }
}

#[rstest]
fn defaults_build() {
    let e = ProbeAnalysis::builder().try_build().expect("defaults are valid");
    assert_eq!(e.cfg().window_capacity, 1000);
    assert!((e.cfg().sampling_interval_ms() - 3.125).abs() < 1e-6);
    assert!((e.sampling_interval_s() - 1.0 / 320.0).abs() < 1e-9);
}

#[rstest]
#[case::tiny_window(ProbeAnalysis::builder().window_capacity(2), "window_capacity must be >= 3")]
#[case::zero_interval(ProbeAnalysis::builder().sampling_interval_ms(0.0), "sampling interval must be > 0")]
#[case::negative_interval(ProbeAnalysis::builder().sampling_interval_ms(-1.0), "sampling interval must be > 0")]
#[case::nan_interval(ProbeAnalysis::builder().sampling_interval_ms(f32::NAN), "sampling interval must be > 0")]
#[case::negative_delay(ProbeAnalysis::builder().load_delay_ms(-5.0), "load delay must be >= 0")]
#[case::infinite_delay(ProbeAnalysis::builder().load_delay_ms(f32::INFINITY), "load delay must be >= 0")]
#[case::huge_skip(ProbeAnalysis::builder().skip_border_samples(33), "skip_border_samples must be <= 32")]
fn invalid_parameters_are_rejected(
    #[case] builder: probe_core::ProbeAnalysisBuilder,
    #[case] expected: &str,
) {
    let err = builder.try_build().expect_err("should be rejected");
    assert_eq!(invalid_config_message(&err), expected);
}

#[rstest]
fn builder_settings_reach_the_engine() {
    let e = ProbeAnalysis::builder()
        .window_capacity(500)
        .sampling_interval_ms(2.5)
        .load_delay_ms(10.0)
        .skip_border_samples(2)
        .printer(PrinterModel::Xl)
        .try_build()
        .expect("valid");
    let cfg = e.cfg();
    assert_eq!(cfg.window_capacity, 500);
    assert!((cfg.sampling_interval_s - 0.0025).abs() < 1e-9);
    assert!((cfg.load_delay_s - 0.010).abs() < 1e-9);
    assert_eq!(cfg.skip_border_samples, 2);
    assert_eq!(cfg.printer, PrinterModel::Xl);
    assert_eq!(e.window().capacity(), 500);
}

#[rstest]
fn config_file_values_are_validated_too() {
    let cfg = probe_config::load_toml("[window]\ncapacity = 1\n").expect("parse");
    let err = ProbeAnalysis::builder()
        .with_config(AnalysisCfg::from(&cfg))
        .try_build()
        .expect_err("capacity 1 is too small");
    assert_eq!(invalid_config_message(&err), "window_capacity must be >= 3");
}

#[rstest]
fn sampling_interval_setter_is_not_validated() {
    let mut e = ProbeAnalysis::builder().try_build().expect("valid");
    e.set_sampling_interval_ms(0.0);
    assert_eq!(e.sampling_interval_s(), 0.0);
}
