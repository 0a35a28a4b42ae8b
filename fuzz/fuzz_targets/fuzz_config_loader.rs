#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse errors and validation errors are fine; panics are not.
    if let Ok(cfg) = probe_config::load_toml(data) {
        let _ = cfg.validate();
        let _ = probe_core::AnalysisCfg::from(&cfg);
    }
    let _ = probe_config::read_trace_csv(data.as_bytes());
});
