#![no_main]
use libfuzzer_sys::arbitrary::{self, Arbitrary};
use libfuzzer_sys::fuzz_target;
use probe_core::ProbeAnalysis;

#[derive(Debug, Arbitrary)]
struct Input {
    capacity: u16,
    skip_border_samples: u8,
    interval_ms: f32,
    samples: Vec<(f32, f32)>,
}

fuzz_target!(|input: Input| {
    let Ok(mut engine) = ProbeAnalysis::builder()
        .window_capacity(usize::from(input.capacity).max(3))
        .skip_border_samples(usize::from(input.skip_border_samples % 33))
        .try_build()
    else {
        return;
    };
    // Deliberately unvalidated: garbage intervals must not panic either.
    engine.set_sampling_interval_ms(input.interval_ms);
    for (z, load) in input.samples {
        engine.store_sample(z, load);
    }
    let result = engine.analyse();
    assert!(result.is_good() || result.description().is_some());
    assert!(!engine.is_analysis_in_progress());
});
