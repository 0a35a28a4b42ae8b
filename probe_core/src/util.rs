//! Time/sample-count helpers for probe_core.

/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: f32 = 1_000.0;

/// Convert a millisecond value to seconds.
#[inline]
pub fn ms_to_s(ms: f32) -> f32 {
    ms / MILLIS_PER_SEC
}

/// Number of whole samples spanning `seconds` at `interval_s`, rounded to nearest.
/// - Non-finite or negative ratios (zero/negative interval, NaN) map to 0.
#[inline]
pub fn samples_for(seconds: f32, interval_s: f32) -> usize {
    let n = (seconds / interval_s).round();
    if n.is_finite() && n > 0.0 {
        n as usize
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_nearest_sample() {
        assert_eq!(samples_for(0.020, 0.010), 2);
        assert_eq!(samples_for(0.020, 0.020), 1);
        // 20 ms at 320 Hz is 6.4 samples
        assert_eq!(samples_for(0.020, 1.0 / 320.0), 6);
        assert_eq!(samples_for(0.150, 1.0 / 320.0), 48);
        assert_eq!(samples_for(0.300, 1.0 / 320.0), 96);
    }

    #[test]
    fn degenerate_intervals_yield_zero() {
        assert_eq!(samples_for(0.020, 0.0), 0);
        assert_eq!(samples_for(0.020, -0.01), 0);
        assert_eq!(samples_for(f32::NAN, 0.01), 0);
        assert_eq!(samples_for(0.0, 0.01), 0);
    }

    #[test]
    fn ms_conversion() {
        assert!((ms_to_s(3.125) - 0.003125).abs() < 1e-9);
    }
}
