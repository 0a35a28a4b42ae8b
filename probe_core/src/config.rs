//! Configuration types for the analysis engine.
//!
//! These are the runtime configuration structs used by `ProbeAnalysis`.
//! They are separate from the TOML-deserialized config in `probe_config`.

use crate::util::{MILLIS_PER_SEC, ms_to_s};

/// Default sampling rate of the load cell (Hz).
pub const DEFAULT_SAMPLE_RATE_HZ: f32 = 320.0;

/// Samples before `fall_end` that must exist in the window (s).
pub const ANALYSIS_LOOKBACK_S: f32 = 0.15;
/// Samples after `rise_start` that must exist in the window (s).
pub const ANALYSIS_LOOKAHEAD_S: f32 = 0.30;

/// Printer variant; selects the final Z correction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PrinterModel {
    #[default]
    Mk4,
    Xl,
    CoreOne,
}

impl PrinterModel {
    /// Fixed offset added to the interpolated Z (mm).
    pub fn z_correction_mm(self) -> f32 {
        match self {
            PrinterModel::CoreOne => 0.02,
            PrinterModel::Mk4 | PrinterModel::Xl => 0.0,
        }
    }
}

/// Engine parameters fixed at construction.
#[derive(Debug, Clone)]
pub struct AnalysisCfg {
    /// Samples kept in the window.
    pub window_capacity: usize,
    /// Time between consecutive samples (s).
    pub sampling_interval_s: f32,
    /// Load-cell lag behind the Z position (s).
    pub load_delay_s: f32,
    /// Samples next to each phase boundary left out of line fits.
    pub skip_border_samples: usize,
    pub printer: PrinterModel,
}

impl Default for AnalysisCfg {
    fn default() -> Self {
        Self {
            window_capacity: 1000,
            sampling_interval_s: 1.0 / DEFAULT_SAMPLE_RATE_HZ,
            load_delay_s: ms_to_s(20.0),
            skip_border_samples: 3,
            printer: PrinterModel::Mk4,
        }
    }
}

impl AnalysisCfg {
    pub fn sampling_interval_ms(&self) -> f32 {
        self.sampling_interval_s * MILLIS_PER_SEC
    }
}
