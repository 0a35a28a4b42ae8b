//! Validated construction of `ProbeAnalysis`.
//!
//! `ProbeAnalysis::new` takes its configuration as-is; the builder checks
//! every parameter first and reports the first violation as
//! `BuildError::InvalidConfig`.

use crate::analysis::ProbeAnalysis;
use crate::config::{AnalysisCfg, PrinterModel};
use crate::error::{BuildError, Result};
use crate::util::ms_to_s;

/// Matches `probe_config::MAX_SKIP_BORDER_SAMPLES`.
pub const MAX_SKIP_BORDER_SAMPLES: usize = probe_config::MAX_SKIP_BORDER_SAMPLES;

/// Smallest window that can hold a two-line fit.
pub const MIN_WINDOW_CAPACITY: usize = 3;

#[derive(Debug, Default, Clone)]
pub struct ProbeAnalysisBuilder {
    cfg: AnalysisCfg,
}

impl ProbeAnalysis {
    /// Start building an engine from the default configuration.
    pub fn builder() -> ProbeAnalysisBuilder {
        ProbeAnalysisBuilder::default()
    }
}

impl ProbeAnalysisBuilder {
    /// Replace the whole configuration (e.g. one converted from `probe_config`).
    pub fn with_config(mut self, cfg: AnalysisCfg) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn window_capacity(mut self, capacity: usize) -> Self {
        self.cfg.window_capacity = capacity;
        self
    }

    pub fn sampling_interval_ms(mut self, ms: f32) -> Self {
        self.cfg.sampling_interval_s = ms_to_s(ms);
        self
    }

    pub fn load_delay_ms(mut self, ms: f32) -> Self {
        self.cfg.load_delay_s = ms_to_s(ms);
        self
    }

    pub fn skip_border_samples(mut self, n: usize) -> Self {
        self.cfg.skip_border_samples = n;
        self
    }

    pub fn printer(mut self, model: PrinterModel) -> Self {
        self.cfg.printer = model;
        self
    }

    pub fn try_build(self) -> Result<ProbeAnalysis> {
        validate(&self.cfg)?;
        Ok(ProbeAnalysis::new(self.cfg))
    }
}

fn validate(cfg: &AnalysisCfg) -> Result<()> {
    if cfg.window_capacity < MIN_WINDOW_CAPACITY {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "window_capacity must be >= 3",
        )));
    }
    if !cfg.sampling_interval_s.is_finite() || cfg.sampling_interval_s <= 0.0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "sampling interval must be > 0",
        )));
    }
    if !cfg.load_delay_s.is_finite() || cfg.load_delay_s < 0.0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "load delay must be >= 0",
        )));
    }
    if cfg.skip_border_samples > MAX_SKIP_BORDER_SAMPLES {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "skip_border_samples must be <= 32",
        )));
    }
    Ok(())
}
