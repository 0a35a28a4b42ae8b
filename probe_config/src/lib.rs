#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and recorded-trace parsing for the probe analysis engine.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//! - The probe trace CSV loader enforces the `z,load` header and reports the
//!   offending row number on malformed input.
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

/// One recorded sample of a probe trace.
///
/// Expected headers:
/// z,load
///
/// Example:
/// z,load
/// 0.675,2.827
/// 0.66719,-0.235
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct TraceRow {
    /// Extruder Z in millimetres.
    pub z: f32,
    /// Load-cell reading in grams.
    pub load: f32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WindowCfg {
    /// Number of most recent samples kept for analysis.
    pub capacity: usize,
}

impl Default for WindowCfg {
    fn default() -> Self {
        Self { capacity: 1000 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AnalysisCfg {
    /// Time between two stored samples (ms). 3.125 ms = 320 Hz.
    pub sampling_interval_ms: f32,
    /// How far the load signal lags the Z position (ms)
    pub load_delay_ms: f32,
    /// Samples next to a phase boundary excluded from line fits
    pub skip_border_samples: usize,
}

impl Default for AnalysisCfg {
    fn default() -> Self {
        Self {
            sampling_interval_ms: 1000.0 / 320.0,
            load_delay_ms: 20.0,
            skip_border_samples: 3,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PrinterModel {
    #[default]
    Mk4,
    Xl,
    CoreOne,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct PrinterCfg {
    pub model: PrinterModel,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub window: WindowCfg,
    pub analysis: AnalysisCfg,
    pub printer: PrinterCfg,
    pub logging: Logging,
}

/// Upper bound for `analysis.skip_border_samples`; larger values leave no
/// samples to fit at realistic sampling rates.
pub const MAX_SKIP_BORDER_SAMPLES: usize = 32;

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Window
        if self.window.capacity < 3 {
            eyre::bail!("window.capacity must be >= 3");
        }

        // Analysis
        let interval = self.analysis.sampling_interval_ms;
        if !interval.is_finite() || interval <= 0.0 {
            eyre::bail!("analysis.sampling_interval_ms must be > 0");
        }
        let delay = self.analysis.load_delay_ms;
        if !delay.is_finite() || delay < 0.0 {
            eyre::bail!("analysis.load_delay_ms must be >= 0");
        }
        if self.analysis.skip_border_samples > MAX_SKIP_BORDER_SAMPLES {
            eyre::bail!(
                "analysis.skip_border_samples must be <= {}",
                MAX_SKIP_BORDER_SAMPLES
            );
        }

        // Logging
        if let Some(rotation) = self.logging.rotation.as_deref()
            && !matches!(rotation, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rotation:?}");
        }

        Ok(())
    }
}

/// Parse a probe trace from any reader. The header must be exactly `z,load`.
pub fn read_trace_csv<R: Read>(reader: R) -> eyre::Result<Vec<TraceRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read trace CSV headers: {}", e))?
        .clone();
    let expected = ["z", "load"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "trace CSV must have headers 'z,load', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<TraceRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid trace CSV row {}: {}", idx + 2, e);
            }
        }
    }
    if rows.is_empty() {
        eyre::bail!("trace CSV has no samples");
    }
    Ok(rows)
}

pub fn load_trace_csv(path: &Path) -> eyre::Result<Vec<TraceRow>> {
    let file = std::fs::File::open(path)
        .map_err(|e| eyre::eyre!("open trace CSV {:?}: {}", path, e))?;
    read_trace_csv(file).map_err(|e| eyre::eyre!("{:?}: {}", path, e))
}
