//! `From` implementations bridging `probe_config` types to `probe_core` types.

use crate::config::{AnalysisCfg, PrinterModel};
use crate::util::ms_to_s;
use crate::window::Record;

impl From<probe_config::PrinterModel> for PrinterModel {
    fn from(m: probe_config::PrinterModel) -> Self {
        match m {
            probe_config::PrinterModel::Mk4 => PrinterModel::Mk4,
            probe_config::PrinterModel::Xl => PrinterModel::Xl,
            probe_config::PrinterModel::CoreOne => PrinterModel::CoreOne,
        }
    }
}

impl From<&probe_config::Config> for AnalysisCfg {
    fn from(c: &probe_config::Config) -> Self {
        Self {
            window_capacity: c.window.capacity,
            sampling_interval_s: ms_to_s(c.analysis.sampling_interval_ms),
            load_delay_s: ms_to_s(c.analysis.load_delay_ms),
            skip_border_samples: c.analysis.skip_border_samples,
            printer: c.printer.model.into(),
        }
    }
}

impl From<&probe_config::TraceRow> for Record {
    fn from(r: &probe_config::TraceRow) -> Self {
        Record::new(r.z, r.load)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_match_runtime_defaults() {
        let from_toml = AnalysisCfg::from(&probe_config::Config::default());
        let runtime = AnalysisCfg::default();
        assert_eq!(from_toml.window_capacity, runtime.window_capacity);
        assert!((from_toml.sampling_interval_s - runtime.sampling_interval_s).abs() < 1e-9);
        assert!((from_toml.load_delay_s - runtime.load_delay_s).abs() < 1e-9);
        assert_eq!(from_toml.skip_border_samples, runtime.skip_border_samples);
        assert_eq!(from_toml.printer, runtime.printer);
    }

    #[test]
    fn printer_model_maps_one_to_one() {
        let cfg = probe_config::load_toml("[printer]\nmodel = \"coreone\"\n").unwrap();
        assert_eq!(AnalysisCfg::from(&cfg).printer, PrinterModel::CoreOne);
    }
}
