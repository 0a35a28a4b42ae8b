//! Trace replay through the engine and result rendering.

use std::path::Path;
use std::time::Duration;

use probe_core::{
    Analysis, AnalysisCfg, ProbeAnalysis, Record, Sampler, SyntheticProbe, TraceReplay,
};
use probe_traits::clock::ManualClock;
use serde_json::json;

/// Build the engine from the validated config.
pub fn build_engine(cfg: &probe_config::Config) -> eyre::Result<ProbeAnalysis> {
    ProbeAnalysis::builder()
        .with_config(AnalysisCfg::from(cfg))
        .try_build()
}

/// Push `samples` through a sampler thread into `engine` and analyse them.
///
/// The manual clock lets the sampler run at full speed while keeping the
/// configured sampling cadence.
pub fn replay(engine: &mut ProbeAnalysis, samples: Vec<Record>) -> eyre::Result<Analysis> {
    let n = samples.len();
    let interval_s = engine.sampling_interval_s();
    let Ok(interval) = Duration::try_from_secs_f32(interval_s) else {
        eyre::bail!(
            "analysis.sampling_interval_ms must be > 0 and fit a duration, got {interval_s} s"
        );
    };
    let feed = engine.feed(n);
    let stats = Sampler::spawn(TraceReplay::new(samples), interval, ManualClock::new(), feed).join();
    let stored = engine.drain_feed();
    tracing::debug!(samples = n, stored, dropped = stats.dropped, "trace replayed");
    Ok(engine.analyse_detailed())
}

/// Analyse a recorded trace file. A rejected probe is reported as an error
/// carrying the `Rejection` once the result has been printed.
pub fn run_analyse(
    cfg: &probe_config::Config,
    trace: &Path,
    with_features: bool,
    json: bool,
) -> eyre::Result<()> {
    let rows = probe_config::load_trace_csv(trace)?;
    tracing::info!(path = %trace.display(), samples = rows.len(), "loaded probe trace");

    let mut engine = build_engine(cfg)?;
    let samples: Vec<Record> = rows.iter().map(Record::from).collect();
    let analysis = replay(&mut engine, samples)?;

    print_analysis(&analysis, rows.len(), with_features, json)?;
    match analysis.rejection {
        Some(rejection) => Err(eyre::Report::new(rejection)),
        None => Ok(()),
    }
}

/// Analyse a synthetic probe shaped for the configured sampling cadence.
pub fn run_self_check(cfg: &probe_config::Config, json: bool) -> eyre::Result<()> {
    let mut engine = build_engine(cfg)?;
    let probe = SyntheticProbe {
        sampling_interval_s: engine.cfg().sampling_interval_s,
        load_delay_s: engine.cfg().load_delay_s,
        ..SyntheticProbe::default()
    };
    let samples = probe.samples();
    let n = samples.len();
    let analysis = replay(&mut engine, samples)?;

    if json {
        println!(
            "{}",
            json!({
                "selfCheck": analysis.result.is_good(),
                "samples": n,
                "result": &analysis.result,
            })
        );
    } else if let Some(z) = analysis.result.z_coordinate() {
        println!("self-check ok: synthetic probe accepted, z = {z:.4} mm");
    }
    match analysis.rejection {
        Some(rejection) => Err(eyre::Report::new(rejection)),
        None => Ok(()),
    }
}

fn print_analysis(
    analysis: &Analysis,
    samples: usize,
    with_features: bool,
    json: bool,
) -> eyre::Result<()> {
    if json {
        let features = if with_features {
            serde_json::to_value(&analysis.features)?
        } else {
            serde_json::Value::Null
        };
        println!(
            "{}",
            json!({
                "samples": samples,
                "result": &analysis.result,
                "features": features,
            })
        );
        return Ok(());
    }

    match analysis.result.z_coordinate() {
        Some(z) => println!("probe: good, z = {z:.4} mm"),
        None => println!(
            "probe: bad ({})",
            analysis.result.description().unwrap_or("unknown")
        ),
    }
    if with_features {
        match &analysis.features {
            Some(f) => println!("{}", serde_json::to_string_pretty(f)?),
            None => println!("features: not computed (rejected before the sanity check passed)"),
        }
    }
    Ok(())
}
