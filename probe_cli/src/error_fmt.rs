//! Human-readable error descriptions and structured JSON error formatting.

use probe_core::error::{BuildError, Rejection};
use serde_json::json;

/// Exit code for a probe the engine rejected.
pub const EXIT_PROBE_REJECTED: i32 = 3;
/// Exit code for config, trace and other runtime errors.
pub const EXIT_ERROR: i32 = 1;

/// What a rejection means for the user, with the usual causes.
pub fn explain_rejection(r: &Rejection) -> String {
    match r {
        Rejection::NotReady => "What happened: The probe is not fully contained in the recorded samples.\nLikely causes: Recording started too late or stopped too early, or the trace holds fewer samples than the analysis margins need.\nHow to fix: Record at least 150 ms before the lowest point and 300 ms after the retract starts.".to_string(),
        Rejection::LoadLines => "What happened: The load signal could not be split into compression and decompression phases.\nLikely causes: The nozzle never touched the bed, or the load cell reported a flat signal.\nHow to fix: Check the load cell wiring and that the probe move actually reaches the bed.".to_string(),
        Rejection::ZLines => "What happened: The Z position could not be fitted around the probe.\nLikely causes: Too few distinct samples in a phase (short dwell, large skip_border_samples).\nHow to fix: Lower analysis.skip_border_samples or lengthen the dwell.".to_string(),
        Rejection::SanityCheck => "What happened: The detected phase boundaries are out of order.\nLikely causes: Heavy noise or an unusual probe shape.\nHow to fix: Re-probe; if it persists, inspect the trace with --features.".to_string(),
        Rejection::FeatureOutOfRange { name, value } => format!(
            "What happened: Feature {name} = {value} is outside its accepted range.\nLikely causes: Noisy load signal, debris on the nozzle, or a loose bed.\nHow to fix: Clean the nozzle and re-probe; inspect the trace with --features."
        ),
        Rejection::LowPrecision => "What happened: The probe looked valid but was classified as imprecise.\nLikely causes: Vibration or a noisy load signal during contact.\nHow to fix: Re-probe.".to_string(),
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(r) = err.downcast_ref::<Rejection>() {
        return explain_rejection(r);
    }

    if let Some(BuildError::InvalidConfig(msg)) = err.downcast_ref::<BuildError>() {
        return format!(
            "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/probe_config.toml for a sample."
        );
    }

    // String-based heuristics for errors coming from config or trace loading
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("trace csv must have headers") {
        return "Invalid headers in trace CSV. Expected 'z,load'.".to_string();
    }
    if lower.contains("open trace csv") {
        return format!(
            "What happened: The trace file could not be opened.\nHow to fix: Check the --trace path. Original: {msg}"
        );
    }
    if lower.contains("invalid trace csv row") || lower.contains("trace csv has no samples") {
        return format!(
            "What happened: The trace file is malformed.\nLikely causes: Non-numeric values, missing columns or an empty file.\nHow to fix: Each row must be `z,load` in millimetres and grams. Original: {msg}"
        );
    }
    if lower.contains(" must be ") {
        return format!(
            "What happened: Invalid configuration ({msg}).\nHow to fix: Edit the config file, then rerun."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Rejected probes map to `EXIT_PROBE_REJECTED`; everything else to `EXIT_ERROR`.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<Rejection>().is_some() {
        return EXIT_PROBE_REJECTED;
    }
    EXIT_ERROR
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    if let Some(r) = err.downcast_ref::<Rejection>() {
        let msg = explain_rejection(r);
        let obj = match r {
            Rejection::FeatureOutOfRange { name, value } => json!({
                "reason": r.tag(),
                "details": { "feature": name, "value": value },
                "message": msg,
            }),
            _ => json!({ "reason": r.tag(), "message": msg }),
        };
        return obj.to_string();
    }

    // Generic error JSON
    json!({ "reason": "error", "message": humanize(err) }).to_string()
}
