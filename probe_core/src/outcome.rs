//! Result of a single `analyse()` call.

use serde::Serialize;

use crate::error::Rejection;
use crate::features::Features;

/// Verdict on one probe. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    is_good: bool,
    description: Option<&'static str>,
    z_coordinate: f32,
}

impl ProbeResult {
    pub fn good(z_coordinate: f32) -> Self {
        Self {
            is_good: true,
            description: None,
            z_coordinate,
        }
    }

    pub fn bad(description: &'static str) -> Self {
        Self {
            is_good: false,
            description: Some(description),
            z_coordinate: f32::NAN,
        }
    }

    pub fn is_good(&self) -> bool {
        self.is_good
    }

    /// Reason tag when the probe was rejected.
    pub fn description(&self) -> Option<&'static str> {
        self.description
    }

    /// Interpolated bed-contact Z (mm); only meaningful for good probes.
    pub fn z_coordinate(&self) -> Option<f32> {
        self.is_good.then_some(self.z_coordinate)
    }
}

impl From<&Rejection> for ProbeResult {
    fn from(r: &Rejection) -> Self {
        Self::bad(r.tag())
    }
}

/// `ProbeResult` plus whatever the pipeline computed on the way.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub result: ProbeResult,
    /// First failing stage, if any.
    #[serde(skip)]
    pub rejection: Option<Rejection>,
    /// Present once the pipeline got past the sanity check.
    pub features: Option<Features>,
}
