use thiserror::Error;

/// Why a probe was not accepted. Each variant corresponds to one pipeline
/// stage; the first failing stage wins.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Rejection {
    #[error("not enough samples around the probe event")]
    NotReady,
    #[error("load lines could not be fitted or do not intersect")]
    LoadLines,
    #[error("z lines could not be fitted")]
    ZLines,
    #[error("phase boundaries are out of order")]
    SanityCheck,
    #[error("feature {name} out of range: {value}")]
    FeatureOutOfRange { name: &'static str, value: f32 },
    #[error("probe classified as low precision")]
    LowPrecision,
}

impl Rejection {
    /// Short machine-readable tag suitable for logs and telemetry.
    pub fn tag(&self) -> &'static str {
        match self {
            Rejection::NotReady => "not-ready",
            Rejection::LoadLines => "load-lines",
            Rejection::ZLines => "z-lines",
            Rejection::SanityCheck => "sanity-check",
            Rejection::FeatureOutOfRange { .. } => "feature-out-of-range",
            Rejection::LowPrecision => "low-precision",
        }
    }
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

/// Why a sample offered through a `SampleFeed` was not queued.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FeedError {
    #[error("analysis in progress; sample dropped")]
    AnalysisInProgress,
    #[error("feed queue full; sample dropped")]
    Full,
    #[error("engine side of the feed is gone")]
    Disconnected,
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
