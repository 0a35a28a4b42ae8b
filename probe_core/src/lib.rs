#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::float_cmp,
    clippy::suboptimal_flops
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Load-cell probe analysis (hardware-agnostic).
//!
//! Decides whether one nozzle-on-bed probe produced a trustworthy contact
//! height and, if so, interpolates it. Samples of `(z_mm, load_g)` are
//! collected into a fixed-capacity window; `ProbeAnalysis::analyse` then
//! segments the load signal into five phases with piecewise line fits,
//! derives geometric and fit-quality features, gates them against fixed
//! acceptance bands and a trained decision tree, and returns a
//! `ProbeResult`.
//!
//! ## Architecture
//!
//! - **Window**: ring buffer of the most recent samples (`window` module)
//! - **Lines**: least-squares fits, intersections, angles (`line` module)
//! - **Engine**: the staged pipeline (`analysis` module)
//! - **Features**: derived values and acceptance bands (`features` module)
//! - **Classifier**: frozen decision tree as a data table (`classifier` module)
//! - **Feeding**: cross-thread producers and a sensor-driven sampler (`sampler` module)
//!
//! Hardware access goes through `probe_traits::ProbeSensor`; `TraceReplay`
//! and `SyntheticProbe` provide recorded and generated samples.

pub mod analysis;
pub mod builder;
pub mod classifier;
pub mod config;
pub mod conversions;
pub mod error;
pub mod features;
pub mod line;
pub mod outcome;
pub mod replay;
pub mod sampler;
pub mod synthetic;
pub mod util;
pub mod window;

pub use analysis::{ProbeAnalysis, SearchDirection};
pub use builder::ProbeAnalysisBuilder;
pub use config::{AnalysisCfg, PrinterModel};
pub use error::{BuildError, FeedError, Rejection};
pub use features::{Features, SegmentedR2s};
pub use line::Line;
pub use outcome::{Analysis, ProbeResult};
pub use replay::TraceReplay;
pub use sampler::{SampleFeed, Sampler, SamplerStats};
pub use synthetic::SyntheticProbe;
pub use window::{Record, SampleWindow, SamplesRange};
