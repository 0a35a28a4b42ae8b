//! Per-probe feature set and the acceptance bands applied before classification.

use serde::Serialize;

use crate::line::Line;

/// Windowed R² around each of the four load-phase boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentedR2s {
    pub compression_start: f32,
    pub compression_end: f32,
    pub decompression_start: f32,
    pub decompression_end: f32,
}

impl Default for SegmentedR2s {
    fn default() -> Self {
        Self {
            compression_start: f32::NAN,
            compression_end: f32::NAN,
            decompression_start: f32::NAN,
            decompression_end: f32::NAN,
        }
    }
}

/// Everything derived from one window during `analyse()`. Recomputed from
/// scratch on every call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Features {
    pub analysis_start: usize,
    pub fall_end: usize,
    pub rise_start: usize,
    pub analysis_end: usize,

    pub z_fall_line: Line,
    pub z_halt_line: Line,
    pub z_rise_line: Line,

    pub before_compression_line: Line,
    pub compression_line: Line,
    pub compressed_line: Line,
    pub decompression_line: Line,
    pub after_decompression_line: Line,

    pub compression_start_time: f32,
    pub compression_end_time: f32,
    pub decompression_start_time: f32,
    pub decompression_end_time: f32,

    pub load_mean_before_compression: f32,
    pub load_mean_after_decompression: f32,

    pub load_angle_compression_start: f32,
    pub load_angle_compression_end: f32,
    pub load_angle_decompression_start: f32,
    pub load_angle_decompression_end: f32,

    #[serde(rename = "r2_20ms")]
    pub r2_20ms: SegmentedR2s,
    #[serde(rename = "r2_30ms")]
    pub r2_30ms: SegmentedR2s,
    #[serde(rename = "r2_50ms")]
    pub r2_50ms: SegmentedR2s,
    #[serde(rename = "r2_60ms")]
    pub r2_60ms: SegmentedR2s,
}

/// Largest |angle| allowed between the compressed line and the
/// after-decompression line.
pub const MAX_ANGLE_AFTER_DEG: f32 = 40.0;

/// Inclusive acceptance band for one scalar feature.
#[derive(Debug, Clone, Copy)]
pub struct FeatureBand {
    pub name: &'static str,
    pub min: f32,
    pub max: f32,
    get: fn(&Features) -> f32,
}

impl FeatureBand {
    const fn new(name: &'static str, min: f32, max: f32, get: fn(&Features) -> f32) -> Self {
        Self { name, min, max, get }
    }

    pub fn value(&self, features: &Features) -> f32 {
        (self.get)(features)
    }

    /// NaN never lies inside a band.
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Scanned in order; the first violation is reported.
pub static FEATURE_BANDS: [FeatureBand; 22] = [
    FeatureBand::new("loadMeanBeforeCompression", -154.48, 152.44, |f| {
        f.load_mean_before_compression
    }),
    FeatureBand::new("loadMeanAfterDecompression", -118.87, 131.06, |f| {
        f.load_mean_after_decompression
    }),
    FeatureBand::new("loadAngleCompressionStart", 21.38, 158.46, |f| {
        f.load_angle_compression_start
    }),
    FeatureBand::new("loadAngleCompressionEnd", 4.12, 176.93, |f| {
        f.load_angle_compression_end
    }),
    FeatureBand::new("loadAngleDecompressionStart", 9.75, 178.61, |f| {
        f.load_angle_decompression_start
    }),
    FeatureBand::new("loadAngleDecompressionEnd", 26.05, 160.71, |f| {
        f.load_angle_decompression_end
    }),
    FeatureBand::new("r2_20ms.compressionStart", 0.4127, 1.0, |f| {
        f.r2_20ms.compression_start
    }),
    FeatureBand::new("r2_20ms.compressionEnd", 0.8853, 1.0, |f| {
        f.r2_20ms.compression_end
    }),
    FeatureBand::new("r2_20ms.decompressionStart", 0.9012, 1.0, |f| {
        f.r2_20ms.decompression_start
    }),
    FeatureBand::new("r2_20ms.decompressionEnd", 0.5318, 1.0, |f| {
        f.r2_20ms.decompression_end
    }),
    FeatureBand::new("r2_30ms.compressionStart", 0.6342, 1.0, |f| {
        f.r2_30ms.compression_start
    }),
    FeatureBand::new("r2_30ms.compressionEnd", 0.9071, 1.0, |f| {
        f.r2_30ms.compression_end
    }),
    FeatureBand::new("r2_30ms.decompressionStart", 0.9186, 1.0, |f| {
        f.r2_30ms.decompression_start
    }),
    FeatureBand::new("r2_30ms.decompressionEnd", 0.7015, 1.0, |f| {
        f.r2_30ms.decompression_end
    }),
    FeatureBand::new("r2_50ms.compressionStart", 0.7706, 1.0, |f| {
        f.r2_50ms.compression_start
    }),
    FeatureBand::new("r2_50ms.compressionEnd", 0.9118, 1.0, |f| {
        f.r2_50ms.compression_end
    }),
    FeatureBand::new("r2_50ms.decompressionStart", 0.9233, 1.0, |f| {
        f.r2_50ms.decompression_start
    }),
    FeatureBand::new("r2_50ms.decompressionEnd", 0.8127, 1.0, |f| {
        f.r2_50ms.decompression_end
    }),
    FeatureBand::new("r2_60ms.compressionStart", 0.8064, 1.0, |f| {
        f.r2_60ms.compression_start
    }),
    FeatureBand::new("r2_60ms.compressionEnd", 0.9152, 1.0, |f| {
        f.r2_60ms.compression_end
    }),
    FeatureBand::new("r2_60ms.decompressionStart", 0.9247, 1.0, |f| {
        f.r2_60ms.decompression_start
    }),
    FeatureBand::new("r2_60ms.decompressionEnd", 0.8389, 1.0, |f| {
        f.r2_60ms.decompression_end
    }),
];

impl Features {
    /// First feature outside its band, as `(name, value)`. Also checks the
    /// derived `angleAfter` feature last.
    pub fn has_out_of_range_feature(&self) -> Option<(&'static str, f32)> {
        for band in &FEATURE_BANDS {
            let v = band.value(self);
            if !band.contains(v) {
                return Some((band.name, v));
            }
        }
        let angle_after = self.angle_after();
        if angle_after.is_nan() || angle_after.abs() > MAX_ANGLE_AFTER_DEG {
            return Some(("angleAfter", angle_after));
        }
        None
    }

    /// Signed angle between the dwell plateau and the post-probe baseline.
    pub fn angle_after(&self) -> f32 {
        self.compressed_line
            .calculate_angle(&self.after_decompression_line)
    }

    /// The 13 classifier inputs, in tree feature-index order.
    pub fn classifier_inputs(&self) -> [f32; 13] {
        [
            self.load_angle_compression_start,
            self.load_angle_compression_end,
            self.load_angle_decompression_start,
            self.load_angle_decompression_end,
            self.r2_20ms.compression_start,
            self.r2_20ms.decompression_end,
            self.r2_30ms.compression_end,
            self.r2_30ms.decompression_start,
            self.r2_50ms.compression_start,
            self.r2_50ms.decompression_end,
            self.r2_60ms.compression_end,
            self.r2_60ms.decompression_start,
            self.load_mean_after_decompression,
        ]
    }
}
