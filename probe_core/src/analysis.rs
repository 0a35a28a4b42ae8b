//! The probe analysis engine.
//!
//! `ProbeAnalysis` owns the sample window. Samples arrive through
//! `store_sample` (or a `SampleFeed` drained with `drain_feed`); once the
//! probe move is complete `analyse` runs the whole pipeline synchronously:
//!
//! 1. delay compensation (Z shifted to line up with the lagging load signal)
//! 2. halt span (lowest contiguous Z plateau)
//! 3. analysis range around the halt span
//! 4. load lines (two-line fits either side of the dwell) and Z lines
//! 5. sanity check on the ordering of phase boundaries
//! 6. load means, angles, segmented R² values, range gate, classifier
//! 7. final Z interpolation
//!
//! Every stage is a hard gate; the first failing one decides the result.
//!
//! Delay compensation rewrites the Z channel of the window in place.
//! Calling `analyse` twice on the same samples shifts Z twice, so callers
//! must `reset` between probes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{Receiver, bounded};
use tracing::{debug, info, trace};

use crate::classifier;
use crate::config::{ANALYSIS_LOOKAHEAD_S, ANALYSIS_LOOKBACK_S, AnalysisCfg};
use crate::error::Rejection;
use crate::features::{Features, SegmentedR2s};
use crate::line::{Fit, Line};
use crate::outcome::{Analysis, ProbeResult};
use crate::sampler::SampleFeed;
use crate::util::{ms_to_s, samples_for};
use crate::window::{Record, SampleWindow, SamplesRange};

/// Widths of the windows used for the segmented R² features (s).
pub const R2_SEGMENTS_S: [f32; 4] = [0.020, 0.030, 0.050, 0.060];

/// Load offset (g) below the decompression end at which the second Z
/// estimate is taken.
const SECOND_Z_LOAD_OFFSET_G: f32 = -50.0;

/// Rounding direction when mapping a time to a window position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDirection {
    /// Latest sample at or before the time.
    Backward,
    /// Earliest sample at or after the time.
    Forward,
}

type Channel = fn(&Record) -> f32;

fn load_of(r: &Record) -> f32 {
    r.load
}

fn z_of(r: &Record) -> f32 {
    r.z
}

/// Sets the shared in-progress flag for as long as it lives.
struct InProgress(Arc<AtomicBool>);

impl InProgress {
    fn engage(flag: &Arc<AtomicBool>) -> Self {
        flag.store(true, Ordering::Release);
        Self(Arc::clone(flag))
    }
}

impl Drop for InProgress {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Debug)]
pub struct ProbeAnalysis {
    window: SampleWindow,
    cfg: AnalysisCfg,
    /// Seconds between two consecutive samples.
    sampling_interval: f32,
    in_progress: Arc<AtomicBool>,
    feed_rx: Option<Receiver<Record>>,
}

impl Default for ProbeAnalysis {
    fn default() -> Self {
        Self::new(AnalysisCfg::default())
    }
}

impl ProbeAnalysis {
    /// Engine with `cfg` as-is. Use the builder for validated construction.
    pub fn new(cfg: AnalysisCfg) -> Self {
        Self {
            window: SampleWindow::with_capacity(cfg.window_capacity),
            sampling_interval: cfg.sampling_interval_s,
            cfg,
            in_progress: Arc::new(AtomicBool::new(false)),
            feed_rx: None,
        }
    }

    pub fn cfg(&self) -> &AnalysisCfg {
        &self.cfg
    }

    /// Sampling interval in milliseconds. Not validated: a zero or negative
    /// interval makes every regression degenerate.
    pub fn set_sampling_interval_ms(&mut self, ms: f32) {
        self.sampling_interval = ms_to_s(ms);
    }

    pub fn sampling_interval_s(&self) -> f32 {
        self.sampling_interval
    }

    /// Append one sample, evicting the oldest once the window is full.
    /// Ignored while an analysis is in progress.
    pub fn store_sample(&mut self, z: f32, load: f32) {
        if self.in_progress.load(Ordering::Acquire) {
            trace!(z, load, "sample dropped: analysis in progress");
            return;
        }
        self.window.push(Record::new(z, load));
    }

    /// Forget every stored sample.
    pub fn reset(&mut self) {
        self.window.clear();
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn window(&self) -> &SampleWindow {
        &self.window
    }

    pub fn is_analysis_in_progress(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Producer handle for another thread. Replaces any previous feed; its
    /// producers see `Disconnected` from then on.
    pub fn feed(&mut self, depth: usize) -> SampleFeed {
        let (tx, rx) = bounded(depth.max(1));
        self.feed_rx = Some(rx);
        SampleFeed::new(tx, Arc::clone(&self.in_progress))
    }

    /// Move every queued feed sample into the window. Returns how many were moved.
    pub fn drain_feed(&mut self) -> usize {
        let Some(rx) = self.feed_rx.take() else {
            return 0;
        };
        let mut moved = 0usize;
        for record in rx.try_iter() {
            self.store_sample(record.z, record.load);
            moved += 1;
        }
        self.feed_rx = Some(rx);
        moved
    }

    /// Run the full pipeline and return the verdict.
    pub fn analyse(&mut self) -> ProbeResult {
        self.analyse_detailed().result
    }

    /// Like `analyse`, also returning the rejection reason and the computed
    /// features (present once the sanity check has passed).
    pub fn analyse_detailed(&mut self) -> Analysis {
        let _guard = InProgress::engage(&self.in_progress);
        let mut features = Features::default();
        match self.run_pipeline(&mut features) {
            Ok(z) => {
                info!(z, "probe accepted");
                Analysis {
                    result: ProbeResult::good(z),
                    rejection: None,
                    features: Some(features),
                }
            }
            Err(rejection) => {
                info!(reason = rejection.tag(), "probe rejected");
                let features = matches!(
                    rejection,
                    Rejection::FeatureOutOfRange { .. } | Rejection::LowPrecision
                )
                .then_some(features);
                Analysis {
                    result: ProbeResult::from(&rejection),
                    rejection: Some(rejection),
                    features,
                }
            }
        }
    }

    fn run_pipeline(&mut self, f: &mut Features) -> Result<f32, Rejection> {
        self.compensate_for_system_delay()?;

        let (fall_end, rise_start) = self.calculate_halt_span();
        f.fall_end = fall_end;
        f.rise_start = rise_start;

        let (start, end) = self.calculate_analysis_range(fall_end, rise_start)?;
        f.analysis_start = start;
        f.analysis_end = end;

        self.calculate_load_line_approximation_features(f)?;
        self.calculate_z_line_approximation_features(f)?;
        self.check_line_sanity(f)?;

        self.calculate_load_means(f);
        self.calculate_load_angles(f);
        f.r2_20ms = self.calculate_segmented_r2s(f, R2_SEGMENTS_S[0]);
        f.r2_30ms = self.calculate_segmented_r2s(f, R2_SEGMENTS_S[1]);
        f.r2_50ms = self.calculate_segmented_r2s(f, R2_SEGMENTS_S[2]);
        f.r2_60ms = self.calculate_segmented_r2s(f, R2_SEGMENTS_S[3]);
        trace!(?f, "features");

        if let Some((name, value)) = f.has_out_of_range_feature() {
            debug!(name, value, "feature out of range");
            return Err(Rejection::FeatureOutOfRange { name, value });
        }
        if !classifier::classify(f) {
            debug!("classifier rejected probe");
            return Err(Rejection::LowPrecision);
        }
        Ok(self.interpolate_final_z_coordinate(f))
    }

    /// Shift Z later by the load delay so both channels describe the same
    /// instant. The oldest positions, which have nothing to copy from, are
    /// extrapolated backwards from the first two shifted values.
    pub fn compensate_for_system_delay(&mut self) -> Result<(), Rejection> {
        let shift = samples_for(self.cfg.load_delay_s, self.sampling_interval);
        let len = self.window.len();
        if len <= shift.saturating_add(2) {
            debug!(len, shift, "not enough samples to compensate load delay");
            return Err(Rejection::NotReady);
        }
        for pos in (shift..len).rev() {
            self.window[pos].z = self.window[pos - shift].z;
        }
        if shift > 0 {
            let slope = self.window[shift + 1].z - self.window[shift].z;
            for pos in (0..shift).rev() {
                self.window[pos].z = self.window[pos + 1].z - slope;
            }
        }
        Ok(())
    }

    /// `(fall_end, rise_start)`: first and last position of the contiguous
    /// run holding the lowest Z, searched from the newest sample backwards.
    pub fn calculate_halt_span(&self) -> (usize, usize) {
        let Some(last) = self.window.len().checked_sub(1) else {
            return (0, 0);
        };
        let mut min_z = self.window[last].z;
        let mut fall_end = last;
        let mut rise_start = last;
        let mut extending = true;
        for pos in (0..last).rev() {
            let z = self.window[pos].z;
            if z < min_z {
                min_z = z;
                fall_end = pos;
                rise_start = pos;
                extending = true;
            } else if z == min_z && extending {
                fall_end = pos;
            } else {
                extending = false;
            }
        }
        (fall_end, rise_start)
    }

    /// `(analysis_start, analysis_end)` with fixed margins around the halt span.
    pub fn calculate_analysis_range(
        &self,
        fall_end: usize,
        rise_start: usize,
    ) -> Result<(usize, usize), Rejection> {
        let lookback = samples_for(ANALYSIS_LOOKBACK_S, self.sampling_interval);
        let lookahead = samples_for(ANALYSIS_LOOKAHEAD_S, self.sampling_interval);
        let Some(start) = fall_end.checked_sub(lookback) else {
            debug!(fall_end, lookback, "probe too close to window start");
            return Err(Rejection::NotReady);
        };
        let end = rise_start.saturating_add(lookahead);
        if end >= self.window.len() {
            debug!(rise_start, lookahead, "probe too close to window end");
            return Err(Rejection::NotReady);
        }
        Ok((start, end))
    }

    /// Start time of the sample at `pos`, relative to the oldest sample.
    pub fn time_of_sample(&self, pos: usize) -> f32 {
        pos as f32 * self.sampling_interval
    }

    /// Window position nearest to `time`, rounded in `direction` and clamped
    /// to the window.
    pub fn closest_sample(&self, time: f32, direction: SearchDirection) -> usize {
        let Some(last) = self.window.len().checked_sub(1) else {
            return 0;
        };
        let idx = time / self.sampling_interval;
        let idx = match direction {
            SearchDirection::Backward => idx.floor(),
            SearchDirection::Forward => idx.ceil(),
        };
        if idx.is_nan() || idx <= 0.0 {
            0
        } else {
            (idx as usize).min(last)
        }
    }

    fn points(
        &self,
        range: SamplesRange,
        channel: Channel,
    ) -> impl Iterator<Item = (f64, f64)> + Clone + '_ {
        self.window.range(range).map(move |(pos, r)| {
            (
                f64::from(self.time_of_sample(pos)),
                f64::from(channel(r)),
            )
        })
    }

    fn fit(&self, range: SamplesRange, channel: Channel) -> Option<Fit> {
        Fit::least_squares(self.points(range, channel))
    }

    fn line(&self, range: SamplesRange, channel: Channel) -> Line {
        Line::from(self.fit(range, channel))
    }

    /// Sum of squared load residuals over `range` when `[first, split - 1]`
    /// and `[split, last]` each get their own regression line. NaN when either
    /// side cannot be fitted.
    pub fn fitting_error(&self, range: SamplesRange, split: usize) -> f64 {
        let left = SamplesRange::ending_at(range.first, split.checked_sub(1));
        let right = SamplesRange::new(split, range.last);
        let (Some(l), Some(r)) = (self.fit(left, load_of), self.fit(right, load_of)) else {
            return f64::NAN;
        };
        let mut err = 0.0f64;
        for (t, y) in self.points(left, load_of) {
            let d = y - l.value_at(t);
            err += d * d;
        }
        for (t, y) in self.points(right, load_of) {
            let d = y - r.value_at(t);
            err += d * d;
        }
        err
    }

    /// Split position minimizing `fitting_error`; the lowest position wins a
    /// tie. `None` for ranges shorter than three samples.
    pub fn find_best_two_lines_approximation(&self, range: SamplesRange) -> Option<usize> {
        if range.size() < 3 {
            return None;
        }
        let mut best: Option<(usize, f64)> = None;
        for split in (range.first + 1)..range.last {
            let err = self.fitting_error(range, split);
            if err.is_nan() {
                continue;
            }
            if best.is_none_or(|(_, best_err)| err < best_err) {
                best = Some((split, err));
            }
        }
        best.map(|(split, _)| split)
    }

    fn two_load_lines(&self, range: SamplesRange) -> (Line, Line) {
        match self.find_best_two_lines_approximation(range) {
            Some(split) => (
                self.line(
                    SamplesRange::ending_at(range.first, split.checked_sub(1)),
                    load_of,
                ),
                self.line(SamplesRange::new(split, range.last), load_of),
            ),
            None => (Line::INVALID, Line::INVALID),
        }
    }

    fn fall_range(&self, f: &Features) -> SamplesRange {
        SamplesRange::ending_at(
            f.analysis_start,
            f.fall_end.checked_sub(self.cfg.skip_border_samples),
        )
    }

    fn halt_range(&self, f: &Features) -> SamplesRange {
        SamplesRange::ending_at(
            f.fall_end.saturating_add(self.cfg.skip_border_samples),
            f.rise_start.checked_sub(self.cfg.skip_border_samples),
        )
    }

    fn rise_range(&self, f: &Features) -> SamplesRange {
        SamplesRange::new(
            f.rise_start.saturating_add(self.cfg.skip_border_samples),
            f.analysis_end,
        )
    }

    /// Five load lines and the four phase-boundary times at their intersections.
    pub fn calculate_load_line_approximation_features(
        &self,
        f: &mut Features,
    ) -> Result<(), Rejection> {
        (f.before_compression_line, f.compression_line) = self.two_load_lines(self.fall_range(f));
        f.compressed_line = self.line(self.halt_range(f), load_of);
        (f.decompression_line, f.after_decompression_line) =
            self.two_load_lines(self.rise_range(f));

        f.compression_start_time = f
            .before_compression_line
            .find_intersection(&f.compression_line);
        f.compression_end_time = f.compression_line.find_intersection(&f.compressed_line);
        f.decompression_start_time = f
            .compressed_line
            .find_intersection(&f.decompression_line);
        f.decompression_end_time = f
            .decompression_line
            .find_intersection(&f.after_decompression_line);

        let times = [
            f.compression_start_time,
            f.compression_end_time,
            f.decompression_start_time,
            f.decompression_end_time,
        ];
        if times.iter().any(|t| t.is_nan()) {
            debug!(?times, "load lines do not intersect");
            return Err(Rejection::LoadLines);
        }
        Ok(())
    }

    /// Z regressions over the fall, halt and rise segments.
    pub fn calculate_z_line_approximation_features(
        &self,
        f: &mut Features,
    ) -> Result<(), Rejection> {
        f.z_fall_line = self.line(self.fall_range(f), z_of);
        f.z_halt_line = self.line(self.halt_range(f), z_of);
        f.z_rise_line = self.line(self.rise_range(f), z_of);
        if !(f.z_fall_line.is_valid() && f.z_halt_line.is_valid() && f.z_rise_line.is_valid()) {
            debug!("z lines could not be fitted");
            return Err(Rejection::ZLines);
        }
        Ok(())
    }

    /// Phase boundary times must be strictly increasing inside the analysis range.
    pub fn check_line_sanity(&self, f: &Features) -> Result<(), Rejection> {
        let times = [
            self.time_of_sample(f.analysis_start),
            f.compression_start_time,
            f.compression_end_time,
            f.decompression_start_time,
            f.decompression_end_time,
            self.time_of_sample(f.analysis_end),
        ];
        if times.windows(2).all(|w| w[0] < w[1]) {
            Ok(())
        } else {
            debug!(?times, "phase boundaries out of order");
            Err(Rejection::SanityCheck)
        }
    }

    fn mean_load(&self, range: SamplesRange) -> f32 {
        let mut sum = 0.0f64;
        let mut n = 0usize;
        for (_, r) in self.window.range(range) {
            sum += f64::from(r.load);
            n += 1;
        }
        if n == 0 {
            return f32::NAN;
        }
        (sum / n as f64) as f32
    }

    /// Mean load before compression starts and after decompression ends.
    pub fn calculate_load_means(&self, f: &mut Features) {
        let before = SamplesRange::new(
            f.analysis_start,
            self.closest_sample(f.compression_start_time, SearchDirection::Backward),
        );
        let after = SamplesRange::new(
            self.closest_sample(f.decompression_end_time, SearchDirection::Forward),
            f.analysis_end,
        );
        f.load_mean_before_compression = self.mean_load(before);
        f.load_mean_after_decompression = self.mean_load(after);
    }

    /// Angles between neighbouring load lines, folded into `[0, 180)`.
    pub fn calculate_load_angles(&self, f: &mut Features) {
        fn fold(deg: f32) -> f32 {
            if deg < 0.0 { deg + 180.0 } else { deg }
        }
        f.load_angle_compression_start =
            fold(f.before_compression_line.calculate_angle(&f.compression_line));
        f.load_angle_compression_end =
            fold(f.compression_line.calculate_angle(&f.compressed_line));
        f.load_angle_decompression_start =
            fold(f.compressed_line.calculate_angle(&f.decompression_line));
        f.load_angle_decompression_end =
            fold(f.decompression_line.calculate_angle(&f.after_decompression_line));
    }

    /// Segmented R² at each of the four phase boundaries for a window of
    /// `segment_s` seconds on either side.
    pub fn calculate_segmented_r2s(&self, f: &Features, segment_s: f32) -> SegmentedR2s {
        SegmentedR2s {
            compression_start: self.segmented_r2(
                f.compression_start_time,
                &f.before_compression_line,
                &f.compression_line,
                segment_s,
            ),
            compression_end: self.segmented_r2(
                f.compression_end_time,
                &f.compression_line,
                &f.compressed_line,
                segment_s,
            ),
            decompression_start: self.segmented_r2(
                f.decompression_start_time,
                &f.compressed_line,
                &f.decompression_line,
                segment_s,
            ),
            decompression_end: self.segmented_r2(
                f.decompression_end_time,
                &f.decompression_line,
                &f.after_decompression_line,
                segment_s,
            ),
        }
    }

    /// R² of `left` over the samples just before `time` pooled with `right`
    /// over the samples just after it. `-inf` when the pooled load is constant.
    pub fn segmented_r2(&self, time: f32, left: &Line, right: &Line, segment_s: f32) -> f32 {
        let Some(last_pos) = self.window.len().checked_sub(1) else {
            return f32::NAN;
        };
        let k = samples_for(segment_s, self.sampling_interval);
        let back = self.closest_sample(time, SearchDirection::Backward);
        let fwd = self.closest_sample(time, SearchDirection::Forward);
        let first = (back + 1).saturating_sub(k);
        let last = fwd.saturating_add(k).saturating_sub(1).min(last_pos);

        let mut unexplained = 0.0f64;
        for (pos, r) in self.window.range(SamplesRange::new(first, back)) {
            let d = f64::from(r.load) - f64::from(left.value_at(self.time_of_sample(pos)));
            unexplained += d * d;
        }
        for (pos, r) in self.window.range(SamplesRange::new(fwd, last)) {
            let d = f64::from(r.load) - f64::from(right.value_at(self.time_of_sample(pos)));
            unexplained += d * d;
        }

        let total = self.calculate_variance(SamplesRange::new(first, last));
        if total == 0.0 {
            return f32::NEG_INFINITY;
        }
        (1.0 - unexplained / total) as f32
    }

    /// Sum of squared load deviations over `range` (not normalized).
    ///
    /// The reference level is the last sample's load divided by the sample
    /// count, not the mean. The R² bands assume this reference.
    pub fn calculate_variance(&self, range: SamplesRange) -> f64 {
        let n = range.size();
        let Some(last) = self.window.get(range.last).filter(|_| n > 0) else {
            return 0.0;
        };
        let reference = f64::from(last.load) / n as f64;
        self.window
            .range(range)
            .map(|(_, r)| {
                let d = f64::from(r.load) - reference;
                d * d
            })
            .sum()
    }

    /// Bed-contact Z: mean of the rise-line Z at decompression end and at the
    /// time the decompression line has dropped a further 50 g.
    pub fn interpolate_final_z_coordinate(&self, f: &Features) -> f32 {
        let de = f.decompression_end_time;
        let z1 = f.z_rise_line.value_at(de);
        let load_at_de = f.decompression_line.value_at(de);
        let t2 = f
            .decompression_line
            .time_at(load_at_de + SECOND_Z_LOAD_OFFSET_G);
        let z2 = f.z_rise_line.value_at(t2);
        (z1 + z2) / 2.0 + self.cfg.printer.z_correction_mm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PrinterModel;

    fn engine(interval_ms: f32, delay_ms: f32) -> ProbeAnalysis {
        let mut e = ProbeAnalysis::new(AnalysisCfg {
            window_capacity: 64,
            load_delay_s: ms_to_s(delay_ms),
            ..AnalysisCfg::default()
        });
        e.set_sampling_interval_ms(interval_ms);
        e
    }

    fn with_loads(interval_ms: f32, loads: &[f32]) -> ProbeAnalysis {
        let mut e = engine(interval_ms, 0.0);
        for &l in loads {
            e.store_sample(0.0, l);
        }
        e
    }

    #[test]
    fn closest_sample_rounds_and_clamps() {
        let e = with_loads(10.0, &[0.0; 5]);
        assert_eq!(e.closest_sample(0.015, SearchDirection::Backward), 1);
        assert_eq!(e.closest_sample(0.015, SearchDirection::Forward), 2);
        assert_eq!(e.closest_sample(-1.0, SearchDirection::Forward), 0);
        assert_eq!(e.closest_sample(10.0, SearchDirection::Backward), 4);
        assert_eq!(e.closest_sample(f32::NAN, SearchDirection::Backward), 0);
    }

    #[test]
    fn variance_uses_scaled_last_load_as_reference() {
        // Reference is 4 / 2 = 2, not the mean 3.
        let e = with_loads(10.0, &[2.0, 4.0]);
        assert_eq!(e.calculate_variance(SamplesRange::new(0, 1)), 4.0);
        assert_eq!(e.calculate_variance(SamplesRange::EMPTY), 0.0);
    }

    #[test]
    fn constant_load_gives_negative_infinite_r2() {
        let e = with_loads(10.0, &[0.0; 10]);
        let flat = Line::new(0.0, 0.0);
        assert_eq!(e.segmented_r2(0.045, &flat, &flat, 0.02), f32::NEG_INFINITY);
    }

    #[test]
    fn coreone_adds_fixed_offset() {
        let f = Features {
            z_rise_line: Line::new(1.0, 0.0),
            decompression_line: Line::new(-1000.0, 200.0),
            decompression_end_time: 0.1,
            ..Features::default()
        };
        let mk4 = ProbeAnalysis::default().interpolate_final_z_coordinate(&f);
        let core_one = ProbeAnalysis::new(AnalysisCfg {
            printer: PrinterModel::CoreOne,
            ..AnalysisCfg::default()
        })
        .interpolate_final_z_coordinate(&f);
        assert!((core_one - mk4 - 0.02).abs() < 1e-6);
        // load 100 g at t=0.1, 50 g at t=0.15; z is the mean of both times
        assert!((mk4 - 0.125).abs() < 1e-5);
    }

    #[test]
    fn feed_is_drained_into_window() {
        let mut e = engine(10.0, 0.0);
        let feed = e.feed(8);
        feed.push(1.0, 2.0).unwrap();
        feed.push(3.0, 4.0).unwrap();
        assert_eq!(e.drain_feed(), 2);
        assert_eq!(e.len(), 2);
        assert_eq!(e.window()[1], Record::new(3.0, 4.0));
        assert_eq!(e.drain_feed(), 0);
    }

    #[test]
    fn flag_is_cleared_after_analysis() {
        let mut e = engine(10.0, 0.0);
        let _ = e.analyse();
        assert!(!e.is_analysis_in_progress());
    }
}
