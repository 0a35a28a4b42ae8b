//! Straight lines `y = a·t + b` and least-squares fitting.

use serde::Serialize;

/// Load-line slopes are divided by this before the angle formula so that
/// 45° corresponds to a visually diagonal line on a g-vs-s plot.
pub const ANGLE_SLOPE_NORMALIZATION: f32 = 250.0;

/// `y = a·t + b`. NaN coefficients mark an invalid (underdetermined) line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Line {
    pub a: f32,
    pub b: f32,
}

impl Default for Line {
    fn default() -> Self {
        Self::INVALID
    }
}

impl Line {
    pub const INVALID: Line = Line {
        a: f32::NAN,
        b: f32::NAN,
    };

    pub const fn new(a: f32, b: f32) -> Self {
        Self { a, b }
    }

    pub fn is_valid(&self) -> bool {
        !self.a.is_nan() && !self.b.is_nan()
    }

    /// y at time `t`.
    #[inline]
    pub fn value_at(&self, t: f32) -> f32 {
        self.a * t + self.b
    }

    /// Time at which the line reaches `y`.
    #[inline]
    pub fn time_at(&self, y: f32) -> f32 {
        (y - self.b) / self.a
    }

    /// Time at which both lines have the same value; NaN when they are
    /// parallel or either one is invalid.
    pub fn find_intersection(&self, other: &Line) -> f32 {
        let da = self.a - other.a;
        if da == 0.0 {
            return f32::NAN;
        }
        (other.b - self.b) / da
    }

    /// Signed angle in degrees (-90, 90) from `self` to `other`, measured in
    /// normalized slope space.
    pub fn calculate_angle(&self, other: &Line) -> f32 {
        let a1 = self.a / ANGLE_SLOPE_NORMALIZATION;
        let a2 = other.a / ANGLE_SLOPE_NORMALIZATION;
        ((a2 - a1) / (1.0 + a1 * a2)).atan().to_degrees()
    }
}

/// Least-squares fit kept in f64; converted to a `Line` once the caller is
/// done with residual sums.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Fit {
    pub a: f64,
    pub b: f64,
}

impl Fit {
    /// OLS over `(t, y)` points. `None` when there are fewer than two distinct `t`.
    pub fn least_squares<I>(points: I) -> Option<Fit>
    where
        I: Iterator<Item = (f64, f64)> + Clone,
    {
        let mut n = 0usize;
        let mut sum_t = 0.0f64;
        let mut sum_y = 0.0f64;
        for (t, y) in points.clone() {
            n += 1;
            sum_t += t;
            sum_y += y;
        }
        if n == 0 {
            return None;
        }
        let mean_t = sum_t / n as f64;
        let mean_y = sum_y / n as f64;
        let mut stt = 0.0f64;
        let mut sty = 0.0f64;
        for (t, y) in points {
            let dt = t - mean_t;
            stt += dt * dt;
            sty += dt * (y - mean_y);
        }
        if !stt.is_finite() || stt == 0.0 {
            return None;
        }
        let a = sty / stt;
        Some(Fit {
            a,
            b: mean_y - a * mean_t,
        })
    }

    #[inline]
    pub fn value_at(&self, t: f64) -> f64 {
        self.a * t + self.b
    }
}

impl From<Option<Fit>> for Line {
    fn from(fit: Option<Fit>) -> Self {
        fit.map_or(Line::INVALID, |f| Line::new(f.a as f32, f.b as f32))
    }
}
