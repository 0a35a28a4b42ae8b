//! Deterministic synthetic probe traces.
//!
//! Models a nozzle moving down at constant speed, dwelling at the lowest
//! point and moving back up, against a bed behaving as a linear spring.
//! The load signal lags the Z position by `load_delay_s` and carries
//! uniform noise from a seeded xorshift generator, so the same parameters
//! always produce the same trace.

use crate::window::Record;

#[derive(Debug, Clone)]
pub struct SyntheticProbe {
    /// Z at which the nozzle first touches the bed (mm).
    pub contact_z: f32,
    /// Travel speed down and up (mm/s).
    pub speed_mm_s: f32,
    /// Depth below contact reached at the lowest point (mm).
    pub depth_mm: f32,
    /// Time held at the lowest point (s).
    pub dwell_s: f32,
    /// Bed stiffness (g/mm).
    pub stiffness_g_mm: f32,
    /// Peak amplitude of uniform load noise (g).
    pub noise_g: f32,
    pub seed: u32,
    pub sampling_interval_s: f32,
    pub load_delay_s: f32,
    /// Free travel recorded before the descent reaches contact (s).
    pub pre_s: f32,
    /// Samples recorded after the nozzle is back at its start height (s).
    pub post_s: f32,
}

impl Default for SyntheticProbe {
    fn default() -> Self {
        Self {
            contact_z: 0.05,
            speed_mm_s: 2.5,
            depth_mm: 0.12,
            dwell_s: 0.06,
            stiffness_g_mm: 9000.0,
            noise_g: 3.0,
            seed: 0x00C0_FFEE,
            sampling_interval_s: 1.0 / 320.0,
            load_delay_s: 0.02,
            pre_s: 0.25,
            post_s: 0.45,
        }
    }
}

/// xorshift32; yields values in `[0, 1)`.
#[derive(Debug, Clone)]
struct Rng(u32);

impl Rng {
    fn new(seed: u32) -> Self {
        Self(if seed == 0 { 1 } else { seed })
    }

    fn next_unit(&mut self) -> f64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        f64::from(x) / 4_294_967_296.0
    }
}

fn round_to(v: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (v * scale).round() / scale
}

impl SyntheticProbe {
    /// Generate the full trace, oldest sample first.
    pub fn samples(&self) -> Vec<Record> {
        let dt = f64::from(self.sampling_interval_s);
        if !(dt.is_finite() && dt > 0.0) {
            return Vec::new();
        }
        let speed = f64::from(self.speed_mm_s);
        let contact = f64::from(self.contact_z);
        let z_min = contact - f64::from(self.depth_mm);
        let z_start = contact + speed * f64::from(self.pre_s);
        let dwell = f64::from(self.dwell_s);
        let t_down = (z_start - z_min) / speed;
        let total = t_down + dwell + t_down + f64::from(self.post_s);
        let n = (total / dt).round();
        if !n.is_finite() || n <= 0.0 {
            return Vec::new();
        }

        let z_at = |t: f64| {
            if t < 0.0 {
                z_start
            } else if t < t_down {
                z_start - speed * t
            } else if t < t_down + dwell {
                z_min
            } else {
                z_min + speed * (t - t_down - dwell)
            }
        };
        let delay = f64::from(self.load_delay_s);
        let stiffness = f64::from(self.stiffness_g_mm);
        let noise = f64::from(self.noise_g);

        let mut rng = Rng::new(self.seed);
        (0..n as usize)
            .map(|i| {
                let t = i as f64 * dt;
                let penetration = (contact - z_at(t - delay)).max(0.0);
                let load = stiffness * penetration + (rng.next_unit() * 2.0 - 1.0) * noise;
                Record::new(round_to(z_at(t), 5) as f32, round_to(load, 3) as f32)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_trace_shape() {
        let s = SyntheticProbe::default().samples();
        assert_eq!(s.len(), 354);
        let min = s.iter().map(|r| r.z).fold(f32::INFINITY, f32::min);
        assert!((min - (-0.07)).abs() < 1e-6);
        assert!(s.iter().any(|r| r.load > 1000.0));
    }

    #[test]
    fn same_seed_same_trace() {
        let p = SyntheticProbe::default();
        assert_eq!(p.samples(), p.samples());
        let other = SyntheticProbe { seed: 7, ..p.clone() };
        assert_ne!(p.samples(), other.samples());
    }

    #[test]
    fn degenerate_interval_yields_nothing() {
        let p = SyntheticProbe {
            sampling_interval_s: 0.0,
            ..SyntheticProbe::default()
        };
        assert!(p.samples().is_empty());
    }
}
