pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Source of probe samples: extruder Z paired with the load-cell reading.
pub trait ProbeSensor {
    /// Read the next `(z_mm, load_g)` pair.
    ///
    /// `Ok(None)` means the source is exhausted (the probing move is over or a
    /// recorded trace ran out); callers stop polling.
    fn read(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<Option<(f32, f32)>, Box<dyn std::error::Error + Send + Sync>>;
}
