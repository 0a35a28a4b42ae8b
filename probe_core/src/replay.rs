//! Recorded-trace playback as a `ProbeSensor`.

use std::time::Duration;

use probe_traits::ProbeSensor;

use crate::window::Record;

/// Yields the samples of a recorded trace in order, then reports exhaustion.
#[derive(Debug, Clone)]
pub struct TraceReplay {
    samples: Vec<Record>,
    next: usize,
}

impl TraceReplay {
    pub fn new(samples: Vec<Record>) -> Self {
        Self { samples, next: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.samples.len().saturating_sub(self.next)
    }
}

impl From<&[probe_config::TraceRow]> for TraceReplay {
    fn from(rows: &[probe_config::TraceRow]) -> Self {
        Self::new(rows.iter().map(Record::from).collect())
    }
}

impl ProbeSensor for TraceReplay {
    fn read(
        &mut self,
        _timeout: Duration,
    ) -> Result<Option<(f32, f32)>, Box<dyn std::error::Error + Send + Sync>> {
        let Some(r) = self.samples.get(self.next) else {
            return Ok(None);
        };
        self.next += 1;
        Ok(Some((r.z, r.load)))
    }
}
