//! Cross-thread sample delivery.
//!
//! `SampleFeed` is the producer half handed out by `ProbeAnalysis::feed`.
//! It shares the engine's analysis-in-progress flag so that samples offered
//! while `analyse` runs are dropped instead of queued.
//!
//! `Sampler` spawns a thread that owns a `ProbeSensor`, reads it at the
//! sampling interval and pushes every reading into a feed. The thread stops
//! when the sensor is exhausted, when the engine side of the feed goes away,
//! or when the `Sampler` is dropped.
use crossbeam_channel as xch;
use probe_traits::ProbeSensor;
use probe_traits::clock::Clock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::error::FeedError;
use crate::window::Record;

/// Producer handle; cheap to clone, safe to move to another thread.
#[derive(Debug, Clone)]
pub struct SampleFeed {
    tx: xch::Sender<Record>,
    in_progress: Arc<AtomicBool>,
}

impl SampleFeed {
    pub(crate) fn new(tx: xch::Sender<Record>, in_progress: Arc<AtomicBool>) -> Self {
        Self { tx, in_progress }
    }

    /// Queue one sample. Never blocks.
    pub fn push(&self, z: f32, load: f32) -> Result<(), FeedError> {
        if self.in_progress.load(Ordering::Acquire) {
            return Err(FeedError::AnalysisInProgress);
        }
        self.tx
            .try_send(Record::new(z, load))
            .map_err(|e| match e {
                xch::TrySendError::Full(_) => FeedError::Full,
                xch::TrySendError::Disconnected(_) => FeedError::Disconnected,
            })
    }
}

/// Counters reported when a sampler thread finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplerStats {
    /// Samples accepted by the feed.
    pub pushed: u64,
    /// Samples dropped (analysis in progress or queue full).
    pub dropped: u64,
    /// Sensor read errors.
    pub errors: u64,
}

#[derive(Debug, Default)]
struct Counters {
    pushed: AtomicU64,
    dropped: AtomicU64,
    errors: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> SamplerStats {
        SamplerStats {
            pushed: self.pushed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

pub struct Sampler {
    /// Shutdown flag for immediate response (atomic for lock-free check)
    shutdown: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    counters: Arc<Counters>,
    join_handle: Option<JoinHandle<()>>,
}

impl Sampler {
    /// Read `sensor` every `interval` (paced by `clock`) and push into `feed`.
    pub fn spawn<S, C>(mut sensor: S, interval: Duration, clock: C, feed: SampleFeed) -> Self
    where
        S: ProbeSensor + Send + 'static,
        C: Clock + Send + Sync + 'static,
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = Arc::clone(&shutdown);
        let finished = Arc::new(AtomicBool::new(false));
        let finished_clone = Arc::clone(&finished);
        let counters = Arc::new(Counters::default());
        let counters_clone = Arc::clone(&counters);
        // Sensor reads may block for up to one interval before giving up.
        let read_timeout = interval.max(Duration::from_millis(1));

        let join_handle = std::thread::spawn(move || {
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("Sampler thread received shutdown signal");
                    break;
                }

                match sensor.read(read_timeout) {
                    Ok(Some((z, load))) => match feed.push(z, load) {
                        Ok(()) => {
                            counters_clone.pushed.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(FeedError::Disconnected) => {
                            tracing::debug!("Sampler consumer disconnected, exiting thread");
                            break;
                        }
                        Err(e) => {
                            tracing::trace!(%e, "sample dropped");
                            counters_clone.dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    },
                    Ok(None) => {
                        tracing::debug!("Sensor exhausted, sampler exiting");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "sensor read failed");
                        counters_clone.errors.fetch_add(1, Ordering::Relaxed);
                    }
                }

                if shutdown_clone.load(Ordering::Relaxed) {
                    break;
                }
                clock.sleep(interval);
            }
            finished_clone.store(true, Ordering::Release);
            tracing::trace!("Sampler thread exiting cleanly");
        });

        Self {
            shutdown,
            finished,
            counters,
            join_handle: Some(join_handle),
        }
    }

    /// True once the thread has left its loop.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> SamplerStats {
        self.counters.snapshot()
    }

    /// Wait for the thread to stop on its own (sensor exhausted or consumer
    /// gone) and return the final counters.
    pub fn join(mut self) -> SamplerStats {
        self.wait();
        self.counters.snapshot()
    }

    fn wait(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => {
                    tracing::trace!("Sampler thread joined successfully");
                }
                Err(e) => {
                    tracing::warn!(?e, "Sampler thread panicked");
                }
            }
        }
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.wait();
    }
}

impl std::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler")
            .field("finished", &self.is_finished())
            .field("stats", &self.stats())
            .finish()
    }
}
