//! Fixed-capacity sample window.
//!
//! Positions are logical: 0 is the oldest stored sample and `len() - 1` the
//! newest, independent of where the ring currently sits in memory. Sample
//! time is implicit (`position * sampling interval`).

use serde::Serialize;
use std::collections::VecDeque;
use std::ops::{Index, IndexMut, RangeInclusive};

/// One probe sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Record {
    /// Extruder Z in millimetres.
    pub z: f32,
    /// Load-cell reading in grams.
    pub load: f32,
}

impl Record {
    pub const fn new(z: f32, load: f32) -> Self {
        Self { z, load }
    }
}

/// Closed interval `[first, last]` of window positions. `last < first` is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SamplesRange {
    pub first: usize,
    pub last: usize,
}

impl SamplesRange {
    pub const EMPTY: SamplesRange = SamplesRange { first: 1, last: 0 };

    pub const fn new(first: usize, last: usize) -> Self {
        Self { first, last }
    }

    /// Range ending at `last`, or empty when `last` could not be computed
    /// (e.g. a subtraction would have gone below position 0).
    pub fn ending_at(first: usize, last: Option<usize>) -> Self {
        last.map_or(Self::EMPTY, |last| Self::new(first, last))
    }

    pub fn size(&self) -> usize {
        if self.last < self.first {
            0
        } else {
            self.last - self.first + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn positions(&self) -> RangeInclusive<usize> {
        self.first..=self.last
    }
}

/// Ring buffer of the most recent samples. Once full, every push evicts the
/// oldest sample.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    buf: VecDeque<Record>,
    capacity: usize,
}

impl SampleWindow {
    /// Allocate storage for `capacity` samples up front.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, record: Record) {
        if self.buf.len() == self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(record);
    }

    /// Logically empty the window; storage is kept.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, pos: usize) -> Option<&Record> {
        self.buf.get(pos)
    }

    /// Position `delta` samples away from `pos`, if it lies inside the window.
    pub fn offset(&self, pos: usize, delta: isize) -> Option<usize> {
        let target = pos.checked_add_signed(delta)?;
        (target < self.buf.len()).then_some(target)
    }

    /// Oldest-to-newest iteration.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.buf.iter()
    }

    /// `(position, record)` pairs for the positions of `range` that exist.
    pub fn range(&self, range: SamplesRange) -> impl Iterator<Item = (usize, &Record)> + Clone {
        range
            .positions()
            .filter_map(move |pos| self.buf.get(pos).map(|r| (pos, r)))
    }
}

impl Index<usize> for SampleWindow {
    type Output = Record;

    fn index(&self, pos: usize) -> &Record {
        &self.buf[pos]
    }
}

impl IndexMut<usize> for SampleWindow {
    fn index_mut(&mut self, pos: usize) -> &mut Record {
        &mut self.buf[pos]
    }
}
