//! Bounded rolling history of sampled metric values.
//!
//! Each metric gets its own fixed-capacity [`RingBuffer`]. Once a buffer is
//! full, every new value overwrites the oldest one, so memory use stays flat
//! no matter how long a run lasts.

use crate::error::{ProcwatchError, Result};
use crate::metrics::{Metric, Sample};
use chrono::{DateTime, Utc};

/// Default number of values retained per metric.
pub const DEFAULT_CAPACITY: usize = 100;

/// A fixed-capacity circular buffer.
///
/// Storage is allocated once up front; `head` is the slot the next value is
/// written to and wraps around at `capacity`.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    slots: Vec<T>,
    head: usize,
    capacity: usize,
}

impl<T: Copy> RingBuffer<T> {
    /// Creates an empty buffer. A capacity of 0 is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            head: 0,
            capacity,
        }
    }

    /// Appends a value, overwriting the oldest one when full.
    pub fn push(&mut self, value: T) {
        if self.slots.len() < self.capacity {
            self.slots.push(value);
        } else {
            self.slots[self.head] = value;
        }
        self.head = (self.head + 1) % self.capacity;
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterates from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let (newer, older) = self.slots.split_at(self.head.min(self.slots.len()));
        older.iter().chain(newer.iter())
    }

    /// Iterates over the newest `window` values, oldest first.
    ///
    /// A window of 0 or one larger than the buffer covers every value.
    pub fn trailing(&self, window: usize) -> impl Iterator<Item = &T> + '_ {
        let len = self.len();
        let window = if window == 0 { len } else { window.min(len) };
        self.iter().skip(len - window)
    }

    /// Returns the contents in temporal order.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().copied().collect()
    }
}

/// Rolling per-metric history for one monitoring session.
#[derive(Debug, Clone)]
pub struct History {
    buffers: Vec<RingBuffer<f64>>,
    /// Values recorded per metric over the whole run.
    recorded: Vec<u64>,
    timestamps: RingBuffer<DateTime<Utc>>,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffers: Metric::ALL.iter().map(|_| RingBuffer::new(capacity)).collect(),
            recorded: vec![0; Metric::ALL.len()],
            timestamps: RingBuffer::new(capacity),
        }
    }

    fn buffer(&self, metric: Metric) -> &RingBuffer<f64> {
        &self.buffers[metric as usize]
    }

    /// Appends a single value to one metric's buffer.
    pub fn record(&mut self, metric: Metric, value: f64) {
        self.buffers[metric as usize].push(value);
        self.recorded[metric as usize] += 1;
    }

    /// Records every metric of a sample along with its timestamp.
    pub fn record_sample(&mut self, sample: &Sample) {
        for metric in Metric::ALL {
            self.record(metric, metric.value(sample));
        }
        self.timestamps.push(sample.timestamp);
    }

    /// Current contents of a metric's buffer, oldest first.
    pub fn snapshot(&self, metric: Metric) -> Vec<f64> {
        self.buffer(metric).to_vec()
    }

    /// Timestamps of samples added through [`History::record_sample`].
    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.timestamps.to_vec()
    }

    /// Mean over the newest `window` values (0 means the whole buffer).
    pub fn average(&self, metric: Metric, window: usize) -> Result<f64> {
        let buffer = self.buffer(metric);
        if buffer.is_empty() {
            return Err(ProcwatchError::EmptyHistory);
        }
        let (sum, count) = buffer
            .trailing(window)
            .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
        Ok(sum / count as f64)
    }

    /// Largest retained value.
    pub fn peak(&self, metric: Metric) -> Result<f64> {
        self.buffer(metric)
            .iter()
            .copied()
            .reduce(f64::max)
            .ok_or(ProcwatchError::EmptyHistory)
    }

    /// Number of retained values strictly above `limit`.
    pub fn exceeding(&self, metric: Metric, limit: f64) -> usize {
        self.buffer(metric).iter().filter(|v| **v > limit).count()
    }

    /// Number of samples currently retained, counted on the fullest metric.
    pub fn len(&self) -> usize {
        self.buffers.iter().map(RingBuffer::len).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.iter().all(RingBuffer::is_empty)
    }

    pub fn capacity(&self) -> usize {
        self.timestamps.capacity()
    }

    /// Number of samples recorded over the whole run, including evicted ones.
    pub fn total_recorded(&self) -> u64 {
        self.recorded.iter().copied().max().unwrap_or(0)
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
