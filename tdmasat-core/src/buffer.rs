//! Node-side storage: the FIFO measurement queue and the bounded value history.

use std::collections::VecDeque;

use crate::sample::DataSample;

/// Unbounded FIFO of samples awaiting transmission.
///
/// Insertion order is temporal order; `pop` always yields the oldest sample.
#[derive(Debug, Clone, Default)]
pub struct SampleQueue {
    samples: VecDeque<DataSample>,
}

impl SampleQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sample behind every queued one.
    pub fn push(&mut self, sample: DataSample) {
        self.samples.push_back(sample);
    }

    /// Removes and returns the oldest sample.
    pub fn pop(&mut self) -> Option<DataSample> {
        self.samples.pop_front()
    }

    /// Returns the oldest sample without removing it.
    pub fn peek(&self) -> Option<&DataSample> {
        self.samples.front()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Iterates oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &DataSample> {
        self.samples.iter()
    }
}

/// Fixed-capacity ring of the most recent raw values.
///
/// Pushing into a full ring evicts the oldest value.
#[derive(Debug, Clone)]
pub struct ValueHistory {
    values: VecDeque<f64>,
    capacity: usize,
}

impl ValueHistory {
    /// Creates an empty ring. A zero capacity is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Records a value, returning the evicted one if the ring was full.
    pub fn push(&mut self, value: f64) -> Option<f64> {
        let evicted = if self.values.len() == self.capacity {
            self.values.pop_front()
        } else {
            None
        };
        self.values.push_back(value);
        evicted
    }

    /// The most recent `count` values (fewer if not available), oldest first.
    pub fn latest(&self, count: usize) -> Vec<f64> {
        let skip = self.values.len().saturating_sub(count);
        self.values.iter().skip(skip).copied().collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
