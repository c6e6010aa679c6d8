use std::collections::VecDeque;
use std::time::Duration;

use super::Measurement;

/// Fixed retention window for every host
pub const RETENTION_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// Number of samples that cover `window` when sampling every `interval`.
pub fn capacity_for(window: Duration, interval: Duration) -> usize {
    let interval_ms = interval.as_millis().max(1);
    let capacity = window.as_millis().div_ceil(interval_ms);
    usize::try_from(capacity).unwrap_or(usize::MAX).max(1)
}

/// Bounded, oldest-first measurement history for one host
#[derive(Debug, Clone)]
pub struct HostSeries {
    entries: VecDeque<Measurement>,
    capacity: usize,
}

impl HostSeries {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
        }
    }

    /// Append a sample, returning the evicted oldest one when full
    pub fn push(&mut self, measurement: Measurement) -> Option<Measurement> {
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(measurement);
        evicted
    }

    pub fn latest(&self) -> Option<&Measurement> {
        self.entries.back()
    }

    pub fn to_vec(&self) -> Vec<Measurement> {
        self.entries.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
