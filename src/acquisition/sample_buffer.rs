// src/acquisition/sample_buffer.rs
//! Bounded rolling buffer of RGB samples

use super::roi::RgbColor;
use crate::vitals::PpgSignal;
use std::collections::VecDeque;

/// Rolling window of parallel colour traces
///
/// The four sequences always have equal length. Pushing past capacity evicts
/// the oldest sample from every sequence.
#[derive(Debug, Clone)]
pub struct PpgSampleBuffer {
    red: VecDeque<f64>,
    green: VecDeque<f64>,
    blue: VecDeque<f64>,
    timestamps: VecDeque<i64>,
    capacity: usize,
}

impl PpgSampleBuffer {
    /// Create an empty buffer holding at most `capacity` samples
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            red: VecDeque::with_capacity(capacity + 1),
            green: VecDeque::with_capacity(capacity + 1),
            blue: VecDeque::with_capacity(capacity + 1),
            timestamps: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append one sample; returns `true` if the oldest sample was evicted
    pub fn push(&mut self, color: RgbColor, timestamp_millis: i64) -> bool {
        self.red.push_back(color.red);
        self.green.push_back(color.green);
        self.blue.push_back(color.blue);
        self.timestamps.push_back(timestamp_millis);

        if self.timestamps.len() > self.capacity {
            self.red.pop_front();
            self.green.pop_front();
            self.blue.pop_front();
            self.timestamps.pop_front();
            return true;
        }
        false
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.red.clear();
        self.green.clear();
        self.blue.clear();
        self.timestamps.clear();
    }

    /// Copy of the buffered traces, oldest first
    pub fn snapshot(&self) -> PpgSignal {
        PpgSignal::new(
            self.red.iter().copied().collect(),
            self.green.iter().copied().collect(),
            self.blue.iter().copied().collect(),
            self.timestamps.iter().copied().collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(level: f64) -> RgbColor {
        RgbColor { red: level, green: level, blue: level }
    }

    #[test]
    fn test_push_and_snapshot() {
        let mut buffer = PpgSampleBuffer::new(4);
        assert!(buffer.is_empty());

        assert!(!buffer.push(RgbColor { red: 1.0, green: 2.0, blue: 3.0 }, 10));
        let signal = buffer.snapshot();
        assert_eq!(signal.red, vec![1.0]);
        assert_eq!(signal.green, vec![2.0]);
        assert_eq!(signal.blue, vec![3.0]);
        assert_eq!(signal.timestamps, vec![10]);
    }

    #[test]
    fn test_fifo_eviction() {
        let mut buffer = PpgSampleBuffer::new(3);
        for i in 0..3 {
            assert!(!buffer.push(gray(i as f64), i));
        }
        assert!(buffer.push(gray(3.0), 3));
        assert!(buffer.push(gray(4.0), 4));

        let signal = buffer.snapshot();
        assert_eq!(buffer.len(), 3);
        assert_eq!(signal.green, vec![2.0, 3.0, 4.0]);
        assert_eq!(signal.timestamps, vec![2, 3, 4]);
    }

    #[test]
    fn test_clear() {
        let mut buffer = PpgSampleBuffer::new(3);
        buffer.push(gray(1.0), 1);
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 3);
    }
}
