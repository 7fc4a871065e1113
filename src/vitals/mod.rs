// src/vitals/mod.rs
//! Vital-sign extractors over multi-channel PPG traces
//!
//! Every extractor is a pure function of a [`PpgSignal`] snapshot and the sample
//! rate. Below its minimum sample count an extractor returns a zero-valued,
//! zero-confidence measurement carrying a [`SignalFault`](crate::error::SignalFault);
//! it never fails.

pub mod blood_pressure;
pub mod heart_rate;
pub mod hrv;
pub mod respiratory;
pub mod spo2;

pub use blood_pressure::*;
pub use heart_rate::*;
pub use hrv::*;
pub use respiratory::*;
pub use spo2::*;

use crate::utils::time::millis_to_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Parallel red/green/blue intensity traces with capture timestamps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PpgSignal {
    pub red: Vec<f64>,
    pub green: Vec<f64>,
    pub blue: Vec<f64>,
    /// Epoch milliseconds, one per sample
    pub timestamps: Vec<i64>,
}

impl PpgSignal {
    /// Build from pre-split channels
    pub fn new(red: Vec<f64>, green: Vec<f64>, blue: Vec<f64>, timestamps: Vec<i64>) -> Self {
        Self { red, green, blue, timestamps }
    }

    /// Green-only trace, red and blue mirrored from green
    pub fn from_green(green: Vec<f64>, start_millis: i64, sample_rate: f64) -> Self {
        let period_ms = 1000.0 / sample_rate;
        let timestamps = (0..green.len())
            .map(|i| start_millis + (i as f64 * period_ms).round() as i64)
            .collect();
        Self {
            red: green.clone(),
            blue: green.clone(),
            green,
            timestamps,
        }
    }

    /// Sample count of the green channel
    pub fn len(&self) -> usize {
        self.green.len()
    }

    pub fn is_empty(&self) -> bool {
        self.green.is_empty()
    }

    /// Copy of samples `start..end` on every channel, clamped to each channel's length
    pub fn segment(&self, start: usize, end: usize) -> Self {
        fn slice<T: Clone>(values: &[T], start: usize, end: usize) -> Vec<T> {
            let end = end.min(values.len());
            let start = start.min(end);
            values[start..end].to_vec()
        }
        Self {
            red: slice(&self.red, start, end),
            green: slice(&self.green, start, end),
            blue: slice(&self.blue, start, end),
            timestamps: slice(&self.timestamps, start, end),
        }
    }

    /// Last `count` samples
    pub fn tail(&self, count: usize) -> Self {
        let start = self.len().saturating_sub(count);
        self.segment(start, self.len())
    }

    /// Time of the newest sample, or the Unix epoch for an empty trace
    pub fn capture_time(&self) -> DateTime<Utc> {
        self.timestamps
            .last()
            .map(|&ms| millis_to_datetime(ms))
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}

/// Round and clamp a 0-100 score into a `u8` confidence
pub(crate) fn confidence_score(value: f64) -> u8 {
    value.clamp(0.0, 100.0).round() as u8
}

/// Round a non-negative physiological value
pub(crate) fn rounded(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.round() as u32
    } else {
        0
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_and_tail() {
        let signal = PpgSignal::from_green((0..10).map(|i| i as f64).collect(), 0, 10.0);
        assert_eq!(signal.len(), 10);
        assert_eq!(signal.timestamps[3], 300);

        let tail = signal.tail(4);
        assert_eq!(tail.green, vec![6.0, 7.0, 8.0, 9.0]);
        assert_eq!(tail.timestamps.len(), 4);

        let clipped = signal.segment(8, 20);
        assert_eq!(clipped.len(), 2);
    }

    #[test]
    fn test_capture_time() {
        let signal = PpgSignal::from_green(vec![1.0, 2.0], 5_000, 1.0);
        assert_eq!(signal.capture_time().timestamp_millis(), 6_000);
        assert_eq!(PpgSignal::default().capture_time().timestamp(), 0);
    }

    #[test]
    fn test_rounding_helpers() {
        assert_eq!(confidence_score(130.0), 100);
        assert_eq!(confidence_score(-5.0), 0);
        assert_eq!(confidence_score(49.5), 50);
        assert_eq!(rounded(71.6), 72);
        assert_eq!(rounded(f64::NAN), 0);
    }
}
