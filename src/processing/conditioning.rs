// src/processing/conditioning.rs
//! Stateless signal conditioning transforms
//!
//! Every transform is deterministic and returns a vector the same length as its
//! input unless documented otherwise. Degenerate inputs (empty, flat) fall back to
//! neutral constants instead of producing `NaN`.

use crate::config::constants::filters::{EXPONENTIAL_ALPHA, IQR_FENCE_MULTIPLIER};
use crate::utils::stats;

/// Two-stage exponential high-pass then low-pass filter
///
/// This is a smoothing approximation of a bandpass, not a precision filter: both
/// stages use the fixed coefficient [`EXPONENTIAL_ALPHA`] regardless of the
/// requested cutoffs. Downstream quality thresholds are tuned against this exact
/// response, so the coefficients must not be derived from the cutoffs.
#[derive(Debug, Clone)]
pub struct ExponentialBandpass {
    alpha: f64,
    low_hz: f64,
    high_hz: f64,
    previous_input: Option<f64>,
    previous_high: f64,
    previous_low: Option<f64>,
}

impl ExponentialBandpass {
    /// Create a filter for the nominal `low_hz..high_hz` band
    pub fn new(low_hz: f64, high_hz: f64) -> Self {
        Self {
            alpha: EXPONENTIAL_ALPHA,
            low_hz,
            high_hz,
            previous_input: None,
            previous_high: 0.0,
            previous_low: None,
        }
    }

    /// Nominal passband (informational only)
    pub fn band(&self) -> (f64, f64) {
        (self.low_hz, self.high_hz)
    }

    /// Process single sample
    pub fn process_sample(&mut self, input: f64) -> f64 {
        // First sample seeds both the differentiator and the high-pass state
        let (last_input, last_high) = match self.previous_input {
            Some(prev) => (prev, self.previous_high),
            None => (input, input),
        };
        let high = self.alpha * (last_high + input - last_input);
        self.previous_input = Some(input);
        self.previous_high = high;

        let last_low = self.previous_low.unwrap_or(high);
        let low = self.alpha * high + (1.0 - self.alpha) * last_low;
        self.previous_low = Some(low);
        low
    }

    /// Reset filter state
    pub fn reset(&mut self) {
        self.previous_input = None;
        self.previous_high = 0.0;
        self.previous_low = None;
    }
}

/// Remove the DC component and the least-squares linear trend
pub fn detrend(signal: &[f64]) -> Vec<f64> {
    if signal.is_empty() {
        return Vec::new();
    }

    let mean = stats::mean(signal);
    let demeaned: Vec<f64> = signal.iter().map(|&v| v - mean).collect();

    let slope = stats::regression_slope(&demeaned);
    let n = demeaned.len() as f64;
    let sum_x: f64 = (0..demeaned.len()).map(|i| i as f64).sum();
    let sum_y: f64 = demeaned.iter().sum();
    let intercept = (sum_y - slope * sum_x) / n;

    demeaned
        .iter()
        .enumerate()
        .map(|(i, &v)| v - (slope * i as f64 + intercept))
        .collect()
}

/// Run [`ExponentialBandpass`] over a whole slice
///
/// `sample_rate` is accepted for call-site symmetry with the band edges; the fixed
/// coefficient ignores it.
pub fn bandpass_filter(signal: &[f64], low_hz: f64, high_hz: f64, _sample_rate: f64) -> Vec<f64> {
    let mut filter = ExponentialBandpass::new(low_hz, high_hz);
    signal.iter().map(|&x| filter.process_sample(x)).collect()
}

/// Min-max scale into `[0, 1]`; a flat input maps to all `0.5`
pub fn normalize(signal: &[f64]) -> Vec<f64> {
    let (min, max) = signal
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = max - min;

    if signal.is_empty() || range == 0.0 {
        return vec![0.5; signal.len()];
    }
    signal.iter().map(|&v| (v - min) / range).collect()
}

/// Z-score; a zero-variance input maps to all zeros
pub fn standardize(signal: &[f64]) -> Vec<f64> {
    let mean = stats::mean(signal);
    let std = stats::std_dev(signal);

    if std == 0.0 {
        return vec![0.0; signal.len()];
    }
    signal.iter().map(|&v| (v - mean) / std).collect()
}

/// Centered moving average, window truncated at the edges
pub fn moving_average(signal: &[f64], window_size: usize) -> Vec<f64> {
    let half = window_size / 2;
    (0..signal.len())
        .map(|i| {
            let start = i.saturating_sub(half);
            let end = (i + half + 1).min(signal.len());
            stats::mean(&signal[start..end])
        })
        .collect()
}

/// Drop values outside the Tukey fences `[Q1 - 1.5 IQR, Q3 + 1.5 IQR]`
///
/// Order of the surviving values is preserved. Inputs shorter than four values are
/// returned unchanged.
pub fn remove_outliers(values: &[f64]) -> Vec<f64> {
    if values.len() < 4 {
        return values.to_vec();
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let q1 = sorted[sorted.len() / 4];
    let q3 = sorted[sorted.len() * 3 / 4];
    let iqr = q3 - q1;
    let lower = q1 - IQR_FENCE_MULTIPLIER * iqr;
    let upper = q3 + IQR_FENCE_MULTIPLIER * iqr;

    values
        .iter()
        .copied()
        .filter(|&v| v >= lower && v <= upper)
        .collect()
}

/// Linear resampling to `target_len` points
pub fn interpolate(signal: &[f64], target_len: usize) -> Vec<f64> {
    if signal.len() == target_len {
        return signal.to_vec();
    }
    if signal.is_empty() || target_len == 0 {
        return Vec::new();
    }
    if target_len == 1 || signal.len() == 1 {
        return vec![signal[0]; target_len];
    }

    let ratio = (signal.len() - 1) as f64 / (target_len - 1) as f64;
    (0..target_len)
        .map(|i| {
            let position = i as f64 * ratio;
            let lower = position.floor() as usize;
            let upper = position.ceil() as usize;
            if upper >= signal.len() {
                return signal[signal.len() - 1];
            }
            let fraction = position - lower as f64;
            signal[lower] * (1.0 - fraction) + signal[upper] * fraction
        })
        .collect()
}

/// Inter-beat intervals in milliseconds from peak sample indices
pub fn calculate_ibi(peak_indices: &[usize], sample_rate: f64) -> Vec<f64> {
    peak_indices
        .windows(2)
        .map(|pair| (pair[1] - pair[0]) as f64 / sample_rate * 1000.0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detrend_removes_linear_ramp() {
        let ramp: Vec<f64> = (0..50).map(|i| 10.0 + 0.5 * i as f64).collect();
        let out = detrend(&ramp);
        assert_eq!(out.len(), ramp.len());
        assert!(out.iter().all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn test_detrend_degenerate() {
        assert!(detrend(&[]).is_empty());
        assert_eq!(detrend(&[7.0]), vec![0.0]);
    }

    #[test]
    fn test_bandpass_first_samples() {
        let out = bandpass_filter(&[10.0, 12.0], 0.7, 4.0, 30.0);
        // hp0 = 0.1 * (10 + 10 - 10) = 1.0, lp0 = 1.0
        assert!((out[0] - 1.0).abs() < 1e-12);
        // hp1 = 0.1 * (1 + 12 - 10) = 0.3, lp1 = 0.1 * 0.3 + 0.9 * 1.0
        assert!((out[1] - 0.93).abs() < 1e-12);
    }

    #[test]
    fn test_bandpass_streaming_matches_batch() {
        let signal: Vec<f64> = (0..40).map(|i| (i as f64 * 0.3).sin() * 5.0).collect();
        let batch = bandpass_filter(&signal, 0.7, 4.0, 30.0);

        let mut filter = ExponentialBandpass::new(0.7, 4.0);
        let first: Vec<f64> = signal.iter().map(|&x| filter.process_sample(x)).collect();
        filter.reset();
        let second: Vec<f64> = signal.iter().map(|&x| filter.process_sample(x)).collect();

        assert_eq!(batch, first);
        assert_eq!(first, second);
        assert_eq!(filter.band(), (0.7, 4.0));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(&[2.0, 4.0, 6.0]), vec![0.0, 0.5, 1.0]);
        assert_eq!(normalize(&[3.0, 3.0, 3.0]), vec![0.5, 0.5, 0.5]);
        assert!(normalize(&[]).is_empty());
    }

    #[test]
    fn test_standardize() {
        let out = standardize(&[1.0, 3.0]);
        assert_eq!(out, vec![-1.0, 1.0]);
        assert_eq!(standardize(&[5.0, 5.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_moving_average_edges() {
        let out = moving_average(&[1.0, 2.0, 3.0, 4.0], 3);
        assert_eq!(out, vec![1.5, 2.0, 3.0, 3.5]);
    }

    #[test]
    fn test_remove_outliers() {
        let values = [800.0, 810.0, 790.0, 805.0, 2000.0, 795.0];
        let cleaned = remove_outliers(&values);
        assert_eq!(cleaned, vec![800.0, 810.0, 790.0, 805.0, 795.0]);

        let short = [1.0, 100.0, 1000.0];
        assert_eq!(remove_outliers(&short), short.to_vec());
    }

    #[test]
    fn test_interpolate() {
        assert_eq!(interpolate(&[0.0, 10.0], 3), vec![0.0, 5.0, 10.0]);
        assert_eq!(interpolate(&[1.0, 2.0], 2), vec![1.0, 2.0]);
        assert!(interpolate(&[], 4).is_empty());
    }

    #[test]
    fn test_calculate_ibi() {
        assert_eq!(calculate_ibi(&[0, 30, 57], 30.0), vec![1000.0, 900.0]);
        assert!(calculate_ibi(&[5], 30.0).is_empty());
    }
}
