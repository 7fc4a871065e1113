// src/processing/peaks.rs
//! Local-maximum peak detection

use super::conditioning::normalize;

/// Detect peaks on the min-max normalized signal
///
/// Index `i` qualifies when its normalized value is strictly greater than both
/// neighbours and than `threshold`, and it lies at least `min_distance` samples
/// after the previously accepted peak. The scan is greedy left to right, so the
/// first candidate in a crowded region wins. Endpoints are never peaks.
pub fn detect_peaks(signal: &[f64], min_distance: usize, threshold: f64) -> Vec<usize> {
    let mut peaks: Vec<usize> = Vec::new();
    if signal.len() < 3 {
        return peaks;
    }

    let normalized = normalize(signal);
    for i in 1..normalized.len() - 1 {
        let value = normalized[i];
        let is_peak = value > normalized[i - 1] && value > normalized[i + 1] && value > threshold;
        if !is_peak {
            continue;
        }
        match peaks.last() {
            Some(&last) if i - last < min_distance => {}
            _ => peaks.push(i),
        }
    }

    peaks
}

/// Mean spacing between consecutive peaks in samples, `None` with fewer than two
pub fn mean_peak_interval(peaks: &[usize]) -> Option<f64> {
    if peaks.len() < 2 {
        return None;
    }
    let (first, last) = (peaks[0], peaks[peaks.len() - 1]);
    Some((last - first) as f64 / (peaks.len() - 1) as f64)
}
