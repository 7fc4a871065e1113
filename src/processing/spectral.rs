// src/processing/spectral.rs
//! Frequency-domain analysis: magnitude spectrum, dominant frequency, Welch PSD

use crate::config::constants::quality::DOMINANT_CONFIDENCE_SCALE;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Strongest in-band spectral component
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DominantFrequency {
    /// Frequency of the strongest bin in Hz, `0.0` when no bin falls in band
    pub frequency_hz: f64,
    /// Unnormalized magnitude of that bin
    pub magnitude: f64,
    /// Peak prominence on a 0-100 scale
    pub confidence: f64,
}

/// Magnitude spectrum for bins `0..ceil(n/2)`
///
/// Scaling matches the direct DFT sum (no `1/n` normalization), so thresholds
/// tuned against a direct O(n²) transform stay valid.
pub fn fft(signal: &[f64]) -> Vec<f64> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }

    let mut buffer: Vec<Complex<f64>> = signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
    let mut planner = FftPlanner::<f64>::new();
    planner.plan_fft_forward(n).process(&mut buffer);

    buffer.iter().take(n.div_ceil(2)).map(|c| c.norm()).collect()
}

/// Frequency in Hz of spectrum bin `bin` for an `n`-sample window
pub fn bin_frequency(bin: usize, sample_rate: f64, n: usize) -> f64 {
    bin as f64 * sample_rate / n as f64
}

/// Strongest bin within `[min_hz, max_hz]`
///
/// Confidence is `min(100, peak / mean * 10)` where the mean runs over every bin,
/// not just the band. Ties keep the lowest frequency.
pub fn find_dominant_frequency(
    signal: &[f64],
    sample_rate: f64,
    min_hz: f64,
    max_hz: f64,
) -> DominantFrequency {
    let magnitudes = fft(signal);
    let n = signal.len();

    let mut best = DominantFrequency {
        frequency_hz: 0.0,
        magnitude: 0.0,
        confidence: 0.0,
    };
    for (bin, &magnitude) in magnitudes.iter().enumerate() {
        let frequency = bin_frequency(bin, sample_rate, n);
        if frequency >= min_hz && frequency <= max_hz && magnitude > best.magnitude {
            best.magnitude = magnitude;
            best.frequency_hz = frequency;
        }
    }

    let mean_magnitude = crate::utils::stats::mean(&magnitudes);
    if mean_magnitude > 0.0 {
        best.confidence = (best.magnitude / mean_magnitude * DOMINANT_CONFIDENCE_SCALE).min(100.0);
    }
    best
}

/// Hann taper of length `size`
pub fn hann_window(size: usize) -> Vec<f64> {
    if size < 2 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / (size - 1) as f64).cos()))
        .collect()
}

/// Welch estimate: Hann-tapered overlapping segments, magnitude spectra averaged
///
/// Returns an empty vector when the signal is shorter than one window or the
/// overlap leaves no forward step.
pub fn welch_psd(signal: &[f64], window_size: usize, overlap: usize) -> Vec<f64> {
    if window_size < 2 || overlap >= window_size || signal.len() < window_size {
        return Vec::new();
    }
    let step = window_size - overlap;
    let taper = hann_window(window_size);

    let mut accumulated = vec![0.0; window_size.div_ceil(2)];
    let mut segments = 0usize;
    let mut start = 0;
    while start + window_size <= signal.len() {
        let windowed: Vec<f64> = signal[start..start + window_size]
            .iter()
            .zip(&taper)
            .map(|(x, w)| x * w)
            .collect();
        for (acc, magnitude) in accumulated.iter_mut().zip(fft(&windowed)) {
            *acc += magnitude;
        }
        segments += 1;
        start += step;
    }

    accumulated.iter().map(|&sum| sum / segments as f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn direct_dft(signal: &[f64]) -> Vec<f64> {
        let n = signal.len();
        (0..n.div_ceil(2))
            .map(|k| {
                let (mut re, mut im) = (0.0, 0.0);
                for (t, &x) in signal.iter().enumerate() {
                    let angle = 2.0 * PI * (k * t) as f64 / n as f64;
                    re += x * angle.cos();
                    im -= x * angle.sin();
                }
                (re * re + im * im).sqrt()
            })
            .collect()
    }

    #[test]
    fn test_fft_matches_direct_transform() {
        for n in [7usize, 16, 45, 100] {
            let signal: Vec<f64> = (0..n)
                .map(|i| (i as f64 * 0.7).sin() + 0.3 * (i as f64 * 2.1).cos())
                .collect();
            let fast = fft(&signal);
            let slow = direct_dft(&signal);
            assert_eq!(fast.len(), slow.len());
            for (a, b) in fast.iter().zip(&slow) {
                assert!((a - b).abs() < 1e-8, "n={} {} vs {}", n, a, b);
            }
        }
    }

    #[test]
    fn test_dominant_frequency() {
        // 1.2 Hz sine sampled at 30 Hz for 10 s lands exactly on bin 12
        let signal: Vec<f64> = (0..300)
            .map(|i| (2.0 * PI * 1.2 * i as f64 / 30.0).sin())
            .collect();
        let dominant = find_dominant_frequency(&signal, 30.0, 0.7, 4.0);
        assert!((dominant.frequency_hz - 1.2).abs() < 1e-9);
        assert_eq!(dominant.confidence, 100.0);
    }

    #[test]
    fn test_dominant_frequency_degenerate() {
        let flat = vec![0.0; 64];
        let dominant = find_dominant_frequency(&flat, 30.0, 0.7, 4.0);
        assert_eq!(dominant.frequency_hz, 0.0);
        assert_eq!(dominant.confidence, 0.0);

        let empty = find_dominant_frequency(&[], 30.0, 0.7, 4.0);
        assert_eq!(empty.magnitude, 0.0);
    }

    #[test]
    fn test_hann_window() {
        let w = hann_window(5);
        assert!(w[0].abs() < 1e-12);
        assert!((w[2] - 1.0).abs() < 1e-12);
        assert!(w[4].abs() < 1e-12);
    }

    #[test]
    fn test_welch_psd() {
        let signal: Vec<f64> = (0..512)
            .map(|i| (2.0 * PI * 8.0 * i as f64 / 128.0).sin())
            .collect();
        let psd = welch_psd(&signal, 128, 64);
        assert_eq!(psd.len(), 64);
        let peak_bin = psd
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak_bin, 8);

        assert!(welch_psd(&signal[..100], 128, 64).is_empty());
        assert!(welch_psd(&signal, 128, 128).is_empty());
    }
}
