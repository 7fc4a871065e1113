// src/vitals/heart_rate.rs
//! Heart rate from the green channel, plus history-based averaging and trend

use super::{confidence_score, rounded, PpgSignal};
use crate::config::constants::{filters, signal, vitals};
use crate::error::SignalFault;
use crate::processing::{
    assess_signal_quality, bandpass_filter, calculate_ibi, detect_peaks, detrend,
    find_dominant_frequency, mean_peak_interval, moving_average, normalize, SignalQuality,
};
use crate::utils::stats;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One heart-rate estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartRateMeasurement {
    /// Beats per minute, `0` when no plausible rate was found
    pub heart_rate_bpm: u32,
    pub confidence: u8,
    pub timestamp: DateTime<Utc>,
    /// Tail of the conditioned trace used for the estimate
    pub waveform: Option<Vec<f64>>,
    pub fault: Option<SignalFault>,
}

impl HeartRateMeasurement {
    fn empty(timestamp: DateTime<Utc>, fault: SignalFault) -> Self {
        Self {
            heart_rate_bpm: 0,
            confidence: 0,
            timestamp,
            waveform: None,
            fault: Some(fault),
        }
    }
}

/// Peak-domain view of the green channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedSignal {
    /// Conditioned, normalized trace
    pub filtered: Vec<f64>,
    /// Normalized value at each detected peak
    pub peak_values: Vec<f64>,
    pub peak_indices: Vec<usize>,
    /// Rate from mean peak spacing, `0` with fewer than two peaks
    pub heart_rate_bpm: u32,
    pub quality: SignalQuality,
}

/// Direction of recent heart-rate history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeartRateTrend {
    Increasing,
    Stable,
    Decreasing,
}

/// Beat-to-beat irregularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrregularityReport {
    pub irregular: bool,
    /// Inter-beat interval coefficient of variation, percent
    pub variability: u32,
}

/// Spectral heart-rate estimate
///
/// Pipeline: detrend, cardiac bandpass, normalize, 3-point smoothing, then the
/// dominant frequency within 0.7-4.0 Hz. Rates outside 40-200 BPM are reported as
/// zero with zero confidence.
pub fn detect_heart_rate(ppg: &PpgSignal, sample_rate: f64) -> HeartRateMeasurement {
    let timestamp = ppg.capture_time();
    if ppg.green.len() < vitals::HEART_RATE_MIN_SAMPLES {
        debug!(
            samples = ppg.green.len(),
            required = vitals::HEART_RATE_MIN_SAMPLES,
            "heart rate: insufficient samples"
        );
        return HeartRateMeasurement::empty(
            timestamp,
            SignalFault::insufficient(vitals::HEART_RATE_MIN_SAMPLES, ppg.green.len()),
        );
    }

    let conditioned = detrend(&ppg.green);
    let conditioned = bandpass_filter(
        &conditioned,
        filters::CARDIAC_BAND_LOW_HZ,
        filters::CARDIAC_BAND_HIGH_HZ,
        sample_rate,
    );
    let conditioned = normalize(&conditioned);
    let conditioned = moving_average(&conditioned, filters::HEART_RATE_SMOOTHING_WINDOW);

    let dominant = find_dominant_frequency(
        &conditioned,
        sample_rate,
        filters::CARDIAC_BAND_LOW_HZ,
        filters::CARDIAC_BAND_HIGH_HZ,
    );
    let bpm = (dominant.frequency_hz * 60.0).round();
    let valid = (vitals::HEART_RATE_MIN_BPM..=vitals::HEART_RATE_MAX_BPM).contains(&bpm);

    let snippet_start = conditioned.len().saturating_sub(signal::WAVEFORM_SNIPPET_SAMPLES);
    let waveform = Some(conditioned[snippet_start..].to_vec());

    if !valid {
        debug!(bpm, "heart rate outside plausible range");
        return HeartRateMeasurement {
            waveform,
            ..HeartRateMeasurement::empty(timestamp, SignalFault::OutOfRange)
        };
    }

    HeartRateMeasurement {
        heart_rate_bpm: rounded(bpm),
        confidence: confidence_score(dominant.confidence),
        timestamp,
        waveform,
        fault: None,
    }
}

/// Peak-based processing used for HRV and quality monitoring
pub fn process_signal_continuous(ppg: &PpgSignal, sample_rate: f64) -> ProcessedSignal {
    if ppg.green.len() < vitals::HEART_RATE_MIN_SAMPLES {
        return ProcessedSignal {
            filtered: Vec::new(),
            peak_values: Vec::new(),
            peak_indices: Vec::new(),
            heart_rate_bpm: 0,
            quality: SignalQuality::insufficient(),
        };
    }

    let detrended = detrend(&ppg.green);
    let filtered = bandpass_filter(
        &detrended,
        filters::CARDIAC_BAND_LOW_HZ,
        filters::CARDIAC_BAND_HIGH_HZ,
        sample_rate,
    );
    let normalized = normalize(&filtered);

    let min_distance = (sample_rate * vitals::PEAK_MIN_SPACING_SECONDS).floor() as usize;
    let peak_indices = detect_peaks(&normalized, min_distance, vitals::PEAK_THRESHOLD);

    let heart_rate_bpm = match mean_peak_interval(&peak_indices) {
        Some(interval) if interval > 0.0 => rounded(sample_rate / interval * 60.0),
        _ => 0,
    };

    let quality = assess_signal_quality(&normalized);
    let peak_values = peak_indices.iter().map(|&i| normalized[i]).collect();

    ProcessedSignal {
        filtered: normalized,
        peak_values,
        peak_indices,
        heart_rate_bpm,
        quality,
    }
}

/// Confidence- and recency-weighted mean over measurements newer than `window`
///
/// The k-th measurement inside the window (in slice order) carries weight
/// `confidence / 100 * k`.
pub fn calculate_average_heart_rate(
    measurements: &[HeartRateMeasurement],
    window: Duration,
    now: DateTime<Utc>,
) -> u32 {
    let (weighted_sum, total_weight) = measurements
        .iter()
        .filter(|m| now - m.timestamp < window)
        .enumerate()
        .fold((0.0, 0.0), |(sum, total), (index, m)| {
            let weight = f64::from(m.confidence) / 100.0 * (index + 1) as f64;
            (sum + f64::from(m.heart_rate_bpm) * weight, total + weight)
        });

    if total_weight > 0.0 {
        rounded(weighted_sum / total_weight)
    } else {
        0
    }
}

/// Flag irregular rhythm when inter-beat interval CV exceeds 20 %
pub fn detect_irregular_heartbeat(peak_indices: &[usize], sample_rate: f64) -> IrregularityReport {
    if peak_indices.len() < vitals::IRREGULAR_MIN_PEAKS {
        return IrregularityReport {
            irregular: false,
            variability: 0,
        };
    }

    let intervals = calculate_ibi(peak_indices, sample_rate);
    let mean = stats::mean(&intervals);
    let cv_percent = if mean > 0.0 {
        stats::std_dev(&intervals) / mean * 100.0
    } else {
        0.0
    };

    IrregularityReport {
        irregular: cv_percent > vitals::IRREGULAR_CV_PERCENT,
        variability: rounded(cv_percent),
    }
}

/// Linear-regression trend of heart rate over measurements newer than `window`
pub fn estimate_heart_rate_trend(
    measurements: &[HeartRateMeasurement],
    window: Duration,
    now: DateTime<Utc>,
) -> HeartRateTrend {
    let mut recent: Vec<&HeartRateMeasurement> = measurements
        .iter()
        .filter(|m| now - m.timestamp < window)
        .collect();
    if recent.len() < vitals::HEART_RATE_TREND_MIN_MEASUREMENTS {
        return HeartRateTrend::Stable;
    }
    recent.sort_by_key(|m| m.timestamp);

    let rates: Vec<f64> = recent.iter().map(|m| f64::from(m.heart_rate_bpm)).collect();
    let slope = stats::regression_slope(&rates);

    if slope > vitals::TREND_SLOPE_BPM {
        HeartRateTrend::Increasing
    } else if slope < -vitals::TREND_SLOPE_BPM {
        HeartRateTrend::Decreasing
    } else {
        HeartRateTrend::Stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vitals::test_signals::pulse_signal;
    use chrono::TimeZone;

    fn measurement(bpm: u32, confidence: u8, secs: i64) -> HeartRateMeasurement {
        HeartRateMeasurement {
            heart_rate_bpm: bpm,
            confidence,
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
            waveform: None,
            fault: None,
        }
    }

    #[test]
    fn test_detect_heart_rate_72_bpm() {
        let ppg = pulse_signal(72.0, 10.0, 30.0);
        let hr = detect_heart_rate(&ppg, 30.0);
        assert_eq!(hr.heart_rate_bpm, 72);
        assert!(hr.confidence > 0);
        assert!(hr.fault.is_none());
        assert_eq!(hr.waveform.as_ref().map(Vec::len), Some(300));
        assert_eq!(hr.timestamp, ppg.capture_time());
    }

    #[test]
    fn test_detect_heart_rate_insufficient() {
        let ppg = pulse_signal(72.0, 1.5, 30.0);
        let hr = detect_heart_rate(&ppg, 30.0);
        assert_eq!(hr.heart_rate_bpm, 0);
        assert_eq!(hr.confidence, 0);
        assert_eq!(hr.fault, Some(SignalFault::insufficient(60, 45)));
    }

    #[test]
    fn test_process_signal_continuous() {
        let ppg = pulse_signal(72.0, 10.0, 30.0);
        let processed = process_signal_continuous(&ppg, 30.0);
        assert!(processed.peak_indices.len() >= 10);
        assert!((70..=74).contains(&processed.heart_rate_bpm));
        assert_eq!(processed.filtered.len(), ppg.len());
        assert_eq!(processed.peak_values.len(), processed.peak_indices.len());

        let short = process_signal_continuous(&pulse_signal(72.0, 1.0, 30.0), 30.0);
        assert_eq!(short.quality, SignalQuality::insufficient());
    }

    #[test]
    fn test_average_heart_rate_weights_recent() {
        let now = Utc.timestamp_opt(100, 0).unwrap();
        let history = vec![
            measurement(200, 100, 10), // outside the window
            measurement(60, 100, 80),
            measurement(90, 100, 90),
        ];
        // weights 1 and 2 -> (60 + 180) / 3
        assert_eq!(calculate_average_heart_rate(&history, Duration::seconds(30), now), 80);
        assert_eq!(calculate_average_heart_rate(&[], Duration::seconds(30), now), 0);

        // Exactly window-old measurements are excluded
        let edge = vec![measurement(70, 100, 70)];
        assert_eq!(calculate_average_heart_rate(&edge, Duration::seconds(30), now), 0);
    }

    #[test]
    fn test_irregular_heartbeat() {
        let regular = [0, 30, 60, 90, 120, 150];
        let report = detect_irregular_heartbeat(&regular, 30.0);
        assert!(!report.irregular);
        assert_eq!(report.variability, 0);

        let irregular = [0, 15, 60, 70, 120, 130];
        assert!(detect_irregular_heartbeat(&irregular, 30.0).irregular);

        assert!(!detect_irregular_heartbeat(&[0, 30, 60, 90], 30.0).irregular);
    }

    #[test]
    fn test_heart_rate_trend() {
        let now = Utc.timestamp_opt(100, 0).unwrap();
        let rising = vec![measurement(70, 90, 95), measurement(60, 90, 50), measurement(65, 90, 70)];
        assert_eq!(
            estimate_heart_rate_trend(&rising, Duration::seconds(60), now),
            HeartRateTrend::Increasing
        );

        let falling = vec![measurement(80, 90, 50), measurement(70, 90, 70), measurement(60, 90, 95)];
        assert_eq!(
            estimate_heart_rate_trend(&falling, Duration::seconds(60), now),
            HeartRateTrend::Decreasing
        );

        let stale = vec![measurement(60, 90, 1), measurement(90, 90, 2), measurement(120, 90, 3)];
        assert_eq!(
            estimate_heart_rate_trend(&stale, Duration::seconds(60), now),
            HeartRateTrend::Stable
        );
    }
}
