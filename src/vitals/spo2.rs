// src/vitals/spo2.rs
//! Blood-oxygen saturation from the red/blue ratio of ratios

use super::{confidence_score, rounded, PpgSignal};
use crate::config::constants::{filters, vitals};
use crate::error::SignalFault;
use crate::processing::{bandpass_filter, detrend, normalize};
use crate::utils::stats;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One SpO2 estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spo2Measurement {
    /// Saturation percent, 90-100, or `0` when unavailable
    pub spo2: u32,
    pub confidence: u8,
    pub timestamp: DateTime<Utc>,
    pub fault: Option<SignalFault>,
}

/// Direction of saturation across the last three segments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Spo2Trend {
    Stable,
    Increasing,
    Decreasing,
}

/// Estimate plus short-term trend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spo2TrendMeasurement {
    #[serde(flatten)]
    pub measurement: Spo2Measurement,
    pub trend: Spo2Trend,
}

/// Saturation severity band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Spo2Level {
    Normal,
    Mild,
    Moderate,
    Severe,
}

/// Severity band with guidance text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spo2Assessment {
    pub level: Spo2Level,
    pub description: String,
    pub action: String,
}

fn pulsatile_amplitude(channel: &[f64], sample_rate: f64) -> f64 {
    let conditioned = detrend(channel);
    let conditioned = bandpass_filter(
        &conditioned,
        filters::CARDIAC_BAND_LOW_HZ,
        filters::CARDIAC_BAND_HIGH_HZ,
        sample_rate,
    );
    stats::std_dev(&normalize(&conditioned))
}

/// Ratio-of-ratios SpO2: `110 - 25 R`, clamped to 90-100
///
/// AC is the standard deviation of the conditioned channel, DC the mean of the
/// raw channel. Confidence falls off linearly as R moves away from 0.8.
pub fn estimate_spo2(ppg: &PpgSignal, sample_rate: f64) -> Spo2Measurement {
    let timestamp = ppg.capture_time();
    let available = ppg.red.len().min(ppg.blue.len());
    let empty = |fault| Spo2Measurement {
        spo2: 0,
        confidence: 0,
        timestamp,
        fault: Some(fault),
    };

    if available < vitals::SPO2_MIN_SAMPLES {
        debug!(samples = available, required = vitals::SPO2_MIN_SAMPLES, "spo2: insufficient samples");
        return empty(SignalFault::insufficient(vitals::SPO2_MIN_SAMPLES, available));
    }

    let red_ac = pulsatile_amplitude(&ppg.red, sample_rate);
    let blue_ac = pulsatile_amplitude(&ppg.blue, sample_rate);
    let red_dc = stats::mean(&ppg.red);
    let blue_dc = stats::mean(&ppg.blue);

    if red_dc == 0.0 || blue_dc == 0.0 || blue_ac == 0.0 {
        return empty(SignalFault::DegenerateInput);
    }

    let ratio = (red_ac / red_dc) / (blue_ac / blue_dc);
    let spo2 = (vitals::SPO2_INTERCEPT - vitals::SPO2_SLOPE * ratio)
        .clamp(vitals::SPO2_MIN_PERCENT, vitals::SPO2_MAX_PERCENT);
    let confidence = 100.0 - (ratio - vitals::SPO2_REFERENCE_RATIO).abs() * 100.0;

    Spo2Measurement {
        spo2: rounded(spo2),
        confidence: confidence_score(confidence),
        timestamp,
        fault: None,
    }
}

/// SpO2 over the whole trace plus trend across three equal segments of the last 180 samples
///
/// The last segment must differ from the first by more than one point to count as a trend.
pub fn estimate_spo2_with_trend(ppg: &PpgSignal, sample_rate: f64) -> Spo2TrendMeasurement {
    let measurement = estimate_spo2(ppg, sample_rate);
    if ppg.red.len() < vitals::SPO2_TREND_MIN_SAMPLES {
        return Spo2TrendMeasurement {
            measurement,
            trend: Spo2Trend::Stable,
        };
    }

    let recent = ppg.tail(vitals::SPO2_TREND_MIN_SAMPLES);
    let segment_len = vitals::SPO2_TREND_MIN_SAMPLES / vitals::SPO2_TREND_SEGMENTS;
    let segments: Vec<f64> = (0..vitals::SPO2_TREND_SEGMENTS)
        .map(|i| {
            let segment = recent.segment(i * segment_len, (i + 1) * segment_len);
            f64::from(estimate_spo2(&segment, sample_rate).spo2)
        })
        .collect();

    let (first, last) = (segments[0], segments[segments.len() - 1]);
    let trend = if last > first + 1.0 {
        Spo2Trend::Increasing
    } else if last < first - 1.0 {
        Spo2Trend::Decreasing
    } else {
        Spo2Trend::Stable
    };

    Spo2TrendMeasurement { measurement, trend }
}

/// Severity band: 95+ normal, 90+ mild, 85+ moderate, else severe
pub fn assess_spo2_level(spo2: u32) -> Spo2Assessment {
    let (level, description, action) = match spo2 {
        95.. => (Spo2Level::Normal, "Normal oxygen saturation", "No action needed"),
        90..=94 => (
            Spo2Level::Mild,
            "Mildly low oxygen saturation",
            "Monitor and consult doctor if persistent",
        ),
        85..=89 => (
            Spo2Level::Moderate,
            "Moderately low oxygen saturation",
            "Consult doctor soon",
        ),
        _ => (
            Spo2Level::Severe,
            "Severely low oxygen saturation",
            "Seek immediate medical attention",
        ),
    };

    Spo2Assessment {
        level,
        description: description.to_string(),
        action: action.to_string(),
    }
}

/// Confidence-weighted mean over measurements newer than `window`
pub fn calculate_average_spo2(
    measurements: &[Spo2Measurement],
    window: Duration,
    now: DateTime<Utc>,
) -> u32 {
    let (weighted_sum, total_weight) = measurements
        .iter()
        .filter(|m| now - m.timestamp < window)
        .fold((0.0, 0.0), |(sum, total), m| {
            let weight = f64::from(m.confidence) / 100.0;
            (sum + f64::from(m.spo2) * weight, total + weight)
        });

    if total_weight > 0.0 {
        rounded(weighted_sum / total_weight)
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vitals::test_signals::pulse_signal;
    use chrono::TimeZone;

    #[test]
    fn test_ratio_of_ratios() {
        // Identical pulsatile shape: R = blue DC / red DC = 100 / 150
        let ppg = pulse_signal(72.0, 10.0, 30.0);
        let spo2 = estimate_spo2(&ppg, 30.0);
        assert_eq!(spo2.spo2, 93);
        assert_eq!(spo2.confidence, 87);
        assert!(spo2.fault.is_none());
    }

    #[test]
    fn test_insufficient_samples() {
        let mut ppg = pulse_signal(72.0, 10.0, 30.0);
        ppg.blue.truncate(59);
        let spo2 = estimate_spo2(&ppg, 30.0);
        assert_eq!((spo2.spo2, spo2.confidence), (0, 0));
        assert_eq!(spo2.fault, Some(SignalFault::insufficient(60, 59)));
    }

    #[test]
    fn test_flat_blue_channel() {
        let mut ppg = pulse_signal(72.0, 10.0, 30.0);
        ppg.blue = vec![100.0; ppg.len()];
        let spo2 = estimate_spo2(&ppg, 30.0);
        assert_eq!(spo2.spo2, 0);
        assert_eq!(spo2.fault, Some(SignalFault::DegenerateInput));
    }

    #[test]
    fn test_trend_on_steady_signal() {
        let ppg = pulse_signal(72.0, 10.0, 30.0);
        let with_trend = estimate_spo2_with_trend(&ppg, 30.0);
        assert_eq!(with_trend.trend, Spo2Trend::Stable);
        assert_eq!(with_trend.measurement.spo2, 93);

        let short = pulse_signal(72.0, 5.0, 30.0);
        assert_eq!(estimate_spo2_with_trend(&short, 30.0).trend, Spo2Trend::Stable);
    }

    #[test]
    fn test_level_bands() {
        assert_eq!(assess_spo2_level(98).level, Spo2Level::Normal);
        assert_eq!(assess_spo2_level(95).level, Spo2Level::Normal);
        assert_eq!(assess_spo2_level(94).level, Spo2Level::Mild);
        assert_eq!(assess_spo2_level(85).level, Spo2Level::Moderate);
        let severe = assess_spo2_level(80);
        assert_eq!(severe.level, Spo2Level::Severe);
        assert!(severe.action.contains("immediate"));
    }

    #[test]
    fn test_average_spo2() {
        let now = Utc.timestamp_opt(1_000, 0).unwrap();
        let at = |spo2, confidence, secs| Spo2Measurement {
            spo2,
            confidence,
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
            fault: None,
        };
        let history = [at(90, 100, 990), at(99, 50, 995), at(80, 100, 900)];
        // (90 * 1.0 + 99 * 0.5) / 1.5 = 93
        assert_eq!(calculate_average_spo2(&history, Duration::seconds(30), now), 93);
    }
}
