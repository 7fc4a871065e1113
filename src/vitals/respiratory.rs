// src/vitals/respiratory.rs
//! Respiratory rate from the slow amplitude modulation of the green channel

use super::{rounded, PpgSignal};
use crate::config::constants::{filters, vitals};
use crate::error::SignalFault;
use crate::processing::{bandpass_filter, detect_peaks, detrend, mean_peak_interval, normalize};
use crate::utils::stats;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Breath-to-breath regularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreathingPattern {
    Regular,
    Irregular,
}

/// One respiratory-rate estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RespiratoryMeasurement {
    /// Breaths per minute, 6-30, or `0` when unavailable
    pub respiratory_rate: u32,
    pub pattern: BreathingPattern,
    pub timestamp: DateTime<Utc>,
    pub fault: Option<SignalFault>,
}

/// Rate band relative to the age-specific normal range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RespiratoryLevel {
    Normal,
    Bradypnea,
    Tachypnea,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RespiratoryAssessment {
    pub level: RespiratoryLevel,
    pub description: String,
    pub action: String,
}

/// Findings over a run of respiratory measurements
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreathingAbnormalities {
    pub has_abnormality: bool,
    pub abnormalities: Vec<String>,
}

/// Respiratory rate from peaks of the 0.1-0.5 Hz component
///
/// Needs 180 samples. Peaks must be two seconds apart; with fewer than three the
/// rate is zero and the pattern irregular. Rates outside 6-30 are reported as zero.
pub fn detect_respiratory_rate(ppg: &PpgSignal, sample_rate: f64) -> RespiratoryMeasurement {
    let timestamp = ppg.capture_time();
    let empty = |pattern, fault| RespiratoryMeasurement {
        respiratory_rate: 0,
        pattern,
        timestamp,
        fault: Some(fault),
    };

    if ppg.green.len() < vitals::RESPIRATORY_MIN_SAMPLES {
        debug!(
            samples = ppg.green.len(),
            required = vitals::RESPIRATORY_MIN_SAMPLES,
            "respiratory rate: insufficient samples"
        );
        return empty(
            BreathingPattern::Regular,
            SignalFault::insufficient(vitals::RESPIRATORY_MIN_SAMPLES, ppg.green.len()),
        );
    }

    let conditioned = detrend(&ppg.green);
    let conditioned = bandpass_filter(
        &conditioned,
        filters::RESPIRATORY_BAND_LOW_HZ,
        filters::RESPIRATORY_BAND_HIGH_HZ,
        sample_rate,
    );
    let conditioned = normalize(&conditioned);

    let min_distance = (sample_rate * vitals::RESPIRATORY_PEAK_SPACING_SECONDS) as usize;
    let peaks = detect_peaks(&conditioned, min_distance, vitals::RESPIRATORY_PEAK_THRESHOLD);
    if peaks.len() < vitals::RESPIRATORY_MIN_PEAKS {
        return empty(
            BreathingPattern::Irregular,
            SignalFault::insufficient(vitals::RESPIRATORY_MIN_PEAKS, peaks.len()),
        );
    }

    let pattern = breathing_pattern(&peaks);
    let rate = match mean_peak_interval(&peaks) {
        Some(interval) if interval > 0.0 => (sample_rate / interval * 60.0).round(),
        _ => 0.0,
    };

    if !(vitals::RESPIRATORY_MIN_RATE..=vitals::RESPIRATORY_MAX_RATE).contains(&rate) {
        debug!(rate, "respiratory rate outside plausible range");
        return empty(pattern, SignalFault::OutOfRange);
    }

    RespiratoryMeasurement {
        respiratory_rate: rounded(rate),
        pattern,
        timestamp,
        fault: None,
    }
}

/// Regular when the peak-interval coefficient of variation is under 0.2
fn breathing_pattern(peaks: &[usize]) -> BreathingPattern {
    let intervals: Vec<f64> = peaks.windows(2).map(|w| (w[1] - w[0]) as f64).collect();
    let cv = stats::coefficient_of_variation(&intervals).unwrap_or(1.0);
    if cv < vitals::RESPIRATORY_REGULAR_CV {
        BreathingPattern::Regular
    } else {
        BreathingPattern::Irregular
    }
}

/// Rate against 12-20 breaths/min, narrowed to 12-18 for ages 18-64
pub fn assess_respiratory_rate(rate: u32, age: u32) -> RespiratoryAssessment {
    let normal_max = if (18..65).contains(&age) { 18 } else { 20 };

    let (level, description, action) = if (12..=normal_max).contains(&rate) {
        (RespiratoryLevel::Normal, "Normal respiratory rate", "No action needed")
    } else if rate < 12 {
        (
            RespiratoryLevel::Bradypnea,
            "Slow breathing rate",
            "Monitor - consult doctor if persistent or symptomatic",
        )
    } else {
        (
            RespiratoryLevel::Tachypnea,
            "Fast breathing rate",
            "Monitor - consult doctor if persistent or symptomatic",
        )
    };

    RespiratoryAssessment {
        level,
        description: description.to_string(),
        action: action.to_string(),
    }
}

/// Plain mean over measurements newer than `window`
pub fn calculate_average_respiratory_rate(
    measurements: &[RespiratoryMeasurement],
    window: Duration,
    now: DateTime<Utc>,
) -> u32 {
    let recent: Vec<f64> = measurements
        .iter()
        .filter(|m| now - m.timestamp < window)
        .map(|m| f64::from(m.respiratory_rate))
        .collect();
    rounded(stats::mean(&recent))
}

/// Flag irregularity, rate variability and sustained abnormal rates
///
/// Needs at least five measurements; fewer yields no findings.
pub fn detect_breathing_abnormalities(
    measurements: &[RespiratoryMeasurement],
) -> BreathingAbnormalities {
    if measurements.len() < vitals::BREATHING_PATTERN_MIN_MEASUREMENTS {
        return BreathingAbnormalities::default();
    }

    let total = measurements.len() as f64;
    let mut abnormalities = Vec::new();

    let irregular = measurements
        .iter()
        .filter(|m| m.pattern == BreathingPattern::Irregular)
        .count();
    if irregular as f64 / total > 0.5 {
        abnormalities.push("Irregular breathing pattern detected".to_string());
    }

    let rates: Vec<f64> = measurements.iter().map(|m| f64::from(m.respiratory_rate)).collect();
    if stats::std_dev(&rates) > 5.0 {
        abnormalities.push("High variability in breathing rate".to_string());
    }

    let abnormal_rates = rates.iter().filter(|&&r| r < 10.0 || r > 25.0).count();
    if abnormal_rates as f64 / total > 0.3 {
        abnormalities.push("Sustained abnormal breathing rate".to_string());
    }

    BreathingAbnormalities {
        has_abnormality: !abnormalities.is_empty(),
        abnormalities,
    }
}
