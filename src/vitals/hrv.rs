// src/vitals/hrv.rs
//! Time-domain heart-rate variability from peak indices

use super::rounded;
use crate::config::constants::vitals;
use crate::error::SignalFault;
use crate::processing::{calculate_ibi, remove_outliers};
use crate::utils::stats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Stress tier derived from SDNN and RMSSD
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressLevel {
    Low,
    Medium,
    High,
}

impl StressLevel {
    /// SDNN > 50 and RMSSD > 40 is low; SDNN > 25 or RMSSD > 20 is medium
    pub fn from_hrv(sdnn: f64, rmssd: f64) -> Self {
        if sdnn > 50.0 && rmssd > 40.0 {
            StressLevel::Low
        } else if sdnn > 25.0 || rmssd > 20.0 {
            StressLevel::Medium
        } else {
            StressLevel::High
        }
    }

    /// Capitalised label for display
    pub fn label(&self) -> &'static str {
        match self {
            StressLevel::Low => "Low",
            StressLevel::Medium => "Medium",
            StressLevel::High => "High",
        }
    }
}

/// HRV summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HrvMeasurement {
    pub sdnn_ms: u32,
    pub rmssd_ms: u32,
    /// Percent of successive differences above 50 ms
    pub pnn50: u32,
    pub stress_level: StressLevel,
    pub timestamp: DateTime<Utc>,
    pub fault: Option<SignalFault>,
}

/// HRV summary extended with beat-rate statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvancedHrv {
    pub sdnn_ms: u32,
    pub rmssd_ms: u32,
    pub pnn50: u32,
    pub mean_hr: u32,
    pub min_hr: u32,
    pub max_hr: u32,
    /// SDNN mapped onto 0-100
    pub hrv_index: u32,
}

/// Autonomic nervous system balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutonomicBalance {
    Sympathetic,
    Balanced,
    Parasympathetic,
}

/// Balance verdict with a short description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutonomicAssessment {
    pub balance: AutonomicBalance,
    pub description: String,
}

struct TimeDomain {
    sdnn: f64,
    rmssd: f64,
    pnn50: f64,
}

fn time_domain(intervals: &[f64]) -> TimeDomain {
    let successive: Vec<f64> = intervals.windows(2).map(|w| w[1] - w[0]).collect();
    let pairs = successive.len() as f64;

    let rmssd = (successive.iter().map(|d| d * d).sum::<f64>() / pairs).sqrt();
    let over_50 = successive
        .iter()
        .filter(|d| d.abs() > vitals::PNN50_DIFFERENCE_MS)
        .count();

    TimeDomain {
        sdnn: stats::std_dev(intervals),
        rmssd,
        pnn50: over_50 as f64 / pairs * 100.0,
    }
}

/// Cleaned inter-beat intervals; fewer than five is an insufficient-data fault
fn clean_intervals(peak_indices: &[usize], sample_rate: f64) -> Result<Vec<f64>, SignalFault> {
    let cleaned = remove_outliers(&calculate_ibi(peak_indices, sample_rate));
    if cleaned.len() < vitals::HRV_MIN_INTERVALS {
        debug!(
            intervals = cleaned.len(),
            required = vitals::HRV_MIN_INTERVALS,
            "hrv: insufficient clean intervals"
        );
        return Err(SignalFault::insufficient(vitals::HRV_MIN_INTERVALS, cleaned.len()));
    }
    Ok(cleaned)
}

/// SDNN, RMSSD, pNN50 and stress tier
///
/// Intervals are cleaned with the IQR fence first. With fewer than five clean
/// intervals the result is zeroed with a medium stress default.
pub fn calculate_hrv(
    peak_indices: &[usize],
    sample_rate: f64,
    timestamp: DateTime<Utc>,
) -> HrvMeasurement {
    let intervals = match clean_intervals(peak_indices, sample_rate) {
        Ok(intervals) => intervals,
        Err(fault) => {
            return HrvMeasurement {
                sdnn_ms: 0,
                rmssd_ms: 0,
                pnn50: 0,
                stress_level: StressLevel::Medium,
                timestamp,
                fault: Some(fault),
            }
        }
    };

    let td = time_domain(&intervals);
    HrvMeasurement {
        sdnn_ms: rounded(td.sdnn),
        rmssd_ms: rounded(td.rmssd),
        pnn50: rounded(td.pnn50),
        stress_level: StressLevel::from_hrv(td.sdnn, td.rmssd),
        timestamp,
        fault: None,
    }
}

/// HRV with mean/min/max instantaneous heart rate and an HRV index
pub fn calculate_advanced_hrv(peak_indices: &[usize], sample_rate: f64) -> AdvancedHrv {
    let Ok(intervals) = clean_intervals(peak_indices, sample_rate) else {
        return AdvancedHrv {
            sdnn_ms: 0,
            rmssd_ms: 0,
            pnn50: 0,
            mean_hr: 0,
            min_hr: 0,
            max_hr: 0,
            hrv_index: 0,
        };
    };

    let td = time_domain(&intervals);
    let rates: Vec<f64> = intervals.iter().map(|ibi| 60_000.0 / ibi).collect();
    let min_hr = rates.iter().copied().fold(f64::INFINITY, f64::min);
    let max_hr = rates.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    AdvancedHrv {
        sdnn_ms: rounded(td.sdnn),
        rmssd_ms: rounded(td.rmssd),
        pnn50: rounded(td.pnn50),
        mean_hr: rounded(stats::mean(&rates)),
        min_hr: rounded(min_hr),
        max_hr: rounded(max_hr),
        hrv_index: rounded(stats::clamp_percent(td.sdnn)),
    }
}

/// RMSSD/SDNN ratio: above 0.7 parasympathetic, above 0.4 balanced
pub fn assess_autonomic_balance(hrv: &HrvMeasurement) -> AutonomicAssessment {
    let ratio = if hrv.sdnn_ms > 0 {
        f64::from(hrv.rmssd_ms) / f64::from(hrv.sdnn_ms)
    } else {
        0.0
    };

    let (balance, description) = if ratio > 0.7 {
        (AutonomicBalance::Parasympathetic, "Relaxed state, good recovery")
    } else if ratio > 0.4 {
        (AutonomicBalance::Balanced, "Healthy autonomic balance")
    } else {
        (AutonomicBalance::Sympathetic, "Active or stressed state")
    };

    AutonomicAssessment {
        balance,
        description: description.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peaks_from_intervals(intervals: &[usize]) -> Vec<usize> {
        let mut peaks = vec![0];
        for &step in intervals {
            let last = *peaks.last().unwrap();
            peaks.push(last + step);
        }
        peaks
    }

    #[test]
    fn test_constant_rhythm() {
        // 1000 Hz "sample rate" makes indices equal to milliseconds
        let peaks = peaks_from_intervals(&[800; 8]);
        let hrv = calculate_hrv(&peaks, 1000.0, DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(hrv.sdnn_ms, 0);
        assert_eq!(hrv.rmssd_ms, 0);
        assert_eq!(hrv.pnn50, 0);
        assert_eq!(hrv.stress_level, StressLevel::High);
        assert!(hrv.fault.is_none());
    }

    #[test]
    fn test_alternating_rhythm() {
        let peaks = peaks_from_intervals(&[700, 900, 700, 900, 700, 900]);
        let hrv = calculate_hrv(&peaks, 1000.0, DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(hrv.sdnn_ms, 100);
        assert_eq!(hrv.rmssd_ms, 200);
        assert_eq!(hrv.pnn50, 100);
        assert_eq!(hrv.stress_level, StressLevel::Low);
    }

    #[test]
    fn test_too_few_intervals() {
        let peaks = peaks_from_intervals(&[800, 810, 790, 805]);
        let hrv = calculate_hrv(&peaks, 1000.0, DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(hrv.sdnn_ms, 0);
        assert_eq!(hrv.stress_level, StressLevel::Medium);
        assert_eq!(hrv.fault, Some(SignalFault::insufficient(5, 4)));
    }

    #[test]
    fn test_stress_tiers() {
        assert_eq!(StressLevel::from_hrv(51.0, 41.0), StressLevel::Low);
        assert_eq!(StressLevel::from_hrv(51.0, 40.0), StressLevel::Medium);
        assert_eq!(StressLevel::from_hrv(20.0, 21.0), StressLevel::Medium);
        assert_eq!(StressLevel::from_hrv(25.0, 20.0), StressLevel::High);
    }

    #[test]
    fn test_advanced_hrv() {
        let peaks = peaks_from_intervals(&[750, 1000, 750, 1000, 750, 1000]);
        let advanced = calculate_advanced_hrv(&peaks, 1000.0);
        assert_eq!(advanced.min_hr, 60);
        assert_eq!(advanced.max_hr, 80);
        assert_eq!(advanced.mean_hr, 70);
        assert_eq!(advanced.sdnn_ms, 125);
        assert_eq!(advanced.hrv_index, 100);

        assert_eq!(calculate_advanced_hrv(&[0, 10], 30.0).mean_hr, 0);
    }

    #[test]
    fn test_autonomic_balance() {
        let mut hrv = calculate_hrv(
            &peaks_from_intervals(&[700, 900, 700, 900, 700, 900]),
            1000.0,
            DateTime::<Utc>::UNIX_EPOCH,
        );
        assert_eq!(assess_autonomic_balance(&hrv).balance, AutonomicBalance::Parasympathetic);

        hrv.rmssd_ms = 50;
        assert_eq!(assess_autonomic_balance(&hrv).balance, AutonomicBalance::Balanced);

        hrv.sdnn_ms = 0;
        assert_eq!(assess_autonomic_balance(&hrv).balance, AutonomicBalance::Sympathetic);
    }
}
