// src/processing/quality_monitor.rs
//! Signal quality assessment for conditioned PPG traces

use crate::config::constants::quality::{
    MIN_ACCEPTABLE_SNR_DB, MIN_ACCEPTABLE_STABILITY, NOISELESS_SNR_DB,
};
use crate::utils::stats;
use serde::{Deserialize, Serialize};

/// Issue raised when SNR is under the acceptance floor
pub const ISSUE_LOW_SNR: &str = "Low signal quality - improve lighting";
/// Issue raised when the signal wanders too much
pub const ISSUE_UNSTABLE: &str = "Unstable signal - stay still";
/// Issue raised when there are not enough samples to judge
pub const ISSUE_INSUFFICIENT_DATA: &str = "Insufficient data";

/// Quality verdict for a signal window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalQuality {
    /// Signal power over variance in dB, see [`calculate_snr`]
    pub snr_db: f64,
    /// `100 * (1 - cv)` clamped to 0-100
    pub stability: f64,
    /// SNR and stability both clear their minimums
    pub acceptable: bool,
    /// User-facing hints, empty when acceptable
    pub issues: Vec<String>,
}

impl SignalQuality {
    /// Verdict for a window too short to assess
    pub fn insufficient() -> Self {
        Self {
            snr_db: 0.0,
            stability: 0.0,
            acceptable: false,
            issues: vec![ISSUE_INSUFFICIENT_DATA.to_string()],
        }
    }
}

/// `10 log10(mean(x²) / var(x))`
///
/// A zero-variance signal reports [`NOISELESS_SNR_DB`] rather than infinity. An
/// empty signal reports `0.0`.
pub fn calculate_snr(signal: &[f64]) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }
    let signal_power = signal.iter().map(|&x| x * x).sum::<f64>() / signal.len() as f64;
    let noise_power = stats::variance(signal);

    if noise_power > 0.0 {
        10.0 * (signal_power / noise_power).log10()
    } else {
        NOISELESS_SNR_DB
    }
}

/// Assess SNR and stability of a signal window
pub fn assess_signal_quality(signal: &[f64]) -> SignalQuality {
    if signal.is_empty() {
        return SignalQuality::insufficient();
    }

    let snr_db = calculate_snr(signal);
    let mean = stats::mean(signal);
    let cv = if mean != 0.0 {
        stats::std_dev(signal) / mean.abs()
    } else {
        1.0
    };
    let stability = stats::clamp_percent(100.0 * (1.0 - cv));

    let mut issues = Vec::new();
    if snr_db < MIN_ACCEPTABLE_SNR_DB {
        issues.push(ISSUE_LOW_SNR.to_string());
    }
    if stability < MIN_ACCEPTABLE_STABILITY {
        issues.push(ISSUE_UNSTABLE.to_string());
    }

    SignalQuality {
        snr_db,
        stability,
        acceptable: snr_db >= MIN_ACCEPTABLE_SNR_DB && stability >= MIN_ACCEPTABLE_STABILITY,
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steady_signal_is_acceptable() {
        let signal: Vec<f64> = (0..100).map(|i| 100.0 + (i as f64 * 0.5).sin()).collect();
        let quality = assess_signal_quality(&signal);
        assert!(quality.snr_db > 30.0);
        assert!(quality.stability > 95.0);
        assert!(quality.acceptable);
        assert!(quality.issues.is_empty());
    }

    #[test]
    fn test_zero_mean_signal_is_rejected() {
        let signal: Vec<f64> = (0..100).map(|i| (i as f64 * 0.5).sin()).collect();
        let quality = assess_signal_quality(&signal);
        assert!(!quality.acceptable);
        assert!(quality.issues.iter().any(|i| i == ISSUE_LOW_SNR));
        assert!(quality.issues.iter().any(|i| i == ISSUE_UNSTABLE));
    }

    #[test]
    fn test_flat_signal_snr_is_capped() {
        assert_eq!(calculate_snr(&[2.0; 10]), NOISELESS_SNR_DB);
        let quality = assess_signal_quality(&[2.0; 10]);
        assert_eq!(quality.stability, 100.0);
        assert!(quality.acceptable);
    }

    #[test]
    fn test_empty_signal() {
        let quality = assess_signal_quality(&[]);
        assert!(!quality.acceptable);
        assert_eq!(quality.issues, vec![ISSUE_INSUFFICIENT_DATA.to_string()]);
    }
}
