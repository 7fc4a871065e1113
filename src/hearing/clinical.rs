// src/hearing/clinical.rs
//! Middle-ear, cochlear and exposure assessments

use super::thresholds::AudiometricFrequency;
use crate::config::constants::hearing;
use crate::screening::ScreeningStatus;
use serde::{Deserialize, Serialize};

/// Jerger tympanogram type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TympanogramType {
    A,
    As,
    Ad,
    B,
    C,
}

/// Measured tympanogram
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TympanometryResult {
    /// daPa
    pub peak_pressure: f64,
    /// ml
    pub compliance: f64,
    /// ml
    pub ear_canal_volume: f64,
    #[serde(rename = "type")]
    pub tympanogram_type: TympanogramType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MiddleEarStatus {
    Normal,
    Abnormal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TympanometryAssessment {
    pub status: MiddleEarStatus,
    pub interpretation: String,
}

pub fn assess_tympanometry(result: &TympanometryResult) -> TympanometryAssessment {
    let (status, interpretation) = match result.tympanogram_type {
        TympanogramType::A => (
            MiddleEarStatus::Normal,
            "Normal middle ear function. Peak pressure and compliance within normal limits.",
        ),
        TympanogramType::As => (
            MiddleEarStatus::Abnormal,
            "Reduced compliance (stiff system). May indicate otosclerosis or ossicular fixation.",
        ),
        TympanogramType::Ad => (
            MiddleEarStatus::Abnormal,
            "Increased compliance (hypermobile system). May indicate ossicular discontinuity.",
        ),
        TympanogramType::B => (
            MiddleEarStatus::Abnormal,
            "Flat tympanogram. May indicate middle ear fluid or tympanic membrane perforation.",
        ),
        TympanogramType::C => (
            MiddleEarStatus::Abnormal,
            "Negative pressure. May indicate Eustachian tube dysfunction.",
        ),
    };

    TympanometryAssessment {
        status,
        interpretation: interpretation.to_string(),
    }
}

/// Otoacoustic emission measured at one frequency
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OaeResult {
    pub frequency: AudiometricFrequency,
    pub snr_db: f64,
    pub present: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OaeAssessment {
    /// Pass or refer
    pub status: ScreeningStatus,
    /// Fraction of frequencies with a robust emission
    pub pass_rate: f64,
    pub interpretation: String,
}

/// Pass when at least 80% of frequencies show an emission with SNR of 6 dB or more
pub fn assess_oae(results: &[OaeResult]) -> OaeAssessment {
    let passing = results
        .iter()
        .filter(|r| r.present && r.snr_db >= hearing::OAE_MIN_SNR_DB)
        .count();
    let pass_rate = if results.is_empty() {
        0.0
    } else {
        passing as f64 / results.len() as f64
    };

    if pass_rate >= hearing::OAE_PASS_RATE {
        OaeAssessment {
            status: ScreeningStatus::Pass,
            pass_rate,
            interpretation: "OAEs present at most frequencies. Cochlear function appears normal."
                .to_string(),
        }
    } else {
        OaeAssessment {
            status: ScreeningStatus::Refer,
            pass_rate,
            interpretation: "OAEs absent or weak at multiple frequencies. May indicate cochlear \
                             dysfunction. Comprehensive audiological evaluation recommended."
                .to_string(),
        }
    }
}

/// Age whose typical presbycusis matches the measured PTA
///
/// Expected loss is 0.75 dB per year past 60. Loss beyond that adds a year per
/// 0.75 dB; loss at or below it returns the chronological age.
pub fn calculate_hearing_age(pta: f64, chronological_age: f64) -> f64 {
    const DB_PER_YEAR: f64 = 0.75;
    let expected = if chronological_age > 60.0 {
        (chronological_age - 60.0) * DB_PER_YEAR
    } else {
        0.0
    };
    let excess = pta - expected;
    if excess <= 0.0 {
        chronological_age
    } else {
        chronological_age + excess / DB_PER_YEAR
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseRisk {
    Safe,
    Caution,
    Hazardous,
    Dangerous,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseExposureAssessment {
    pub risk: NoiseRisk,
    pub recommendation: String,
    /// Permissible daily exposure at this level, hours
    pub max_safe_hours: f64,
}

/// Daily noise dose against 85 dB for 8 hours with a 3 dB exchange rate
pub fn assess_noise_exposure(level_db: f64, hours_per_day: f64) -> NoiseExposureAssessment {
    const REFERENCE_LEVEL_DB: f64 = 85.0;
    const REFERENCE_HOURS: f64 = 8.0;
    const EXCHANGE_RATE_DB: f64 = 3.0;

    let max_safe_hours = REFERENCE_HOURS / 2f64.powf((level_db - REFERENCE_LEVEL_DB) / EXCHANGE_RATE_DB);

    let (risk, recommendation) = if hours_per_day <= max_safe_hours {
        (NoiseRisk::Safe, "Current noise exposure is within safe limits.")
    } else if hours_per_day <= max_safe_hours * 1.5 {
        (
            NoiseRisk::Caution,
            "Noise exposure is approaching hazardous levels. Consider hearing protection.",
        )
    } else if hours_per_day <= max_safe_hours * 2.0 {
        (
            NoiseRisk::Hazardous,
            "Noise exposure is hazardous. Hearing protection strongly recommended.",
        )
    } else {
        (
            NoiseRisk::Dangerous,
            "Noise exposure is dangerous. Immediate hearing protection required. Risk of \
             permanent hearing damage.",
        )
    };

    NoiseExposureAssessment {
        risk,
        recommendation: recommendation.to_string(),
        max_safe_hours,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tympanogram(tympanogram_type: TympanogramType) -> TympanometryResult {
        TympanometryResult {
            peak_pressure: -20.0,
            compliance: 0.8,
            ear_canal_volume: 1.1,
            tympanogram_type,
        }
    }

    #[test]
    fn test_tympanometry_types() {
        assert_eq!(
            assess_tympanometry(&tympanogram(TympanogramType::A)).status,
            MiddleEarStatus::Normal
        );
        for t in [TympanogramType::As, TympanogramType::Ad, TympanogramType::B, TympanogramType::C] {
            assert_eq!(assess_tympanometry(&tympanogram(t)).status, MiddleEarStatus::Abnormal);
        }
        assert!(assess_tympanometry(&tympanogram(TympanogramType::B))
            .interpretation
            .contains("fluid"));
    }

    #[test]
    fn test_oae_pass_rate() {
        let mut results: Vec<OaeResult> = AudiometricFrequency::ALL[..5]
            .iter()
            .map(|&frequency| OaeResult { frequency, snr_db: 10.0, present: true })
            .collect();
        // 4 of 5 robust
        results[0].snr_db = 4.0;
        let assessment = assess_oae(&results);
        assert_eq!(assessment.status, ScreeningStatus::Pass);
        assert_eq!(assessment.pass_rate, 0.8);

        results[1].present = false;
        assert_eq!(assess_oae(&results).status, ScreeningStatus::Refer);
        assert_eq!(assess_oae(&[]).status, ScreeningStatus::Refer);
    }

    #[test]
    fn test_hearing_age() {
        assert!((calculate_hearing_age(10.0, 40.0) - (40.0 + 10.0 / 0.75)).abs() < 1e-9);
        assert_eq!(calculate_hearing_age(0.0, 40.0), 40.0);
        // 70 years: 7.5 dB expected
        assert_eq!(calculate_hearing_age(7.5, 70.0), 70.0);
        assert_eq!(calculate_hearing_age(15.0, 70.0), 80.0);
    }

    #[test]
    fn test_noise_exposure() {
        let reference = assess_noise_exposure(85.0, 8.0);
        assert_eq!(reference.risk, NoiseRisk::Safe);
        assert_eq!(reference.max_safe_hours, 8.0);

        let loud = assess_noise_exposure(88.0, 5.0);
        assert_eq!(loud.max_safe_hours, 4.0);
        assert_eq!(loud.risk, NoiseRisk::Caution);

        assert_eq!(assess_noise_exposure(88.0, 8.0).risk, NoiseRisk::Hazardous);
        assert_eq!(assess_noise_exposure(100.0, 2.0).risk, NoiseRisk::Dangerous);
    }
}
