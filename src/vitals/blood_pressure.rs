// src/vitals/blood_pressure.rs
//! Cuff-calibrated blood pressure from pulse timing

use super::{confidence_score, PpgSignal};
use crate::config::constants::{calibration, vitals};
use crate::error::SignalFault;
use crate::processing::detect_peaks;
use crate::utils::stats;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Reference cuff reading taken by the user
///
/// Immutable once created; the extractor only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BpCalibration {
    pub user_id: String,
    pub systolic_reference: f64,
    pub diastolic_reference: f64,
    pub calibrated_at: DateTime<Utc>,
    /// Device used for the reference reading, e.g. "Manual Cuff"
    pub device_label: String,
}

impl BpCalibration {
    pub fn new(
        user_id: impl Into<String>,
        systolic_reference: f64,
        diastolic_reference: f64,
        calibrated_at: DateTime<Utc>,
        device_label: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            systolic_reference,
            diastolic_reference,
            calibrated_at,
            device_label: device_label.into(),
        }
    }

    /// Fractional days since the reference reading
    pub fn age_days(&self, now: DateTime<Utc>) -> f64 {
        (now - self.calibrated_at).num_milliseconds() as f64 / 86_400_000.0
    }

    /// Valid while strictly younger than `validity`
    pub fn is_valid_within(&self, now: DateTime<Utc>, validity: Duration) -> bool {
        now - self.calibrated_at < validity
    }

    /// Valid for seven days
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.is_valid_within(now, default_validity())
    }
}

fn default_validity() -> Duration {
    Duration::days(calibration::BLOOD_PRESSURE_VALIDITY_DAYS)
}

/// One blood-pressure estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BloodPressureMeasurement {
    pub systolic: u32,
    pub diastolic: u32,
    pub confidence: u8,
    /// A valid calibration was available
    pub calibrated: bool,
    pub timestamp: DateTime<Utc>,
    pub fault: Option<SignalFault>,
}

/// American Heart Association category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BloodPressureCategory {
    Normal,
    Elevated,
    HighStage1,
    HighStage2,
    Crisis,
}

/// Category with guidance text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BloodPressureAssessment {
    pub category: BloodPressureCategory,
    pub description: String,
    pub action: String,
}

/// Cardiovascular risk tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardiovascularRisk {
    Low,
    Moderate,
    High,
    VeryHigh,
}

/// Risk tier with description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk: CardiovascularRisk,
    pub description: String,
}

/// Estimate with the default seven-day calibration validity
pub fn estimate_blood_pressure(
    ppg: &PpgSignal,
    calibration: Option<&BpCalibration>,
    sample_rate: f64,
    now: DateTime<Utc>,
) -> BloodPressureMeasurement {
    estimate_blood_pressure_within(ppg, calibration, sample_rate, now, default_validity())
}

/// Estimate blood pressure from mean pulse transit time
///
/// `delta = PTT - 0.3 s`; systolic is `reference - 100 delta` clamped to 90-180,
/// diastolic `reference - 60 delta` clamped to 60-110. Confidence decays two
/// points per calibration day and never exceeds 70. A missing or expired
/// calibration yields an uncalibrated zero result.
pub fn estimate_blood_pressure_within(
    ppg: &PpgSignal,
    calibration: Option<&BpCalibration>,
    sample_rate: f64,
    now: DateTime<Utc>,
    validity: Duration,
) -> BloodPressureMeasurement {
    let timestamp = ppg.capture_time();
    let zero = |calibrated, fault| BloodPressureMeasurement {
        systolic: 0,
        diastolic: 0,
        confidence: 0,
        calibrated,
        timestamp,
        fault: Some(fault),
    };

    let calibration = match calibration {
        Some(cal) if cal.is_valid_within(now, validity) => cal,
        Some(cal) => {
            warn!(age_days = cal.age_days(now), "blood pressure calibration expired");
            return zero(false, SignalFault::InvalidCalibration);
        }
        None => return zero(false, SignalFault::InvalidCalibration),
    };

    if ppg.green.len() < vitals::BP_MIN_SAMPLES {
        debug!(samples = ppg.green.len(), "blood pressure: insufficient samples");
        return zero(true, SignalFault::insufficient(vitals::BP_MIN_SAMPLES, ppg.green.len()));
    }

    let peaks = detect_peaks(&ppg.green, vitals::BP_PEAK_MIN_DISTANCE, vitals::PEAK_THRESHOLD);
    if peaks.len() < 2 {
        return zero(true, SignalFault::insufficient(2, peaks.len()));
    }

    let transit_times: Vec<f64> = peaks
        .windows(2)
        .map(|pair| (pair[1] - pair[0]) as f64 / sample_rate)
        .collect();
    let delta = stats::mean(&transit_times) - vitals::BP_REFERENCE_PTT_SECONDS;

    let (sys_lo, sys_hi) = vitals::BP_SYSTOLIC_RANGE;
    let (dia_lo, dia_hi) = vitals::BP_DIASTOLIC_RANGE;
    let systolic = (calibration.systolic_reference - delta * vitals::BP_SYSTOLIC_GAIN)
        .round()
        .clamp(sys_lo, sys_hi);
    let diastolic = (calibration.diastolic_reference - delta * vitals::BP_DIASTOLIC_GAIN)
        .round()
        .clamp(dia_lo, dia_hi);

    let age_confidence = 100.0 - calibration.age_days(now) * vitals::BP_CONFIDENCE_DECAY_PER_DAY;
    let confidence = age_confidence.clamp(0.0, vitals::BP_MAX_CONFIDENCE);

    BloodPressureMeasurement {
        systolic: systolic as u32,
        diastolic: diastolic as u32,
        confidence: confidence_score(confidence),
        calibrated: true,
        timestamp,
        fault: None,
    }
}

/// AHA category; a reading above 180/120 is a crisis regardless of the other value
pub fn assess_blood_pressure(systolic: u32, diastolic: u32) -> BloodPressureAssessment {
    let (category, description, action) = if systolic > 180 || diastolic > 120 {
        (
            BloodPressureCategory::Crisis,
            "Hypertensive Crisis",
            "Seek immediate medical attention",
        )
    } else if systolic < 120 && diastolic < 80 {
        (
            BloodPressureCategory::Normal,
            "Normal blood pressure",
            "Maintain healthy lifestyle",
        )
    } else if (120..130).contains(&systolic) && diastolic < 80 {
        (
            BloodPressureCategory::Elevated,
            "Elevated blood pressure",
            "Adopt healthier lifestyle to prevent hypertension",
        )
    } else if (130..140).contains(&systolic) || (80..90).contains(&diastolic) {
        (
            BloodPressureCategory::HighStage1,
            "High Blood Pressure (Stage 1)",
            "Consult doctor about lifestyle changes and possible medication",
        )
    } else {
        (
            BloodPressureCategory::HighStage2,
            "High Blood Pressure (Stage 2)",
            "Consult doctor soon - medication likely needed",
        )
    };

    BloodPressureAssessment {
        category,
        description: description.to_string(),
        action: action.to_string(),
    }
}

/// Mean arterial pressure `d + (s - d) / 3`, rounded
pub fn calculate_map(systolic: u32, diastolic: u32) -> u32 {
    let (s, d) = (f64::from(systolic), f64::from(diastolic));
    (d + (s - d) / 3.0).round().max(0.0) as u32
}

/// Systolic minus diastolic
pub fn calculate_pulse_pressure(systolic: u32, diastolic: u32) -> i64 {
    i64::from(systolic) - i64::from(diastolic)
}

/// Risk tier from AHA category; elevated readings count as moderate risk past 50
pub fn estimate_cardiovascular_risk(systolic: u32, diastolic: u32, age: u32) -> RiskAssessment {
    let (risk, description) = match assess_blood_pressure(systolic, diastolic).category {
        BloodPressureCategory::Normal => (CardiovascularRisk::Low, "Low cardiovascular risk"),
        BloodPressureCategory::Elevated => (
            if age > 50 { CardiovascularRisk::Moderate } else { CardiovascularRisk::Low },
            "Monitor blood pressure regularly",
        ),
        BloodPressureCategory::HighStage1 => {
            (CardiovascularRisk::Moderate, "Moderate cardiovascular risk")
        }
        BloodPressureCategory::HighStage2 => (CardiovascularRisk::High, "High cardiovascular risk"),
        BloodPressureCategory::Crisis => {
            (CardiovascularRisk::VeryHigh, "Very high cardiovascular risk")
        }
    };

    RiskAssessment {
        risk,
        description: description.to_string(),
    }
}
