// src/hearing/verdict.rs
//! Overall hearing screening verdict

use super::thresholds::classify_hearing_loss;
use crate::config::constants::hearing;
use crate::screening::{AgeGroup, ScreeningStatus};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HearingScreeningResult {
    pub status: ScreeningStatus,
    pub recommendation: String,
    pub concerns: Vec<String>,
    /// Severity label of the left-ear PTA, e.g. "Normal Hearing"
    pub left_ear_status: String,
    pub right_ear_status: String,
}

/// Combine per-ear PTAs and the speech-in-noise score into one verdict
///
/// Concerns accumulate: PTA above 25 dB HL in either ear, more than 15 dB
/// between ears, speech-in-noise below 60%, and for children under six a PTA
/// above 20 dB HL. Any concern means refer. A non-finite PTA cannot be scored
/// and yields inconclusive.
pub fn assess_hearing_screening(
    left_pta: f64,
    right_pta: f64,
    speech_in_noise_percent: f64,
    age_group: AgeGroup,
) -> HearingScreeningResult {
    let mut concerns = Vec::new();
    let mut status = ScreeningStatus::Pass;

    if !left_pta.is_finite() || !right_pta.is_finite() {
        concerns.push("Pure-tone thresholds incomplete".to_string());
        status = ScreeningStatus::Inconclusive;
    } else {
        if left_pta > hearing::REFER_PTA_DB || right_pta > hearing::REFER_PTA_DB {
            concerns.push("Hearing thresholds exceed normal limits".to_string());
            status = ScreeningStatus::Refer;
        }

        if (left_pta - right_pta).abs() > hearing::REFER_ASYMMETRY_DB {
            concerns.push("Significant asymmetry between ears detected".to_string());
            status = ScreeningStatus::Refer;
        }

        if age_group.is_pediatric()
            && (left_pta > hearing::PEDIATRIC_REFER_PTA_DB || right_pta > hearing::PEDIATRIC_REFER_PTA_DB)
        {
            concerns.push(
                "Even mild hearing loss in children can affect speech and language development"
                    .to_string(),
            );
            status = ScreeningStatus::Refer;
        }
    }

    if speech_in_noise_percent < hearing::REFER_SPEECH_PERCENT {
        concerns.push("Difficulty understanding speech in noise".to_string());
        status = ScreeningStatus::Refer;
    }

    let recommendation = match status {
        ScreeningStatus::Pass => {
            "Hearing screening results are within normal limits. Continue regular hearing \
             screenings as recommended for age."
        }
        ScreeningStatus::Refer => {
            "Hearing screening indicates potential concerns. Comprehensive audiological \
             evaluation by an audiologist is recommended."
        }
        ScreeningStatus::Inconclusive => {
            "Hearing screening results are inconclusive. Repeat screening or professional \
             evaluation recommended."
        }
    };

    info!(status = ?status, concerns = concerns.len(), "Hearing screening assessed");

    HearingScreeningResult {
        status,
        recommendation: recommendation.to_string(),
        concerns,
        left_ear_status: ear_label(left_pta),
        right_ear_status: ear_label(right_pta),
    }
}

fn ear_label(pta: f64) -> String {
    if pta.is_finite() {
        classify_hearing_loss(pta).label
    } else {
        "Not tested".to_string()
    }
}
