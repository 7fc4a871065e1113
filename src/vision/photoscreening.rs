// src/vision/photoscreening.rs
//! Photoscreening concern aggregation
//!
//! Findings for the red reflex, eye alignment and pupil symmetry are combined
//! into a single pass/refer/inconclusive verdict. Every finding is checked, so
//! one photo can raise several concerns at once.

use crate::config::constants::vision;
use crate::config::VisionSettings;
use crate::screening::{ScreeningStatus, Urgency};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedReflexStatus {
    Normal,
    Abnormal,
    Unclear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentFinding {
    Normal,
    Esotropia,
    Exotropia,
    Hypertropia,
    Hypotropia,
    Unclear,
}

impl AlignmentFinding {
    pub fn is_strabismus(self) -> bool {
        matches!(
            self,
            AlignmentFinding::Esotropia
                | AlignmentFinding::Exotropia
                | AlignmentFinding::Hypertropia
                | AlignmentFinding::Hypotropia
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlignmentFinding::Normal => "normal",
            AlignmentFinding::Esotropia => "esotropia",
            AlignmentFinding::Exotropia => "exotropia",
            AlignmentFinding::Hypertropia => "hypertropia",
            AlignmentFinding::Hypotropia => "hypotropia",
            AlignmentFinding::Unclear => "unclear",
        }
    }
}

impl fmt::Display for AlignmentFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PupilSymmetry {
    Symmetric,
    Asymmetric,
    Unclear,
}

/// What the photo analysis saw
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhotoscreeningFindings {
    pub red_reflex_left: RedReflexStatus,
    pub red_reflex_right: RedReflexStatus,
    pub eye_alignment: AlignmentFinding,
    pub pupil_symmetry: PupilSymmetry,
    /// 0-100
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoscreeningAssessment {
    pub status: ScreeningStatus,
    pub urgency: Urgency,
    pub recommendation: String,
    pub concerns: Vec<String>,
}

impl PhotoscreeningAssessment {
    pub fn has_concerns(&self) -> bool {
        !self.concerns.is_empty()
    }
}

pub fn assess_photoscreening(findings: &PhotoscreeningFindings) -> PhotoscreeningAssessment {
    assess_photoscreening_with(findings, vision::PHOTOSCREEN_MIN_CONFIDENCE)
}

/// Aggregate findings against the configured confidence floor
pub fn assess_photoscreening_for(
    findings: &PhotoscreeningFindings,
    settings: &VisionSettings,
) -> PhotoscreeningAssessment {
    assess_photoscreening_with(findings, settings.photoscreen_min_confidence)
}

/// Aggregate findings with a custom minimum confidence
///
/// A refer is never softened by a later unclear finding; low or non-finite
/// confidence only turns a pass into inconclusive.
pub fn assess_photoscreening_with(
    findings: &PhotoscreeningFindings,
    min_confidence: f64,
) -> PhotoscreeningAssessment {
    let mut concerns = Vec::new();
    let mut status = ScreeningStatus::Pass;

    let reflexes = [findings.red_reflex_left, findings.red_reflex_right];
    let abnormal_reflex = reflexes.contains(&RedReflexStatus::Abnormal);

    if abnormal_reflex {
        concerns.push(
            "Abnormal red reflex detected - may indicate cataracts, retinoblastoma, or other \
             serious conditions"
                .to_string(),
        );
        status = ScreeningStatus::Refer;
    }

    if reflexes.contains(&RedReflexStatus::Unclear) {
        concerns.push(
            "Unable to clearly assess red reflex - repeat screening or professional evaluation \
             needed"
                .to_string(),
        );
        if status != ScreeningStatus::Refer {
            status = ScreeningStatus::Inconclusive;
        }
    }

    if findings.eye_alignment.is_strabismus() {
        concerns.push(format!(
            "Eye misalignment detected ({}) - may indicate strabismus",
            findings.eye_alignment
        ));
        status = ScreeningStatus::Refer;
    }

    if findings.eye_alignment == AlignmentFinding::Unclear {
        concerns.push("Unable to clearly assess eye alignment - repeat screening recommended".to_string());
        if status != ScreeningStatus::Refer {
            status = ScreeningStatus::Inconclusive;
        }
    }

    if findings.pupil_symmetry == PupilSymmetry::Asymmetric {
        concerns.push("Asymmetric pupils detected - may indicate neurological or ocular issues".to_string());
        status = ScreeningStatus::Refer;
    }

    if !findings.confidence.is_finite() || findings.confidence < min_confidence {
        concerns.push(
            "Low confidence in screening results - repeat screening or professional evaluation \
             recommended"
                .to_string(),
        );
        if status == ScreeningStatus::Pass {
            status = ScreeningStatus::Inconclusive;
        }
    }

    let urgency = match status {
        ScreeningStatus::Refer if abnormal_reflex => Urgency::Urgent,
        ScreeningStatus::Refer => Urgency::Routine,
        _ => Urgency::None,
    };

    let recommendation = match (status, urgency) {
        (ScreeningStatus::Pass, _) => {
            "Photoscreening results appear normal. Continue regular eye exams as recommended for age."
        }
        (ScreeningStatus::Refer, Urgency::Urgent) => {
            "Photoscreening indicates potential serious concerns. Arrange an immediate \
             comprehensive eye examination by an eye care professional."
        }
        (ScreeningStatus::Refer, _) => {
            "Photoscreening indicates potential concerns. Comprehensive eye examination by an eye \
             care professional is strongly recommended."
        }
        (ScreeningStatus::Inconclusive, _) => {
            "Photoscreening results are inconclusive. Repeat screening or professional evaluation \
             recommended."
        }
    };

    PhotoscreeningAssessment {
        status,
        urgency,
        recommendation: recommendation.to_string(),
        concerns,
    }
}
