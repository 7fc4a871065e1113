// src/vision/color_contrast.rs
//! Pseudo-isochromatic plate scoring and contrast sensitivity banding

use crate::config::constants::vision;
use crate::screening::ScreeningStatus;
use serde::{Deserialize, Serialize};

/// Which vision a plate is designed to separate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlateKind {
    Normal,
    Protan,
    Deutan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorPlate {
    /// Number a person with normal colour vision reads
    pub number: u32,
    pub kind: PlateKind,
}

impl ColorPlate {
    pub const fn new(number: u32, kind: PlateKind) -> Self {
        Self { number, kind }
    }
}

/// Standard screening plate sequence
pub const COLOR_VISION_PLATES: [ColorPlate; 8] = [
    ColorPlate::new(12, PlateKind::Normal),
    ColorPlate::new(8, PlateKind::Protan),
    ColorPlate::new(3, PlateKind::Deutan),
    ColorPlate::new(29, PlateKind::Normal),
    ColorPlate::new(5, PlateKind::Protan),
    ColorPlate::new(2, PlateKind::Deutan),
    ColorPlate::new(74, PlateKind::Normal),
    ColorPlate::new(6, PlateKind::Normal),
];

/// Plate score tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorVisionSeverity {
    Normal,
    Mild,
    Severe,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorVisionAssessment {
    pub status: ScreeningStatus,
    pub severity: ColorVisionSeverity,
    pub percent_correct: f64,
    /// Protan or deutan when the misses lean to one plate kind
    pub deficiency_type: Option<PlateKind>,
    pub recommendation: String,
}

/// Score plate readings in order; a missing response counts as a miss
pub fn assess_color_vision(responses: &[u32], plates: &[ColorPlate]) -> ColorVisionAssessment {
    let mut correct = 0usize;
    let mut protan_misses = 0usize;
    let mut deutan_misses = 0usize;

    for (i, plate) in plates.iter().enumerate() {
        if responses.get(i) == Some(&plate.number) {
            correct += 1;
            continue;
        }
        match plate.kind {
            PlateKind::Protan => protan_misses += 1,
            PlateKind::Deutan => deutan_misses += 1,
            PlateKind::Normal => {}
        }
    }

    let percent_correct = if plates.is_empty() {
        0.0
    } else {
        (correct * 100) as f64 / plates.len() as f64
    };

    if percent_correct >= vision::COLOR_NORMAL_PERCENT {
        return ColorVisionAssessment {
            status: ScreeningStatus::Pass,
            severity: ColorVisionSeverity::Normal,
            percent_correct,
            deficiency_type: None,
            recommendation: "Color vision appears normal.".to_string(),
        };
    }

    let deficiency_type = match protan_misses.cmp(&deutan_misses) {
        std::cmp::Ordering::Greater => Some(PlateKind::Protan),
        std::cmp::Ordering::Less => Some(PlateKind::Deutan),
        std::cmp::Ordering::Equal => None,
    };

    let (severity, recommendation) = if percent_correct >= vision::COLOR_MILD_PERCENT {
        (
            ColorVisionSeverity::Mild,
            "Possible color vision deficiency detected. Comprehensive color vision testing recommended.",
        )
    } else {
        (
            ColorVisionSeverity::Severe,
            "Significant color vision deficiency detected. Professional evaluation recommended.",
        )
    };

    ColorVisionAssessment {
        status: ScreeningStatus::Refer,
        severity,
        percent_correct,
        deficiency_type,
        recommendation: recommendation.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContrastSensitivity {
    Normal,
    Reduced,
    SeverelyReduced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContrastSensitivityAssessment {
    pub level: ContrastSensitivity,
    pub status: ScreeningStatus,
    pub recommendation: String,
}

/// Band the lowest contrast (percent) the person could still detect
pub fn assess_contrast_sensitivity(lowest_detected_contrast: f64) -> ContrastSensitivityAssessment {
    let (level, status, recommendation) = if lowest_detected_contrast <= vision::CONTRAST_NORMAL_PERCENT {
        (
            ContrastSensitivity::Normal,
            ScreeningStatus::Pass,
            "Contrast sensitivity is normal.",
        )
    } else if lowest_detected_contrast <= vision::CONTRAST_REDUCED_PERCENT {
        (
            ContrastSensitivity::Reduced,
            ScreeningStatus::Refer,
            "Mildly reduced contrast sensitivity. Consider comprehensive eye exam if symptoms present.",
        )
    } else {
        (
            ContrastSensitivity::SeverelyReduced,
            ScreeningStatus::Refer,
            "Significantly reduced contrast sensitivity. Comprehensive eye examination recommended.",
        )
    };

    ContrastSensitivityAssessment {
        level,
        status,
        recommendation: recommendation.to_string(),
    }
}
