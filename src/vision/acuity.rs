// src/vision/acuity.rs
//! Snellen acuity scoring, age norms and optotype generation

use crate::config::constants::vision;
use crate::error::{ScreeningError, ScreeningResult};
use crate::screening::{AgeGroup, ScreeningStatus, Side, Urgency};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Snellen line at 20 ft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SnellenRating {
    #[serde(rename = "20/200")]
    S200,
    #[serde(rename = "20/100")]
    S100,
    #[serde(rename = "20/70")]
    S70,
    #[serde(rename = "20/50")]
    S50,
    #[serde(rename = "20/40")]
    S40,
    #[serde(rename = "20/30")]
    S30,
    #[serde(rename = "20/25")]
    S25,
    #[serde(rename = "20/20")]
    S20,
    #[serde(rename = "20/15")]
    S15,
    #[serde(rename = "20/10")]
    S10,
}

/// One chart line: decimal acuity, logMAR and letter size (the Snellen denominator)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnellenLine {
    pub rating: SnellenRating,
    pub decimal: f64,
    pub log_mar: f64,
    pub size: u32,
}

/// Chart lines from largest letters to smallest
pub const SNELLEN_CHART: [SnellenLine; 10] = [
    SnellenLine { rating: SnellenRating::S200, decimal: 0.1, log_mar: 1.0, size: 200 },
    SnellenLine { rating: SnellenRating::S100, decimal: 0.2, log_mar: 0.7, size: 100 },
    SnellenLine { rating: SnellenRating::S70, decimal: 0.29, log_mar: 0.54, size: 70 },
    SnellenLine { rating: SnellenRating::S50, decimal: 0.4, log_mar: 0.4, size: 50 },
    SnellenLine { rating: SnellenRating::S40, decimal: 0.5, log_mar: 0.3, size: 40 },
    SnellenLine { rating: SnellenRating::S30, decimal: 0.67, log_mar: 0.18, size: 30 },
    SnellenLine { rating: SnellenRating::S25, decimal: 0.8, log_mar: 0.1, size: 25 },
    SnellenLine { rating: SnellenRating::S20, decimal: 1.0, log_mar: 0.0, size: 20 },
    SnellenLine { rating: SnellenRating::S15, decimal: 1.33, log_mar: -0.12, size: 15 },
    SnellenLine { rating: SnellenRating::S10, decimal: 2.0, log_mar: -0.3, size: 10 },
];

impl SnellenRating {
    pub fn line(self) -> &'static SnellenLine {
        // Chart order matches declaration order
        &SNELLEN_CHART[self as usize]
    }

    pub fn decimal(self) -> f64 {
        self.line().decimal
    }

    pub fn log_mar(self) -> f64 {
        self.line().log_mar
    }

    pub fn size(self) -> u32 {
        self.line().size
    }

    /// Chart line whose decimal acuity is nearest; ties go to the larger letters
    pub fn closest(decimal: f64) -> Self {
        let mut closest = SnellenRating::S200;
        let mut min_diff = f64::INFINITY;
        for line in &SNELLEN_CHART {
            let diff = (line.decimal - decimal).abs();
            if diff < min_diff {
                min_diff = diff;
                closest = line.rating;
            }
        }
        closest
    }
}

impl fmt::Display for SnellenRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "20/{}", self.size())
    }
}

impl FromStr for SnellenRating {
    type Err = ScreeningError;

    fn from_str(s: &str) -> ScreeningResult<Self> {
        SNELLEN_CHART
            .iter()
            .map(|line| line.rating)
            .find(|rating| rating.to_string() == s.trim())
            .ok_or_else(|| ScreeningError::UnknownSnellenRating(s.to_string()))
    }
}

/// Minimum acceptable and typical acuity for an age band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeNorm {
    pub min_acceptable: SnellenRating,
    pub typical: SnellenRating,
}

pub fn age_norm(age_group: AgeGroup) -> AgeNorm {
    use SnellenRating::*;
    let (min_acceptable, typical) = match age_group {
        AgeGroup::Infant => (S200, S100),
        AgeGroup::Preschool => (S40, S30),
        AgeGroup::SchoolAge => (S30, S20),
        AgeGroup::Adolescent | AgeGroup::Adult => (S25, S20),
    };
    AgeNorm { min_acceptable, typical }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisualAcuityResult {
    pub acuity: SnellenRating,
    pub decimal: f64,
    pub log_mar: f64,
    pub percent_correct: f64,
}

/// Acuity from the score on one chart line
///
/// 80% or better keeps the line; 60-79% scales its decimal acuity by 0.8,
/// 40-59% by 0.6 and below 40% by 0.4, then snaps to the nearest chart line.
pub fn calculate_visual_acuity(correct: u32, total: u32, starting: SnellenRating) -> VisualAcuityResult {
    let percent_correct = if total == 0 {
        0.0
    } else {
        f64::from(correct) / f64::from(total) * 100.0
    };

    let multiplier = if percent_correct >= 80.0 {
        1.0
    } else if percent_correct >= 60.0 {
        0.8
    } else if percent_correct >= 40.0 {
        0.6
    } else {
        0.4
    };

    let acuity = SnellenRating::closest(starting.decimal() * multiplier);
    VisualAcuityResult {
        acuity,
        decimal: acuity.decimal(),
        log_mar: acuity.log_mar(),
        percent_correct,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcuitySeverity {
    Normal,
    Mild,
    Moderate,
    Severe,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualAcuityAssessment {
    pub status: ScreeningStatus,
    pub severity: AcuitySeverity,
    pub urgency: Urgency,
    pub recommendation: String,
}

/// Grade an acuity against the age norm
///
/// At or above typical passes as normal, at or above the minimum passes as
/// mild, at or above 70% of the minimum refers as moderate, anything worse
/// refers urgently as severe.
pub fn assess_visual_acuity(acuity: SnellenRating, age_group: AgeGroup, eye: Side) -> VisualAcuityAssessment {
    let norm = age_norm(age_group);
    let decimal = acuity.decimal();
    let minimum = norm.min_acceptable.decimal();

    let subject = match eye {
        Side::Both => "Visual acuity",
        Side::Left => "Left eye visual acuity",
        Side::Right => "Right eye visual acuity",
    };

    let (status, severity, urgency, recommendation) = if decimal >= norm.typical.decimal() {
        let who = match eye {
            Side::Both => "Both eyes show",
            Side::Left => "Left eye shows",
            Side::Right => "Right eye shows",
        };
        (
            ScreeningStatus::Pass,
            AcuitySeverity::Normal,
            Urgency::None,
            format!("{} normal visual acuity for age group. Continue regular eye exams.", who),
        )
    } else if decimal >= minimum {
        (
            ScreeningStatus::Pass,
            AcuitySeverity::Mild,
            Urgency::None,
            format!(
                "{} is slightly below typical for age but within acceptable range. Consider \
                 comprehensive eye exam if symptoms present.",
                subject
            ),
        )
    } else if decimal >= minimum * vision::SEVERE_ACUITY_FACTOR {
        (
            ScreeningStatus::Refer,
            AcuitySeverity::Moderate,
            Urgency::Routine,
            format!(
                "{} is below expected for age. Recommend comprehensive eye examination by an \
                 optometrist or ophthalmologist.",
                subject
            ),
        )
    } else {
        (
            ScreeningStatus::Refer,
            AcuitySeverity::Severe,
            Urgency::Urgent,
            format!(
                "{} is significantly reduced. Urgent comprehensive eye examination recommended. \
                 May require corrective lenses or further evaluation.",
                subject
            ),
        )
    };

    VisualAcuityAssessment {
        status,
        severity,
        urgency,
        recommendation,
    }
}

/// Optotype letter height in arcminutes scaled to a test distance in metres
///
/// The 20/20 line subtends 5 arcminutes at the standard 6 m.
pub fn calculate_optotype_size(target: SnellenRating, distance_m: f64) -> f64 {
    const STANDARD_DISTANCE_M: f64 = 6.0;
    let arc_minutes = f64::from(target.size()) / 20.0 * 5.0;
    arc_minutes * distance_m / STANDARD_DISTANCE_M
}

/// Symbol family shown on the chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptotypeSet {
    Snellen,
    TumblingE,
    LeaSymbols,
    Pictures,
}

impl OptotypeSet {
    pub fn symbols(self) -> &'static [&'static str] {
        match self {
            OptotypeSet::Snellen => &["C", "D", "E", "F", "L", "O", "P", "T", "Z"],
            OptotypeSet::TumblingE => &["up", "right", "down", "left"],
            OptotypeSet::LeaSymbols => &["apple", "house", "circle", "square"],
            OptotypeSet::Pictures => &["cat", "dog", "car", "tree", "star", "heart"],
        }
    }

    /// Age-appropriate set: pictures for toddlers, LEA symbols for preschoolers
    pub fn for_age(age_group: AgeGroup) -> Self {
        match age_group {
            AgeGroup::Infant => OptotypeSet::Pictures,
            AgeGroup::Preschool => OptotypeSet::LeaSymbols,
            _ => OptotypeSet::Snellen,
        }
    }
}

/// Random symbol not among `exclude`; `None` when every symbol is excluded
pub fn generate_optotype<R: Rng + ?Sized>(
    set: OptotypeSet,
    exclude: &[&str],
    rng: &mut R,
) -> Option<&'static str> {
    let options: Vec<&'static str> = set
        .symbols()
        .iter()
        .copied()
        .filter(|symbol| !exclude.contains(symbol))
        .collect();
    options.choose(rng).copied()
}
