// src/screening.rs
//! Outcome vocabulary shared by the hearing and vision scorers

use crate::error::{ScreeningError, ScreeningResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Screening verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreeningStatus {
    Pass,
    Refer,
    Inconclusive,
}

/// How soon a referral should be followed up
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    None,
    Routine,
    Urgent,
}

/// Left, right, or both ears/eyes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
    Both,
}

/// Age band used by the age-normed cutoffs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeGroup {
    #[serde(rename = "0-2")]
    Infant,
    #[serde(rename = "3-5")]
    Preschool,
    #[serde(rename = "6-12")]
    SchoolAge,
    #[serde(rename = "13-18")]
    Adolescent,
    #[serde(rename = "18+")]
    Adult,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 5] = [
        AgeGroup::Infant,
        AgeGroup::Preschool,
        AgeGroup::SchoolAge,
        AgeGroup::Adolescent,
        AgeGroup::Adult,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AgeGroup::Infant => "0-2",
            AgeGroup::Preschool => "3-5",
            AgeGroup::SchoolAge => "6-12",
            AgeGroup::Adolescent => "13-18",
            AgeGroup::Adult => "18+",
        }
    }

    /// Under six years old
    pub fn is_pediatric(self) -> bool {
        matches!(self, AgeGroup::Infant | AgeGroup::Preschool)
    }

    /// Band containing an age in whole years
    pub fn from_age(years: u32) -> Self {
        match years {
            0..=2 => AgeGroup::Infant,
            3..=5 => AgeGroup::Preschool,
            6..=12 => AgeGroup::SchoolAge,
            13..=17 => AgeGroup::Adolescent,
            _ => AgeGroup::Adult,
        }
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AgeGroup {
    type Err = ScreeningError;

    fn from_str(s: &str) -> ScreeningResult<Self> {
        AgeGroup::ALL
            .into_iter()
            .find(|group| group.label() == s.trim())
            .ok_or_else(|| ScreeningError::UnknownAgeGroup(s.to_string()))
    }
}
