// src/hearing/thresholds.rs
//! Audiometric threshold maps, averages, severity bands and audiogram shape

use crate::error::{ScreeningError, ScreeningResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One of the six standard audiometric test frequencies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum AudiometricFrequency {
    Hz250,
    Hz500,
    Hz1000,
    Hz2000,
    Hz4000,
    Hz8000,
}

impl AudiometricFrequency {
    /// Ascending frequency order
    pub const ALL: [AudiometricFrequency; 6] = [
        AudiometricFrequency::Hz250,
        AudiometricFrequency::Hz500,
        AudiometricFrequency::Hz1000,
        AudiometricFrequency::Hz2000,
        AudiometricFrequency::Hz4000,
        AudiometricFrequency::Hz8000,
    ];

    /// Clinical presentation order: 1 kHz first, then up, then down
    pub const TEST_ORDER: [AudiometricFrequency; 6] = [
        AudiometricFrequency::Hz1000,
        AudiometricFrequency::Hz2000,
        AudiometricFrequency::Hz4000,
        AudiometricFrequency::Hz8000,
        AudiometricFrequency::Hz500,
        AudiometricFrequency::Hz250,
    ];

    pub fn hz(self) -> u32 {
        match self {
            AudiometricFrequency::Hz250 => 250,
            AudiometricFrequency::Hz500 => 500,
            AudiometricFrequency::Hz1000 => 1000,
            AudiometricFrequency::Hz2000 => 2000,
            AudiometricFrequency::Hz4000 => 4000,
            AudiometricFrequency::Hz8000 => 8000,
        }
    }
}

impl TryFrom<u32> for AudiometricFrequency {
    type Error = ScreeningError;

    fn try_from(hz: u32) -> ScreeningResult<Self> {
        AudiometricFrequency::ALL
            .into_iter()
            .find(|f| f.hz() == hz)
            .ok_or(ScreeningError::InvalidFrequency(hz))
    }
}

impl From<AudiometricFrequency> for u32 {
    fn from(frequency: AudiometricFrequency) -> u32 {
        frequency.hz()
    }
}

impl fmt::Display for AudiometricFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz", self.hz())
    }
}

/// Hearing level in dB HL per test frequency, one entry per frequency
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThresholdMap {
    thresholds: BTreeMap<AudiometricFrequency, f64>,
}

impl ThresholdMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw `(Hz, dB HL)` pairs; later pairs overwrite earlier ones
    pub fn from_pairs(pairs: &[(u32, f64)]) -> ScreeningResult<Self> {
        let mut map = Self::new();
        for &(hz, level) in pairs {
            map.insert(AudiometricFrequency::try_from(hz)?, level);
        }
        Ok(map)
    }

    /// Record a threshold, returning the one it replaced
    pub fn insert(&mut self, frequency: AudiometricFrequency, level_db_hl: f64) -> Option<f64> {
        self.thresholds.insert(frequency, level_db_hl)
    }

    pub fn get(&self, frequency: AudiometricFrequency) -> Option<f64> {
        self.thresholds.get(&frequency).copied()
    }

    pub fn len(&self) -> usize {
        self.thresholds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }

    /// Entries in ascending frequency order
    pub fn iter(&self) -> impl Iterator<Item = (AudiometricFrequency, f64)> + '_ {
        self.thresholds.iter().map(|(&f, &level)| (f, level))
    }

    /// Mean over the given frequencies that are present; `0` if none are
    fn average_of(&self, frequencies: &[AudiometricFrequency]) -> f64 {
        let values: Vec<f64> = frequencies.iter().filter_map(|&f| self.get(f)).collect();
        if values.is_empty() {
            return 0.0;
        }
        values.iter().sum::<f64>() / values.len() as f64
    }

    /// Level used by the shape recognizer, absent frequencies read as 0 dB HL
    fn level_or_zero(&self, frequency: AudiometricFrequency) -> f64 {
        self.get(frequency).unwrap_or(0.0)
    }
}

impl FromIterator<(AudiometricFrequency, f64)> for ThresholdMap {
    fn from_iter<I: IntoIterator<Item = (AudiometricFrequency, f64)>>(iter: I) -> Self {
        Self {
            thresholds: iter.into_iter().collect(),
        }
    }
}

/// Pure-tone average over 500, 1000 and 2000 Hz
pub fn calculate_pta(thresholds: &ThresholdMap) -> f64 {
    use AudiometricFrequency::*;
    thresholds.average_of(&[Hz500, Hz1000, Hz2000])
}

/// High-frequency average over 2000, 4000 and 8000 Hz
pub fn calculate_hfa(thresholds: &ThresholdMap) -> f64 {
    use AudiometricFrequency::*;
    thresholds.average_of(&[Hz2000, Hz4000, Hz8000])
}

/// Severity band of a pure-tone average
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HearingLossCategory {
    Normal,
    Mild,
    Moderate,
    ModeratelySevere,
    Severe,
    Profound,
}

impl HearingLossCategory {
    /// Band for a PTA; each band is closed at its upper bound
    pub fn from_pta(pta: f64) -> Self {
        if pta <= 25.0 {
            HearingLossCategory::Normal
        } else if pta <= 40.0 {
            HearingLossCategory::Mild
        } else if pta <= 60.0 {
            HearingLossCategory::Moderate
        } else if pta <= 80.0 {
            HearingLossCategory::ModeratelySevere
        } else if pta <= 90.0 {
            HearingLossCategory::Severe
        } else {
            HearingLossCategory::Profound
        }
    }

    /// Coarse four-step severity; every band past moderate reads as severe
    pub fn severity(self) -> Severity {
        match self {
            HearingLossCategory::Normal => Severity::Normal,
            HearingLossCategory::Mild => Severity::Mild,
            HearingLossCategory::Moderate => Severity::Moderate,
            _ => Severity::Severe,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            HearingLossCategory::Normal => "Normal Hearing",
            HearingLossCategory::Mild => "Mild Hearing Loss",
            HearingLossCategory::Moderate => "Moderate Hearing Loss",
            HearingLossCategory::ModeratelySevere => "Moderately Severe Hearing Loss",
            HearingLossCategory::Severe => "Severe Hearing Loss",
            HearingLossCategory::Profound => "Profound Hearing Loss",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Normal,
    Mild,
    Moderate,
    Severe,
}

/// Severity band with its patient-facing text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HearingLossClassification {
    pub category: HearingLossCategory,
    pub severity: Severity,
    pub label: String,
    pub description: String,
    pub recommendation: String,
}

pub fn classify_hearing_loss(pta: f64) -> HearingLossClassification {
    let category = HearingLossCategory::from_pta(pta);
    let (description, recommendation) = match category {
        HearingLossCategory::Normal => (
            "No hearing loss detected. Soft speech is heard without difficulty.",
            "No intervention needed. Continue routine hearing checks.",
        ),
        HearingLossCategory::Mild => (
            "Difficulty hearing soft speech, especially in noisy places.",
            "Monitor hearing and consider a full hearing evaluation.",
        ),
        HearingLossCategory::Moderate => (
            "Difficulty following conversation at normal speaking levels.",
            "A hearing aid evaluation is recommended.",
        ),
        HearingLossCategory::ModeratelySevere => (
            "Conversation is hard to follow without amplification.",
            "Hearing aid fitting and audiological follow-up recommended.",
        ),
        HearingLossCategory::Severe => (
            "Only loud speech is heard; group conversation is very difficult.",
            "Refer to an audiologist for powerful amplification options.",
        ),
        HearingLossCategory::Profound => (
            "Even very loud sounds may not be heard.",
            "Refer to an audiologist to discuss cochlear implant candidacy.",
        ),
    };

    HearingLossClassification {
        category,
        severity: category.severity(),
        label: category.label().to_string(),
        description: description.to_string(),
        recommendation: recommendation.to_string(),
    }
}

/// Audiogram configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudiogramPattern {
    Flat,
    Sloping,
    Rising,
    Notched,
    CookieBite,
    Irregular,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudiogramAssessment {
    pub pattern: AudiogramPattern,
    pub description: String,
    pub likely_causes: Vec<String>,
}

/// Recognize the audiogram shape
///
/// Rules are tried in order: 4 kHz notch deeper than 10 dB against the 2k/8k
/// average, mid-band dip deeper than 15 dB against the edge bands, slope above
/// 20 dB (sloping) or below -20 dB (rising), slope within 10 dB (flat). Anything
/// else is irregular. Missing frequencies read as 0 dB HL here.
pub fn assess_audiogram_pattern(thresholds: &ThresholdMap) -> AudiogramAssessment {
    use AudiometricFrequency::*;
    let level = |f| thresholds.level_or_zero(f);

    let low = (level(Hz250) + level(Hz500)) / 2.0;
    let high = (level(Hz4000) + level(Hz8000)) / 2.0;
    let slope = high - low;

    let notch_depth = level(Hz4000) - (level(Hz2000) + level(Hz8000)) / 2.0;
    let mid = (level(Hz1000) + level(Hz2000)) / 2.0;
    let cookie_bite = mid - (low + high) / 2.0;

    let (pattern, description, causes): (_, _, &[&str]) = if notch_depth > 10.0 {
        (
            AudiogramPattern::Notched,
            "Notched audiogram with loss at 4000 Hz, typical of noise-induced hearing loss",
            &["noise-induced hearing loss", "acoustic trauma"],
        )
    } else if cookie_bite > 15.0 {
        (
            AudiogramPattern::CookieBite,
            "Cookie bite pattern with mid-frequency hearing loss, may indicate genetic hearing loss",
            &["genetic hearing loss"],
        )
    } else if slope > 20.0 {
        (
            AudiogramPattern::Sloping,
            "Sloping pattern with high-frequency hearing loss, common with age-related hearing loss",
            &["age-related hearing loss", "noise exposure", "ototoxic medication"],
        )
    } else if slope < -20.0 {
        (
            AudiogramPattern::Rising,
            "Rising pattern with low-frequency hearing loss, a less common configuration",
            &["Meniere's disease", "middle ear disorder"],
        )
    } else if slope.abs() < 10.0 {
        (
            AudiogramPattern::Flat,
            "Flat audiogram with consistent thresholds across frequencies",
            &[],
        )
    } else {
        (AudiogramPattern::Irregular, "Irregular audiogram pattern", &[])
    };

    AudiogramAssessment {
        pattern,
        description: description.to_string(),
        likely_causes: causes.iter().map(|c| c.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(u32, f64)]) -> ThresholdMap {
        ThresholdMap::from_pairs(pairs).unwrap()
    }

    #[test]
    fn test_frequency_conversion() {
        assert_eq!(AudiometricFrequency::try_from(4000).unwrap(), AudiometricFrequency::Hz4000);
        assert!(matches!(
            AudiometricFrequency::try_from(3000),
            Err(ScreeningError::InvalidFrequency(3000))
        ));
        assert!(ThresholdMap::from_pairs(&[(500, 10.0), (750, 20.0)]).is_err());
    }

    #[test]
    fn test_pta_ignores_missing_entries() {
        assert_eq!(calculate_pta(&map(&[(500, 20.0), (1000, 30.0), (2000, 40.0)])), 30.0);
        assert_eq!(calculate_pta(&map(&[(500, 20.0), (2000, 40.0), (8000, 90.0)])), 30.0);
        assert_eq!(calculate_pta(&ThresholdMap::new()), 0.0);
    }

    #[test]
    fn test_hfa() {
        assert_eq!(calculate_hfa(&map(&[(2000, 20.0), (4000, 40.0), (8000, 60.0)])), 40.0);
        assert_eq!(calculate_hfa(&map(&[(4000, 50.0)])), 50.0);
        assert_eq!(calculate_hfa(&map(&[(500, 50.0)])), 0.0);
    }

    #[test]
    fn test_classification_boundaries() {
        use HearingLossCategory::*;
        let cases = [
            (-10.0, Normal),
            (25.0, Normal),
            (26.0, Mild),
            (40.0, Mild),
            (41.0, Moderate),
            (60.0, Moderate),
            (61.0, ModeratelySevere),
            (80.0, ModeratelySevere),
            (81.0, Severe),
            (90.0, Severe),
            (91.0, Profound),
            (120.0, Profound),
        ];
        for (pta, expected) in cases {
            assert_eq!(classify_hearing_loss(pta).category, expected, "pta {}", pta);
        }
        assert_eq!(HearingLossCategory::from_pta(25.5), Mild);
        assert_eq!(classify_hearing_loss(70.0).severity, Severity::Severe);
        assert_eq!(classify_hearing_loss(35.0).severity, Severity::Mild);
    }

    #[test]
    fn test_classification_text() {
        let normal = classify_hearing_loss(10.0);
        assert_eq!(normal.label, "Normal Hearing");
        assert!(normal.description.contains("No hearing loss"));
        assert!(normal.recommendation.contains("No intervention"));
        assert!(classify_hearing_loss(50.0).recommendation.contains("hearing aid"));
        assert!(classify_hearing_loss(85.0).recommendation.contains("audiologist"));
        assert!(classify_hearing_loss(100.0).recommendation.contains("audiologist"));
    }

    #[test]
    fn test_notched_pattern() {
        let thresholds = map(&[
            (250, 15.0),
            (500, 15.0),
            (1000, 20.0),
            (2000, 25.0),
            (4000, 55.0),
            (8000, 30.0),
        ]);
        let result = assess_audiogram_pattern(&thresholds);
        assert_eq!(result.pattern, AudiogramPattern::Notched);
        assert!(result.description.contains("noise-induced"));
    }

    #[test]
    fn test_cookie_bite_pattern() {
        let thresholds = map(&[
            (250, 10.0),
            (500, 10.0),
            (1000, 40.0),
            (2000, 40.0),
            (4000, 10.0),
            (8000, 10.0),
        ]);
        let result = assess_audiogram_pattern(&thresholds);
        assert_eq!(result.pattern, AudiogramPattern::CookieBite);
        assert!(result.description.contains("mid-frequency"));
    }

    #[test]
    fn test_sloping_and_rising_patterns() {
        let sloping = map(&[
            (250, 10.0),
            (500, 10.0),
            (1000, 15.0),
            (2000, 20.0),
            (4000, 40.0),
            (8000, 50.0),
        ]);
        let result = assess_audiogram_pattern(&sloping);
        assert_eq!(result.pattern, AudiogramPattern::Sloping);
        assert!(result.description.contains("high-frequency"));
        assert!(result.likely_causes.iter().any(|c| c == "age-related hearing loss"));

        let rising = map(&[
            (250, 50.0),
            (500, 45.0),
            (1000, 35.0),
            (2000, 25.0),
            (4000, 20.0),
            (8000, 15.0),
        ]);
        let result = assess_audiogram_pattern(&rising);
        assert_eq!(result.pattern, AudiogramPattern::Rising);
        assert!(result.description.contains("low-frequency"));
    }

    #[test]
    fn test_flat_and_irregular_patterns() {
        let flat: ThresholdMap = AudiometricFrequency::ALL.iter().map(|&f| (f, 30.0)).collect();
        let result = assess_audiogram_pattern(&flat);
        assert_eq!(result.pattern, AudiogramPattern::Flat);
        assert!(result.description.contains("consistent"));

        let irregular = map(&[
            (250, 10.0),
            (500, 10.0),
            (1000, 15.0),
            (2000, 20.0),
            (4000, 25.0),
            (8000, 25.0),
        ]);
        assert_eq!(assess_audiogram_pattern(&irregular).pattern, AudiogramPattern::Irregular);
    }

    #[test]
    fn test_threshold_map_json_uses_hz_keys() {
        let thresholds = map(&[(500, 15.0), (4000, 40.0)]);
        let json = serde_json::to_string(&thresholds).unwrap();
        assert_eq!(json, r#"{"500":15.0,"4000":40.0}"#);
        let back: ThresholdMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, thresholds);
    }
}
