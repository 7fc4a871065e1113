// src/hearing/calibration.rs
//! Per-device audio calibration
//!
//! An [`AudioCalibrationProfile`] holds the dB corrections found for each test
//! frequency plus a gain per ear. Profiles are produced by the
//! [`CalibrationWizard`], a caller-driven state machine: the caller plays the
//! tone described by [`CalibrationWizard::prompt`], asks the user, and feeds the
//! yes/no answer back through [`CalibrationWizard::answer`].
//!
//! Profiles export to JSON with camelCase keys and the frequency corrections as
//! `[[hz, dB], ...]` pairs.

use super::thresholds::AudiometricFrequency;
use crate::config::constants::calibration;
use crate::config::CalibrationSettings;
use crate::error::{ScreeningError, ScreeningResult};
use crate::screening::Side;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Playback volume (0-1) for a level in dB HL, without device correction
///
/// Maps -10..100 dB HL linearly onto 0..0.8 and clamps to 0..1.
pub fn db_hl_to_volume(db_hl: f64) -> f64 {
    const MIN_DB: f64 = -10.0;
    const MAX_DB: f64 = 100.0;
    const HEADROOM: f64 = 0.8;
    ((db_hl - MIN_DB) / (MAX_DB - MIN_DB) * HEADROOM).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioCalibrationProfile {
    pub device_id: String,
    pub device_name: String,
    pub calibration_date: DateTime<Utc>,
    /// dB added to the requested level at each frequency
    #[serde(with = "correction_pairs")]
    pub frequency_corrections: BTreeMap<AudiometricFrequency, f64>,
    pub left_ear_gain: f64,
    pub right_ear_gain: f64,
    pub validated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_notes: Option<String>,
}

impl AudioCalibrationProfile {
    /// Unvalidated profile with no corrections and unity gains
    pub fn new(
        device_id: impl Into<String>,
        device_name: impl Into<String>,
        calibration_date: DateTime<Utc>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            device_name: device_name.into(),
            calibration_date,
            frequency_corrections: BTreeMap::new(),
            left_ear_gain: 1.0,
            right_ear_gain: 1.0,
            validated: false,
            user_notes: None,
        }
    }

    pub fn age_days(&self, now: DateTime<Utc>) -> f64 {
        (now - self.calibration_date).num_milliseconds() as f64 / 86_400_000.0
    }

    /// Validated and strictly younger than `validity`
    pub fn is_valid_within(&self, now: DateTime<Utc>, validity: Duration) -> bool {
        self.validated && now - self.calibration_date < validity
    }

    /// Validated and less than 30 days old
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.is_valid_within(now, Duration::days(calibration::AUDIO_VALIDITY_DAYS))
    }

    /// Validated and younger than the configured audio validity window
    pub fn is_valid_for(&self, now: DateTime<Utc>, settings: &CalibrationSettings) -> bool {
        self.is_valid_within(now, Duration::days(settings.audio_validity_days))
    }

    /// Gain for one ear; both ears use the mean gain
    pub fn ear_gain(&self, ear: Side) -> f64 {
        match ear {
            Side::Left => self.left_ear_gain,
            Side::Right => self.right_ear_gain,
            Side::Both => (self.left_ear_gain + self.right_ear_gain) / 2.0,
        }
    }

    /// Corrected volume regardless of the validated flag
    fn corrected_volume(&self, frequency: AudiometricFrequency, db_hl: f64, ear: Side) -> f64 {
        let correction = self.frequency_corrections.get(&frequency).copied().unwrap_or(0.0);
        db_hl_to_volume(db_hl + correction) * self.ear_gain(ear)
    }

    /// Playback volume for a tone; unvalidated profiles fall back to the plain mapping
    pub fn apply_calibration(&self, frequency: AudiometricFrequency, db_hl: f64, ear: Side) -> f64 {
        if !self.validated {
            return db_hl_to_volume(db_hl);
        }
        self.corrected_volume(frequency, db_hl, ear)
    }

    /// Pretty-printed JSON export
    pub fn to_json(&self) -> ScreeningResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> ScreeningResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Playback volume with an optional profile
pub fn apply_calibration(
    profile: Option<&AudioCalibrationProfile>,
    frequency: AudiometricFrequency,
    db_hl: f64,
    ear: Side,
) -> f64 {
    match profile {
        Some(profile) => profile.apply_calibration(frequency, db_hl, ear),
        None => db_hl_to_volume(db_hl),
    }
}

mod correction_pairs {
    use super::AudiometricFrequency;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(
        corrections: &BTreeMap<AudiometricFrequency, f64>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(corrections.iter().map(|(f, db)| (f.hz(), *db)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<AudiometricFrequency, f64>, D::Error> {
        let pairs = Vec::<(u32, f64)>::deserialize(deserializer)?;
        pairs
            .into_iter()
            .map(|(hz, db)| {
                AudiometricFrequency::try_from(hz)
                    .map(|f| (f, db))
                    .map_err(D::Error::custom)
            })
            .collect()
    }
}

/// Position in the calibration flow
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "step")]
pub enum CalibrationStep {
    /// Confirm a comfortable reference tone in both ears
    ReferenceVolume,
    /// Ascending search for the level first heard at one frequency
    FrequencySearch {
        frequency: AudiometricFrequency,
        level_db_hl: f64,
    },
    /// Confirm left and right tones sounded equally loud
    EarBalance,
    /// Yes when the left ear was louder
    LouderEar,
    /// Confirm the corrected validation tone sounds right
    Validation,
    Complete,
    Cancelled,
    /// Validation tone rejected; start a new wizard to retry
    Failed,
}

impl CalibrationStep {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CalibrationStep::Complete | CalibrationStep::Cancelled | CalibrationStep::Failed
        )
    }

    /// 1-based stage number out of [`CalibrationWizard::TOTAL_STEPS`]
    pub fn stage(&self) -> u8 {
        match self {
            CalibrationStep::ReferenceVolume => 1,
            CalibrationStep::FrequencySearch { .. } => 2,
            CalibrationStep::EarBalance | CalibrationStep::LouderEar => 3,
            _ => 4,
        }
    }
}

/// Tone to play before asking the current question
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TonePresentation {
    pub frequency_hz: u32,
    /// Playback volume 0-1
    pub volume: f64,
    pub ear: Side,
    pub duration_ms: u32,
}

/// Question for the user at the current step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPrompt {
    pub stage: u8,
    pub total_stages: u8,
    pub message: String,
    /// Tones to play in order before asking
    pub tones: Vec<TonePresentation>,
}

/// Interactive calibration driven by yes/no answers
#[derive(Debug, Clone)]
pub struct CalibrationWizard {
    step: CalibrationStep,
    draft: AudioCalibrationProfile,
    frequency_index: usize,
    cancel_requested: bool,
}

impl CalibrationWizard {
    pub const TOTAL_STEPS: u8 = 4;

    const REFERENCE_FREQUENCY: AudiometricFrequency = AudiometricFrequency::Hz1000;
    const REFERENCE_VOLUME: f64 = 0.5;
    const VALIDATION_LEVEL_DB_HL: f64 = 20.0;

    pub fn new(
        device_id: impl Into<String>,
        device_name: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            step: CalibrationStep::ReferenceVolume,
            draft: AudioCalibrationProfile::new(device_id, device_name, started_at),
            frequency_index: 0,
            cancel_requested: false,
        }
    }

    pub fn step(&self) -> CalibrationStep {
        self.step
    }

    pub fn is_finished(&self) -> bool {
        self.step.is_terminal()
    }

    /// Abort at the next step boundary; the pending answer is discarded
    pub fn cancel(&mut self) {
        if !self.is_finished() {
            self.cancel_requested = true;
        }
    }

    /// Profile under construction
    pub fn draft(&self) -> &AudioCalibrationProfile {
        &self.draft
    }

    /// The validated profile once the wizard completes
    pub fn profile(&self) -> Option<&AudioCalibrationProfile> {
        (self.step == CalibrationStep::Complete).then_some(&self.draft)
    }

    pub fn into_profile(self) -> Option<AudioCalibrationProfile> {
        (self.step == CalibrationStep::Complete).then_some(self.draft)
    }

    /// What to play and ask now, `None` once finished
    pub fn prompt(&self) -> Option<CalibrationPrompt> {
        let reference_tone = |ear| TonePresentation {
            frequency_hz: Self::REFERENCE_FREQUENCY.hz(),
            volume: Self::REFERENCE_VOLUME,
            ear,
            duration_ms: 1500,
        };

        let (message, tones) = match self.step {
            CalibrationStep::ReferenceVolume => (
                "Adjust your device volume so the tone is clear and comfortable in both ears. \
                 Can you hear the tone clearly?"
                    .to_string(),
                vec![TonePresentation {
                    duration_ms: 2000,
                    ..reference_tone(Side::Both)
                }],
            ),
            CalibrationStep::FrequencySearch { frequency, level_db_hl } => (
                format!("Did you hear the {} tone?", frequency),
                vec![TonePresentation {
                    frequency_hz: frequency.hz(),
                    volume: db_hl_to_volume(level_db_hl),
                    ear: Side::Both,
                    duration_ms: 500,
                }],
            ),
            CalibrationStep::EarBalance => (
                "You heard a tone in your left ear, then your right ear. Did they sound equally \
                 loud?"
                    .to_string(),
                vec![reference_tone(Side::Left), reference_tone(Side::Right)],
            ),
            CalibrationStep::LouderEar => (
                "Was the LEFT ear louder? Answer no if the right ear was louder.".to_string(),
                Vec::new(),
            ),
            CalibrationStep::Validation => (
                "Does the tone sound clear, balanced between both ears and at a comfortable \
                 volume?"
                    .to_string(),
                vec![TonePresentation {
                    volume: self.draft.corrected_volume(
                        Self::REFERENCE_FREQUENCY,
                        Self::VALIDATION_LEVEL_DB_HL,
                        Side::Both,
                    ),
                    ..reference_tone(Side::Both)
                }],
            ),
            _ => return None,
        };

        Some(CalibrationPrompt {
            stage: self.step.stage(),
            total_stages: Self::TOTAL_STEPS,
            message,
            tones,
        })
    }

    /// Advance with the user's answer to the current prompt
    pub fn answer(&mut self, yes: bool) -> ScreeningResult<CalibrationStep> {
        if self.step.is_terminal() {
            return Err(ScreeningError::Calibration(format!(
                "wizard already finished ({:?})",
                self.step
            )));
        }
        if self.cancel_requested {
            info!("Calibration cancelled");
            self.step = CalibrationStep::Cancelled;
            return Ok(self.step);
        }

        let current = self.step;
        self.step = match current {
            CalibrationStep::ReferenceVolume if yes => self.search_step(0),
            CalibrationStep::ReferenceVolume => {
                info!("Reference tone not confirmed, calibration cancelled");
                CalibrationStep::Cancelled
            }
            CalibrationStep::FrequencySearch { frequency, level_db_hl } => {
                let next_level = level_db_hl + calibration::AUDIO_SEARCH_STEP_DB;
                if !yes && next_level <= calibration::AUDIO_SEARCH_MAX_DB_HL {
                    CalibrationStep::FrequencySearch {
                        frequency,
                        level_db_hl: next_level,
                    }
                } else {
                    // A tone never heard records the level one step past the search ceiling
                    let heard_at = if yes { level_db_hl } else { next_level };
                    if !yes {
                        warn!(frequency = frequency.hz(), "Calibration tone never heard");
                    }
                    self.draft
                        .frequency_corrections
                        .insert(frequency, calibration::AUDIO_REFERENCE_DB_HL - heard_at);
                    self.frequency_index += 1;
                    self.search_step(self.frequency_index)
                }
            }
            CalibrationStep::EarBalance if yes => {
                self.draft.left_ear_gain = 1.0;
                self.draft.right_ear_gain = 1.0;
                CalibrationStep::Validation
            }
            CalibrationStep::EarBalance => CalibrationStep::LouderEar,
            CalibrationStep::LouderEar => {
                let (left, right) = if yes {
                    (calibration::EAR_BALANCE_CUT, calibration::EAR_BALANCE_BOOST)
                } else {
                    (calibration::EAR_BALANCE_BOOST, calibration::EAR_BALANCE_CUT)
                };
                self.draft.left_ear_gain = left;
                self.draft.right_ear_gain = right;
                CalibrationStep::Validation
            }
            CalibrationStep::Validation if yes => {
                self.draft.validated = true;
                info!(
                    device = %self.draft.device_name,
                    corrections = self.draft.frequency_corrections.len(),
                    "Audio calibration complete"
                );
                CalibrationStep::Complete
            }
            CalibrationStep::Validation => {
                warn!("Calibration validation rejected");
                CalibrationStep::Failed
            }
            terminal => terminal,
        };

        Ok(self.step)
    }

    fn search_step(&self, index: usize) -> CalibrationStep {
        match AudiometricFrequency::ALL.get(index) {
            Some(&frequency) => CalibrationStep::FrequencySearch {
                frequency,
                level_db_hl: calibration::AUDIO_SEARCH_START_DB_HL,
            },
            None => CalibrationStep::EarBalance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    /// Answer yes once the search level reaches `heard_at`
    fn run_search(wizard: &mut CalibrationWizard, heard_at: f64) {
        while let CalibrationStep::FrequencySearch { level_db_hl, .. } = wizard.step() {
            wizard.answer(level_db_hl >= heard_at).unwrap();
        }
    }

    #[test]
    fn test_db_hl_to_volume() {
        assert_eq!(db_hl_to_volume(-10.0), 0.0);
        assert_eq!(db_hl_to_volume(100.0), 0.8);
        assert!((db_hl_to_volume(45.0) - 0.4).abs() < 1e-12);
        assert_eq!(db_hl_to_volume(-40.0), 0.0);
        assert_eq!(db_hl_to_volume(200.0), 1.0);
    }

    #[test]
    fn test_full_wizard_flow() {
        let mut wizard = CalibrationWizard::new("dev-1", "Studio Headphones", start());
        assert_eq!(wizard.prompt().unwrap().stage, 1);
        wizard.answer(true).unwrap();

        run_search(&mut wizard, 10.0);
        assert_eq!(wizard.step(), CalibrationStep::EarBalance);
        assert_eq!(wizard.prompt().unwrap().tones.len(), 2);
        let corrections = &wizard.draft().frequency_corrections;
        assert_eq!(corrections.len(), 6);
        assert!(corrections.values().all(|&c| c == -10.0));

        assert_eq!(wizard.answer(false).unwrap(), CalibrationStep::LouderEar);
        assert_eq!(wizard.answer(true).unwrap(), CalibrationStep::Validation);
        assert_eq!(wizard.draft().left_ear_gain, 0.9);
        assert_eq!(wizard.draft().right_ear_gain, 1.1);

        assert_eq!(wizard.answer(true).unwrap(), CalibrationStep::Complete);
        assert!(wizard.is_finished());
        assert!(wizard.prompt().is_none());
        let profile = wizard.into_profile().unwrap();
        assert!(profile.validated);
        assert!(profile.is_valid_at(start() + Duration::days(29)));
        assert!(!profile.is_valid_at(start() + Duration::days(30)));

        let mut settings = CalibrationSettings::default();
        assert!(profile.is_valid_for(start() + Duration::days(20), &settings));
        settings.audio_validity_days = 14;
        assert!(!profile.is_valid_for(start() + Duration::days(20), &settings));
    }

    #[test]
    fn test_tone_never_heard() {
        let mut wizard = CalibrationWizard::new("dev", "Speaker", start());
        wizard.answer(true).unwrap();
        run_search(&mut wizard, f64::INFINITY);
        assert!(wizard
            .draft()
            .frequency_corrections
            .values()
            .all(|&c| c == -65.0));
    }

    #[test]
    fn test_search_levels_ascend_in_five_db_steps() {
        let mut wizard = CalibrationWizard::new("dev", "Speaker", start());
        wizard.answer(true).unwrap();
        wizard.answer(false).unwrap();
        assert_eq!(
            wizard.step(),
            CalibrationStep::FrequencySearch {
                frequency: AudiometricFrequency::Hz250,
                level_db_hl: -5.0
            }
        );
        wizard.answer(true).unwrap();
        assert_eq!(wizard.draft().frequency_corrections[&AudiometricFrequency::Hz250], 5.0);
    }

    #[test]
    fn test_declined_reference_cancels() {
        let mut wizard = CalibrationWizard::new("dev", "Speaker", start());
        assert_eq!(wizard.answer(false).unwrap(), CalibrationStep::Cancelled);
        assert!(wizard.profile().is_none());
        assert!(matches!(wizard.answer(true), Err(ScreeningError::Calibration(_))));
    }

    #[test]
    fn test_cancel_applies_at_next_answer() {
        let mut wizard = CalibrationWizard::new("dev", "Speaker", start());
        wizard.answer(true).unwrap();
        wizard.cancel();
        assert_eq!(wizard.answer(true).unwrap(), CalibrationStep::Cancelled);
        assert!(wizard.draft().frequency_corrections.is_empty());
    }

    #[test]
    fn test_rejected_validation_fails() {
        let mut wizard = CalibrationWizard::new("dev", "Speaker", start());
        wizard.answer(true).unwrap();
        run_search(&mut wizard, 0.0);
        wizard.answer(true).unwrap();
        assert_eq!(wizard.answer(false).unwrap(), CalibrationStep::Failed);
        assert!(wizard.into_profile().is_none());
    }

    #[test]
    fn test_apply_calibration() {
        let mut profile = AudioCalibrationProfile::new("dev", "Speaker", start());
        profile.frequency_corrections.insert(AudiometricFrequency::Hz1000, 10.0);
        profile.left_ear_gain = 0.9;
        profile.right_ear_gain = 1.1;

        // Unvalidated profiles are ignored
        assert_eq!(
            profile.apply_calibration(AudiometricFrequency::Hz1000, 45.0, Side::Left),
            db_hl_to_volume(45.0)
        );

        profile.validated = true;
        let left = profile.apply_calibration(AudiometricFrequency::Hz1000, 45.0, Side::Left);
        assert!((left - db_hl_to_volume(55.0) * 0.9).abs() < 1e-12);
        let both = profile.apply_calibration(AudiometricFrequency::Hz1000, 45.0, Side::Both);
        assert!((both - db_hl_to_volume(55.0)).abs() < 1e-12);
        let uncorrected = profile.apply_calibration(AudiometricFrequency::Hz500, 45.0, Side::Right);
        assert!((uncorrected - db_hl_to_volume(45.0) * 1.1).abs() < 1e-12);

        assert_eq!(
            apply_calibration(None, AudiometricFrequency::Hz500, 45.0, Side::Left),
            db_hl_to_volume(45.0)
        );
    }

    #[test]
    fn test_json_layout() {
        let mut profile = AudioCalibrationProfile::new("dev", "Speaker", start());
        profile.frequency_corrections.insert(AudiometricFrequency::Hz250, -5.0);
        let json = profile.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["deviceId"], "dev");
        assert_eq!(value["frequencyCorrections"], serde_json::json!([[250, -5.0]]));
        assert!(value.get("userNotes").is_none());
    }

    #[test]
    fn test_import_rejects_unknown_frequency() {
        let json = r#"{
            "deviceId": "d", "deviceName": "n", "calibrationDate": "2024-03-01T09:00:00.000Z",
            "frequencyCorrections": [[3000, 5]], "leftEarGain": 1, "rightEarGain": 1,
            "validated": true
        }"#;
        assert!(matches!(
            AudioCalibrationProfile::from_json(json),
            Err(ScreeningError::ProfileFormat(_))
        ));
    }
}
