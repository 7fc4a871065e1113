// src/hearing/pure_tone.rs
//! Adaptive pure-tone threshold search (modified Hughson-Westlake)
//!
//! A [`PureToneTest`] tracks one ear at one frequency. The caller plays a tone
//! at [`PureToneTest::current_level`], reports whether it was heard, and the
//! test moves 10 dB down after a response or 5 dB up after a miss. The
//! threshold is found once enough presentations have been made and at least
//! two of the last three ascending presentations were heard.
//!
//! [`AudiometrySession`] sequences one test per (ear, frequency) and collects a
//! [`ThresholdMap`] per ear.

use super::thresholds::{AudiometricFrequency, ThresholdMap};
use crate::config::constants::hearing;
use crate::config::HearingSettings;
use crate::screening::Side;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Direction of travel of the presentation level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchPhase {
    Ascending,
    Descending,
}

/// One tone presentation and the listener's response
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Presentation {
    pub level_db_hl: f64,
    pub phase: SearchPhase,
    pub heard: bool,
}

/// State of a test after a response
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum TestProgress {
    /// Present the next tone at this level
    Continue { level_db_hl: f64 },
    /// Threshold located
    ThresholdFound { threshold_db_hl: f64 },
    /// Presentation cap reached without a stable threshold
    Exhausted,
}

/// Threshold search for one ear at one frequency
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PureToneTest {
    frequency: AudiometricFrequency,
    ear: Side,
    current_level: f64,
    phase: SearchPhase,
    presentations: Vec<Presentation>,
    step_down_db: f64,
    step_up_db: f64,
    min_presentations: usize,
    max_presentations: usize,
}

impl PureToneTest {
    pub fn new(frequency: AudiometricFrequency, ear: Side) -> Self {
        Self::with_settings(frequency, ear, &HearingSettings::default())
    }

    pub fn with_settings(frequency: AudiometricFrequency, ear: Side, settings: &HearingSettings) -> Self {
        Self {
            frequency,
            ear,
            current_level: clamp_level(settings.start_level_db_hl),
            phase: SearchPhase::Ascending,
            presentations: Vec::new(),
            step_down_db: settings.step_down_db,
            step_up_db: settings.step_up_db,
            min_presentations: settings.min_presentations,
            max_presentations: settings.max_presentations,
        }
    }

    pub fn frequency(&self) -> AudiometricFrequency {
        self.frequency
    }

    pub fn ear(&self) -> Side {
        self.ear
    }

    /// Level at which the next tone should be presented
    pub fn current_level(&self) -> f64 {
        self.current_level
    }

    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    pub fn presentations(&self) -> &[Presentation] {
        &self.presentations
    }

    /// Responses in presentation order
    pub fn responses(&self) -> Vec<bool> {
        self.presentations.iter().map(|p| p.heard).collect()
    }

    /// Record the response to a tone at the current level
    ///
    /// Once the test is complete further responses are ignored and the
    /// terminal state is returned again.
    pub fn present_tone(&mut self, heard: bool) -> TestProgress {
        let progress = self.progress();
        if !matches!(progress, TestProgress::Continue { .. }) {
            return progress;
        }

        self.presentations.push(Presentation {
            level_db_hl: self.current_level,
            phase: self.phase,
            heard,
        });

        let (next_phase, delta) = match (self.phase, heard) {
            (SearchPhase::Ascending, true) => (SearchPhase::Descending, -self.step_down_db),
            (SearchPhase::Ascending, false) => (SearchPhase::Ascending, self.step_up_db),
            (SearchPhase::Descending, false) => (SearchPhase::Ascending, self.step_up_db),
            (SearchPhase::Descending, true) => (SearchPhase::Descending, -self.step_down_db),
        };
        self.phase = next_phase;
        self.current_level = clamp_level(self.current_level + delta);

        debug!(
            frequency = self.frequency.hz(),
            ear = ?self.ear,
            heard,
            next_level = self.current_level,
            "Tone presented"
        );

        self.progress()
    }

    /// Enough presentations and at least two of the last three ascending ones heard
    pub fn is_threshold_found(&self) -> bool {
        self.threshold().is_some()
    }

    /// Presentation cap reached without a threshold
    pub fn is_exhausted(&self) -> bool {
        self.threshold().is_none() && self.presentations.len() >= self.max_presentations
    }

    pub fn is_complete(&self) -> bool {
        self.is_threshold_found() || self.is_exhausted()
    }

    /// Lowest level heard among the last three ascending presentations
    ///
    /// Two responses at the floor level also settle the threshold there, since
    /// the level cannot go lower.
    pub fn threshold(&self) -> Option<f64> {
        if self.presentations.len() < self.min_presentations {
            return None;
        }

        let floor_hits = self
            .presentations
            .iter()
            .filter(|p| p.heard && p.level_db_hl <= hearing::MIN_LEVEL_DB_HL)
            .count();
        if floor_hits >= 2 {
            return Some(hearing::MIN_LEVEL_DB_HL);
        }

        let ascending: Vec<&Presentation> = self
            .presentations
            .iter()
            .filter(|p| p.phase == SearchPhase::Ascending)
            .collect();
        let recent = &ascending[ascending.len().saturating_sub(3)..];
        let heard: Vec<f64> = recent.iter().filter(|p| p.heard).map(|p| p.level_db_hl).collect();

        if heard.len() >= 2 {
            heard.into_iter().reduce(f64::min)
        } else {
            None
        }
    }

    /// Current state without recording a response
    pub fn progress(&self) -> TestProgress {
        match self.threshold() {
            Some(threshold_db_hl) => TestProgress::ThresholdFound { threshold_db_hl },
            None if self.presentations.len() >= self.max_presentations => TestProgress::Exhausted,
            None => TestProgress::Continue {
                level_db_hl: self.current_level,
            },
        }
    }
}

fn clamp_level(level: f64) -> f64 {
    level.clamp(hearing::MIN_LEVEL_DB_HL, hearing::MAX_LEVEL_DB_HL)
}

/// Tone the caller should play next
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToneInstruction {
    pub ear: Side,
    pub frequency: AudiometricFrequency,
    pub level_db_hl: f64,
}

/// Full audiogram run over a list of ears and frequencies
///
/// Ears are tested in order, each through every frequency, before moving on.
#[derive(Debug, Clone)]
pub struct AudiometrySession {
    plan: Vec<(Side, AudiometricFrequency)>,
    position: usize,
    current: Option<PureToneTest>,
    settings: HearingSettings,
    results: BTreeMap<Side, ThresholdMap>,
    unresolved: Vec<(Side, AudiometricFrequency)>,
}

impl AudiometrySession {
    pub fn new(ears: &[Side], frequencies: &[AudiometricFrequency], settings: HearingSettings) -> Self {
        let plan: Vec<(Side, AudiometricFrequency)> = ears
            .iter()
            .flat_map(|&ear| frequencies.iter().map(move |&f| (ear, f)))
            .collect();
        let current = plan
            .first()
            .map(|&(ear, frequency)| PureToneTest::with_settings(frequency, ear, &settings));

        info!(tests = plan.len(), "Starting audiometry session");

        Self {
            plan,
            position: 0,
            current,
            settings,
            results: BTreeMap::new(),
            unresolved: Vec::new(),
        }
    }

    /// Both ears, left first, at every frequency in clinical order
    pub fn standard(settings: HearingSettings) -> Self {
        Self::new(
            &[Side::Left, Side::Right],
            &AudiometricFrequency::TEST_ORDER,
            settings,
        )
    }

    /// Tone to present now, `None` once every test has finished
    pub fn current_instruction(&self) -> Option<ToneInstruction> {
        self.current.as_ref().map(|test| ToneInstruction {
            ear: test.ear(),
            frequency: test.frequency(),
            level_db_hl: test.current_level(),
        })
    }

    /// Record the listener's response and return the next instruction
    pub fn record_response(&mut self, heard: bool) -> Option<ToneInstruction> {
        let test = self.current.as_mut()?;
        let (ear, frequency) = (test.ear(), test.frequency());

        match test.present_tone(heard) {
            TestProgress::Continue { .. } => {}
            TestProgress::ThresholdFound { threshold_db_hl } => {
                info!(ear = ?ear, frequency = frequency.hz(), threshold_db_hl, "Threshold found");
                self.results.entry(ear).or_default().insert(frequency, threshold_db_hl);
                self.advance();
            }
            TestProgress::Exhausted => {
                warn!(ear = ?ear, frequency = frequency.hz(), "No stable threshold within presentation cap");
                self.unresolved.push((ear, frequency));
                self.advance();
            }
        }

        self.current_instruction()
    }

    fn advance(&mut self) {
        self.position += 1;
        self.current = self
            .plan
            .get(self.position)
            .map(|&(ear, frequency)| PureToneTest::with_settings(frequency, ear, &self.settings));
    }

    pub fn is_complete(&self) -> bool {
        self.current.is_none()
    }

    /// Whether a measured room level allows testing under this session's settings
    pub fn room_is_quiet(&self, level_db: f64) -> bool {
        super::ambient::is_quiet_enough(level_db, self.settings.quiet_room_db)
    }

    /// Fraction of planned tests finished, 0.0-1.0
    pub fn progress(&self) -> f64 {
        if self.plan.is_empty() {
            return 1.0;
        }
        self.position.min(self.plan.len()) as f64 / self.plan.len() as f64
    }

    /// Thresholds found so far for one ear
    pub fn thresholds(&self, ear: Side) -> Option<&ThresholdMap> {
        self.results.get(&ear)
    }

    /// (ear, frequency) pairs that ended without a threshold
    pub fn unresolved(&self) -> &[(Side, AudiometricFrequency)] {
        &self.unresolved
    }
}
