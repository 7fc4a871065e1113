// src/config/mod.rs
//! Screening configuration with serde defaults and consistency checks

pub mod constants;
pub mod loader;

pub use constants::*;
pub use loader::{ConfigError, ConfigLoader};

use serde::{Deserialize, Serialize};

/// Complete screening configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct ScreeningConfig {
    #[serde(default)]
    pub rppg: RppgSettings,
    #[serde(default)]
    pub hearing: HearingSettings,
    #[serde(default)]
    pub vision: VisionSettings,
    #[serde(default)]
    pub calibration: CalibrationSettings,
}

/// Camera vital-signs engine settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RppgSettings {
    #[serde(default = "defaults::sample_rate_hz")]
    pub sample_rate_hz: f64,

    /// Rolling window cap; oldest samples are evicted beyond this
    #[serde(default = "defaults::max_buffer_samples")]
    pub max_buffer_samples: usize,

    #[serde(default = "defaults::min_measurement_samples")]
    pub min_measurement_samples: usize,

    #[serde(default = "defaults::min_quality_samples")]
    pub min_quality_samples: usize,
}

/// Pure-tone audiometry settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct HearingSettings {
    #[serde(default = "defaults::start_level_db_hl")]
    pub start_level_db_hl: f64,

    #[serde(default = "defaults::step_down_db")]
    pub step_down_db: f64,

    #[serde(default = "defaults::step_up_db")]
    pub step_up_db: f64,

    #[serde(default = "defaults::min_presentations")]
    pub min_presentations: usize,

    #[serde(default = "defaults::max_presentations")]
    pub max_presentations: usize,

    #[serde(default = "defaults::quiet_room_db")]
    pub quiet_room_db: f64,
}

/// Vision screening settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct VisionSettings {
    /// Photoscreens below this confidence cannot pass
    #[serde(default = "defaults::photoscreen_min_confidence")]
    pub photoscreen_min_confidence: f64,
}

/// Calibration validity windows
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CalibrationSettings {
    #[serde(default = "defaults::blood_pressure_validity_days")]
    pub blood_pressure_validity_days: i64,

    #[serde(default = "defaults::audio_validity_days")]
    pub audio_validity_days: i64,
}

/// Default value providers using constants
mod defaults {
    use crate::config::constants::*;

    pub fn sample_rate_hz() -> f64 { signal::DEFAULT_SAMPLE_RATE_HZ }
    pub fn max_buffer_samples() -> usize { signal::DEFAULT_MAX_BUFFER_SAMPLES }
    pub fn min_measurement_samples() -> usize { signal::MIN_MEASUREMENT_SAMPLES }
    pub fn min_quality_samples() -> usize { signal::MIN_QUALITY_SAMPLES }

    pub fn start_level_db_hl() -> f64 { hearing::START_LEVEL_DB_HL }
    pub fn step_down_db() -> f64 { hearing::STEP_DOWN_DB }
    pub fn step_up_db() -> f64 { hearing::STEP_UP_DB }
    pub fn min_presentations() -> usize { hearing::MIN_PRESENTATIONS }
    pub fn max_presentations() -> usize { hearing::MAX_PRESENTATIONS }
    pub fn quiet_room_db() -> f64 { hearing::QUIET_ROOM_DB }

    pub fn photoscreen_min_confidence() -> f64 { vision::PHOTOSCREEN_MIN_CONFIDENCE }

    pub fn blood_pressure_validity_days() -> i64 { calibration::BLOOD_PRESSURE_VALIDITY_DAYS }
    pub fn audio_validity_days() -> i64 { calibration::AUDIO_VALIDITY_DAYS }
}

impl Default for RppgSettings {
    fn default() -> Self {
        Self {
            sample_rate_hz: defaults::sample_rate_hz(),
            max_buffer_samples: defaults::max_buffer_samples(),
            min_measurement_samples: defaults::min_measurement_samples(),
            min_quality_samples: defaults::min_quality_samples(),
        }
    }
}

impl Default for HearingSettings {
    fn default() -> Self {
        Self {
            start_level_db_hl: defaults::start_level_db_hl(),
            step_down_db: defaults::step_down_db(),
            step_up_db: defaults::step_up_db(),
            min_presentations: defaults::min_presentations(),
            max_presentations: defaults::max_presentations(),
            quiet_room_db: defaults::quiet_room_db(),
        }
    }
}

impl Default for VisionSettings {
    fn default() -> Self {
        Self {
            photoscreen_min_confidence: defaults::photoscreen_min_confidence(),
        }
    }
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            blood_pressure_validity_days: defaults::blood_pressure_validity_days(),
            audio_validity_days: defaults::audio_validity_days(),
        }
    }
}

impl ScreeningConfig {
    /// Validate configuration consistency
    pub fn validate_consistency(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let rppg = &self.rppg;
        if !(rppg.sample_rate_hz > 0.0 && rppg.sample_rate_hz <= signal::MAX_SAMPLE_RATE_HZ) {
            errors.push(format!(
                "Sample rate ({} Hz) must be in (0, {}]",
                rppg.sample_rate_hz,
                signal::MAX_SAMPLE_RATE_HZ
            ));
        }
        if rppg.min_measurement_samples > rppg.max_buffer_samples {
            errors.push(format!(
                "Measurement minimum ({} samples) exceeds buffer cap ({} samples)",
                rppg.min_measurement_samples, rppg.max_buffer_samples
            ));
        }
        if rppg.min_quality_samples > rppg.min_measurement_samples {
            errors.push(format!(
                "Quality minimum ({} samples) exceeds measurement minimum ({} samples)",
                rppg.min_quality_samples, rppg.min_measurement_samples
            ));
        }

        let hearing = &self.hearing;
        if hearing.step_down_db <= 0.0 || hearing.step_up_db <= 0.0 {
            errors.push("Audiometry step sizes must be positive".to_string());
        }
        if hearing.start_level_db_hl < hearing::MIN_LEVEL_DB_HL
            || hearing.start_level_db_hl > hearing::MAX_LEVEL_DB_HL
        {
            errors.push(format!(
                "Start level ({} dB HL) outside audiometer range [{}, {}]",
                hearing.start_level_db_hl,
                hearing::MIN_LEVEL_DB_HL,
                hearing::MAX_LEVEL_DB_HL
            ));
        }
        if hearing.max_presentations < hearing.min_presentations {
            errors.push(format!(
                "Presentation cap ({}) below threshold minimum ({})",
                hearing.max_presentations, hearing.min_presentations
            ));
        }

        if !(0.0..=100.0).contains(&self.vision.photoscreen_min_confidence) {
            errors.push(format!(
                "Photoscreen confidence floor ({}) must be within 0-100",
                self.vision.photoscreen_min_confidence
            ));
        }

        if self.calibration.blood_pressure_validity_days <= 0
            || self.calibration.audio_validity_days <= 0
        {
            errors.push("Calibration validity windows must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Seconds of signal the rolling buffer holds when full
    pub fn buffer_window_seconds(&self) -> f64 {
        self.rppg.max_buffer_samples as f64 / self.rppg.sample_rate_hz
    }
}
