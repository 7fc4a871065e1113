// src/config/constants.rs
//! Screening-wide constants
//!
//! Clinical cutoffs and pipeline parameters live here so the extractors and
//! scorers carry no magic numbers.

/// Camera signal acquisition constants
pub mod signal {
    pub const DEFAULT_SAMPLE_RATE_HZ: f64 = 30.0;
    pub const DEFAULT_MAX_BUFFER_SAMPLES: usize = 900;
    pub const MIN_MEASUREMENT_SAMPLES: usize = 300;
    pub const MIN_QUALITY_SAMPLES: usize = 60;
    pub const MAX_SAMPLE_RATE_HZ: f64 = 240.0;
    pub const WAVEFORM_SNIPPET_SAMPLES: usize = 300;
}

/// Conditioning filter constants
pub mod filters {
    pub const EXPONENTIAL_ALPHA: f64 = 0.1;
    pub const CARDIAC_BAND_LOW_HZ: f64 = 0.7;
    pub const CARDIAC_BAND_HIGH_HZ: f64 = 4.0;
    pub const RESPIRATORY_BAND_LOW_HZ: f64 = 0.1;
    pub const RESPIRATORY_BAND_HIGH_HZ: f64 = 0.5;
    pub const HEART_RATE_SMOOTHING_WINDOW: usize = 3;
    pub const IQR_FENCE_MULTIPLIER: f64 = 1.5;
}

/// Signal quality constants
pub mod quality {
    pub const MIN_ACCEPTABLE_SNR_DB: f64 = 5.0;
    pub const MIN_ACCEPTABLE_STABILITY: f64 = 50.0;
    pub const NOISELESS_SNR_DB: f64 = 60.0;
    pub const DOMINANT_CONFIDENCE_SCALE: f64 = 10.0;
    pub const ACCEPTABLE_OVERALL_QUALITY: f64 = 80.0;
    pub const DEGRADED_OVERALL_QUALITY: f64 = 50.0;
}

/// Vital-sign extractor constants
pub mod vitals {
    pub const HEART_RATE_MIN_SAMPLES: usize = 60;
    pub const HEART_RATE_MIN_BPM: f64 = 40.0;
    pub const HEART_RATE_MAX_BPM: f64 = 200.0;
    pub const PEAK_MIN_SPACING_SECONDS: f64 = 0.4;
    pub const PEAK_THRESHOLD: f64 = 0.5;
    pub const HEART_RATE_AVERAGE_WINDOW_MS: i64 = 30_000;
    pub const HEART_RATE_TREND_WINDOW_MS: i64 = 60_000;
    pub const HEART_RATE_TREND_MIN_MEASUREMENTS: usize = 3;
    pub const TREND_SLOPE_BPM: f64 = 0.5;
    pub const IRREGULAR_MIN_PEAKS: usize = 5;
    pub const IRREGULAR_CV_PERCENT: f64 = 20.0;

    pub const HRV_MIN_INTERVALS: usize = 5;
    pub const PNN50_DIFFERENCE_MS: f64 = 50.0;

    pub const SPO2_MIN_SAMPLES: usize = 60;
    pub const SPO2_TREND_MIN_SAMPLES: usize = 180;
    pub const SPO2_TREND_SEGMENTS: usize = 3;
    pub const SPO2_INTERCEPT: f64 = 110.0;
    pub const SPO2_SLOPE: f64 = 25.0;
    pub const SPO2_MIN_PERCENT: f64 = 90.0;
    pub const SPO2_MAX_PERCENT: f64 = 100.0;
    pub const SPO2_REFERENCE_RATIO: f64 = 0.8;
    pub const SPO2_AVERAGE_WINDOW_MS: i64 = 30_000;

    pub const BP_MIN_SAMPLES: usize = 90;
    pub const BP_PEAK_MIN_DISTANCE: usize = 10;
    pub const BP_REFERENCE_PTT_SECONDS: f64 = 0.3;
    pub const BP_SYSTOLIC_GAIN: f64 = 100.0;
    pub const BP_DIASTOLIC_GAIN: f64 = 60.0;
    pub const BP_SYSTOLIC_RANGE: (f64, f64) = (90.0, 180.0);
    pub const BP_DIASTOLIC_RANGE: (f64, f64) = (60.0, 110.0);
    pub const BP_MAX_CONFIDENCE: f64 = 70.0;
    pub const BP_CONFIDENCE_DECAY_PER_DAY: f64 = 2.0;

    pub const RESPIRATORY_MIN_SAMPLES: usize = 180;
    pub const RESPIRATORY_MIN_PEAKS: usize = 3;
    pub const RESPIRATORY_PEAK_SPACING_SECONDS: f64 = 2.0;
    pub const RESPIRATORY_PEAK_THRESHOLD: f64 = 0.3;
    pub const RESPIRATORY_MIN_RATE: f64 = 6.0;
    pub const RESPIRATORY_MAX_RATE: f64 = 30.0;
    pub const RESPIRATORY_REGULAR_CV: f64 = 0.2;
    pub const RESPIRATORY_AVERAGE_WINDOW_MS: i64 = 60_000;
    pub const BREATHING_PATTERN_MIN_MEASUREMENTS: usize = 5;
}

/// Calibration validity windows
pub mod calibration {
    pub const BLOOD_PRESSURE_VALIDITY_DAYS: i64 = 7;
    pub const AUDIO_VALIDITY_DAYS: i64 = 30;
    pub const AUDIO_SEARCH_START_DB_HL: f64 = -10.0;
    pub const AUDIO_SEARCH_MAX_DB_HL: f64 = 60.0;
    pub const AUDIO_SEARCH_STEP_DB: f64 = 5.0;
    pub const AUDIO_REFERENCE_DB_HL: f64 = 0.0;
    pub const EAR_BALANCE_BOOST: f64 = 1.1;
    pub const EAR_BALANCE_CUT: f64 = 0.9;
}

/// Pure-tone audiometry constants
pub mod hearing {
    pub const START_LEVEL_DB_HL: f64 = 40.0;
    pub const STEP_DOWN_DB: f64 = 10.0;
    pub const STEP_UP_DB: f64 = 5.0;
    pub const MIN_PRESENTATIONS: usize = 6;
    pub const MAX_PRESENTATIONS: usize = 40;
    pub const MIN_LEVEL_DB_HL: f64 = -10.0;
    pub const MAX_LEVEL_DB_HL: f64 = 120.0;
    pub const REFER_PTA_DB: f64 = 25.0;
    pub const PEDIATRIC_REFER_PTA_DB: f64 = 20.0;
    pub const REFER_ASYMMETRY_DB: f64 = 15.0;
    pub const REFER_SPEECH_PERCENT: f64 = 60.0;
    pub const QUIET_ROOM_DB: f64 = 40.0;
    pub const SPEECH_SIGNAL_GAIN: f64 = 0.7;
    pub const OAE_MIN_SNR_DB: f64 = 6.0;
    pub const OAE_PASS_RATE: f64 = 0.8;
}

/// Vision screening constants
pub mod vision {
    pub const PHOTOSCREEN_MIN_CONFIDENCE: f64 = 70.0;
    pub const SEVERE_ACUITY_FACTOR: f64 = 0.7;
    pub const COLOR_NORMAL_PERCENT: f64 = 80.0;
    pub const COLOR_MILD_PERCENT: f64 = 60.0;
    pub const CONTRAST_NORMAL_PERCENT: f64 = 2.0;
    pub const CONTRAST_REDUCED_PERCENT: f64 = 5.0;
    pub const WHITE_REFLEX_LEVEL: f64 = 200.0;
    pub const MIN_FACE_WIDTH_PX: f64 = 200.0;
    pub const MAX_FACE_WIDTH_PX: f64 = 600.0;
    pub const MAX_CENTER_OFFSET_PX: f64 = 200.0;
}

/// Configuration file locations
pub mod paths {
    pub const SYSTEM_CONFIG_PATH: &str = "/etc/vitascreen/config.toml";
    pub const USER_CONFIG_DIR: &str = ".config/vitascreen";
    pub const DEFAULT_CONFIG_FILE: &str = "vitascreen.toml";
    pub const LOCAL_CONFIG_FILE: &str = "vitascreen.local.toml";
    pub const ENV_PREFIX: &str = "VITASCREEN_";
}
