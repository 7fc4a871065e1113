//! VitaScreen-Core: signal processing and clinical scoring for self-screening
//!
//! This library is the computational core of a health self-screening
//! application. It features:
//!
//! - Camera-based vital signs (rPPG): heart rate, HRV, SpO2, blood pressure and
//!   respiratory rate from per-frame facial colour averages
//! - Signal conditioning, peak detection and spectral analysis
//! - Hearing screening: adaptive pure-tone audiometry, speech in noise,
//!   audiogram classification and headphone calibration
//! - Vision screening: Snellen acuity, photoscreening, colour and contrast
//! - TOML configuration with environment overrides
//!
//! All scoring is synchronous and I/O free. Camera capture, audio playback and
//! persistence stay with the caller.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use vitascreen_core::acquisition::{FixedRoiProvider, Roi, RgbaFrame};
//! use vitascreen_core::rppg::{format_vital_signs, RppgEngine};
//!
//! let roi = Roi::new(100.0, 80.0, 120.0, 60.0);
//! let engine = RppgEngine::new(FixedRoiProvider::new(vec![roi]));
//!
//! for _ in 0..300 {
//!     let frame = RgbaFrame::solid(640, 480, [180, 120, 100]);
//!     engine.process_frame(&frame);
//! }
//!
//! if let Some(result) = engine.current_measurements() {
//!     println!("{:?}", format_vital_signs(&result));
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod acquisition;
pub mod config;
pub mod error;
pub mod hearing;
pub mod processing;
pub mod rppg;
pub mod screening;
pub mod utils;
pub mod vision;
pub mod vitals;

// Re-export commonly used types for convenience
pub use config::{ConfigError, ConfigLoader, ScreeningConfig};
pub use error::{ScreeningError, ScreeningResult, SignalFault};
pub use rppg::{FrameOutcome, RppgEngine, VitalSignsResult};
pub use screening::{AgeGroup, ScreeningStatus, Side, Urgency};

pub use utils::time::{MockTimeProvider, SystemTimeProvider, TimeProvider};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "Signal processing and clinical scoring for health self-screening".to_string(),
        features: vec![
            "Camera-based vital signs".to_string(),
            "Pure-tone and speech-in-noise hearing screening".to_string(),
            "Visual acuity and photoscreening".to_string(),
            "TOML configuration with environment overrides".to_string(),
        ],
    }
}

/// Library version information
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// Library name
    pub name: String,
    /// Version string
    pub version: String,
    /// Description
    pub description: String,
    /// List of features
    pub features: Vec<String>,
}
