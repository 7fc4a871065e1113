// src/rppg/engine.rs
//! Rolling-window rPPG engine
//!
//! The engine owns one bounded sample buffer. Frames are reduced to a mean colour
//! of the primary region and appended with the injected clock's time. At most one
//! frame is processed at a time per engine; a frame arriving while another is in
//! flight is dropped, not queued.

use crate::acquisition::{extract_mean_color, FrameBuffer, PpgSampleBuffer, RgbColor, RoiProvider};
use crate::config::constants::quality;
use crate::config::{RppgSettings, ScreeningConfig};
use crate::processing::ISSUE_INSUFFICIENT_DATA;
use crate::utils::time::{SystemTimeProvider, TimeProvider};
use crate::vitals::{
    calculate_hrv, detect_heart_rate, detect_respiratory_rate, estimate_blood_pressure_within,
    estimate_spo2, process_signal_continuous, BloodPressureMeasurement, BpCalibration,
    HeartRateMeasurement, HrvMeasurement, PpgSignal, RespiratoryMeasurement, Spo2Measurement,
    StressLevel,
};
use chrono::Duration;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, trace, warn};

/// What happened to a submitted frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameOutcome {
    /// A sample was appended to the buffer
    Appended,
    /// The landmark provider found no face
    NoFace,
    /// Another frame was in flight; this one was dropped
    Busy,
    /// The primary region did not overlap the frame or its pixels were short
    EmptyRegion,
}

/// Full vital-signs snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalSignsResult {
    pub heart_rate: HeartRateMeasurement,
    pub hrv: HrvMeasurement,
    pub spo2: Spo2Measurement,
    pub blood_pressure: BloodPressureMeasurement,
    pub respiratory_rate: RespiratoryMeasurement,
    /// 80 when the peak-domain signal is acceptable, else 50
    pub overall_quality: u8,
    /// 0-100 aggregate, see [`calculate_health_score`]
    pub health_score: u8,
}

/// Stability score and issue list for the live signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub quality: f64,
    pub issues: Vec<String>,
}

/// Display strings for a result; missing values render as `--`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedVitals {
    pub heart_rate: String,
    pub hrv: String,
    pub stress: String,
    pub spo2: String,
    pub blood_pressure: String,
    pub respiratory_rate: String,
    pub health_score: String,
}

/// Frame counters since construction or the last reset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineMetrics {
    pub frames_appended: u64,
    pub frames_dropped: u64,
    pub frames_without_face: u64,
    pub samples_evicted: u64,
}

/// Clears the in-flight flag when frame processing ends, including on unwind
struct ProcessingGuard<'a>(&'a AtomicBool);

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Camera vital-signs engine
pub struct RppgEngine<P: RoiProvider, T: TimeProvider = SystemTimeProvider> {
    roi_provider: P,
    clock: T,
    settings: RppgSettings,
    calibration_validity: Duration,
    buffer: Mutex<PpgSampleBuffer>,
    calibration: RwLock<Option<BpCalibration>>,
    processing: AtomicBool,
    frames_appended: AtomicU64,
    frames_dropped: AtomicU64,
    frames_without_face: AtomicU64,
    samples_evicted: AtomicU64,
}

impl<P: RoiProvider> RppgEngine<P, SystemTimeProvider> {
    /// Engine with default settings and the system clock
    pub fn new(roi_provider: P) -> Self {
        Self::with_config(roi_provider, SystemTimeProvider, &ScreeningConfig::default())
    }
}

impl<P: RoiProvider, T: TimeProvider> RppgEngine<P, T> {
    /// Engine with explicit clock and configuration
    pub fn with_config(roi_provider: P, clock: T, config: &ScreeningConfig) -> Self {
        Self {
            roi_provider,
            clock,
            settings: config.rppg.clone(),
            calibration_validity: Duration::days(config.calibration.blood_pressure_validity_days),
            buffer: Mutex::new(PpgSampleBuffer::new(config.rppg.max_buffer_samples)),
            calibration: RwLock::new(None),
            processing: AtomicBool::new(false),
            frames_appended: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
            frames_without_face: AtomicU64::new(0),
            samples_evicted: AtomicU64::new(0),
        }
    }

    pub fn settings(&self) -> &RppgSettings {
        &self.settings
    }

    /// Reduce one frame to a sample and append it
    pub fn process_frame(&self, frame: &dyn FrameBuffer) -> FrameOutcome {
        if self
            .processing
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            self.frames_dropped.fetch_add(1, Ordering::Relaxed);
            warn!("frame dropped: previous frame still processing");
            return FrameOutcome::Busy;
        }
        let _guard = ProcessingGuard(&self.processing);

        let rois = self.roi_provider.select_regions(frame);
        let Some(primary) = rois.first() else {
            self.frames_without_face.fetch_add(1, Ordering::Relaxed);
            return FrameOutcome::NoFace;
        };

        let Some(color) = extract_mean_color(frame, primary) else {
            warn!(?primary, "primary region unreadable");
            return FrameOutcome::EmptyRegion;
        };

        let timestamp = self.clock.now_millis();
        let evicted = self.buffer.lock().push(color, timestamp);
        if evicted {
            self.samples_evicted.fetch_add(1, Ordering::Relaxed);
        }
        self.frames_appended.fetch_add(1, Ordering::Relaxed);
        trace!(timestamp, green = color.green, "frame sample appended");

        FrameOutcome::Appended
    }

    /// Append an already-extracted sample, bypassing the landmark provider
    pub fn push_sample(&self, red: f64, green: f64, blue: f64, timestamp_millis: i64) {
        let color = RgbColor { red, green, blue };
        if self.buffer.lock().push(color, timestamp_millis) {
            self.samples_evicted.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// All five extractors over the buffered window
    ///
    /// Returns `None` until the buffer holds the measurement minimum (300 samples
    /// by default).
    pub fn current_measurements(&self) -> Option<VitalSignsResult> {
        let signal = self.buffer.lock().snapshot();
        if signal.len() < self.settings.min_measurement_samples {
            debug!(
                samples = signal.len(),
                required = self.settings.min_measurement_samples,
                "not enough data for measurements"
            );
            return None;
        }

        let calibration = self.calibration.read().clone();
        Some(self.measure(&signal, calibration.as_ref()))
    }

    fn measure(&self, signal: &PpgSignal, calibration: Option<&BpCalibration>) -> VitalSignsResult {
        let sample_rate = self.settings.sample_rate_hz;
        let processed = process_signal_continuous(signal, sample_rate);

        let heart_rate = detect_heart_rate(signal, sample_rate);
        let hrv = calculate_hrv(&processed.peak_indices, sample_rate, signal.capture_time());
        let spo2 = estimate_spo2(signal, sample_rate);
        let blood_pressure = estimate_blood_pressure_within(
            signal,
            calibration,
            sample_rate,
            self.clock.now(),
            self.calibration_validity,
        );
        let respiratory_rate = detect_respiratory_rate(signal, sample_rate);

        let health_score = calculate_health_score(heart_rate.heart_rate_bpm, &hrv, spo2.spo2);
        let overall_quality = if processed.quality.acceptable {
            quality::ACCEPTABLE_OVERALL_QUALITY
        } else {
            quality::DEGRADED_OVERALL_QUALITY
        };

        VitalSignsResult {
            heart_rate,
            hrv,
            spo2,
            blood_pressure,
            respiratory_rate,
            overall_quality: overall_quality as u8,
            health_score,
        }
    }

    /// Stability of the peak-domain signal and its issues
    pub fn signal_quality(&self) -> QualityReport {
        let signal = self.buffer.lock().snapshot();
        if signal.len() < self.settings.min_quality_samples {
            return QualityReport {
                quality: 0.0,
                issues: vec![ISSUE_INSUFFICIENT_DATA.to_string()],
            };
        }

        let processed = process_signal_continuous(&signal, self.settings.sample_rate_hz);
        QualityReport {
            quality: processed.quality.stability,
            issues: processed.quality.issues,
        }
    }

    pub fn has_enough_data(&self) -> bool {
        self.buffer_len() >= self.settings.min_measurement_samples
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.lock().len()
    }

    /// Snapshot of the buffered traces
    pub fn raw_signal(&self) -> PpgSignal {
        self.buffer.lock().snapshot()
    }

    /// Clear the buffer and the counters
    ///
    /// The calibration survives a reset. The in-flight flag is left to the
    /// frame that holds it, so a frame still processing keeps later frames out
    /// and lands its sample after the reset.
    pub fn reset(&self) {
        self.buffer.lock().clear();
        for counter in [
            &self.frames_appended,
            &self.frames_dropped,
            &self.frames_without_face,
            &self.samples_evicted,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    pub fn set_calibration(&self, calibration: BpCalibration) {
        *self.calibration.write() = Some(calibration);
    }

    pub fn clear_calibration(&self) {
        *self.calibration.write() = None;
    }

    pub fn calibration(&self) -> Option<BpCalibration> {
        self.calibration.read().clone()
    }

    pub fn metrics(&self) -> EngineMetrics {
        EngineMetrics {
            frames_appended: self.frames_appended.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            frames_without_face: self.frames_without_face.load(Ordering::Relaxed),
            samples_evicted: self.samples_evicted.load(Ordering::Relaxed),
        }
    }
}

/// Aggregate 0-100 score from heart rate, HRV and SpO2
///
/// Deductions stack: heart rate outside 60-100 (-10), 50-110 (-10) and 40-120
/// (-15); SDNN under 25 (-15) and under 15 (-10); high stress (-10) or medium
/// stress (-5); SpO2 under 95 (-15), 90 (-20) and 85 (-25).
pub fn calculate_health_score(heart_rate_bpm: u32, hrv: &HrvMeasurement, spo2: u32) -> u8 {
    let mut score: i32 = 100;
    let hr = heart_rate_bpm;

    if !(60..=100).contains(&hr) {
        score -= 10;
    }
    if !(50..=110).contains(&hr) {
        score -= 10;
    }
    if !(40..=120).contains(&hr) {
        score -= 15;
    }

    if hrv.sdnn_ms < 25 {
        score -= 15;
    }
    if hrv.sdnn_ms < 15 {
        score -= 10;
    }
    score -= match hrv.stress_level {
        StressLevel::High => 10,
        StressLevel::Medium => 5,
        StressLevel::Low => 0,
    };

    if spo2 < 95 {
        score -= 15;
    }
    if spo2 < 90 {
        score -= 20;
    }
    if spo2 < 85 {
        score -= 25;
    }

    score.clamp(0, 100) as u8
}

/// Display strings, `--` for zero values
pub fn format_vital_signs(result: &VitalSignsResult) -> FormattedVitals {
    fn or_dash(value: u32, render: impl FnOnce(u32) -> String) -> String {
        if value > 0 {
            render(value)
        } else {
            "--".to_string()
        }
    }

    let bp = &result.blood_pressure;
    FormattedVitals {
        heart_rate: or_dash(result.heart_rate.heart_rate_bpm, |v| format!("{} BPM", v)),
        hrv: or_dash(result.hrv.sdnn_ms, |v| format!("{} ms", v)),
        stress: result.hrv.stress_level.label().to_string(),
        spo2: or_dash(result.spo2.spo2, |v| format!("{}%", v)),
        blood_pressure: if bp.systolic > 0 && bp.diastolic > 0 {
            format!("{}/{}", bp.systolic, bp.diastolic)
        } else {
            "--".to_string()
        },
        respiratory_rate: or_dash(result.respiratory_rate.respiratory_rate, |v| format!("{} /min", v)),
        health_score: or_dash(u32::from(result.health_score), |v| format!("{}/100", v)),
    }
}
