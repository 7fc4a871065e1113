// ================================================================================
// Integration tests for the rPPG engine
// File: tests/rppg_engine_tests.rs
// ================================================================================

use std::f64::consts::PI;
use std::sync::{Arc, Barrier};
use std::thread;

use vitascreen_core::acquisition::{
    facial_rois_from_eyes, FixedRoiProvider, FrameBuffer, Point, RgbaFrame, Roi,
};
use vitascreen_core::error::SignalFault;
use vitascreen_core::rppg::{format_vital_signs, FrameOutcome, RppgEngine};
use vitascreen_core::utils::time::{MockTimeProvider, TimeProvider};
use vitascreen_core::vitals::BpCalibration;
use vitascreen_core::ScreeningConfig;

const SAMPLE_RATE: f64 = 30.0;
const START_MILLIS: i64 = 1_700_000_000_000;

fn fixed_engine(clock: Arc<MockTimeProvider>) -> RppgEngine<FixedRoiProvider, Arc<MockTimeProvider>> {
    let provider = FixedRoiProvider::new(vec![Roi::new(0.0, 0.0, 4.0, 4.0)]);
    RppgEngine::with_config(provider, clock, &ScreeningConfig::default())
}

/// Push `seconds` of a green-dominant pulse at `bpm`
fn push_pulse<P, T>(engine: &RppgEngine<P, T>, bpm: f64, seconds: f64)
where
    P: vitascreen_core::acquisition::RoiProvider,
    T: TimeProvider,
{
    let n = (seconds * SAMPLE_RATE) as usize;
    let f = bpm / 60.0;
    for i in 0..n {
        let phase = (2.0 * PI * f * i as f64 / SAMPLE_RATE).sin();
        let timestamp = START_MILLIS + (i as f64 * 1000.0 / SAMPLE_RATE) as i64;
        engine.push_sample(150.0 + phase, 120.0 + 2.0 * phase, 100.0 + phase, timestamp);
    }
}

#[test]
fn test_measurements_need_300_samples() {
    let engine = fixed_engine(Arc::new(MockTimeProvider::new(START_MILLIS)));
    for i in 0..299 {
        engine.push_sample(150.0, 120.0 + (i % 10) as f64, 100.0, START_MILLIS + i * 33);
    }
    assert!(!engine.has_enough_data());
    assert!(engine.current_measurements().is_none());

    engine.push_sample(150.0, 121.0, 100.0, START_MILLIS + 299 * 33);
    assert!(engine.has_enough_data());
    assert!(engine.current_measurements().is_some());
}

#[test]
fn test_pulse_produces_vitals() {
    let engine = fixed_engine(Arc::new(MockTimeProvider::new(START_MILLIS)));
    push_pulse(&engine, 72.0, 10.0);
    assert_eq!(engine.buffer_len(), 300);

    let result = engine.current_measurements().unwrap();
    assert_eq!(result.heart_rate.heart_rate_bpm, 72);
    assert!(result.heart_rate.fault.is_none());
    assert!(result.health_score <= 100);

    // No calibration: blood pressure stays blank
    assert_eq!(result.blood_pressure.systolic, 0);
    assert_eq!(result.blood_pressure.fault, Some(SignalFault::InvalidCalibration));

    let formatted = format_vital_signs(&result);
    assert_eq!(formatted.heart_rate, "72 BPM");
    assert_eq!(formatted.blood_pressure, "--");

    let quality = engine.signal_quality();
    assert!(quality.quality >= 0.0 && quality.quality <= 100.0);
}

#[test]
fn test_calibration_expires_with_clock() {
    let clock = Arc::new(MockTimeProvider::new(START_MILLIS));
    let engine = fixed_engine(clock.clone());
    push_pulse(&engine, 150.0, 10.0);

    engine.set_calibration(BpCalibration::new(
        "user-1",
        120.0,
        80.0,
        clock.now(),
        "Manual Cuff",
    ));

    let fresh = engine.current_measurements().unwrap().blood_pressure;
    assert!(fresh.calibrated);
    assert_eq!((fresh.systolic, fresh.diastolic), (110, 74));

    clock.advance_by(8 * 24 * 60 * 60 * 1000);
    let stale = engine.current_measurements().unwrap().blood_pressure;
    assert!(!stale.calibrated);
    assert_eq!(stale.systolic, 0);
    assert_eq!(stale.fault, Some(SignalFault::InvalidCalibration));
}

#[test]
fn test_concurrent_frame_is_dropped() {
    let entered = Arc::new(Barrier::new(2));
    let release = Arc::new(Barrier::new(2));

    let provider = {
        let entered = entered.clone();
        let release = release.clone();
        move |_frame: &dyn FrameBuffer| -> Vec<Roi> {
            entered.wait();
            release.wait();
            vec![Roi::new(0.0, 0.0, 4.0, 4.0)]
        }
    };
    let engine = Arc::new(RppgEngine::with_config(
        provider,
        MockTimeProvider::new(START_MILLIS),
        &ScreeningConfig::default(),
    ));

    let worker = {
        let engine = engine.clone();
        thread::spawn(move || engine.process_frame(&RgbaFrame::solid(8, 8, [150, 120, 100])))
    };

    // The worker now holds the in-flight flag inside the provider
    entered.wait();
    let frame = RgbaFrame::solid(8, 8, [150, 120, 100]);
    assert_eq!(engine.process_frame(&frame), FrameOutcome::Busy);
    release.wait();

    assert_eq!(worker.join().unwrap(), FrameOutcome::Appended);
    assert_eq!(engine.buffer_len(), 1);

    let metrics = engine.metrics();
    assert_eq!(metrics.frames_appended, 1);
    assert_eq!(metrics.frames_dropped, 1);
}

#[test]
fn test_reset_keeps_in_flight_frame_exclusive() {
    let entered = Arc::new(Barrier::new(2));
    let release = Arc::new(Barrier::new(2));

    let provider = {
        let entered = entered.clone();
        let release = release.clone();
        move |_frame: &dyn FrameBuffer| -> Vec<Roi> {
            entered.wait();
            release.wait();
            vec![Roi::new(0.0, 0.0, 4.0, 4.0)]
        }
    };
    let engine = Arc::new(RppgEngine::with_config(
        provider,
        MockTimeProvider::new(START_MILLIS),
        &ScreeningConfig::default(),
    ));
    engine.push_sample(1.0, 1.0, 1.0, START_MILLIS - 33);

    let worker = {
        let engine = engine.clone();
        thread::spawn(move || engine.process_frame(&RgbaFrame::solid(8, 8, [150, 120, 100])))
    };

    entered.wait();
    engine.reset();
    assert_eq!(engine.buffer_len(), 0);
    // Still one frame in flight after the reset
    let frame = RgbaFrame::solid(8, 8, [150, 120, 100]);
    assert_eq!(engine.process_frame(&frame), FrameOutcome::Busy);
    release.wait();

    assert_eq!(worker.join().unwrap(), FrameOutcome::Appended);
    assert_eq!(engine.buffer_len(), 1);
    assert_eq!(engine.raw_signal().green, vec![120.0]);
}

#[test]
fn test_truncated_frame_is_rejected() {
    struct Truncated;

    impl FrameBuffer for Truncated {
        fn width(&self) -> usize {
            4
        }

        fn height(&self) -> usize {
            4
        }

        fn rgba(&self) -> &[u8] {
            &[200; 8]
        }
    }

    let engine = fixed_engine(Arc::new(MockTimeProvider::new(START_MILLIS)));
    assert_eq!(engine.process_frame(&Truncated), FrameOutcome::EmptyRegion);
    assert_eq!(engine.buffer_len(), 0);

    // The guard was released, the next frame goes through
    let frame = RgbaFrame::solid(4, 4, [150, 120, 100]);
    assert_eq!(engine.process_frame(&frame), FrameOutcome::Appended);
}

#[test]
fn test_landmark_regions_drive_frames() {
    let rois = facial_rois_from_eyes(Point { x: 40.0, y: 60.0 }, Point { x: 80.0, y: 60.0 });
    assert_eq!(rois.len(), 3);

    let engine = RppgEngine::with_config(
        FixedRoiProvider::new(rois),
        MockTimeProvider::new(START_MILLIS),
        &ScreeningConfig::default(),
    );
    let mut frame = RgbaFrame::solid(160, 120, [10, 10, 10]);
    // Forehead: x 36..84, y 36..52
    frame.fill_rect(36, 36, 48, 16, [180, 130, 110]);

    assert_eq!(engine.process_frame(&frame), FrameOutcome::Appended);
    let signal = engine.raw_signal();
    assert_eq!(signal.green, vec![130.0]);
    assert_eq!(signal.timestamps, vec![START_MILLIS]);

    engine.reset();
    assert_eq!(engine.buffer_len(), 0);
    assert_eq!(engine.metrics().frames_appended, 0);
}
