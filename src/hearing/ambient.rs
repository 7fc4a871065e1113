// src/hearing/ambient.rs
//! Room noise check before a hearing test

use crate::config::HearingSettings;

/// Approximate room level from unsigned 8-bit time-domain microphone samples
///
/// Samples are centred on 128. The level is `20 log10(rms) + 100`, floored at
/// zero; silence and an empty buffer both read as 0.
pub fn ambient_noise_level_db(time_domain: &[u8]) -> f64 {
    if time_domain.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = time_domain
        .iter()
        .map(|&b| {
            let normalized = (f64::from(b) - 128.0) / 128.0;
            normalized * normalized
        })
        .sum();
    let rms = (sum_squares / time_domain.len() as f64).sqrt();
    if rms == 0.0 {
        return 0.0;
    }

    (20.0 * rms.log10() + 100.0).max(0.0)
}

/// Whether the room is quiet enough to test at `threshold_db`
pub fn is_quiet_enough(level_db: f64, threshold_db: f64) -> bool {
    level_db < threshold_db
}

/// Measure the room and check it against the configured quiet-room limit
pub fn room_is_quiet(time_domain: &[u8], settings: &HearingSettings) -> bool {
    is_quiet_enough(ambient_noise_level_db(time_domain), settings.quiet_room_db)
}
