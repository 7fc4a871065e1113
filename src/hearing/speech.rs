// src/hearing/speech.rs
//! Speech-in-noise scoring, speech reception threshold and word lists

use crate::config::constants::hearing;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Percent of words repeated correctly at one signal-to-noise ratio
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeechTrial {
    pub snr_db: f64,
    pub percent_correct: f64,
}

impl SpeechTrial {
    pub fn new(snr_db: f64, percent_correct: f64) -> Self {
        Self { snr_db, percent_correct }
    }
}

/// SNR at which half of the words are understood
///
/// Trials are sorted by SNR and the first pair bracketing 50% is linearly
/// interpolated. Without a crossing, the highest SNR is returned if it reached
/// 50%, otherwise the lowest. An empty trial list gives `0`.
pub fn calculate_srt(trials: &[SpeechTrial]) -> f64 {
    let mut sorted = trials.to_vec();
    sorted.sort_by(|a, b| a.snr_db.total_cmp(&b.snr_db));

    for pair in sorted.windows(2) {
        let (current, next) = (pair[0], pair[1]);
        if current.percent_correct <= 50.0 && next.percent_correct >= 50.0 {
            let percent_range = next.percent_correct - current.percent_correct;
            if percent_range == 0.0 {
                return current.snr_db;
            }
            let fraction = (50.0 - current.percent_correct) / percent_range;
            return current.snr_db + fraction * (next.snr_db - current.snr_db);
        }
    }

    match (sorted.first(), sorted.last()) {
        (Some(first), Some(last)) => {
            if last.percent_correct >= 50.0 {
                last.snr_db
            } else {
                first.snr_db
            }
        }
        _ => 0.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechInNoiseStatus {
    VeryPoor,
    Poor,
    Fair,
    Good,
    Excellent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechInNoiseAssessment {
    pub status: SpeechInNoiseStatus,
    pub percent_correct: f64,
    /// Score relative to the age-typical expectation at this SNR, percent
    pub performance: f64,
    pub recommendation: String,
}

/// Grade a speech-in-noise score against the expectation at `snr_db`
///
/// The expected score is `80 - (5 - snr) * 4` percent. At or below -15 dB SNR
/// nothing is expected and any score grades excellent.
pub fn assess_speech_in_noise(percent_correct: f64, snr_db: f64) -> SpeechInNoiseAssessment {
    let expected = 80.0 - (5.0 - snr_db) * 4.0;
    let performance = if expected <= 0.0 {
        100.0
    } else {
        percent_correct / expected * 100.0
    };

    let (status, recommendation) = if performance >= 100.0 {
        (
            SpeechInNoiseStatus::Excellent,
            "Excellent speech understanding in noise. No concerns.",
        )
    } else if performance >= 80.0 {
        (
            SpeechInNoiseStatus::Good,
            "Good speech understanding in noise. Within normal limits.",
        )
    } else if performance >= 60.0 {
        (
            SpeechInNoiseStatus::Fair,
            "Fair speech understanding in noise. May have difficulty in noisy environments. \
             Consider comprehensive hearing evaluation.",
        )
    } else if performance >= 40.0 {
        (
            SpeechInNoiseStatus::Poor,
            "Poor speech understanding in noise. Likely to have significant difficulty in noisy \
             environments. Comprehensive hearing evaluation recommended.",
        )
    } else {
        (
            SpeechInNoiseStatus::VeryPoor,
            "Very poor speech understanding in noise. Significant communication difficulties \
             expected. Urgent comprehensive evaluation by an audiologist recommended.",
        )
    };

    SpeechInNoiseAssessment {
        status,
        percent_correct,
        performance,
        recommendation: recommendation.to_string(),
    }
}

/// Speech material used for presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WordListKind {
    Monosyllables,
    Spondees,
    Sentences,
}

pub const MONOSYLLABLES: [&str; 20] = [
    "cat", "dog", "hat", "pen", "cup", "book", "shoe", "key", "car", "tree", "fish", "bird",
    "hand", "foot", "door", "ball", "cake", "milk", "rain", "snow",
];

pub const SPONDEES: [&str; 18] = [
    "baseball", "hotdog", "airplane", "birthday", "cowboy", "doorbell", "football", "greenhouse",
    "hardware", "icecream", "mushroom", "northwest", "oatmeal", "pancake", "railroad",
    "sidewalk", "toothbrush", "whitewash",
];

pub const SENTENCES: [&str; 5] = [
    "The boy ran down the street",
    "She wore a pretty blue dress",
    "The dog chased the cat",
    "We went to the store today",
    "The sun is shining bright",
];

impl WordListKind {
    pub fn words(self) -> &'static [&'static str] {
        match self {
            WordListKind::Monosyllables => &MONOSYLLABLES,
            WordListKind::Spondees => &SPONDEES,
            WordListKind::Sentences => &SENTENCES,
        }
    }
}

/// Up to `count` distinct items drawn at random from a list
pub fn generate_word_list<R: Rng + ?Sized>(
    kind: WordListKind,
    count: usize,
    rng: &mut R,
) -> Vec<&'static str> {
    let mut words = kind.words().to_vec();
    let amount = count.min(words.len());
    let (picked, _) = words.partial_shuffle(rng, amount);
    picked.to_vec()
}

/// Playback gains for speech over noise
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeechNoiseGains {
    pub signal_gain: f64,
    pub noise_gain: f64,
}

/// Gains giving `snr_db = 20 log10(signal / noise)` with speech at a fixed level
pub fn speech_noise_gains(snr_db: f64) -> SpeechNoiseGains {
    let signal_gain = hearing::SPEECH_SIGNAL_GAIN;
    SpeechNoiseGains {
        signal_gain,
        noise_gain: signal_gain / 10f64.powf(snr_db / 20.0),
    }
}
