// src/hearing/mod.rs
//! Hearing screening: audiometric scoring, adaptive threshold search, speech in
//! noise and device calibration
//!
//! Everything here is synchronous and free of I/O. Tone playback and response
//! capture stay with the caller, which feeds heard/not-heard booleans into the
//! state machines and plays the levels they ask for.

pub mod ambient;
pub mod calibration;
pub mod clinical;
pub mod pure_tone;
pub mod speech;
pub mod thresholds;
pub mod verdict;

pub use ambient::*;
pub use calibration::*;
pub use clinical::*;
pub use pure_tone::*;
pub use speech::*;
pub use thresholds::*;
pub use verdict::*;
