// src/vision/mod.rs
//! Vision screening: Snellen acuity, photoscreening, colour and contrast
//!
//! Scorers are pure functions over recorded responses. The photo analysis in
//! [`image_analysis`] reads a [`FrameBuffer`](crate::acquisition::FrameBuffer)
//! and produces the findings the photoscreening aggregator grades.

pub mod acuity;
pub mod color_contrast;
pub mod image_analysis;
pub mod photoscreening;

pub use acuity::*;
pub use color_contrast::*;
pub use image_analysis::*;
pub use photoscreening::*;
