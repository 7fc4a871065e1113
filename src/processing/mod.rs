// src/processing/mod.rs
//! Signal conditioning, peak detection, spectral analysis and quality assessment

pub mod conditioning;
pub mod peaks;
pub mod quality_monitor;
pub mod spectral;

pub use conditioning::*;
pub use peaks::*;
pub use quality_monitor::*;
pub use spectral::*;
