// src/rppg/mod.rs
//! Camera-based vital-signs engine

pub mod engine;

pub use engine::*;
