// src/utils/mod.rs
//! Shared helpers: clock abstraction and small descriptive statistics

pub mod time;
pub mod stats;

pub use time::{MockTimeProvider, SystemTimeProvider, TimeProvider};
