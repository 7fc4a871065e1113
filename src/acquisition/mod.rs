// src/acquisition/mod.rs
//! Frame access, region selection and sample buffering

pub mod frame;
pub mod roi;
pub mod sample_buffer;

pub use frame::*;
pub use roi::*;
pub use sample_buffer::*;
