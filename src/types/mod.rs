//! Core data types shared across the crate

pub mod device;
pub mod point;

pub use device::*;
pub use point::*;
