//! Point sample type

use serde::{Deserialize, Serialize};

/// Single point sample in the sensor frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X position in meters
    pub x: f32,
    /// Y position in meters
    pub y: f32,
    /// Z position in meters
    pub z: f32,
    /// Return strength, when the origin reports one
    pub reflectivity: Option<u8>,
    /// Acquisition time in microseconds, when the origin reports one
    pub timestamp_us: Option<u64>,
}

impl Point {
    /// Create a point with position only
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            reflectivity: None,
            timestamp_us: None,
        }
    }

    /// Attach a return strength
    pub fn with_reflectivity(mut self, reflectivity: u8) -> Self {
        self.reflectivity = Some(reflectivity);
        self
    }

    /// Attach an acquisition timestamp
    pub fn with_timestamp_us(mut self, timestamp_us: u64) -> Self {
        self.timestamp_us = Some(timestamp_us);
        self
    }

    /// Euclidean distance from the sensor origin
    pub fn distance(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}
