//! Pixel buffers and the metadata handed to image persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Row-major 16-bit image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    /// Width in pixels
    pub width: usize,
    /// Height in pixels
    pub height: usize,
    /// `width * height` pixels, row after row
    pub data: Vec<u16>,
}

impl PixelBuffer {
    /// Wrap row-major `data`. `None` unless `data.len() == width * height`.
    pub fn new(width: usize, height: usize, data: Vec<u16>) -> Option<Self> {
        (data.len() == width * height).then_some(Self {
            width,
            height,
            data,
        })
    }

    /// Build a buffer from a nested array, outer index first.
    ///
    /// Returns `None` if the inner arrays are not all the same length.
    pub fn from_nested(rows: &[Vec<u16>]) -> Option<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|row| row.len() != width) {
            return None;
        }
        let data = rows.iter().flatten().copied().collect();
        Some(Self {
            width,
            height,
            data,
        })
    }

    /// Pixel at column `x`, row `y`.
    pub fn get(&self, x: usize, y: usize) -> Option<u16> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }

    /// Row `y` as a slice.
    pub fn row(&self, y: usize) -> Option<&[u16]> {
        if y >= self.height {
            return None;
        }
        let start = y * self.width;
        self.data.get(start..start + self.width)
    }

    /// The exact transpose: pixel `(x, y)` moves to `(y, x)`.
    pub fn transposed(&self) -> Self {
        let mut data = Vec::with_capacity(self.data.len());
        for x in 0..self.width {
            for y in 0..self.height {
                data.push(self.data[y * self.width + x]);
            }
        }
        Self {
            width: self.height,
            height: self.width,
            data,
        }
    }
}

/// Metadata attached to a frame when it is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// Start of the exposure
    pub frame_start_time: DateTime<Utc>,
    /// Sensor temperature in Celsius; `None` when the camera cannot report it
    pub frame_temperature: Option<f64>,
    /// Integer factor of the binning the frame was read with
    pub binning_factor: u32,
}

/// Opaque reference to a stored image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageProxy {
    /// Store-assigned identifier
    pub id: Uuid,
}

impl ImageProxy {
    /// Proxy with a fresh random id.
    pub fn new() -> Self {
        Self { id: Uuid::new_v4() }
    }
}

impl Default for ImageProxy {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ImageProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "image:{}", self.id)
    }
}
