//! CCDSoft Readout
//!
//! Pulls the last acquired frame from the active imager. CCDSoft hands the
//! `DataArray` over column by column; the framework expects rows, so the
//! buffer is transposed here and nowhere else.

use crate::components::vendor::CcdSoftVendor;
use chrono::{DateTime, Utc};
use obs_core::time::datetime_from_jd;
use obs_core::{CameraError, CameraResult, PixelBuffer};

/// A frame fetched from the vendor, already in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadoutFrame {
    /// Row-major pixels
    pub pixels: PixelBuffer,
    /// Converted from the vendor `JulianDay`
    pub frame_start_time: DateTime<Utc>,
}

/// Fetch and transpose the active image.
pub fn read_active_image<V: CcdSoftVendor>(vendor: &mut V) -> CameraResult<ReadoutFrame> {
    let image = vendor.active_image()?;
    let native = PixelBuffer::from_nested(&image.data)
        .ok_or_else(|| CameraError::vendor("DataArray", "columns have different lengths"))?;
    let pixels = native.transposed();

    tracing::debug!(
        width = pixels.width,
        height = pixels.height,
        julian_day = image.julian_day,
        "Read active image"
    );

    Ok(ReadoutFrame {
        pixels,
        frame_start_time: datetime_from_jd(image.julian_day),
    })
}
