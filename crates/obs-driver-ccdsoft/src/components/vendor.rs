//! CCDSoft automation object interface
//!
//! The adapter never talks to the `CCDSoft.Camera`/`CCDSoft.Image` objects
//! directly. It goes through [`CcdSoftVendor`], one method per property or
//! method the driver uses, so any backend (COM dispatch, a remote bridge, the
//! simulator in [`crate::mock`]) can be plugged in.

use obs_core::error::CameraError;
use thiserror::Error;

/// A failed property access or method call on the vendor object.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{operation}: {message}")]
pub struct VendorError {
    /// Vendor property or method name, e.g. `"TakeImage"`
    pub operation: String,
    /// Vendor error text
    pub message: String,
}

impl VendorError {
    /// Error for a named vendor operation.
    pub fn new(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

impl From<VendorError> for CameraError {
    fn from(err: VendorError) -> Self {
        CameraError::VendorCall {
            operation: err.operation,
            message: err.message,
        }
    }
}

/// Result of a vendor call.
pub type VendorResult<T> = std::result::Result<T, VendorError>;

/// Value of the vendor `Frame` property.
///
/// Lists every vendor code; the driver only sends `Light` and `Dark`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    /// Shutter open
    Light,
    /// Zero-length dark
    Bias,
    /// Shutter closed
    Dark,
    /// Flat field
    Flat,
}

impl FrameType {
    /// Integer written to `Frame`.
    pub fn code(&self) -> i32 {
        match self {
            FrameType::Light => 1,
            FrameType::Bias => 2,
            FrameType::Dark => 3,
            FrameType::Flat => 4,
        }
    }

    /// Lowercase name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameType::Light => "light",
            FrameType::Bias => "bias",
            FrameType::Dark => "dark",
            FrameType::Flat => "flat",
        }
    }
}

/// Value of the vendor `ImageReduction` property.
///
/// Lists every vendor code; the driver always sends `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageReduction {
    /// No reduction
    None,
    /// Automatic dark subtraction
    AutoDark,
    /// Dark, flat and bias reduction
    Full,
}

impl ImageReduction {
    /// Integer written to `ImageReduction`.
    pub fn code(&self) -> i32 {
        match self {
            ImageReduction::None => 0,
            ImageReduction::AutoDark => 1,
            ImageReduction::Full => 2,
        }
    }
}

/// The image attached from the active imager.
#[derive(Debug, Clone, PartialEq)]
pub struct VendorImage {
    /// `DataArray` in the vendor's native layout: one inner array per column
    pub data: Vec<Vec<u16>>,
    /// `JulianDay` of the frame start
    pub julian_day: f64,
}

/// The subset of the CCDSoft camera/image automation objects the driver uses.
///
/// Calls are synchronous and may block briefly, as the underlying automation
/// calls do. The adapter serializes access behind a mutex.
pub trait CcdSoftVendor: Send + 'static {
    /// `Connect()`
    fn connect(&mut self) -> VendorResult<()>;

    /// `Disconnect()`
    fn disconnect(&mut self) -> VendorResult<()>;

    /// `Asynchronous`: return from `TakeImage` immediately instead of blocking
    fn set_asynchronous(&mut self, enabled: bool) -> VendorResult<()>;

    /// `BinX`
    fn set_bin_x(&mut self, factor: u32) -> VendorResult<()>;

    /// `BinY`
    fn set_bin_y(&mut self, factor: u32) -> VendorResult<()>;

    /// `Subframe`
    fn set_subframe(&mut self, enabled: bool) -> VendorResult<()>;

    /// `ImageReduction`
    fn set_image_reduction(&mut self, reduction: ImageReduction) -> VendorResult<()>;

    /// `ExposureTime` in seconds
    fn set_exposure_time(&mut self, seconds: f64) -> VendorResult<()>;

    /// `Frame`
    fn set_frame(&mut self, frame: FrameType) -> VendorResult<()>;

    /// `TakeImage()`
    fn take_image(&mut self) -> VendorResult<()>;

    /// `IsExposureComplete`
    fn is_exposure_complete(&mut self) -> VendorResult<bool>;

    /// `Abort()`
    fn abort(&mut self) -> VendorResult<()>;

    /// `CCDSoft.Image.AttachToActiveImager()` followed by `DataArray` and `JulianDay`
    fn active_image(&mut self) -> VendorResult<VendorImage>;

    /// `Temperature` in Celsius
    fn temperature(&mut self) -> VendorResult<f64>;

    /// `TemperatureSetPoint` in Celsius
    fn temperature_set_point(&mut self) -> VendorResult<f64>;

    /// Write `TemperatureSetPoint`
    fn set_temperature_set_point(&mut self, celsius: f64) -> VendorResult<()>;

    /// `RegulateTemperature`
    fn regulate_temperature(&mut self) -> VendorResult<bool>;

    /// Write `RegulateTemperature`
    fn set_regulate_temperature(&mut self, enabled: bool) -> VendorResult<()>;

    /// `ShutDownTemperatureRegulationOnDisconnect`
    fn set_shutdown_regulation_on_disconnect(&mut self, enabled: bool) -> VendorResult<()>;
}
