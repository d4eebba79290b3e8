//! Camera Capabilities
//!
//! Fine-grained traits a camera driver implements. A driver that cannot cool
//! its sensor still implements [`TemperatureControl`]; it simply answers
//! `false`/`None` when [`CameraInfo::supports`] says the feature is absent.
//!
//! # Design
//!
//! Each capability trait:
//! - Is thread-safe (requires Send + Sync)
//! - Takes `&self`; drivers keep hardware handles behind a mutex
//! - Returns [`CameraResult`] so callers can match on [`crate::error::CameraErrorKind`]
//!
//! # Example
//!
//! ```rust,ignore
//! async fn dark_frame<C>(camera: &C, seconds: f64) -> CameraResult<Option<ImageProxy>>
//! where
//!     C: ImagingCamera + TemperatureControl,
//! {
//!     camera.start_cooling(-20.0).await?;
//!     let mut request = ImageRequest::new(seconds).with_shutter(Shutter::Close);
//!     acquire(camera, &mut request, &AbortSignal::new()).await
//! }
//! ```

use crate::abort::AbortSignal;
use crate::camera::{CameraFeature, CameraStatus, Ccd, CcdChannel, ImageRequest, ReadoutMode};
use crate::error::CameraResult;
use crate::image::ImageProxy;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Readout modes by CCD channel, then by mode id.
pub type ReadoutModeTable = BTreeMap<CcdChannel, BTreeMap<u32, ReadoutMode>>;

/// Capability: static description of the camera.
///
/// Every accessor is a lookup into tables built once at start-up.
pub trait CameraInfo: Send + Sync {
    /// CCD channels and their roles
    fn ccds(&self) -> &BTreeMap<CcdChannel, Ccd>;

    /// Channel used when a request does not name one
    fn current_ccd(&self) -> CcdChannel;

    /// Binning name to readout mode id
    fn binnings(&self) -> &BTreeMap<String, u32>;

    /// ADC name to ADC id
    fn adcs(&self) -> &BTreeMap<String, u32>;

    /// Sensor size in physical pixels (width, height)
    fn physical_size(&self) -> (u32, u32);

    /// Physical pixel pitch in microns (x, y)
    fn pixel_size(&self) -> (f64, f64);

    /// Overscan columns and rows of `ccd`, the current CCD when `None`
    fn overscan_size(&self, ccd: Option<CcdChannel>) -> (u32, u32);

    /// Readout modes per CCD channel
    fn readout_modes(&self) -> &ReadoutModeTable;

    /// Whether the optional `feature` is available
    fn supports(&self, feature: CameraFeature) -> bool;
}

/// Capability: exposure and readout of single frames.
///
/// # Contract
/// - `expose` returns once the sensor has finished integrating or the abort
///   signal was observed; an abort is `Ok(CameraStatus::Aborted)`, not an error
/// - `readout` stores the frame of the last exposure and returns its proxy,
///   or `Ok(None)` when aborted
#[async_trait]
pub trait ImagingCamera: Send + Sync {
    /// Take the exposure described by `request`.
    async fn expose(
        &self,
        request: &mut ImageRequest,
        abort: &AbortSignal,
    ) -> CameraResult<CameraStatus>;

    /// Fetch and store the frame of the last exposure.
    async fn readout(
        &self,
        request: &mut ImageRequest,
        abort: &AbortSignal,
    ) -> CameraResult<Option<ImageProxy>>;
}

/// Capability: sensor temperature regulation.
///
/// Methods return `false`/`None` without touching hardware when the camera
/// does not support [`CameraFeature::TemperatureControl`].
#[async_trait]
pub trait TemperatureControl: Send + Sync {
    /// Regulate the sensor towards `setpoint` degrees Celsius.
    async fn start_cooling(&self, setpoint: f64) -> CameraResult<bool>;

    /// Turn regulation off.
    async fn stop_cooling(&self) -> CameraResult<bool>;

    /// Whether regulation is on.
    async fn is_cooling(&self) -> CameraResult<bool>;

    /// Current sensor temperature in Celsius
    async fn temperature(&self) -> CameraResult<Option<f64>>;

    /// Current regulation set point in Celsius
    async fn set_point(&self) -> CameraResult<Option<f64>>;
}

/// Capability: cooling fan control.
#[async_trait]
pub trait FanControl: Send + Sync {
    /// Start the fan, at `rate` if given. `false` when unsupported.
    async fn start_fan(&self, rate: Option<f64>) -> CameraResult<bool>;

    /// Stop the fan. `false` when unsupported.
    async fn stop_fan(&self) -> CameraResult<bool>;

    /// Whether the fan is running.
    async fn is_fanning(&self) -> CameraResult<bool>;
}

/// Expose then read out one frame.
///
/// Readout is skipped when the exposure was aborted.
pub async fn acquire<C>(
    camera: &C,
    request: &mut ImageRequest,
    abort: &AbortSignal,
) -> CameraResult<Option<ImageProxy>>
where
    C: ImagingCamera + ?Sized,
{
    match camera.expose(request, abort).await? {
        CameraStatus::Ok => camera.readout(request, abort).await,
        CameraStatus::Aborted => Ok(None),
    }
}
