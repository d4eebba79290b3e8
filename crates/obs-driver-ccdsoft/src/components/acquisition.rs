//! CCDSoft Exposure Sequencing
//!
//! An exposure goes Idle → Configuring → Acquiring → Completed/Aborted:
//!
//! 1. [`ExposurePlan::from_request`] validates shutter, binning and window with
//!    no hardware access
//! 2. [`configure`] writes binning, sub-frame, reduction, exposure time and frame type
//! 3. `TakeImage()` starts the acquisition
//! 4. [`wait_for_completion`] polls `IsExposureComplete`, checking the abort
//!    signal on every iteration and sleeping between polls

use crate::components::connection::CcdSoftConnection;
use crate::components::tables::{CameraCapabilities, DEFAULT_BINNING};
use crate::components::vendor::{CcdSoftVendor, FrameType, ImageReduction, VendorResult};
use obs_core::{
    AbortSignal, Binning, CameraConfig, CameraError, CameraResult, CameraStatus, ImageRequest,
    ReadoutModeInfo, Shutter,
};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Frame type for a shutter request. `LeaveAsIs` cannot be expressed to CCDSoft.
pub fn frame_type_for(shutter: Shutter) -> CameraResult<FrameType> {
    match shutter {
        Shutter::Open => Ok(FrameType::Light),
        Shutter::Close => Ok(FrameType::Dark),
        Shutter::LeaveAsIs => Err(CameraError::Configuration(
            "Not supported to leave as is shutter".into(),
        )),
    }
}

/// Raise `requested` to `minimum`. Values at or above the floor pass unchanged.
pub fn clamp_exptime(requested: f64, minimum: f64) -> f64 {
    if requested >= minimum {
        requested
    } else {
        minimum
    }
}

/// Everything the vendor object is told before `TakeImage()`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExposurePlan {
    /// Vendor frame type picked from the shutter
    pub frame: FrameType,
    /// Exposure time in seconds, already clamped
    pub exptime: f64,
    /// Binning mode name, e.g. `2x2`
    pub binning_name: String,
    /// Factors written to `BinX`/`BinY`
    pub binning: Binning,
    /// Frame geometry for the request's binning and window
    pub readout: ReadoutModeInfo,
}

impl ExposurePlan {
    /// Validate a request against the tables and resolve everything the vendor needs.
    /// ///
    /// /// Fails before any vendor call on `LeaveAsIs`, an unknown binning or a window
    /// /// outside the binned frame.
    pub fn from_request(
        request: &ImageRequest,
        capabilities: &CameraCapabilities,
        config: &CameraConfig,
    ) -> CameraResult<Self> {
        let frame = frame_type_for(request.shutter)?;
        let exptime = clamp_exptime(request.exptime, config.min_exptime);
        let binning_name = request.binning.as_deref().unwrap_or(DEFAULT_BINNING);
        let binning = capabilities.binning(binning_name)?;
        let readout = capabilities.readout_mode_info(Some(binning_name), request.window)?;

        Ok(Self {
            frame,
            exptime,
            binning_name: binning_name.to_string(),
            binning,
            readout,
        })
    }
}

/// Write the exposure parameters to the vendor object.
///
/// Sub-framing and in-driver image reduction are always disabled.
pub fn configure<V: CcdSoftVendor>(vendor: &mut V, plan: &ExposurePlan) -> VendorResult<()> {
    tracing::debug!(
        bin_x = plan.binning.x,
        bin_y = plan.binning.y,
        exptime = plan.exptime,
        frame = plan.frame.as_str(),
        "Configuring exposure"
    );
    vendor.set_bin_x(plan.binning.x)?;
    vendor.set_bin_y(plan.binning.y)?;
    vendor.set_subframe(false)?;
    vendor.set_image_reduction(ImageReduction::None)?;
    vendor.set_exposure_time(plan.exptime)?;
    vendor.set_frame(plan.frame)?;
    Ok(())
}

/// Poll until the vendor reports completion, the abort signal is set, or
/// `deadline` has elapsed.
///
/// The connection lock is only held for each poll, never across the sleep.
/// On abort the vendor receives exactly one `Abort()`. On timeout it is also
/// told to abort before the timeout error is returned.
pub async fn wait_for_completion<V: CcdSoftVendor>(
    connection: &Mutex<CcdSoftConnection<V>>,
    abort: &AbortSignal,
    poll_interval: Duration,
    deadline: Duration,
) -> CameraResult<CameraStatus> {
    let started = Instant::now();
    let mut polls: u64 = 0;

    loop {
        {
            let mut conn = connection.lock().await;
            let vendor = conn.vendor()?;

            if vendor.is_exposure_complete()? {
                tracing::debug!(polls, "Exposure complete");
                return Ok(CameraStatus::Ok);
            }

            if abort.is_set() {
                tracing::warn!(polls, "Abort requested during exposure");
                vendor.abort()?;
                return Ok(CameraStatus::Aborted);
            }

            let waited = started.elapsed();
            if waited >= deadline {
                tracing::warn!(?waited, "Exposure did not complete in time, aborting");
                if let Err(e) = vendor.abort() {
                    tracing::warn!("Abort after timeout failed: {}", e);
                }
                return Err(CameraError::Timeout {
                    operation: "exposure completion",
                    waited,
                });
            }
        }

        polls += 1;
        tokio::time::sleep(poll_interval).await;
    }
}
