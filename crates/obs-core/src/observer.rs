//! Request-lifecycle notifications.

use crate::camera::{CameraStatus, ImageRequest};
use crate::image::ImageProxy;

/// Receives the four lifecycle events of an exposure request.
///
/// Called synchronously from the driver's exposure/readout path, so
/// implementations must not block. All methods default to no-ops.
pub trait RequestObserver: Send + Sync {
    /// Before any exposure parameter reaches the camera.
    fn expose_begin(&self, _request: &ImageRequest) {}

    /// After the exposure finished or was aborted.
    fn expose_complete(&self, _request: &ImageRequest, _status: CameraStatus) {}

    /// Before the frame is fetched.
    fn readout_begin(&self, _request: &ImageRequest) {}

    /// `proxy` is `None` when the readout was aborted.
    fn readout_complete(&self, _proxy: Option<&ImageProxy>, _status: CameraStatus) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl RequestObserver for NullObserver {}

/// Observer that logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl RequestObserver for LoggingObserver {
    fn expose_begin(&self, request: &ImageRequest) {
        tracing::info!(
            request = %request.id,
            exptime = request.exptime,
            shutter = request.shutter.as_str(),
            "Exposure started"
        );
    }

    fn expose_complete(&self, request: &ImageRequest, status: CameraStatus) {
        tracing::info!(request = %request.id, %status, "Exposure finished");
    }

    fn readout_begin(&self, request: &ImageRequest) {
        tracing::info!(request = %request.id, "Readout started");
    }

    fn readout_complete(&self, proxy: Option<&ImageProxy>, status: CameraStatus) {
        match proxy {
            Some(proxy) => tracing::info!(%proxy, %status, "Readout finished"),
            None => tracing::info!(%status, "Readout finished without image"),
        }
    }
}
