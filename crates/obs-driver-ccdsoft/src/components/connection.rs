//! CCDSoft Connection Management
//!
//! Owns the vendor automation object and tracks whether it is connected.
//! Every hardware access in the driver goes through [`CcdSoftConnection::vendor`],
//! which refuses to hand out the object while disconnected.

use crate::components::vendor::CcdSoftVendor;
use obs_core::{CameraError, CameraResult};

/// Vendor object plus its connected flag.
pub struct CcdSoftConnection<V> {
    vendor: V,
    connected: bool,
}

impl<V: CcdSoftVendor> CcdSoftConnection<V> {
    /// Wrap a vendor object. Starts disconnected.
    pub fn new(vendor: V) -> Self {
        Self {
            vendor,
            connected: false,
        }
    }

    /// Connect to the automation server and switch it to asynchronous mode.
    ///
    /// Opening an already open connection is a no-op.
    pub fn open(&mut self) -> CameraResult<()> {
        if self.connected {
            return Ok(());
        }

        tracing::debug!("Connecting to CCDSoft camera");
        self.vendor
            .connect()
            .map_err(|e| CameraError::Connection(format!("Could not connect camera: {}", e)))?;
        self.vendor
            .set_asynchronous(true)
            .map_err(|e| CameraError::Connection(format!("Could not configure camera: {}", e)))?;

        self.connected = true;
        tracing::info!("CCDSoft camera connected");
        Ok(())
    }

    /// Disconnect from the automation server.
    pub fn close(&mut self) -> CameraResult<()> {
        if !self.connected {
            return Ok(());
        }
        // Considered closed even if Disconnect fails; the handle is unusable either way.
        self.connected = false;
        self.vendor.disconnect()?;
        tracing::info!("CCDSoft camera disconnected");
        Ok(())
    }

    /// Whether `open` succeeded and `close` has not run since.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// The vendor object, if connected.
    pub fn vendor(&mut self) -> CameraResult<&mut V> {
        if !self.connected {
            return Err(CameraError::Connection("Camera is not connected".into()));
        }
        Ok(&mut self.vendor)
    }
}
