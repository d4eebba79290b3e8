//! CCDSoft Camera Driver
//!
//! Drives a CCD camera through the CCDSoft automation server. Split into
//! components:
//! - Connection: owns the vendor object and its connected state
//! - Acquisition: exposure planning, configuration and completion polling
//! - Readout: frame retrieval and transposition
//! - Thermal: temperature regulation properties
//! - Tables: the static binning/CCD/ADC/readout-mode description
//!
//! The vendor object itself sits behind [`CcdSoftVendor`]. Enable the `mock`
//! feature (on by default) for [`mock::MockCcdSoft`], an in-memory simulator.

pub mod components;
#[cfg(feature = "mock")]
pub mod mock;

use async_trait::async_trait;
use obs_core::capabilities::{
    CameraInfo, FanControl, ImagingCamera, ReadoutModeTable, TemperatureControl,
};
use obs_core::observer::{NullObserver, RequestObserver};
use obs_core::storage::{ImageSaver, MemoryImageStore};
use obs_core::{
    AbortSignal, CameraConfig, CameraError, CameraFeature, CameraResult, CameraStatus, Ccd,
    CcdChannel, ImageMetadata, ImageProxy, ImageRequest, ReadoutModeInfo, Window,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

pub use crate::components::tables::{
    CameraCapabilities, ADC_12_BIT, DEFAULT_BINNING, IMAGING_CHANNEL,
};
pub use crate::components::vendor::{
    CcdSoftVendor, FrameType, ImageReduction, VendorError, VendorImage, VendorResult,
};

use crate::components::acquisition::{configure, wait_for_completion, ExposurePlan};
use crate::components::connection::CcdSoftConnection;
use crate::components::readout::read_active_image;
use crate::components::thermal::CcdSoftThermal;

/// Comment written next to the `GAIN` header card.
pub const GAIN_HEADER_COMMENT: &str = "Electronic gain in photoelectrons per ADU";

/// Camera driver for the CCDSoft automation server.
pub struct CcdSoftCamera<V: CcdSoftVendor> {
    config: CameraConfig,
    capabilities: CameraCapabilities,
    connection: Mutex<CcdSoftConnection<V>>,
    image_saver: Arc<dyn ImageSaver>,
    observer: Arc<dyn RequestObserver>,
}

/// Builder for [`CcdSoftCamera`].
pub struct CcdSoftCameraBuilder<V: CcdSoftVendor> {
    vendor: V,
    config: CameraConfig,
    capabilities: Option<CameraCapabilities>,
    image_saver: Option<Arc<dyn ImageSaver>>,
    observer: Arc<dyn RequestObserver>,
}

impl<V: CcdSoftVendor> CcdSoftCameraBuilder<V> {
    /// Configuration to validate and use. Defaults to [`CameraConfig::default`].
    pub fn config(mut self, config: CameraConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the capability tables derived from the configuration.
    pub fn capabilities(mut self, capabilities: CameraCapabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    /// Where read-out frames go. Defaults to a [`MemoryImageStore`].
    pub fn image_saver(mut self, saver: Arc<dyn ImageSaver>) -> Self {
        self.image_saver = Some(saver);
        self
    }

    /// Receives request lifecycle notifications. Defaults to [`NullObserver`].
    pub fn observer(mut self, observer: Arc<dyn RequestObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Validate the configuration and build the driver. No vendor call is made.
    pub fn build(self) -> CameraResult<CcdSoftCamera<V>> {
        self.config.validate()?;
        let capabilities = self
            .capabilities
            .unwrap_or_else(|| CameraCapabilities::from_config(&self.config));
        let image_saver = self
            .image_saver
            .unwrap_or_else(|| Arc::new(MemoryImageStore::new()));

        Ok(CcdSoftCamera {
            config: self.config,
            capabilities,
            connection: Mutex::new(CcdSoftConnection::new(self.vendor)),
            image_saver,
            observer: self.observer,
        })
    }
}

impl<V: CcdSoftVendor> CcdSoftCamera<V> {
    /// Start building a driver around a vendor object.
    pub fn builder(vendor: V) -> CcdSoftCameraBuilder<V> {
        CcdSoftCameraBuilder {
            vendor,
            config: CameraConfig::default(),
            capabilities: None,
            image_saver: None,
            observer: Arc::new(NullObserver),
        }
    }

    /// The validated configuration.
    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// The capability tables in use.
    pub fn capabilities(&self) -> &CameraCapabilities {
        &self.capabilities
    }

    /// Connect to the camera. Failures surface as [`CameraError::Connection`].
    pub async fn open(&self) -> CameraResult<()> {
        self.connection.lock().await.open()
    }

    /// Disconnect from the camera.
    pub async fn close(&self) -> CameraResult<()> {
        self.connection.lock().await.close()
    }

    /// Whether the vendor connection is open.
    pub async fn is_connected(&self) -> bool {
        self.connection.lock().await.is_connected()
    }

    /// Start-up hook: connects.
    pub async fn start(&self) -> CameraResult<()> {
        tracing::info!(model = %self.config.model, "Starting CCDSoft camera");
        self.open().await
    }

    /// Shutdown hook: disconnects.
    pub async fn stop(&self) -> CameraResult<()> {
        tracing::info!(model = %self.config.model, "Stopping CCDSoft camera");
        self.close().await
    }

    /// Readout geometry for a binning/window pair on the current CCD.
    pub fn readout_mode_info(
        &self,
        binning: Option<&str>,
        window: Option<Window>,
    ) -> CameraResult<ReadoutModeInfo> {
        self.capabilities.readout_mode_info(binning, window)
    }

    fn temperature_supported(&self) -> bool {
        let supported = self.capabilities.supports(CameraFeature::TemperatureControl);
        if !supported {
            tracing::debug!("Temperature control not supported");
        }
        supported
    }
}

impl<V: CcdSoftVendor> CameraInfo for CcdSoftCamera<V> {
    fn ccds(&self) -> &BTreeMap<CcdChannel, Ccd> {
        self.capabilities.ccds()
    }

    fn current_ccd(&self) -> CcdChannel {
        self.capabilities.current_ccd()
    }

    fn binnings(&self) -> &BTreeMap<String, u32> {
        self.capabilities.binnings()
    }

    fn adcs(&self) -> &BTreeMap<String, u32> {
        self.capabilities.adcs()
    }

    fn physical_size(&self) -> (u32, u32) {
        self.capabilities.physical_size()
    }

    fn pixel_size(&self) -> (f64, f64) {
        self.capabilities.pixel_size()
    }

    fn overscan_size(&self, _ccd: Option<CcdChannel>) -> (u32, u32) {
        (0, 0)
    }

    fn readout_modes(&self) -> &ReadoutModeTable {
        self.capabilities.readout_modes()
    }

    fn supports(&self, feature: CameraFeature) -> bool {
        self.capabilities.supports(feature)
    }
}

#[async_trait]
impl<V: CcdSoftVendor> ImagingCamera for CcdSoftCamera<V> {
    async fn expose(
        &self,
        request: &mut ImageRequest,
        abort: &AbortSignal,
    ) -> CameraResult<CameraStatus> {
        let plan = ExposurePlan::from_request(request, &self.capabilities, &self.config)?;
        if plan.exptime != request.exptime {
            tracing::warn!(
                requested = request.exptime,
                minimum = self.config.min_exptime,
                "Exposure time below minimum, clamping"
            );
            request.exptime = plan.exptime;
        }

        self.observer.expose_begin(request);

        {
            let mut conn = self.connection.lock().await;
            let vendor = conn.vendor()?;
            configure(vendor, &plan)?;
            vendor.take_image()?;
        }
        tracing::info!(
            request = %request.id,
            exptime = plan.exptime,
            binning = %plan.binning_name,
            frame = plan.frame.as_str(),
            "Exposure started"
        );

        let status = wait_for_completion(
            &self.connection,
            abort,
            self.config.poll_interval,
            self.config.exposure_deadline(plan.exptime),
        )
        .await?;

        self.observer.expose_complete(request, status);
        Ok(status)
    }

    async fn readout(
        &self,
        request: &mut ImageRequest,
        abort: &AbortSignal,
    ) -> CameraResult<Option<ImageProxy>> {
        self.observer.readout_begin(request);

        let frame = {
            let mut conn = self.connection.lock().await;
            read_active_image(conn.vendor()?)?
        };

        let info = self
            .capabilities
            .readout_mode_info(request.binning.as_deref(), request.window)?;
        request.push_header("GAIN", info.mode.gain_header_value(), GAIN_HEADER_COMMENT);

        let metadata = ImageMetadata {
            frame_start_time: frame.frame_start_time,
            frame_temperature: self.temperature().await?,
            binning_factor: self.capabilities.binning_factor(&info.binning)?,
        };

        let proxy = self
            .image_saver
            .save(request, frame.pixels, metadata)
            .await
            .map_err(|e| CameraError::Storage(format!("{e:#}")))?;

        if abort.is_set() {
            tracing::warn!(request = %request.id, "Readout aborted, discarding image");
            self.observer.readout_complete(None, CameraStatus::Aborted);
            return Ok(None);
        }

        tracing::info!(request = %request.id, %proxy, "Readout complete");
        self.observer.readout_complete(Some(&proxy), CameraStatus::Ok);
        Ok(Some(proxy))
    }
}

#[async_trait]
impl<V: CcdSoftVendor> TemperatureControl for CcdSoftCamera<V> {
    async fn start_cooling(&self, setpoint: f64) -> CameraResult<bool> {
        if !self.temperature_supported() {
            return Ok(false);
        }
        let mut conn = self.connection.lock().await;
        CcdSoftThermal::start_cooling(conn.vendor()?, setpoint)?;
        tracing::info!(setpoint, "Temperature regulation started");
        Ok(true)
    }

    async fn stop_cooling(&self) -> CameraResult<bool> {
        if !self.temperature_supported() {
            return Ok(false);
        }
        let mut conn = self.connection.lock().await;
        CcdSoftThermal::stop_cooling(conn.vendor()?)?;
        tracing::info!("Temperature regulation stopped");
        Ok(true)
    }

    async fn is_cooling(&self) -> CameraResult<bool> {
        if !self.temperature_supported() {
            return Ok(false);
        }
        let mut conn = self.connection.lock().await;
        Ok(CcdSoftThermal::is_cooling(conn.vendor()?)?)
    }

    async fn temperature(&self) -> CameraResult<Option<f64>> {
        if !self.temperature_supported() {
            return Ok(None);
        }
        let mut conn = self.connection.lock().await;
        Ok(Some(CcdSoftThermal::temperature(conn.vendor()?)?))
    }

    async fn set_point(&self) -> CameraResult<Option<f64>> {
        if !self.temperature_supported() {
            return Ok(None);
        }
        let mut conn = self.connection.lock().await;
        Ok(Some(CcdSoftThermal::set_point(conn.vendor()?)?))
    }
}

// CCDSoft exposes no fan control.
#[async_trait]
impl<V: CcdSoftVendor> FanControl for CcdSoftCamera<V> {
    async fn start_fan(&self, _rate: Option<f64>) -> CameraResult<bool> {
        Ok(false)
    }

    async fn stop_fan(&self) -> CameraResult<bool> {
        Ok(false)
    }

    async fn is_fanning(&self) -> CameraResult<bool> {
        Ok(false)
    }
}

impl<V: CcdSoftVendor> Drop for CcdSoftCamera<V> {
    fn drop(&mut self) {
        if self.connection.get_mut().is_connected() {
            tracing::warn!(
                "CcdSoftCamera dropped while connected. \
                 Call camera.stop().await before dropping to disconnect cleanly."
            );
        }
    }
}
