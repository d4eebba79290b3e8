//! Static capability tables
//!
//! Built once from [`CameraConfig`] when the driver is created and never
//! mutated afterwards. Readout modes are a pure function of the sensor
//! geometry and the binning table.

use obs_core::capabilities::ReadoutModeTable;
use obs_core::{
    Binning, CameraConfig, CameraError, CameraFeature, CameraResult, Ccd, CcdChannel,
    ReadoutMode, ReadoutModeInfo, Window,
};
use std::collections::BTreeMap;

/// The single imaging CCD exposed by CCDSoft.
pub const IMAGING_CHANNEL: CcdChannel = CcdChannel(1 << 1);

/// Id of the camera's only ADC.
pub const ADC_12_BIT: u32 = 1 << 2;

/// Binning used when a request does not name one.
pub const DEFAULT_BINNING: &str = "1x1";

/// (name, readout mode id, binning factor)
const BINNING_TABLE: [(&str, u32, u32); 5] = [
    ("1x1", 0, 1),
    ("2x2", 1, 2),
    ("3x3", 2, 3),
    ("9x9", 3, 9),
    ("10x10", 4, 10),
];

/// Frame geometry for one binning, derived from the physical sensor.
pub fn derive_readout_mode(config: &CameraConfig, mode: u32, binning: Binning) -> ReadoutMode {
    ReadoutMode {
        mode,
        width: config.ccd_width / binning.x,
        height: config.ccd_height / binning.y,
        pixel_width: config.ccd_pixsize_x * f64::from(binning.x),
        pixel_height: config.ccd_pixsize_y * f64::from(binning.y),
        // CCDSoft does not report ElectronsPerADU through this driver
        gain: None,
    }
}

/// Immutable capability description of a CCDSoft camera.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraCapabilities {
    ccds: BTreeMap<CcdChannel, Ccd>,
    current_ccd: CcdChannel,
    adcs: BTreeMap<String, u32>,
    binnings: BTreeMap<String, u32>,
    binning_factors: BTreeMap<String, u32>,
    features: BTreeMap<CameraFeature, bool>,
    readout_modes: ReadoutModeTable,
    physical_size: (u32, u32),
    pixel_size: (f64, f64),
}

impl CameraCapabilities {
    /// Build the tables for the sensor described by `config`.
    pub fn from_config(config: &CameraConfig) -> Self {
        let ccds = BTreeMap::from([(IMAGING_CHANNEL, Ccd::Imaging)]);
        let adcs = BTreeMap::from([("12 bits".to_string(), ADC_12_BIT)]);

        let mut binnings = BTreeMap::new();
        let mut binning_factors = BTreeMap::new();
        let mut modes = BTreeMap::new();
        for (name, mode, factor) in BINNING_TABLE {
            binnings.insert(name.to_string(), mode);
            binning_factors.insert(name.to_string(), factor);
            modes.insert(
                mode,
                derive_readout_mode(config, mode, Binning::new(factor, factor)),
            );
        }

        let features = CameraFeature::ALL
            .into_iter()
            .map(|f| (f, f == CameraFeature::TemperatureControl))
            .collect();

        Self {
            ccds,
            current_ccd: IMAGING_CHANNEL,
            adcs,
            binnings,
            binning_factors,
            features,
            readout_modes: BTreeMap::from([(IMAGING_CHANNEL, modes)]),
            physical_size: (config.ccd_width, config.ccd_height),
            pixel_size: (config.ccd_pixsize_x, config.ccd_pixsize_y),
        }
    }

    /// Override one entry of the feature-support table.
    pub fn with_feature(mut self, feature: CameraFeature, supported: bool) -> Self {
        self.features.insert(feature, supported);
        self
    }

    /// Channel table
    pub fn ccds(&self) -> &BTreeMap<CcdChannel, Ccd> {
        &self.ccds
    }

    /// Channel used for imaging
    pub fn current_ccd(&self) -> CcdChannel {
        self.current_ccd
    }

    /// ADC table
    pub fn adcs(&self) -> &BTreeMap<String, u32> {
        &self.adcs
    }

    /// Binning name to readout mode id
    pub fn binnings(&self) -> &BTreeMap<String, u32> {
        &self.binnings
    }

    /// Binning name to binning factor
    pub fn binning_factors(&self) -> &BTreeMap<String, u32> {
        &self.binning_factors
    }

    /// Readout modes per channel
    pub fn readout_modes(&self) -> &ReadoutModeTable {
        &self.readout_modes
    }

    /// Sensor size in pixels
    pub fn physical_size(&self) -> (u32, u32) {
        self.physical_size
    }

    /// Pixel size in microns
    pub fn pixel_size(&self) -> (f64, f64) {
        self.pixel_size
    }

    /// Feature support. Absent entries are unsupported.
    pub fn supports(&self, feature: CameraFeature) -> bool {
        self.features.get(&feature).copied().unwrap_or(false)
    }

    /// Binning factor for a named mode.
    pub fn binning_factor(&self, name: &str) -> CameraResult<u32> {
        self.binning_factors
            .get(name)
            .copied()
            .ok_or_else(|| CameraError::CapabilityQuery(format!("Unknown binning: {}", name)))
    }

    /// Vendor binning factors for a named binning mode.
    pub fn binning(&self, name: &str) -> CameraResult<Binning> {
        if !self.binnings.contains_key(name) {
            return Err(CameraError::CapabilityQuery(format!(
                "Unknown binning: {}",
                name
            )));
        }
        name.parse()
    }

    /// Readout mode for a channel and binning name.
    pub fn readout_mode(&self, ccd: CcdChannel, binning: &str) -> CameraResult<&ReadoutMode> {
        let id = self
            .binnings
            .get(binning)
            .ok_or_else(|| CameraError::CapabilityQuery(format!("Unknown binning: {}", binning)))?;
        self.readout_modes
            .get(&ccd)
            .ok_or_else(|| CameraError::CapabilityQuery(format!("Unknown CCD: {}", ccd)))?
            .get(id)
            .ok_or_else(|| {
                CameraError::CapabilityQuery(format!("No readout mode {} on {}", id, ccd))
            })
    }

    /// Resolve a request's binning and window on the current CCD.
    ///
    /// A missing binning selects [`DEFAULT_BINNING`]. A window is clipped to
    /// the binned frame; without one the full frame is used.
    pub fn readout_mode_info(
        &self,
        binning: Option<&str>,
        window: Option<Window>,
    ) -> CameraResult<ReadoutModeInfo> {
        let binning = binning.unwrap_or(DEFAULT_BINNING);
        let mode = self.readout_mode(self.current_ccd, binning)?.clone();

        let (top, left, width, height) = match window {
            None => (0, 0, mode.width, mode.height),
            Some(w) => {
                let top = w.top.min(mode.height);
                let left = w.left.min(mode.width);
                let width = w.width.min(mode.width - left);
                let height = w.height.min(mode.height - top);
                if width == 0 || height == 0 {
                    return Err(CameraError::Configuration(format!(
                        "Window {:?} lies outside the {}x{} frame",
                        w, mode.width, mode.height
                    )));
                }
                (top, left, width, height)
            }
        };

        Ok(ReadoutModeInfo {
            mode,
            binning: binning.to_string(),
            top,
            left,
            width,
            height,
        })
    }
}
