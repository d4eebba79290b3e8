//! Static camera configuration.
//!
//! Values are layered with Figment: built-in defaults, then an optional TOML
//! file, then `CCDSOFT_`-prefixed environment variables.
//!
//! ```toml
//! model = "ST-10XME"
//! ccd_width = 2184
//! ccd_height = 1472
//! ccd_pixsize_x = 6.8
//! ccd_pixsize_y = 6.8
//! min_exptime = 0.11
//! poll_interval = "50ms"
//! exposure_timeout_margin = "2m"
//! ```

use crate::error::{CameraError, CameraResult};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "CCDSOFT_";

/// Camera configuration supplied at start-up. Never changed at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Descriptive model name
    pub model: String,
    /// Physical sensor width in pixels
    pub ccd_width: u32,
    /// Physical sensor height in pixels
    pub ccd_height: u32,
    /// Physical pixel width in microns
    pub ccd_pixsize_x: f64,
    /// Physical pixel height in microns
    pub ccd_pixsize_y: f64,
    /// Shortest exposure the vendor driver accepts, in seconds
    pub min_exptime: f64,
    /// Sleep between exposure-completion polls
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// How long past the exposure time to wait for completion before giving up
    #[serde(with = "humantime_serde")]
    pub exposure_timeout_margin: Duration,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            model: "CCDSoft camera".to_string(),
            ccd_width: 4096,
            ccd_height: 4096,
            ccd_pixsize_x: 9.0,
            ccd_pixsize_y: 9.0,
            min_exptime: 0.00001,
            poll_interval: Duration::from_millis(100),
            exposure_timeout_margin: Duration::from_secs(60),
        }
    }
}

impl CameraConfig {
    /// Load configuration from defaults, an optional TOML file and the environment.
    pub fn load(path: Option<&Path>) -> CameraResult<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = path {
            if !path.exists() {
                return Err(CameraError::Configuration(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            tracing::debug!("Loading camera config from: {}", path.display());
            figment = figment.merge(Toml::file(path));
        }

        let config: Self = figment.merge(Env::prefixed(ENV_PREFIX)).extract()?;
        config.validate()?;

        tracing::info!(
            model = %config.model,
            width = config.ccd_width,
            height = config.ccd_height,
            "Loaded camera config"
        );
        Ok(config)
    }

    /// Reject values that would make the capability tables or the exposure
    /// loop meaningless.
    pub fn validate(&self) -> CameraResult<()> {
        if self.ccd_width == 0 || self.ccd_height == 0 {
            return Err(CameraError::Configuration(
                "Sensor size must be non-zero".into(),
            ));
        }
        if !(self.ccd_pixsize_x > 0.0 && self.ccd_pixsize_y > 0.0) {
            return Err(CameraError::Configuration(
                "Pixel size must be positive".into(),
            ));
        }
        if !(self.min_exptime >= 0.0) {
            return Err(CameraError::Configuration(
                "Minimum exposure time must not be negative".into(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(CameraError::Configuration(
                "Poll interval must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Upper bound on the exposure-completion wait for an exposure of `exptime` seconds.
    pub fn exposure_deadline(&self, exptime: f64) -> Duration {
        Duration::try_from_secs_f64(exptime.max(0.0))
            .unwrap_or(Duration::MAX)
            .saturating_add(self.exposure_timeout_margin)
    }
}
