//! CCDSoft temperature regulation
//!
//! Direct property forwarding. The vendor object is the only source of truth
//! for temperature and regulation state; nothing is cached here.

use crate::components::vendor::{CcdSoftVendor, VendorResult};

/// Temperature regulation through the vendor properties.
pub struct CcdSoftThermal;

impl CcdSoftThermal {
    /// Regulate towards `setpoint` and keep regulating after the driver disconnects.
    pub fn start_cooling<V: CcdSoftVendor>(vendor: &mut V, setpoint: f64) -> VendorResult<()> {
        vendor.set_shutdown_regulation_on_disconnect(false)?;
        vendor.set_temperature_set_point(setpoint)?;
        vendor.set_regulate_temperature(true)
    }

    /// Turn regulation off.
    pub fn stop_cooling<V: CcdSoftVendor>(vendor: &mut V) -> VendorResult<()> {
        vendor.set_regulate_temperature(false)
    }

    /// Whether regulation is on.
    pub fn is_cooling<V: CcdSoftVendor>(vendor: &mut V) -> VendorResult<bool> {
        vendor.regulate_temperature()
    }

    /// Sensor temperature in Celsius.
    pub fn temperature<V: CcdSoftVendor>(vendor: &mut V) -> VendorResult<f64> {
        vendor.temperature()
    }

    /// Regulation set point in Celsius.
    pub fn set_point<V: CcdSoftVendor>(vendor: &mut V) -> VendorResult<f64> {
        vendor.temperature_set_point()
    }
}
