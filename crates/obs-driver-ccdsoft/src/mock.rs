//! Simulated CCDSoft automation object.
//!
//! [`MockCcdSoft`] is a cloneable handle over shared state: hand one clone to
//! the driver and keep another to script behaviour and inspect the calls the
//! driver made.
//!
//! ```rust,ignore
//! let mock = MockCcdSoft::new().with_polls_to_complete(Some(3));
//! let camera = CcdSoftCamera::builder(mock.clone()).build()?;
//! camera.start().await?;
//! // ... expose ...
//! assert_eq!(mock.count("TakeImage"), 1);
//! ```

use crate::components::vendor::{
    CcdSoftVendor, FrameType, ImageReduction, VendorError, VendorImage, VendorResult,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Julian day used for frames when none is scripted (2024-01-01T00:00:00Z).
pub const DEFAULT_JULIAN_DAY: f64 = 2_460_310.5;

/// Fraction of the remaining difference to the set point covered per read
/// while regulating.
const COOLING_STEP: f64 = 0.25;

/// One vendor property access or method call, in the order the driver made it.
#[derive(Debug, Clone, PartialEq)]
pub enum VendorCall {
    /// `Connect()`
    Connect,
    /// `Disconnect()`
    Disconnect,
    /// Write `Asynchronous`
    SetAsynchronous(bool),
    /// Write `BinX`
    SetBinX(u32),
    /// Write `BinY`
    SetBinY(u32),
    /// Write `Subframe`
    SetSubframe(bool),
    /// Write `ImageReduction` (vendor code)
    SetImageReduction(i32),
    /// Write `ExposureTime`
    SetExposureTime(f64),
    /// Write `Frame` (vendor code)
    SetFrame(i32),
    /// `TakeImage()`
    TakeImage,
    /// Read `IsExposureComplete`
    IsExposureComplete,
    /// `Abort()`
    Abort,
    /// Attach to the active imager and read its data
    ActiveImage,
    /// Read `Temperature`
    Temperature,
    /// Read `TemperatureSetPoint`
    TemperatureSetPoint,
    /// Write `TemperatureSetPoint`
    SetTemperatureSetPoint(f64),
    /// Read `RegulateTemperature`
    RegulateTemperature,
    /// Write `RegulateTemperature`
    SetRegulateTemperature(bool),
    /// Write `ShutDownTemperatureRegulationOnDisconnect`
    SetShutdownRegulationOnDisconnect(bool),
}

impl VendorCall {
    /// Vendor property or method name.
    pub fn operation(&self) -> &'static str {
        match self {
            VendorCall::Connect => "Connect",
            VendorCall::Disconnect => "Disconnect",
            VendorCall::SetAsynchronous(_) => "Asynchronous",
            VendorCall::SetBinX(_) => "BinX",
            VendorCall::SetBinY(_) => "BinY",
            VendorCall::SetSubframe(_) => "Subframe",
            VendorCall::SetImageReduction(_) => "ImageReduction",
            VendorCall::SetExposureTime(_) => "ExposureTime",
            VendorCall::SetFrame(_) => "Frame",
            VendorCall::TakeImage => "TakeImage",
            VendorCall::IsExposureComplete => "IsExposureComplete",
            VendorCall::Abort => "Abort",
            VendorCall::ActiveImage => "AttachToActiveImager",
            VendorCall::Temperature => "Temperature",
            VendorCall::TemperatureSetPoint | VendorCall::SetTemperatureSetPoint(_) => {
                "TemperatureSetPoint"
            }
            VendorCall::RegulateTemperature | VendorCall::SetRegulateTemperature(_) => {
                "RegulateTemperature"
            }
            VendorCall::SetShutdownRegulationOnDisconnect(_) => {
                "ShutDownTemperatureRegulationOnDisconnect"
            }
        }
    }
}

/// Snapshot of the simulated camera.
#[derive(Debug, Clone, PartialEq)]
pub struct MockCcdSoftState {
    /// Set by `Connect`, cleared by `Disconnect`
    pub connected: bool,
    /// `Asynchronous`
    pub asynchronous: bool,
    /// `BinX`
    pub bin_x: u32,
    /// `BinY`
    pub bin_y: u32,
    /// `Subframe`
    pub subframe: bool,
    /// `ImageReduction` code
    pub image_reduction: i32,
    /// `ExposureTime` in seconds
    pub exposure_time: f64,
    /// `Frame` code
    pub frame: i32,
    /// Between `TakeImage` and completion or `Abort`
    pub exposing: bool,
    /// Polls left before the running exposure reports complete; `None` never completes
    pub polls_remaining: Option<u32>,
    /// Polls each new exposure takes; `None` never completes
    pub polls_to_complete: Option<u32>,
    /// Sensor size used to synthesize frames when no image is scripted
    pub sensor_width: u32,
    /// Synthesized frame height
    pub sensor_height: u32,
    /// Scripted `DataArray`, one inner array per column
    pub image: Option<Vec<Vec<u16>>>,
    /// `JulianDay` reported for every frame
    pub julian_day: f64,
    /// Current sensor temperature in Celsius
    pub temperature: f64,
    /// `TemperatureSetPoint`
    pub set_point: f64,
    /// `RegulateTemperature`
    pub regulating: bool,
    /// `ShutDownTemperatureRegulationOnDisconnect`
    pub shutdown_on_disconnect: bool,
    /// Make `Connect` fail
    pub refuse_connect: bool,
    /// Operation name that fails on every call
    pub failing_operation: Option<String>,
    /// Every call, oldest first
    pub calls: Vec<VendorCall>,
}

impl Default for MockCcdSoftState {
    fn default() -> Self {
        Self {
            connected: false,
            asynchronous: false,
            bin_x: 1,
            bin_y: 1,
            subframe: false,
            image_reduction: 0,
            exposure_time: 0.0,
            frame: FrameType::Light.code(),
            exposing: false,
            polls_remaining: None,
            polls_to_complete: Some(2),
            sensor_width: 64,
            sensor_height: 48,
            image: None,
            julian_day: DEFAULT_JULIAN_DAY,
            temperature: 20.0,
            set_point: 20.0,
            regulating: false,
            shutdown_on_disconnect: true,
            refuse_connect: false,
            failing_operation: None,
            calls: Vec::new(),
        }
    }
}

impl MockCcdSoftState {
    fn record(&mut self, call: VendorCall) -> VendorResult<()> {
        let operation = call.operation();
        self.calls.push(call);
        if self.failing_operation.as_deref() == Some(operation) {
            return Err(VendorError::new(operation, "simulated failure"));
        }
        Ok(())
    }

    /// Column-major frame for the current binning.
    fn synthesize_image(&self) -> Vec<Vec<u16>> {
        let width = self.sensor_width / self.bin_x.max(1);
        let height = self.sensor_height / self.bin_y.max(1);
        (0..width)
            .map(|x| (0..height).map(|y| ((x + y * width) % 4096) as u16).collect())
            .collect()
    }
}

/// In-memory stand-in for the CCDSoft camera and image objects.
#[derive(Debug, Clone, Default)]
pub struct MockCcdSoft {
    state: Arc<Mutex<MockCcdSoftState>>,
}

impl MockCcdSoft {
    /// Idle, disconnected camera with the default sensor and timing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Polls of `IsExposureComplete` answered `false` before `true`. `None` never completes.
    pub fn with_polls_to_complete(self, polls: Option<u32>) -> Self {
        self.state.lock().polls_to_complete = polls;
        self
    }

    /// Sensor size used to synthesize frames.
    pub fn with_sensor(self, width: u32, height: u32) -> Self {
        {
            let mut state = self.state.lock();
            state.sensor_width = width;
            state.sensor_height = height;
        }
        self
    }

    /// Script the `DataArray` (column-major) and `JulianDay` of every readout.
    pub fn with_image(self, columns: Vec<Vec<u16>>, julian_day: f64) -> Self {
        {
            let mut state = self.state.lock();
            state.image = Some(columns);
            state.julian_day = julian_day;
        }
        self
    }

    /// Starting temperature and set point.
    pub fn with_temperature(self, celsius: f64) -> Self {
        {
            let mut state = self.state.lock();
            state.temperature = celsius;
            state.set_point = celsius;
        }
        self
    }

    /// Make every call to `operation` (a vendor property or method name) fail.
    pub fn failing_on(self, operation: impl Into<String>) -> Self {
        self.state.lock().failing_operation = Some(operation.into());
        self
    }

    /// Make `Connect` fail.
    pub fn refusing_connect(self) -> Self {
        self.state.lock().refuse_connect = true;
        self
    }

    /// Calls recorded so far.
    pub fn calls(&self) -> Vec<VendorCall> {
        self.state.lock().calls.clone()
    }

    /// Number of recorded calls touching `operation`.
    pub fn count(&self, operation: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Snapshot of the shared state.
    pub fn state(&self) -> MockCcdSoftState {
        self.state.lock().clone()
    }
}

impl CcdSoftVendor for MockCcdSoft {
    fn connect(&mut self) -> VendorResult<()> {
        let mut state = self.state.lock();
        state.record(VendorCall::Connect)?;
        if state.refuse_connect {
            return Err(VendorError::new("Connect", "camera link not available"));
        }
        state.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) -> VendorResult<()> {
        let mut state = self.state.lock();
        state.record(VendorCall::Disconnect)?;
        state.connected = false;
        state.exposing = false;
        if state.shutdown_on_disconnect {
            state.regulating = false;
        }
        Ok(())
    }

    fn set_asynchronous(&mut self, enabled: bool) -> VendorResult<()> {
        let mut state = self.state.lock();
        state.record(VendorCall::SetAsynchronous(enabled))?;
        state.asynchronous = enabled;
        Ok(())
    }

    fn set_bin_x(&mut self, factor: u32) -> VendorResult<()> {
        let mut state = self.state.lock();
        state.record(VendorCall::SetBinX(factor))?;
        state.bin_x = factor;
        Ok(())
    }

    fn set_bin_y(&mut self, factor: u32) -> VendorResult<()> {
        let mut state = self.state.lock();
        state.record(VendorCall::SetBinY(factor))?;
        state.bin_y = factor;
        Ok(())
    }

    fn set_subframe(&mut self, enabled: bool) -> VendorResult<()> {
        let mut state = self.state.lock();
        state.record(VendorCall::SetSubframe(enabled))?;
        state.subframe = enabled;
        Ok(())
    }

    fn set_image_reduction(&mut self, reduction: ImageReduction) -> VendorResult<()> {
        let mut state = self.state.lock();
        state.record(VendorCall::SetImageReduction(reduction.code()))?;
        state.image_reduction = reduction.code();
        Ok(())
    }

    fn set_exposure_time(&mut self, seconds: f64) -> VendorResult<()> {
        let mut state = self.state.lock();
        state.record(VendorCall::SetExposureTime(seconds))?;
        state.exposure_time = seconds;
        Ok(())
    }

    fn set_frame(&mut self, frame: FrameType) -> VendorResult<()> {
        let mut state = self.state.lock();
        state.record(VendorCall::SetFrame(frame.code()))?;
        state.frame = frame.code();
        Ok(())
    }

    fn take_image(&mut self) -> VendorResult<()> {
        let mut state = self.state.lock();
        state.record(VendorCall::TakeImage)?;
        if !state.connected {
            return Err(VendorError::new("TakeImage", "camera not connected"));
        }
        state.exposing = true;
        state.polls_remaining = state.polls_to_complete;
        Ok(())
    }

    fn is_exposure_complete(&mut self) -> VendorResult<bool> {
        let mut state = self.state.lock();
        state.record(VendorCall::IsExposureComplete)?;
        if !state.exposing {
            return Ok(true);
        }
        match state.polls_remaining {
            None => Ok(false),
            Some(0) => {
                state.exposing = false;
                Ok(true)
            }
            Some(n) => {
                state.polls_remaining = Some(n - 1);
                Ok(false)
            }
        }
    }

    fn abort(&mut self) -> VendorResult<()> {
        let mut state = self.state.lock();
        state.record(VendorCall::Abort)?;
        state.exposing = false;
        Ok(())
    }

    fn active_image(&mut self) -> VendorResult<VendorImage> {
        let mut state = self.state.lock();
        state.record(VendorCall::ActiveImage)?;
        let data = match &state.image {
            Some(image) => image.clone(),
            None => state.synthesize_image(),
        };
        Ok(VendorImage {
            data,
            julian_day: state.julian_day,
        })
    }

    fn temperature(&mut self) -> VendorResult<f64> {
        let mut state = self.state.lock();
        state.record(VendorCall::Temperature)?;
        if state.regulating {
            state.temperature += (state.set_point - state.temperature) * COOLING_STEP;
        }
        Ok(state.temperature)
    }

    fn temperature_set_point(&mut self) -> VendorResult<f64> {
        let mut state = self.state.lock();
        state.record(VendorCall::TemperatureSetPoint)?;
        Ok(state.set_point)
    }

    fn set_temperature_set_point(&mut self, celsius: f64) -> VendorResult<()> {
        let mut state = self.state.lock();
        state.record(VendorCall::SetTemperatureSetPoint(celsius))?;
        state.set_point = celsius;
        Ok(())
    }

    fn regulate_temperature(&mut self) -> VendorResult<bool> {
        let mut state = self.state.lock();
        state.record(VendorCall::RegulateTemperature)?;
        Ok(state.regulating)
    }

    fn set_regulate_temperature(&mut self, enabled: bool) -> VendorResult<()> {
        let mut state = self.state.lock();
        state.record(VendorCall::SetRegulateTemperature(enabled))?;
        state.regulating = enabled;
        Ok(())
    }

    fn set_shutdown_regulation_on_disconnect(&mut self, enabled: bool) -> VendorResult<()> {
        let mut state = self.state.lock();
        state.record(VendorCall::SetShutdownRegulationOnDisconnect(enabled))?;
        state.shutdown_on_disconnect = enabled;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completes_after_scripted_polls() {
        let mut mock = MockCcdSoft::new().with_polls_to_complete(Some(2));
        mock.connect().unwrap();
        mock.take_image().unwrap();
        assert!(!mock.is_exposure_complete().unwrap());
        assert!(!mock.is_exposure_complete().unwrap());
        assert!(mock.is_exposure_complete().unwrap());
        assert_eq!(mock.count("IsExposureComplete"), 3);
    }

    #[test]
    fn never_completes_until_aborted() {
        let mut mock = MockCcdSoft::new().with_polls_to_complete(None);
        mock.connect().unwrap();
        mock.take_image().unwrap();
        for _ in 0..10 {
            assert!(!mock.is_exposure_complete().unwrap());
        }
        mock.abort().unwrap();
        assert!(mock.is_exposure_complete().unwrap());
    }

    #[test]
    fn synthesized_image_follows_binning() {
        let mut mock = MockCcdSoft::new().with_sensor(40, 20);
        mock.set_bin_x(2).unwrap();
        mock.set_bin_y(2).unwrap();
        let image = mock.active_image().unwrap();
        assert_eq!(image.data.len(), 20);
        assert!(image.data.iter().all(|column| column.len() == 10));
    }

    #[test]
    fn regulation_drifts_towards_set_point() {
        let mut mock = MockCcdSoft::new().with_temperature(20.0);
        mock.set_temperature_set_point(-10.0).unwrap();
        mock.set_regulate_temperature(true).unwrap();
        let first = mock.temperature().unwrap();
        let second = mock.temperature().unwrap();
        assert!(first < 20.0);
        assert!(second < first);
        assert!(second > -10.0);
    }

    #[test]
    fn failure_injection_by_operation_name() {
        let mut mock = MockCcdSoft::new().failing_on("ExposureTime");
        let err = mock.set_exposure_time(1.0).unwrap_err();
        assert_eq!(err.operation, "ExposureTime");
        assert!(mock.set_bin_x(1).is_ok());
    }

    #[test]
    fn clones_share_state() {
        let observer = MockCcdSoft::new();
        let mut driver_side = observer.clone();
        driver_side.connect().unwrap();
        assert!(observer.state().connected);
        assert_eq!(observer.calls(), vec![VendorCall::Connect]);
    }
}
