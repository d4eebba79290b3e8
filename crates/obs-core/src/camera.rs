//! Camera request model shared by every camera driver.
//!
//! These are the framework-side types a driver receives and returns: the
//! image request, shutter and status enums, the closed set of optional
//! features, CCD channels, binning, windows and readout modes.

use crate::error::{CameraError, CameraResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Requested shutter behaviour for an exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shutter {
    /// Shutter open during exposure (light frame)
    #[default]
    Open,
    /// Shutter closed during exposure (dark frame)
    Close,
    /// Leave the shutter in whatever state it is in
    LeaveAsIs,
}

impl Shutter {
    /// Lower-case name, accepted back by `FromStr`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Shutter::Open => "open",
            Shutter::Close => "close",
            Shutter::LeaveAsIs => "leave_as_is",
        }
    }
}

impl FromStr for Shutter {
    type Err = CameraError;

    fn from_str(s: &str) -> CameraResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "open" | "light" => Ok(Shutter::Open),
            "close" | "closed" | "dark" => Ok(Shutter::Close),
            "leave_as_is" | "leave-as-is" => Ok(Shutter::LeaveAsIs),
            other => Err(CameraError::Configuration(format!(
                "Unknown shutter mode: {}",
                other
            ))),
        }
    }
}

/// Terminal status of an exposure or readout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraStatus {
    /// Finished normally
    Ok,
    /// Stopped by the abort signal
    Aborted,
}

impl fmt::Display for CameraStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraStatus::Ok => write!(f, "OK"),
            CameraStatus::Aborted => write!(f, "ABORTED"),
        }
    }
}

/// Optional camera features a driver may or may not support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraFeature {
    /// Sensor cooling with a regulated set point
    TemperatureControl,
    /// Selectable electronic gain
    ProgrammableGain,
    /// Configurable overscan region
    ProgrammableOverscan,
    /// Fan speed control
    ProgrammableFan,
    /// Status LED control
    ProgrammableLeds,
    /// Adjustable bias level
    ProgrammableBiasLevel,
}

impl CameraFeature {
    /// Every feature, in declaration order.
    pub const ALL: [CameraFeature; 6] = [
        CameraFeature::TemperatureControl,
        CameraFeature::ProgrammableGain,
        CameraFeature::ProgrammableOverscan,
        CameraFeature::ProgrammableFan,
        CameraFeature::ProgrammableLeds,
        CameraFeature::ProgrammableBiasLevel,
    ];
}

/// Role of a CCD in the camera head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ccd {
    /// Main imaging sensor
    Imaging,
    /// Guide sensor
    Tracking,
}

/// Driver-assigned identifier of a CCD channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CcdChannel(pub u32);

impl fmt::Display for CcdChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ccd#{}", self.0)
    }
}

/// Horizontal and vertical binning factors, written as `"XxY"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Binning {
    /// Horizontal factor
    pub x: u32,
    /// Vertical factor
    pub y: u32,
}

impl Binning {
    /// Binning of `x` by `y` physical pixels.
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Binning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.x, self.y)
    }
}

impl FromStr for Binning {
    type Err = CameraError;

    fn from_str(s: &str) -> CameraResult<Self> {
        let invalid = || CameraError::Configuration(format!("Invalid binning: {:?}", s));
        let (x, y) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let x: u32 = x.trim().parse().map_err(|_| invalid())?;
        let y: u32 = y.trim().parse().map_err(|_| invalid())?;
        if x == 0 || y == 0 {
            return Err(invalid());
        }
        Ok(Self { x, y })
    }
}

/// Sub-frame window in binned pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Window {
    /// First row
    pub top: u32,
    /// First column
    pub left: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl FromStr for Window {
    type Err = CameraError;

    /// Parses `"top,left,width,height"`.
    fn from_str(s: &str) -> CameraResult<Self> {
        let parts: Vec<u32> = s
            .split(',')
            .map(|p| p.trim().parse::<u32>())
            .collect::<Result<_, _>>()
            .map_err(|_| CameraError::Configuration(format!("Invalid window: {:?}", s)))?;
        match parts.as_slice() {
            [top, left, width, height] => Ok(Self {
                top: *top,
                left: *left,
                width: *width,
                height: *height,
            }),
            _ => Err(CameraError::Configuration(format!(
                "Window needs top,left,width,height: {:?}",
                s
            ))),
        }
    }
}

/// Frame geometry produced by one binning mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadoutMode {
    /// Readout mode id
    pub mode: u32,
    /// Frame width in binned pixels
    pub width: u32,
    /// Frame height in binned pixels
    pub height: u32,
    /// Binned pixel width in microns
    pub pixel_width: f64,
    /// Binned pixel height in microns
    pub pixel_height: f64,
    /// Electronic gain in photoelectrons per ADU, when known
    pub gain: Option<f64>,
}

impl ReadoutMode {
    /// Value written to the GAIN header card.
    pub fn gain_header_value(&self) -> String {
        match self.gain {
            Some(gain) => gain.to_string(),
            None => "UNSET".to_string(),
        }
    }
}

/// A request's binning and window resolved against the readout-mode table.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadoutModeInfo {
    /// Mode selected by the binning
    pub mode: ReadoutMode,
    /// Binning name the mode was resolved from
    pub binning: String,
    /// First row of the clipped window
    pub top: u32,
    /// First column of the clipped window
    pub left: u32,
    /// Width of the clipped window
    pub width: u32,
    /// Height of the clipped window
    pub height: u32,
}

/// One image header entry: key, value and comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderCard {
    /// Header keyword
    pub key: String,
    /// Rendered value
    pub value: String,
    /// Free-text comment
    pub comment: String,
}

impl HeaderCard {
    /// Card from a key, value and comment.
    pub fn new(key: impl Into<String>, value: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            comment: comment.into(),
        }
    }
}

/// A single exposure request.
///
/// Created by the caller per exposure. Drivers mutate it in place: the
/// exposure time is raised to the driver minimum and header cards are
/// appended during readout.
#[derive(Debug, Clone)]
pub struct ImageRequest {
    /// Unique id, assigned at creation
    pub id: Uuid,
    /// Exposure time in seconds
    pub exptime: f64,
    /// Shutter state during the exposure
    pub shutter: Shutter,
    /// Binning name such as `"2x2"`; `None` means the default mode
    pub binning: Option<String>,
    /// Parsed but not applied by drivers without sub-frame support
    pub window: Option<Window>,
    /// Header cards appended while the request is processed
    pub headers: Vec<HeaderCard>,
}

impl ImageRequest {
    /// Request for an `exptime` second exposure with the shutter open and default binning.
    pub fn new(exptime: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            exptime,
            shutter: Shutter::default(),
            binning: None,
            window: None,
            headers: Vec::new(),
        }
    }

    /// Set the shutter state.
    pub fn with_shutter(mut self, shutter: Shutter) -> Self {
        self.shutter = shutter;
        self
    }

    /// Select a binning by name.
    pub fn with_binning(mut self, binning: impl Into<String>) -> Self {
        self.binning = Some(binning.into());
        self
    }

    /// Set a region of interest.
    pub fn with_window(mut self, window: Window) -> Self {
        self.window = Some(window);
        self
    }

    /// Append a header card.
    pub fn push_header(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
        comment: impl Into<String>,
    ) {
        self.headers.push(HeaderCard::new(key, value, comment));
    }

    /// Last header card with the given key.
    pub fn header(&self, key: &str) -> Option<&HeaderCard> {
        self.headers.iter().rev().find(|card| card.key == key)
    }
}
