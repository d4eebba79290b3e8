//! Core types and traits for observatory camera drivers.
//!
//! - [`camera`]: image requests and the enums/values they are built from
//! - [`capabilities`]: traits a camera driver implements
//! - [`image`]: pixel buffers, frame metadata, stored-image proxies
//! - [`storage`] and [`observer`]: the collaborators a driver reports to
//! - [`config`]: static driver configuration
//! - [`error`]: the `CameraError` taxonomy

pub mod abort;
pub mod camera;
pub mod capabilities;
pub mod config;
pub mod error;
pub mod image;
pub mod observer;
pub mod storage;
pub mod time;

pub use abort::AbortSignal;
pub use camera::{
    Binning, CameraFeature, CameraStatus, Ccd, CcdChannel, HeaderCard, ImageRequest,
    ReadoutMode, ReadoutModeInfo, Shutter, Window,
};
pub use config::CameraConfig;
pub use error::{CameraError, CameraErrorKind, CameraResult};
pub use image::{ImageMetadata, ImageProxy, PixelBuffer};
