//! Error types for camera drivers.
//!
//! `CameraError` is the single error type surfaced by camera drivers built on
//! this crate. It is a `thiserror` enum whose variants follow how a failure
//! should be handled by the caller:
//!
//! - **`Connection`**: the vendor object could not be reached or configured.
//!   Fatal to the driver until it is reopened.
//! - **`Configuration`**: a request or configuration value the driver refuses.
//!   Fatal to that request only; no hardware state has been changed.
//! - **`CapabilityQuery`**: a lookup by name (binning, CCD channel) that the
//!   capability tables do not know.
//! - **`VendorCall`**: any vendor property or method failure. Propagated as-is,
//!   never retried.
//! - **`Timeout`**: a bounded wait on the vendor ran out.
//! - **`Storage`**: the image persistence collaborator failed.
//! - **`Config`**: a configuration source could not be parsed.
//!
//! Aborts are not errors. They are reported as [`crate::camera::CameraStatus::Aborted`]
//! through the `Ok` channel.

use std::time::Duration;
use thiserror::Error;

/// Convenience alias for results using the camera error type.
pub type CameraResult<T> = std::result::Result<T, CameraError>;

/// Broad classification of a [`CameraError`], useful for matching in tests and
/// for choosing a recovery strategy without inspecting messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraErrorKind {
    /// See [`CameraError::Connection`]
    Connection,
    /// [`CameraError::Configuration`] or [`CameraError::Config`]
    Configuration,
    /// See [`CameraError::CapabilityQuery`]
    CapabilityQuery,
    /// See [`CameraError::VendorCall`]
    VendorCall,
    /// See [`CameraError::Timeout`]
    Timeout,
    /// See [`CameraError::Storage`]
    Storage,
}

impl std::fmt::Display for CameraErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            CameraErrorKind::Connection => "connection",
            CameraErrorKind::Configuration => "configuration",
            CameraErrorKind::CapabilityQuery => "capability_query",
            CameraErrorKind::VendorCall => "vendor_call",
            CameraErrorKind::Timeout => "timeout",
            CameraErrorKind::Storage => "storage",
        };
        write!(f, "{}", label)
    }
}

/// Primary error type for camera drivers.
#[derive(Error, Debug)]
pub enum CameraError {
    /// The vendor automation object is unreachable, refused to connect, or an
    /// operation was attempted while the driver is disconnected.
    ///
    /// **Recovery Strategy**: check the vendor application is running, then reopen.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A request or configuration value was rejected before touching hardware.
    ///
    /// Examples: `Shutter::LeaveAsIs`, a zero sensor width, a malformed window.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A name lookup against the capability tables failed.
    #[error("Capability query error: {0}")]
    CapabilityQuery(String),

    /// A vendor property write, read or method call failed.
    #[error("Vendor call '{operation}' failed: {message}")]
    VendorCall {
        /// Property or method name
        operation: String,
        /// Vendor error text
        message: String,
    },

    /// A bounded wait on the vendor expired.
    #[error("Timed out after {waited:?} waiting for {operation}")]
    Timeout {
        /// What was being waited for
        operation: &'static str,
        /// How long the wait lasted
        waited: Duration,
    },

    /// The image persistence collaborator failed to store a frame.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A configuration source could not be parsed or extracted.
    #[error("Configuration source error: {0}")]
    Config(Box<figment::Error>),
}

impl CameraError {
    /// Classify this error.
    pub fn kind(&self) -> CameraErrorKind {
        match self {
            CameraError::Connection(_) => CameraErrorKind::Connection,
            CameraError::Configuration(_) | CameraError::Config(_) => {
                CameraErrorKind::Configuration
            }
            CameraError::CapabilityQuery(_) => CameraErrorKind::CapabilityQuery,
            CameraError::VendorCall { .. } => CameraErrorKind::VendorCall,
            CameraError::Timeout { .. } => CameraErrorKind::Timeout,
            CameraError::Storage(_) => CameraErrorKind::Storage,
        }
    }

    /// Shorthand for [`CameraError::VendorCall`].
    pub fn vendor(operation: impl Into<String>, message: impl Into<String>) -> Self {
        CameraError::VendorCall {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

impl From<figment::Error> for CameraError {
    fn from(err: figment::Error) -> Self {
        CameraError::Config(Box::new(err))
    }
}
