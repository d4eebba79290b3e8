//! Building blocks of the driver, one per concern.

pub mod acquisition;
pub mod connection;
pub mod readout;
pub mod tables;
pub mod thermal;
pub mod vendor;
