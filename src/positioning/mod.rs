//! Positioning Module
//!
//! Turns the NMEA byte stream from a GPS receiver into the latest fix.
//! Supports a serial receiver; tests plug in their own source.

mod fix;
mod serial;
mod source;

pub use serial::{GpsConfig, SerialGps};
pub use source::PositionSource;
