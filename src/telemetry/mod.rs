//! Telemetry uplink of GPS fixes
//!
//! This module handles:
//! - Filtering fixes by validity and age
//! - Sending the latest fix as a query-string GET
//! - Offline handling of samples while the link is down

mod policy;
mod uplink;

pub use policy::{policy_for_capacity, BufferPolicy, DropPolicy, SamplePolicy};
pub use uplink::{TelemetryUplink, UplinkConfig, UplinkError, UplinkOutcome};
