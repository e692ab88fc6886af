//! Tracker Shared Types
//!
//! This crate provides the data model, wire codecs and connection state
//! machine shared by the tracker device. Nothing in here performs I/O.

pub mod clock;
pub mod codec;
pub mod nmea;
pub mod state_machine;

use serde::{Deserialize, Serialize};

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use state_machine::{BackoffTimer, ConnectionState, ConnectionStateMachine, LinkEvent};

/// Timing parameters for the connectivity and telemetry loop
pub mod timing {
    /// Upper bound for a single network join attempt
    pub const CONNECT_TIMEOUT_MS: u64 = 10_000;

    /// Cooldown after every candidate (fallback included) failed
    pub const BACKOFF_INTERVAL_MS: u64 = 30_000;

    /// Main loop cadence
    pub const LOOP_INTERVAL_MS: u64 = 2_000;

    /// Fixes at or beyond this age are never uplinked
    pub const FIX_MAX_AGE_MS: u64 = 2_000;

    /// Link state poll step while waiting on a join
    pub const CONNECT_POLL_INTERVAL_MS: u64 = 500;
}

/// One entry of the candidate network list.
///
/// Field names are the wire names of the persisted document and of the
/// remote directory response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkCredential {
    pub ssid: String,
    pub password: String,
}

impl NetworkCredential {
    pub fn new(ssid: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            password: password.into(),
        }
    }

    /// Open networks carry an empty password
    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}

/// Ordered candidate list; position is priority
pub type CredentialList = Vec<NetworkCredential>;

/// A snapshot of the latest fix from the positioning source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSample {
    pub latitude: f64,
    pub longitude: f64,
    pub speed_kmh: f64,
    pub altitude_m: f64,
    /// Milliseconds since the location was last updated
    pub age_ms: u64,
    pub valid: bool,
}

impl PositionSample {
    /// Whether this sample may be sent to the telemetry endpoint
    pub fn is_eligible(&self) -> bool {
        self.valid && self.age_ms < timing::FIX_MAX_AGE_MS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(valid: bool, age_ms: u64) -> PositionSample {
        PositionSample {
            latitude: 48.1173,
            longitude: 11.516667,
            speed_kmh: 41.48,
            altitude_m: 545.4,
            age_ms,
            valid,
        }
    }

    #[test]
    fn test_sample_eligibility() {
        assert!(sample(true, 0).is_eligible());
        assert!(sample(true, timing::FIX_MAX_AGE_MS - 1).is_eligible());
        assert!(!sample(true, timing::FIX_MAX_AGE_MS).is_eligible());
        assert!(!sample(false, 10).is_eligible());
    }

    #[test]
    fn test_open_network() {
        assert!(NetworkCredential::new("cafe", "").is_open());
        assert!(!NetworkCredential::new("home", "secret").is_open());
    }
}
