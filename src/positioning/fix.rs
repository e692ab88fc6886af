//! Latest-fix bookkeeping
//!
//! Folds decoded NMEA sentences into one current fix and stamps every
//! location update, so the age of the position can be reported at read time.

use std::sync::Arc;
use tracker_shared::nmea::{Coordinates, Sentence};
use tracker_shared::{Clock, PositionSample};

/// Tracks the latest fix reported by the receiver
pub struct FixTracker {
    clock: Arc<dyn Clock>,
    /// Last reported location
    location: Option<Coordinates>,
    /// Clock time of the last location update
    location_at_ms: u64,
    /// False once the receiver reports it lost the fix
    valid: bool,
    speed_kmh: f64,
    altitude_m: f64,
}

impl FixTracker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            location: None,
            location_at_ms: 0,
            valid: false,
            speed_kmh: 0.0,
            altitude_m: 0.0,
        }
    }

    /// Update the fix from one decoded sentence
    pub fn apply(&mut self, sentence: &Sentence) {
        match sentence {
            Sentence::Rmc(rmc) => {
                if !rmc.has_fix() {
                    self.valid = false;
                    return;
                }
                if let Some(speed) = rmc.speed_kmh() {
                    self.speed_kmh = speed;
                }
                self.update_location(rmc.coordinates);
            }

            Sentence::Gga(gga) => {
                if !gga.has_fix() {
                    self.valid = false;
                    return;
                }
                if let Some(altitude) = gga.altitude_m {
                    self.altitude_m = altitude;
                }
                self.update_location(gga.coordinates);
            }

            Sentence::Other(_) => {}
        }
    }

    fn update_location(&mut self, coordinates: Option<Coordinates>) {
        if let Some(coordinates) = coordinates {
            self.location = Some(coordinates);
            self.location_at_ms = self.clock.now_ms();
            self.valid = true;
        }
    }

    /// Current fix, or `None` if no location was ever reported
    pub fn sample(&self) -> Option<PositionSample> {
        let location = self.location?;

        Some(PositionSample {
            latitude: location.latitude,
            longitude: location.longitude,
            speed_kmh: self.speed_kmh,
            altitude_m: self.altitude_m,
            age_ms: self.clock.now_ms().saturating_sub(self.location_at_ms),
            valid: self.valid,
        })
    }
}
