//! Position source abstraction

use super::fix::FixTracker;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use tracker_shared::nmea::NmeaDecoder;
use tracker_shared::{Clock, PositionSample};

/// Anything that yields fixes
#[async_trait]
pub trait PositionSource: Send {
    /// Feed everything the receiver has buffered into the decoder without
    /// waiting for more. Returns the number of sentences decoded.
    async fn drain(&mut self) -> Result<usize>;

    /// Latest fix, if the receiver ever produced one
    fn latest(&self) -> Option<PositionSample>;
}

/// NMEA decoder and fix tracker glued together
pub struct NmeaFeed {
    decoder: NmeaDecoder,
    fixes: FixTracker,
}

impl NmeaFeed {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            decoder: NmeaDecoder::new(),
            fixes: FixTracker::new(clock),
        }
    }

    /// Decode every complete sentence in `data` plus any earlier partial line.
    ///
    /// Corrupt sentences are skipped. Returns the number of sentences applied.
    pub fn feed(&mut self, data: &[u8]) -> usize {
        self.decoder.extend(data);

        let mut applied = 0;
        loop {
            match self.decoder.decode_next() {
                Ok(Some(sentence)) => {
                    self.fixes.apply(&sentence);
                    applied += 1;
                }
                Ok(None) => break,
                Err(e) => debug!("[GPS] Skipping sentence: {}", e),
            }
        }
        applied
    }

    pub fn latest(&self) -> Option<PositionSample> {
        self.fixes.sample()
    }
}
