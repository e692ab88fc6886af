//! Telemetry uplink
//!
//! Reads the latest fix once per loop iteration and sends it to the
//! telemetry endpoint as a single GET when the link is up.

use super::policy::SamplePolicy;
use crate::positioning::PositionSource;
use crate::transport::HttpClient;
use tracing::{debug, info, warn};
use tracker_shared::{codec, ConnectionState, PositionSample};

/// Errors from a telemetry send
#[derive(Debug, thiserror::Error)]
pub enum UplinkError {
    #[error("telemetry endpoint answered HTTP {0}")]
    Rejected(u16),

    #[error("telemetry request failed: {0:#}")]
    Transport(anyhow::Error),
}

/// Telemetry endpoint settings
#[derive(Debug, Clone)]
pub struct UplinkConfig {
    pub url: String,
    pub api_key: String,
}

/// What one iteration did with the latest fix
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UplinkOutcome {
    /// The receiver has not produced a location yet
    NoFix,
    /// Latest fix is invalid or too old
    Ineligible,
    /// Link down; the sample went to the offline policy
    Offline,
    /// Current sample delivered, after `flushed` held samples
    Sent { status: u16, flushed: usize },
    /// Send failed; the current sample is dropped
    Failed,
}

pub struct TelemetryUplink<H: HttpClient> {
    client: H,
    config: UplinkConfig,
    policy: Box<dyn SamplePolicy>,
}

impl<H: HttpClient> TelemetryUplink<H> {
    pub fn new(client: H, config: UplinkConfig, policy: Box<dyn SamplePolicy>) -> Self {
        Self {
            client,
            config,
            policy,
        }
    }

    #[cfg(test)]
    pub fn policy(&self) -> &dyn SamplePolicy {
        self.policy.as_ref()
    }

    /// Drain the source, then send the latest fix if it is eligible and the link is up.
    ///
    /// Never triggers a connection attempt.
    pub async fn sample_and_maybe_send(
        &mut self,
        link: ConnectionState,
        source: &mut dyn PositionSource,
    ) -> UplinkOutcome {
        // Drain regardless of link state so the decoder never falls behind
        match source.drain().await {
            Ok(sentences) => debug!("[GPS] Decoded {} sentences", sentences),
            Err(e) => warn!("[GPS] Drain failed: {:#}", e),
        }

        let Some(sample) = source.latest() else {
            return UplinkOutcome::NoFix;
        };

        if !sample.is_eligible() {
            debug!(
                "[GPS] Ignoring fix: valid={} age={}ms",
                sample.valid, sample.age_ms
            );
            return UplinkOutcome::Ineligible;
        }

        info!(
            "[GPS] Lat: {:.6}, Lng: {:.6}, Speed: {:.2} km/h, Alt: {:.2} m",
            sample.latitude, sample.longitude, sample.speed_kmh, sample.altitude_m
        );

        if link != ConnectionState::Connected {
            self.policy.hold(sample);
            return UplinkOutcome::Offline;
        }

        let flushed = match self.flush_backlog().await {
            Ok(flushed) => flushed,
            Err(e) => {
                warn!("[UPLINK] Flush of held samples stopped: {}", e);
                self.policy.hold(sample);
                return UplinkOutcome::Failed;
            }
        };

        match self.send(&sample).await {
            Ok(status) => UplinkOutcome::Sent { status, flushed },
            Err(e) => {
                warn!("[UPLINK] Sample dropped: {}", e);
                UplinkOutcome::Failed
            }
        }
    }

    /// Send held samples oldest first; unsent ones go back to the policy
    async fn flush_backlog(&mut self) -> Result<usize, UplinkError> {
        let mut pending = self.policy.take_backlog().into_iter();
        let mut flushed = 0;

        while let Some(sample) = pending.next() {
            if let Err(e) = self.send(&sample).await {
                let unsent = std::iter::once(sample).chain(pending).collect();
                self.policy.requeue(unsent);
                return Err(e);
            }
            flushed += 1;
        }

        if flushed > 0 {
            info!("[UPLINK] Flushed {} held samples", flushed);
        }
        Ok(flushed)
    }

    async fn send(&self, sample: &PositionSample) -> Result<u16, UplinkError> {
        let query = codec::telemetry_query(&self.config.api_key, sample);
        let response = self
            .client
            .get(&self.config.url, &query)
            .await
            .map_err(UplinkError::Transport)?;

        info!("[UPLINK] Server response: {}", response.status);
        if !response.is_success() {
            return Err(UplinkError::Rejected(response.status));
        }
        Ok(response.status)
    }
}
