//! Tracker control loop
//!
//! One task owns the connectivity context and runs, in order, every
//! iteration: connection upkeep, fallback-triggered sync, telemetry.

use crate::connection::{ConnectOutcome, ConnectionManager, ConnectivityContext, Route};
use crate::credentials::{CredentialStore, CredentialSync};
use crate::positioning::PositionSource;
use crate::telemetry::{TelemetryUplink, UplinkOutcome};
use crate::transport::{HttpClient, WifiRadio};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};
use tracker_shared::ConnectionState;

/// When a join through the fallback network refreshes the candidate list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FallbackSyncPolicy {
    /// Each fallback join triggers one directory fetch
    #[default]
    EveryFallbackJoin,
    /// Only the first fallback join of the process triggers a fetch
    FirstFallbackJoinOnly,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown fallback sync policy {0:?} (expected \"every\" or \"first\")")]
pub struct ParsePolicyError(String);

impl FromStr for FallbackSyncPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "every" => Ok(Self::EveryFallbackJoin),
            "first" => Ok(Self::FirstFallbackJoinOnly),
            _ => Err(ParsePolicyError(s.to_string())),
        }
    }
}

impl fmt::Display for FallbackSyncPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EveryFallbackJoin => write!(f, "every"),
            Self::FirstFallbackJoinOnly => write!(f, "first"),
        }
    }
}

/// What one loop iteration did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tick {
    /// Connection pass run this iteration, if any
    pub connect: Option<ConnectOutcome>,
    /// Whether a directory fetch was attempted after a fallback join
    pub synced: bool,
    pub uplink: UplinkOutcome,
}

pub struct Tracker<R: WifiRadio, H: HttpClient, P: PositionSource> {
    ctx: ConnectivityContext,
    connection: ConnectionManager<R>,
    sync: CredentialSync<H>,
    store: CredentialStore,
    uplink: TelemetryUplink<H>,
    source: P,
    fallback_sync: FallbackSyncPolicy,
    fallback_syncs: u32,
}

impl<R: WifiRadio, H: HttpClient, P: PositionSource> Tracker<R, H, P> {
    pub fn new(
        connection: ConnectionManager<R>,
        sync: CredentialSync<H>,
        store: CredentialStore,
        uplink: TelemetryUplink<H>,
        source: P,
        fallback_sync: FallbackSyncPolicy,
    ) -> Self {
        let ctx = connection.context(Vec::new());
        Self {
            ctx,
            connection,
            sync,
            store,
            uplink,
            source,
            fallback_sync,
            fallback_syncs: 0,
        }
    }

    #[cfg(test)]
    pub fn context(&self) -> &ConnectivityContext {
        &self.ctx
    }

    #[cfg(test)]
    pub fn state(&self) -> ConnectionState {
        self.ctx.state()
    }

    /// Load the stored list, make the first connection pass and refresh the
    /// list from the directory.
    pub async fn start(&mut self) -> ConnectOutcome {
        self.ctx.credentials = self.store.load().await;

        let outcome = self.connection.connect(&mut self.ctx).await;
        self.after_connect(&outcome).await;

        // Startup refresh runs whichever network joined
        self.refresh("startup").await;

        outcome
    }

    /// One iteration: connection upkeep first, then telemetry.
    pub async fn tick(&mut self) -> Tick {
        let connect = self.connection.poll(&mut self.ctx).await;
        let synced = match &connect {
            Some(outcome) => self.after_connect(outcome).await,
            None => false,
        };

        let uplink = self
            .uplink
            .sample_and_maybe_send(self.ctx.state(), &mut self.source)
            .await;

        Tick {
            connect,
            synced,
            uplink,
        }
    }

    /// Start, then tick every `cadence` until Ctrl-C.
    pub async fn run(&mut self, cadence: Duration) {
        self.start().await;

        let mut ticker = tokio::time::interval(cadence);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            self.tick().await;

            tokio::select! {
                _ = ticker.tick() => {}
                result = &mut shutdown => {
                    if let Err(e) = result {
                        error!("[MAIN] Failed to listen for Ctrl-C: {}", e);
                    }
                    info!("[MAIN] Shutting down");
                    break;
                }
            }
        }
    }

    /// Fallback joins refresh the list per policy. Returns whether a fetch ran.
    async fn after_connect(&mut self, outcome: &ConnectOutcome) -> bool {
        let ConnectOutcome::Joined {
            route: Route::Fallback,
            ..
        } = outcome
        else {
            return false;
        };

        if self.fallback_sync == FallbackSyncPolicy::FirstFallbackJoinOnly
            && self.fallback_syncs > 0
        {
            debug!("[SYNC] Fallback join, list already refreshed once");
            return false;
        }

        self.fallback_syncs += 1;
        self.refresh("fallback join").await;
        true
    }

    async fn refresh(&mut self, reason: &str) {
        info!("[SYNC] Refreshing network list ({})", reason);
        // Failures are logged by CredentialSync and leave the list as is
        if let Ok(count) = self
            .sync
            .refresh(self.ctx.state(), &mut self.ctx.credentials, &self.store)
            .await
        {
            info!("[SYNC] {} networks in candidate list", count);
        }
    }
}
