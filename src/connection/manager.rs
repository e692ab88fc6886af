//! Connection manager: ordered candidate attempts, built-in fallback, fixed backoff

use crate::transport::WifiRadio;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracker_shared::state_machine::TransitionResult;
use tracker_shared::{
    timing, Clock, ConnectionState, ConnectionStateMachine, CredentialList, LinkEvent,
    NetworkCredential,
};

/// Built-in network tried after every stored candidate failed
pub const FALLBACK_SSID: &str = "tracker-provisioning";
pub const FALLBACK_PASSWORD: &str = "provision-me-2g4";

/// Which credential produced the link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Index into the candidate list
    Candidate(usize),
    Fallback,
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Route::Candidate(index) => write!(f, "candidate #{}", index + 1),
            Route::Fallback => write!(f, "fallback"),
        }
    }
}

/// Result of one connection pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// The radio already had a link; nothing was attempted
    AlreadyConnected,
    /// A network joined
    Joined { ssid: String, route: Route },
    /// Every candidate and the fallback failed
    Backoff { retry_at_ms: u64 },
}

/// Configuration for connection manager
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Network tried when the candidate list is empty or exhausted
    pub fallback: NetworkCredential,
    /// Upper bound for one join attempt
    pub connect_timeout: Duration,
    /// Cooldown after a failed pass
    pub backoff_interval: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            fallback: NetworkCredential::new(FALLBACK_SSID, FALLBACK_PASSWORD),
            connect_timeout: Duration::from_millis(timing::CONNECT_TIMEOUT_MS),
            backoff_interval: Duration::from_millis(timing::BACKOFF_INTERVAL_MS),
        }
    }
}

/// Connectivity state owned by the control loop
#[derive(Debug)]
pub struct ConnectivityContext {
    /// Ordered candidates; replaced wholesale on load or sync
    pub credentials: CredentialList,
    /// Link state and backoff timer
    pub link: ConnectionStateMachine,
}

impl ConnectivityContext {
    pub fn new(credentials: CredentialList, backoff_interval: Duration) -> Self {
        Self {
            credentials,
            link: ConnectionStateMachine::new(backoff_interval.as_millis() as u64),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.link.state()
    }

    /// Feed `event` to the link state machine. Returns false if the
    /// transition was rejected; the state is then unchanged.
    pub fn apply(&mut self, event: LinkEvent) -> bool {
        match self.link.process_event(event) {
            TransitionResult::Success(_) => true,
            TransitionResult::Invalid { from, event } => {
                debug!("[NET] Ignoring {:?} while {}", event, from);
                false
            }
        }
    }
}

/// Drives the radio through candidate networks
pub struct ConnectionManager<R: WifiRadio> {
    config: ConnectionConfig,
    radio: R,
    clock: Arc<dyn Clock>,
}

impl<R: WifiRadio> ConnectionManager<R> {
    pub fn new(config: ConnectionConfig, radio: R, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            radio,
            clock,
        }
    }

    /// Create a context using this manager's backoff interval
    pub fn context(&self, credentials: CredentialList) -> ConnectivityContext {
        ConnectivityContext::new(credentials, self.config.backoff_interval)
    }

    /// Reconcile with the radio, then run a pass if the re-entry policy allows.
    ///
    /// Disconnected: a pass every call. Backoff: a pass only once the
    /// interval has elapsed since the failed pass. Returns `None` when no
    /// pass was run.
    pub async fn poll(&self, ctx: &mut ConnectivityContext) -> Option<ConnectOutcome> {
        let link_up = self.radio.is_connected().await;

        match (ctx.link.state(), link_up) {
            (ConnectionState::Connected, false) => {
                warn!("[NET] Link lost");
                ctx.apply(LinkEvent::LinkLost);
            }
            (ConnectionState::Disconnected | ConnectionState::Backoff, true) => {
                info!("[NET] Link came up outside a connection pass");
                ctx.apply(LinkEvent::LinkUp);
            }
            _ => {}
        }

        if !ctx.link.should_attempt(self.clock.now_ms()) {
            return None;
        }

        Some(self.connect(ctx).await)
    }

    /// One full pass: candidates in order, then the fallback, then backoff.
    pub async fn connect(&self, ctx: &mut ConnectivityContext) -> ConnectOutcome {
        if self.radio.is_connected().await {
            ctx.apply(LinkEvent::LinkUp);
            return ConnectOutcome::AlreadyConnected;
        }

        if ctx.link.is_connected() {
            ctx.apply(LinkEvent::LinkLost);
        }
        ctx.apply(LinkEvent::AttemptStarted);

        for (index, credential) in ctx.credentials.iter().enumerate() {
            if self.try_join(credential).await {
                let ssid = credential.ssid.clone();
                ctx.apply(LinkEvent::Joined);
                let route = Route::Candidate(index);
                info!("[NET] Link up via {}", route);
                return ConnectOutcome::Joined {
                    ssid,
                    route,
                };
            }
        }

        let fallback = &self.config.fallback;
        if self.try_join(fallback).await {
            ctx.apply(LinkEvent::Joined);
            info!("[NET] Link up via {}", Route::Fallback);
            return ConnectOutcome::Joined {
                ssid: fallback.ssid.clone(),
                route: Route::Fallback,
            };
        }

        let now = self.clock.now_ms();
        ctx.apply(LinkEvent::AllCandidatesFailed { at_ms: now });
        let retry_at_ms = ctx.link.backoff().retry_at_ms().unwrap_or(now);
        warn!(
            "[NET] No WiFi connection after {} networks, backing off for {:?}",
            ctx.credentials.len() + 1,
            self.config.backoff_interval
        );

        ConnectOutcome::Backoff { retry_at_ms }
    }

    async fn try_join(&self, credential: &NetworkCredential) -> bool {
        info!("[NET] Trying WiFi ({}): {}", self.radio.name(), credential.ssid);

        match self
            .radio
            .join(credential, self.config.connect_timeout)
            .await
        {
            Ok(()) => {
                info!("[NET] Connected to {}", credential.ssid);
                true
            }
            Err(e) => {
                debug!("[NET] {} failed: {:#}", credential.ssid, e);
                false
            }
        }
    }
}
