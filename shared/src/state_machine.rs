//! Connection State Machine
//!
//! Defines valid link state transitions and the fixed-interval backoff
//! window entered after a failed pass over every candidate network.

use crate::timing;

/// Link state as seen by the connectivity loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Backoff,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Backoff => write!(f, "backoff"),
        }
    }
}

/// Events that can trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// A pass over the candidate list started
    AttemptStarted,
    /// A candidate (or the fallback) joined
    Joined,
    /// Every candidate and the fallback failed at the given time
    AllCandidatesFailed { at_ms: u64 },
    /// The radio reported the link gone
    LinkLost,
    /// The radio reported a live link we did not establish ourselves
    LinkUp,
}

/// Result of a state transition attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    /// Transition was valid, new state attached
    Success(ConnectionState),
    /// Transition was invalid from current state
    Invalid {
        from: ConnectionState,
        event: LinkEvent,
    },
}

/// Fixed cooldown after total connection failure.
///
/// There is no growth and no jitter: the window is always `interval_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffTimer {
    last_attempt_ms: Option<u64>,
    interval_ms: u64,
}

impl Default for BackoffTimer {
    fn default() -> Self {
        Self::new(timing::BACKOFF_INTERVAL_MS)
    }
}

impl BackoffTimer {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            last_attempt_ms: None,
            interval_ms,
        }
    }

    /// Start a backoff window at `now_ms`
    pub fn enter(&mut self, now_ms: u64) {
        self.last_attempt_ms = Some(now_ms);
    }

    pub fn clear(&mut self) {
        self.last_attempt_ms = None;
    }

    pub fn is_active(&self) -> bool {
        self.last_attempt_ms.is_some()
    }

    pub fn last_attempt_ms(&self) -> Option<u64> {
        self.last_attempt_ms
    }

    /// Whether the window has elapsed. Always true when not in backoff.
    pub fn is_elapsed(&self, now_ms: u64) -> bool {
        match self.last_attempt_ms {
            Some(last) => now_ms.saturating_sub(last) >= self.interval_ms,
            None => true,
        }
    }

    /// Time at which the next attempt is allowed
    pub fn retry_at_ms(&self) -> Option<u64> {
        self.last_attempt_ms.map(|last| last + self.interval_ms)
    }
}

/// The connection state machine
#[derive(Debug, Default)]
pub struct ConnectionStateMachine {
    current_state: ConnectionState,
    backoff: BackoffTimer,
}

impl ConnectionStateMachine {
    /// Create a new state machine in Disconnected state
    pub fn new(backoff_interval_ms: u64) -> Self {
        Self {
            current_state: ConnectionState::Disconnected,
            backoff: BackoffTimer::new(backoff_interval_ms),
        }
    }

    /// Get current state
    pub fn state(&self) -> ConnectionState {
        self.current_state
    }

    pub fn is_connected(&self) -> bool {
        self.current_state == ConnectionState::Connected
    }

    pub fn in_backoff(&self) -> bool {
        self.current_state == ConnectionState::Backoff
    }

    pub fn backoff(&self) -> &BackoffTimer {
        &self.backoff
    }

    /// Whether the loop should run a connection pass now.
    ///
    /// Disconnected: always. Backoff: only once the window has elapsed.
    /// Connecting or Connected: never.
    pub fn should_attempt(&self, now_ms: u64) -> bool {
        match self.current_state {
            ConnectionState::Disconnected => true,
            ConnectionState::Backoff => self.backoff.is_elapsed(now_ms),
            ConnectionState::Connecting | ConnectionState::Connected => false,
        }
    }

    /// Process an event and return the transition result
    pub fn process_event(&mut self, event: LinkEvent) -> TransitionResult {
        match self.get_next_state(&event) {
            Some(state) => {
                match event {
                    LinkEvent::Joined | LinkEvent::LinkUp => self.backoff.clear(),
                    LinkEvent::AllCandidatesFailed { at_ms } => self.backoff.enter(at_ms),
                    LinkEvent::AttemptStarted | LinkEvent::LinkLost => {}
                }
                self.current_state = state;
                TransitionResult::Success(state)
            }
            None => TransitionResult::Invalid {
                from: self.current_state,
                event,
            },
        }
    }

    /// Get the next state for a given event, if the transition is valid
    fn get_next_state(&self, event: &LinkEvent) -> Option<ConnectionState> {
        use ConnectionState::*;

        match (self.current_state, event) {
            // A pass starts from rest or from an expired backoff
            (Disconnected | Backoff, LinkEvent::AttemptStarted) => Some(Connecting),

            // From Connecting
            (Connecting, LinkEvent::Joined) => Some(Connected),
            (Connecting, LinkEvent::AllCandidatesFailed { .. }) => Some(Backoff),

            // From Connected
            (Connected, LinkEvent::LinkLost) => Some(Disconnected),

            // The radio may come up on its own (e.g. OS autoconnect)
            (Disconnected | Backoff | Connecting, LinkEvent::LinkUp) => Some(Connected),
            (Connected, LinkEvent::LinkUp) => Some(Connected),

            // Invalid transition
            _ => None,
        }
    }
}
