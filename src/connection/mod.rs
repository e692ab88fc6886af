//! Connection management for the WiFi link
//!
//! This module handles:
//! - Trying stored candidate networks in priority order
//! - Falling back to the built-in network
//! - Fixed-interval backoff after a pass where nothing joined
//! - Noticing link loss and re-running the pass

mod manager;

pub use manager::{
    ConnectOutcome, ConnectionConfig, ConnectionManager, ConnectivityContext, Route,
    FALLBACK_PASSWORD, FALLBACK_SSID,
};
