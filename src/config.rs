//! Device configuration
//!
//! Every setting has a compiled-in default and may be overridden by a
//! `TRACKER_*` environment variable.

use crate::connection::ConnectionConfig;
use crate::positioning::GpsConfig;
use crate::tracker::FallbackSyncPolicy;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracker_shared::{timing, NetworkCredential};

/// Application configuration loaded and validated at startup
#[derive(Debug, Clone, Default)]
pub struct DeviceConfig {
    /// WiFi connection settings
    pub network: NetworkConfig,

    /// Directory and telemetry endpoints
    pub backend: BackendConfig,

    /// GPS receiver port
    pub gps: GpsConfig,

    pub storage: StorageConfig,

    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Default)]
pub struct NetworkConfig {
    /// WiFi interface to use; any interface when unset
    pub interface: Option<String>,
    pub connection: ConnectionConfig,
    pub fallback_sync: FallbackSyncPolicy,
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub directory_url: String,
    pub telemetry_url: String,
    /// Shared key sent as the `key` query parameter
    pub api_key: String,
    pub http_timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            directory_url: "http://localhost/wifi".into(),
            telemetry_url: "http://localhost/receivedata".into(),
            api_key: "keyvalue".into(),
            http_timeout: Duration::from_millis(10_000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub credentials_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            credentials_path: PathBuf::from("/var/lib/tracker/wifi.json"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub loop_interval: Duration,
    /// Samples held while offline; 0 drops them
    pub offline_buffer: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            loop_interval: Duration::from_millis(timing::LOOP_INTERVAL_MS),
            offline_buffer: 0,
        }
    }
}

/// Source of configuration values by variable name
type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

impl DeviceConfig {
    /// Load from the process environment
    pub fn load() -> Result<Self> {
        Self::from_lookup(&|name| std::env::var(name).ok())
    }

    /// Load with `lookup` standing in for the environment
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let config = Self {
            network: NetworkConfig::load(lookup)?,
            backend: BackendConfig::load(lookup)?,
            gps: load_gps(lookup)?,
            storage: StorageConfig::load(lookup),
            telemetry: TelemetryConfig::load(lookup)?,
        };

        anyhow::ensure!(
            !config.network.connection.connect_timeout.is_zero(),
            "TRACKER_CONNECT_TIMEOUT_MS must be greater than zero"
        );
        anyhow::ensure!(
            !config.telemetry.loop_interval.is_zero(),
            "TRACKER_LOOP_INTERVAL_MS must be greater than zero"
        );

        Ok(config)
    }
}

impl NetworkConfig {
    fn load(lookup: Lookup<'_>) -> Result<Self> {
        let defaults = ConnectionConfig::default();
        let fallback = NetworkCredential::new(
            lookup("TRACKER_FALLBACK_SSID").unwrap_or(defaults.fallback.ssid),
            lookup("TRACKER_FALLBACK_PASSWORD").unwrap_or(defaults.fallback.password),
        );

        Ok(Self {
            interface: lookup("TRACKER_WIFI_INTERFACE").filter(|iface| !iface.is_empty()),
            connection: ConnectionConfig {
                fallback,
                connect_timeout: millis(lookup, "TRACKER_CONNECT_TIMEOUT_MS", defaults.connect_timeout)?,
                backoff_interval: millis(lookup, "TRACKER_BACKOFF_INTERVAL_MS", defaults.backoff_interval)?,
            },
            fallback_sync: parse_or(lookup, "TRACKER_FALLBACK_SYNC", FallbackSyncPolicy::default())?,
        })
    }
}

impl BackendConfig {
    fn load(lookup: Lookup<'_>) -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            directory_url: lookup("TRACKER_DIRECTORY_URL").unwrap_or(defaults.directory_url),
            telemetry_url: lookup("TRACKER_TELEMETRY_URL").unwrap_or(defaults.telemetry_url),
            api_key: lookup("TRACKER_API_KEY").unwrap_or(defaults.api_key),
            http_timeout: millis(lookup, "TRACKER_HTTP_TIMEOUT_MS", defaults.http_timeout)?,
        })
    }
}

impl StorageConfig {
    fn load(lookup: Lookup<'_>) -> Self {
        Self {
            credentials_path: lookup("TRACKER_CREDENTIALS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| Self::default().credentials_path),
        }
    }
}

impl TelemetryConfig {
    fn load(lookup: Lookup<'_>) -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            loop_interval: millis(lookup, "TRACKER_LOOP_INTERVAL_MS", defaults.loop_interval)?,
            offline_buffer: parse_or(lookup, "TRACKER_OFFLINE_BUFFER", defaults.offline_buffer)?,
        })
    }
}

fn load_gps(lookup: Lookup<'_>) -> Result<GpsConfig> {
    let defaults = GpsConfig::default();

    Ok(GpsConfig {
        port: lookup("TRACKER_GPS_PORT").unwrap_or(defaults.port),
        baud: parse_or(lookup, "TRACKER_GPS_BAUD", defaults.baud)?,
    })
}

fn parse_or<T>(lookup: Lookup<'_>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("failed to parse {name}: invalid value {value:?}")),
        None => Ok(default),
    }
}

fn millis(lookup: Lookup<'_>, name: &str, default: Duration) -> Result<Duration> {
    parse_or(lookup, name, default.as_millis() as u64).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{FALLBACK_PASSWORD, FALLBACK_SSID};
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<DeviceConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DeviceConfig::from_lookup(&|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();

        assert_eq!(config.network.interface, None);
        assert_eq!(config.network.connection.fallback.ssid, FALLBACK_SSID);
        assert_eq!(config.network.connection.fallback.password, FALLBACK_PASSWORD);
        assert_eq!(config.network.connection.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.network.connection.backoff_interval, Duration::from_secs(30));
        assert_eq!(config.network.fallback_sync, FallbackSyncPolicy::EveryFallbackJoin);
        assert_eq!(config.backend.directory_url, "http://localhost/wifi");
        assert_eq!(config.backend.telemetry_url, "http://localhost/receivedata");
        assert_eq!(config.backend.api_key, "keyvalue");
        assert_eq!(config.gps.port, "/dev/ttyS1");
        assert_eq!(config.gps.baud, 9600);
        assert_eq!(config.telemetry.loop_interval, Duration::from_secs(2));
        assert_eq!(config.telemetry.offline_buffer, 0);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("TRACKER_WIFI_INTERFACE", "wlan1"),
            ("TRACKER_FALLBACK_SSID", "depot"),
            ("TRACKER_BACKOFF_INTERVAL_MS", "5000"),
            ("TRACKER_FALLBACK_SYNC", "first"),
            ("TRACKER_API_KEY", "s3cret"),
            ("TRACKER_GPS_BAUD", "115200"),
            ("TRACKER_CREDENTIALS_PATH", "/tmp/wifi.json"),
            ("TRACKER_OFFLINE_BUFFER", "32"),
        ])
        .unwrap();

        assert_eq!(config.network.interface.as_deref(), Some("wlan1"));
        assert_eq!(config.network.connection.fallback.ssid, "depot");
        assert_eq!(config.network.connection.fallback.password, FALLBACK_PASSWORD);
        assert_eq!(config.network.connection.backoff_interval, Duration::from_secs(5));
        assert_eq!(config.network.fallback_sync, FallbackSyncPolicy::FirstFallbackJoinOnly);
        assert_eq!(config.backend.api_key, "s3cret");
        assert_eq!(config.gps.baud, 115_200);
        assert_eq!(config.storage.credentials_path, PathBuf::from("/tmp/wifi.json"));
        assert_eq!(config.telemetry.offline_buffer, 32);
    }

    #[test]
    fn test_empty_interface_means_any() {
        let config = load(&[("TRACKER_WIFI_INTERFACE", "")]).unwrap();
        assert_eq!(config.network.interface, None);
    }

    #[test]
    fn test_invalid_number_names_the_variable() {
        let err = load(&[("TRACKER_CONNECT_TIMEOUT_MS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("TRACKER_CONNECT_TIMEOUT_MS"));
    }

    #[test]
    fn test_invalid_fallback_sync_is_rejected() {
        let err = load(&[("TRACKER_FALLBACK_SYNC", "never")]).unwrap_err();
        assert!(err.to_string().contains("TRACKER_FALLBACK_SYNC"));
    }

    #[test]
    fn test_zero_loop_interval_is_rejected() {
        assert!(load(&[("TRACKER_LOOP_INTERVAL_MS", "0")]).is_err());
    }
}
