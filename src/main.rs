mod config;
mod connection;
mod credentials;
mod positioning;
mod telemetry;
#[cfg(test)]
mod testing;
mod tracker;
mod transport;

use config::DeviceConfig;
use connection::ConnectionManager;
use credentials::{CredentialStore, CredentialSync, DirectoryConfig};
use positioning::SerialGps;
use std::sync::Arc;
use telemetry::{policy_for_capacity, TelemetryUplink, UplinkConfig};
use tracker::Tracker;
use tracker_shared::{Clock, MonotonicClock};
use transport::{NmcliRadio, ReqwestHttpClient};

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = match DeviceConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("[MAIN] Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    info!("Tracker starting");
    info!("  Directory: {}", config.backend.directory_url);
    info!("  Telemetry: {}", config.backend.telemetry_url);
    info!("  Network list: {}", config.storage.credentials_path.display());
    info!("  Fallback network: {}", config.network.connection.fallback.ssid);

    if let Err(e) = run(config).await {
        error!("[MAIN] {:#}", e);
        std::process::exit(1);
    }
}

async fn run(config: DeviceConfig) -> anyhow::Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::new());

    let gps = SerialGps::open(&config.gps, clock.clone())?;
    info!("GPS receiver on {} @ {} baud", config.gps.port, config.gps.baud);

    let http = ReqwestHttpClient::new(config.backend.http_timeout)?;
    let radio = NmcliRadio::new(config.network.interface.clone());

    let connection = ConnectionManager::new(config.network.connection.clone(), radio, clock);
    let sync = CredentialSync::new(
        http.clone(),
        DirectoryConfig {
            url: config.backend.directory_url.clone(),
            api_key: config.backend.api_key.clone(),
        },
    );
    let policy = policy_for_capacity(config.telemetry.offline_buffer);
    info!("Offline samples: {}", policy.name());
    let uplink = TelemetryUplink::new(
        http,
        UplinkConfig {
            url: config.backend.telemetry_url.clone(),
            api_key: config.backend.api_key.clone(),
        },
        policy,
    );

    let mut tracker = Tracker::new(
        connection,
        sync,
        CredentialStore::new(&config.storage.credentials_path),
        uplink,
        gps,
        config.network.fallback_sync,
    );

    tracker.run(config.telemetry.loop_interval).await;
    Ok(())
}
