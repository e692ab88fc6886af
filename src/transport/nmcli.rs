//! WiFi radio driven through NetworkManager's `nmcli`

use crate::transport::traits::WifiRadio;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::{sleep, timeout, Instant};
use tracing::debug;
use tracker_shared::{timing, NetworkCredential};

/// NetworkManager-backed radio
#[derive(Debug, Clone)]
pub struct NmcliRadio {
    /// Restrict to one interface (e.g. "wlan0"); any WiFi device otherwise
    interface: Option<String>,
    /// Link state poll step while waiting on a join
    poll_interval: Duration,
}

impl NmcliRadio {
    pub fn new(interface: Option<String>) -> Self {
        Self {
            interface,
            poll_interval: Duration::from_millis(timing::CONNECT_POLL_INTERVAL_MS),
        }
    }

    fn connect_args(&self, credential: &NetworkCredential, deadline: Duration) -> Vec<String> {
        let mut args = vec![
            "--wait".to_string(),
            deadline.as_secs().max(1).to_string(),
            "device".into(),
            "wifi".into(),
            "connect".into(),
            credential.ssid.clone(),
        ];
        if !credential.is_open() {
            args.push("password".into());
            args.push(credential.password.clone());
        }
        if let Some(interface) = &self.interface {
            args.push("ifname".into());
            args.push(interface.clone());
        }
        args
    }

    async fn run(args: &[String]) -> Result<String> {
        let output = Command::new("nmcli")
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .context("failed to run nmcli")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("nmcli exited with {}: {}", output.status, stderr.trim()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Whether `nmcli -t -f DEVICE,TYPE,STATE device status` lists a connected WiFi device
fn wifi_connected(status: &str, interface: Option<&str>) -> bool {
    status.lines().any(|line| {
        let mut parts = line.splitn(3, ':');
        let (Some(device), Some(kind), Some(state)) = (parts.next(), parts.next(), parts.next())
        else {
            return false;
        };
        kind == "wifi"
            && state.starts_with("connected")
            && interface.map_or(true, |wanted| wanted == device)
    })
}

#[async_trait]
impl WifiRadio for NmcliRadio {
    async fn join(&self, credential: &NetworkCredential, deadline: Duration) -> Result<()> {
        let started = Instant::now();

        // Drop whatever association is left so the new one is not confused with it
        if let Some(interface) = &self.interface {
            let args = ["device".to_string(), "disconnect".into(), interface.clone()];
            if let Err(e) = Self::run(&args).await {
                debug!("[NET] disconnect before join: {:#}", e);
            }
        }

        let args = self.connect_args(credential, deadline);
        match timeout(deadline, Self::run(&args)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => bail!("timed out after {:?} joining {}", deadline, credential.ssid),
        }

        loop {
            if self.is_connected().await {
                return Ok(());
            }
            if started.elapsed() >= deadline {
                bail!("link to {} did not come up within {:?}", credential.ssid, deadline);
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn is_connected(&self) -> bool {
        let args = [
            "-t".to_string(),
            "-f".into(),
            "DEVICE,TYPE,STATE".into(),
            "device".into(),
            "status".into(),
        ];
        match Self::run(&args).await {
            Ok(status) => wifi_connected(&status, self.interface.as_deref()),
            Err(e) => {
                debug!("[NET] status query failed: {:#}", e);
                false
            }
        }
    }

    fn name(&self) -> &'static str {
        "nmcli"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_args() {
        let radio = NmcliRadio::new(Some("wlan0".into()));
        let args = radio.connect_args(
            &NetworkCredential::new("barn", "hay"),
            Duration::from_millis(10_000),
        );
        assert_eq!(
            args,
            vec![
                "--wait", "10", "device", "wifi", "connect", "barn", "password", "hay", "ifname",
                "wlan0"
            ]
        );
    }

    #[test]
    fn test_connect_args_open_network() {
        let radio = NmcliRadio::new(None);
        let args = radio.connect_args(&NetworkCredential::new("cafe", ""), Duration::from_millis(200));
        assert_eq!(args, vec!["--wait", "1", "device", "wifi", "connect", "cafe"]);
    }

    #[test]
    fn test_wifi_connected_parsing() {
        let status = "wlan0:wifi:connected\neth0:ethernet:unavailable\nlo:loopback:unmanaged\n";
        assert!(wifi_connected(status, None));
        assert!(wifi_connected(status, Some("wlan0")));
        assert!(!wifi_connected(status, Some("wlan1")));

        let connecting = "wlan0:wifi:connecting (getting IP configuration)\n";
        assert!(!wifi_connected(connecting, None));

        let wired_only = "eth0:ethernet:connected\n";
        assert!(!wifi_connected(wired_only, None));
    }
}
