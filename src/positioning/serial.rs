//! GPS receiver on a serial port
//!
//! Reads are never awaited: each drain takes only the bytes already sitting
//! in the driver's receive buffer.

use super::source::{NmeaFeed, PositionSource};
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::FutureExt;
use std::io::ErrorKind;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracker_shared::{Clock, PositionSample};

/// Serial port settings for the receiver
#[derive(Debug, Clone)]
pub struct GpsConfig {
    /// Device path (e.g. "/dev/ttyS1" or "/dev/ttyUSB0")
    pub port: String,
    pub baud: u32,
}

impl Default for GpsConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyS1".into(),
            baud: 9600,
        }
    }
}

/// NMEA receiver attached to a serial port
pub struct SerialGps {
    port: SerialStream,
    feed: NmeaFeed,
    read_buf: Vec<u8>,
}

impl SerialGps {
    /// Open the port described by `config`
    pub fn open(config: &GpsConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let port = tokio_serial::new(&config.port, config.baud)
            .open_native_async()
            .with_context(|| format!("failed to open GPS port {}", config.port))?;

        Ok(Self {
            port,
            feed: NmeaFeed::new(clock),
            read_buf: vec![0u8; 1024],
        })
    }
}

#[async_trait]
impl PositionSource for SerialGps {
    async fn drain(&mut self) -> Result<usize> {
        drain_ready(&mut self.port, &mut self.read_buf, &mut self.feed).context("GPS read failed")
    }

    fn latest(&self) -> Option<PositionSample> {
        self.feed.latest()
    }
}

/// Feed `feed` with every byte `reader` has ready, stopping as soon as a
/// read would wait. Returns the number of sentences decoded.
fn drain_ready<R>(reader: &mut R, buf: &mut [u8], feed: &mut NmeaFeed) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut sentences = 0;

    loop {
        match reader.read(buf).now_or_never() {
            Some(Ok(0)) | None => break,
            Some(Ok(n)) => sentences += feed.feed(&buf[..n]),
            Some(Err(e)) if e.kind() == ErrorKind::WouldBlock => break,
            Some(Err(e)) => return Err(e),
        }
    }

    Ok(sentences)
}
