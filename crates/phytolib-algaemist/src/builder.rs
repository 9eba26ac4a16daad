//! AlgaemistBuilder -- fluent builder for constructing [`Algaemist`] clients.
//!
//! Separates configuration (port, baud rate, timing, discovery marker)
//! from construction. `connect()` opens the serial port -- auto-detected
//! via discovery when none is given -- and `connect_with_transport()`
//! accepts any [`Transport`] for tests and mocks.
//!
//! # Example
//!
//! ```no_run
//! use phytolib_algaemist::builder::AlgaemistBuilder;
//! use phytolib_core::types::DeviceAddress;
//!
//! # async fn example() -> phytolib_core::Result<()> {
//! let reactor = AlgaemistBuilder::new(DeviceAddress::new(21)?)
//!     .baud_rate(9600)
//!     .connect()
//!     .await?;
//! let ph = reactor.get_ph_value().await;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use chrono::Timelike;
use tracing::{info, warn};

use phytolib_core::error::Result;
use phytolib_core::events::ReactorEvent;
use phytolib_core::transport::Transport;
use phytolib_core::types::{DeviceAddress, ScheduleTime};
use phytolib_transport::{discovery, SerialTransport};

use crate::guard::{ChannelGuard, DEFAULT_READ_TIMEOUT, DEFAULT_SETTLE_DELAY};
use crate::reactor::Algaemist;

/// Fluent builder for [`Algaemist`].
pub struct AlgaemistBuilder {
    address: DeviceAddress,
    port: Option<String>,
    baud_rate: u32,
    read_timeout: Duration,
    settle_delay: Duration,
    manufacturer: String,
    sync_clock: bool,
}

impl AlgaemistBuilder {
    /// Create a builder for the unit at the given device address.
    pub fn new(address: DeviceAddress) -> Self {
        AlgaemistBuilder {
            address,
            port: None,
            baud_rate: 9600,
            read_timeout: DEFAULT_READ_TIMEOUT,
            settle_delay: DEFAULT_SETTLE_DELAY,
            manufacturer: discovery::DEFAULT_MANUFACTURER.to_string(),
            sync_clock: true,
        }
    }

    /// Set the serial port path (e.g. `/dev/ttyUSB0` or `COM3`).
    ///
    /// When unset, `connect()` auto-detects the port by its USB
    /// manufacturer marker.
    pub fn port(mut self, port: &str) -> Self {
        self.port = Some(port.to_string());
        self
    }

    /// Override the default baud rate (9600).
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = baud;
        self
    }

    /// Set the per-transaction response deadline (default: 1 s).
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the post-transaction settle delay (default: 100 ms).
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Set the USB manufacturer marker used by port discovery
    /// (default: `"FTDI"`).
    pub fn manufacturer(mut self, marker: &str) -> Self {
        self.manufacturer = marker.to_string();
        self
    }

    /// Whether to synchronize the device clock to host time right after
    /// connecting (default: true).
    pub fn sync_clock(mut self, enabled: bool) -> Self {
        self.sync_clock = enabled;
        self
    }

    /// Open the serial port (discovering it if necessary) and build the
    /// client.
    pub async fn connect(self) -> Result<Algaemist> {
        let port = match &self.port {
            Some(p) => p.clone(),
            None => {
                let mut candidates = discovery::find_ports(&self.manufacturer)?;
                candidates.remove(0)
            }
        };
        let transport = SerialTransport::open(&port, self.baud_rate).await?;
        self.finish(Box::new(transport), port).await
    }

    /// Build the client over an already-open transport.
    ///
    /// This is the entry point for tests driving a mock transport.
    pub async fn connect_with_transport(self, transport: Box<dyn Transport>) -> Result<Algaemist> {
        let port = self.port.clone().unwrap_or_else(|| "<preopened>".to_string());
        self.finish(transport, port).await
    }

    async fn finish(self, transport: Box<dyn Transport>, port: String) -> Result<Algaemist> {
        let guard = ChannelGuard::new(transport, self.read_timeout, self.settle_delay);
        let reactor = Algaemist::new(self.address, guard);

        if self.sync_clock {
            let now = chrono::Local::now();
            if let Ok(time) = ScheduleTime::new(now.hour() as u8, now.minute() as u8) {
                if reactor.set_time(time).await {
                    info!(%time, "device clock synchronized to host time");
                } else {
                    warn!("failed to synchronize device clock");
                }
            }
        }

        reactor.emit(ReactorEvent::Connected { port: port.clone() });
        info!(port = %port, address = %reactor.address(), "connected to reactor");
        Ok(reactor)
    }
}
