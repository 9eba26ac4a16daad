//! Reactor port discovery.
//!
//! The reactor attaches to the host through an FTDI USB-serial adapter, so
//! connection discovery is a scan of the host's serial ports filtered by
//! the adapter's manufacturer string. Installations with a different
//! adapter can pass their own marker.
//!
//! # Usage
//!
//! ```no_run
//! use phytolib_transport::discovery;
//!
//! # fn example() -> phytolib_core::Result<()> {
//! let ports = discovery::find_ports(discovery::DEFAULT_MANUFACTURER)?;
//! println!("candidate reactor port: {}", ports[0]);
//! # Ok(())
//! # }
//! ```

use phytolib_core::error::{Error, Result};
use tokio_serial::SerialPortType;

/// Manufacturer marker of the reactor's stock USB-serial adapter.
pub const DEFAULT_MANUFACTURER: &str = "FTDI";

/// Enumerate serial ports whose USB manufacturer string contains `marker`.
///
/// Returns the matching port paths in enumeration order; the first entry
/// is the conventional auto-connect candidate. Fails with a descriptive
/// [`Error::Transport`] when no port matches, so the operator learns
/// whether the adapter is missing rather than seeing a bare open failure.
pub fn find_ports(marker: &str) -> Result<Vec<String>> {
    let ports = tokio_serial::available_ports()
        .map_err(|e| Error::Transport(format!("failed to enumerate serial ports: {e}")))?;

    let matching: Vec<String> = ports
        .into_iter()
        .filter(|p| match &p.port_type {
            SerialPortType::UsbPort(usb) => usb
                .manufacturer
                .as_deref()
                .is_some_and(|m| m.contains(marker)),
            _ => false,
        })
        .map(|p| p.port_name)
        .collect();

    if matching.is_empty() {
        return Err(Error::Transport(format!(
            "no serial device matching manufacturer {marker:?} found"
        )));
    }

    tracing::debug!(marker = %marker, ports = ?matching, "Discovered candidate ports");
    Ok(matching)
}
