//! Transport implementations for phytolib.
//!
//! This crate provides the concrete implementation of the
//! [`Transport`](phytolib_core::Transport) trait for the reactor's serial
//! link, plus port discovery:
//!
//! - [`SerialTransport`]: USB virtual COM port / RS-232 connection
//! - [`discovery`]: serial port enumeration filtered by the adapter's
//!   manufacturer marker
//!
//! # Example
//!
//! ```no_run
//! use phytolib_transport::{discovery, SerialTransport};
//!
//! # async fn example() -> phytolib_core::Result<()> {
//! let ports = discovery::find_ports(discovery::DEFAULT_MANUFACTURER)?;
//! let transport = SerialTransport::open(&ports[0], 9600).await?;
//! # Ok(())
//! # }
//! ```

pub mod discovery;
pub mod serial;

pub use serial::{SerialConfig, SerialTransport};
