//! phytolib-core: Core traits, types, and error definitions for phytolib.
//!
//! This crate defines the device-agnostic abstractions the phytolib
//! backends build on. Applications that only need the shared types (for
//! rendering poll results or subscribing to alerts) can depend on this
//! crate without pulling in a transport or a device driver.
//!
//! # Key types
//!
//! - [`Transport`] -- byte-level communication channel
//! - [`Error`] / [`Result`] -- error handling
//! - [`SensorSnapshot`] / [`PumpSnapshot`] -- aggregated telemetry reads
//! - [`ReactorEvent`] / [`Alert`] -- asynchronous notifications
//! - [`ConfigStore`] -- seam for persisted user values

pub mod config;
pub mod error;
pub mod events;
pub mod transport;
pub mod types;

// Re-export key types at crate root for ergonomic `use phytolib_core::*`.
pub use config::ConfigStore;
pub use error::{Error, Result};
pub use events::{Alert, ReactorEvent};
pub use transport::Transport;
pub use types::*;
