//! # phytolib -- Photobioreactor Control
//!
//! `phytolib` is an asynchronous Rust library for operating Algaemist-class
//! laboratory photobioreactors over a point-to-point serial link. It is
//! designed for lab dashboards, experiment runners, and long-running culture
//! monitoring where one shared channel must serve both a periodic background
//! sampler and foreground operator commands.
//!
//! ## Quick Start
//!
//! Add `phytolib` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! phytolib = "0.1"
//! tokio = { version = "1", features = ["full"] }
//! ```
//!
//! Connect to a reactor (auto-detecting its FTDI port) and read the pH:
//!
//! ```no_run
//! use phytolib::algaemist::AlgaemistBuilder;
//! use phytolib::DeviceAddress;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let reactor = AlgaemistBuilder::new(DeviceAddress::new(21)?)
//!         .connect()
//!         .await?;
//!
//!     if let Some(ph) = reactor.get_ph_value().await {
//!         println!("culture pH: {ph}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized as a workspace of focused crates:
//!
//! | Crate                   | Purpose                                      |
//! |-------------------------|----------------------------------------------|
//! | `phytolib-core`         | [`Transport`] trait, shared types, errors, events |
//! | `phytolib-transport`    | Serial transport + port discovery            |
//! | `phytolib-algaemist`    | Algaemist codec, channel guard, typed client, sampler |
//! | `phytolib-telemetry`    | CSV telemetry store with trailing-window compaction |
//! | `phytolib-test-harness` | Mock transport for protocol tests            |
//! | **`phytolib`**          | This facade crate -- re-exports everything   |
//!
//! ## Concurrency model
//!
//! One serial channel, one lock, at most one in-flight request/response
//! exchange system-wide. The [`sampler`](algaemist::PollSampler) skips its
//! tick when the channel is held; foreground commands wrapped in
//! [`with_busy_retry`](algaemist::Algaemist::with_busy_retry) reschedule a
//! bounded number of times and then fail visibly with
//! [`Error::Busy`](crate::Error). Poll results arrive through a `watch`
//! channel in tick order; alerts and connection changes through a
//! broadcast channel.

pub use phytolib_core::*;

/// Algaemist device backend.
///
/// Provides [`Algaemist`](algaemist::Algaemist) and
/// [`AlgaemistBuilder`](algaemist::AlgaemistBuilder) plus the poll sampler
/// and busy-retry policy for the Algaemist fixed-width ASCII protocol.
pub mod algaemist {
    pub use phytolib_algaemist::*;
}

/// Serial transport and port discovery.
pub mod transport {
    pub use phytolib_transport::*;
}

/// CSV telemetry persistence.
pub mod telemetry {
    pub use phytolib_telemetry::*;
}
