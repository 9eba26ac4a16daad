//! phytolib-algaemist: device backend for Algaemist-class photobioreactors.
//!
//! This crate ties the wire codec to a [`Transport`](phytolib_core::Transport)
//! to produce a working reactor client:
//!
//! - [`protocol`] -- frame assembly, echo stripping, sentinel checks
//! - [`commands`] -- pure per-capability command builders and reply parsers
//! - [`guard`] -- the exclusive channel guard (one in-flight transaction,
//!   settle delay, busy probe)
//! - [`reactor`] -- [`Algaemist`], the typed command client
//! - [`sampler`] -- the fixed-period poll sampler and safety-log trail
//! - [`retry`] -- the busy-retry policy for foreground commands
//! - [`builder`] -- fluent construction, with port discovery and
//!   connect-time device clock sync
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use phytolib_algaemist::builder::AlgaemistBuilder;
//! use phytolib_algaemist::sampler::{PollSampler, SamplerConfig};
//! use phytolib_core::types::DeviceAddress;
//! use phytolib_telemetry::TelemetryStore;
//!
//! # async fn example() -> phytolib_core::Result<()> {
//! let reactor = Arc::new(
//!     AlgaemistBuilder::new(DeviceAddress::new(21)?).connect().await?,
//! );
//! let store = Arc::new(TelemetryStore::new(".data/safety_log.csv"));
//! let sampler = PollSampler::spawn(reactor.clone(), store, SamplerConfig::default());
//!
//! let mut updates = sampler.updates();
//! if updates.wait_for(|u| u.is_some()).await.is_ok() {
//!     if let Some(update) = updates.borrow().as_ref() {
//!         println!("culture pH: {:?}", update.sensors.map(|s| s.ph));
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod commands;
pub mod guard;
pub mod protocol;
pub mod reactor;
pub mod retry;
pub mod sampler;

pub use builder::AlgaemistBuilder;
pub use guard::{ChannelGuard, ChannelHold};
pub use reactor::Algaemist;
pub use sampler::{PollSampler, PollUpdate, SamplerConfig};
