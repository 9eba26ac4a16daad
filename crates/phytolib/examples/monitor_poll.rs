//! Monitor live reactor telemetry.
//!
//! Demonstrates spawning the poll sampler against a connected reactor
//! and printing each delivered update. The safety trail is written to a
//! trailing-window CSV store alongside.
//!
//! # Usage
//!
//! ```sh
//! cargo run -p phytolib --example monitor_poll
//! ```

use std::sync::Arc;
use std::time::Duration;

use phytolib::algaemist::sampler::{PollSampler, SamplerConfig};
use phytolib::algaemist::AlgaemistBuilder;
use phytolib::telemetry::TelemetryStore;
use phytolib::DeviceAddress;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let reactor = Arc::new(
        AlgaemistBuilder::new(DeviceAddress::new(21)?)
            .connect()
            .await?,
    );
    println!("Connected to reactor {}", reactor.address());

    let store = Arc::new(TelemetryStore::new(".data/safety_log.csv"));
    let sampler = PollSampler::spawn(reactor.clone(), store, SamplerConfig::default());
    let mut updates = sampler.updates();

    // Watch for two minutes, then shut down gracefully.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(120);
    while tokio::time::Instant::now() < deadline {
        if updates.changed().await.is_err() {
            break;
        }
        if let Some(update) = updates.borrow_and_update().clone() {
            println!(
                "tick {}: temp {:?} °C, pH {:?}, mode {:?}",
                update.seq,
                update.sensors.map(|s| s.temp_c),
                update.sensors.map(|s| s.ph),
                update.reactor_mode,
            );
        }
    }

    sampler.shutdown().await;
    reactor.disconnect().await;
    Ok(())
}
