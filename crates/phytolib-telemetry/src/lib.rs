//! phytolib-telemetry: CSV telemetry persistence for phytolib.
//!
//! Reactor telemetry (one [`LogRecord`] per sampled tick: sensors, pump
//! powers, optional comment) is persisted to a tabular CSV store. Two
//! retention disciplines are provided:
//!
//! - unbounded append for manual/experiment logging
//! - a trailing-window safety trail that only keeps records newer than a
//!   configured duration, enforced by full rewrite on each append
//!
//! See [`TelemetryStore`] for the store contract.

pub mod store;

pub use store::{LogRecord, TelemetryStore, HEADER, TIMESTAMP_FORMAT, WINDOW_HEADER};
