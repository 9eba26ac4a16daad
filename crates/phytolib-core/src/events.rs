//! Asynchronous reactor event types.
//!
//! Events are emitted by the device backend through a
//! `tokio::sync::broadcast` channel. The presentation layer subscribes to
//! these for connection-state changes and operator-facing alerts; routine
//! poll results travel separately on the sampler's `watch` channel so that
//! tick ordering is preserved.

/// An operator-facing alert.
///
/// Alerts are the failures an operator must see rather than find in the
/// logs: a device that refused a write command, an exhausted busy-retry
/// budget, or caller-side invalid input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alert {
    /// A write command's reply failed the completion-sentinel check.
    CommandRejected {
        /// Human-readable description of the command that was refused.
        command: String,
    },

    /// The busy-retry budget was exhausted while the channel was held.
    /// Emitted exactly once per abandoned command.
    BusyTimeout {
        /// Human-readable description of the abandoned command.
        command: String,
    },

    /// Caller-side invalid input that prevented a command from being sent.
    InvalidInput {
        /// What was wrong with the input.
        reason: String,
    },
}

/// An event emitted by the reactor backend.
///
/// Delivered on a best-effort basis through a bounded broadcast channel;
/// slow consumers may miss events under load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactorEvent {
    /// Successfully connected to the device.
    Connected {
        /// The serial port the connection was opened on.
        port: String,
    },

    /// The connection was closed or lost.
    Disconnected,

    /// An operator-facing alert.
    Alert(Alert),
}
