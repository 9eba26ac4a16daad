//! Transport trait for reactor communication.
//!
//! The [`Transport`] trait abstracts over the physical link to a reactor.
//! Implementations exist for serial ports and for mock transports used in
//! deterministic protocol tests.
//!
//! The protocol engine in `phytolib-algaemist` operates on a `Transport`
//! rather than directly on a serial port, so the same codec and channel
//! guard run against real hardware and against `MockTransport` from the
//! `phytolib-test-harness` crate.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Asynchronous byte-level transport to a reactor.
///
/// Implementations handle buffering and error recovery at the physical
/// layer. Protocol-level concerns (frame layout, addressing, sentinel
/// checks) belong to the device backend that consumes this trait.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes to the device.
    ///
    /// Implementations should not return until all bytes have been
    /// written to the underlying transport.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive bytes from the device into the provided buffer.
    ///
    /// Returns the number of bytes actually read. Waits up to `timeout`
    /// for data to arrive; returns
    /// [`Error::Timeout`](crate::error::Error::Timeout) if nothing is
    /// received within the deadline.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Close the transport connection.
    ///
    /// After `close()`, subsequent `send()` and `receive()` calls should
    /// return [`Error::NotConnected`](crate::error::Error::NotConnected).
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}
