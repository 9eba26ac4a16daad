//! Test harness for phytolib: mock transport for protocol-level tests.
//!
//! The harness lets the codec, channel guard, typed client, and sampler
//! be exercised deterministically without a reactor on the bench. See
//! [`MockTransport`].

pub mod mock_serial;

pub use mock_serial::MockTransport;
