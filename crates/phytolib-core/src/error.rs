//! Error types for phytolib.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. Transport-layer, protocol-layer, and
//! policy-layer errors are all captured here.

/// The error type for all phytolib operations.
///
/// Variants cover the failure modes encountered when talking to a reactor
/// over its serial link: physical transport failures, malformed replies,
/// timeouts, refused write commands, and an exhausted busy-retry budget.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (serial port open/enumeration failure).
    #[error("transport error: {0}")]
    Transport(String),

    /// A reply was received but could not be decoded (wrong shape or
    /// wrong aggregated field count).
    #[error("parse error: {0}")]
    Parse(String),

    /// Timed out waiting for a reply from the reactor.
    ///
    /// This typically indicates the device is powered off, the baud rate
    /// is wrong, or the configured device address does not match.
    #[error("timeout waiting for response")]
    Timeout,

    /// A write command's reply did not carry the expected completion
    /// sentinel. The offending reply is included verbatim.
    #[error("command rejected by device: {0:?}")]
    Rejected(String),

    /// The busy-retry budget was exhausted while the channel was held.
    #[error("channel busy, retry budget exhausted")]
    Busy,

    /// An invalid parameter was passed to a command.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// No connection to the reactor has been established.
    #[error("not connected")]
    NotConnected,

    /// The connection to the reactor was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_transport() {
        let e = Error::Transport("no FTDI device found".into());
        assert_eq!(e.to_string(), "transport error: no FTDI device found");
    }

    #[test]
    fn error_display_parse() {
        let e = Error::Parse("expected 6 fields, got 5".into());
        assert_eq!(e.to_string(), "parse error: expected 6 fields, got 5");
    }

    #[test]
    fn error_display_timeout() {
        assert_eq!(Error::Timeout.to_string(), "timeout waiting for response");
    }

    #[test]
    fn error_display_rejected() {
        let e = Error::Rejected("/21P0075NO".into());
        assert!(e.to_string().contains("/21P0075NO"));
    }

    #[test]
    fn error_display_busy() {
        assert_eq!(
            Error::Busy.to_string(),
            "channel busy, retry budget exhausted"
        );
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(e.to_string().contains("pipe broken"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
