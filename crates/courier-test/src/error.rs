//! Test error types.

use std::time::Duration;

use courier_core::CoreError;
use courier_server::CourierError;
use thiserror::Error;

/// Errors raised by the test helpers.
#[derive(Debug, Error)]
pub enum TestError {
    /// Nothing arrived in time.
    #[error("no message within {0:?}")]
    Timeout(Duration),

    /// The server closed the connection.
    #[error("connection closed by server")]
    Closed,

    /// A frame could not be decoded as an envelope or payload.
    #[error("decode error: {0}")]
    Decode(#[from] CoreError),

    /// A different event arrived than the one expected.
    #[error("expected {expected}, got {channel}:{got}")]
    Unexpected {
        /// Expected event alias.
        expected: String,
        /// Channel of the received envelope.
        channel: String,
        /// Alias of the received event.
        got: String,
    },

    /// The harness referenced a client it never added.
    #[error("unknown client {0}")]
    UnknownClient(u64),

    /// The server or a channel returned an error.
    #[error(transparent)]
    Courier(#[from] CourierError),
}

/// Result type for the test helpers.
pub type TestResult<T> = Result<T, TestError>;
