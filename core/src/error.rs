//! Error types for the request transport.
//!
//! # Design
//! An HTTP error status is not an error here: it is a normal completion that
//! takes the error callback branch (`Outcome::Failure`). `TransportError`
//! only covers dispatches that never reached a final status.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No provider in the chain could create a connection.
    #[error("no transport provider is available in this environment")]
    Unsupported,

    /// The connection refused to open the URL.
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),

    /// The configured timeout elapsed before a final status was observed.
    #[error("request timed out")]
    Timeout,

    /// The request failed below HTTP, with no status.
    #[error("network failure: {0}")]
    Network(String),

    /// The completion signal was dropped before it resolved.
    #[error("request completion signal was dropped")]
    Closed,

    /// A blocking wait was attempted on an async runtime thread.
    #[error("cannot block on a request from inside an async runtime")]
    WouldBlock,
}
