//! Error types for client construction and request execution.

use thiserror::Error;

/// Error types for HTTP client operations.
///
/// Network and protocol failures (`Transport`, and `InvalidUrl` when the
/// target is supplied to an operation) surface exclusively through
/// [`Deferred`](crate::Deferred) rejection; `Init` and `UnsupportedMethod`
/// are returned synchronously before any I/O happens.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Error building the underlying HTTP transport.
    #[error("HTTP client initialization error: {0}")]
    Init(#[source] reqwest::Error),

    /// Connection, DNS, protocol, or body-read failure from the transport.
    #[error("HTTP transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The target URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// An unsupported method name was passed to the generic request dispatch.
    #[error("Method must be either GET or POST, got '{0}'")]
    UnsupportedMethod(String),
}

impl ClientError {
    /// Returns true for failures originating in the transport layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }
}
