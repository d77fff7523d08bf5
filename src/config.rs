//! Client configuration types and merge logic.
//!
//! Configuration is resolved in three layers, lowest to highest precedence:
//! built-in defaults, per-client options set at construction (or later via
//! [`Client::set_option`](crate::Client::set_option)), and per-call
//! [`RequestOptions`].

use std::time::Duration;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default cap on followed redirect hops for one logical call.
pub const DEFAULT_MAX_REDIRECTS: u32 = 30;

/// Default response text charset.
pub const DEFAULT_CHARSET: &str = "utf-8";

/// How a response body should be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encoding {
    /// Decode the body as text, using the named charset when the response
    /// does not declare one itself.
    Charset(String),
    /// No transcoding; the body is delivered as raw bytes.
    Binary,
}

impl Default for Encoding {
    fn default() -> Self {
        Encoding::Charset(DEFAULT_CHARSET.to_string())
    }
}

/// Resolved per-client configuration.
///
/// `Default` yields the built-in defaults: redirects followed, 60 second
/// timeout, utf-8 text decoding, at most 30 redirect hops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Whether `Location` response headers are followed automatically.
    pub follow_redirects: bool,

    /// Timeout handed to the transport layer for each request attempt.
    pub timeout: Duration,

    /// Response body decoding mode.
    pub encoding: Encoding,

    /// Maximum number of redirect hops followed for one logical call.
    pub max_redirects: u32,
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions {
            follow_redirects: true,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            encoding: Encoding::default(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

impl ClientOptions {
    /// Returns a copy of these options with any populated fields of
    /// `overrides` applied on top.
    pub fn merged(&self, overrides: &RequestOptions) -> ClientOptions {
        ClientOptions {
            follow_redirects: overrides.follow_redirects.unwrap_or(self.follow_redirects),
            timeout: overrides.timeout.unwrap_or(self.timeout),
            encoding: overrides
                .encoding
                .clone()
                .unwrap_or_else(|| self.encoding.clone()),
            max_redirects: overrides.max_redirects.unwrap_or(self.max_redirects),
        }
    }

    /// Applies a single configuration entry in place.
    pub fn apply(&mut self, option: ClientOption) {
        match option {
            ClientOption::FollowRedirects(value) => self.follow_redirects = value,
            ClientOption::Timeout(value) => self.timeout = value,
            ClientOption::Encoding(value) => self.encoding = value,
            ClientOption::MaxRedirects(value) => self.max_redirects = value,
        }
    }
}

/// Per-call configuration overrides.
///
/// Every field is optional; unset fields fall back to the client's options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Override for [`ClientOptions::follow_redirects`].
    pub follow_redirects: Option<bool>,

    /// Override for [`ClientOptions::timeout`].
    pub timeout: Option<Duration>,

    /// Override for [`ClientOptions::encoding`].
    pub encoding: Option<Encoding>,

    /// Override for [`ClientOptions::max_redirects`].
    pub max_redirects: Option<u32>,
}

/// A single configuration entry, for one-at-a-time writes via
/// [`Client::set_option`](crate::Client::set_option).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientOption {
    /// Sets [`ClientOptions::follow_redirects`].
    FollowRedirects(bool),
    /// Sets [`ClientOptions::timeout`].
    Timeout(Duration),
    /// Sets [`ClientOptions::encoding`].
    Encoding(Encoding),
    /// Sets [`ClientOptions::max_redirects`].
    MaxRedirects(u32),
}
