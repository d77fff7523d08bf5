//! Response context and body models.
//!
//! A [`ResponseContext`] is a fully owned snapshot of the final response of a
//! logical call (after any followed redirects): final URL, status code, and
//! headers. It is handed to every observer of the call's
//! [`Deferred`](crate::Deferred) so status codes can be inspected alongside
//! the body. The body itself travels separately as a [`Body`].

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use url::Url;

/// Snapshot of an HTTP response, minus the body.
///
/// All fields reflect the received response as-is; no transformation is
/// performed by this type. Note that 3xx/4xx/5xx statuses still arrive here
/// via resolution, never rejection — inspect `status` when it matters.
#[derive(Debug, Clone)]
pub struct ResponseContext {
    /// Final URL of the response (after redirects, if any were followed).
    pub url: Url,

    /// HTTP status code (e.g. `200`, `302`, `404`).
    pub status: StatusCode,

    /// Response headers, case-insensitive by header name.
    pub headers: HeaderMap,
}

/// A fully buffered response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Text, decoded with the effective charset.
    Text(String),
    /// Raw bytes, produced when the effective encoding is
    /// [`Encoding::Binary`](crate::Encoding::Binary).
    Binary(Vec<u8>),
    /// Parsed JSON, produced by the [`json`](crate::Client::json)
    /// operation's success filter.
    Json(serde_json::Value),
}

impl Body {
    /// Returns the text content, if this is a text body.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Body::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the raw bytes of a text or binary body.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Body::Text(text) => Some(text.as_bytes()),
            Body::Binary(bytes) => Some(bytes),
            Body::Json(_) => None,
        }
    }

    /// Returns the parsed JSON value, if this is a JSON body.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Body::Json(value) => Some(value),
            _ => None,
        }
    }
}
