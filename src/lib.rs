//! beard: a minimal HTTP client with cookie persistence, redirect
//! following, and deferred results.
//!
//! Every operation ([`Client::get`], [`Client::post`], [`Client::json`],
//! [`Client::download`]) returns a [`Deferred`] immediately; the request
//! itself runs on a background task. Observers attached to the deferred
//! receive the final response context and body once the call settles, or the
//! outcome can simply be awaited:
//!
//! ```no_run
//! use beard::{Body, Client};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), beard::ClientError> {
//! let client = Client::new()?;
//! let settled = client.get("http://example.com/").settled().await;
//! let status = settled.status();
//! if let Ok(Body::Text(text)) = settled.result {
//!     println!("{} -> {text}", status.unwrap());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Redirects are followed manually (up to `max_redirects` hops per call) so
//! the client's cookie jar is updated between hops; responses carrying
//! `Set-Cookie` replace the jar wholesale. Redirect statuses, client errors,
//! and server errors all *resolve* the deferred — rejection is reserved for
//! transport-level failures and malformed URLs.
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your
//! application or ensure operations are invoked within an async context.

#![warn(missing_docs)]

mod client;
pub mod config;
mod cookies;
mod deferred;
mod error;
pub mod query;
mod response;

// Re-export public API
pub use client::Client;
pub use config::{ClientOption, ClientOptions, Encoding, RequestOptions};
pub use cookies::CookieJar;
pub use deferred::{Deferred, FailureFilter, Settled, SuccessFilter};
pub use error::ClientError;
pub use response::{Body, ResponseContext};
