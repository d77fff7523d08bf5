//! HTTP client with cookie persistence and manual redirect following.
//!
//! The client holds per-instance configuration and an evolving cookie jar,
//! and exposes GET/POST/JSON/download operations that each return a
//! [`Deferred`] immediately. The network work runs on a spawned Tokio task
//! that drives a bounded request/redirect loop against the transport layer
//! (automatic redirects disabled, so cookie and hop accounting stay under
//! this crate's control).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, warn};
use reqwest::header::{COOKIE, CONTENT_TYPE, LOCATION};
use reqwest::Method;
use url::Url;

use crate::config::{ClientOption, ClientOptions, Encoding, RequestOptions};
use crate::cookies::CookieJar;
use crate::deferred::Deferred;
use crate::error::ClientError;
use crate::query::{form_encode, merge_query};
use crate::response::{Body, ResponseContext};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// HTTP client with per-instance options and cookie state.
///
/// Cookies observed on responses persist across calls on the same instance
/// (replaced wholesale on every response that sets any). The jar is guarded
/// by a mutex because request tasks run on a multi-threaded runtime, but
/// concurrently in-flight calls on one instance still race on it with
/// last-write-wins semantics; no cross-call ordering is guaranteed.
///
/// All operations must be invoked within a Tokio runtime context.
pub struct Client {
    http: reqwest::Client,
    options: ClientOptions,
    cookie_jar: Arc<Mutex<CookieJar>>,
}

impl Client {
    /// Creates a client with the built-in default options.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Init`] if the underlying transport cannot be
    /// constructed.
    pub fn new() -> Result<Self, ClientError> {
        Self::with_options(RequestOptions::default())
    }

    /// Creates a client with `overrides` merged over the default options.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Init`] if the underlying transport cannot be
    /// constructed.
    pub fn with_options(overrides: RequestOptions) -> Result<Self, ClientError> {
        // Redirects are followed manually so the cookie jar and the hop
        // count can be updated between hops.
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(ClientError::Init)?;

        Ok(Client {
            http,
            options: ClientOptions::default().merged(&overrides),
            cookie_jar: Arc::new(Mutex::new(CookieJar::new())),
        })
    }

    /// Returns this instance's resolved configuration.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Writes one configuration entry, returning `self` for chaining.
    pub fn set_option(&mut self, option: ClientOption) -> &mut Self {
        self.options.apply(option);
        self
    }

    /// Returns a snapshot of the cookie jar's `name=value` entries.
    pub fn cookies(&self) -> Vec<String> {
        lock_jar(&self.cookie_jar).entries().to_vec()
    }

    /// Issues a GET request.
    pub fn get(&self, url: &str) -> Deferred {
        self.get_with(url, &[], RequestOptions::default())
    }

    /// Issues a GET request with query parameters and per-call options.
    ///
    /// Non-empty `params` are merged into the URL's query string; on a name
    /// collision the URL's own value wins.
    pub fn get_with(&self, url: &str, params: &[(&str, &str)], options: RequestOptions) -> Deferred {
        let deferred = Deferred::new();
        let target = merge_query(url, params).map_err(ClientError::from);
        self.issue_into(&deferred, Method::GET, target, None, options);
        deferred
    }

    /// Issues a form-encoded POST request with no fields (empty body).
    pub fn post(&self, url: &str) -> Deferred {
        self.post_with(url, &[], RequestOptions::default())
    }

    /// Issues a POST request with `fields` form-encoded into the body.
    pub fn post_with(&self, url: &str, fields: &[(&str, &str)], options: RequestOptions) -> Deferred {
        let deferred = Deferred::new();
        let body = form_encode(fields);
        self.issue_into(
            &deferred,
            Method::POST,
            Url::parse(url).map_err(Into::into),
            Some(body),
            options,
        );
        deferred
    }

    /// Issues a GET request whose text body is parsed as JSON on success.
    ///
    /// A body that fails to parse is delivered as the raw text instead; the
    /// parse failure is never surfaced.
    pub fn json(&self, url: &str) -> Deferred {
        self.json_with(url, &[], RequestOptions::default())
    }

    /// [`Client::json`] with query parameters and per-call options.
    pub fn json_with(&self, url: &str, params: &[(&str, &str)], options: RequestOptions) -> Deferred {
        let deferred = Deferred::new();
        // Install the filter before the request task exists, so resolution
        // cannot beat the installation.
        deferred.filter_success(|body| match body {
            Body::Text(text) => match serde_json::from_str(&text) {
                Ok(value) => Body::Json(value),
                Err(_) => Body::Text(text),
            },
            other => other,
        });
        let target = merge_query(url, params).map_err(ClientError::from);
        self.issue_into(&deferred, Method::GET, target, None, options);
        deferred
    }

    /// Issues a GET request delivering the body as raw bytes.
    pub fn download(&self, url: &str) -> Deferred {
        self.download_with(url, &[], RequestOptions::default())
    }

    /// [`Client::download`] with query parameters and per-call options.
    pub fn download_with(
        &self,
        url: &str,
        params: &[(&str, &str)],
        mut options: RequestOptions,
    ) -> Deferred {
        options.encoding = Some(Encoding::Binary);
        self.get_with(url, params, options)
    }

    /// Dispatches to [`Client::get_with`] or [`Client::post_with`] by method
    /// name, case-insensitively. `data` is query parameters for GET and form
    /// fields for POST.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::UnsupportedMethod`] for any other method name,
    /// synchronously, before any I/O.
    pub fn request(
        &self,
        method: &str,
        url: &str,
        data: &[(&str, &str)],
        options: RequestOptions,
    ) -> Result<Deferred, ClientError> {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Ok(self.get_with(url, data, options)),
            "POST" => Ok(self.post_with(url, data, options)),
            other => Err(ClientError::UnsupportedMethod(other.to_string())),
        }
    }

    /// Spawns the request loop for one logical call, wiring its outcome into
    /// `deferred`. A URL that failed to parse rejects without any I/O.
    fn issue_into(
        &self,
        deferred: &Deferred,
        method: Method,
        url: Result<Url, ClientError>,
        body: Option<String>,
        options: RequestOptions,
    ) {
        let url = match url {
            Ok(url) => url,
            Err(error) => {
                deferred.reject(None, error);
                return;
            }
        };

        let effective = self.options.merged(&options);
        let http = self.http.clone();
        let jar = Arc::clone(&self.cookie_jar);
        let completion = deferred.clone();

        tokio::spawn(async move {
            match perform(http, jar, effective, method, url, body).await {
                Ok((context, body)) => {
                    completion.resolve(context, body);
                }
                Err(error) => {
                    completion.reject(None, error);
                }
            }
        });
    }
}

fn lock_jar(jar: &Mutex<CookieJar>) -> MutexGuard<'_, CookieJar> {
    jar.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drives the request/redirect loop for one logical call.
///
/// Carries `(method, url, body, redirects)` as explicit loop state. Each hop
/// sends one request, synchronously updates the shared cookie jar from any
/// `Set-Cookie` headers, and then either follows a `Location` header (as a
/// bodyless GET, while the hop count stays below the cap) or finalizes with
/// the response as-is. Exhausting the cap or having redirect following
/// disabled is not an error: the last response, redirect status included, is
/// the result.
async fn perform(
    http: reqwest::Client,
    jar: Arc<Mutex<CookieJar>>,
    options: ClientOptions,
    method: Method,
    url: Url,
    body: Option<String>,
) -> Result<(ResponseContext, Body), ClientError> {
    let mut method = method;
    let mut url = url;
    let mut body = body;
    let mut redirects = 0u32;

    loop {
        debug!("{} {} (hop {})", method, url, redirects);

        let mut request = http
            .request(method.clone(), url.clone())
            .timeout(options.timeout);
        if let Some(cookie) = lock_jar(&jar).header_value() {
            request = request.header(COOKIE, cookie);
        }
        if let Some(payload) = &body {
            request = request
                .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
                .body(payload.clone());
        }

        let response = request.send().await.map_err(ClientError::Transport)?;

        // Jar replacement happens before the redirect decision, so the next
        // hop carries the cookies this response just set.
        lock_jar(&jar).replace_from(response.headers());

        if let Some(location) = response.headers().get(LOCATION) {
            if options.follow_redirects && redirects < options.max_redirects {
                match location.to_str().ok().and_then(|target| url.join(target).ok()) {
                    Some(next) => {
                        redirects += 1;
                        debug!("Following redirect {}/{} to {}", redirects, options.max_redirects, next);
                        url = next;
                        // Redirects always become bodyless GETs
                        method = Method::GET;
                        body = None;
                        continue;
                    }
                    None => {
                        warn!("Not following unparsable Location header from {}", url);
                    }
                }
            }
        }

        let context = ResponseContext {
            url: response.url().clone(),
            status: response.status(),
            headers: response.headers().clone(),
        };
        let body = match &options.encoding {
            Encoding::Binary => Body::Binary(
                response
                    .bytes()
                    .await
                    .map_err(ClientError::Transport)?
                    .to_vec(),
            ),
            Encoding::Charset(charset) => Body::Text(
                response
                    .text_with_charset(charset)
                    .await
                    .map_err(ClientError::Transport)?,
            ),
        };
        return Ok((context, body));
    }
}
