//! Single-assignment, multi-observer completion objects.
//!
//! Every client operation returns a [`Deferred`] immediately; the network
//! work settles it later from a background task. A deferred transitions out
//! of pending at most once — to resolved with a response context and body,
//! or to rejected with an error — and then delivers the stored outcome to
//! every observer exactly once, including observers registered after the
//! transition (those run immediately). Output filters installed before the
//! transition transform the payload before it is stored, which is how the
//! [`json`](crate::Client::json) operation parses bodies without the request
//! loop knowing about JSON.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::error::ClientError;
use crate::response::{Body, ResponseContext};

/// Transform applied to the success payload at resolution time.
pub type SuccessFilter = Box<dyn Fn(Body) -> Body + Send>;

/// Transform applied to the failure payload at rejection time.
pub type FailureFilter = Box<dyn Fn(ClientError) -> ClientError + Send>;

type SuccessCallback = Box<dyn FnOnce(&ResponseContext, &Body) + Send>;
type FailureCallback = Box<dyn FnOnce(Option<&ResponseContext>, &ClientError) + Send>;
type SettledCallback =
    Box<dyn FnOnce(Option<&ResponseContext>, Result<&Body, &ClientError>) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Pending,
    Resolved,
    Rejected,
}

struct Inner {
    state: State,
    context: Option<ResponseContext>,
    outcome: Option<Result<Body, Arc<ClientError>>>,
    on_success: Vec<SuccessCallback>,
    on_failure: Vec<FailureCallback>,
    on_settled: Vec<SettledCallback>,
    success_filter: Option<SuccessFilter>,
    failure_filter: Option<FailureFilter>,
}

/// A settled outcome, cloned out of a terminal [`Deferred`].
#[derive(Debug, Clone)]
pub struct Settled {
    /// The stored observer context; `None` for transport-level rejections.
    pub context: Option<ResponseContext>,
    /// The stored, filtered payload.
    pub result: Result<Body, Arc<ClientError>>,
}

impl Settled {
    /// Returns the response status code, when a context was stored.
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        self.context.as_ref().map(|context| context.status)
    }
}

/// Handle to a single-assignment completion object.
///
/// Clones share the same underlying state, so one clone can settle the
/// deferred while others observe it. Registration methods return `&Self` for
/// fluent chaining:
///
/// ```no_run
/// # use beard::Client;
/// # #[tokio::main]
/// # async fn main() -> Result<(), beard::ClientError> {
/// let client = Client::new()?;
/// client
///     .get("http://example.com/")
///     .on_success(|context, body| {
///         println!("{}: {:?}", context.status, body.as_text());
///     })
///     .on_failure(|_, err| eprintln!("request failed: {err}"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Deferred {
    inner: Arc<Mutex<Inner>>,
    notify: Arc<Notify>,
}

impl Default for Deferred {
    fn default() -> Self {
        Deferred::new()
    }
}

impl std::fmt::Debug for Deferred {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("Deferred")
            .field("state", &inner.state)
            .field("context", &inner.context)
            .finish_non_exhaustive()
    }
}

impl Deferred {
    /// Creates a pending deferred.
    pub fn new() -> Self {
        Deferred {
            inner: Arc::new(Mutex::new(Inner {
                state: State::Pending,
                context: None,
                outcome: None,
                on_success: Vec::new(),
                on_failure: Vec::new(),
                on_settled: Vec::new(),
                success_filter: None,
                failure_filter: None,
            })),
            notify: Arc::new(Notify::new()),
        }
    }

    // A poisoned lock still holds structurally valid state; recover it
    // rather than propagating the panic to unrelated observers.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Installs payload transforms applied at transition time.
    ///
    /// A `Some` filter replaces the previously installed filter of the same
    /// kind; `None` keeps it. Filters installed after the transition have no
    /// effect, since the payload is filtered once, when stored.
    pub fn set_filters(
        &self,
        on_success: Option<SuccessFilter>,
        on_failure: Option<FailureFilter>,
    ) -> &Self {
        let mut inner = self.lock();
        if let Some(filter) = on_success {
            inner.success_filter = Some(filter);
        }
        if let Some(filter) = on_failure {
            inner.failure_filter = Some(filter);
        }
        drop(inner);
        self
    }

    /// Installs a success-payload transform. See [`Deferred::set_filters`].
    pub fn filter_success<F>(&self, filter: F) -> &Self
    where
        F: Fn(Body) -> Body + Send + 'static,
    {
        self.set_filters(Some(Box::new(filter)), None)
    }

    /// Installs a failure-payload transform. See [`Deferred::set_filters`].
    pub fn filter_failure<F>(&self, filter: F) -> &Self
    where
        F: Fn(ClientError) -> ClientError + Send + 'static,
    {
        self.set_filters(None, Some(Box::new(filter)))
    }

    /// Registers an observer for resolution.
    ///
    /// If the deferred is already resolved the callback runs immediately,
    /// synchronously, with the stored context and filtered body; if it is
    /// already rejected the callback is dropped. Otherwise it is queued and
    /// runs once on resolution.
    pub fn on_success<F>(&self, callback: F) -> &Self
    where
        F: FnOnce(&ResponseContext, &Body) + Send + 'static,
    {
        let mut inner = self.lock();
        match inner.state {
            State::Pending => inner.on_success.push(Box::new(callback)),
            State::Resolved => {
                let context = inner.context.clone();
                let body = match &inner.outcome {
                    Some(Ok(body)) => body.clone(),
                    _ => return self,
                };
                drop(inner);
                if let Some(context) = context {
                    callback(&context, &body);
                }
            }
            State::Rejected => {}
        }
        self
    }

    /// Registers an observer for rejection.
    ///
    /// Mirror image of [`Deferred::on_success`]: runs immediately when
    /// already rejected, is dropped when already resolved, queued otherwise.
    pub fn on_failure<F>(&self, callback: F) -> &Self
    where
        F: FnOnce(Option<&ResponseContext>, &ClientError) + Send + 'static,
    {
        let mut inner = self.lock();
        match inner.state {
            State::Pending => inner.on_failure.push(Box::new(callback)),
            State::Rejected => {
                let context = inner.context.clone();
                let error = match &inner.outcome {
                    Some(Err(error)) => Arc::clone(error),
                    _ => return self,
                };
                drop(inner);
                callback(context.as_ref(), error.as_ref());
            }
            State::Resolved => {}
        }
        self
    }

    /// Registers an observer that fires on either outcome.
    pub fn on_settled<F>(&self, callback: F) -> &Self
    where
        F: FnOnce(Option<&ResponseContext>, Result<&Body, &ClientError>) + Send + 'static,
    {
        let mut inner = self.lock();
        match inner.state {
            State::Pending => inner.on_settled.push(Box::new(callback)),
            State::Resolved | State::Rejected => {
                let context = inner.context.clone();
                let outcome = match inner.outcome.clone() {
                    Some(outcome) => outcome,
                    None => return self,
                };
                drop(inner);
                match &outcome {
                    Ok(body) => callback(context.as_ref(), Ok(body)),
                    Err(error) => callback(context.as_ref(), Err(error.as_ref())),
                }
            }
        }
        self
    }

    /// Attempts the resolved transition.
    ///
    /// A no-op if the deferred is already terminal; the first transition
    /// wins and later attempts are silently ignored. On success the body is
    /// run through the success filter, stored together with the context, and
    /// every queued success observer, then every settled observer, runs
    /// synchronously in registration order.
    pub fn resolve(&self, context: ResponseContext, body: Body) -> &Self {
        let mut inner = self.lock();
        if inner.state != State::Pending {
            return self;
        }
        inner.state = State::Resolved;
        let body = match &inner.success_filter {
            Some(filter) => filter(body),
            None => body,
        };
        inner.context = Some(context.clone());
        inner.outcome = Some(Ok(body.clone()));
        let success = std::mem::take(&mut inner.on_success);
        let settled = std::mem::take(&mut inner.on_settled);
        inner.on_failure.clear();
        drop(inner);

        for callback in success {
            callback(&context, &body);
        }
        for callback in settled {
            callback(Some(&context), Ok(&body));
        }
        self.notify.notify_waiters();
        self
    }

    /// Attempts the rejected transition.
    ///
    /// Symmetric to [`Deferred::resolve`], with the failure filter and the
    /// failure queue. `context` is `None` for transport-level failures,
    /// which never carry a response.
    pub fn reject(&self, context: Option<ResponseContext>, error: ClientError) -> &Self {
        let mut inner = self.lock();
        if inner.state != State::Pending {
            return self;
        }
        inner.state = State::Rejected;
        let error = match &inner.failure_filter {
            Some(filter) => filter(error),
            None => error,
        };
        let error = Arc::new(error);
        inner.context = context.clone();
        inner.outcome = Some(Err(Arc::clone(&error)));
        let failure = std::mem::take(&mut inner.on_failure);
        let settled = std::mem::take(&mut inner.on_settled);
        inner.on_success.clear();
        drop(inner);

        for callback in failure {
            callback(context.as_ref(), error.as_ref());
        }
        for callback in settled {
            callback(context.as_ref(), Err(error.as_ref()));
        }
        self.notify.notify_waiters();
        self
    }

    /// Returns true once the deferred has resolved.
    pub fn is_resolved(&self) -> bool {
        self.lock().state == State::Resolved
    }

    /// Returns true once the deferred has rejected.
    pub fn is_rejected(&self) -> bool {
        self.lock().state == State::Rejected
    }

    /// Returns a clone of the stored outcome, or `None` while pending.
    pub fn peek(&self) -> Option<Settled> {
        let inner = self.lock();
        inner.outcome.clone().map(|result| Settled {
            context: inner.context.clone(),
            result,
        })
    }

    /// Waits for the terminal transition and returns the stored outcome.
    pub async fn settled(&self) -> Settled {
        loop {
            let notified = self.notify.notified();
            if let Some(settled) = self.peek() {
                return settled;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderMap;
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use url::Url;

    fn context(status: StatusCode) -> ResponseContext {
        ResponseContext {
            url: Url::parse("http://127.0.0.1/").unwrap(),
            status,
            headers: HeaderMap::new(),
        }
    }

    fn text(body: &str) -> Body {
        Body::Text(body.to_string())
    }

    #[test]
    fn test_first_transition_wins() {
        let deferred = Deferred::new();
        deferred.resolve(context(StatusCode::OK), text("first"));
        deferred.resolve(context(StatusCode::NOT_FOUND), text("second"));
        deferred.reject(None, ClientError::UnsupportedMethod("PUT".to_string()));

        assert!(deferred.is_resolved());
        assert!(!deferred.is_rejected());
        let settled = deferred.peek().unwrap();
        assert_eq!(settled.status(), Some(StatusCode::OK));
        assert_eq!(settled.result.unwrap(), text("first"));
    }

    #[test]
    fn test_queued_observers_run_once_in_order() {
        let deferred = Deferred::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&calls);
        let second = Arc::clone(&calls);
        let always = Arc::clone(&calls);
        deferred
            .on_success(move |_, _| first.lock().unwrap().push("first"))
            .on_success(move |_, _| second.lock().unwrap().push("second"))
            .on_settled(move |_, _| always.lock().unwrap().push("settled"));

        deferred.resolve(context(StatusCode::OK), text("body"));
        // Redundant transition must not re-run anything
        deferred.resolve(context(StatusCode::OK), text("body"));

        assert_eq!(*calls.lock().unwrap(), vec!["first", "second", "settled"]);
    }

    #[test]
    fn test_late_observer_runs_immediately_with_stored_args() {
        let deferred = Deferred::new();
        deferred.resolve(context(StatusCode::OK), text("stored"));

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        deferred.on_success(move |ctx, body| {
            assert_eq!(ctx.status, StatusCode::OK);
            assert_eq!(body.as_text(), Some("stored"));
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failure_observers_skip_resolved_deferred() {
        let deferred = Deferred::new();
        deferred.resolve(context(StatusCode::OK), text("ok"));

        let called = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&called);
        deferred.on_failure(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(called.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_reject_invokes_failure_and_settled() {
        let deferred = Deferred::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let on_failure = Arc::clone(&calls);
        let on_settled = Arc::clone(&calls);
        deferred
            .on_failure(move |ctx, error| {
                assert!(ctx.is_none());
                assert!(matches!(error, ClientError::UnsupportedMethod(_)));
                on_failure.fetch_add(1, Ordering::SeqCst);
            })
            .on_settled(move |_, result| {
                assert!(result.is_err());
                on_settled.fetch_add(1, Ordering::SeqCst);
            });

        deferred.reject(None, ClientError::UnsupportedMethod("DELETE".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(deferred.is_rejected());
    }

    #[test]
    fn test_success_filter_applies_before_storage() {
        let deferred = Deferred::new();
        deferred.filter_success(|body| match body {
            Body::Text(text) => Body::Text(text.to_uppercase()),
            other => other,
        });
        deferred.resolve(context(StatusCode::OK), text("hello"));

        let settled = deferred.peek().unwrap();
        assert_eq!(settled.result.unwrap(), text("HELLO"));
    }

    #[test]
    fn test_replacing_filter_keeps_other_kind() {
        let deferred = Deferred::new();
        deferred.filter_success(|_| text("replaced-me"));
        // A later success filter replaces the earlier one; None leaves the
        // failure side alone.
        deferred.set_filters(Some(Box::new(|_| text("winner"))), None);
        deferred.resolve(context(StatusCode::OK), text("input"));
        assert_eq!(deferred.peek().unwrap().result.unwrap(), text("winner"));
    }

    #[tokio::test]
    async fn test_settled_wakes_on_transition() {
        let deferred = Deferred::new();
        let remote = deferred.clone();
        tokio::spawn(async move {
            remote.resolve(context(StatusCode::OK), text("from task"));
        });

        let settled = deferred.settled().await;
        assert_eq!(settled.status(), Some(StatusCode::OK));
        assert_eq!(settled.result.unwrap().as_text(), Some("from task"));
    }

    #[tokio::test]
    async fn test_settled_returns_immediately_when_terminal() {
        let deferred = Deferred::new();
        deferred.reject(None, ClientError::UnsupportedMethod("HEAD".to_string()));
        let settled = deferred.settled().await;
        assert!(settled.result.is_err());
        assert!(settled.context.is_none());
    }
}
