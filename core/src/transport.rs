//! Request transport: provider chain, dispatch and completion routing.
//!
//! # Design
//! A `Transport` owns a ranked list of `Provider`s. Every dispatch asks the
//! providers in order for a fresh `Connection`, drives it through
//! open / set headers / send, and routes the terminal response to exactly one
//! of the descriptor's callbacks:
//!
//! - status below 400: `on_success`
//! - anything else: `on_error`
//!
//! The same result is also delivered once through the returned `Pending`, so
//! callers can choose between callbacks and awaiting. Connections are never
//! pooled or reused; the one created for a dispatch is dropped as soon as the
//! terminal callback has run.
//!
//! Failures with no final status (timeouts, refused connections) never reach
//! a callback. They resolve the `Pending` with a `TransportError`.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::params::encode_params;
use crate::provider::UreqProvider;

/// Content type used for form-encoded bodies built by [`Transport::post`].
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Timeout applied by [`Transport::new`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Completion callback. Receives the terminal response.
pub type Callback = Box<dyn FnOnce(&HttpResponse) + Send + 'static>;

/// The live request object handed out by a `Provider`.
///
/// A connection is used for exactly one request: `open`, then any number of
/// `set_request_header` calls, then `send`, which consumes it.
pub trait Connection: Send {
    fn open(&mut self, method: HttpMethod, url: &str, asynchronous: bool) -> Result<(), TransportError>;

    fn set_request_header(&mut self, name: &str, value: &str);

    /// Send `body` and block until the final status is available.
    fn send(self: Box<Self>, body: &str) -> Result<HttpResponse, TransportError>;
}

/// Settings handed to a provider when it creates a connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    pub timeout: Option<Duration>,
}

/// A factory for connections. Returns `None` when this provider cannot work
/// in the current environment, letting the next provider in the chain try.
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    fn create(&self, options: &ConnectOptions) -> Option<Box<dyn Connection>>;
}

/// Whether `dispatch` returns before or after the request completes.
///
/// `Sync` blocks the calling thread on I/O, and [`Pending::wait`] refuses to
/// block on an async runtime thread. From async code use `Async` and `.await`
/// the `Pending`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Async,
    Sync,
}

/// A request plus the callbacks to run when it completes.
pub struct RequestDescriptor {
    request: HttpRequest,
    on_success: Option<Callback>,
    on_error: Option<Callback>,
}

impl RequestDescriptor {
    /// A `GET` of `url` with no headers, body or callbacks.
    pub fn new(url: impl Into<String>) -> Self {
        Self::from_request(HttpRequest::new(HttpMethod::Get, url))
    }

    pub fn from_request(request: HttpRequest) -> Self {
        Self {
            request,
            on_success: None,
            on_error: None,
        }
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.request.method = method;
        self
    }

    /// Set a header. A repeated name replaces the earlier value.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.headers.insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.request.body = Some(body.into());
        self
    }

    pub fn on_success(mut self, callback: impl FnOnce(&HttpResponse) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(callback));
        self
    }

    pub fn on_error(mut self, callback: impl FnOnce(&HttpResponse) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    fn map_request(mut self, f: impl FnOnce(HttpRequest) -> HttpRequest) -> Self {
        self.request = f(self.request);
        self
    }
}

impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("request", &self.request)
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// The terminal result of a dispatch, tagged by which branch it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(HttpResponse),
    Failure(HttpResponse),
}

impl Outcome {
    pub fn from_response(response: HttpResponse) -> Self {
        if response.is_success() {
            Outcome::Success(response)
        } else {
            Outcome::Failure(response)
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn response(&self) -> &HttpResponse {
        match self {
            Outcome::Success(r) | Outcome::Failure(r) => r,
        }
    }

    pub fn into_response(self) -> HttpResponse {
        match self {
            Outcome::Success(r) | Outcome::Failure(r) => r,
        }
    }
}

/// Single-shot completion signal for one dispatch.
///
/// Resolves exactly once. Await it from async code or call [`Pending::wait`]
/// from a plain thread.
#[derive(Debug)]
pub struct Pending {
    rx: oneshot::Receiver<Result<Outcome, TransportError>>,
}

impl Pending {
    /// Block the current thread until the dispatch completes.
    ///
    /// Returns `TransportError::WouldBlock` when called on an async runtime
    /// thread; `.await` the `Pending` there instead.
    pub fn wait(self) -> Result<Outcome, TransportError> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(TransportError::WouldBlock);
        }
        self.rx.blocking_recv().unwrap_or(Err(TransportError::Closed))
    }

    /// The result if the dispatch has already completed.
    pub fn try_result(&mut self) -> Option<Result<Outcome, TransportError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(TransportError::Closed)),
        }
    }
}

impl Future for Pending {
    type Output = Result<Outcome, TransportError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|r| r.unwrap_or(Err(TransportError::Closed)))
    }
}

/// Rewrite `request` as a `GET` carrying `params` in its query string.
///
/// `?` is always appended, so an empty mapping leaves a bare trailing `?`.
pub fn build_get<I, K, V>(mut request: HttpRequest, params: I) -> HttpRequest
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    request.method = HttpMethod::Get;
    request.url.push('?');
    request.url.push_str(&encode_params(params));
    request
}

/// Rewrite `request` as a form-encoded `POST` of `params`.
pub fn build_post<I, K, V>(mut request: HttpRequest, params: I) -> HttpRequest
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    request.method = HttpMethod::Post;
    request
        .headers
        .insert("Content-Type".to_string(), FORM_CONTENT_TYPE.to_string());
    request.body = Some(encode_params(params));
    request
}

/// Dispatches requests through the first provider that can serve them.
#[derive(Clone)]
pub struct Transport {
    providers: Vec<Arc<dyn Provider>>,
    options: ConnectOptions,
    base_url: Option<String>,
}

impl Transport {
    /// The default chain (`ureq`) with [`DEFAULT_TIMEOUT`].
    pub fn new() -> Self {
        Self::builder()
            .provider(UreqProvider)
            .timeout(Some(DEFAULT_TIMEOUT))
            .build()
    }

    /// An empty builder: no providers, no timeout, no base URL.
    pub fn builder() -> TransportBuilder {
        TransportBuilder::default()
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Create a connection from the first provider that offers one.
    pub fn create(&self) -> Result<Box<dyn Connection>, TransportError> {
        for provider in &self.providers {
            if let Some(connection) = provider.create(&self.options) {
                debug!(provider = provider.name(), "created connection");
                return Ok(connection);
            }
            debug!(provider = provider.name(), "provider unavailable, trying next");
        }
        warn!("no transport provider available");
        Err(TransportError::Unsupported)
    }

    /// Run `descriptor`. Open and header errors are returned directly; the
    /// terminal result is delivered through the callbacks and the `Pending`.
    ///
    /// In `Mode::Sync` the callback has already run when this returns.
    pub fn dispatch(&self, descriptor: RequestDescriptor, mode: Mode) -> Result<Pending, TransportError> {
        let RequestDescriptor {
            request,
            on_success,
            on_error,
        } = descriptor;

        let url = self.resolve(&request.url);
        debug!(method = %request.method, url = %url, ?mode, "dispatching request");

        let mut connection = self.create()?;
        connection.open(request.method, &url, mode == Mode::Async)?;
        for (name, value) in &request.headers {
            connection.set_request_header(name, value);
        }
        let body = request.body.unwrap_or_default();

        let (tx, rx) = oneshot::channel();
        let run = move || {
            let result = complete(connection, &body, on_success, on_error);
            let _ = tx.send(result);
        };

        match mode {
            Mode::Sync => run(),
            Mode::Async => {
                std::thread::Builder::new()
                    .name("helper-transport".to_string())
                    .spawn(run)
                    .map_err(|e| TransportError::Network(e.to_string()))?;
            }
        }
        Ok(Pending { rx })
    }

    /// Dispatch `descriptor` as a `GET` with `params` in the query string.
    pub fn get<I, K, V>(&self, descriptor: RequestDescriptor, params: I, mode: Mode) -> Result<Pending, TransportError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.dispatch(descriptor.map_request(|r| build_get(r, params)), mode)
    }

    /// Dispatch `descriptor` as a form-encoded `POST` of `params`.
    pub fn post<I, K, V>(&self, descriptor: RequestDescriptor, params: I, mode: Mode) -> Result<Pending, TransportError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.dispatch(descriptor.map_request(|r| build_post(r, params)), mode)
    }

    fn resolve(&self, url: &str) -> String {
        match &self.base_url {
            Some(base) if url.starts_with('/') => format!("{base}{url}"),
            _ => url.to_string(),
        }
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("providers", &self.provider_names())
            .field("options", &self.options)
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn complete(
    connection: Box<dyn Connection>,
    body: &str,
    on_success: Option<Callback>,
    on_error: Option<Callback>,
) -> Result<Outcome, TransportError> {
    let response = match connection.send(body) {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "request did not complete");
            return Err(e);
        }
    };
    debug!(status = response.status, "request completed");

    let callback = if response.is_success() { on_success } else { on_error };
    if let Some(callback) = callback {
        callback(&response);
    }
    Ok(Outcome::from_response(response))
}

/// Configures a [`Transport`].
#[derive(Default)]
pub struct TransportBuilder {
    providers: Vec<Arc<dyn Provider>>,
    timeout: Option<Duration>,
    base_url: Option<String>,
}

impl TransportBuilder {
    /// Append a provider. Providers are tried in the order added.
    pub fn provider(mut self, provider: impl Provider + 'static) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Prefix for request URLs that start with `/`.
    pub fn base_url(mut self, base_url: &str) -> Self {
        self.base_url = Some(base_url.trim_end_matches('/').to_string());
        self
    }

    pub fn build(self) -> Transport {
        Transport {
            providers: self.providers,
            options: ConnectOptions {
                timeout: self.timeout,
            },
            base_url: self.base_url,
        }
    }
}
