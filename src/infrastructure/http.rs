//! HTTP plumbing for orchestrator REST APIs
//!
//! Requests go through the [`HttpTransport`] trait so providers can be tested
//! against a [`MockTransport`]. [`ApiClient`] adds what every provider needs
//! on top of a transport: authentication, per-attempt timeouts, retries,
//! redirect following and cancellation.

use async_trait::async_trait;
use http::StatusCode;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

/// Default per-attempt timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

const MAX_REDIRECTS: usize = 10;

/// HTTP failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    /// Connection or protocol failure
    #[error("request to '{url}' failed: {message}")]
    Transport {
        /// Requested URL.
        url: String,
        /// Transport message.
        message: String,
    },

    /// No response within the timeout
    #[error("request to '{url}' timed out after {millis}ms")]
    Timeout {
        /// Requested URL.
        url: String,
        /// Timeout that elapsed.
        millis: u128,
    },

    /// Non-success status
    #[error("request to '{url}' returned status {status}: {body}")]
    Status {
        /// Requested URL.
        url: String,
        /// Status code.
        status: u16,
        /// Response body, lossily decoded.
        body: String,
    },

    /// Body could not be decoded
    #[error("invalid response from '{url}': {message}")]
    Decode {
        /// Requested URL.
        url: String,
        /// Decoder message.
        message: String,
    },

    /// The cancellation token fired
    #[error("request to '{url}' was cancelled")]
    Cancelled {
        /// Requested URL.
        url: String,
    },

    /// The blocking runtime could not drive the request
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl HttpError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout { .. })
    }
}

/// Request authentication.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum Auth {
    /// Anonymous
    #[default]
    None,
    /// HTTP basic authentication
    Basic {
        /// User name, may be empty
        user: String,
        /// Password or token
        password: String,
    },
    /// `Authorization: Bearer <token>`
    Bearer(String),
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Basic { user, .. } => write!(f, "Basic({user:?}, ***)"),
            Self::Bearer(_) => f.write_str("Bearer(***)"),
        }
    }
}

/// An outgoing GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Absolute URL
    pub url: String,
    /// Extra headers
    pub headers: Vec<(String, String)>,
    /// Credentials
    pub auth: Auth,
}

impl HttpRequest {
    /// Anonymous GET of `url`.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            auth: Auth::None,
        }
    }

    /// Adds a header
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A received response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code
    pub status: StatusCode,
    /// Response headers
    pub headers: Vec<(String, String)>,
    /// Raw body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// First header named `name`, case-insensitive.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body as text, invalid UTF-8 replaced.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    fn is_retryable(&self) -> bool {
        self.status.is_server_error() || self.status == StatusCode::TOO_MANY_REQUESTS
    }
}

/// Sends single HTTP requests without following redirects.
#[async_trait]
pub trait HttpTransport: fmt::Debug + Send + Sync {
    /// Performs one request.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

/// [`HttpTransport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Transport with redirects disabled; [`ApiClient`] follows them.
    pub fn new() -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("steplib/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HttpError::Transport {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let transport_error = |e: reqwest::Error| HttpError::Transport {
            url: request.url.clone(),
            message: e.to_string(),
        };

        let mut builder = self.client.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match &request.auth {
            Auth::None => builder,
            Auth::Basic { user, password } => builder.basic_auth(user, Some(password)),
            Auth::Bearer(token) => builder.bearer_auth(token),
        };

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
            .collect();
        let body = response.bytes().await.map_err(transport_error)?.to_vec();
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Cooperative cancellation shared between a caller and in-flight requests.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    /// Token that has not fired.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Fires the token; all clones observe it.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    /// True once [`cancel`](Self::cancel) was called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves when the token fires.
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        while !*receiver.borrow_and_update() {
            if receiver.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Timeout and retry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpSettings {
    /// Per-attempt timeout
    pub timeout: Duration,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Pause before retry `n` is `n * retry_backoff`
    pub retry_backoff: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

/// Authenticated, retrying, cancellable client for one API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    auth: Auth,
    headers: Vec<(String, String)>,
    settings: HttpSettings,
    cancellation: CancellationToken,
}

impl ApiClient {
    /// Anonymous client with default settings.
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            auth: Auth::None,
            headers: Vec::new(),
            settings: HttpSettings::default(),
            cancellation: CancellationToken::new(),
        }
    }

    /// Sets credentials
    #[must_use]
    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    /// Adds a header sent with every request
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets timeout and retries
    #[must_use]
    pub fn with_settings(mut self, settings: HttpSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Uses `token` to abort requests
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Cancellation token of this client.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// GETs `url`, following redirects; any final non-2xx status is an error.
    ///
    /// Credentials are only sent to the host of the original URL.
    pub async fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
        let mut current = url.to_string();
        let origin = host(url);

        for _ in 0..=MAX_REDIRECTS {
            let mut request = HttpRequest::get(&current);
            request.headers.clone_from(&self.headers);
            if host(&current) == origin {
                request.auth = self.auth.clone();
            }

            let response = self.send_with_retry(request).await?;
            if response.status.is_redirection()
                && let Some(location) = response.header("location")
            {
                let next = url::Url::parse(&current)
                    .and_then(|base| base.join(location))
                    .map_err(|e| HttpError::Decode {
                        url: current.clone(),
                        message: format!("invalid redirect location '{location}': {e}"),
                    })?;
                tracing::debug!(from = %current, to = %next, "Following redirect");
                current = next.to_string();
                continue;
            }
            if !response.status.is_success() {
                return Err(HttpError::Status {
                    url: current,
                    status: response.status.as_u16(),
                    body: response.text(),
                });
            }
            return Ok(response);
        }
        Err(HttpError::Transport {
            url: url.to_string(),
            message: format!("more than {MAX_REDIRECTS} redirects"),
        })
    }

    /// GETs `url` and decodes the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, HttpError> {
        let response = self.get(url).await?;
        serde_json::from_slice(&response.body).map_err(|e| HttpError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    async fn send_with_retry(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let url = request.url.clone();
        let mut attempt = 0;
        loop {
            if self.cancellation.is_cancelled() {
                return Err(HttpError::Cancelled { url });
            }
            tracing::debug!(url = %url, attempt, "Sending request");

            let outcome = tokio::select! {
                () = self.cancellation.cancelled() => return Err(HttpError::Cancelled { url }),
                result = tokio::time::timeout(self.settings.timeout, self.transport.send(request.clone())) => {
                    result.unwrap_or_else(|_| Err(HttpError::Timeout {
                        url: url.clone(),
                        millis: self.settings.timeout.as_millis(),
                    }))
                }
            };

            let retryable = match &outcome {
                Ok(response) => response.is_retryable(),
                Err(e) => e.is_retryable(),
            };
            if !retryable || attempt >= self.settings.max_retries {
                return outcome;
            }

            attempt += 1;
            tracing::warn!(url = %url, attempt, "Request failed, retrying");
            let backoff = self.settings.retry_backoff * attempt;
            tokio::select! {
                () = self.cancellation.cancelled() => return Err(HttpError::Cancelled { url }),
                () = tokio::time::sleep(backoff) => {}
            }
        }
    }
}

fn host(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

/// Runs async API calls from synchronous code on a private runtime.
#[derive(Debug, Default)]
pub struct BlockingRuntime {
    runtime: OnceCell<tokio::runtime::Runtime>,
}

impl BlockingRuntime {
    /// Runtime created on first use.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drives `future` to completion.
    ///
    /// Fails with [`HttpError::Runtime`] when called from within another
    /// tokio runtime.
    pub fn block_on<F, T>(&self, future: F) -> Result<T, HttpError>
    where
        F: Future<Output = Result<T, HttpError>>,
    {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(HttpError::Runtime(
                "blocking call made from within an async runtime; \
                 call it from a blocking context such as tokio::task::spawn_blocking"
                    .to_string(),
            ));
        }
        let runtime = self.runtime.get_or_try_init(|| {
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| HttpError::Runtime(format!("failed to start runtime: {e}")))
        })?;
        runtime.block_on(future)
    }
}

/// Canned response served by [`MockTransport`].
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// Status code
    pub status: StatusCode,
    /// Response headers
    pub headers: Vec<(String, String)>,
    /// Body
    pub body: Vec<u8>,
    /// Simulated latency
    pub delay: Duration,
    /// Transport failure instead of a response
    pub error: Option<String>,
}

impl MockResponse {
    /// `200 OK` with `body`.
    #[must_use]
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::status(200, body)
    }

    /// `200 OK` with a JSON body.
    #[must_use]
    pub fn json(value: &serde_json::Value) -> Self {
        Self::ok(value.to_string())
    }

    /// Arbitrary status with `body`.
    #[must_use]
    pub fn status(code: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            headers: Vec::new(),
            body: body.into(),
            delay: Duration::ZERO,
            error: None,
        }
    }

    /// `302 Found` pointing at `location`.
    #[must_use]
    pub fn redirect(location: &str) -> Self {
        let mut response = Self::status(302, Vec::new());
        response.headers.push(("Location".to_string(), location.to_string()));
        response
    }

    /// Connection failure.
    #[must_use]
    pub fn transport_error(message: impl Into<String>) -> Self {
        let mut response = Self::status(500, Vec::new());
        response.error = Some(message.into());
        response
    }

    /// Delays the response
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// In-memory [`HttpTransport`] for tests.
///
/// Responses are registered per URL and served in order; the last one
/// repeats. Unregistered URLs answer `404`. Every request is recorded.
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, VecDeque<MockResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    /// Transport without routes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `response` for `url`.
    pub fn add_response(&self, url: impl Into<String>, response: MockResponse) {
        self.routes
            .lock()
            .entry(url.into())
            .or_default()
            .push_back(response);
    }

    /// Builder form of [`add_response`](Self::add_response).
    #[must_use]
    pub fn with_response(self, url: impl Into<String>, response: MockResponse) -> Self {
        self.add_response(url, response);
        self
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// URLs requested so far, in order.
    #[must_use]
    pub fn requested_urls(&self) -> Vec<String> {
        self.requests.lock().iter().map(|r| r.url.clone()).collect()
    }

    fn next_response(&self, url: &str) -> Option<MockResponse> {
        let mut routes = self.routes.lock();
        let queue = routes.get_mut(url)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        self.requests.lock().push(request.clone());
        let Some(response) = self.next_response(&request.url) else {
            return Ok(HttpResponse {
                status: StatusCode::NOT_FOUND,
                headers: Vec::new(),
                body: b"not found".to_vec(),
            });
        };
        if !response.delay.is_zero() {
            tokio::time::sleep(response.delay).await;
        }
        if let Some(message) = response.error {
            return Err(HttpError::Transport {
                url: request.url,
                message,
            });
        }
        Ok(HttpResponse {
            status: response.status,
            headers: response.headers,
            body: response.body,
        })
    }
}
