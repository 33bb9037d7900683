//! HTTP client façade for the FarmLink API
//!
//! Single call path for every client-to-backend request:
//!
//! 1. GET-class calls consult the TTL response cache first.
//! 2. Concurrent identical requests collapse onto one in-flight network
//!    call; every joined caller observes the same settled result.
//! 3. A bearer token is resolved from the injected session provider (with
//!    one delayed re-ask for sessions that are still initializing).
//! 4. A wall-clock watchdog aborts stuck requests with a distinguishable
//!    timeout error.
//! 5. A 401 on a request that carried a token invalidates the session
//!    before the error is surfaced.
//!
//! Multipart uploads skip the cache and de-duplication layers entirely and
//! never get a content-type assigned here — the transport sets its own
//! boundary-bearing one.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use reqwest::multipart::Form;
use reqwest::{Client, Method, StatusCode, header};
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{CacheStatsSnapshot, ResponseCache};
use crate::config::ClientConfig;
use crate::session::SessionProvider;
use crate::{Error, Result};

/// A de-duplicated in-flight request. Cloned to every concurrent caller for
/// the same cache key; all of them await the same settled result.
type InFlight = Shared<BoxFuture<'static, Result<Value>>>;

/// Options for a single façade request
#[derive(Debug, Clone)]
pub struct RequestOptions {
    method: Method,
    headers: Vec<(String, String)>,
    body: Option<Value>,
    token: Option<String>,
    use_cache: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: Vec::new(),
            body: None,
            token: None,
            use_cache: true,
        }
    }
}

impl RequestOptions {
    /// GET request, cache participation on
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the HTTP method
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Add a header; caller-supplied headers win over computed ones
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach a JSON body
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Use a pre-fetched token instead of asking the session provider
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Opt this call out of the response cache (lookup and write).
    /// De-duplication of concurrent identical calls still applies.
    #[must_use]
    pub fn no_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }
}

/// The FarmLink API client
///
/// Owns the response cache and the pending-request map — construct one
/// instance per backend and share it (it is cheap to clone).
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use farmlink_client::{ClientConfig, FarmLinkClient, MemorySession};
///
/// # async fn example() -> farmlink_client::Result<()> {
/// let session = Arc::new(MemorySession::with_token("access-token"));
/// let client = FarmLinkClient::new(
///     ClientConfig::new("https://api.farmlink.example"),
///     session,
/// )?;
///
/// let jobs = client.request("/api/jobs", Default::default()).await?;
/// println!("{jobs}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct FarmLinkClient {
    /// HTTP client (pooled, shared across clones)
    http: Client,
    /// Client configuration
    config: ClientConfig,
    /// Token source and invalidation sink
    session: Arc<dyn SessionProvider>,
    /// TTL response cache for GET-class calls
    cache: Arc<ResponseCache>,
    /// In-flight requests keyed like the cache; at most one per key
    pending: Arc<Mutex<HashMap<String, InFlight>>>,
}

/// Everything one network attempt needs, owned, so the in-flight future is
/// `'static` and can outlive the caller that registered it
struct RequestContext {
    http: Client,
    session: Arc<dyn SessionProvider>,
    url: String,
    endpoint: String,
    method: Method,
    headers: Vec<(String, String)>,
    body: Option<Value>,
    token: Option<String>,
    timeout: Duration,
    token_retry_delay: Duration,
}

impl FarmLinkClient {
    /// Create a client for the backend described by `config`
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the underlying
    /// HTTP client cannot be built.
    pub fn new(config: ClientConfig, session: Arc<dyn SessionProvider>) -> Result<Self> {
        config.validate()?;

        let http = Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(30))
            .tcp_nodelay(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;

        let cache = Arc::new(ResponseCache::new(config.cache_ttl));

        Ok(Self {
            http,
            config,
            session,
            cache,
            pending: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// The configuration this client was built with
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Perform a request against the backend
    ///
    /// This is the single call path every endpoint method routes through;
    /// see the module docs for the full pipeline.
    ///
    /// # Errors
    ///
    /// Propagates the taxonomy in [`Error`]: transport failures, the
    /// watchdog [`Error::Timeout`], non-2xx statuses as [`Error::Http`]
    /// (with the session invalidated first on an authenticated 401), and
    /// [`Error::Decode`] for a 2xx body that is not JSON. Nothing is
    /// retried here.
    pub async fn request(&self, endpoint: &str, options: RequestOptions) -> Result<Value> {
        let RequestOptions {
            method,
            headers,
            body,
            token,
            use_cache,
        } = options;

        let cache_key = ResponseCache::build_key(method.as_str(), endpoint);
        let cacheable = method == Method::GET && use_cache && self.config.cache_enabled;

        if cacheable {
            if let Some(value) = self.cache.get(&cache_key) {
                debug!(key = %cache_key, "Serving response from cache");
                return Ok(value);
            }
        }

        // Join an existing in-flight request or register a new one. The map
        // is locked only across this synchronous section; the registered
        // future removes its own entry when it settles.
        let in_flight = {
            let mut pending = self.pending.lock();
            if let Some(existing) = pending.get(&cache_key) {
                debug!(key = %cache_key, "Joining in-flight request");
                existing.clone()
            } else {
                let context = RequestContext {
                    http: self.http.clone(),
                    session: Arc::clone(&self.session),
                    url: self.url_for(endpoint),
                    endpoint: endpoint.to_string(),
                    method,
                    headers,
                    body,
                    token,
                    timeout: self.config.request_timeout,
                    token_retry_delay: self.config.token_retry_delay,
                };
                let entry = self.register(context, cacheable, cache_key.clone());
                pending.insert(cache_key, entry.clone());
                entry
            }
        };

        in_flight.await
    }

    /// Send a `multipart/form-data` request
    ///
    /// Uploads are non-idempotent and not cacheable: this path bypasses the
    /// response cache and the de-duplication map entirely, and assigns no
    /// content-type so the transport can set its own boundary-bearing one.
    /// Token resolution, the timeout watchdog and 401 handling match
    /// [`Self::request`].
    ///
    /// # Errors
    ///
    /// Same failure taxonomy as [`Self::request`].
    pub async fn upload(&self, endpoint: &str, form: Form) -> Result<Value> {
        let token = resolve_token(self.session.as_ref(), self.config.token_retry_delay).await;

        let mut request = self.http.post(self.url_for(endpoint)).multipart(form);
        if let Some(ref token) = token {
            request = request.bearer_auth(token);
        }

        let response = send_with_watchdog(
            request,
            endpoint,
            self.config.request_timeout,
        )
        .await?;

        read_response(response, self.session.as_ref(), endpoint, token.is_some()).await
    }

    /// Remove every cached entry whose key contains `pattern`
    ///
    /// Coarse-grained invalidation after a mutation, e.g.
    /// `client.invalidate_cache("/api/admin")` after an admin write.
    /// Returns the number of entries removed.
    pub fn invalidate_cache(&self, pattern: &str) -> usize {
        self.cache.invalidate(pattern)
    }

    /// Drop the entire response cache
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Snapshot of response-cache statistics
    #[must_use]
    pub fn cache_stats(&self) -> CacheStatsSnapshot {
        self.cache.stats()
    }

    /// Wrap one network attempt into a shareable future that owns its own
    /// settlement bookkeeping: the pending-map entry is removed whenever the
    /// attempt settles — success, failure or timeout — and only then is a
    /// cacheable result written, so a key is never both pending and cached.
    fn register(&self, context: RequestContext, cacheable: bool, cache_key: String) -> InFlight {
        let pending = Arc::clone(&self.pending);
        let cache = Arc::clone(&self.cache);
        async move {
            // Snapshot before the request does anything: an invalidation
            // landing while it is in flight must win over the late write.
            let epoch = cache.epoch();

            let result = execute(context).await;

            pending.lock().remove(&cache_key);
            if cacheable {
                if let Ok(ref value) = result {
                    cache.insert_if_current(&cache_key, value.clone(), epoch);
                }
            }
            result
        }
        .boxed()
        .shared()
    }

    fn url_for(&self, endpoint: &str) -> String {
        format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint
        )
    }
}

/// Run a single network attempt to settlement: token, headers, send, decode
async fn execute(context: RequestContext) -> Result<Value> {
    let RequestContext {
        http,
        session,
        url,
        endpoint,
        method,
        headers,
        body,
        token,
        timeout,
        token_retry_delay,
    } = context;

    let token = match token {
        Some(token) => Some(token),
        None => resolve_token(session.as_ref(), token_retry_delay).await,
    };

    let mut header_map = header::HeaderMap::new();
    if let Some(ref token) = token {
        if let Ok(value) = format!("Bearer {token}").parse::<header::HeaderValue>() {
            header_map.insert(header::AUTHORIZATION, value);
        }
    }
    // Caller-supplied headers override computed ones
    for (name, value) in &headers {
        if let (Ok(name), Ok(value)) = (
            name.parse::<header::HeaderName>(),
            value.parse::<header::HeaderValue>(),
        ) {
            header_map.insert(name, value);
        }
    }
    // JSON content-type only when there is a body and the caller did not
    // set an explicit content-type
    if body.is_some() && !header_map.contains_key(header::CONTENT_TYPE) {
        header_map.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
    }

    let mut request = http.request(method, &url).headers(header_map);
    if let Some(ref body) = body {
        let bytes = serde_json::to_vec(body).map_err(|e| Error::Internal(e.to_string()))?;
        request = request.body(bytes);
    }

    let response = send_with_watchdog(request, &endpoint, timeout).await?;
    read_response(response, session.as_ref(), &endpoint, token.is_some()).await
}

/// Send a prepared request under the wall-clock watchdog
///
/// When the watchdog fires the in-flight transport future is dropped, which
/// aborts the underlying call, and the distinguishable [`Error::Timeout`]
/// is returned.
async fn send_with_watchdog(
    request: reqwest::RequestBuilder,
    endpoint: &str,
    timeout: Duration,
) -> Result<reqwest::Response> {
    match tokio::time::timeout(timeout, request.send()).await {
        Ok(Ok(response)) => Ok(response),
        Ok(Err(err)) if err.is_timeout() => {
            warn!(endpoint, "Request timed out in transport");
            Err(Error::Timeout {
                endpoint: endpoint.to_string(),
                timeout_secs: timeout.as_secs(),
            })
        }
        Ok(Err(err)) => Err(Error::Transport(err.to_string())),
        Err(_) => {
            warn!(endpoint, timeout_secs = timeout.as_secs(), "Request aborted by watchdog");
            Err(Error::Timeout {
                endpoint: endpoint.to_string(),
                timeout_secs: timeout.as_secs(),
            })
        }
    }
}

/// Decode a settled response into the façade's result
///
/// On a non-2xx status the body is mined for a structured `error` message.
/// A 401 on a request that carried a token additionally invalidates the
/// session — proof the token is dead — before the error is surfaced.
async fn read_response(
    response: reqwest::Response,
    session: &dyn SessionProvider,
    endpoint: &str,
    token_attached: bool,
) -> Result<Value> {
    let status = response.status();

    if status.is_success() {
        let text = response
            .text()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        return serde_json::from_str(&text).map_err(|e| Error::Decode(e.to_string()));
    }

    let text = response.text().await.unwrap_or_default();
    let message = error_message(status, &text);

    if status == StatusCode::UNAUTHORIZED && token_attached {
        warn!(endpoint, "Authenticated request rejected with 401; invalidating session");
        session.invalidate().await;
    }

    Err(Error::Http {
        status: status.as_u16(),
        message,
    })
}

/// Ask the session provider for a token; on `None`, wait once and re-ask
///
/// Exactly one delayed re-ask — a session that is mid-initialization gets a
/// second chance, a signed-out session does not turn this into a retry
/// loop. A request without a token proceeds unauthenticated.
async fn resolve_token(session: &dyn SessionProvider, retry_delay: Duration) -> Option<String> {
    if let Some(token) = session.access_token().await {
        return Some(token);
    }

    tokio::time::sleep(retry_delay).await;
    let token = session.access_token().await;
    if token.is_none() {
        debug!("No access token after re-ask; proceeding unauthenticated");
    }
    token
}

/// Extract a human-readable message from an error response body
///
/// Prefers the JSON `error` field, falls back to the raw body text, and to
/// `HTTP <status>` when the body is empty.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(message) = value.get("error").and_then(Value::as_str) {
            return message.to_string();
        }
    }

    if body.trim().is_empty() {
        format!("HTTP {status}")
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    // ── error_message ─────────────────────────────────────────────────────────

    #[test]
    fn error_message_prefers_structured_error_field() {
        let message = error_message(
            StatusCode::FORBIDDEN,
            r#"{"error": "account pending verification"}"#,
        );
        assert_eq!(message, "account pending verification");
    }

    #[test]
    fn error_message_falls_back_to_raw_text() {
        let message = error_message(StatusCode::BAD_GATEWAY, "upstream exploded");
        assert_eq!(message, "upstream exploded");
    }

    #[test]
    fn error_message_falls_back_to_status_for_empty_body() {
        let message = error_message(StatusCode::NOT_FOUND, "");
        assert_eq!(message, "HTTP 404 Not Found");
    }

    #[test]
    fn error_message_treats_non_string_error_field_as_raw_text() {
        let body = r#"{"error": {"code": 9}}"#;
        assert_eq!(error_message(StatusCode::BAD_REQUEST, body), body);
    }

    // ── RequestOptions ────────────────────────────────────────────────────────

    #[test]
    fn request_options_default_to_cached_get() {
        let options = RequestOptions::new();
        assert_eq!(options.method, Method::GET);
        assert!(options.use_cache);
        assert!(options.body.is_none());
        assert!(options.token.is_none());
    }

    #[test]
    fn no_cache_only_flips_cache_participation() {
        let options = RequestOptions::new().no_cache();
        assert!(!options.use_cache);
        assert_eq!(options.method, Method::GET);
    }

    // ── resolve_token ─────────────────────────────────────────────────────────

    /// Session that yields a token only from the `ready_after`-th ask on
    struct SlowSession {
        asks: AtomicUsize,
        ready_after: usize,
    }

    #[async_trait]
    impl SessionProvider for SlowSession {
        async fn access_token(&self) -> Option<String> {
            let ask = self.asks.fetch_add(1, Ordering::SeqCst) + 1;
            (ask >= self.ready_after).then(|| "late-token".to_string())
        }

        async fn invalidate(&self) {}
    }

    #[tokio::test]
    async fn resolve_token_returns_immediately_when_available() {
        let session = SlowSession {
            asks: AtomicUsize::new(0),
            ready_after: 1,
        };
        let token = resolve_token(&session, Duration::from_millis(1)).await;
        assert_eq!(token, Some("late-token".to_string()));
        assert_eq!(session.asks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn resolve_token_re_asks_exactly_once() {
        // GIVEN: a session that only has a token from the second ask
        // WHEN: resolving
        // THEN: the delayed re-ask picks it up
        let session = SlowSession {
            asks: AtomicUsize::new(0),
            ready_after: 2,
        };
        let token = resolve_token(&session, Duration::from_millis(1)).await;
        assert_eq!(token, Some("late-token".to_string()));
        assert_eq!(session.asks.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn resolve_token_gives_up_after_the_second_ask() {
        let session = SlowSession {
            asks: AtomicUsize::new(0),
            ready_after: 3,
        };
        let token = resolve_token(&session, Duration::from_millis(1)).await;
        assert_eq!(token, None);
        assert_eq!(session.asks.load(Ordering::SeqCst), 2);
    }
}
