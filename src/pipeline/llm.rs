//! Model client: send a prompt to the generation endpoint and return its text.
//!
//! All prompt wording lives in [`crate::prompts`]; this module only owns the
//! request shape, retries, memoization and mock mode.
//!
//! ## Retry Strategy
//!
//! `max_retries` bounds the total number of attempts. Network errors,
//! timeouts and non-2xx statuses are retried with exponential backoff
//! (`retry_backoff_ms * 2^(attempt-1)`): with the 1000 ms default and four
//! attempts the waits are 1 s → 2 s → 4 s. A 2xx answer that is not the
//! expected JSON shape (no candidate parts) is returned as
//! [`ClarityError::UnexpectedResponse`] straight away. A part without text
//! becomes an empty answer and fails later, at structuring.
//!
//! ## Mock Mode
//!
//! With no API key the client never touches the network and answers every
//! prompt with [`MOCK_RESPONSE`].

use crate::cache::{CacheKey, CachedOutput, SharedCache};
use crate::config::SummaryConfig;
use crate::error::{ClarityError, TransportError};
use crate::progress::ProgressCallback;
use crate::prompts::MOCK_RESPONSE;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// Header carrying the credential. Keeps the key out of URLs and access logs.
pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// One HTTP exchange with the generation endpoint.
#[async_trait]
pub trait GenerationTransport: Send + Sync {
    /// POST `body` and return the decoded JSON response.
    async fn send(&self, body: &Value) -> Result<Value, TransportError>;
}

/// reqwest-backed transport with a per-request timeout.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    timeout_secs: u64,
}

impl HttpTransport {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, ClarityError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ClarityError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            timeout_secs,
        })
    }

    fn classify(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout {
                secs: self.timeout_secs,
            }
        } else if e.is_decode() {
            TransportError::InvalidBody(e.to_string())
        } else {
            TransportError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl GenerationTransport for HttpTransport {
    async fn send(&self, body: &Value) -> Result<Value, TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: excerpt(&body),
            });
        }

        response.json::<Value>().await.map_err(|e| self.classify(e))
    }
}

/// A single generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub prompt: String,
    /// When set, the endpoint is asked for JSON conforming to this schema.
    pub schema: Option<Value>,
}

impl ModelRequest {
    /// Wire body for `generateContent`.
    pub fn to_body(&self) -> Value {
        let mut body = json!({
            "contents": [{"role": "user", "parts": [{"text": self.prompt}]}]
        });
        if let Some(ref schema) = self.schema {
            body["generationConfig"] = json!({
                "responseMimeType": "application/json",
                "responseSchema": schema,
            });
        }
        body
    }

    fn cache_key(&self) -> CacheKey {
        let schema = self.schema.as_ref().map(Value::to_string).unwrap_or_default();
        CacheKey::new("generate", self.prompt.as_bytes(), &[&schema])
    }
}

/// Longest response excerpt carried in an error message.
const MAX_SHOWN_CHARS: usize = 300;

/// Cut `text` to at most [`MAX_SHOWN_CHARS`] characters for error messages.
fn excerpt(text: &str) -> String {
    match text.char_indices().nth(MAX_SHOWN_CHARS) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}

/// Text of the first part of the first candidate.
///
/// A part without a `text` key yields an empty string, which the structuring
/// stage then rejects with the raw output attached.
fn first_part_text(response: &Value) -> Result<String, ClarityError> {
    let part = response.pointer("/candidates/0/content/parts/0").ok_or_else(|| {
        ClarityError::UnexpectedResponse {
            detail: format!("no candidate parts in response: {}", excerpt(&response.to_string())),
        }
    })?;
    Ok(part
        .get("text")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string())
}

/// Client for the generation endpoint, or a mock when no credential is set.
#[derive(Clone)]
pub struct ModelClient {
    /// `None` means mock mode.
    transport: Option<Arc<dyn GenerationTransport>>,
    max_attempts: u32,
    retry_backoff_ms: u64,
    cache: SharedCache,
    progress: Option<ProgressCallback>,
}

impl ModelClient {
    /// HTTP transport from `config`, or mock mode if `config.api_key` is unset.
    pub fn from_config(config: &SummaryConfig) -> Result<Self, ClarityError> {
        let transport: Option<Arc<dyn GenerationTransport>> = match config.api_key {
            Some(ref key) => Some(Arc::new(HttpTransport::new(
                config.endpoint.clone(),
                key.clone(),
                config.api_timeout_secs,
            )?)),
            None => None,
        };
        Ok(Self {
            transport,
            max_attempts: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
            cache: Arc::clone(&config.cache),
            progress: config.progress_callback.clone(),
        })
    }

    /// A client over an arbitrary transport, with a no-op cache.
    pub fn with_transport(
        transport: Arc<dyn GenerationTransport>,
        max_attempts: u32,
        retry_backoff_ms: u64,
    ) -> Self {
        Self {
            transport: Some(transport),
            max_attempts: max_attempts.max(1),
            retry_backoff_ms,
            cache: Arc::new(crate::cache::NoopCache),
            progress: None,
        }
    }

    /// A client that always answers with [`MOCK_RESPONSE`].
    pub fn mock() -> Self {
        Self {
            transport: None,
            max_attempts: 1,
            retry_backoff_ms: 0,
            cache: Arc::new(crate::cache::NoopCache),
            progress: None,
        }
    }

    pub fn with_cache(mut self, cache: SharedCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_progress(mut self, progress: Option<ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    pub fn is_mock(&self) -> bool {
        self.transport.is_none()
    }

    /// Send `prompt` (optionally constrained to `schema`) and return the model's text.
    ///
    /// # Errors
    /// * [`ClarityError::TransportExhausted`] — every attempt failed with a
    ///   retryable transport error
    /// * [`ClarityError::UnexpectedResponse`] — a 2xx answer without
    ///   candidate text, or a body that is not JSON
    pub async fn generate(&self, prompt: &str, schema: Option<&Value>) -> Result<String, ClarityError> {
        let Some(ref transport) = self.transport else {
            info!("No API key configured; returning mock response");
            if let Some(ref cb) = self.progress {
                cb.on_mock_mode();
            }
            return Ok(MOCK_RESPONSE.to_string());
        };

        let request = ModelRequest {
            prompt: prompt.to_string(),
            schema: schema.cloned(),
        };
        let key = request.cache_key();
        if let Some(CachedOutput::Text(text)) = self.cache.get(&key) {
            debug!("Generation cache hit ({} chars)", text.len());
            return Ok(text);
        }

        let body = request.to_body();
        let mut last_err = String::new();

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                let backoff = self
                    .retry_backoff_ms
                    .saturating_mul(2u64.saturating_pow(attempt - 1));
                warn!(
                    "Generation retry {}/{} after {}ms",
                    attempt + 1,
                    self.max_attempts,
                    backoff
                );
                if let Some(ref cb) = self.progress {
                    cb.on_model_retry(attempt, backoff, &last_err);
                }
                sleep(Duration::from_millis(backoff)).await;
            }

            if let Some(ref cb) = self.progress {
                cb.on_model_attempt(attempt + 1, self.max_attempts);
            }

            match transport.send(&body).await {
                Ok(response) => {
                    let text = first_part_text(&response)?;
                    debug!("Generation succeeded on attempt {}", attempt + 1);
                    if !text.is_empty() {
                        self.cache.insert(key, CachedOutput::Text(text.clone()));
                    }
                    return Ok(text);
                }
                Err(e) if e.is_retryable() => {
                    warn!("Generation attempt {} failed: {}", attempt + 1, e);
                    last_err = e.to_string();
                }
                Err(e) => {
                    return Err(ClarityError::UnexpectedResponse {
                        detail: e.to_string(),
                    })
                }
            }
        }

        Err(ClarityError::TransportExhausted {
            attempts: self.max_attempts,
            last_error: last_err,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use crate::progress::SummaryProgressCallback;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    fn ok_response(text: &str) -> Value {
        json!({"candidates": [{"content": {"parts": [{"text": text}]}}]})
    }

    /// Replays a scripted list of outcomes; the last one repeats.
    struct Scripted {
        outcomes: Mutex<VecDeque<Result<Value, TransportError>>>,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(outcomes: Vec<Result<Value, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl GenerationTransport for Scripted {
        async fn send(&self, _body: &Value) -> Result<Value, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut q = self.outcomes.lock().unwrap();
            if q.len() > 1 {
                q.pop_front().unwrap()
            } else {
                q.front().cloned().unwrap()
            }
        }
    }

    #[derive(Default)]
    struct Delays(Mutex<Vec<u64>>);

    impl SummaryProgressCallback for Delays {
        fn on_model_retry(&self, _attempt: u32, delay_ms: u64, _error: &str) {
            self.0.lock().unwrap().push(delay_ms);
        }
    }

    fn unavailable() -> Result<Value, TransportError> {
        Err(TransportError::Status {
            status: 503,
            body: "overloaded".into(),
        })
    }

    #[test]
    fn body_carries_prompt_and_schema() {
        let req = ModelRequest {
            prompt: "hi".into(),
            schema: Some(json!({"type": "OBJECT"})),
        };
        let body = req.to_body();
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");

        let plain = ModelRequest { prompt: "hi".into(), schema: None }.to_body();
        assert!(plain.get("generationConfig").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn retries_with_doubling_backoff_then_succeeds() {
        let transport = Scripted::new(vec![
            unavailable(),
            Err(TransportError::Timeout { secs: 90 }),
            Err(TransportError::Network("connection reset".into())),
            Ok(ok_response("done")),
        ]);
        let delays = Arc::new(Delays::default());
        let client = ModelClient::with_transport(transport.clone(), 4, 1000)
            .with_progress(Some(delays.clone()));

        let text = client.generate("p", None).await.unwrap();

        assert_eq!(text, "done");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 4);
        assert_eq!(*delays.0.lock().unwrap(), vec![1000, 2000, 4000]);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let transport = Scripted::new(vec![unavailable()]);
        let client = ModelClient::with_transport(transport.clone(), 3, 10);

        let err = client.generate("p", None).await.unwrap_err();

        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
        match err {
            ClarityError::TransportExhausted { attempts, last_error } => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("503"), "got: {last_error}");
            }
            other => panic!("expected TransportExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_parts_is_unexpected_and_not_retried() {
        let transport = Scripted::new(vec![Ok(json!({"candidates": [{"content": {}}]}))]);
        let client = ModelClient::with_transport(transport.clone(), 4, 10);

        let err = client.generate("p", None).await.unwrap_err();

        assert!(matches!(err, ClarityError::UnexpectedResponse { .. }), "got: {err}");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn part_without_text_yields_empty_string() {
        let transport = Scripted::new(vec![Ok(json!({
            "candidates": [{"content": {"parts": [{"inlineData": {}}]}}]
        }))]);
        let client = ModelClient::with_transport(transport.clone(), 4, 10);

        assert_eq!(client.generate("p", None).await.unwrap(), "");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn excerpt_caps_long_text_on_char_boundary() {
        let long = "é".repeat(1000);
        let shown = excerpt(&long);
        assert_eq!(shown.chars().count(), MAX_SHOWN_CHARS + 1);
        assert!(shown.ends_with('…'));
        assert_eq!(excerpt("short"), "short");
    }

    #[tokio::test]
    async fn undecodable_body_is_not_retried() {
        let transport = Scripted::new(vec![Err(TransportError::InvalidBody("eof".into()))]);
        let client = ModelClient::with_transport(transport.clone(), 4, 10);
        let err = client.generate("p", None).await.unwrap_err();
        assert!(matches!(err, ClarityError::UnexpectedResponse { .. }));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn mock_mode_returns_canned_json() {
        let text = ModelClient::mock().generate("anything", None).await.unwrap();
        assert_eq!(text, MOCK_RESPONSE);

        let config = SummaryConfig::builder().build().unwrap();
        let client = ModelClient::from_config(&config).unwrap();
        assert!(client.is_mock());
    }

    #[tokio::test]
    async fn successful_generation_is_memoized() {
        let transport = Scripted::new(vec![Ok(ok_response("cached"))]);
        let client = ModelClient::with_transport(transport.clone(), 2, 10)
            .with_cache(Arc::new(InMemoryCache::new()));

        assert_eq!(client.generate("same", None).await.unwrap(), "cached");
        assert_eq!(client.generate("same", None).await.unwrap(), "cached");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);

        client.generate("same", Some(&json!({"type": "OBJECT"}))).await.unwrap();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn http_transport_sends_key_header_and_json_body() {
        let server = httpmock::MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST)
                    .path("/generate")
                    .header(API_KEY_HEADER, "secret")
                    .json_body_partial(r#"{"contents":[{"parts":[{"text":"hello"}]}]}"#);
                then.status(200).json_body(ok_response("{\"ok\":true}"));
            })
            .await;

        let transport = HttpTransport::new(server.url("/generate"), "secret", 5).unwrap();
        let client = ModelClient::with_transport(Arc::new(transport), 1, 1);

        let text = client.generate("hello", None).await.unwrap();
        assert_eq!(text, "{\"ok\":true}");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn http_transport_retries_server_errors() {
        let server = httpmock::MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST).path("/generate");
                then.status(503).body("overloaded");
            })
            .await;

        let transport = HttpTransport::new(server.url("/generate"), "k", 5).unwrap();
        let client = ModelClient::with_transport(Arc::new(transport), 3, 1);

        let err = client.generate("hello", None).await.unwrap_err();
        assert!(matches!(err, ClarityError::TransportExhausted { attempts: 3, .. }), "got: {err}");
        mock.assert_hits_async(3).await;
    }

    #[tokio::test]
    async fn long_error_pages_are_cut_in_status_errors() {
        let server = httpmock::MockServer::start_async().await;
        let page = format!("<html>{}</html>", "x".repeat(5000));
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST).path("/generate");
                then.status(502).body(page.clone());
            })
            .await;

        let transport = HttpTransport::new(server.url("/generate"), "k", 5).unwrap();
        match transport.send(&json!({})).await.unwrap_err() {
            TransportError::Status { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body.chars().count(), MAX_SHOWN_CHARS + 1);
                assert!(body.starts_with("<html>"));
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }
}
