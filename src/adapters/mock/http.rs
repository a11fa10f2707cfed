//! Mock HTTP client for testing.
//!
//! Provides a configurable mock HTTP client that replays scripted responses,
//! including chunked bodies, mid-stream failures and delays.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::traits::{Headers, HttpClient, HttpError, HttpRequest, StreamingResponse};

/// A recorded HTTP request for verification in tests.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method (GET or POST)
    pub method: String,
    /// Request URL
    pub url: String,
    /// Request headers
    pub headers: Headers,
    /// Request body (for POST requests)
    pub body: Option<String>,
}

/// Configuration for a mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Respond with a status, headers and body chunks
    Stream {
        status: u16,
        headers: Headers,
        chunks: Vec<Bytes>,
    },
    /// Respond with 200, emit the chunks, then fail the body read
    StreamError { chunks: Vec<Bytes>, error: HttpError },
    /// Respond with 200, emit the chunks, then never finish the body
    Stall { chunks: Vec<Bytes> },
    /// Fail before any response arrives
    Error(HttpError),
    /// Wait, then behave like the inner response
    Delayed(Duration, Box<MockResponse>),
    /// Never respond
    Pending,
}

impl MockResponse {
    /// 200 response whose body arrives as the given chunks.
    pub fn chunks<I, T>(chunks: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Bytes>,
    {
        MockResponse::Stream {
            status: 200,
            headers: Headers::new(),
            chunks: chunks.into_iter().map(Into::into).collect(),
        }
    }

    /// Single-chunk response with the given status.
    pub fn status(status: u16, body: impl Into<Bytes>) -> Self {
        MockResponse::Stream {
            status,
            headers: Headers::new(),
            chunks: vec![body.into()],
        }
    }

    /// Single-chunk JSON response with the given status.
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        let mut headers = Headers::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        MockResponse::Stream {
            status,
            headers,
            chunks: vec![Bytes::from(body.to_string())],
        }
    }

    /// Delay this response.
    pub fn delayed(self, delay: Duration) -> Self {
        MockResponse::Delayed(delay, Box::new(self))
    }
}

/// Mock HTTP client for testing.
///
/// Responses are queued per URL prefix and consumed in order; the last
/// queued response for a prefix is replayed once the queue runs dry.
///
/// # Example
///
/// ```ignore
/// use chatwire::adapters::mock::{MockHttpClient, MockResponse};
///
/// let client = MockHttpClient::new();
/// client.push_response("http://localhost/api/v1/chat", MockResponse::status(503, ""));
/// client.push_response("http://localhost/api/v1/chat", MockResponse::chunks(["data: [DONE]\n\n"]));
/// ```
#[derive(Debug, Clone)]
pub struct MockHttpClient {
    /// Queued responses by URL prefix
    responses: Arc<Mutex<HashMap<String, VecDeque<MockResponse>>>>,
    /// Recorded requests for verification
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    /// Fallback when no prefix matches
    default_response: Arc<Mutex<Option<MockResponse>>>,
}

impl MockHttpClient {
    /// Create a new mock HTTP client.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            default_response: Arc::new(Mutex::new(None)),
        }
    }

    /// Replace all queued responses for a URL prefix with a single response.
    pub fn set_response(&self, url: &str, response: MockResponse) {
        let mut responses = self.responses.lock().unwrap();
        responses.insert(url.to_string(), VecDeque::from([response]));
    }

    /// Queue another response for a URL prefix.
    pub fn push_response(&self, url: &str, response: MockResponse) {
        let mut responses = self.responses.lock().unwrap();
        responses
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }

    /// Set a default response for unmatched URLs.
    pub fn set_default_response(&self, response: MockResponse) {
        let mut default = self.default_response.lock().unwrap();
        *default = Some(response);
    }

    /// Get all recorded requests.
    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        let requests = self.requests.lock().unwrap();
        requests.clone()
    }

    /// Number of requests whose URL starts with `prefix`.
    pub fn request_count(&self, prefix: &str) -> usize {
        let requests = self.requests.lock().unwrap();
        requests.iter().filter(|r| r.url.starts_with(prefix)).count()
    }

    /// Clear recorded requests.
    pub fn clear_requests(&self) {
        let mut requests = self.requests.lock().unwrap();
        requests.clear();
    }

    /// Clear all configured responses.
    pub fn clear_responses(&self) {
        let mut responses = self.responses.lock().unwrap();
        responses.clear();
        let mut default = self.default_response.lock().unwrap();
        *default = None;
    }

    fn record_request(&self, request: &HttpRequest) {
        let mut requests = self.requests.lock().unwrap();
        requests.push(RecordedRequest {
            method: request.method.as_str().to_string(),
            url: request.url.clone(),
            headers: request.headers.clone(),
            body: request.body.clone(),
        });
    }

    /// Next response for a URL: exact key first, then longest prefix.
    fn next_response(&self, url: &str) -> Option<MockResponse> {
        let mut responses = self.responses.lock().unwrap();

        let key = if responses.contains_key(url) {
            Some(url.to_string())
        } else {
            responses
                .keys()
                .filter(|pattern| url.starts_with(pattern.as_str()))
                .max_by_key(|pattern| pattern.len())
                .cloned()
        };

        if let Some(k) = key {
            if let Some(queue) = responses.get_mut(&k) {
                if queue.len() > 1 {
                    return queue.pop_front();
                }
                return queue.front().cloned();
            }
        }

        let default = self.default_response.lock().unwrap();
        default.clone()
    }

    async fn resolve(response: MockResponse) -> Result<StreamingResponse, HttpError> {
        let mut response = response;
        loop {
            match response {
                MockResponse::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    response = *inner;
                }
                MockResponse::Pending => return futures::future::pending().await,
                MockResponse::Error(err) => return Err(err),
                MockResponse::Stream {
                    status,
                    headers,
                    chunks,
                } => {
                    return Ok(StreamingResponse {
                        status,
                        status_text: String::new(),
                        headers,
                        body: futures::stream::iter(chunks.into_iter().map(Ok)).boxed(),
                    });
                }
                MockResponse::Stall { chunks } => {
                    let body = futures::stream::iter(chunks.into_iter().map(Ok))
                        .chain(futures::stream::pending());
                    return Ok(StreamingResponse {
                        status: 200,
                        status_text: String::new(),
                        headers: Headers::new(),
                        body: body.boxed(),
                    });
                }
                MockResponse::StreamError { chunks, error } => {
                    let body = futures::stream::iter(
                        chunks
                            .into_iter()
                            .map(Ok)
                            .chain(std::iter::once(Err(error))),
                    );
                    return Ok(StreamingResponse {
                        status: 200,
                        status_text: String::new(),
                        headers: Headers::new(),
                        body: body.boxed(),
                    });
                }
            }
        }
    }
}

impl Default for MockHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn send(&self, request: &HttpRequest) -> Result<StreamingResponse, HttpError> {
        self.record_request(request);

        match self.next_response(&request.url) {
            Some(response) => Self::resolve(response).await,
            None => Err(HttpError::Other(format!(
                "No mock response for URL: {}",
                request.url
            ))),
        }
    }
}
