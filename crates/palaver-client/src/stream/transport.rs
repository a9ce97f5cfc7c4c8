//! Stream transport: opens one event-stream HTTP request.

use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_LENGTH};
use reqwest::{Method, StatusCode};
use url::Url;

use crate::error::{Error, Result};

/// Media type requested for streaming responses.
pub const EVENT_STREAM: &str = "text/event-stream";

/// Byte chunks of a streaming response body, in arrival order.
///
/// Dropping the stream releases the underlying connection.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// A request that expects an event-stream response.
#[derive(Debug, Clone)]
pub struct StreamRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<serde_json::Value>,
}

impl StreamRequest {
    /// Create a request with an explicit method.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Create a POST request.
    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    /// Add a header. `Accept` is always replaced with `text/event-stream`.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set a JSON body.
    pub fn json<B: serde::Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// The request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The target URL.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// Send `request` and return its body as a byte stream.
///
/// Fails with [`Error::RequestRejected`] on a non-success status (the body is
/// read eagerly) and with [`Error::NoResponseBody`] when a success response
/// has nothing to stream.
pub async fn open(
    http: &reqwest::Client,
    request: StreamRequest,
    timeout: Option<Duration>,
) -> Result<ByteStream> {
    let StreamRequest {
        method,
        url,
        mut headers,
        body,
    } = request;

    headers.insert(ACCEPT, HeaderValue::from_static(EVENT_STREAM));

    tracing::debug!(%method, %url, "Opening event stream");

    let mut builder = http.request(method, url).headers(headers);
    if let Some(body) = &body {
        builder = builder.json(body);
    }
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    let response = builder.send().await?;
    let status = response.status();

    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<unreadable body: {}>", e));
        tracing::debug!(status = status.as_u16(), "Event stream request rejected");
        return Err(Error::RequestRejected {
            status: status.as_u16(),
            body,
        });
    }

    if !has_body(status, response.headers()) {
        return Err(Error::NoResponseBody {
            status: status.as_u16(),
        });
    }

    Ok(Box::pin(response.bytes_stream().map(|chunk| {
        chunk.map_err(|e| Error::TransportInterrupted(e.to_string()))
    })))
}

fn has_body(status: StatusCode, headers: &HeaderMap) -> bool {
    if status == StatusCode::NO_CONTENT || status == StatusCode::RESET_CONTENT {
        return false;
    }
    let empty = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        == Some(0);
    !empty
}
