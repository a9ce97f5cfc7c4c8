//! Main client implementation.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use url::Url;

use crate::api::{ConversationsApi, PlaybooksApi};
use crate::error::{Error, Result};
use crate::stream::{self, ResponseStream, StreamRequest};

/// Default timeout for establishing a connection.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for streaming requests.
const DEFAULT_STREAM_TIMEOUT: Duration = Duration::from_secs(300);

/// Path prefix for versioned API routes.
const API_PREFIX: &str = "v1";

/// Environment variable holding the server base URL.
pub const BASE_URL_ENV: &str = "PALAVER_BASE_URL";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "PALAVER_API_KEY";

/// Palaver API client.
///
/// Cheap to clone; clones share one connection pool.
///
/// # Example
///
/// ```no_run
/// use palaver_client::PalaverClient;
///
/// # async fn example() -> palaver_client::Result<()> {
/// let client = PalaverClient::builder()
///     .base_url("http://localhost:8080")
///     .api_key("secret")
///     .build()?;
///
/// let stream = client.conversations().stream_message("conv-1", "Hi").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PalaverClient {
    inner: Arc<ClientInner>,
}

/// Inner client state (shared across clones).
struct ClientInner {
    /// HTTP client carrying the default headers.
    http: reqwest::Client,
    /// Base URL for API requests.
    base_url: Url,
    /// Connection timeout.
    connect_timeout: Duration,
    /// Streaming timeout.
    stream_timeout: Duration,
}

impl PalaverClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a client configured from `PALAVER_BASE_URL` and `PALAVER_API_KEY`.
    pub fn from_env() -> Result<Self> {
        ClientBuilder::from_env().build()
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Timeout for establishing a connection.
    pub fn connect_timeout(&self) -> Duration {
        self.inner.connect_timeout
    }

    /// Timeout applied to a whole streaming response.
    pub fn stream_timeout(&self) -> Duration {
        self.inner.stream_timeout
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Access the conversations API.
    pub fn conversations(&self) -> ConversationsApi {
        ConversationsApi::new(self.clone())
    }

    /// Access the playbooks API.
    pub fn playbooks(&self) -> PlaybooksApi {
        PlaybooksApi::new(self.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Streaming
    // ─────────────────────────────────────────────────────────────────────────

    /// Build a URL for an API path.
    pub fn url(&self, path: &str) -> Result<Url> {
        let path = path.trim_start_matches('/');
        self.inner
            .base_url
            .join(&format!("{}/{}", API_PREFIX, path))
            .map_err(Error::from)
    }

    /// Build a URL from path segments, percent-encoding each one.
    pub(crate) fn resource_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config("base_url cannot be a base".to_string()))?
            .pop_if_empty()
            .push(API_PREFIX)
            .extend(segments);
        Ok(url)
    }

    /// Open an event stream for an arbitrary request.
    ///
    /// The client's authorization header and streaming timeout are applied.
    pub async fn open_stream(&self, request: StreamRequest) -> Result<ResponseStream> {
        let bytes = stream::transport::open(
            &self.inner.http,
            request,
            Some(self.inner.stream_timeout),
        )
        .await?;
        Ok(stream::decode(bytes))
    }

    /// POST a JSON body and decode the event-stream response.
    pub(crate) async fn post_stream<B>(&self, url: Url, body: &B) -> Result<ResponseStream>
    where
        B: serde::Serialize + ?Sized,
    {
        self.open_stream(StreamRequest::post(url).json(body)?).await
    }
}

/// Builder for creating a PalaverClient.
#[derive(Debug)]
pub struct ClientBuilder {
    base_url: Option<String>,
    api_key: Option<String>,
    connect_timeout: Duration,
    stream_timeout: Duration,
    user_agent: Option<String>,
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            base_url: None,
            api_key: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            stream_timeout: DEFAULT_STREAM_TIMEOUT,
            user_agent: None,
        }
    }

    /// Create a builder seeded from `PALAVER_BASE_URL` and `PALAVER_API_KEY`.
    ///
    /// Later builder calls override the environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            base_url: non_empty(BASE_URL_ENV),
            api_key: non_empty(API_KEY_ENV),
            ..Self::new()
        }
    }

    /// Set the base URL for the server.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the API key sent as a bearer credential.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the streaming request timeout.
    pub fn stream_timeout(mut self, timeout: Duration) -> Self {
        self.stream_timeout = timeout;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<PalaverClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::Config("base_url is required".to_string()))?;

        // Parse and normalize base URL
        let mut base_url = Url::parse(&base_url)?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(key) = &self.api_key {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|_| Error::Config("Invalid API key".to_string()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("palaver-client/{}", env!("CARGO_PKG_VERSION")));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(user_agent)
            .connect_timeout(self.connect_timeout)
            .build()?;

        tracing::debug!(base_url = %base_url, "Built Palaver client");

        Ok(PalaverClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                connect_timeout: self.connect_timeout,
                stream_timeout: self.stream_timeout,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
