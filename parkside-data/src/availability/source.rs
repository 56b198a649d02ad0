//! Feed sources for the availability pipeline.
//!
//! [`FeedSource`] is synchronous so the updater can run inside a plain store
//! transaction. [`HttpFeedSource`] bridges to `reqwest` by blocking on a
//! Tokio runtime it owns.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use parkside_data::availability::{FeedSource, HttpFeedSource, HttpFeedSourceConfig};
//!
//! let config = HttpFeedSourceConfig::new(
//!     "https://api.data.gov.sg/v1/transport/carpark-availability",
//! )
//! .with_timeout(Duration::from_secs(10));
//! let source = HttpFeedSource::with_config(config)?;
//! let feed = source.fetch()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};
use url::Url;

use super::feed::AvailabilityFeed;
use super::retry::RetryPolicy;

/// Errors raised while fetching the feed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    /// The request did not complete within the configured timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Requested URL.
        url: String,
        /// Configured timeout in seconds.
        timeout_secs: u64,
    },
    /// The service answered with a non-success status.
    #[error("request to {url} failed with status {status}: {message}")]
    HttpError {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Error description.
        message: String,
    },
    /// The connection failed before a response arrived.
    #[error("network error contacting {url}: {message}")]
    NetworkError {
        /// Requested URL.
        url: String,
        /// Error description.
        message: String,
    },
    /// The body could not be decoded as feed JSON.
    #[error("failed to decode feed: {message}")]
    ParseError {
        /// Decoder message.
        message: String,
    },
}

/// Supplies availability snapshots.
pub trait FeedSource {
    /// Fetch the current feed.
    ///
    /// `Ok(None)` means the service answered without a payload.
    fn fetch(&self) -> Result<Option<AvailabilityFeed>, FeedError>;
}

impl<T: FeedSource + ?Sized> FeedSource for &T {
    fn fetch(&self) -> Result<Option<AvailabilityFeed>, FeedError> {
        (**self).fetch()
    }
}

/// Error type for [`HttpFeedSource`] construction failures.
#[derive(Debug)]
pub enum SourceBuildError {
    /// The feed URL did not parse.
    InvalidUrl(url::ParseError),
    /// Failed to build the HTTP client.
    HttpClient(reqwest::Error),
    /// Failed to build the Tokio runtime.
    Runtime(std::io::Error),
}

impl std::fmt::Display for SourceBuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidUrl(err) => write!(f, "invalid feed URL: {err}"),
            Self::HttpClient(err) => write!(f, "failed to build HTTP client: {err}"),
            Self::Runtime(err) => write!(f, "failed to build Tokio runtime: {err}"),
        }
    }
}

impl std::error::Error for SourceBuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidUrl(err) => Some(err),
            Self::HttpClient(err) => Some(err),
            Self::Runtime(err) => Some(err),
        }
    }
}

/// Public carpark availability endpoint.
pub const DEFAULT_FEED_URL: &str = "https://api.data.gov.sg/v1/transport/carpark-availability";

/// Default user agent for feed requests.
pub const DEFAULT_USER_AGENT: &str = "parkside-availability/0.1";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for [`HttpFeedSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpFeedSourceConfig {
    /// Feed endpoint.
    pub url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
    /// Backoff applied to transient failures.
    pub retry: RetryPolicy,
}

impl Default for HttpFeedSourceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FEED_URL.to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            retry: RetryPolicy::default(),
        }
    }
}

impl HttpFeedSourceConfig {
    /// Create a configuration for the given endpoint.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub const fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Availability feed fetched over HTTP.
///
/// # Runtime behaviour
///
/// Outside any Tokio runtime the source blocks on its own stored runtime.
/// Inside a multi-threaded runtime it reuses the caller's handle through
/// [`tokio::task::block_in_place`]. Inside a `current_thread` runtime the
/// calling thread cannot block, so the stored runtime is driven from a
/// scoped worker thread instead.
pub struct HttpFeedSource {
    client: Client,
    url: Url,
    config: HttpFeedSourceConfig,
    runtime: Runtime,
}

impl std::fmt::Debug for HttpFeedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFeedSource")
            .field("client", &self.client)
            .field("config", &self.config)
            .field("runtime", &"<tokio::runtime::Runtime>")
            .finish_non_exhaustive()
    }
}

impl HttpFeedSource {
    /// Create a source for `url` with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client or Tokio
    /// runtime fails to build.
    pub fn new(url: impl Into<String>) -> Result<Self, SourceBuildError> {
        Self::with_config(HttpFeedSourceConfig::new(url))
    }

    /// Create a source with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client or Tokio
    /// runtime fails to build.
    pub fn with_config(config: HttpFeedSourceConfig) -> Result<Self, SourceBuildError> {
        let url = Url::parse(&config.url).map_err(SourceBuildError::InvalidUrl)?;
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(SourceBuildError::HttpClient)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(SourceBuildError::Runtime)?;
        Ok(Self {
            client,
            url,
            config,
            runtime,
        })
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &HttpFeedSourceConfig {
        &self.config
    }

    async fn fetch_once(&self) -> Result<Option<AvailabilityFeed>, FeedError> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err))?
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(&err))?;
        let body = response
            .bytes()
            .await
            .map_err(|err| self.convert_reqwest_error(&err))?;
        decode_feed(&body)
    }

    fn convert_reqwest_error(&self, error: &reqwest::Error) -> FeedError {
        let url = self.url.to_string();
        if error.is_timeout() {
            return FeedError::Timeout {
                url,
                timeout_secs: self.config.timeout.as_secs(),
            };
        }
        if let Some(status) = error.status() {
            return FeedError::HttpError {
                url,
                status: status.as_u16(),
                message: error.to_string(),
            };
        }
        if error.is_body() || error.is_decode() {
            return FeedError::ParseError {
                message: error.to_string(),
            };
        }
        FeedError::NetworkError {
            url,
            message: error.to_string(),
        }
    }
}

/// Decode a response body; `null` or an empty body is no payload.
fn decode_feed(body: &[u8]) -> Result<Option<AvailabilityFeed>, FeedError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice::<Option<AvailabilityFeed>>(body).map_err(|err| FeedError::ParseError {
        message: err.to_string(),
    })
}

impl FeedSource for HttpFeedSource {
    fn fetch(&self) -> Result<Option<AvailabilityFeed>, FeedError> {
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                let future = self.config.retry.run(|| self.fetch_once());
                tokio::task::block_in_place(|| handle.block_on(future))
            }
            Ok(_) => self.fetch_on_worker(),
            Err(_) => self.block_on_owned(),
        }
    }
}

impl HttpFeedSource {
    fn block_on_owned(&self) -> Result<Option<AvailabilityFeed>, FeedError> {
        self.runtime
            .block_on(self.config.retry.run(|| self.fetch_once()))
    }

    fn fetch_on_worker(&self) -> Result<Option<AvailabilityFeed>, FeedError> {
        std::thread::scope(|scope| {
            scope
                .spawn(|| self.block_on_owned())
                .join()
                .unwrap_or_else(|_| {
                    Err(FeedError::NetworkError {
                        url: self.url.to_string(),
                        message: "feed worker thread panicked".to_owned(),
                    })
                })
        })
    }
}
