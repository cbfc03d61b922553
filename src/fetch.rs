//! Page retrieval for URL input.
//!
//! Fetching is delegated to a [`PageFetcher`] so the engine can be driven by
//! any HTTP stack (or a test double). The analyzer bounds every fetch with the
//! configured timeout, whatever the implementation does internally.

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use url::Url;

use crate::error::Result;
#[cfg(feature = "http-fetch")]
use crate::{core::FetchConfig, error::SchemaMarkupError};

/// A retrieved page, before any analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    pub url: String,
    pub content_type: Option<String>,
    pub body: String,
}

impl FetchedPage {
    pub fn html(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content_type: Some("text/html; charset=utf-8".to_string()),
            body: body.into(),
        }
    }
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Retrieve the page at `url`. Network and status failures are
    /// `FetchFailed`; a non-textual body is `UnsupportedFormat`.
    async fn fetch(&self, url: &Url) -> Result<FetchedPage>;
}

/// Text, HTML, XHTML and JSON bodies can carry structured data.
pub fn is_textual_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime.starts_with("text/")
        || mime == "application/json"
        || mime == "application/ld+json"
        || mime == "application/xhtml+xml"
        || mime.ends_with("+json")
        || mime.ends_with("+xml")
}

/// Collect a body stream, giving up with `None` as soon as it passes
/// `limit` bytes.
#[cfg_attr(not(feature = "http-fetch"), allow(dead_code))]
pub(crate) async fn read_capped<S, B, E>(
    stream: S,
    limit: usize,
) -> std::result::Result<Option<Vec<u8>>, E>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
{
    let mut stream = std::pin::pin!(stream);
    let mut body = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let chunk = chunk.as_ref();
        if body.len() + chunk.len() > limit {
            return Ok(None);
        }
        body.extend_from_slice(chunk);
    }
    Ok(Some(body))
}

/// `reqwest`-backed fetcher.
#[cfg(feature = "http-fetch")]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_body_bytes: usize,
}

#[cfg(feature = "http-fetch")]
impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|err| {
                SchemaMarkupError::configuration(format!("cannot build HTTP client: {err}"))
            })?;
        Ok(Self {
            client,
            max_body_bytes: config.max_body_bytes,
        })
    }
}

#[cfg(feature = "http-fetch")]
#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage> {
        tracing::debug!("Fetching {}", url);
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|err| SchemaMarkupError::fetch_failed(url.as_str(), err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SchemaMarkupError::fetch_failed(
                url.as_str(),
                format!("HTTP {status}"),
            ));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        if let Some(content_type) = &content_type {
            if !is_textual_content_type(content_type) {
                return Err(SchemaMarkupError::unsupported_format(format!(
                    "{url} returned {content_type}, which cannot contain structured data"
                )));
            }
        }

        if response
            .content_length()
            .is_some_and(|length| length as usize > self.max_body_bytes)
        {
            return Err(SchemaMarkupError::malformed_input(format!(
                "{url} is larger than {} bytes",
                self.max_body_bytes
            )));
        }

        let bytes = read_capped(response.bytes_stream(), self.max_body_bytes)
            .await
            .map_err(|err| SchemaMarkupError::fetch_failed(url.as_str(), err.to_string()))?
            .ok_or_else(|| {
                SchemaMarkupError::malformed_input(format!(
                    "{url} is larger than {} bytes",
                    self.max_body_bytes
                ))
            })?;

        tracing::info!("Fetched {} ({} bytes, HTTP {})", url, bytes.len(), status);
        Ok(FetchedPage {
            url: url.to_string(),
            content_type,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_textual_content_types() {
        assert!(is_textual_content_type("text/html; charset=UTF-8"));
        assert!(is_textual_content_type("application/ld+json"));
        assert!(is_textual_content_type("application/xhtml+xml"));
        assert!(!is_textual_content_type("image/png"));
        assert!(!is_textual_content_type("application/pdf"));
    }

    #[tokio::test]
    async fn test_body_reading_stops_at_the_cap() {
        let chunks = || (0..3).map(|_| Ok::<_, std::io::Error>(vec![b'a'; 4]));
        let body = read_capped(futures::stream::iter(chunks()), 12).await.unwrap();
        assert_eq!(body.map(|bytes| bytes.len()), Some(12));

        let mut pulled = 0;
        let counted = futures::stream::iter(chunks()).inspect(|_| pulled += 1);
        let body = read_capped(counted, 6).await.unwrap();
        assert!(body.is_none());
        assert_eq!(pulled, 2);
    }

    #[tokio::test]
    async fn test_body_stream_errors_propagate() {
        let chunks = vec![
            Ok(vec![b'a'; 2]),
            Err(std::io::Error::other("connection reset")),
        ];
        let result = read_capped(futures::stream::iter(chunks), 100).await;
        assert!(result.is_err());
    }

    #[cfg(feature = "http-fetch")]
    #[test]
    fn test_http_fetcher_builds_from_config() {
        let config = FetchConfig::default();
        assert!(HttpFetcher::new(&config).is_ok());
    }
}
