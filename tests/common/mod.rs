use async_trait::async_trait;
use schema_markup::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

#[allow(dead_code)]
pub const PRODUCT_WITH_BAD_PRICE: &str =
    r#"{"@context":"https://schema.org","@type":"Product","offers":{"price":"nineteen"}}"#;

#[allow(dead_code)]
pub const ORGANIZATION: &str =
    r#"{"@context":"https://schema.org","@type":"Organization","name":"Acme","url":"https://acme.test"}"#;

#[allow(dead_code)]
pub const UNKNOWN_TYPE: &str = r#"{"@type":"FooBarBaz"}"#;

#[allow(dead_code)]
pub fn analyzer() -> Analyzer {
    Analyzer::new(AnalyzerConfig::default()).unwrap()
}

#[allow(dead_code)]
pub fn analyzer_with(config: AnalyzerConfig) -> Analyzer {
    Analyzer::new(config).unwrap()
}

/// Wrap JSON-LD bodies in script elements of a minimal page.
#[allow(dead_code)]
pub fn page_with_json_ld(blocks: &[&str]) -> String {
    let scripts: String = blocks
        .iter()
        .map(|block| format!("<script type=\"application/ld+json\">{block}</script>\n"))
        .collect();
    format!("<!DOCTYPE html><html><head><title>Test</title>\n{scripts}</head><body><p>Hello</p></body></html>")
}

#[allow(dead_code)]
pub fn mixed_format_page() -> String {
    r#"<!DOCTYPE html>
<html>
<head>
  <script type="application/ld+json">
    {"@context": "https://schema.org", "@type": "WebSite", "name": "Acme", "url": "https://acme.test"}
  </script>
</head>
<body>
  <div itemscope itemtype="https://schema.org/Product">
    <h1 itemprop="name">Super Widget</h1>
    <div itemprop="offers" itemscope itemtype="https://schema.org/Offer">
      <meta itemprop="priceCurrency" content="USD">
      <span itemprop="price">19.99</span>
    </div>
  </div>
  <div vocab="https://schema.org/" typeof="Person">
    <span property="name">Ada Lovelace</span>
    <span property="jobTitle">Engineer</span>
  </div>
</body>
</html>"#
        .to_string()
}

#[allow(dead_code)]
pub fn error_count(result: &ValidationResult) -> usize {
    result.count(IssueLevel::Error)
}

#[allow(dead_code)]
pub fn codes(result: &ValidationResult) -> Vec<IssueCode> {
    result.issues.iter().map(|issue| issue.code).collect()
}

/// Serves canned pages; no network.
#[allow(dead_code)]
pub struct MockFetcher {
    pub content_type: Option<String>,
    pub body: String,
    pub delay: Option<Duration>,
    pub failure: Option<String>,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl MockFetcher {
    pub fn html(body: impl Into<String>) -> Self {
        Self {
            content_type: Some("text/html; charset=utf-8".to_string()),
            body: body.into(),
            delay: None,
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing(message: &str) -> Self {
        let mut fetcher = Self::html("");
        fetcher.failure = Some(message.to_string());
        fetcher
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.failure {
            return Err(SchemaMarkupError::fetch_failed(url.as_str(), message.as_str()));
        }
        Ok(FetchedPage {
            url: url.to_string(),
            content_type: self.content_type.clone(),
            body: self.body.clone(),
        })
    }
}
