//! The analysis pipeline.
//!
//! `Extractor -> Normalizer -> Validator -> Recommender -> ReportAssembler`,
//! run sequentially per request. Requests share nothing but the read-only
//! vocabulary registry, so one [`Analyzer`] can serve many concurrent calls.

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;
use url::Url;

use crate::core::AnalyzerConfig;
use crate::error::{
    Result, STAGE_ASSEMBLE, STAGE_EXTRACT, STAGE_FETCH, STAGE_NORMALIZE, STAGE_VALIDATE,
    SchemaMarkupError,
};
use crate::extract::Extractor;
use crate::fetch::{PageFetcher, is_textual_content_type};
use crate::normalize::Normalizer;
use crate::recommend::Recommender;
use crate::report::{AnalysisReport, ReportAssembler, ValidationResult};
use crate::validation::Validator;
use crate::vocabulary::VocabularyRegistry;

/// What to analyze: markup (or bare JSON-LD) directly, or a page to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisInput {
    Html(String),
    Url(String),
}

impl AnalysisInput {
    pub fn html(content: impl Into<String>) -> Self {
        Self::Html(content.into())
    }

    pub fn url(url: impl Into<String>) -> Self {
        Self::Url(url.into())
    }
}

/// Wire form of an analysis request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    /// `"html"` or `"url"`
    pub input_type: String,
    pub input_data: String,
}

impl TryFrom<AnalysisRequest> for AnalysisInput {
    type Error = SchemaMarkupError;

    fn try_from(request: AnalysisRequest) -> Result<Self> {
        match request.input_type.to_ascii_lowercase().as_str() {
            "html" => Ok(AnalysisInput::Html(request.input_data)),
            "url" => Ok(AnalysisInput::Url(request.input_data)),
            other => Err(SchemaMarkupError::malformed_input(format!(
                "input type must be 'html' or 'url', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Shared cancellation signal. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    inner: Arc<CancelState>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once `cancel` has been called.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    fn checkpoint(&self, stage: &str) -> Result<()> {
        if self.is_cancelled() {
            tracing::debug!("Analysis cancelled during {}", stage);
            Err(SchemaMarkupError::cancelled(stage))
        } else {
            Ok(())
        }
    }
}

pub struct Analyzer {
    registry: Arc<VocabularyRegistry>,
    config: AnalyzerConfig,
    extractor: Extractor,
    normalizer: Normalizer,
    validator: Validator,
    recommender: Recommender,
    fetcher: Option<Arc<dyn PageFetcher>>,
}

impl Analyzer {
    /// Analyzer over the embedded vocabulary snapshot.
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        Self::with_registry(VocabularyRegistry::embedded()?, config)
    }

    pub fn with_registry(registry: Arc<VocabularyRegistry>, config: AnalyzerConfig) -> Result<Self> {
        config.validate()?;

        #[cfg(feature = "http-fetch")]
        let fetcher: Option<Arc<dyn PageFetcher>> =
            Some(Arc::new(crate::fetch::HttpFetcher::new(&config.fetch)?));
        #[cfg(not(feature = "http-fetch"))]
        let fetcher: Option<Arc<dyn PageFetcher>> = None;

        Ok(Self {
            extractor: Extractor::new(),
            normalizer: Normalizer::new(registry.clone(), &config),
            validator: Validator::new(registry.clone(), &config),
            recommender: Recommender::new(registry.clone(), &config),
            registry,
            config,
            fetcher,
        })
    }

    /// Replace the page fetcher used for URL input.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn PageFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<VocabularyRegistry> {
        &self.registry
    }

    /// Analyze markup already in hand.
    pub fn analyze_html(&self, html: &str) -> Result<AnalysisReport> {
        self.run_pipeline(html, &CancelFlag::new())
    }

    pub async fn analyze(&self, input: &AnalysisInput) -> Result<AnalysisReport> {
        self.analyze_with_cancel(input, &CancelFlag::new()).await
    }

    /// Like [`Analyzer::analyze`], but gives up with `Cancelled` as soon as
    /// `cancel` is observed. A cancelled analysis never returns partial results.
    pub async fn analyze_with_cancel(
        &self,
        input: &AnalysisInput,
        cancel: &CancelFlag,
    ) -> Result<AnalysisReport> {
        match input {
            AnalysisInput::Html(html) => self.run_pipeline(html, cancel),
            AnalysisInput::Url(url) => {
                let body = self.fetch(url, cancel).await?;
                self.run_pipeline(&body, cancel)
            }
        }
    }

    /// Analyze many inputs concurrently; results come back in input order.
    pub async fn analyze_batch(&self, inputs: Vec<AnalysisInput>) -> Vec<Result<AnalysisReport>> {
        let limit = self.config.max_concurrent_analyses.max(1);
        tracing::info!("Analyzing batch of {} inputs ({} at a time)", inputs.len(), limit);
        stream::iter(inputs)
            .map(|input| async move { self.analyze(&input).await })
            .buffered(limit)
            .collect()
            .await
    }

    async fn fetch(&self, raw_url: &str, cancel: &CancelFlag) -> Result<String> {
        cancel.checkpoint(STAGE_FETCH)?;
        let url = parse_page_url(raw_url)?;
        let fetcher = self.fetcher.as_ref().ok_or_else(|| {
            SchemaMarkupError::fetch_failed(url.as_str(), "no page fetcher is configured")
        })?;

        let timeout = self.config.fetch.timeout;
        let page = tokio::select! {
            outcome = tokio::time::timeout(timeout, fetcher.fetch(&url)) => match outcome {
                Ok(page) => page?,
                Err(_) => {
                    tracing::warn!("Fetching {} timed out after {:?}", url, timeout);
                    return Err(SchemaMarkupError::fetch_failed(
                        url.as_str(),
                        format!("timed out after {timeout:?}"),
                    ));
                }
            },
            _ = cancel.cancelled() => return Err(SchemaMarkupError::cancelled(STAGE_FETCH)),
        };

        if let Some(content_type) = &page.content_type {
            if !is_textual_content_type(content_type) {
                return Err(SchemaMarkupError::unsupported_format(format!(
                    "{url} returned {content_type}, which cannot contain structured data"
                )));
            }
        }
        Ok(page.body)
    }

    fn run_pipeline(&self, input: &str, cancel: &CancelFlag) -> Result<AnalysisReport> {
        self.check_input(input)?;
        cancel.checkpoint(STAGE_EXTRACT)?;

        let mut assembler = ReportAssembler::new();
        for candidate in self.extractor.extract(input) {
            cancel.checkpoint(STAGE_NORMALIZE)?;
            assembler.record_candidate(&candidate);

            for node in self.normalizer.normalize(&candidate) {
                cancel.checkpoint(STAGE_VALIDATE)?;
                let issues = self.validator.validate(&node);
                let recommendations = self.recommender.recommend(&node, &issues);
                assembler.push(ValidationResult::new(
                    &node,
                    &candidate,
                    issues,
                    recommendations,
                ));
            }
        }

        cancel.checkpoint(STAGE_ASSEMBLE)?;
        Ok(assembler.finish())
    }

    fn check_input(&self, input: &str) -> Result<()> {
        if input.trim().is_empty() {
            return Err(SchemaMarkupError::malformed_input("input is empty"));
        }
        if input.len() > self.config.max_input_bytes {
            return Err(SchemaMarkupError::malformed_input(format!(
                "input is {} bytes, the limit is {}",
                input.len(),
                self.config.max_input_bytes
            )));
        }
        Ok(())
    }
}

fn parse_page_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|err| SchemaMarkupError::malformed_input(format!("invalid URL '{raw}': {err}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(SchemaMarkupError::malformed_input(format!(
            "unsupported URL scheme '{scheme}', expected http or https"
        ))),
    }
}

/// Analyze one input with the default configuration and return the
/// per-entity results in document order.
pub async fn analyze(input: &AnalysisInput) -> Result<Vec<ValidationResult>> {
    let analyzer = Analyzer::new(AnalyzerConfig::default())?;
    Ok(analyzer.analyze(input).await?.results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_conversion() {
        let request = AnalysisRequest {
            input_type: "URL".to_string(),
            input_data: "https://acme.test".to_string(),
        };
        assert_eq!(
            AnalysisInput::try_from(request).unwrap(),
            AnalysisInput::url("https://acme.test")
        );

        let request = AnalysisRequest {
            input_type: "pdf".to_string(),
            input_data: String::new(),
        };
        assert!(matches!(
            AnalysisInput::try_from(request),
            Err(SchemaMarkupError::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_request_wire_format() {
        let request: AnalysisRequest =
            serde_json::from_str(r#"{"inputType": "html", "inputData": "<p></p>"}"#).unwrap();
        assert_eq!(request.input_type, "html");
    }

    #[test]
    fn test_page_urls() {
        assert!(parse_page_url("https://acme.test/page").is_ok());
        assert!(parse_page_url("ftp://acme.test/file").is_err());
        assert!(parse_page_url("not a url").is_err());
    }

    #[tokio::test]
    async fn test_cancel_flag_wakes_waiters() {
        let flag = CancelFlag::new();
        let waiter = flag.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });
        flag.cancel();
        handle.await.unwrap();
        assert!(flag.is_cancelled());
    }
}
