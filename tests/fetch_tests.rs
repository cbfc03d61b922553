mod common;

use common::*;
use schema_markup::*;
use std::sync::Arc;
use std::time::Duration;

fn url_analyzer(fetcher: Arc<MockFetcher>, config: AnalyzerConfig) -> Analyzer {
    analyzer_with(config).with_fetcher(fetcher)
}

#[tokio::test]
async fn test_url_input_runs_full_pipeline() {
    let fetcher = MockFetcher::html(page_with_json_ld(&[ORGANIZATION])).into_arc();
    let analyzer = url_analyzer(fetcher.clone(), AnalyzerConfig::default());

    let report = analyzer
        .analyze(&AnalysisInput::url("https://acme.test/about"))
        .await
        .unwrap();

    assert_eq!(fetcher.calls(), 1);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].entity_type, "Organization");
    assert!(report.is_valid());
}

#[tokio::test]
async fn test_request_wire_form() {
    let fetcher = MockFetcher::html(page_with_json_ld(&[ORGANIZATION])).into_arc();
    let analyzer = url_analyzer(fetcher, AnalyzerConfig::default());

    let request: AnalysisRequest = serde_json::from_value(serde_json::json!({
        "inputType": "url",
        "inputData": "https://acme.test/"
    }))
    .unwrap();
    let input = AnalysisInput::try_from(request).unwrap();
    let report = analyzer.analyze(&input).await.unwrap();
    assert_eq!(report.results.len(), 1);
}

#[tokio::test]
async fn test_fetch_failure_is_an_error_not_an_issue() {
    let fetcher = MockFetcher::failing("connection refused").into_arc();
    let analyzer = url_analyzer(fetcher, AnalyzerConfig::default());

    let error = analyzer
        .analyze(&AnalysisInput::url("https://acme.test/"))
        .await
        .unwrap_err();
    assert!(error.is_fetch_failure());
    assert!(matches!(error, SchemaMarkupError::FetchFailed { ref url, .. } if url == "https://acme.test/"));
}

#[tokio::test(start_paused = true)]
async fn test_slow_fetch_times_out() {
    let fetcher = MockFetcher::html(page_with_json_ld(&[ORGANIZATION]))
        .with_delay(Duration::from_secs(120))
        .into_arc();
    let config = AnalyzerConfig::default()
        .with_fetch_config(FetchConfig::default().with_timeout(Duration::from_secs(5)));
    let analyzer = url_analyzer(fetcher, config);

    let error = analyzer
        .analyze(&AnalysisInput::url("https://acme.test/slow"))
        .await
        .unwrap_err();
    assert!(error.is_fetch_failure());
}

#[tokio::test]
async fn test_non_textual_content_is_unsupported() {
    let fetcher = MockFetcher::html("\u{89}PNG")
        .with_content_type("image/png")
        .into_arc();
    let analyzer = url_analyzer(fetcher, AnalyzerConfig::default());

    let error = analyzer
        .analyze(&AnalysisInput::url("https://acme.test/logo.png"))
        .await
        .unwrap_err();
    assert!(matches!(error, SchemaMarkupError::UnsupportedFormat { .. }));
}

#[tokio::test]
async fn test_invalid_urls_are_malformed_input() {
    let fetcher = MockFetcher::html("<html></html>").into_arc();
    let analyzer = url_analyzer(fetcher.clone(), AnalyzerConfig::default());

    for url in ["not a url", "ftp://acme.test/file", "file:///etc/hosts"] {
        let result = analyzer.analyze(&AnalysisInput::url(url)).await;
        assert!(
            matches!(result, Err(SchemaMarkupError::MalformedInput { .. })),
            "{url} was accepted"
        );
    }
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let analyzer = analyzer();
    let cancel = CancelFlag::new();
    cancel.cancel();

    let result = analyzer
        .analyze_with_cancel(&AnalysisInput::html(ORGANIZATION), &cancel)
        .await;
    assert!(matches!(result, Err(SchemaMarkupError::Cancelled { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_fetch() {
    let fetcher = MockFetcher::html(page_with_json_ld(&[ORGANIZATION]))
        .with_delay(Duration::from_secs(10))
        .into_arc();
    let analyzer = url_analyzer(fetcher, AnalyzerConfig::default());
    let cancel = CancelFlag::new();

    let trigger = cancel.clone();
    let canceller = async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    };
    let input = AnalysisInput::url("https://acme.test/");
    let (result, ()) = tokio::join!(
        analyzer.analyze_with_cancel(&input, &cancel),
        canceller
    );

    match result {
        Err(SchemaMarkupError::Cancelled { stage }) => assert_eq!(stage, "fetch"),
        other => panic!("expected cancellation, got {other:?}"),
    }
}

#[tokio::test]
async fn test_batch_keeps_input_order() {
    let fetcher = MockFetcher::html(page_with_json_ld(&[UNKNOWN_TYPE])).into_arc();
    let analyzer = url_analyzer(
        fetcher,
        AnalyzerConfig::default().with_max_concurrent_analyses(2),
    );

    let inputs = vec![
        AnalysisInput::html(PRODUCT_WITH_BAD_PRICE),
        AnalysisInput::url("https://acme.test/"),
        AnalysisInput::html(""),
        AnalysisInput::html(ORGANIZATION),
    ];
    let reports = analyzer.analyze_batch(inputs).await;

    assert_eq!(reports.len(), 4);
    assert_eq!(reports[0].as_ref().unwrap().results[0].entity_type, "Product");
    assert_eq!(reports[1].as_ref().unwrap().results[0].entity_type, "FooBarBaz");
    assert!(matches!(reports[2], Err(SchemaMarkupError::MalformedInput { .. })));
    assert_eq!(reports[3].as_ref().unwrap().results[0].entity_type, "Organization");
}

#[tokio::test]
async fn test_concurrent_analyses_share_the_registry() {
    let analyzer = Arc::new(analyzer());
    let mut handles = Vec::new();
    for _ in 0..8 {
        let analyzer = analyzer.clone();
        handles.push(tokio::spawn(async move {
            analyzer
                .analyze(&AnalysisInput::html(mixed_format_page()))
                .await
                .map(|report| serde_json::to_string(&report).unwrap())
        }));
    }

    let mut outputs = Vec::new();
    for handle in handles {
        outputs.push(handle.await.unwrap().unwrap());
    }
    assert!(outputs.windows(2).all(|pair| pair[0] == pair[1]));
}
