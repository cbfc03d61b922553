//! # Schema Markup
//!
//! A structured-data validation engine: it finds JSON-LD, Microdata and RDFa
//! in HTML (or takes bare JSON-LD), normalizes it into typed entity trees and
//! checks every entity against the schema.org vocabulary.
//!
//! ## Features
//!
//! - **Extraction**: JSON-LD, Microdata and RDFa in document order, malformed blocks included
//! - **Validation**: Required, recommended and value-shape checks with multiple inheritance
//! - **Recommendations**: One actionable recommendation per finding plus a corrected JSON-LD suggestion
//! - **URL input**: Time-bounded page fetching behind a pluggable fetcher
//! - **Batch analysis**: Concurrent requests sharing one read-only vocabulary registry
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use schema_markup::*;
//!
//! # async fn example() -> Result<()> {
//! let analyzer = Analyzer::new(AnalyzerConfig::default())?;
//! let input = AnalysisInput::html(
//!     r#"{"@context":"https://schema.org","@type":"Product","offers":{"price":"nineteen"}}"#,
//! );
//! let report = analyzer.analyze(&input).await?;
//!
//! for result in &report.results {
//!     println!("{} valid={}", result.entity_type, result.valid);
//!     for issue in &result.issues {
//!         println!("  {} {} {}", issue.level, issue.code, issue.message);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod core;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod normalize;
pub mod recommend;
pub mod report;
pub mod types;
pub mod validation;
pub mod vocabulary;

pub use analyzer::{AnalysisInput, AnalysisRequest, Analyzer, CancelFlag, analyze};
pub use crate::core::{AnalyzerConfig, FetchConfig};
pub use error::Result; // Our Result type takes precedence
pub use error::SchemaMarkupError;
pub use extract::{Extractor, RawCandidate};
#[cfg(feature = "http-fetch")]
pub use fetch::HttpFetcher;
pub use fetch::{FetchedPage, PageFetcher};
pub use normalize::Normalizer;
pub use recommend::{PLACEHOLDER_PREFIX, Recommendations, Recommender, SuggestedSchema};
pub use report::{AnalysisReport, FormatCounts, Notice, ReportSummary, ValidationResult};
pub use types::*;
pub use validation::{EntityCheck, ValidationContext, ValidationState, Validator};
pub use vocabulary::{
    PropertyRange, RangeKind, ResolvedConstraints, VocabularyRegistry, VocabularyType,
};
