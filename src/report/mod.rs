//! Report assembly.
//!
//! One [`ValidationResult`] per top-level entity, aggregated across all
//! candidates in document order, plus page-level notices, recommendations and
//! a quality score.

use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::extract::RawCandidate;
use crate::recommend::{Recommendations, SuggestedSchema};
use crate::types::{EntityNode, Issue, IssueLevel, SourceFormat};

pub const NOTICE_UNSUPPORTED_FORMAT: &str = "UNSUPPORTED_FORMAT";

pub const RECOMMEND_ADD_MARKUP: &str = "Add schema markup to improve SEO";
pub const RECOMMEND_JSON_LD: &str = "Consider using JSON-LD format for better compatibility";

/// Outcome for one top-level entity. `valid` is true iff no issue is an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub entity_type: String,
    pub source_format: SourceFormat,
    /// Byte span of the candidate this entity came from
    pub source_range: Range<usize>,
    pub valid: bool,
    pub issues: Vec<Issue>,
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub suggested_schema: Option<SuggestedSchema>,
}

impl ValidationResult {
    pub fn new(
        node: &EntityNode,
        candidate: &RawCandidate,
        issues: Vec<Issue>,
        recommendations: Recommendations,
    ) -> Self {
        Self {
            entity_type: node.declared_type().to_string(),
            source_format: candidate.source_format,
            source_range: candidate.byte_range.clone(),
            valid: !issues.iter().any(Issue::is_error),
            issues,
            recommendations: recommendations.messages,
            suggested_schema: recommendations.suggested_schema,
        }
    }

    pub fn count(&self, level: IssueLevel) -> usize {
        self.issues.iter().filter(|issue| issue.level == level).count()
    }

    /// 100 minus 25 per error and 5 per warning, floored at 0.
    pub fn score(&self) -> u8 {
        let penalty = 25 * self.count(IssueLevel::Error) + 5 * self.count(IssueLevel::Warning);
        100usize.saturating_sub(penalty) as u8
    }
}

/// Page-level message that is not tied to an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatCounts {
    pub json_ld: usize,
    pub microdata: usize,
    pub rdfa: usize,
}

impl FormatCounts {
    fn record(&mut self, format: SourceFormat) {
        match format {
            SourceFormat::JsonLd => self.json_ld += 1,
            SourceFormat::Microdata => self.microdata += 1,
            SourceFormat::Rdfa => self.rdfa += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.json_ld + self.microdata + self.rdfa
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub entities: usize,
    pub valid_entities: usize,
    pub errors: usize,
    pub warnings: usize,
    pub info: usize,
    /// Mean of the per-entity scores; 0 when nothing was found
    pub score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub results: Vec<ValidationResult>,
    pub notices: Vec<Notice>,
    pub page_recommendations: Vec<String>,
    /// Candidates found per source format
    pub formats: FormatCounts,
    pub summary: ReportSummary,
}

impl AnalysisReport {
    pub fn is_valid(&self) -> bool {
        self.results.iter().all(|result| result.valid)
    }

    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Collects results in the order candidates are processed.
#[derive(Debug, Default)]
pub struct ReportAssembler {
    results: Vec<ValidationResult>,
    formats: FormatCounts,
}

impl ReportAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_candidate(&mut self, candidate: &RawCandidate) {
        self.formats.record(candidate.source_format);
    }

    pub fn push(&mut self, result: ValidationResult) {
        self.results.push(result);
    }

    pub fn finish(self) -> AnalysisReport {
        let results = self.results;
        let mut notices = Vec::new();
        let mut page_recommendations = Vec::new();

        if self.formats.total() == 0 {
            notices.push(Notice {
                code: NOTICE_UNSUPPORTED_FORMAT.to_string(),
                message: "No JSON-LD, Microdata or RDFa structured data was found".to_string(),
            });
            page_recommendations.push(RECOMMEND_ADD_MARKUP.to_string());
        }
        if self.formats.json_ld == 0 {
            page_recommendations.push(RECOMMEND_JSON_LD.to_string());
        }

        let summary = summarize(&results);
        tracing::info!(
            "Assembled report: {} entities, {} errors, {} warnings, score {}",
            summary.entities,
            summary.errors,
            summary.warnings,
            summary.score
        );

        AnalysisReport {
            results,
            notices,
            page_recommendations,
            formats: self.formats,
            summary,
        }
    }
}

fn summarize(results: &[ValidationResult]) -> ReportSummary {
    let mut summary = ReportSummary {
        entities: results.len(),
        ..ReportSummary::default()
    };
    let mut score_total = 0usize;
    for result in results {
        if result.valid {
            summary.valid_entities += 1;
        }
        summary.errors += result.count(IssueLevel::Error);
        summary.warnings += result.count(IssueLevel::Warning);
        summary.info += result.count(IssueLevel::Info);
        score_total += result.score() as usize;
    }
    if !results.is_empty() {
        summary.score = (score_total / results.len()) as u8;
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CandidateRef, IssueCode};

    fn candidate(format: SourceFormat) -> RawCandidate {
        RawCandidate {
            index: 0,
            source_format: format,
            raw_text: String::new(),
            byte_range: 0..10,
            parseable: true,
            standalone: false,
            inherited_vocab: None,
        }
    }

    fn result(issues: Vec<Issue>, format: SourceFormat) -> ValidationResult {
        let node = EntityNode::new(
            vec!["Thing".to_string()],
            CandidateRef { index: 0, format },
        );
        ValidationResult::new(&node, &candidate(format), issues, Recommendations::default())
    }

    #[test]
    fn test_valid_tracks_error_level() {
        let warning = Issue::warning(IssueCode::UnknownType, "w");
        let error = Issue::error(IssueCode::MissingRequiredProperty, "e");
        assert!(result(vec![warning.clone()], SourceFormat::JsonLd).valid);
        assert!(!result(vec![warning, error], SourceFormat::JsonLd).valid);
    }

    #[test]
    fn test_scores() {
        let issues = vec![
            Issue::error(IssueCode::MissingRequiredProperty, "e"),
            Issue::warning(IssueCode::MissingRecommendedProperty, "w"),
        ];
        assert_eq!(result(issues, SourceFormat::JsonLd).score(), 70);
        let many = vec![Issue::error(IssueCode::InvalidValueFormat, "e"); 5];
        assert_eq!(result(many, SourceFormat::JsonLd).score(), 0);
    }

    #[test]
    fn test_empty_page_gets_notice() {
        let report = ReportAssembler::new().finish();
        assert!(report.results.is_empty());
        assert_eq!(report.notices[0].code, NOTICE_UNSUPPORTED_FORMAT);
        assert_eq!(
            report.page_recommendations,
            vec![RECOMMEND_ADD_MARKUP.to_string(), RECOMMEND_JSON_LD.to_string()]
        );
        assert_eq!(report.summary.score, 0);
    }

    #[test]
    fn test_microdata_only_page_suggests_json_ld() {
        let mut assembler = ReportAssembler::new();
        assembler.record_candidate(&candidate(SourceFormat::Microdata));
        assembler.push(result(Vec::new(), SourceFormat::Microdata));
        let report = assembler.finish();
        assert!(report.notices.is_empty());
        assert_eq!(report.page_recommendations, vec![RECOMMEND_JSON_LD.to_string()]);
        assert_eq!(report.summary.score, 100);
        assert_eq!(report.formats.microdata, 1);
    }
}
