//! Candidate normalization.
//!
//! Turns each [`RawCandidate`] into zero or more [`EntityNode`] trees with
//! canonical type and property names, whatever the source format. Failures
//! never escape as errors: an unparseable candidate becomes a synthetic
//! `Unknown` node carrying an `UNPARSEABLE_SCHEMA_BLOCK` issue, and cycles or
//! runaway nesting are cut with a diagnostic on the node where they occur.

pub mod json_ld;
pub mod microdata;
pub mod names;
pub mod rdfa;

use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;

use crate::core::AnalyzerConfig;
use crate::extract::RawCandidate;
use crate::types::{CandidateRef, EntityNode, Issue, IssueCode, SourceFormat};
use crate::vocabulary::VocabularyRegistry;

pub struct Normalizer {
    registry: Arc<VocabularyRegistry>,
    max_depth: usize,
    max_entities: usize,
}

impl Normalizer {
    pub fn new(registry: Arc<VocabularyRegistry>, config: &AnalyzerConfig) -> Self {
        Self {
            registry,
            max_depth: config.max_depth,
            max_entities: config.max_entities,
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn normalize(&self, candidate: &RawCandidate) -> Vec<EntityNode> {
        let source = CandidateRef {
            index: candidate.index,
            format: candidate.source_format,
        };

        if !candidate.parseable {
            return vec![unparseable(
                source,
                format!(
                    "{} block {} could not be parsed",
                    candidate.source_format, candidate.index
                ),
            )];
        }

        let outcome = match candidate.source_format {
            SourceFormat::JsonLd => json_ld::normalize(self, candidate, source),
            SourceFormat::Microdata => microdata::normalize(self, candidate, source),
            SourceFormat::Rdfa => rdfa::normalize(self, candidate, source),
        };

        match outcome {
            Ok(nodes) => {
                tracing::debug!(
                    "Candidate {} normalized into {} entities",
                    candidate.index,
                    nodes.len()
                );
                nodes
            }
            Err(message) => {
                tracing::warn!("Candidate {} is malformed: {}", candidate.index, message);
                vec![unparseable(source, message)]
            }
        }
    }

    /// Type implied for an untyped nested value: the first entity type in the
    /// parent property's expected range.
    pub(crate) fn implied_type(&self, parent_types: &[String], property: &str) -> Option<String> {
        let from_types = parent_types.iter().find_map(|type_name| {
            let constraints = self.registry.constraints(type_name)?;
            let range = self.registry.shape_for(&constraints, property)?;
            range.entity_types().next().map(str::to_string)
        });
        from_types.or_else(|| {
            self.registry
                .global_shape(property)?
                .entity_types()
                .next()
                .map(str::to_string)
        })
    }

    pub(crate) fn entity_limit_reached(&self, built: usize) -> Option<Issue> {
        (built >= self.max_entities).then(|| {
            Issue::error(
                IssueCode::EntityLimitExceeded,
                format!(
                    "Block expands to more than {} entities, the rest is not followed",
                    self.max_entities
                ),
            )
        })
    }

    pub(crate) fn depth_exceeded(&self, depth: usize) -> Option<Issue> {
        (depth > self.max_depth).then(|| {
            Issue::error(
                IssueCode::MaxDepthExceeded,
                format!(
                    "Nesting deeper than {} levels is not followed",
                    self.max_depth
                ),
            )
        })
    }
}

fn unparseable(source: CandidateRef, message: String) -> EntityNode {
    EntityNode::unparseable(
        source,
        Issue::error(IssueCode::UnparseableSchemaBlock, message),
    )
}

/// Parse the outer HTML of an item and return its root element.
///
/// Elements that the HTML parser only accepts in a particular context
/// (`<body>`, table rows and cells) are re-parsed inside that context, so the
/// item survives as written.
pub(crate) fn parse_item(markup: &str) -> Html {
    let tag: String = markup
        .trim_start()
        .trim_start_matches('<')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();

    let (open, close) = match tag.as_str() {
        "html" | "head" | "body" => return Html::parse_document(markup),
        "tbody" | "thead" | "tfoot" | "caption" | "colgroup" => ("<table>", "</table>"),
        "tr" => ("<table><tbody>", "</tbody></table>"),
        "td" | "th" => ("<table><tbody><tr>", "</tr></tbody></table>"),
        "col" => ("<table><colgroup>", "</colgroup></table>"),
        _ => return Html::parse_fragment(markup),
    };
    Html::parse_fragment(&format!("{open}{markup}{close}"))
}

/// First element in `document` matching `selector`.
pub(crate) fn first_match<'d>(
    document: &'d Html,
    selector: &str,
) -> Result<Option<ElementRef<'d>>, String> {
    let selector = Selector::parse(selector).map_err(|err| format!("{err:?}"))?;
    Ok(document.select(&selector).next())
}

/// Text content of an element with runs of whitespace collapsed.
pub(crate) fn collapsed_text(element: &ElementRef<'_>) -> String {
    let text: String = element.text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Value carried by an element's own attributes, following the HTML
/// microdata value rules. `None` means the text content applies.
pub(crate) fn attribute_value(element: &ElementRef<'_>) -> Option<String> {
    let value = element.value();
    let attribute = match value.name() {
        "meta" => "content",
        "audio" | "embed" | "iframe" | "img" | "source" | "track" | "video" => "src",
        "a" | "area" | "link" => "href",
        "object" => "data",
        "data" | "meter" => "value",
        "time" => "datetime",
        _ => return None,
    };
    value.attr(attribute).map(|raw| raw.trim().to_string())
}
