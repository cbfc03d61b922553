//! Candidate extraction.
//!
//! The extractor finds every block of structured data in a document and hands
//! it on as a [`RawCandidate`], in document order. JSON-LD is located with a
//! text-level scan of `<script>` elements so truncated blocks survive;
//! Microdata and RDFa need the element tree because nesting decides which
//! items are top-level.

pub mod dom;
pub mod json_ld;

use serde::Serialize;
use std::iter::Peekable;
use std::ops::Range;
use std::vec;

use crate::types::SourceFormat;
use dom::DomItem;
use json_ld::JsonLdScanner;

/// A block of structured data as found in the input. Immutable once extracted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCandidate {
    /// Position in document order, starting at 0
    pub index: usize,
    pub source_format: SourceFormat,
    pub raw_text: String,
    pub byte_range: Range<usize>,
    pub parseable: bool,
    /// The whole input was this one JSON document rather than an HTML page
    pub standalone: bool,
    /// RDFa `vocab` declared on an enclosing element
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inherited_vocab: Option<String>,
}

impl RawCandidate {
    fn from_dom(index: usize, item: DomItem) -> Self {
        Self {
            index,
            source_format: item.format,
            raw_text: item.markup,
            byte_range: item.byte_range,
            parseable: true,
            standalone: false,
            inherited_vocab: item.inherited_vocab,
        }
    }

    fn from_json_ld(index: usize, block: json_ld::JsonLdBlock) -> Self {
        Self {
            index,
            source_format: SourceFormat::JsonLd,
            raw_text: block.body,
            byte_range: block.byte_range,
            parseable: block.parseable,
            standalone: false,
            inherited_vocab: None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Extractor;

impl Extractor {
    pub fn new() -> Self {
        Self
    }

    /// Lazily extract candidates from `input`.
    ///
    /// Input whose first non-blank character opens a JSON object or array is
    /// treated as one bare JSON-LD document.
    pub fn extract<'a>(&self, input: &'a str) -> Candidates<'a> {
        let trimmed = input.trim_start();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            let start = input.len() - trimmed.len();
            let body = trimmed.trim_end();
            let parseable = serde_json::from_str::<serde_json::Value>(body).is_ok();
            let candidate = RawCandidate {
                index: 0,
                source_format: SourceFormat::JsonLd,
                raw_text: body.to_string(),
                byte_range: start..start + body.len(),
                parseable,
                standalone: true,
                inherited_vocab: None,
            };
            return Candidates {
                source: CandidateSource::Bare(Some(candidate)),
                next_index: 1,
            };
        }

        Candidates {
            source: CandidateSource::Markup(MarkupScan::new(input)),
            next_index: 0,
        }
    }
}

/// Lazy, finite sequence of candidates in document order.
pub struct Candidates<'a> {
    source: CandidateSource<'a>,
    next_index: usize,
}

enum CandidateSource<'a> {
    Bare(Option<RawCandidate>),
    Markup(MarkupScan<'a>),
}

struct MarkupScan<'a> {
    html: &'a str,
    json_ld: Peekable<JsonLdScanner<'a>>,
    dom: Option<Peekable<vec::IntoIter<DomItem>>>,
}

impl<'a> MarkupScan<'a> {
    fn new(html: &'a str) -> Self {
        Self {
            html,
            json_ld: JsonLdScanner::new(html, dom::comment_spans(html)).peekable(),
            dom: None,
        }
    }

    fn dom_items(&mut self) -> &mut Peekable<vec::IntoIter<DomItem>> {
        let html = self.html;
        self.dom.get_or_insert_with(|| {
            let items = if dom::may_contain_items(html) {
                dom::scan_items(html)
            } else {
                Vec::new()
            };
            tracing::debug!("Found {} Microdata/RDFa items", items.len());
            items.into_iter().peekable()
        })
    }

    fn next_in_order(&mut self, index: usize) -> Option<RawCandidate> {
        let json_start = self.json_ld.peek().map(|block| block.byte_range.start);
        let dom_start = self.dom_items().peek().map(|item| item.byte_range.start);

        let take_json = match (json_start, dom_start) {
            (None, None) => return None,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (Some(json), Some(dom)) => json <= dom,
        };

        if take_json {
            let block = self.json_ld.next()?;
            Some(RawCandidate::from_json_ld(index, block))
        } else {
            let item = self.dom_items().next()?;
            Some(RawCandidate::from_dom(index, item))
        }
    }
}

impl Iterator for Candidates<'_> {
    type Item = RawCandidate;

    fn next(&mut self) -> Option<Self::Item> {
        let candidate = match &mut self.source {
            CandidateSource::Bare(candidate) => candidate.take(),
            CandidateSource::Markup(scan) => scan.next_in_order(self.next_index),
        }?;
        if let CandidateSource::Markup(_) = self.source {
            self.next_index += 1;
        }
        if !candidate.parseable {
            tracing::debug!(
                "Candidate {} ({}) is not parseable",
                candidate.index,
                candidate.source_format
            );
        }
        Some(candidate)
    }
}
