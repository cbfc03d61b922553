// Tree-aware scan for Microdata and RDFa items

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::ops::Range;

use crate::types::SourceFormat;

static COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!--.*?(?:-->|\z)").expect("comment pattern is valid"));

/// Elements whose content never becomes part of the element tree.
static INERT_ELEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)<(script|style|textarea|noscript|template)\b[^>]*>.*?(?:</(?:script|style|textarea|noscript|template)\s*>|\z)",
    )
    .expect("inert element pattern is valid")
});

static START_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<([a-zA-Z][a-zA-Z0-9:-]*)((?:[^>"']|"[^"]*"|'[^']*')*)>"#)
        .expect("start tag pattern is valid")
});

static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
        .expect("attribute pattern is valid")
});

const INERT_ANCESTORS: &[&str] = &["noscript", "template"];

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// A top-level Microdata or RDFa item located in the document tree.
#[derive(Debug, Clone, PartialEq)]
pub struct DomItem {
    pub format: SourceFormat,
    /// Outer HTML of the item element
    pub markup: String,
    pub byte_range: Range<usize>,
    /// `vocab` in effect at the item, possibly declared on an ancestor
    pub inherited_vocab: Option<String>,
}

/// Spans of comments in the raw text.
pub fn comment_spans(html: &str) -> Vec<Range<usize>> {
    COMMENT.find_iter(html).map(|m| m.range()).collect()
}

/// Quick textual pre-check so pages without attribute markup skip DOM parsing.
pub fn may_contain_items(html: &str) -> bool {
    let lowered = html.to_ascii_lowercase();
    lowered.contains("itemscope") || lowered.contains("typeof")
}

/// Find every top-level item. Nested items stay inside their parent's markup.
pub fn scan_items(html: &str) -> Vec<DomItem> {
    let document = Html::parse_document(html);

    let mut masked = comment_spans(html);
    masked.extend(INERT_ELEMENT.find_iter(html).map(|m| m.range()));
    let tags = start_tags(html, &masked);

    let mut items = Vec::new();
    collect(html, &document, &tags, &masked, SourceFormat::Microdata, &mut items);
    collect(html, &document, &tags, &masked, SourceFormat::Rdfa, &mut items);
    items.sort_by_key(|item| item.byte_range.start);
    items
}

/// A start tag as written in the source, with its attributes decoded.
#[derive(Debug, Clone)]
struct SourceTag {
    range: Range<usize>,
    name: String,
    attributes: Vec<(String, String)>,
}

impl SourceTag {
    fn has(&self, attribute: &str) -> bool {
        self.attributes.iter().any(|(name, _)| name == attribute)
    }
}

/// Every start tag outside comments and inert elements, in source order.
fn start_tags(html: &str, masked: &[Range<usize>]) -> Vec<SourceTag> {
    START_TAG
        .captures_iter(html)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            if masked.iter().any(|span| span.contains(&whole.start())) {
                return None;
            }
            let name = caps.get(1)?.as_str().to_ascii_lowercase();
            let raw = caps.get(2).map_or("", |m| m.as_str());
            Some(SourceTag {
                range: whole.range(),
                name,
                attributes: parse_attributes(raw),
            })
        })
        .collect()
}

/// Attribute list of a start tag. The first occurrence of a name wins, as in
/// the HTML parser.
fn parse_attributes(raw: &str) -> Vec<(String, String)> {
    let mut attributes: Vec<(String, String)> = Vec::new();
    for caps in ATTRIBUTE.captures_iter(raw) {
        let Some(name) = caps.get(1) else { continue };
        let name = name.as_str().to_ascii_lowercase();
        if attributes.iter().any(|(seen, _)| *seen == name) {
            continue;
        }
        let value = (2..=4)
            .find_map(|group| caps.get(group))
            .map(|m| decode_entities(m.as_str()))
            .unwrap_or_default();
        attributes.push((name, value));
    }
    attributes
}

fn decode_entities(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

fn same_attributes(element: &ElementRef<'_>, tag: &SourceTag) -> bool {
    let mut parsed: Vec<(&str, &str)> = element.value().attrs().collect();
    let mut written: Vec<(&str, &str)> = tag
        .attributes
        .iter()
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .collect();
    parsed.sort_unstable();
    written.sort_unstable();
    parsed == written
}

fn collect(
    html: &str,
    document: &Html,
    tags: &[SourceTag],
    masked: &[Range<usize>],
    format: SourceFormat,
    items: &mut Vec<DomItem>,
) {
    let scope_attr = match format {
        SourceFormat::Rdfa => "typeof",
        _ => "itemscope",
    };
    let selector = match Selector::parse(&format!("[{scope_attr}]")) {
        Ok(selector) => selector,
        Err(err) => {
            tracing::warn!("Skipping {} scan: {:?}", format, err);
            return;
        }
    };

    let candidates: Vec<&SourceTag> = tags.iter().filter(|tag| tag.has(scope_attr)).collect();
    let mut consumed = vec![false; candidates.len()];

    for element in document.select(&selector) {
        if is_inert(&element) {
            continue;
        }
        // Tree order can differ from source order after foster parenting, so
        // pair by identical attributes first, then by the next unclaimed tag.
        let name = element.value().name();
        let open: Vec<usize> = (0..candidates.len())
            .filter(|&i| !consumed[i] && candidates[i].name == name)
            .collect();
        let position = open
            .iter()
            .copied()
            .find(|&i| same_attributes(&element, candidates[i]))
            .or_else(|| open.first().copied());
        if let Some(position) = position {
            consumed[position] = true;
        }

        if !is_top_level(&element, format) {
            continue;
        }
        let byte_range = match position.map(|i| candidates[i]) {
            Some(tag) => element_extent(html, tag.range.clone(), &tag.name, masked),
            None => html.len()..html.len(),
        };
        let inherited_vocab = match format {
            SourceFormat::Rdfa => nearest_vocab(&element),
            _ => None,
        };
        items.push(DomItem {
            format,
            markup: element.html(),
            byte_range,
            inherited_vocab,
        });
    }
}

/// An item is top-level unless it is the value of a property of an enclosing item.
fn is_top_level(element: &ElementRef<'_>, format: SourceFormat) -> bool {
    let (scope_attr, property_attr) = match format {
        SourceFormat::Rdfa => ("typeof", "property"),
        _ => ("itemscope", "itemprop"),
    };
    if element.value().attr(property_attr).is_none() {
        return true;
    }
    !element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| ancestor.value().attr(scope_attr).is_some())
}

fn is_inert(element: &ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| INERT_ANCESTORS.contains(&ancestor.value().name()))
}

fn nearest_vocab(element: &ElementRef<'_>) -> Option<String> {
    std::iter::once(*element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .find_map(|node| node.value().attr("vocab").map(str::to_string))
}

/// Span from the start tag to its matching end tag, counting nested
/// same-name elements. Unclosed elements run to the end of input.
fn element_extent(
    html: &str,
    start_tag: Range<usize>,
    tag_name: &str,
    masked: &[Range<usize>],
) -> Range<usize> {
    let self_closing = html[start_tag.clone()].trim_end_matches('>').ends_with('/');
    if self_closing || VOID_ELEMENTS.contains(&tag_name) {
        return start_tag;
    }

    let pattern = format!(r"(?i)<(/?){}\b[^>]*>", regex::escape(tag_name));
    let Ok(tags) = Regex::new(&pattern) else {
        return start_tag.start..html.len();
    };

    let mut depth = 1usize;
    for caps in tags.captures_iter(&html[start_tag.end..]) {
        let Some(whole) = caps.get(0) else { continue };
        let offset = start_tag.end + whole.start();
        if masked.iter().any(|span| span.contains(&offset)) {
            continue;
        }
        let closing = caps.get(1).is_some_and(|slash| !slash.as_str().is_empty());
        if closing {
            depth -= 1;
            if depth == 0 {
                return start_tag.start..start_tag.end + whole.end();
            }
        } else if !whole.as_str().trim_end_matches('>').ends_with('/') {
            depth += 1;
        }
    }
    start_tag.start..html.len()
}
