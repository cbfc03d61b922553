// Text-level scan for <script type="application/ld+json"> blocks

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

static SCRIPT_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<script\b[^>]*>").expect("script open pattern is valid"));

static SCRIPT_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</script\s*>").expect("script close pattern is valid"));

static LD_JSON_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\stype\s*=\s*["']?\s*application/ld\+json"#)
        .expect("ld+json type pattern is valid")
});

/// One JSON-LD block as found in the markup.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonLdBlock {
    /// Span of the whole script element (to end of input when unterminated)
    pub byte_range: Range<usize>,
    pub body: String,
    pub parseable: bool,
}

/// Lazily walks the script elements of a document, yielding only JSON-LD ones.
pub struct JsonLdScanner<'a> {
    html: &'a str,
    cursor: usize,
    masked: Vec<Range<usize>>,
}

impl<'a> JsonLdScanner<'a> {
    /// `masked` holds spans (HTML comments) whose scripts are ignored.
    pub fn new(html: &'a str, masked: Vec<Range<usize>>) -> Self {
        Self {
            html,
            cursor: 0,
            masked,
        }
    }

    fn is_masked(&self, offset: usize) -> bool {
        self.masked.iter().any(|range| range.contains(&offset))
    }
}

impl Iterator for JsonLdScanner<'_> {
    type Item = JsonLdBlock;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.cursor >= self.html.len() {
                return None;
            }
            let open = SCRIPT_OPEN.find_at(self.html, self.cursor)?;
            if self.is_masked(open.start()) {
                self.cursor = open.end();
                continue;
            }

            let is_json_ld = LD_JSON_TYPE.is_match(open.as_str());
            let body_start = open.end();

            let (body, element_end, terminated) =
                match SCRIPT_CLOSE.find_at(self.html, body_start) {
                    Some(close) => (&self.html[body_start..close.start()], close.end(), true),
                    None => (&self.html[body_start..], self.html.len(), false),
                };
            self.cursor = element_end;

            if !is_json_ld {
                continue;
            }

            let body = strip_wrappers(body);
            let parseable = terminated
                && !body.is_empty()
                && serde_json::from_str::<serde_json::Value>(body).is_ok();

            return Some(JsonLdBlock {
                byte_range: open.start()..element_end,
                body: body.to_string(),
                parseable,
            });
        }
    }
}

/// Remove the comment and CDATA guards some CMSs wrap around script bodies.
pub fn strip_wrappers(body: &str) -> &str {
    let mut text = body.trim();
    for (open, close) in [
        ("<!--", "-->"),
        ("//<![CDATA[", "//]]>"),
        ("/*<![CDATA[*/", "/*]]>*/"),
        ("<![CDATA[", "]]>"),
    ] {
        if let Some(inner) = text
            .strip_prefix(open)
            .and_then(|rest| rest.strip_suffix(close))
        {
            text = inner.trim();
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(html: &str) -> Vec<JsonLdBlock> {
        JsonLdScanner::new(html, Vec::new()).collect()
    }

    #[test]
    fn test_finds_blocks_in_order() {
        let html = r#"<html><head>
            <script type="application/ld+json">{"@type":"Organization"}</script>
            <script src="app.js"></script>
            <SCRIPT TYPE='application/ld+json'>{"@type":"WebSite"}</SCRIPT>
        </head></html>"#;
        let blocks = scan(html);
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].body.contains("Organization"));
        assert!(blocks[1].body.contains("WebSite"));
        assert!(blocks[0].byte_range.start < blocks[1].byte_range.start);
        assert!(blocks.iter().all(|b| b.parseable));
    }

    #[test]
    fn test_truncated_block_is_kept_unparseable() {
        let html = r#"<script type="application/ld+json">{"@type": "Product", "name": "#;
        let blocks = scan(html);
        assert_eq!(blocks.len(), 1);
        assert!(!blocks[0].parseable);
        assert_eq!(blocks[0].byte_range.end, html.len());
    }

    #[test]
    fn test_invalid_json_is_unparseable() {
        let blocks = scan(r#"<script type="application/ld+json">{"@type": Product}</script>"#);
        assert_eq!(blocks.len(), 1);
        assert!(!blocks[0].parseable);
    }

    #[test]
    fn test_comment_and_cdata_wrappers() {
        assert_eq!(strip_wrappers("  <!-- {\"a\":1} -->  "), "{\"a\":1}");
        assert_eq!(strip_wrappers("//<![CDATA[\n{}\n//]]>"), "{}");
    }

    #[test]
    fn test_type_attribute_must_stand_alone() {
        let html = r#"<script data-type="application/ld+json">{"@type":"Event"}</script>
            <script
                type="application/ld+json">{"@type":"Place"}</script>"#;
        let blocks = scan(html);
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].body.contains("Place"));
    }

    #[test]
    fn test_masked_scripts_are_skipped() {
        let html = r#"<!-- <script type="application/ld+json">{}</script> -->"#;
        assert_eq!(JsonLdScanner::new(html, vec![0..html.len()]).count(), 0);
    }
}
