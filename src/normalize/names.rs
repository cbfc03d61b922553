// Canonical names for types and properties

use serde_json::Value;

const SCHEMA_PREFIXES: &[&str] = &[
    "https://schema.org/",
    "http://schema.org/",
    "https://www.schema.org/",
    "http://www.schema.org/",
    "schema:",
];

/// `https://schema.org/Product`, `schema:Product` and `Product` all become `Product`.
/// Names from other vocabularies are kept as written.
pub fn canonical_name(raw: &str) -> String {
    let trimmed = raw.trim();
    for prefix in SCHEMA_PREFIXES {
        if let Some(rest) = strip_prefix_ignore_case(trimmed, prefix) {
            return rest.trim_end_matches('/').to_string();
        }
    }
    trimmed.to_string()
}

/// Split a whitespace-separated attribute (`itemtype`, `typeof`, `itemprop`)
/// into canonical names.
pub fn split_names(raw: &str) -> Vec<String> {
    raw.split_whitespace()
        .map(canonical_name)
        .filter(|name| !name.is_empty())
        .collect()
}

/// Resolve an RDFa term against the `vocab` in effect.
pub fn resolve_rdfa_term(term: &str, vocab: Option<&str>) -> String {
    let term = term.trim();
    if term.contains(':') {
        return canonical_name(term);
    }
    match vocab {
        Some(vocab) if !is_schema_iri(vocab) => format!("{vocab}{term}"),
        _ => term.to_string(),
    }
}

pub fn is_schema_iri(value: &str) -> bool {
    let lowered = value.trim().to_ascii_lowercase();
    SCHEMA_PREFIXES[..4]
        .iter()
        .any(|prefix| lowered.starts_with(prefix.trim_end_matches('/')))
}

/// Whether a JSON-LD `@context` value points at schema.org.
pub fn is_schema_context(context: &Value) -> bool {
    match context {
        Value::String(iri) => is_schema_iri(iri),
        Value::Array(items) => items.iter().any(is_schema_context),
        Value::Object(map) => map
            .get("@vocab")
            .and_then(Value::as_str)
            .is_some_and(is_schema_iri),
        _ => false,
    }
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        value.get(prefix.len()..)
    } else {
        None
    }
}
