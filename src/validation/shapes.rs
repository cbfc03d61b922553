// Value-shape checks for schema.org data kinds

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{EntityNode, PropertyValue};
use crate::vocabulary::{PropertyRange, RangeKind, VocabularyRegistry};

static ISO_DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^P(\d+(\.\d+)?Y)?(\d+(\.\d+)?M)?(\d+(\.\d+)?W)?(\d+(\.\d+)?D)?(T(\d+(\.\d+)?H)?(\d+(\.\d+)?M)?(\d+(\.\d+)?S)?)?$",
    )
    .expect("duration pattern is valid")
});

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M:%S%.f", "%H:%M"];

/// How a single (non-list) value fits a property range.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeCheck {
    Accepted,
    /// The value is not any of the accepted kinds
    Invalid,
    /// A nested entity of a known type outside the expected entity types
    UnexpectedEntity { found: String },
}

pub fn check_value(
    registry: &VocabularyRegistry,
    range: &PropertyRange,
    value: &PropertyValue,
) -> ShapeCheck {
    let accepted = match value {
        PropertyValue::Text(text) => range.kinds.iter().any(|kind| text_matches(kind, text)),
        PropertyValue::Number(number) => range.kinds.iter().any(|kind| match kind {
            RangeKind::Text | RangeKind::Number => true,
            RangeKind::Integer => number.is_i64() || number.is_u64(),
            _ => false,
        }),
        PropertyValue::Boolean(_) => range
            .kinds
            .iter()
            .any(|kind| matches!(kind, RangeKind::Boolean | RangeKind::Text)),
        PropertyValue::Entity(node) => return check_entity(registry, range, node),
        PropertyValue::List(_) => true,
    };
    if accepted {
        ShapeCheck::Accepted
    } else {
        ShapeCheck::Invalid
    }
}

fn check_entity(
    registry: &VocabularyRegistry,
    range: &PropertyRange,
    node: &EntityNode,
) -> ShapeCheck {
    if !range.has_entity_kinds() {
        return ShapeCheck::Invalid;
    }

    let known: Vec<&String> = node
        .types
        .iter()
        .filter(|name| registry.contains(name))
        .collect();
    if known.is_empty() {
        return ShapeCheck::Accepted;
    }

    let compatible = known.iter().any(|name| {
        range
            .entity_types()
            .any(|expected| registry.is_subtype_of(name, expected))
    });
    if compatible {
        ShapeCheck::Accepted
    } else {
        ShapeCheck::UnexpectedEntity {
            found: node.declared_type().to_string(),
        }
    }
}

pub fn text_matches(kind: &RangeKind, text: &str) -> bool {
    let text = text.trim();
    match kind {
        RangeKind::Text => true,
        RangeKind::Number => text.parse::<f64>().is_ok_and(f64::is_finite),
        RangeKind::Integer => text.parse::<i64>().is_ok(),
        RangeKind::Boolean => is_boolean(text),
        RangeKind::Url => is_url(text),
        RangeKind::Date => NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok(),
        RangeKind::DateTime => is_datetime(text),
        RangeKind::Time => is_time(text),
        RangeKind::Duration => is_duration(text),
        // A reference to an entity described elsewhere
        RangeKind::Entity(_) => is_absolute_url(text),
    }
}

fn is_boolean(text: &str) -> bool {
    if text.eq_ignore_ascii_case("true") || text.eq_ignore_ascii_case("false") {
        return true;
    }
    matches!(
        text.trim_end_matches('/'),
        "https://schema.org/True"
            | "https://schema.org/False"
            | "http://schema.org/True"
            | "http://schema.org/False"
    )
}

fn is_absolute_url(text: &str) -> bool {
    url::Url::parse(text).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

/// Absolute http(s) URLs and document-relative references.
pub fn is_url(text: &str) -> bool {
    if text.is_empty() || text.chars().any(char::is_whitespace) {
        return false;
    }
    if ["/", "./", "../", "#"]
        .iter()
        .any(|prefix| text.starts_with(prefix))
    {
        return true;
    }
    is_absolute_url(text)
}

pub fn is_datetime(text: &str) -> bool {
    if DateTime::parse_from_rfc3339(text).is_ok() {
        return true;
    }
    if DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M%:z").is_ok() {
        return true;
    }
    let naive = text.strip_suffix('Z').unwrap_or(text);
    DATETIME_FORMATS
        .iter()
        .any(|format| NaiveDateTime::parse_from_str(naive, format).is_ok())
}

pub fn is_time(text: &str) -> bool {
    let local = strip_offset(text);
    TIME_FORMATS
        .iter()
        .any(|format| NaiveTime::parse_from_str(local, format).is_ok())
}

fn strip_offset(text: &str) -> &str {
    if let Some(stripped) = text.strip_suffix('Z') {
        return stripped;
    }
    // "+hh:mm" / "-hh:mm" after a time of at least "hh:mm"
    let split = text.len().saturating_sub(6);
    match (text.get(..split), text.get(split..)) {
        (Some(head), Some(tail)) if split > 0 => {
            let bytes = tail.as_bytes();
            if matches!(bytes[0], b'+' | b'-') && bytes[3] == b':' {
                head
            } else {
                text
            }
        }
        _ => text,
    }
}

pub fn is_duration(text: &str) -> bool {
    if !ISO_DURATION.is_match(text) || text == "P" || text.ends_with('T') {
        return false;
    }
    text.chars().any(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers() {
        assert!(text_matches(&RangeKind::Number, "19.99"));
        assert!(text_matches(&RangeKind::Number, " 20 "));
        assert!(!text_matches(&RangeKind::Number, "nineteen"));
        assert!(!text_matches(&RangeKind::Number, "NaN"));
        assert!(!text_matches(&RangeKind::Number, "$19.99"));
        assert!(text_matches(&RangeKind::Integer, "3"));
        assert!(!text_matches(&RangeKind::Integer, "3.5"));
    }

    #[test]
    fn test_urls() {
        assert!(is_url("https://acme.test"));
        assert!(is_url("/images/logo.png"));
        assert!(is_url("#main"));
        assert!(!is_url("acme dot test"));
        assert!(!is_url("ftp://files.test/x"));
        assert!(!is_url(""));
    }

    #[test]
    fn test_dates_and_times() {
        assert!(text_matches(&RangeKind::Date, "2024-02-29"));
        assert!(!text_matches(&RangeKind::Date, "2023-02-29"));
        assert!(!text_matches(&RangeKind::Date, "yesterday"));
        assert!(is_datetime("2024-05-01T10:00:00Z"));
        assert!(is_datetime("2024-05-01T10:00:00+02:00"));
        assert!(is_datetime("2024-05-01T10:00"));
        assert!(is_datetime("2024-05-01T10:00+02:00"));
        assert!(!is_datetime("2024-05-01"));
        assert!(is_time("09:30"));
        assert!(is_time("09:30:00Z"));
        assert!(is_time("09:30:00-05:00"));
        assert!(!is_time("9.30am"));
    }

    #[test]
    fn test_durations() {
        assert!(is_duration("PT1H30M"));
        assert!(is_duration("P1DT2H"));
        assert!(is_duration("PT0S"));
        assert!(!is_duration("P"));
        assert!(!is_duration("PT"));
        assert!(!is_duration("P1DT"));
        assert!(!is_duration("90 minutes"));
    }

    #[test]
    fn test_booleans() {
        assert!(is_boolean("True"));
        assert!(is_boolean("https://schema.org/False"));
        assert!(!is_boolean("yes"));
    }

    #[test]
    fn test_entity_compatibility() {
        let registry = VocabularyRegistry::embedded().unwrap();
        let range = PropertyRange::new(vec![
            RangeKind::Entity("Organization".to_string()),
            RangeKind::Text,
        ]);
        let source = crate::types::CandidateRef {
            index: 0,
            format: crate::types::SourceFormat::JsonLd,
        };

        let store = EntityNode::new(vec!["Store".to_string()], source);
        let value = PropertyValue::Entity(Box::new(store));
        assert_eq!(check_value(&registry, &range, &value), ShapeCheck::Accepted);

        let person = EntityNode::new(vec!["Person".to_string()], source);
        let value = PropertyValue::Entity(Box::new(person));
        assert_eq!(
            check_value(&registry, &range, &value),
            ShapeCheck::UnexpectedEntity {
                found: "Person".to_string()
            }
        );

        let custom = EntityNode::new(vec!["MyThing".to_string()], source);
        let value = PropertyValue::Entity(Box::new(custom));
        assert_eq!(check_value(&registry, &range, &value), ShapeCheck::Accepted);
    }
}
