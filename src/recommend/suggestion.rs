// Suggested JSON-LD with placeholders for missing and invalid values

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashSet;

use crate::types::{EntityNode, Issue, IssueCode, PropertyValue, TypeSource};
use crate::vocabulary::{PropertyRange, RangeKind, VocabularyRegistry};

pub const PLACEHOLDER_PREFIX: &str = "PLACEHOLDER: ";
const PLACEHOLDER_URL_BASE: &str = "https://example.com/placeholder/";
const MAX_PLACEHOLDER_DEPTH: usize = 4;

/// A corrected JSON-LD rendering of an entity. `placeholders` lists every
/// path whose value was invented rather than taken from the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedSchema {
    pub json_ld: Value,
    pub placeholders: Vec<String>,
}

pub(super) struct SuggestionBuilder<'r> {
    registry: &'r VocabularyRegistry,
    max_depth: usize,
    invalid_paths: HashSet<String>,
    placeholders: Vec<String>,
}

impl<'r> SuggestionBuilder<'r> {
    pub fn new(registry: &'r VocabularyRegistry, max_depth: usize, issues: &[Issue]) -> Self {
        let invalid_paths = issues
            .iter()
            .filter(|issue| issue.code == IssueCode::InvalidValueFormat)
            .filter_map(|issue| issue.affected_property.clone())
            .collect();
        Self {
            registry,
            max_depth,
            invalid_paths,
            placeholders: Vec::new(),
        }
    }

    pub fn build(mut self, node: &EntityNode) -> SuggestedSchema {
        let mut document = Map::new();
        document.insert("@context".to_string(), json!("https://schema.org"));
        let body = self.entity(node, "", 0);
        document.extend(body);
        SuggestedSchema {
            json_ld: Value::Object(document),
            placeholders: self.placeholders,
        }
    }

    fn entity(&mut self, node: &EntityNode, path: &str, depth: usize) -> Map<String, Value> {
        let mut object = Map::new();
        if let (true, Some(id)) = (node.reference, &node.id) {
            object.insert("@id".to_string(), json!(id));
            return object;
        }
        if node.type_source == TypeSource::Declared {
            let types = match node.types.as_slice() {
                [single] => json!(single),
                many => json!(many),
            };
            object.insert("@type".to_string(), types);
        }
        if let Some(id) = &node.id {
            object.insert("@id".to_string(), json!(id));
        }

        let constraints = self.registry.constraints_for_types(&node.types);

        for property in &node.properties {
            let property_path = join(path, &property.name);
            let range = self.registry.shape_for(&constraints, &property.name).cloned();
            let value = self.value(
                &property.name,
                range.as_ref(),
                &property.value,
                &property_path,
                depth,
            );
            object.insert(property.name.clone(), value);
        }

        let missing = constraints
            .required
            .iter()
            .chain(&constraints.recommended)
            .filter(|name| !node.has_property(name));
        for name in missing {
            let range = self.registry.shape_for(&constraints, name).cloned();
            let property_path = join(path, name);
            let value = self.placeholder(name, range.as_ref(), depth);
            self.placeholders.push(property_path);
            object.insert(name.clone(), value);
        }

        object
    }

    fn value(
        &mut self,
        name: &str,
        range: Option<&PropertyRange>,
        value: &PropertyValue,
        path: &str,
        depth: usize,
    ) -> Value {
        if self.invalid_paths.contains(path) {
            self.placeholders.push(path.to_string());
            return self.placeholder(name, range, depth);
        }
        match value {
            PropertyValue::Text(text) => json!(text),
            PropertyValue::Number(number) => Value::Number(number.clone()),
            PropertyValue::Boolean(flag) => json!(flag),
            PropertyValue::Entity(nested) => Value::Object(self.entity(nested, path, depth + 1)),
            PropertyValue::List(items) => Value::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(position, item)| {
                        let item_path = format!("{path}[{position}]");
                        self.value(name, range, item, &item_path, depth)
                    })
                    .collect(),
            ),
        }
    }

    /// A clearly marked value that satisfies `range`.
    fn placeholder(&self, name: &str, range: Option<&PropertyRange>, depth: usize) -> Value {
        let Some(range) = range else {
            return text_placeholder(name);
        };
        if range.accepts_text() {
            return text_placeholder(name);
        }
        match range.kinds.first() {
            Some(RangeKind::Entity(type_name)) => self.entity_placeholder(type_name, name, depth + 1),
            Some(kind) => data_placeholder(kind, name),
            None => text_placeholder(name),
        }
    }

    fn entity_placeholder(&self, type_name: &str, name: &str, depth: usize) -> Value {
        // Out of room: a URL is an acceptable reference for any entity range.
        if depth > self.max_depth || depth > MAX_PLACEHOLDER_DEPTH {
            return json!(format!("{PLACEHOLDER_URL_BASE}{name}"));
        }

        let mut object = Map::new();
        object.insert("@type".to_string(), json!(type_name));
        let Some(constraints) = self.registry.constraints(type_name) else {
            return Value::Object(object);
        };

        if constraints.required.is_empty() && constraints.declares("name") {
            object.insert("name".to_string(), text_placeholder("name"));
        }
        for required in &constraints.required {
            let range = self.registry.shape_for(&constraints, required);
            object.insert(required.clone(), self.placeholder(required, range, depth));
        }
        Value::Object(object)
    }
}

fn text_placeholder(name: &str) -> Value {
    json!(format!("{PLACEHOLDER_PREFIX}{name}"))
}

fn data_placeholder(kind: &RangeKind, name: &str) -> Value {
    match kind {
        RangeKind::Number => json!(0),
        RangeKind::Integer => json!(1),
        RangeKind::Boolean => json!(false),
        RangeKind::Url => json!(format!("{PLACEHOLDER_URL_BASE}{name}")),
        RangeKind::Date => json!("2000-01-01"),
        RangeKind::DateTime => json!("2000-01-01T00:00:00Z"),
        RangeKind::Time => json!("00:00:00"),
        RangeKind::Duration => json!("PT0S"),
        RangeKind::Text | RangeKind::Entity(_) => text_placeholder(name),
    }
}

fn join(path: &str, segment: &str) -> String {
    if path.is_empty() {
        segment.to_string()
    } else {
        format!("{path}.{segment}")
    }
}
