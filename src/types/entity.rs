// Format-agnostic entity tree produced by the normalizer

use serde::{Deserialize, Serialize};
use std::fmt;

use super::issue::Issue;

/// Name given to entities whose type cannot be determined.
pub const UNKNOWN_TYPE_NAME: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceFormat {
    JsonLd,
    Microdata,
    Rdfa,
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::JsonLd => write!(f, "JSON-LD"),
            SourceFormat::Microdata => write!(f, "Microdata"),
            SourceFormat::Rdfa => write!(f, "RDFa"),
        }
    }
}

/// Where an entity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRef {
    pub index: usize,
    pub format: SourceFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeSource {
    /// Declared through `@type`, `itemtype` or `typeof`
    Declared,
    /// Inferred from the expected range of the parent property
    Implied,
    Missing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Text(String),
    Number(serde_json::Number),
    Boolean(bool),
    Entity(Box<EntityNode>),
    List(Vec<PropertyValue>),
}

impl PropertyValue {
    /// Empty strings and empty lists count as absent.
    pub fn is_empty(&self) -> bool {
        match self {
            PropertyValue::Text(text) => text.trim().is_empty(),
            PropertyValue::List(items) => items.iter().all(PropertyValue::is_empty),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&EntityNode> {
        match self {
            PropertyValue::Entity(node) => Some(node),
            _ => None,
        }
    }

    /// Short human-readable rendering used in issue messages.
    pub fn describe(&self) -> String {
        match self {
            PropertyValue::Text(text) => {
                let trimmed: String = text.chars().take(60).collect();
                if trimmed.len() < text.len() {
                    format!("'{trimmed}…'")
                } else {
                    format!("'{trimmed}'")
                }
            }
            PropertyValue::Number(number) => number.to_string(),
            PropertyValue::Boolean(flag) => flag.to_string(),
            PropertyValue::Entity(node) => format!("a {} entity", node.declared_type()),
            PropertyValue::List(items) => format!("a list of {} values", items.len()),
        }
    }

    /// Merge a repeated property occurrence into this value.
    pub fn append(self, other: PropertyValue) -> PropertyValue {
        match (self, other) {
            (PropertyValue::List(mut items), PropertyValue::List(more)) => {
                items.extend(more);
                PropertyValue::List(items)
            }
            (PropertyValue::List(mut items), single) => {
                items.push(single);
                PropertyValue::List(items)
            }
            (single, PropertyValue::List(mut more)) => {
                more.insert(0, single);
                PropertyValue::List(more)
            }
            (first, second) => PropertyValue::List(vec![first, second]),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub value: PropertyValue,
}

/// A typed node of structured data. Property names are unique within a node
/// and kept in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityNode {
    pub types: Vec<String>,
    pub type_source: TypeSource,
    pub id: Option<String>,
    pub properties: Vec<Property>,
    pub source: CandidateRef,
    /// Structural problems found while normalizing this node
    pub diagnostics: Vec<Issue>,
    /// Stands for an `@id` already expanded elsewhere in the same tree
    pub reference: bool,
}

impl EntityNode {
    pub fn new(types: Vec<String>, source: CandidateRef) -> Self {
        let type_source = if types.is_empty() {
            TypeSource::Missing
        } else {
            TypeSource::Declared
        };
        Self {
            types,
            type_source,
            id: None,
            properties: Vec::new(),
            source,
            diagnostics: Vec::new(),
            reference: false,
        }
    }

    /// A bare pointer to an entity described elsewhere in the tree. Carries
    /// the target's types so range compatibility can still be checked.
    pub fn reference_to(id: impl Into<String>, types: Vec<String>, source: CandidateRef) -> Self {
        let mut node = Self::new(types, source);
        node.id = Some(id.into());
        node.reference = true;
        node
    }

    /// Synthetic node standing in for a block that could not be parsed.
    pub fn unparseable(source: CandidateRef, issue: Issue) -> Self {
        let mut node = Self::new(vec![UNKNOWN_TYPE_NAME.to_string()], source);
        node.diagnostics.push(issue);
        node
    }

    pub fn declared_type(&self) -> &str {
        self.types
            .first()
            .map(String::as_str)
            .unwrap_or(UNKNOWN_TYPE_NAME)
    }

    pub fn is_unparseable(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|issue| issue.code == super::issue::IssueCode::UnparseableSchemaBlock)
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties
            .iter()
            .find(|property| property.name == name)
            .map(|property| &property.value)
    }

    /// Present with a non-empty value.
    pub fn has_property(&self, name: &str) -> bool {
        self.get(name).is_some_and(|value| !value.is_empty())
    }

    /// Insert a property, folding repeated names into a list.
    pub fn push_property(&mut self, name: impl Into<String>, value: PropertyValue) {
        let name = name.into();
        if let Some(existing) = self.properties.iter_mut().find(|p| p.name == name) {
            let previous = std::mem::replace(&mut existing.value, PropertyValue::List(Vec::new()));
            existing.value = previous.append(value);
        } else {
            self.properties.push(Property { name, value });
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        self.push_property(name, value);
        self
    }
}
