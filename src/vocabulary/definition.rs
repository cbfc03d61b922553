// Vocabulary type definitions and the snapshot wire format

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SchemaMarkupError};

/// One accepted kind of value for a property.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RangeKind {
    Text,
    Number,
    Integer,
    Boolean,
    Url,
    Date,
    DateTime,
    Time,
    Duration,
    /// A nested entity of this type (or a subtype)
    Entity(String),
}

impl RangeKind {
    pub fn parse(name: &str) -> Self {
        match name {
            "Text" => RangeKind::Text,
            "Number" | "Float" => RangeKind::Number,
            "Integer" => RangeKind::Integer,
            "Boolean" => RangeKind::Boolean,
            "URL" => RangeKind::Url,
            "Date" => RangeKind::Date,
            "DateTime" => RangeKind::DateTime,
            "Time" => RangeKind::Time,
            "Duration" => RangeKind::Duration,
            other => RangeKind::Entity(other.to_string()),
        }
    }

    pub fn is_entity(&self) -> bool {
        matches!(self, RangeKind::Entity(_))
    }
}

impl fmt::Display for RangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeKind::Text => write!(f, "Text"),
            RangeKind::Number => write!(f, "Number"),
            RangeKind::Integer => write!(f, "Integer"),
            RangeKind::Boolean => write!(f, "Boolean"),
            RangeKind::Url => write!(f, "URL"),
            RangeKind::Date => write!(f, "Date"),
            RangeKind::DateTime => write!(f, "DateTime"),
            RangeKind::Time => write!(f, "Time"),
            RangeKind::Duration => write!(f, "Duration"),
            RangeKind::Entity(name) => write!(f, "{name}"),
        }
    }
}

/// The expected value shape of a property: any one of `kinds` is acceptable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRange {
    pub kinds: Vec<RangeKind>,
}

impl PropertyRange {
    pub fn new(kinds: Vec<RangeKind>) -> Self {
        Self { kinds }
    }

    pub fn accepts_text(&self) -> bool {
        self.kinds.contains(&RangeKind::Text)
    }

    pub fn entity_types(&self) -> impl Iterator<Item = &str> {
        self.kinds.iter().filter_map(|kind| match kind {
            RangeKind::Entity(name) => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn has_entity_kinds(&self) -> bool {
        self.kinds.iter().any(RangeKind::is_entity)
    }

    pub fn has_data_kinds(&self) -> bool {
        self.kinds.iter().any(|kind| !kind.is_entity())
    }
}

impl fmt::Display for PropertyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.kinds.iter().map(ToString::to_string).collect();
        write!(f, "{}", names.join(" or "))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyShape {
    pub name: String,
    pub range: PropertyRange,
}

impl PropertyShape {
    /// Parse the compact `name:RangeA|RangeB` declaration used by snapshots.
    pub fn parse(declaration: &str) -> Result<Self> {
        let (name, ranges) = declaration.split_once(':').ok_or_else(|| {
            SchemaMarkupError::vocabulary(format!(
                "property declaration '{declaration}' is missing a range"
            ))
        })?;
        let name = name.trim();
        let kinds: Vec<RangeKind> = ranges
            .split('|')
            .map(str::trim)
            .filter(|kind| !kind.is_empty())
            .map(RangeKind::parse)
            .collect();

        if name.is_empty() || kinds.is_empty() {
            return Err(SchemaMarkupError::vocabulary(format!(
                "malformed property declaration '{declaration}'"
            )));
        }

        Ok(Self {
            name: name.to_string(),
            range: PropertyRange::new(kinds),
        })
    }
}

/// A vocabulary type as declared, before inheritance is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyType {
    pub name: String,
    pub parent_types: Vec<String>,
    pub required_properties: Vec<String>,
    pub recommended_properties: Vec<String>,
    /// Inherited requirements this type drops (e.g. `AggregateOffer` drops `price`)
    pub relaxed_properties: Vec<String>,
    pub property_shapes: Vec<PropertyShape>,
}

impl VocabularyType {
    pub fn declares(&self, property: &str) -> bool {
        self.property_shapes.iter().any(|shape| shape.name == property)
    }

    pub fn shape(&self, property: &str) -> Option<&PropertyShape> {
        self.property_shapes
            .iter()
            .find(|shape| shape.name == property)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct VocabularySnapshot {
    pub version: String,
    #[serde(default)]
    pub global: Vec<String>,
    pub types: Vec<SnapshotType>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SnapshotType {
    pub name: String,
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub recommended: Vec<String>,
    #[serde(default)]
    pub relaxed: Vec<String>,
    #[serde(default)]
    pub properties: Vec<String>,
}

impl SnapshotType {
    pub fn into_vocabulary_type(self) -> Result<VocabularyType> {
        let property_shapes = self
            .properties
            .iter()
            .map(|declaration| PropertyShape::parse(declaration))
            .collect::<Result<Vec<_>>>()?;

        Ok(VocabularyType {
            name: self.name,
            parent_types: self.parents,
            required_properties: self.required,
            recommended_properties: self.recommended,
            relaxed_properties: self.relaxed,
            property_shapes,
        })
    }
}
