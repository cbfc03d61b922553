use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of an issue. The derived ordering (errors first) is the report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueLevel {
    Error,
    Warning,
    Info,
}

/// Stable, machine-readable issue identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    UnparseableSchemaBlock,
    CyclicReference,
    MaxDepthExceeded,
    EntityLimitExceeded,
    MissingRequiredProperty,
    InvalidValueFormat,
    UnknownType,
    MissingType,
    MissingContext,
    MissingRecommendedProperty,
    UnexpectedEntityType,
    UnknownProperty,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::UnparseableSchemaBlock => "UNPARSEABLE_SCHEMA_BLOCK",
            IssueCode::CyclicReference => "CYCLIC_REFERENCE",
            IssueCode::MaxDepthExceeded => "MAX_DEPTH_EXCEEDED",
            IssueCode::EntityLimitExceeded => "ENTITY_LIMIT_EXCEEDED",
            IssueCode::MissingRequiredProperty => "MISSING_REQUIRED_PROPERTY",
            IssueCode::InvalidValueFormat => "INVALID_VALUE_FORMAT",
            IssueCode::UnknownType => "UNKNOWN_TYPE",
            IssueCode::MissingType => "MISSING_TYPE",
            IssueCode::MissingContext => "MISSING_CONTEXT",
            IssueCode::MissingRecommendedProperty => "MISSING_RECOMMENDED_PROPERTY",
            IssueCode::UnexpectedEntityType => "UNEXPECTED_ENTITY_TYPE",
            IssueCode::UnknownProperty => "UNKNOWN_PROPERTY",
        }
    }

    /// Structural codes describe the markup itself, not the vocabulary fit.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            IssueCode::UnparseableSchemaBlock
                | IssueCode::CyclicReference
                | IssueCode::MaxDepthExceeded
                | IssueCode::EntityLimitExceeded
        )
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for IssueLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueLevel::Error => write!(f, "error"),
            IssueLevel::Warning => write!(f, "warning"),
            IssueLevel::Info => write!(f, "info"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub level: IssueLevel,
    pub code: IssueCode,
    pub message: String,
    /// Dotted path from the owning top-level entity, e.g. `offers.price` or `review[1].author`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected_property: Option<String>,
}

impl Issue {
    pub fn new(level: IssueLevel, code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            level,
            code,
            message: message.into(),
            affected_property: None,
        }
    }

    pub fn error(code: IssueCode, message: impl Into<String>) -> Self {
        Self::new(IssueLevel::Error, code, message)
    }

    pub fn warning(code: IssueCode, message: impl Into<String>) -> Self {
        Self::new(IssueLevel::Warning, code, message)
    }

    pub fn info(code: IssueCode, message: impl Into<String>) -> Self {
        Self::new(IssueLevel::Info, code, message)
    }

    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.affected_property = Some(property.into());
        self
    }

    /// Re-root the issue under a parent property segment.
    pub fn prefixed(mut self, segment: &str) -> Self {
        self.affected_property = Some(match self.affected_property.take() {
            Some(path) => format!("{segment}.{path}"),
            None => segment.to_string(),
        });
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == IssueLevel::Error
    }

    /// The first segment of the affected path, without any list index.
    pub fn root_property(&self) -> Option<&str> {
        let path = self.affected_property.as_deref()?;
        let head = path.split('.').next().unwrap_or(path);
        Some(head.split('[').next().unwrap_or(head))
    }
}
