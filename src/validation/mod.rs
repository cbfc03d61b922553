//! Entity validation against the schema.org vocabulary.
//!
//! Every entity goes through a small state machine:
//!
//! ```text
//! Pending -> TypeResolved -> PropertiesChecked -> Done
//! ```
//!
//! Resolving the type fixes the effective constraint set (empty for unknown
//! types); checking properties reports missing and malformed values and
//! recurses into nested entities, whose issues surface at the top-level entity
//! with a path prefix (`offers.price`, `review[1].author`).

pub mod shapes;

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::core::AnalyzerConfig;
use crate::types::{EntityNode, Issue, IssueCode, IssueLevel, PropertyValue};
use crate::vocabulary::{ResolvedConstraints, VocabularyRegistry};

pub use shapes::ShapeCheck;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationState {
    Pending,
    TypeResolved,
    PropertiesChecked,
    Done,
}

impl fmt::Display for ValidationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationState::Pending => write!(f, "pending"),
            ValidationState::TypeResolved => write!(f, "type-resolved"),
            ValidationState::PropertiesChecked => write!(f, "properties-checked"),
            ValidationState::Done => write!(f, "done"),
        }
    }
}

/// Path tracking while walking an entity tree
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    /// Current path relative to the top-level entity
    pub current_path: String,

    /// Stack of paths for nested validation
    pub path_stack: Vec<String>,

    /// Issues found so far
    pub issues: Vec<Issue>,
}

impl ValidationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a path segment (`offers`, `review[1]`) onto the path stack
    pub fn push_path(&mut self, segment: &str) {
        self.path_stack.push(self.current_path.clone());
        if self.current_path.is_empty() {
            self.current_path = segment.to_string();
        } else {
            self.current_path = format!("{}.{}", self.current_path, segment);
        }
    }

    pub fn pop_path(&mut self) {
        if let Some(previous_path) = self.path_stack.pop() {
            self.current_path = previous_path;
        }
    }

    /// Add an issue, re-rooting its property path at the current position
    pub fn add_issue(&mut self, issue: Issue) {
        let issue = if self.current_path.is_empty() {
            issue
        } else {
            issue.prefixed(&self.current_path)
        };
        self.issues.push(issue);
    }

    pub fn into_issues(self) -> Vec<Issue> {
        self.issues
    }
}

pub struct Validator {
    registry: Arc<VocabularyRegistry>,
    strict: bool,
    include_info: bool,
}

impl Validator {
    pub fn new(registry: Arc<VocabularyRegistry>, config: &AnalyzerConfig) -> Self {
        Self {
            registry,
            strict: config.strict,
            include_info: config.include_info,
        }
    }

    pub fn registry(&self) -> &Arc<VocabularyRegistry> {
        &self.registry
    }

    /// Start the state machine for one entity.
    pub fn check<'a>(&'a self, node: &'a EntityNode) -> EntityCheck<'a> {
        EntityCheck {
            validator: self,
            node,
            state: ValidationState::Pending,
            constraints: Arc::new(ResolvedConstraints::empty()),
            context: ValidationContext::new(),
        }
    }

    /// Validate a top-level entity and return its issues in report order.
    pub fn validate(&self, node: &EntityNode) -> Vec<Issue> {
        let mut check = self.check(node);
        check.run();
        let constraints = check.constraints.clone();
        let mut issues = check.into_issues();

        if !self.include_info {
            issues.retain(|issue| issue.level != IssueLevel::Info);
        }
        order_issues(&mut issues, &constraints);

        tracing::debug!(
            "Validated {} with {} issues",
            node.declared_type(),
            issues.len()
        );
        issues
    }
}

/// Validation of a single entity, advanced one state at a time.
pub struct EntityCheck<'a> {
    validator: &'a Validator,
    node: &'a EntityNode,
    state: ValidationState,
    constraints: Arc<ResolvedConstraints>,
    context: ValidationContext,
}

impl<'a> EntityCheck<'a> {
    pub fn state(&self) -> ValidationState {
        self.state
    }

    pub fn constraints(&self) -> &ResolvedConstraints {
        &self.constraints
    }

    /// Perform the next transition. `Done` is terminal.
    pub fn advance(&mut self) -> ValidationState {
        self.state = match self.state {
            ValidationState::Pending => {
                self.resolve_type();
                ValidationState::TypeResolved
            }
            ValidationState::TypeResolved => {
                self.check_properties();
                ValidationState::PropertiesChecked
            }
            ValidationState::PropertiesChecked | ValidationState::Done => ValidationState::Done,
        };
        self.state
    }

    pub fn run(&mut self) {
        while self.advance() != ValidationState::Done {}
    }

    /// Issues in discovery order; runs the machine to completion first.
    pub fn into_issues(mut self) -> Vec<Issue> {
        self.run();
        self.context.into_issues()
    }

    fn resolve_type(&mut self) {
        let registry = &self.validator.registry;
        let node = self.node;

        for issue in &node.diagnostics {
            self.context.add_issue(issue.clone());
        }
        // References were validated where their target was expanded
        if node.is_unparseable() || node.reference {
            return;
        }

        if node.types.is_empty() {
            self.context.add_issue(Issue::warning(
                IssueCode::MissingType,
                "Entity does not declare a type",
            ));
            return;
        }

        for type_name in &node.types {
            if !registry.contains(type_name) {
                self.context.add_issue(Issue::warning(
                    IssueCode::UnknownType,
                    format!("Unknown type '{type_name}' is not part of the schema.org vocabulary"),
                ));
            }
        }
        self.constraints = registry.constraints_for_types(&node.types);
    }

    fn check_properties(&mut self) {
        let node = self.node;
        if node.is_unparseable() || node.reference {
            return;
        }
        let constraints = self.constraints.clone();
        let type_label = node.declared_type().to_string();

        for name in &constraints.required {
            if !node.has_property(name) {
                self.context.add_issue(
                    Issue::error(
                        IssueCode::MissingRequiredProperty,
                        format!("Missing required property '{name}' for type {type_label}"),
                    )
                    .with_property(name.as_str()),
                );
            }
        }

        let recommended_level = if self.validator.strict {
            IssueLevel::Error
        } else {
            IssueLevel::Warning
        };
        for name in &constraints.recommended {
            if !node.has_property(name) {
                self.context.add_issue(
                    Issue::new(
                        recommended_level,
                        IssueCode::MissingRecommendedProperty,
                        format!("Missing recommended property '{name}' for type {type_label}"),
                    )
                    .with_property(name.as_str()),
                );
            }
        }

        for property in &node.properties {
            if !constraints.is_empty() && !constraints.declares(&property.name) {
                self.context.add_issue(
                    Issue::info(
                        IssueCode::UnknownProperty,
                        format!(
                            "Property '{}' is not defined for type {type_label}",
                            property.name
                        ),
                    )
                    .with_property(property.name.as_str()),
                );
            }

            match &property.value {
                PropertyValue::List(items) => {
                    for (position, item) in items.iter().enumerate() {
                        let segment = format!("{}[{position}]", property.name);
                        self.check_value(&constraints, &property.name, &segment, item);
                    }
                }
                value => self.check_value(&constraints, &property.name, &property.name, value),
            }
        }
    }

    fn check_value(
        &mut self,
        constraints: &ResolvedConstraints,
        name: &str,
        segment: &str,
        value: &PropertyValue,
    ) {
        let registry = &self.validator.registry;
        let range = registry.shape_for(constraints, name);

        let outcome = match range {
            Some(range) => shapes::check_value(registry, range, value),
            None => ShapeCheck::Accepted,
        };

        self.context.push_path(segment);
        match outcome {
            ShapeCheck::Accepted => {}
            ShapeCheck::Invalid => {
                let expected = range.map(ToString::to_string).unwrap_or_default();
                self.context.add_issue(Issue::error(
                    IssueCode::InvalidValueFormat,
                    format!(
                        "Property '{name}' has value {}, expected {expected}",
                        value.describe()
                    ),
                ));
                self.context.pop_path();
                return;
            }
            ShapeCheck::UnexpectedEntity { found } => {
                let expected = range.map(ToString::to_string).unwrap_or_default();
                self.context.add_issue(Issue::warning(
                    IssueCode::UnexpectedEntityType,
                    format!("Property '{name}' expects {expected}, found a {found} entity"),
                ));
            }
        }

        if let PropertyValue::Entity(nested) = value {
            let mut check = self.validator.check(nested);
            check.run();
            let nested_constraints = check.constraints.clone();
            let mut nested_issues = check.into_issues();
            order_issues(&mut nested_issues, &nested_constraints);
            for issue in nested_issues {
                self.context.add_issue(issue);
            }
        }
        self.context.pop_path();
    }
}

/// Errors, then warnings, then info. Within a level: entity-level issues,
/// then properties in vocabulary declaration order, then undeclared
/// properties by name. Ties keep discovery order.
pub fn order_issues(issues: &mut [Issue], constraints: &ResolvedConstraints) {
    let rank = |issue: &Issue| -> (u8, usize) {
        match issue.root_property() {
            None => (0, 0),
            Some(name) => match constraints.position(name) {
                Some(position) => (1, position),
                None => (2, 0),
            },
        }
    };

    issues.sort_by(|a, b| {
        a.level
            .cmp(&b.level)
            .then_with(|| rank(a).cmp(&rank(b)))
            .then_with(|| match (rank(a).0, rank(b).0) {
                (2, 2) => a.root_property().cmp(&b.root_property()),
                _ => Ordering::Equal,
            })
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CandidateRef, SourceFormat};

    fn validator(config: &AnalyzerConfig) -> Validator {
        Validator::new(VocabularyRegistry::embedded().unwrap(), config)
    }

    fn node(types: &[&str]) -> EntityNode {
        EntityNode::new(
            types.iter().map(|t| t.to_string()).collect(),
            CandidateRef {
                index: 0,
                format: SourceFormat::JsonLd,
            },
        )
    }

    fn text(value: &str) -> PropertyValue {
        PropertyValue::Text(value.to_string())
    }

    #[test]
    fn test_state_machine_transitions() {
        let validator = validator(&AnalyzerConfig::default());
        let entity = node(&["Organization"]).with_property("name", text("Acme"));
        let mut check = validator.check(&entity);

        assert_eq!(check.state(), ValidationState::Pending);
        assert_eq!(check.advance(), ValidationState::TypeResolved);
        assert!(!check.constraints().is_empty());
        assert_eq!(check.advance(), ValidationState::PropertiesChecked);
        assert_eq!(check.advance(), ValidationState::Done);
        assert_eq!(check.advance(), ValidationState::Done);
    }

    #[test]
    fn test_nested_issue_paths() {
        let validator = validator(&AnalyzerConfig::default());
        let offer = node(&["Offer"])
            .with_property("price", text("nineteen"))
            .with_property("priceCurrency", text("USD"));
        let entity = node(&["Product"])
            .with_property("name", text("Widget"))
            .with_property("offers", PropertyValue::Entity(Box::new(offer)));

        let issues = validator.validate(&entity);
        let invalid = issues
            .iter()
            .find(|issue| issue.code == IssueCode::InvalidValueFormat)
            .unwrap();
        assert_eq!(invalid.affected_property.as_deref(), Some("offers.price"));
        assert!(issues[0].is_error());
    }

    #[test]
    fn test_nested_issues_follow_nested_declaration_order() {
        let validator = validator(&AnalyzerConfig::default());
        let offer = node(&["Offer"])
            .with_property("eligibleQuantity", text("lots"))
            .with_property("price", text("free"))
            .with_property("priceCurrency", text("USD"));
        let product = node(&["Product"])
            .with_property("name", text("Widget"))
            .with_property("offers", PropertyValue::Entity(Box::new(offer)));

        let errors: Vec<_> = validator
            .validate(&product)
            .into_iter()
            .filter(Issue::is_error)
            .filter_map(|issue| issue.affected_property)
            .collect();
        assert_eq!(errors, vec!["offers.price", "offers.eligibleQuantity"]);
    }

    #[test]
    fn test_list_items_are_indexed() {
        let validator = validator(&AnalyzerConfig::default());
        let good = node(&["Review"]).with_property("author", text("https://acme.test/ada"));
        let bad = node(&["Review"]);
        let entity = node(&["Product"])
            .with_property("name", text("Widget"))
            .with_property(
                "review",
                PropertyValue::List(vec![
                    PropertyValue::Entity(Box::new(good)),
                    PropertyValue::Entity(Box::new(bad)),
                ]),
            );

        let issues = validator.validate(&entity);
        assert!(issues.iter().any(|issue| issue.code == IssueCode::MissingRequiredProperty
            && issue.affected_property.as_deref() == Some("review[1].author")));
    }

    #[test]
    fn test_type_specific_shape_beats_global() {
        // ListItem declares position as Integer or Text; the global shape is Integer only
        let validator = validator(&AnalyzerConfig::default());
        let entity = node(&["ListItem"])
            .with_property("position", text("first"))
            .with_property("name", text("Home"))
            .with_property("item", text("https://acme.test/"));
        let issues = validator.validate(&entity);
        assert!(issues.iter().all(|issue| issue.code != IssueCode::InvalidValueFormat));

        let entity = node(&["Offer"]).with_property("position", text("first"));
        let issues = validator.validate(&entity);
        assert!(issues.iter().any(|issue| issue.code == IssueCode::InvalidValueFormat
            && issue.affected_property.as_deref() == Some("position")));
    }

    #[test]
    fn test_ordering_follows_declaration_order() {
        let validator = validator(&AnalyzerConfig::default());
        let entity = node(&["Offer"])
            .with_property("priceCurrency", text("USD"))
            .with_property("price", text("free"))
            .with_property("zzz", text("x"))
            .with_property("aaa", text("y"));
        let issues = validator.validate(&entity);
        let summary: Vec<(IssueLevel, Option<&str>)> = issues
            .iter()
            .map(|issue| (issue.level, issue.affected_property.as_deref()))
            .collect();

        assert_eq!(summary[0], (IssueLevel::Error, Some("price")));
        let info: Vec<_> = summary
            .iter()
            .filter(|(level, _)| *level == IssueLevel::Info)
            .map(|(_, path)| *path)
            .collect();
        assert_eq!(info, vec![Some("aaa"), Some("zzz")]);
        let levels: Vec<_> = summary.iter().map(|(level, _)| *level).collect();
        let mut sorted = levels.clone();
        sorted.sort();
        assert_eq!(levels, sorted);
    }

    #[test]
    fn test_strict_mode_promotes_recommendations() {
        let entity = node(&["Organization"]).with_property("name", text("Acme"));
        let lenient = validator(&AnalyzerConfig::default()).validate(&entity);
        assert!(lenient.iter().all(|issue| !issue.is_error()));

        let strict = validator(&AnalyzerConfig::strict()).validate(&entity);
        assert!(strict.iter().any(|issue| issue.is_error()
            && issue.code == IssueCode::MissingRecommendedProperty));
    }

    #[test]
    fn test_multiple_types_merge_constraints() {
        let validator = validator(&AnalyzerConfig::default());
        let entity = node(&["Product", "FooBarBaz"]);
        let issues = validator.validate(&entity);
        let unknown = issues
            .iter()
            .filter(|issue| issue.code == IssueCode::UnknownType)
            .count();
        assert_eq!(unknown, 1);
        assert!(issues.iter().any(|issue| issue.code == IssueCode::MissingRequiredProperty));
    }

    #[test]
    fn test_missing_type() {
        let validator = validator(&AnalyzerConfig::default());
        let issues = validator.validate(&node(&[]).with_property("name", text("x")));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, IssueCode::MissingType);
    }
}
