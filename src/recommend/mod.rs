//! Recommendations and suggested markup.
//!
//! The recommender is a pure function of an entity and its issues: one
//! templated recommendation per error or warning, plus (optionally) a
//! corrected JSON-LD rendering of the entity with placeholders for every
//! missing or invalid value. The input entity is never modified.

pub mod suggestion;
pub mod templates;

use std::sync::Arc;

use crate::core::AnalyzerConfig;
use crate::types::{EntityNode, Issue, IssueLevel};
use crate::vocabulary::VocabularyRegistry;

pub use suggestion::{PLACEHOLDER_PREFIX, SuggestedSchema};
pub use templates::recommendation_for;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recommendations {
    pub messages: Vec<String>,
    pub suggested_schema: Option<SuggestedSchema>,
}

pub struct Recommender {
    registry: Arc<VocabularyRegistry>,
    include_suggestions: bool,
    max_depth: usize,
}

impl Recommender {
    pub fn new(registry: Arc<VocabularyRegistry>, config: &AnalyzerConfig) -> Self {
        Self {
            registry,
            include_suggestions: config.include_suggestions,
            max_depth: config.max_depth,
        }
    }

    pub fn recommend(&self, node: &EntityNode, issues: &[Issue]) -> Recommendations {
        let entity_type = node.declared_type();
        let messages: Vec<String> = issues
            .iter()
            .filter_map(|issue| recommendation_for(issue, entity_type))
            .collect();

        let actionable = issues.iter().any(|issue| issue.level != IssueLevel::Info);
        let suggested_schema = (self.include_suggestions && actionable && !node.is_unparseable())
            .then(|| {
                suggestion::SuggestionBuilder::new(&self.registry, self.max_depth, issues)
                    .build(node)
            });

        Recommendations {
            messages,
            suggested_schema,
        }
    }
}
