// Recommendation text, one template per issue code

use crate::types::{Issue, IssueCode};

/// The recommendation for an error or warning. Info-level issues get none.
pub fn recommendation_for(issue: &Issue, entity_type: &str) -> Option<String> {
    if issue.level == crate::types::IssueLevel::Info {
        return None;
    }
    let target = issue.affected_property.as_deref().unwrap_or("");

    let text = match issue.code {
        IssueCode::UnparseableSchemaBlock => {
            "Fix the syntax of this structured data block so it can be parsed".to_string()
        }
        IssueCode::CyclicReference => {
            format!("Remove the circular reference at '{target}'")
        }
        IssueCode::MaxDepthExceeded => {
            format!("Reduce the nesting depth at '{target}'")
        }
        IssueCode::EntityLimitExceeded => format!(
            "Split this block into smaller documents, it expands past the entity limit at '{target}'"
        ),
        IssueCode::MissingRequiredProperty => {
            format!("Add the required property '{target}' to the {entity_type} markup")
        }
        IssueCode::MissingRecommendedProperty => format!(
            "Consider adding the recommended property '{target}' to improve rich result eligibility"
        ),
        IssueCode::InvalidValueFormat => {
            format!("Correct the value of '{target}' to match its expected format")
        }
        IssueCode::UnknownType if target.is_empty() => {
            format!("Replace '{entity_type}' with a type from the schema.org vocabulary")
        }
        IssueCode::UnknownType => {
            format!("Use a schema.org type for the entity at '{target}'")
        }
        IssueCode::MissingType if target.is_empty() => {
            "Declare a schema.org type (@type, itemtype or typeof) for this entity".to_string()
        }
        IssueCode::MissingType => {
            format!("Declare a schema.org type for the entity at '{target}'")
        }
        IssueCode::MissingContext => {
            "Add \"@context\": \"https://schema.org\" to the JSON-LD block".to_string()
        }
        IssueCode::UnexpectedEntityType => {
            format!("Use an entity of the expected type for '{target}'")
        }
        IssueCode::UnknownProperty => {
            format!("Remove or rename '{target}', which is not defined for {entity_type}")
        }
    };
    Some(text)
}
