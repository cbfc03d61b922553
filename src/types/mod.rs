pub mod entity;
pub mod issue;

pub use entity::{
    CandidateRef, EntityNode, Property, PropertyValue, SourceFormat, TypeSource,
    UNKNOWN_TYPE_NAME,
};
pub use issue::{Issue, IssueCode, IssueLevel};
