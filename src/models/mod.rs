//! Core data models for citation records and the topic tree.

mod citation;
mod topic;

pub use citation::CitationRecord;
pub use topic::{Site, Topic, TopicKind};
