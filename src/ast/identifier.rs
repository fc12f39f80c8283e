//! Relation identifiers.

use serde::{Deserialize, Serialize};

/// The name of a relation: a non-empty ordered sequence of name segments.
///
/// Plain relations have a single segment.
/// Qualified names arise from component instantiation in the frontend, and
/// are joined with `.` when displayed and with `-` by the lowering when
/// forming machine-level relation names.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelationName {
    segments: Vec<String>,
}

impl RelationName {
    pub fn new(name: impl Into<String>) -> Self {
        RelationName {
            segments: vec![name.into()],
        }
    }

    pub fn from_segments(segments: Vec<String>) -> Self {
        assert!(!segments.is_empty(), "a relation name requires a segment");
        RelationName { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The last segment, carrying the unqualified name.
    pub fn last(&self) -> &str {
        self.segments.last().expect("names are non-empty")
    }

    /// A copy with the last segment rewritten by the given function.
    pub fn map_last(&self, f: impl FnOnce(&str) -> String) -> Self {
        let mut segments = self.segments.clone();
        let last = segments.last_mut().expect("names are non-empty");
        *last = f(last);
        RelationName { segments }
    }

    /// The segments joined by the given separator.
    pub fn joined(&self, separator: &str) -> String {
        self.segments.join(separator)
    }
}

impl From<&str> for RelationName {
    fn from(name: &str) -> Self {
        RelationName::new(name)
    }
}

impl From<String> for RelationName {
    fn from(name: String) -> Self {
        RelationName::new(name)
    }
}

impl std::fmt::Display for RelationName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.joined("."))
    }
}
