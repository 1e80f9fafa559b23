//! Error types and the recorded-condition list.

use std::fmt;

use thiserror::Error;
use xmap_schema::Severity;

/// Broad class of a recorded condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// An expected attribute, element or text content is absent.
    MissingValue,
    /// Text cannot be converted to the target type.
    MalformedValue,
    /// A converted value was rejected by the target member.
    AssignmentFailure,
    /// Document shape, namespace or type problems.
    Structural,
}

/// A non-fatal condition found while mapping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("attribute '{name}' for member '{member}' is missing")]
    MissingAttribute { member: String, name: String },

    #[error("element '{name}' for member '{member}' is missing")]
    MissingElement { member: String, name: String },

    #[error("text content for member '{member}' is missing")]
    MissingText { member: String },

    #[error("cannot read '{text}' as {type_name}: {reason}")]
    MalformedValue {
        text: String,
        type_name: String,
        reason: String,
    },

    #[error("member '{member}' of type {expected} cannot hold a value of type {actual}")]
    AssignmentFailure {
        member: String,
        expected: String,
        actual: String,
    },

    #[error("attribute '{name}' already exists")]
    DuplicateAttribute { name: String },

    #[error("location '{path}' cannot be created")]
    UncreatableLocation { path: String },

    #[error("cannot insert item into {container}: {reason}")]
    InsertionFailure { container: String, reason: String },

    #[error("prefix '{prefix}' is bound to both '{first}' and '{second}'")]
    NamespaceCollision {
        prefix: String,
        first: String,
        second: String,
    },

    #[error("expected a value of type {expected}, found {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("cannot resolve type name '{name}'")]
    UnresolvedType { name: String },

    #[error("type '{type_name}' cannot be instantiated")]
    NotInstantiable { type_name: String },

    #[error("malformed document: {reason}")]
    MalformedDocument { reason: String },

    #[error("cannot convert value of type {type_name}: {reason}")]
    Conversion { type_name: String, reason: String },
}

impl MappingError {
    /// Category of this condition.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingAttribute { .. } | Self::MissingElement { .. } | Self::MissingText { .. } => {
                ErrorCategory::MissingValue
            }
            Self::MalformedValue { .. } | Self::Conversion { .. } => ErrorCategory::MalformedValue,
            Self::AssignmentFailure { .. } => ErrorCategory::AssignmentFailure,
            _ => ErrorCategory::Structural,
        }
    }
}

/// A recorded condition with the severity it was raised at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedError {
    pub error: MappingError,
    pub severity: Severity,
}

impl fmt::Display for ReportedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Ignore => "ignored",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{}: {}", level, self.error)
    }
}

/// Conditions recorded during one serialize or deserialize call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorList {
    entries: Vec<ReportedError>,
}

impl ErrorList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ReportedError) {
        self.entries.push(error);
    }

    /// Append every entry of `other`.
    pub fn extend(&mut self, other: ErrorList) {
        self.entries.extend(other.entries);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReportedError> {
        self.entries.iter()
    }

    /// Entries recorded at error severity.
    pub fn errors(&self) -> impl Iterator<Item = &ReportedError> {
        self.entries.iter().filter(|e| e.severity == Severity::Error)
    }

    /// Entries recorded at warning severity.
    pub fn warnings(&self) -> impl Iterator<Item = &ReportedError> {
        self.entries.iter().filter(|e| e.severity == Severity::Warning)
    }

    /// Check whether any entry has error severity.
    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    /// Entries of one category.
    pub fn of_category(&self, category: ErrorCategory) -> impl Iterator<Item = &ReportedError> {
        self.entries
            .iter()
            .filter(move |e| e.error.category() == category)
    }
}

impl<'a> IntoIterator for &'a ErrorList {
    type Item = &'a ReportedError;
    type IntoIter = std::slice::Iter<'a, ReportedError>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", entry)?;
        }
        Ok(())
    }
}

/// Errors that abort a serialize or deserialize call.
#[derive(Debug, Error)]
pub enum Error {
    /// An object refers back to itself while cycles are not tolerated.
    #[error("self-referencing object of class '{class}'")]
    SelfReference { class: String },

    /// A recorded condition aborted the call under the exception policy.
    #[error("{0}")]
    Aborted(ReportedError),

    /// XML tree error.
    #[error("{0}")]
    Dom(#[from] xmap_dom::Error),

    /// Schema or value conversion error.
    #[error("{0}")]
    Schema(#[from] xmap_schema::Error),
}

/// Result type for mapping operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        let missing = MappingError::MissingText {
            member: "Name".into(),
        };
        assert_eq!(missing.category(), ErrorCategory::MissingValue);
        let collision = MappingError::NamespaceCollision {
            prefix: "a".into(),
            first: "urn:a".into(),
            second: "urn:b".into(),
        };
        assert_eq!(collision.category(), ErrorCategory::Structural);
    }

    #[test]
    fn test_error_list() {
        let mut list = ErrorList::new();
        list.push(ReportedError {
            error: MappingError::MissingText {
                member: "A".into(),
            },
            severity: Severity::Warning,
        });
        list.push(ReportedError {
            error: MappingError::UnresolvedType { name: "X".into() },
            severity: Severity::Error,
        });
        assert_eq!(list.len(), 2);
        assert!(list.has_errors());
        assert_eq!(list.warnings().count(), 1);
        assert_eq!(list.of_category(ErrorCategory::Structural).count(), 1);
        assert_eq!(
            list.to_string(),
            "warning: text content for member 'A' is missing\nerror: cannot resolve type name 'X'"
        );
    }
}
