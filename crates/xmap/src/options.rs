//! Global mapping policies.

use xmap_dom::WriteOptions;
use xmap_schema::Severity;

/// Namespace of the `realtype` and `dims` metadata attributes.
pub const METADATA_NAMESPACE: &str = "urn:xmap:metadata";

/// Whether recorded conditions abort the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ExceptionPolicy {
    /// Abort on warnings and errors.
    ThrowWarningsAndErrors,
    /// Abort on errors only.
    #[default]
    ThrowErrorsOnly,
    /// Never abort; conditions are only recorded.
    DoNotThrow,
}

impl ExceptionPolicy {
    /// Check whether a condition of `severity` aborts the call.
    pub fn aborts(self, severity: Severity) -> bool {
        match (self, severity) {
            (_, Severity::Ignore) => false,
            (Self::ThrowWarningsAndErrors, _) => true,
            (Self::ThrowErrorsOnly, Severity::Error) => true,
            _ => false,
        }
    }
}

/// Options of an [`XmlSerializer`](crate::XmlSerializer).
///
/// Class-level settings in the schema override the matching option for
/// that class.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SerializerOptions {
    pub exception_policy: ExceptionPolicy,
    /// Severity of conditions on members without their own severity.
    pub default_severity: Severity,
    /// Write null members as empty elements or attributes.
    pub serialize_nulls: bool,
    /// Skip members whose value equals their default.
    pub skip_default_values: bool,
    /// Write an empty placeholder for a cyclic reference instead of failing.
    pub tolerate_cycles: bool,
    /// Maximum object nesting depth; 0 is unlimited.
    pub max_recursion: usize,
    /// Omit `realtype` and `dims` metadata attributes.
    pub suppress_metadata: bool,
    pub metadata_namespace: String,
    pub metadata_prefix: String,
    pub real_type_attribute: String,
    pub dims_attribute: String,
    /// Spaces per nesting level, or `None` for compact output.
    pub indent: Option<usize>,
    pub xml_declaration: bool,
}

impl Default for SerializerOptions {
    fn default() -> Self {
        Self {
            exception_policy: ExceptionPolicy::default(),
            default_severity: Severity::Error,
            serialize_nulls: true,
            skip_default_values: false,
            tolerate_cycles: true,
            max_recursion: 300,
            suppress_metadata: false,
            metadata_namespace: METADATA_NAMESPACE.to_string(),
            metadata_prefix: "xmap".to_string(),
            real_type_attribute: "realtype".to_string(),
            dims_attribute: "dims".to_string(),
            indent: Some(2),
            xml_declaration: true,
        }
    }
}

impl SerializerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exception_policy(mut self, policy: ExceptionPolicy) -> Self {
        self.exception_policy = policy;
        self
    }

    pub fn default_severity(mut self, severity: Severity) -> Self {
        self.default_severity = severity;
        self
    }

    pub fn serialize_nulls(mut self, serialize: bool) -> Self {
        self.serialize_nulls = serialize;
        self
    }

    pub fn skip_default_values(mut self, skip: bool) -> Self {
        self.skip_default_values = skip;
        self
    }

    pub fn tolerate_cycles(mut self, tolerate: bool) -> Self {
        self.tolerate_cycles = tolerate;
        self
    }

    pub fn max_recursion(mut self, depth: usize) -> Self {
        self.max_recursion = depth;
        self
    }

    pub fn suppress_metadata(mut self, suppress: bool) -> Self {
        self.suppress_metadata = suppress;
        self
    }

    pub fn metadata_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.metadata_prefix = prefix.into();
        self
    }

    pub fn indent(mut self, indent: Option<usize>) -> Self {
        self.indent = indent;
        self
    }

    pub fn xml_declaration(mut self, declaration: bool) -> Self {
        self.xml_declaration = declaration;
        self
    }

    /// Compact output without a declaration.
    pub fn compact(self) -> Self {
        self.indent(None).xml_declaration(false)
    }

    /// Writer settings.
    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            indent: self.indent,
            declaration: self.xml_declaration,
        }
    }

    /// Parse options from JSON. Missing fields keep their defaults.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json).map_err(|e| xmap_schema::Error::from(e).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy() {
        assert!(ExceptionPolicy::ThrowErrorsOnly.aborts(Severity::Error));
        assert!(!ExceptionPolicy::ThrowErrorsOnly.aborts(Severity::Warning));
        assert!(ExceptionPolicy::ThrowWarningsAndErrors.aborts(Severity::Warning));
        assert!(!ExceptionPolicy::ThrowWarningsAndErrors.aborts(Severity::Ignore));
        assert!(!ExceptionPolicy::DoNotThrow.aborts(Severity::Error));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_from_json() {
        let options = SerializerOptions::from_json(
            r#"{ "exception_policy": "do_not_throw", "max_recursion": 4, "indent": null }"#,
        )
        .unwrap();
        assert_eq!(options.exception_policy, ExceptionPolicy::DoNotThrow);
        assert_eq!(options.max_recursion, 4);
        assert_eq!(options.indent, None);
        assert!(options.serialize_nulls);
    }
}
