//! Qualified names.

use std::fmt;

/// Namespace URI permanently bound to the `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Namespace URI of `xmlns` declarations.
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// An element or attribute name with an optional namespace URI.
///
/// Prefixes are not part of the name; they are chosen when the document
/// is written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    namespace: Option<String>,
    local: String,
}

impl QName {
    /// Create a name without a namespace.
    pub fn new(local: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local: local.into(),
        }
    }

    /// Create a name in the given namespace.
    pub fn with_namespace(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local: local.into(),
        }
    }

    /// Create a name in an optional namespace. An empty URI means no namespace.
    pub fn in_namespace(namespace: Option<&str>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.filter(|ns| !ns.is_empty()).map(str::to_string),
            local: local.into(),
        }
    }

    /// Namespace URI, if any.
    #[inline]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Local part of the name.
    #[inline]
    pub fn local_name(&self) -> &str {
        &self.local
    }

    /// Check whether this name has the given local part and namespace.
    pub fn matches(&self, namespace: Option<&str>, local: &str) -> bool {
        self.local == local && self.namespace() == namespace.filter(|ns| !ns.is_empty())
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local),
            None => f.write_str(&self.local),
        }
    }
}

impl From<&str> for QName {
    fn from(local: &str) -> Self {
        Self::new(local)
    }
}

impl From<String> for QName {
    fn from(local: String) -> Self {
        Self::new(local)
    }
}

/// Make a string usable as an element or attribute name.
///
/// Every character that is not alphanumeric or `_` becomes `_`. The path
/// steps `.` and `..` pass through unchanged.
pub fn sanitize_name(name: &str) -> String {
    if name == "." || name == ".." {
        return name.to_string();
    }
    if name.is_empty() {
        return "_".to_string();
    }

    let mut result: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    // Names must not start with a digit
    if result.starts_with(|c: char| c.is_ascii_digit()) {
        result.insert(0, '_');
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Name"), "Name");
        assert_eq!(sanitize_name("List<Int32>"), "List_Int32_");
        assert_eq!(sanitize_name("a.b-c"), "a_b_c");
        assert_eq!(sanitize_name("."), ".");
        assert_eq!(sanitize_name(".."), "..");
        assert_eq!(sanitize_name("9lives"), "_9lives");
        assert_eq!(sanitize_name(""), "_");
    }

    #[test]
    fn test_qname_matches() {
        let plain = QName::new("Item");
        assert!(plain.matches(None, "Item"));
        assert!(plain.matches(Some(""), "Item"));
        assert!(!plain.matches(Some("urn:a"), "Item"));

        let qualified = QName::with_namespace("urn:a", "Item");
        assert!(qualified.matches(Some("urn:a"), "Item"));
        assert_eq!(qualified.to_string(), "{urn:a}Item");
    }
}
