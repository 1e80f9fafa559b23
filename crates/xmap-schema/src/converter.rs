//! User-supplied value converters.

use std::fmt;
use std::sync::Arc;

use xmap_dom::{Document, NodeId};

use crate::{Result, Value};

/// Shared converter handle stored in definitions and descriptors.
pub type ConverterRef = Arc<dyn CustomConverter>;

/// Converts values of one type or member to and from XML.
///
/// Only the text hooks are required. The attribute hooks default to the
/// text hooks, and the element hooks default to the element's text content.
/// The engine passes the element or attribute owner the value belongs to;
/// what the converter writes there is up to it.
///
/// # Example
///
/// ```
/// use xmap_schema::{CustomConverter, Result, Value};
///
/// #[derive(Debug)]
/// struct Upper;
///
/// impl CustomConverter for Upper {
///     fn to_text(&self, value: &Value) -> Result<String> {
///         Ok(value.to_string().to_uppercase())
///     }
///
///     fn from_text(&self, text: &str) -> Result<Value> {
///         Ok(Value::string(text.to_lowercase()))
///     }
/// }
/// ```
pub trait CustomConverter: fmt::Debug + Send + Sync {
    /// Convert a value to text content.
    fn to_text(&self, value: &Value) -> Result<String>;

    /// Convert text content back to a value.
    fn from_text(&self, text: &str) -> Result<Value>;

    /// Convert a value to an attribute value.
    fn to_attribute(&self, value: &Value) -> Result<String> {
        self.to_text(value)
    }

    /// Convert an attribute value back to a value.
    fn from_attribute(&self, text: &str) -> Result<Value> {
        self.from_text(text)
    }

    /// Fill `element` with the value.
    fn to_element(&self, value: &Value, doc: &mut Document, element: NodeId) -> Result<()> {
        let text = self.to_text(value)?;
        doc.append_text(element, text);
        Ok(())
    }

    /// Read the value from `element`.
    fn from_element(&self, doc: &Document, element: NodeId) -> Result<Value> {
        self.from_text(&doc.text(element))
    }
}
