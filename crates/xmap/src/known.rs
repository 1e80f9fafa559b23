//! Built-in types with hand-written element converters.

use xmap_common::TimeSpan;
use xmap_dom::{Document, NodeId};
use xmap_schema::{format_basic, parse_basic, DataType, Error, Result, TypeRegistry, Value};

/// Types consulted before generic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownType {
    /// Written as canonical text; a `Ticks` child is also accepted.
    TimeSpan,
    Guid,
    /// Written as a fully-qualified type name.
    Type,
}

impl KnownType {
    pub const ALL: [KnownType; 3] = [KnownType::TimeSpan, KnownType::Guid, KnownType::Type];

    /// Known type of a declared type.
    pub fn of(data_type: &DataType) -> Option<Self> {
        match data_type {
            DataType::TimeSpan => Some(Self::TimeSpan),
            DataType::Guid => Some(Self::Guid),
            DataType::Type => Some(Self::Type),
            _ => None,
        }
    }

    pub fn data_type(self) -> DataType {
        match self {
            Self::TimeSpan => DataType::TimeSpan,
            Self::Guid => DataType::Guid,
            Self::Type => DataType::Type,
        }
    }

    /// Text form of a value.
    pub fn to_text(self, value: &Value, registry: &TypeRegistry) -> Result<String> {
        match (self, value) {
            (_, Value::Null)
            | (Self::TimeSpan, Value::TimeSpan(_))
            | (Self::Guid, Value::Guid(_))
            | (Self::Type, Value::Type(_)) => format_basic(value, None, registry),
            (_, other) => Err(Error::MalformedValue {
                text: other.to_string(),
                type_name: self.data_type().type_name(),
                reason: "value has another type".to_string(),
            }),
        }
    }

    /// Value from its text form.
    pub fn from_text(self, text: &str, registry: &TypeRegistry) -> Result<Value> {
        parse_basic(text, &self.data_type(), None, registry)
    }

    /// Write a value into `element`.
    pub fn write_element(
        self,
        value: &Value,
        doc: &mut Document,
        element: NodeId,
        registry: &TypeRegistry,
    ) -> Result<()> {
        let text = self.to_text(value, registry)?;
        if !text.is_empty() {
            doc.append_text(element, text);
        }
        Ok(())
    }

    /// Read a value from `element`.
    pub fn read_element(
        self,
        doc: &Document,
        element: NodeId,
        registry: &TypeRegistry,
    ) -> Result<Value> {
        if self == Self::TimeSpan {
            if let Some(ticks) = doc.find_child(element, None, "Ticks") {
                let text = doc.text(ticks);
                let ticks = text.trim().parse::<i64>().map_err(|e| Error::MalformedValue {
                    text: text.clone(),
                    type_name: "TimeSpan".to_string(),
                    reason: e.to_string(),
                })?;
                return Ok(Value::TimeSpan(TimeSpan::from_ticks(ticks)));
            }
        }
        self.from_text(&doc.text(element), registry)
    }
}
