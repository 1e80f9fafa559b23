//! Declared types of members and values.

use std::fmt;
use std::sync::Arc;

/// Container kinds of a sequence, each with its own insertion primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SequenceKind {
    /// Growable list, appended at the end.
    List,
    /// FIFO queue, enqueued at the back.
    Queue,
    /// LIFO stack, pushed on top. Enumerates from the top.
    Stack,
    /// Doubly linked list, appended at the tail.
    LinkedList,
    /// Set of unique items.
    Set,
}

impl SequenceKind {
    /// All kinds, in declaration order.
    pub const ALL: [SequenceKind; 5] = [
        Self::List,
        Self::Queue,
        Self::Stack,
        Self::LinkedList,
        Self::Set,
    ];

    /// Get the string name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::List => "List",
            Self::Queue => "Queue",
            Self::Stack => "Stack",
            Self::LinkedList => "LinkedList",
            Self::Set => "Set",
        }
    }

    /// Parse a kind from its name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

/// The declared type of a member or the runtime type of a value.
///
/// Every type has a fully-qualified name (see [`DataType::type_name`]) that
/// [`DataType::parse`] reads back, e.g. `Int32`, `List<String>`,
/// `Int32[,]`, `Map<String,Int32>` or a registered class name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Boolean value.
    Boolean,
    /// Unicode scalar value.
    Char,
    /// Signed 8-bit integer.
    SByte,
    /// Signed 16-bit integer.
    Int16,
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 8-bit integer.
    Byte,
    /// Unsigned 16-bit integer.
    UInt16,
    /// Unsigned 32-bit integer.
    UInt32,
    /// Unsigned 64-bit integer.
    UInt64,
    /// 32-bit floating point.
    Single,
    /// 64-bit floating point.
    Double,
    /// String value.
    String,
    /// GUID value.
    Guid,
    /// Date and time without time zone.
    DateTime,
    /// Signed duration.
    TimeSpan,
    /// Reference to a type.
    Type,
    /// Registered enumeration.
    Enum(Arc<str>),
    /// Registered class.
    Class(Arc<str>),
    /// Any value; the runtime type is always recorded.
    Any,
    /// Sequence container.
    Sequence(SequenceKind, Box<DataType>),
    /// Array with `rank` dimensions.
    Array { item: Box<DataType>, rank: usize },
    /// Packed bit vector.
    BitVector,
    /// Associative container.
    Map(Box<DataType>, Box<DataType>),
    /// Key/value pair.
    Pair(Box<DataType>, Box<DataType>),
}

/// Names of the built-in scalar types.
const BASIC_TYPES: [(&str, DataType); 17] = [
    ("Boolean", DataType::Boolean),
    ("Char", DataType::Char),
    ("SByte", DataType::SByte),
    ("Int16", DataType::Int16),
    ("Int32", DataType::Int32),
    ("Int64", DataType::Int64),
    ("Byte", DataType::Byte),
    ("UInt16", DataType::UInt16),
    ("UInt32", DataType::UInt32),
    ("UInt64", DataType::UInt64),
    ("Single", DataType::Single),
    ("Double", DataType::Double),
    ("String", DataType::String),
    ("Guid", DataType::Guid),
    ("DateTime", DataType::DateTime),
    ("TimeSpan", DataType::TimeSpan),
    ("Type", DataType::Type),
];

impl DataType {
    /// Sequence type shorthand.
    pub fn sequence(kind: SequenceKind, item: DataType) -> Self {
        Self::Sequence(kind, Box::new(item))
    }

    /// `List<item>` shorthand.
    pub fn list(item: DataType) -> Self {
        Self::sequence(SequenceKind::List, item)
    }

    /// Array type shorthand.
    pub fn array(item: DataType, rank: usize) -> Self {
        Self::Array {
            item: Box::new(item),
            rank: rank.max(1),
        }
    }

    /// Map type shorthand.
    pub fn map(key: DataType, value: DataType) -> Self {
        Self::Map(Box::new(key), Box::new(value))
    }

    /// Pair type shorthand.
    pub fn pair(key: DataType, value: DataType) -> Self {
        Self::Pair(Box::new(key), Box::new(value))
    }

    /// Class type shorthand.
    pub fn class(name: &str) -> Self {
        Self::Class(Arc::from(name))
    }

    /// Enum type shorthand.
    pub fn enumeration(name: &str) -> Self {
        Self::Enum(Arc::from(name))
    }

    /// Check if this type converts directly to and from one text value.
    pub fn is_basic(&self) -> bool {
        matches!(
            self,
            Self::Boolean
                | Self::Char
                | Self::SByte
                | Self::Int16
                | Self::Int32
                | Self::Int64
                | Self::Byte
                | Self::UInt16
                | Self::UInt32
                | Self::UInt64
                | Self::Single
                | Self::Double
                | Self::String
                | Self::DateTime
                | Self::Enum(_)
        )
    }

    /// Check if this type is handled by a hand-written built-in converter.
    pub fn is_known(&self) -> bool {
        matches!(self, Self::Guid | Self::TimeSpan | Self::Type)
    }

    /// Check if a value of this type has a single-text form.
    pub fn has_text_form(&self) -> bool {
        self.is_basic() || self.is_known()
    }

    /// Check if a value of this type may be null.
    ///
    /// Scalars, enumerations and pairs always carry a value.
    pub fn is_nullable(&self) -> bool {
        !(self.is_numeric()
            || matches!(
                self,
                Self::Boolean
                    | Self::Char
                    | Self::Guid
                    | Self::DateTime
                    | Self::TimeSpan
                    | Self::Enum(_)
                    | Self::Pair(..)
            ))
    }

    /// Check if this is a numeric type.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::SByte
                | Self::Int16
                | Self::Int32
                | Self::Int64
                | Self::Byte
                | Self::UInt16
                | Self::UInt32
                | Self::UInt64
                | Self::Single
                | Self::Double
        )
    }

    /// Check if this is a container type (sequence, array, bit vector or map).
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            Self::Sequence(..) | Self::Array { .. } | Self::BitVector | Self::Map(..)
        )
    }

    /// Item type of a sequence or array.
    pub fn item_type(&self) -> Option<&DataType> {
        match self {
            Self::Sequence(_, item) | Self::Array { item, .. } => Some(item),
            Self::BitVector => Some(&DataType::Boolean),
            _ => None,
        }
    }

    /// Fully-qualified type name.
    pub fn type_name(&self) -> String {
        match self {
            Self::Enum(name) | Self::Class(name) => name.to_string(),
            Self::Any => "Object".to_string(),
            Self::BitVector => "BitVector".to_string(),
            Self::Sequence(kind, item) => format!("{}<{}>", kind.as_str(), item.type_name()),
            Self::Array { item, rank } => {
                format!("{}[{}]", item.type_name(), ",".repeat(rank.saturating_sub(1)))
            }
            Self::Map(key, value) => format!("Map<{},{}>", key.type_name(), value.type_name()),
            Self::Pair(key, value) => format!("Pair<{},{}>", key.type_name(), value.type_name()),
            basic => BASIC_TYPES
                .iter()
                .find(|(_, t)| t == basic)
                .map(|(name, _)| name.to_string())
                .unwrap_or_default(),
        }
    }

    /// Parse a fully-qualified type name.
    ///
    /// Names that are not built in are passed to `lookup`, which resolves
    /// registered classes and enums.
    pub fn parse(name: &str, lookup: &dyn Fn(&str) -> Option<DataType>) -> Option<DataType> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        // `item[,,]`
        if let Some(body) = name.strip_suffix(']') {
            let open = body.rfind('[')?;
            let commas = &body[open + 1..];
            if !commas.chars().all(|c| c == ',') {
                return None;
            }
            let item = Self::parse(&body[..open], lookup)?;
            return Some(Self::array(item, commas.len() + 1));
        }

        // `Head<args>`
        if let Some(body) = name.strip_suffix('>') {
            let open = body.find('<')?;
            let head = body[..open].trim();
            let args = split_type_args(&body[open + 1..])?;
            return match (head, args.as_slice()) {
                ("Map", [key, value]) => Some(Self::map(
                    Self::parse(key, lookup)?,
                    Self::parse(value, lookup)?,
                )),
                ("Pair", [key, value]) => Some(Self::pair(
                    Self::parse(key, lookup)?,
                    Self::parse(value, lookup)?,
                )),
                (head, [item]) => {
                    let kind = SequenceKind::from_name(head)?;
                    Some(Self::sequence(kind, Self::parse(item, lookup)?))
                }
                _ => None,
            };
        }

        match name {
            "Object" => Some(Self::Any),
            "BitVector" => Some(Self::BitVector),
            _ => BASIC_TYPES
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, t)| t.clone())
                .or_else(|| lookup(name)),
        }
    }

    /// Check whether a name is reserved for a built-in type.
    pub fn is_builtin_name(name: &str) -> bool {
        matches!(name, "Object" | "BitVector" | "Map" | "Pair")
            || SequenceKind::from_name(name).is_some()
            || BASIC_TYPES.iter().any(|(n, _)| *n == name)
    }
}

/// Split generic arguments at top-level commas.
fn split_type_args(args: &str) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in args.char_indices() {
        match c {
            '<' | '[' => depth += 1,
            '>' | ']' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(args[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
        if depth < 0 {
            return None;
        }
    }
    if depth != 0 {
        return None;
    }
    parts.push(args[start..].trim());
    if parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    Some(parts)
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<DataType> {
        match name {
            "Person" => Some(DataType::class("Person")),
            "Color" => Some(DataType::enumeration("Color")),
            _ => None,
        }
    }

    #[test]
    fn test_type_names() {
        assert_eq!(DataType::Int32.type_name(), "Int32");
        assert_eq!(DataType::Any.type_name(), "Object");
        assert_eq!(DataType::list(DataType::String).type_name(), "List<String>");
        assert_eq!(DataType::array(DataType::Int32, 2).type_name(), "Int32[,]");
        assert_eq!(
            DataType::map(DataType::String, DataType::list(DataType::Int32)).type_name(),
            "Map<String,List<Int32>>"
        );
    }

    #[test]
    fn test_parse_type_names() {
        let cases = [
            DataType::Int32,
            DataType::Any,
            DataType::BitVector,
            DataType::class("Person"),
            DataType::enumeration("Color"),
            DataType::sequence(SequenceKind::Stack, DataType::class("Person")),
            DataType::array(DataType::array(DataType::Double, 1), 3),
            DataType::map(DataType::String, DataType::list(DataType::Int32)),
            DataType::pair(DataType::Int32, DataType::map(DataType::Char, DataType::Byte)),
        ];
        for case in cases {
            assert_eq!(DataType::parse(&case.type_name(), &lookup), Some(case.clone()));
        }
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(DataType::parse("Unknown", &lookup), None);
        assert_eq!(DataType::parse("List<Int32", &lookup), None);
        assert_eq!(DataType::parse("Map<Int32>", &lookup), None);
        assert_eq!(DataType::parse("Int32[x]", &lookup), None);
        assert_eq!(DataType::parse("Vector<Int32>", &lookup), None);
    }

    #[test]
    fn test_classification() {
        assert!(DataType::Int32.is_basic());
        assert!(DataType::enumeration("Color").is_basic());
        assert!(!DataType::Guid.is_basic());
        assert!(DataType::Guid.has_text_form());
        assert!(DataType::TimeSpan.is_known());
        assert!(!DataType::class("Person").has_text_form());
        assert!(DataType::BitVector.is_container());
        assert_eq!(DataType::BitVector.item_type(), Some(&DataType::Boolean));
    }
}
