//! Declarative class, member and enum definitions.
//!
//! Definitions are the configuration surface: each class lists its members
//! and how they map to XML. They are validated once by
//! [`SchemaBuilder::build`](crate::SchemaBuilder::build) and then turned
//! into cached descriptors.

use std::sync::Arc;

use crate::{ConverterRef, DataType, Value};

/// Where a member's value is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Placement {
    /// Attribute of the element at the member's location.
    Attribute,
    /// Child element at the member's location.
    #[default]
    Element,
    /// Text content of the element at the member's location.
    TextContent,
}

/// How a collection is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CollectionStrategy {
    /// Container element with one child element per item.
    #[default]
    Recursive,
    /// One element per item, directly at the member's location.
    RecursiveNoContainer,
    /// Items joined by a separator into one text value.
    Serial,
}

/// Collection treatment of a member.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CollectionConfig {
    pub strategy: CollectionStrategy,
    /// Element name of each item.
    pub item_name: Option<String>,
    /// Separator of serial items.
    pub separator: String,
    /// Also split serial text on any whitespace.
    pub whitespace_separates: bool,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            strategy: CollectionStrategy::Recursive,
            item_name: None,
            separator: " ".to_string(),
            whitespace_separates: false,
        }
    }
}

impl CollectionConfig {
    /// Serial strategy with the given separator.
    pub fn serial(separator: impl Into<String>) -> Self {
        Self {
            strategy: CollectionStrategy::Serial,
            separator: separator.into(),
            ..Self::default()
        }
    }

    /// Recursive strategy without a container element.
    pub fn no_container() -> Self {
        Self {
            strategy: CollectionStrategy::RecursiveNoContainer,
            ..Self::default()
        }
    }

    /// Set the item element name.
    pub fn item_name(mut self, name: impl Into<String>) -> Self {
        self.item_name = Some(name.into());
        self
    }

    /// Split serial text on whitespace as well.
    pub fn whitespace_separates(mut self) -> Self {
        self.whitespace_separates = true;
        self
    }
}

/// Where a dictionary key or value is placed within its pair element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum NodePlacement {
    /// Attribute of the pair element.
    Attribute,
    /// Nested element of the pair element.
    #[default]
    Element,
    /// Text content of the pair element.
    Content,
}

/// Dictionary treatment of a member.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DictionaryConfig {
    /// Element name of each pair.
    pub entry_name: String,
    pub key_placement: NodePlacement,
    pub value_placement: NodePlacement,
    pub key_alias: String,
    pub value_alias: String,
    pub key_format: Option<String>,
    pub value_format: Option<String>,
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        Self {
            entry_name: "Entry".to_string(),
            key_placement: NodePlacement::Element,
            value_placement: NodePlacement::Element,
            key_alias: "Key".to_string(),
            value_alias: "Value".to_string(),
            key_format: None,
            value_format: None,
        }
    }
}

impl DictionaryConfig {
    /// Set the pair element name.
    pub fn entry_name(mut self, name: impl Into<String>) -> Self {
        self.entry_name = name.into();
        self
    }

    /// Place the key.
    pub fn key(mut self, placement: NodePlacement, alias: impl Into<String>) -> Self {
        self.key_placement = placement;
        self.key_alias = alias.into();
        self
    }

    /// Place the value.
    pub fn value(mut self, placement: NodePlacement, alias: impl Into<String>) -> Self {
        self.value_placement = placement;
        self.value_alias = alias.into();
        self
    }

    /// Format strings for basic keys and values.
    pub fn formats(mut self, key: Option<&str>, value: Option<&str>) -> Self {
        self.key_format = key.map(str::to_string);
        self.value_format = value.map(str::to_string);
        self
    }
}

/// How string content is embedded in element text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TextEmbedding {
    /// Escaped text.
    #[default]
    None,
    /// CDATA section.
    CData,
    /// Base64 of the UTF-8 bytes.
    Base64,
}

/// Which members of a class are serialized by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FieldSelection {
    /// Every field and property.
    AllFields,
    /// Public properties.
    #[default]
    PublicPropertiesOnly,
    /// Only members marked serializable.
    AttributedFieldsOnly,
}

/// Member visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

/// Member kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MemberKind {
    Field,
    #[default]
    Property,
}

/// Severity of a non-fatal mapping condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Severity {
    /// Not recorded.
    Ignore,
    /// Recorded as a warning.
    Warning,
    /// Recorded as an error.
    #[default]
    Error,
}

/// An XML namespace with an optional preferred prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NamespaceDef {
    pub uri: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub prefix: Option<String>,
}

impl NamespaceDef {
    /// Namespace with a preferred prefix.
    pub fn new(uri: impl Into<String>, prefix: Option<&str>) -> Self {
        Self {
            uri: uri.into(),
            prefix: prefix.filter(|p| !p.is_empty()).map(str::to_string),
        }
    }
}

/// Definition of one class member.
#[derive(Debug, Clone)]
pub struct MemberDef {
    pub name: String,
    pub data_type: DataType,
    pub kind: MemberKind,
    pub visibility: Visibility,
    /// Serialized regardless of the class's field selection.
    pub explicitly_serializable: bool,
    /// Never serialized.
    pub excluded: bool,
    /// Read-only members are written but never assigned.
    pub writable: bool,
    pub alias: Option<String>,
    pub placement: Placement,
    pub location: String,
    pub namespace: Option<NamespaceDef>,
    pub default_value: Option<Value>,
    pub severity: Option<Severity>,
    pub converter: Option<ConverterRef>,
    pub collection: Option<CollectionConfig>,
    pub dictionary: Option<DictionaryConfig>,
    /// Element names for specific runtime types of the value.
    pub type_aliases: Vec<(DataType, String)>,
    pub order: Option<i32>,
    pub skip_if_null: bool,
    pub skip_if_default: bool,
    /// Serialize a collection class's members instead of its items.
    pub not_collection: bool,
    pub preserve_whitespace: bool,
    pub embedding: TextEmbedding,
    pub comments: Vec<String>,
    pub format: Option<String>,
}

impl MemberDef {
    /// Public property placed as an element.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            kind: MemberKind::Property,
            visibility: Visibility::Public,
            explicitly_serializable: false,
            excluded: false,
            writable: true,
            alias: None,
            placement: Placement::Element,
            location: ".".to_string(),
            namespace: None,
            default_value: None,
            severity: None,
            converter: None,
            collection: None,
            dictionary: None,
            type_aliases: Vec::new(),
            order: None,
            skip_if_null: false,
            skip_if_default: false,
            not_collection: false,
            preserve_whitespace: false,
            embedding: TextEmbedding::None,
            comments: Vec::new(),
            format: None,
        }
    }

    /// Make this a field rather than a property.
    pub fn field(mut self) -> Self {
        self.kind = MemberKind::Field;
        self
    }

    /// Make this member private.
    pub fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }

    /// Serialize regardless of field selection.
    pub fn serializable(mut self) -> Self {
        self.explicitly_serializable = true;
        self
    }

    /// Never serialize.
    pub fn excluded(mut self) -> Self {
        self.excluded = true;
        self
    }

    /// Write but never assign.
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    /// Element or attribute name.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Place as an attribute.
    pub fn attribute(mut self) -> Self {
        self.placement = Placement::Attribute;
        self
    }

    /// Place as text content.
    pub fn text_content(mut self) -> Self {
        self.placement = Placement::TextContent;
        self
    }

    /// Location path relative to the owning element.
    pub fn location(mut self, path: impl Into<String>) -> Self {
        self.location = path.into();
        self
    }

    /// Attribute placed at a location.
    pub fn attribute_at(self, path: impl Into<String>) -> Self {
        self.attribute().location(path)
    }

    /// Element placed at a location.
    pub fn element_at(self, path: impl Into<String>) -> Self {
        self.location(path)
    }

    /// Namespace of the member's node.
    pub fn namespace(mut self, uri: impl Into<String>, prefix: Option<&str>) -> Self {
        self.namespace = Some(NamespaceDef::new(uri, prefix));
        self
    }

    /// Value for fresh instances and for default suppression.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Severity when the member is missing.
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Custom converter.
    pub fn converter(mut self, converter: ConverterRef) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Collection treatment.
    pub fn collection(mut self, config: CollectionConfig) -> Self {
        self.collection = Some(config);
        self
    }

    /// Dictionary treatment.
    pub fn dictionary(mut self, config: DictionaryConfig) -> Self {
        self.dictionary = Some(config);
        self
    }

    /// Element name used when the runtime type is `data_type`.
    pub fn type_alias(mut self, data_type: DataType, alias: impl Into<String>) -> Self {
        self.type_aliases.push((data_type, alias.into()));
        self
    }

    /// Ordering key.
    pub fn order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    /// Do not write null values.
    pub fn skip_if_null(mut self) -> Self {
        self.skip_if_null = true;
        self
    }

    /// Do not write default values.
    pub fn skip_if_default(mut self) -> Self {
        self.skip_if_default = true;
        self
    }

    /// Treat a collection class as a plain object.
    pub fn not_collection(mut self) -> Self {
        self.not_collection = true;
        self
    }

    /// Keep surrounding whitespace of text values.
    pub fn preserve_whitespace(mut self) -> Self {
        self.preserve_whitespace = true;
        self
    }

    /// Text embedding mode.
    pub fn embed(mut self, embedding: TextEmbedding) -> Self {
        self.embedding = embedding;
        self
    }

    /// Comment written before the member's node.
    pub fn comment(mut self, text: impl Into<String>) -> Self {
        self.comments.push(text.into());
        self
    }

    /// Format string for basic values.
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }
}

/// Definition of a class.
#[derive(Debug, Clone)]
pub struct ClassDef {
    pub name: Arc<str>,
    pub alias: Option<String>,
    pub base: Option<String>,
    pub field_selection: FieldSelection,
    pub include_private_from_base: bool,
    pub namespace: Option<NamespaceDef>,
    pub comments: Vec<String>,
    pub serialize_nulls: Option<bool>,
    pub skip_defaults: Option<bool>,
    pub converter: Option<ConverterRef>,
    pub max_recursion: Option<usize>,
    pub tolerate_cycles: Option<bool>,
    /// Whether fresh instances can be created during deserialization.
    pub instantiable: bool,
    /// Item type when the class is itself a collection.
    pub collection_of: Option<DataType>,
    pub members: Vec<MemberDef>,
}

impl ClassDef {
    /// Instantiable class with no members.
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            alias: None,
            base: None,
            field_selection: FieldSelection::default(),
            include_private_from_base: false,
            namespace: None,
            comments: Vec::new(),
            serialize_nulls: None,
            skip_defaults: None,
            converter: None,
            max_recursion: None,
            tolerate_cycles: None,
            instantiable: true,
            collection_of: None,
            members: Vec::new(),
        }
    }

    /// Element name of the class.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Base class.
    pub fn base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Field selection policy.
    pub fn field_selection(mut self, selection: FieldSelection) -> Self {
        self.field_selection = selection;
        self
    }

    /// Also serialize private members inherited from base classes.
    pub fn include_private_from_base(mut self) -> Self {
        self.include_private_from_base = true;
        self
    }

    /// Namespace of the class element.
    pub fn namespace(mut self, uri: impl Into<String>, prefix: Option<&str>) -> Self {
        self.namespace = Some(NamespaceDef::new(uri, prefix));
        self
    }

    /// Comment written before the class element.
    pub fn comment(mut self, text: impl Into<String>) -> Self {
        self.comments.push(text.into());
        self
    }

    /// Override null serialization.
    pub fn serialize_nulls(mut self, serialize: bool) -> Self {
        self.serialize_nulls = Some(serialize);
        self
    }

    /// Override default-value suppression.
    pub fn skip_defaults(mut self, skip: bool) -> Self {
        self.skip_defaults = Some(skip);
        self
    }

    /// Custom converter for the whole class.
    pub fn converter(mut self, converter: ConverterRef) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Maximum nesting depth below this class.
    pub fn max_recursion(mut self, depth: usize) -> Self {
        self.max_recursion = Some(depth);
        self
    }

    /// Override cycle tolerance.
    pub fn tolerate_cycles(mut self, tolerate: bool) -> Self {
        self.tolerate_cycles = Some(tolerate);
        self
    }

    /// Reject fresh instances during deserialization.
    pub fn not_instantiable(mut self) -> Self {
        self.instantiable = false;
        self
    }

    /// Make the class a collection of `item`.
    pub fn collection_of(mut self, item: DataType) -> Self {
        self.collection_of = Some(item);
        self
    }

    /// Add a member.
    pub fn member(mut self, member: MemberDef) -> Self {
        self.members.push(member);
        self
    }
}

/// One variant of an enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumVariant {
    pub name: String,
    pub alias: Option<String>,
}

impl EnumVariant {
    /// Text written for this variant.
    pub fn text(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// Definition of an enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDef {
    pub name: Arc<str>,
    pub variants: Vec<EnumVariant>,
    /// Values may combine several variants.
    pub flags: bool,
}

impl EnumDef {
    /// Enumeration with the given variants.
    pub fn new<I, S>(name: &str, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: Arc::from(name),
            variants: variants
                .into_iter()
                .map(|v| EnumVariant {
                    name: v.into(),
                    alias: None,
                })
                .collect(),
            flags: false,
        }
    }

    /// Mark as a flags enumeration.
    pub fn flags(mut self) -> Self {
        self.flags = true;
        self
    }

    /// Set the text alias of a variant.
    pub fn variant_alias(mut self, variant: &str, alias: impl Into<String>) -> Self {
        if let Some(v) = self.variants.iter_mut().find(|v| v.name == variant) {
            v.alias = Some(alias.into());
        }
        self
    }

    /// Find a variant by alias or name.
    pub fn variant_by_text(&self, text: &str) -> Option<&EnumVariant> {
        self.variants
            .iter()
            .find(|v| v.text() == text)
            .or_else(|| self.variants.iter().find(|v| v.name == text))
            .or_else(|| {
                self.variants
                    .iter()
                    .find(|v| v.text().eq_ignore_ascii_case(text))
            })
    }

    /// Find a variant by name.
    pub fn variant(&self, name: &str) -> Option<&EnumVariant> {
        self.variants.iter().find(|v| v.name == name)
    }
}
