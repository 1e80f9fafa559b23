//! Cached per-type and per-member descriptors.
//!
//! Descriptors are built lazily from the registry's definitions the first
//! time a type is mapped and are immutable afterwards. They live in a
//! process-wide cache keyed by (registry id, type), shared by every
//! serializer, until [`clear_descriptor_cache`] is called.

use std::sync::{Arc, LazyLock};

use log::debug;
use parking_lot::RwLock;
use xmap_dom::{sanitize_name, LocationPath, QName};

use crate::{
    CollectionConfig, CollectionStrategy, ConverterRef, DataType, DictionaryConfig, EnumVariant,
    FieldSelection, FxHashMap, MemberDef, NamespaceDef, Placement, Severity, TextEmbedding,
    TypeRegistry, Value,
};

/// How a type is mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Single text value.
    Basic,
    /// Built-in hand-written converter.
    Known,
    /// Class mapped member by member.
    Object,
    /// Class that is itself a collection.
    CollectionObject,
    Sequence,
    Array,
    BitVector,
    Map,
    Pair,
    /// Any value; the runtime type decides.
    Any,
}

/// Mapping configuration of one member.
#[derive(Debug, Clone)]
pub struct MemberDescriptor {
    pub name: String,
    pub data_type: DataType,
    /// Sanitized element or attribute name.
    pub alias: String,
    pub placement: Placement,
    pub location: LocationPath,
    pub namespace: Option<NamespaceDef>,
    pub default_value: Option<Value>,
    pub severity: Option<Severity>,
    pub converter: Option<ConverterRef>,
    pub collection: Option<CollectionConfig>,
    pub dictionary: Option<DictionaryConfig>,
    /// Element names for specific runtime types.
    pub type_aliases: Vec<(DataType, String)>,
    pub order: Option<i32>,
    /// Discovery position, base class members first.
    pub index: usize,
    pub skip_if_null: bool,
    pub skip_if_default: bool,
    pub not_collection: bool,
    pub preserve_whitespace: bool,
    pub embedding: TextEmbedding,
    pub writable: bool,
    pub comments: Vec<String>,
    pub format: Option<String>,
}

impl MemberDescriptor {
    /// Build from a definition.
    ///
    /// Attribute and text placements of values that have no text form are
    /// normalized to element placement.
    pub fn from_def(registry: &TypeRegistry, def: &MemberDef, index: usize) -> Self {
        let alias = sanitize_name(def.alias.as_deref().unwrap_or(&def.name));
        let type_aliases = def
            .type_aliases
            .iter()
            .map(|(t, a)| (t.clone(), sanitize_name(a)))
            .collect();

        let mut descriptor = Self {
            name: def.name.clone(),
            data_type: def.data_type.clone(),
            alias,
            placement: def.placement,
            location: LocationPath::parse(&def.location),
            namespace: def.namespace.clone(),
            default_value: def.default_value.clone(),
            severity: def.severity,
            converter: def.converter.clone(),
            collection: def.collection.clone(),
            dictionary: def.dictionary.clone(),
            type_aliases,
            order: def.order,
            index,
            skip_if_null: def.skip_if_null,
            skip_if_default: def.skip_if_default,
            not_collection: def.not_collection,
            preserve_whitespace: def.preserve_whitespace,
            embedding: def.embedding,
            writable: def.writable,
            comments: def.comments.clone(),
            format: def.format.clone(),
        };

        if descriptor.placement != Placement::Element && !descriptor.has_text_form(registry) {
            debug!(
                "member '{}' of type {} has no text form, placing it as an element",
                def.name, def.data_type
            );
            descriptor.placement = Placement::Element;
        }
        descriptor
    }

    /// Check whether the member's value can be written as one text value.
    pub fn has_text_form(&self, registry: &TypeRegistry) -> bool {
        if self.converter.is_some() || self.data_type.has_text_form() {
            return true;
        }
        if self.is_serial() {
            return self
                .item_type(registry)
                .is_some_and(|item| item.has_text_form());
        }
        false
    }

    /// Item type when the member is a sequence, array or collection class.
    pub fn item_type(&self, registry: &TypeRegistry) -> Option<DataType> {
        match &self.data_type {
            DataType::Class(name) => registry.class(name).and_then(|c| c.collection_of.clone()),
            other => other.item_type().cloned(),
        }
    }

    /// Collection strategy, `Recursive` when unconfigured.
    pub fn strategy(&self) -> CollectionStrategy {
        self.collection
            .as_ref()
            .map(|c| c.strategy)
            .unwrap_or_default()
    }

    /// Check whether the member uses the serial collection strategy.
    pub fn is_serial(&self) -> bool {
        self.strategy() == CollectionStrategy::Serial
    }

    /// Check whether items are written directly at the member's location.
    pub fn is_no_container(&self) -> bool {
        self.strategy() == CollectionStrategy::RecursiveNoContainer
    }

    /// Namespace URI of the member's node.
    ///
    /// Elements inherit the enclosing default namespace; attributes are
    /// unqualified unless they declare a namespace.
    pub fn namespace_uri<'a>(&'a self, default_namespace: Option<&'a str>) -> Option<&'a str> {
        match (&self.namespace, self.placement) {
            (Some(ns), _) => Some(ns.uri.as_str()),
            (None, Placement::Attribute) => None,
            (None, _) => default_namespace,
        }
    }

    /// Qualified name of the member's node.
    pub fn qualified_name(&self, default_namespace: Option<&str>) -> QName {
        QName::in_namespace(self.namespace_uri(default_namespace), self.alias.as_str())
    }

    /// Configured element name for a runtime type.
    pub fn alias_for(&self, runtime_type: &DataType) -> Option<&str> {
        self.type_aliases
            .iter()
            .find(|(t, _)| t == runtime_type)
            .map(|(_, a)| a.as_str())
    }

    /// Runtime type configured for an element name.
    pub fn type_for_alias(&self, alias: &str) -> Option<&DataType> {
        self.type_aliases
            .iter()
            .find(|(_, a)| a == alias)
            .map(|(t, _)| t)
    }

    /// Severity of a missing value.
    pub fn missing_severity(&self, default: Severity) -> Severity {
        self.severity.unwrap_or(default)
    }
}

/// Mapping configuration of one type.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    pub data_type: DataType,
    /// Fully-qualified type name.
    pub type_name: String,
    /// Element name.
    pub alias: String,
    pub kind: TypeKind,
    pub field_selection: FieldSelection,
    pub namespace: Option<NamespaceDef>,
    pub comments: Vec<String>,
    /// Overrides the caller's null serialization when set.
    pub serialize_nulls: Option<bool>,
    /// Overrides the caller's default-value suppression when set.
    pub skip_defaults: Option<bool>,
    pub converter: Option<ConverterRef>,
    pub max_recursion: Option<usize>,
    /// Overrides the caller's cycle tolerance when set.
    pub tolerate_cycles: Option<bool>,
    pub instantiable: bool,
    /// Variants of an enumeration.
    pub enum_variants: Vec<EnumVariant>,
    pub flags: bool,
    /// Item type of sequences, arrays and collection classes.
    pub item_type: Option<DataType>,
    /// Serializable members, sorted by ordering key then discovery order.
    pub members: Vec<MemberDescriptor>,
}

impl TypeDescriptor {
    fn build(registry: &TypeRegistry, data_type: &DataType) -> Self {
        let kind = match data_type {
            t if t.is_known() => TypeKind::Known,
            t if t.is_basic() => TypeKind::Basic,
            DataType::Class(name) => match registry.class(name) {
                Some(def) if def.collection_of.is_some() => TypeKind::CollectionObject,
                _ => TypeKind::Object,
            },
            DataType::Sequence(..) => TypeKind::Sequence,
            DataType::Array { .. } => TypeKind::Array,
            DataType::BitVector => TypeKind::BitVector,
            DataType::Map(..) => TypeKind::Map,
            DataType::Pair(..) => TypeKind::Pair,
            _ => TypeKind::Any,
        };

        let mut descriptor = Self {
            data_type: data_type.clone(),
            type_name: data_type.type_name(),
            alias: registry.type_alias(data_type),
            kind,
            field_selection: FieldSelection::default(),
            namespace: None,
            comments: Vec::new(),
            serialize_nulls: None,
            skip_defaults: None,
            converter: None,
            max_recursion: None,
            tolerate_cycles: None,
            instantiable: !matches!(data_type, DataType::Class(_)),
            enum_variants: Vec::new(),
            flags: false,
            item_type: data_type.item_type().cloned(),
            members: Vec::new(),
        };

        match data_type {
            DataType::Class(name) => {
                if let Some(def) = registry.class(name) {
                    descriptor.field_selection = def.field_selection;
                    descriptor.namespace = def.namespace.clone();
                    descriptor.comments = def.comments.clone();
                    descriptor.serialize_nulls = def.serialize_nulls;
                    descriptor.skip_defaults = def.skip_defaults;
                    descriptor.converter = def.converter.clone();
                    descriptor.max_recursion = def.max_recursion;
                    descriptor.tolerate_cycles = def.tolerate_cycles;
                    descriptor.instantiable = def.instantiable;
                    descriptor.item_type = def.collection_of.clone();

                    let mut members =
                        registry
                            .inspector()
                            .members(registry, def, def.include_private_from_base);
                    // Unordered members follow ordered ones; stable sort keeps discovery order
                    members.sort_by_key(|m| (m.order.is_none(), m.order.unwrap_or(0), m.index));
                    descriptor.members = members;
                }
            }
            DataType::Enum(name) => {
                if let Some(def) = registry.enum_def(name) {
                    descriptor.enum_variants = def.variants.clone();
                    descriptor.flags = def.flags;
                }
            }
            _ => {}
        }

        descriptor
    }

    /// Member by name.
    pub fn member(&self, name: &str) -> Option<&MemberDescriptor> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Check whether the type is a class mapped member by member.
    pub fn is_object(&self) -> bool {
        matches!(self.kind, TypeKind::Object | TypeKind::CollectionObject)
    }

    /// Check whether the type is handled by the collection codec.
    pub fn is_collection(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Sequence
                | TypeKind::Array
                | TypeKind::BitVector
                | TypeKind::Map
                | TypeKind::CollectionObject
        )
    }

    /// Check whether members were written outside the element via `..` steps.
    pub fn has_escaping_members(&self) -> bool {
        self.members.iter().any(|m| m.location.escapes())
    }
}

type CacheKey = (u64, DataType);

static DESCRIPTOR_CACHE: LazyLock<RwLock<FxHashMap<CacheKey, Arc<TypeDescriptor>>>> =
    LazyLock::new(|| RwLock::new(FxHashMap::default()));

impl TypeRegistry {
    /// Descriptor of a type, built on first request.
    pub fn descriptor(&self, data_type: &DataType) -> Arc<TypeDescriptor> {
        let key = (self.id(), data_type.clone());
        if let Some(found) = DESCRIPTOR_CACHE.read().get(&key) {
            return found.clone();
        }

        // Built outside the lock; a concurrent builder of the same key loses
        let built = Arc::new(TypeDescriptor::build(self, data_type));
        debug!(
            "built descriptor for {} ({} members)",
            built.type_name,
            built.members.len()
        );
        DESCRIPTOR_CACHE
            .write()
            .entry(key)
            .or_insert(built)
            .clone()
    }
}

/// Drop every cached descriptor of every registry.
pub fn clear_descriptor_cache() {
    let mut cache = DESCRIPTOR_CACHE.write();
    debug!("clearing {} cached descriptors", cache.len());
    cache.clear();
}

/// Number of cached descriptors.
pub fn cached_descriptor_count() -> usize {
    DESCRIPTOR_CACHE.read().len()
}
