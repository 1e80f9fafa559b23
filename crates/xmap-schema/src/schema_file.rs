//! JSON schema files.
//!
//! A schema file lists classes and enums with their mapping options.
//! Types are written as fully-qualified type names (`Int32`,
//! `List<Person>`, `Map<String,Double>`, `Int32[,]`) and are resolved
//! once every class and enum name is known.
//!
//! ```json
//! {
//!   "root": "Person",
//!   "enums": [{ "name": "Role", "variants": ["Admin", "User"] }],
//!   "classes": [{
//!     "name": "Person",
//!     "members": [
//!       { "name": "Name", "type": "String", "placement": "attribute" },
//!       { "name": "Role", "type": "Role" }
//!     ]
//!   }]
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    ClassDef, CollectionConfig, DataType, DictionaryConfig, EnumDef, Error, FieldSelection,
    FxHashSet, MemberDef, MemberKind, NamespaceDef, Placement, Result, SchemaBuilder, Severity,
    TextEmbedding, TypeRegistry, Visibility,
};

/// Root of a schema file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaFile {
    /// Type name of the document root.
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default)]
    pub classes: Vec<ClassEntry>,
    #[serde(default)]
    pub enums: Vec<EnumEntry>,
}

/// Class definition in a schema file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassEntry {
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub field_selection: FieldSelection,
    #[serde(default)]
    pub include_private_from_base: bool,
    #[serde(default)]
    pub namespace: Option<NamespaceDef>,
    #[serde(default)]
    pub comments: Vec<String>,
    #[serde(default)]
    pub serialize_nulls: Option<bool>,
    #[serde(default)]
    pub skip_defaults: Option<bool>,
    #[serde(default)]
    pub max_recursion: Option<usize>,
    #[serde(default)]
    pub tolerate_cycles: Option<bool>,
    #[serde(default = "default_true")]
    pub instantiable: bool,
    #[serde(default)]
    pub collection_of: Option<String>,
    #[serde(default)]
    pub members: Vec<MemberEntry>,
}

/// Member definition in a schema file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemberEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub kind: MemberKind,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub serializable: bool,
    #[serde(default)]
    pub excluded: bool,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub placement: Placement,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub namespace: Option<NamespaceDef>,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub collection: Option<CollectionConfig>,
    #[serde(default)]
    pub dictionary: Option<DictionaryConfig>,
    /// Element names by runtime type name.
    #[serde(default)]
    pub type_aliases: BTreeMap<String, String>,
    #[serde(default)]
    pub order: Option<i32>,
    #[serde(default)]
    pub skip_if_null: bool,
    #[serde(default)]
    pub skip_if_default: bool,
    #[serde(default)]
    pub not_collection: bool,
    #[serde(default)]
    pub preserve_whitespace: bool,
    #[serde(default)]
    pub embedding: TextEmbedding,
    #[serde(default)]
    pub comments: Vec<String>,
    #[serde(default)]
    pub format: Option<String>,
}

/// Enum definition in a schema file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnumEntry {
    pub name: String,
    pub variants: Vec<String>,
    /// Text aliases by variant name.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    #[serde(default)]
    pub flags: bool,
}

fn default_true() -> bool {
    true
}

impl SchemaFile {
    /// Parse a schema file.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Render as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Resolve type names and collect the definitions.
    pub fn to_builder(&self) -> Result<SchemaBuilder> {
        let class_names: FxHashSet<&str> = self.classes.iter().map(|c| c.name.as_str()).collect();
        let enum_names: FxHashSet<&str> = self.enums.iter().map(|e| e.name.as_str()).collect();
        let resolve = |name: &str| -> Result<DataType> {
            DataType::parse(name, &|n| {
                if class_names.contains(n) {
                    Some(DataType::class(n))
                } else if enum_names.contains(n) {
                    Some(DataType::enumeration(n))
                } else {
                    None
                }
            })
            .ok_or_else(|| Error::UnknownType(name.to_string()))
        };

        let mut builder = SchemaBuilder::new();
        for entry in &self.enums {
            let mut def = EnumDef::new(&entry.name, entry.variants.iter().cloned());
            if entry.flags {
                def = def.flags();
            }
            for (variant, alias) in &entry.aliases {
                def = def.variant_alias(variant, alias.clone());
            }
            builder.add_enum(def);
        }

        for entry in &self.classes {
            let mut class = ClassDef::new(&entry.name).field_selection(entry.field_selection);
            class.alias = entry.alias.clone();
            class.base = entry.base.clone();
            class.include_private_from_base = entry.include_private_from_base;
            class.namespace = entry.namespace.clone();
            class.comments = entry.comments.clone();
            class.serialize_nulls = entry.serialize_nulls;
            class.skip_defaults = entry.skip_defaults;
            class.max_recursion = entry.max_recursion;
            class.tolerate_cycles = entry.tolerate_cycles;
            class.instantiable = entry.instantiable;
            class.collection_of = entry.collection_of.as_deref().map(&resolve).transpose()?;

            for m in &entry.members {
                let mut member = MemberDef::new(m.name.clone(), resolve(&m.type_name)?);
                member.kind = m.kind;
                member.visibility = m.visibility;
                member.explicitly_serializable = m.serializable;
                member.excluded = m.excluded;
                member.writable = !m.read_only;
                member.alias = m.alias.clone();
                member.placement = m.placement;
                if let Some(location) = &m.location {
                    member.location = location.clone();
                }
                member.namespace = m.namespace.clone();
                member.severity = m.severity;
                member.collection = m.collection.clone();
                member.dictionary = m.dictionary.clone();
                for (type_name, alias) in &m.type_aliases {
                    member.type_aliases.push((resolve(type_name)?, alias.clone()));
                }
                member.order = m.order;
                member.skip_if_null = m.skip_if_null;
                member.skip_if_default = m.skip_if_default;
                member.not_collection = m.not_collection;
                member.preserve_whitespace = m.preserve_whitespace;
                member.embedding = m.embedding;
                member.comments = m.comments.clone();
                member.format = m.format.clone();
                class = class.member(member);
            }
            builder.add_class(class);
        }
        Ok(builder)
    }

    /// Build the registry.
    pub fn build(&self) -> Result<TypeRegistry> {
        self.to_builder()?.build()
    }

    /// Resolve the root type against a registry built from this file.
    pub fn root_type(&self, registry: &TypeRegistry) -> Result<Option<DataType>> {
        self.root
            .as_deref()
            .map(|name| {
                registry
                    .resolve_type_name(name)
                    .ok_or_else(|| Error::UnknownType(name.to_string()))
            })
            .transpose()
    }
}
