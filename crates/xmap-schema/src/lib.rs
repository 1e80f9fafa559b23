//! Type system and mapping configuration for xmap.
//!
//! Classes and enums are declared with [`ClassDef`], [`MemberDef`] and
//! [`EnumDef`], validated by [`SchemaBuilder`] into a [`TypeRegistry`],
//! and turned into cached [`TypeDescriptor`]s the first time a type is
//! mapped. Runtime data is held in the dynamic [`Value`] model.
//!
//! # Architecture
//!
//! - **Types** ([`DataType`]): scalars, enums, classes and containers with
//!   parseable fully-qualified names
//! - **Values** ([`Value`], [`ObjectRef`]): object graphs with shared,
//!   possibly cyclic references
//! - **Definitions** ([`ClassDef`], [`MemberDef`]): the mapping options
//! - **Descriptors** ([`TypeDescriptor`], [`MemberDescriptor`]): the
//!   resolved, ordered view the engine works from
//! - **Primitives** ([`format_basic`], [`parse_basic`]): text forms of
//!   basic values
//!
//! # Example
//!
//! ```
//! use xmap_schema::{ClassDef, DataType, MemberDef, SchemaBuilder};
//!
//! let mut builder = SchemaBuilder::new();
//! builder.add_class(
//!     ClassDef::new("Point")
//!         .member(MemberDef::new("X", DataType::Int32).attribute())
//!         .member(MemberDef::new("Y", DataType::Int32).attribute()),
//! );
//! let registry = builder.build()?;
//!
//! let point = registry.descriptor(&DataType::class("Point"));
//! assert_eq!(point.members.len(), 2);
//! # Ok::<(), xmap_schema::Error>(())
//! ```

mod builder;
mod converter;
mod definition;
mod descriptor;
mod error;
mod inspector;
mod primitive;
mod registry;
#[cfg(feature = "serde")]
mod schema_file;
mod types;
mod value;

use std::hash::BuildHasherDefault;

use rustc_hash::FxHasher;

/// Hash map with the Fx hasher.
pub type FxHashMap<K, V> = hashbrown::HashMap<K, V, BuildHasherDefault<FxHasher>>;
/// Hash set with the Fx hasher.
pub type FxHashSet<T> = hashbrown::HashSet<T, BuildHasherDefault<FxHasher>>;

pub use builder::SchemaBuilder;
pub use converter::{ConverterRef, CustomConverter};
pub use definition::{
    ClassDef, CollectionConfig, CollectionStrategy, DictionaryConfig, EnumDef, EnumVariant,
    FieldSelection, MemberDef, MemberKind, NamespaceDef, NodePlacement, Placement, Severity,
    TextEmbedding, Visibility,
};
pub use descriptor::{
    cached_descriptor_count, clear_descriptor_cache, MemberDescriptor, TypeDescriptor, TypeKind,
};
pub use error::{Error, Result};
pub use inspector::{DefaultInspector, TypeInspector};
pub use primitive::{format_basic, parse_basic, Format, DATE_TIME_FORMAT};
pub use registry::TypeRegistry;
#[cfg(feature = "serde")]
pub use schema_file::{ClassEntry, EnumEntry, MemberEntry, SchemaFile};
pub use types::{DataType, SequenceKind};
pub use value::{
    Array, EnumValue, Map, Object, ObjectRef, Pair, Sequence, SequenceItems, Value,
};
