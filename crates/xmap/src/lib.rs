//! Bidirectional mapping between object graphs and XML documents.
//!
//! Types are described once with a [`SchemaBuilder`](xmap_schema::SchemaBuilder):
//! element and attribute names, where each member goes, how collections and
//! dictionaries are laid out, namespaces, custom converters and how strictly
//! problems are treated. An [`XmlSerializer`] bound to a root type then
//! turns [`Value`](xmap_schema::Value) graphs into XML and back.
//!
//! # Crates
//!
//! - [`xmap_common`] - GUID and duration value types
//! - [`xmap_dom`] - XML tree, parser, writer and location paths
//! - [`xmap_schema`] - type definitions, registry, descriptors and values
//!
//! # Error handling
//!
//! Problems found while mapping are recorded with a severity in the
//! serializer's [`ErrorList`]. The [`ExceptionPolicy`] decides which
//! severities abort the call with [`Error::Aborted`]. A self-referencing
//! object with cycle tolerance disabled always aborts.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use xmap::prelude::*;
//!
//! let mut builder = SchemaBuilder::new();
//! builder.add_class(
//!     ClassDef::new("Config")
//!         .member(MemberDef::new("Port", DataType::Int32).attribute_at("Server"))
//!         .member(
//!             MemberDef::new("Hosts", DataType::list(DataType::String))
//!                 .collection(CollectionConfig::serial(",")),
//!         ),
//! );
//! let registry = Arc::new(builder.build()?);
//! let mut serializer = XmlSerializer::new(registry, DataType::class("Config"))
//!     .with_options(SerializerOptions::default().compact());
//!
//! let hosts = Sequence::list(DataType::String, ["a".into(), "b".into()]);
//! let config = Object::new("Config")
//!     .with("Port", 8080)
//!     .with("Hosts", Value::Sequence(hosts));
//! let xml = serializer.serialize(&config.into_ref().into())?;
//! assert_eq!(xml, r#"<Config><Server Port="8080"/><Hosts>a,b</Hosts></Config>"#);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod codec;
mod context;
mod de;
pub mod error;
pub mod known;
pub mod namespace;
pub mod options;
mod ser;
mod serializer;

pub use xmap_common as common;
pub use xmap_dom as dom;
pub use xmap_schema as schema;

pub use error::{Error, ErrorCategory, ErrorList, MappingError, ReportedError, Result};
pub use known::KnownType;
pub use namespace::NamespaceRegistry;
pub use options::{ExceptionPolicy, SerializerOptions, METADATA_NAMESPACE};
pub use serializer::XmlSerializer;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        Error, ErrorCategory, ErrorList, ExceptionPolicy, MappingError, SerializerOptions,
        XmlSerializer,
    };
    pub use xmap_common::{Guid, TimeSpan};
    pub use xmap_dom::{Document, QName, WriteOptions};
    pub use xmap_schema::{
        Array, ClassDef, CollectionConfig, CollectionStrategy, CustomConverter, DataType,
        DictionaryConfig, EnumDef, EnumValue, FieldSelection, Map, MemberDef, NodePlacement,
        Object, ObjectRef, Pair, Placement, SchemaBuilder, Sequence, SequenceKind, Severity,
        TextEmbedding, TypeRegistry, Value,
    };
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
